use super::{
    array_type_code, opcodes, Frame, Instruction, InvokeType, Label, LabelGenerator,
    SequentialLabels, VerificationType,
};
use crate::jvm::class_file;
use crate::jvm::class_file::{
    BootstrapTable, ClassConstantIndex, ConstantIndex, ConstantsPool, ConstantsWriter,
    LineNumberEntry, LocalVariableEntry, Serialize, StackMapFrame,
};
use crate::jvm::{EncodeError, Error, MethodDescriptor, ParseDescriptor};
use std::collections::HashMap;

/// Semantic representation of a method body
#[derive(Clone, Debug, PartialEq)]
pub struct Code {
    /// Maximum size of stack through the method
    pub max_stack: u16,

    /// Maximum size of locals through the method
    pub max_locals: u16,

    /// Instructions, interleaved with labels, line numbers, and frames
    pub instructions: Vec<Instruction>,

    /// Exception handlers, in priority order
    pub exception_handlers: Vec<ExceptionHandler>,

    /// Debug information about local variables (`LocalVariableTable`)
    pub local_variables: Vec<LocalVariable>,

    /// Generic signatures of local variables (`LocalVariableTypeTable`)
    pub local_variable_types: Vec<LocalVariable>,

    /// Generator to produce the next label
    pub(super) labels: SequentialLabels,
}

/// Exception handler covering the instructions between `start` (inclusive) and `end` (exclusive)
#[derive(Clone, Debug, PartialEq)]
pub struct ExceptionHandler {
    pub start: Label,
    pub end: Label,
    pub handler: Label,

    /// Class of exceptions caught, or `None` to catch everything
    pub catch_type: Option<String>,
}

/// Local variable live between `start` (inclusive) and `end` (exclusive)
///
/// In `local_variable_types`, `descriptor` holds a generic signature instead.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalVariable {
    pub name: String,
    pub descriptor: String,
    pub start: Label,
    pub end: Label,
    pub index: u16,
}

impl Code {
    /// Empty method body
    pub fn new(max_stack: u16, max_locals: u16) -> Code {
        Code {
            max_stack,
            max_locals,
            instructions: vec![],
            exception_handlers: vec![],
            local_variables: vec![],
            local_variable_types: vec![],
            labels: SequentialLabels::new(),
        }
    }

    /// Allocate a label that isn't used anywhere else in this body
    pub fn fresh_label(&mut self) -> Label {
        self.labels.fresh_label()
    }

    /// Number of real (non pseudo) instructions
    pub fn len(&self) -> usize {
        self.instructions.iter().filter(|insn| !insn.is_pseudo()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lay out the instructions and produce the `Code` attribute
    ///
    /// Constants are interned in instruction order, then the exception table and debug tables
    /// follow. Nothing about the body is mutated, so a failure leaves the model as it was.
    pub fn serialize_code(
        &self,
        constants_pool: &mut ConstantsPool,
        bootstrap_methods: &mut BootstrapTable,
    ) -> Result<class_file::Code, Error> {
        // Resolve constant pool operands up front, since `ldc` has a size that depends on them
        let mut operands: Vec<u16> = Vec::with_capacity(self.instructions.len());
        for insn in &self.instructions {
            operands.push(resolve_operand(insn, constants_pool, bootstrap_methods)?);
        }

        // Extract a mapping of label to offset
        let mut label_offsets: HashMap<Label, usize> = HashMap::new();
        let mut offsets: Vec<usize> = Vec::with_capacity(self.instructions.len());
        let mut latest_offset: usize = 0;
        for (insn, operand) in self.instructions.iter().zip(&operands) {
            if let Instruction::Label(label) = insn {
                if label_offsets.insert(*label, latest_offset).is_some() {
                    return Err(EncodeError::DuplicateLabel(*label).into());
                }
            }
            offsets.push(latest_offset);
            latest_offset += instruction_width(insn, *operand, latest_offset);
        }
        if latest_offset > u16::MAX as usize {
            return Err(EncodeError::CodeTooLarge(latest_offset).into());
        }
        let offset_of = |label: &Label| -> Result<usize, EncodeError> {
            label_offsets
                .get(label)
                .copied()
                .ok_or(EncodeError::UnplacedLabel(*label))
        };

        // Serialize instructions, accumulating line numbers and frames on the way
        let mut code_array = class_file::BytecodeArray(Vec::with_capacity(latest_offset));
        let mut line_numbers: Vec<LineNumberEntry> = vec![];
        let mut frames: Vec<(usize, &Frame)> = vec![];
        let mut pending_marker: Option<&'static str> = None;
        for ((insn, operand), offset) in self.instructions.iter().zip(&operands).zip(&offsets) {
            match insn {
                Instruction::Label(_) => (),
                Instruction::LineNumber(line_number) => {
                    pending_marker = Some("line number");
                    line_numbers.push(LineNumberEntry {
                        start_pc: *offset as u16,
                        line_number: *line_number,
                    });
                }
                Instruction::Frame(frame) => {
                    pending_marker = Some("frame");
                    frames.push((*offset, frame));
                }
                _ => {
                    pending_marker = None;
                    serialize_instruction(insn, *operand, *offset, &offset_of, &mut code_array.0)?;
                }
            }
        }
        if let Some(marker) = pending_marker {
            return Err(EncodeError::TrailingMarker(marker).into());
        }

        let mut exception_table = vec![];
        for handler in &self.exception_handlers {
            let start_pc = offset_of(&handler.start)?;
            let end_pc = offset_of(&handler.end)?;
            if end_pc < start_pc {
                return Err(EncodeError::InvertedRange {
                    start: handler.start,
                    end: handler.end,
                }
                .into());
            }
            let catch_type = match &handler.catch_type {
                None => None,
                Some(class) => Some(constants_pool.get_class(class)?),
            };
            exception_table.push(class_file::ExceptionHandler {
                start_pc: start_pc as u16,
                end_pc: end_pc as u16,
                handler_pc: offset_of(&handler.handler)? as u16,
                catch_type,
            });
        }
        check_count("exception handlers", exception_table.len())?;

        let mut attributes = vec![];

        if !line_numbers.is_empty() {
            check_count("line numbers", line_numbers.len())?;
            let table = class_file::LineNumberTable(line_numbers);
            attributes.push(constants_pool.get_attribute(table)?);
        }

        if !self.local_variables.is_empty() {
            let entries = local_variable_entries(&self.local_variables, constants_pool, &offset_of)?;
            let table = class_file::LocalVariableTable(entries);
            attributes.push(constants_pool.get_attribute(table)?);
        }

        if !self.local_variable_types.is_empty() {
            let entries =
                local_variable_entries(&self.local_variable_types, constants_pool, &offset_of)?;
            let table = class_file::LocalVariableTypeTable(entries);
            attributes.push(constants_pool.get_attribute(table)?);
        }

        // Build up stack map frames
        let mut previous: Option<(usize, &Frame)> = None;
        let mut stack_map_frames = vec![];
        for (offset, frame) in frames {
            let offset_delta = match previous {
                None => offset,
                Some((previous_offset, previous_frame)) if previous_offset == offset => {
                    if frame != previous_frame {
                        return Err(EncodeError::ConflictingFrames(offset).into());
                    } else {
                        continue;
                    }
                }
                Some((previous_offset, _)) => offset - previous_offset - 1,
            };
            stack_map_frames.push(stack_map_frame(
                frame,
                offset,
                offset_delta as u16,
                constants_pool,
                &offset_of,
            )?);
            previous = Some((offset, frame));
        }

        // Add `StackMapTable` attribute only if there are frames
        if !stack_map_frames.is_empty() {
            check_count("stack map frames", stack_map_frames.len())?;
            let stack_map_table = class_file::StackMapTable(stack_map_frames);
            attributes.push(constants_pool.get_attribute(stack_map_table)?);
        }

        Ok(class_file::Code {
            max_stack: self.max_stack,
            max_locals: self.max_locals,
            code_array,
            exception_table,
            attributes,
        })
    }
}

fn check_count(what: &'static str, count: usize) -> Result<(), EncodeError> {
    if count > u16::MAX as usize {
        Err(EncodeError::TooManyItems { what, count })
    } else {
        Ok(())
    }
}

/// Constant pool index used by the instruction (`0` if it has none)
fn resolve_operand(
    insn: &Instruction,
    constants_pool: &mut ConstantsPool,
    bootstrap_methods: &mut BootstrapTable,
) -> Result<u16, Error> {
    let index: ConstantIndex = match insn {
        Instruction::Ldc(constant) => constant.constant_index(constants_pool)?,
        Instruction::Field(_, field) => constants_pool.get_field_ref(field)?.into(),
        Instruction::Invoke {
            kind,
            method,
            is_interface,
        } => {
            let is_interface = *is_interface || *kind == InvokeType::Interface;
            constants_pool.get_method_ref(method, is_interface)?.into()
        }
        Instruction::InvokeDynamic {
            bootstrap,
            name,
            descriptor,
        } => {
            let bootstrap = bootstrap_methods.get_bootstrap_method(constants_pool, bootstrap)?;
            constants_pool
                .get_invoke_dynamic(bootstrap, name, descriptor)?
                .into()
        }
        Instruction::Type(_, class) | Instruction::MultiANewArray(class, _) => {
            constants_pool.get_class(class)?.into()
        }
        _ => return Ok(0),
    };
    Ok(index.0)
}

/// Padding after a `tableswitch` or `lookupswitch` opcode at `offset`
fn switch_padding(offset: usize) -> usize {
    (4 - (offset + 1) % 4) % 4
}

fn fits_in_u8(value: u16) -> bool {
    value <= u8::MAX as u16
}

fn fits_in_i8(value: i16) -> bool {
    i8::MIN as i16 <= value && value <= i8::MAX as i16
}

/// Number of bytes the instruction takes when it starts at `offset`
fn instruction_width(insn: &Instruction, operand: u16, offset: usize) -> usize {
    match insn {
        Instruction::Label(_) | Instruction::LineNumber(_) | Instruction::Frame(_) => 0,
        Instruction::Plain(_) => 1,
        Instruction::Push(value) if fits_in_i8(*value) => 2,
        Instruction::Push(_) => 3,
        Instruction::Load(_, index) | Instruction::Store(_, index) => {
            if *index <= 3 {
                1
            } else if fits_in_u8(*index) {
                2
            } else {
                4
            }
        }
        Instruction::IInc(index, delta) if fits_in_u8(*index) && fits_in_i8(*delta) => 3,
        Instruction::IInc(_, _) => 6,
        Instruction::Ldc(constant) if !constant.is_wide() && fits_in_u8(operand) => 2,
        Instruction::Ldc(_) => 3,
        Instruction::Field(_, _) => 3,
        Instruction::Invoke {
            kind: InvokeType::Interface,
            ..
        } => 5,
        Instruction::Invoke { .. } => 3,
        Instruction::InvokeDynamic { .. } => 5,
        Instruction::Type(_, _) => 3,
        Instruction::NewArray(_) => 2,
        Instruction::MultiANewArray(_, _) => 4,
        Instruction::Jump(_, _) => 3,
        Instruction::TableSwitch { targets, .. } => {
            1 + switch_padding(offset) + 12 + 4 * targets.len()
        }
        Instruction::LookupSwitch { pairs, .. } => 1 + switch_padding(offset) + 8 + 8 * pairs.len(),
    }
}

fn serialize_instruction<F>(
    insn: &Instruction,
    operand: u16,
    offset: usize,
    offset_of: &F,
    code: &mut Vec<u8>,
) -> Result<(), Error>
where
    F: Fn(&Label) -> Result<usize, EncodeError>,
{
    let relative = |label: &Label| -> Result<i32, EncodeError> {
        Ok((offset_of(label)? as i64 - offset as i64) as i32)
    };

    match insn {
        Instruction::Label(_) | Instruction::LineNumber(_) | Instruction::Frame(_) => (),
        Instruction::Plain(opcode) => opcode.serialize(code)?,
        Instruction::Push(value) => {
            if fits_in_i8(*value) {
                opcodes::BIPUSH.serialize(code)?;
                (*value as i8).serialize(code)?;
            } else {
                opcodes::SIPUSH.serialize(code)?;
                value.serialize(code)?;
            }
        }
        Instruction::Load(kind, index) => {
            serialize_local(opcodes::ILOAD, opcodes::ILOAD_0, kind.position(), *index, code)?
        }
        Instruction::Store(kind, index) => {
            serialize_local(opcodes::ISTORE, opcodes::ISTORE_0, kind.position(), *index, code)?
        }
        Instruction::IInc(index, delta) => {
            if fits_in_u8(*index) && fits_in_i8(*delta) {
                opcodes::IINC.serialize(code)?;
                (*index as u8).serialize(code)?;
                (*delta as i8).serialize(code)?;
            } else {
                opcodes::WIDE.serialize(code)?;
                opcodes::IINC.serialize(code)?;
                index.serialize(code)?;
                delta.serialize(code)?;
            }
        }
        Instruction::Ldc(constant) => {
            if constant.is_wide() {
                opcodes::LDC2_W.serialize(code)?;
                operand.serialize(code)?;
            } else if fits_in_u8(operand) {
                opcodes::LDC.serialize(code)?;
                (operand as u8).serialize(code)?;
            } else {
                opcodes::LDC_W.serialize(code)?;
                operand.serialize(code)?;
            }
        }
        Instruction::Field(op, _) => {
            op.opcode().serialize(code)?;
            operand.serialize(code)?;
        }
        Instruction::Invoke { kind, method, .. } => {
            kind.opcode().serialize(code)?;
            operand.serialize(code)?;
            if *kind == InvokeType::Interface {
                let invalid = || EncodeError::InvalidDescriptor(method.descriptor.clone());
                let descriptor = MethodDescriptor::parse(&method.descriptor).map_err(|_| invalid())?;
                let count = u8::try_from(descriptor.parameter_length(true)).map_err(|_| invalid())?;
                count.serialize(code)?;
                0u8.serialize(code)?;
            }
        }
        Instruction::InvokeDynamic { .. } => {
            opcodes::INVOKEDYNAMIC.serialize(code)?;
            operand.serialize(code)?;
            0u16.serialize(code)?;
        }
        Instruction::Type(op, _) => {
            op.opcode().serialize(code)?;
            operand.serialize(code)?;
        }
        Instruction::NewArray(base_type) => {
            opcodes::NEWARRAY.serialize(code)?;
            array_type_code(*base_type).serialize(code)?;
        }
        Instruction::MultiANewArray(_, dimensions) => {
            opcodes::MULTIANEWARRAY.serialize(code)?;
            operand.serialize(code)?;
            dimensions.serialize(code)?;
        }
        Instruction::Jump(kind, target) => {
            let jump = relative(target)?;
            let jump = i16::try_from(jump).map_err(|_| EncodeError::BranchOffsetOverflow {
                target: *target,
                offset: jump as isize,
            })?;
            kind.opcode().serialize(code)?;
            jump.serialize(code)?;
        }
        Instruction::TableSwitch {
            default,
            low,
            targets,
        } => {
            if targets.is_empty() {
                return Err(EncodeError::EmptyTableSwitch.into());
            }
            let high = i32::try_from(targets.len() - 1)
                .ok()
                .and_then(|extra| low.checked_add(extra))
                .ok_or(EncodeError::TooManyItems {
                    what: "tableswitch targets",
                    count: targets.len(),
                })?;
            opcodes::TABLESWITCH.serialize(code)?;
            for _ in 0..switch_padding(offset) {
                0u8.serialize(code)?;
            }
            relative(default)?.serialize(code)?;
            low.serialize(code)?;
            high.serialize(code)?;
            for target in targets {
                relative(target)?.serialize(code)?;
            }
        }
        Instruction::LookupSwitch { default, pairs } => {
            // Keys must be sorted for the JVM to binary search them
            let mut sorted: Vec<&(i32, Label)> = pairs.iter().collect();
            sorted.sort_by_key(|(key, _)| *key);

            opcodes::LOOKUPSWITCH.serialize(code)?;
            for _ in 0..switch_padding(offset) {
                0u8.serialize(code)?;
            }
            relative(default)?.serialize(code)?;
            (pairs.len() as i32).serialize(code)?;
            for (key, target) in sorted {
                key.serialize(code)?;
                relative(target)?.serialize(code)?;
            }
        }
    }
    Ok(())
}

/// Load and store instructions come in short, normal, and `wide` forms
fn serialize_local(
    opcode: u8,
    short_opcode: u8,
    kind_position: u8,
    index: u16,
    code: &mut Vec<u8>,
) -> std::io::Result<()> {
    if index <= 3 {
        (short_opcode + 4 * kind_position + index as u8).serialize(code)
    } else if fits_in_u8(index) {
        (opcode + kind_position).serialize(code)?;
        (index as u8).serialize(code)
    } else {
        opcodes::WIDE.serialize(code)?;
        (opcode + kind_position).serialize(code)?;
        index.serialize(code)
    }
}

fn local_variable_entries<F>(
    variables: &[LocalVariable],
    constants_pool: &mut ConstantsPool,
    offset_of: &F,
) -> Result<Vec<LocalVariableEntry>, Error>
where
    F: Fn(&Label) -> Result<usize, EncodeError>,
{
    check_count("local variables", variables.len())?;
    let mut entries = Vec::with_capacity(variables.len());
    for variable in variables {
        let start_pc = offset_of(&variable.start)?;
        let end_pc = offset_of(&variable.end)?;
        if end_pc < start_pc {
            return Err(EncodeError::InvertedRange {
                start: variable.start,
                end: variable.end,
            }
            .into());
        }
        entries.push(LocalVariableEntry {
            start_pc: start_pc as u16,
            length: (end_pc - start_pc) as u16,
            name_index: constants_pool.get_utf8(variable.name.as_str())?,
            descriptor_index: constants_pool.get_utf8(variable.descriptor.as_str())?,
            index: variable.index,
        });
    }
    Ok(entries)
}

fn stack_map_frame<F>(
    frame: &Frame,
    offset: usize,
    offset_delta: u16,
    constants_pool: &mut ConstantsPool,
    offset_of: &F,
) -> Result<StackMapFrame, Error>
where
    F: Fn(&Label) -> Result<usize, EncodeError>,
{
    let frame = match frame {
        Frame::Same => StackMapFrame::SameLocalsNoStack { offset_delta },
        Frame::SameLocalsOneStack(stack) => StackMapFrame::SameLocalsOneStack {
            offset_delta,
            stack: serializable_type(stack, constants_pool, offset_of)?,
        },
        Frame::Chop(chopped_k) => {
            if !(1..=3).contains(chopped_k) {
                let reason = "chop frame removes 1 to 3 locals";
                return Err(EncodeError::InvalidFrame { offset, reason }.into());
            }
            StackMapFrame::ChopLocalsNoStack {
                offset_delta,
                chopped_k: *chopped_k,
            }
        }
        Frame::Append(locals) => {
            if !(1..=3).contains(&locals.len()) {
                let reason = "append frame adds 1 to 3 locals";
                return Err(EncodeError::InvalidFrame { offset, reason }.into());
            }
            StackMapFrame::AppendLocalsNoStack {
                offset_delta,
                locals: serializable_types(locals, constants_pool, offset_of)?,
            }
        }
        Frame::Full { locals, stack } => {
            check_count("frame locals", locals.len())?;
            check_count("frame stack entries", stack.len())?;
            StackMapFrame::Full {
                offset_delta,
                locals: serializable_types(locals, constants_pool, offset_of)?,
                stack: serializable_types(stack, constants_pool, offset_of)?,
            }
        }
    };
    Ok(frame)
}

fn serializable_type<F>(
    typ: &VerificationType<String, Label>,
    constants_pool: &mut ConstantsPool,
    offset_of: &F,
) -> Result<VerificationType<ClassConstantIndex, u16>, Error>
where
    F: Fn(&Label) -> Result<usize, EncodeError>,
{
    typ.try_map(
        |class: &String| -> Result<ClassConstantIndex, Error> {
            Ok(constants_pool.get_class(class)?)
        },
        |label: &Label| -> Result<u16, Error> { Ok(offset_of(label)? as u16) },
    )
}

fn serializable_types<F>(
    types: &[VerificationType<String, Label>],
    constants_pool: &mut ConstantsPool,
    offset_of: &F,
) -> Result<Vec<VerificationType<ClassConstantIndex, u16>>, Error>
where
    F: Fn(&Label) -> Result<usize, EncodeError>,
{
    types
        .iter()
        .map(|typ| serializable_type(typ, constants_pool, offset_of))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::{JumpKind, LoadableConstant, MemberRef, OrdComparison, ValueKind};

    fn encode(code: &Code) -> Result<(Vec<u8>, class_file::Code), Error> {
        let mut constants = ConstantsPool::new();
        let mut bootstrap = BootstrapTable::default();
        let serialized = code.serialize_code(&mut constants, &mut bootstrap)?;
        Ok((serialized.code_array.0.clone(), serialized))
    }

    fn bytes(code: &Code) -> Vec<u8> {
        encode(code).unwrap().0
    }

    #[test]
    fn local_variable_forms() {
        let mut code = Code::new(2, 300);
        code.instructions = vec![
            Instruction::Load(ValueKind::Int, 0),
            Instruction::Load(ValueKind::Reference, 3),
            Instruction::Store(ValueKind::Long, 4),
            Instruction::Load(ValueKind::Double, 256),
            Instruction::IInc(1, -1),
            Instruction::IInc(1, 1000),
        ];
        assert_eq!(
            bytes(&code),
            vec![
                0x1a, // iload_0
                0x2d, // aload_3
                0x37, 0x04, // lstore 4
                0xc4, 0x18, 0x01, 0x00, // wide dload 256
                0x84, 0x01, 0xff, // iinc 1 -1
                0xc4, 0x84, 0x00, 0x01, 0x03, 0xe8, // wide iinc 1 1000
            ]
        );
    }

    #[test]
    fn pushes_and_constants() {
        let mut code = Code::new(4, 0);
        code.instructions = vec![
            Instruction::Push(-128),
            Instruction::Push(300),
            Instruction::Ldc(LoadableConstant::Integer(100_000)),
            Instruction::Ldc(LoadableConstant::Long(1)),
            Instruction::Plain(opcodes::RETURN),
        ];
        assert_eq!(
            bytes(&code),
            vec![
                0x10, 0x80, // bipush -128
                0x11, 0x01, 0x2c, // sipush 300
                0x12, 0x01, // ldc #1
                0x14, 0x00, 0x02, // ldc2_w #2
                0xb1,
            ]
        );
    }

    #[test]
    fn jumps_are_relative_to_the_instruction() {
        let mut code = Code::new(1, 0);
        let target = code.fresh_label();
        let start = code.fresh_label();
        code.instructions = vec![
            Instruction::Label(start),
            Instruction::Plain(opcodes::ICONST_0),
            Instruction::Jump(JumpKind::If(OrdComparison::EQ), target),
            Instruction::Plain(opcodes::NOP),
            Instruction::Label(target),
            Instruction::Jump(JumpKind::Goto, start),
        ];
        assert_eq!(
            bytes(&code),
            vec![0x03, 0x99, 0x00, 0x04, 0x00, 0xa7, 0xff, 0xfb]
        );
    }

    #[test]
    fn switch_padding_depends_on_offset() {
        let mut code = Code::new(1, 0);
        let default = code.fresh_label();
        let one = code.fresh_label();
        code.instructions = vec![
            Instruction::Plain(opcodes::ICONST_0),
            Instruction::LookupSwitch {
                default,
                pairs: vec![(5, one), (-1, default)],
            },
            Instruction::Label(one),
            Instruction::Label(default),
            Instruction::Plain(opcodes::RETURN),
        ];
        assert_eq!(
            bytes(&code),
            vec![
                0x03, 0xab, 0x00, 0x00, // opcode and padding to offset 4
                0x00, 0x00, 0x00, 0x1b, // default
                0x00, 0x00, 0x00, 0x02, // pair count
                0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x1b, // -1 (sorted first)
                0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00, 0x1b, // 5
                0xb1,
            ]
        );
    }

    #[test]
    fn interface_calls_count_arguments() {
        let mut code = Code::new(4, 1);
        code.instructions = vec![Instruction::Invoke {
            kind: InvokeType::Interface,
            method: MemberRef::new("java/util/Map", "put", "(Ljava/lang/Object;J)V"),
            is_interface: true,
        }];
        let encoded = bytes(&code);
        assert_eq!(encoded[0], opcodes::INVOKEINTERFACE);
        assert_eq!(&encoded[3..], &[4, 0]);

        code.instructions = vec![Instruction::Invoke {
            kind: InvokeType::Interface,
            method: MemberRef::new("java/util/Map", "put", "(Q)V"),
            is_interface: true,
        }];
        assert!(matches!(
            encode(&code),
            Err(Error::Encode(EncodeError::InvalidDescriptor(_)))
        ));
    }

    #[test]
    fn label_errors() {
        let mut code = Code::new(0, 0);
        let label = code.fresh_label();
        code.instructions = vec![Instruction::Jump(JumpKind::Goto, label)];
        assert!(matches!(
            encode(&code),
            Err(Error::Encode(EncodeError::UnplacedLabel(l))) if l == label
        ));

        code.instructions = vec![
            Instruction::Label(label),
            Instruction::Plain(opcodes::NOP),
            Instruction::Label(label),
        ];
        assert!(matches!(
            encode(&code),
            Err(Error::Encode(EncodeError::DuplicateLabel(l))) if l == label
        ));
    }

    #[test]
    fn branch_offset_overflow() {
        let mut code = Code::new(0, 0);
        let end = code.fresh_label();
        code.instructions = vec![Instruction::Jump(JumpKind::Goto, end)];
        code.instructions
            .extend(std::iter::repeat(Instruction::Plain(opcodes::NOP)).take(40_000));
        code.instructions.push(Instruction::Label(end));
        code.instructions.push(Instruction::Plain(opcodes::RETURN));
        assert!(matches!(
            encode(&code),
            Err(Error::Encode(EncodeError::BranchOffsetOverflow { offset: 40_003, .. }))
        ));
    }

    #[test]
    fn code_too_large() {
        let mut code = Code::new(0, 0);
        code.instructions = vec![Instruction::Plain(opcodes::NOP); 65_536];
        assert!(matches!(
            encode(&code),
            Err(Error::Encode(EncodeError::CodeTooLarge(65_536)))
        ));
    }

    #[test]
    fn debug_tables_and_frames() {
        let mut code = Code::new(1, 1);
        let start = code.fresh_label();
        let loop_head = code.fresh_label();
        let end = code.fresh_label();
        code.instructions = vec![
            Instruction::Label(start),
            Instruction::LineNumber(10),
            Instruction::Plain(opcodes::NOP),
            Instruction::Label(loop_head),
            Instruction::Frame(Frame::Same),
            Instruction::Frame(Frame::Same),
            Instruction::LineNumber(11),
            Instruction::Jump(JumpKind::Goto, loop_head),
            Instruction::Label(end),
            Instruction::Frame(Frame::Append(vec![VerificationType::Object(String::from(
                "java/lang/String",
            ))])),
            Instruction::Plain(opcodes::RETURN),
        ];
        code.local_variables.push(LocalVariable {
            name: String::from("this"),
            descriptor: String::from("LSample;"),
            start,
            end,
            index: 0,
        });
        let (_, serialized) = encode(&code).unwrap();
        assert_eq!(serialized.attributes.len(), 3);

        // both frames at offset 1 are identical, so only one is written
        let mut constants = ConstantsPool::new();
        let mut bootstrap = BootstrapTable::default();
        code.local_variables.clear();
        let serialized = code.serialize_code(&mut constants, &mut bootstrap).unwrap();
        let stack_map = &serialized.attributes[1].info;
        assert_eq!(&stack_map[..3], &[0x00, 0x02, 0x01]); // two frames, first at delta 1
        assert_eq!(&stack_map[3..6], &[252, 0x00, 0x02]); // append at offset 4, delta 2

        code.instructions[5] = Instruction::Frame(Frame::Chop(1));
        assert!(matches!(
            encode(&code),
            Err(Error::Encode(EncodeError::ConflictingFrames(1)))
        ));
    }

    #[test]
    fn trailing_markers() {
        let mut code = Code::new(0, 0);
        code.instructions = vec![Instruction::Plain(opcodes::RETURN), Instruction::LineNumber(3)];
        assert!(matches!(
            encode(&code),
            Err(Error::Encode(EncodeError::TrailingMarker("line number")))
        ));

        let end = code.fresh_label();
        code.instructions = vec![Instruction::Plain(opcodes::RETURN), Instruction::Label(end)];
        assert!(encode(&code).is_ok());
    }

    #[test]
    fn inverted_ranges() {
        let mut code = Code::new(0, 0);
        let first = code.fresh_label();
        let second = code.fresh_label();
        code.instructions = vec![
            Instruction::Label(first),
            Instruction::Plain(opcodes::NOP),
            Instruction::Label(second),
            Instruction::Plain(opcodes::RETURN),
        ];
        code.exception_handlers.push(ExceptionHandler {
            start: second,
            end: first,
            handler: first,
            catch_type: None,
        });
        assert!(matches!(
            encode(&code),
            Err(Error::Encode(EncodeError::InvertedRange { .. }))
        ));
    }
}
