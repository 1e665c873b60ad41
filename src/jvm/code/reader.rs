use super::{
    array_type_from_code, opcodes, BootstrapMethod, Code, ExceptionHandler, FieldOp, Frame,
    Instruction, InvokeType, JumpKind, Label, LabelGenerator, LocalVariable, SequentialLabels,
    TypeOp, ValueKind, VerificationType,
};
use crate::jvm::class_file::{
    AttributeRecord, ByteReader, ClassConstantIndex, ConstantIndex, SymbolTable,
    Utf8ConstantIndex,
};
use crate::jvm::{Error, MalformedKind, UnsupportedConstruct};
use std::collections::{BTreeMap, BTreeSet};

/// Labels handed out while decoding a body, keyed by bytecode offset
///
/// Offsets are only checked once the whole body is decoded, since a jump can point forward to an
/// instruction that hasn't been seen yet.
struct LabelTable {
    generator: SequentialLabels,
    labels: BTreeMap<i64, Label>,

    /// Every lookup: target offset, where in the input it came from, and whether the end of the
    /// code is an acceptable target
    requests: Vec<(i64, usize, bool)>,
}

impl LabelTable {
    fn new() -> LabelTable {
        LabelTable {
            generator: SequentialLabels::new(),
            labels: BTreeMap::new(),
            requests: vec![],
        }
    }

    fn label_at(&mut self, target: i64, site: usize) -> Label {
        self.lookup(target, site, false)
    }

    /// Label for the end of a range, which may be the end of the code
    fn range_end_at(&mut self, target: i64, site: usize) -> Label {
        self.lookup(target, site, true)
    }

    fn lookup(&mut self, target: i64, site: usize, allow_end: bool) -> Label {
        self.requests.push((target, site, allow_end));
        let generator = &mut self.generator;
        *self
            .labels
            .entry(target)
            .or_insert_with(|| generator.fresh_label())
    }

    fn validate(&self, boundaries: &BTreeSet<i64>, code_length: i64) -> Result<(), Error> {
        for (target, site, allow_end) in &self.requests {
            let at_end = *allow_end && *target == code_length;
            if !at_end && !boundaries.contains(target) {
                return Err(Error::malformed(
                    *site,
                    MalformedKind::InvalidCodeOffset(*target),
                ));
            }
        }
        Ok(())
    }
}

impl Code {
    /// Decode the body of a `Code` attribute
    ///
    /// Labels are numbered in the order they are first needed: by instructions, then by the
    /// exception table, then by `LocalVariableTable`, `LocalVariableTypeTable`, and
    /// `StackMapTable` (whatever order those appear in the input).
    pub fn deserialize_code(
        reader: &mut ByteReader<'_>,
        symbols: &SymbolTable,
        bootstrap_methods: &[BootstrapMethod],
    ) -> Result<Code, Error> {
        let max_stack = reader.read_u16()?;
        let max_locals = reader.read_u16()?;

        let length_offset = reader.offset();
        let code_length = reader.read_u32()?;
        if code_length > u16::MAX as u32 {
            return Err(Error::malformed(
                length_offset,
                MalformedKind::InvalidCodeLength(code_length),
            ));
        }
        let code_length = code_length as usize;

        let mut labels = LabelTable::new();
        let mut code_reader = reader.split(code_length)?;
        let mut decoded: Vec<(usize, Instruction)> = vec![];
        while !code_reader.is_empty() {
            let pc = code_reader.position();
            let insn = read_instruction(&mut code_reader, symbols, bootstrap_methods, &mut labels)?;
            decoded.push((pc, insn));
        }

        let mut exception_handlers = vec![];
        let handler_count = reader.read_u16()?;
        for _ in 0..handler_count {
            let site = reader.offset();
            let start = labels.label_at(reader.read_u16()? as i64, site);
            let end = labels.range_end_at(reader.read_u16()? as i64, site);
            let handler = labels.label_at(reader.read_u16()? as i64, site);
            let catch_type = symbols
                .optional_class_name(reader.read::<ClassConstantIndex>()?, site)?
                .map(str::to_owned);
            exception_handlers.push(ExceptionHandler {
                start,
                end,
                handler,
                catch_type,
            });
        }

        let mut line_number_tables = vec![];
        let mut local_variable_table = None;
        let mut local_variable_type_table = None;
        let mut stack_map_table = None;
        for record in AttributeRecord::read_all(reader, symbols)? {
            match record.name.as_str() {
                "LineNumberTable" => line_number_tables.push(record),
                "LocalVariableTable" if local_variable_table.is_none() => {
                    local_variable_table = Some(record)
                }
                "LocalVariableTypeTable" if local_variable_type_table.is_none() => {
                    local_variable_type_table = Some(record)
                }
                "StackMapTable" if stack_map_table.is_none() => stack_map_table = Some(record),
                _ => return Err(record.unsupported()),
            }
        }

        let mut line_numbers: Vec<(usize, i64, u16)> = vec![];
        for record in &line_number_tables {
            record.decode(|body| {
                let count = body.read_u16()?;
                for _ in 0..count {
                    let site = body.offset();
                    let start_pc = body.read_u16()? as i64;
                    let line_number = body.read_u16()?;
                    line_numbers.push((site, start_pc, line_number));
                }
                Ok(())
            })?;
        }

        let local_variables = match &local_variable_table {
            None => vec![],
            Some(record) => {
                record.decode(|body| read_local_variables(body, symbols, &mut labels))?
            }
        };
        let local_variable_types = match &local_variable_type_table {
            None => vec![],
            Some(record) => {
                record.decode(|body| read_local_variables(body, symbols, &mut labels))?
            }
        };
        let frames = match &stack_map_table {
            None => vec![],
            Some(record) => record.decode(|body| read_frames(body, symbols, &mut labels))?,
        };

        // Check that everything points at instruction boundaries
        let boundaries: BTreeSet<i64> = decoded.iter().map(|(pc, _)| *pc as i64).collect();
        labels.validate(&boundaries, code_length as i64)?;

        let mut markers: BTreeMap<i64, Vec<Instruction>> = BTreeMap::new();
        for (site, start_pc, line_number) in line_numbers {
            if !boundaries.contains(&start_pc) {
                return Err(Error::malformed(
                    site,
                    MalformedKind::InvalidCodeOffset(start_pc),
                ));
            }
            markers
                .entry(start_pc)
                .or_default()
                .push(Instruction::LineNumber(line_number));
        }
        for (site, pc, frame) in frames {
            if !boundaries.contains(&pc) {
                return Err(Error::malformed(site, MalformedKind::InvalidCodeOffset(pc)));
            }
            markers.entry(pc).or_default().push(Instruction::Frame(frame));
        }

        // Interleave labels and markers with the real instructions
        let mut instructions = vec![];
        for (pc, insn) in decoded {
            let pc = pc as i64;
            if let Some(label) = labels.labels.get(&pc) {
                instructions.push(Instruction::Label(*label));
            }
            if let Some(pseudo) = markers.remove(&pc) {
                instructions.extend(pseudo);
            }
            instructions.push(insn);
        }
        if let Some(label) = labels.labels.get(&(code_length as i64)) {
            instructions.push(Instruction::Label(*label));
        }

        Ok(Code {
            max_stack,
            max_locals,
            instructions,
            exception_handlers,
            local_variables,
            local_variable_types,
            labels: labels.generator,
        })
    }
}

fn read_instruction(
    reader: &mut ByteReader<'_>,
    symbols: &SymbolTable,
    bootstrap_methods: &[BootstrapMethod],
    labels: &mut LabelTable,
) -> Result<Instruction, Error> {
    let at = reader.offset();
    let pc = reader.position() as i64;
    let opcode = reader.read_u8()?;

    let insn = match opcode {
        op if opcodes::is_plain(op) => Instruction::Plain(op),
        opcodes::BIPUSH => Instruction::Push(reader.read::<i8>()? as i16),
        opcodes::SIPUSH => Instruction::Push(reader.read::<i16>()?),
        opcodes::LDC => {
            let index = ConstantIndex(reader.read_u8()? as u16);
            read_ldc(symbols, index, false, at)?
        }
        opcodes::LDC_W => read_ldc(symbols, reader.read()?, false, at)?,
        opcodes::LDC2_W => read_ldc(symbols, reader.read()?, true, at)?,
        op if (opcodes::ILOAD..opcodes::ILOAD_0).contains(&op) => {
            let kind = ValueKind::ALL[(op - opcodes::ILOAD) as usize];
            Instruction::Load(kind, reader.read_u8()? as u16)
        }
        op if (opcodes::ILOAD_0..opcodes::IALOAD).contains(&op) => {
            let position = op - opcodes::ILOAD_0;
            let kind = ValueKind::ALL[(position / 4) as usize];
            Instruction::Load(kind, (position % 4) as u16)
        }
        op if (opcodes::ISTORE..opcodes::ISTORE_0).contains(&op) => {
            let kind = ValueKind::ALL[(op - opcodes::ISTORE) as usize];
            Instruction::Store(kind, reader.read_u8()? as u16)
        }
        op if (opcodes::ISTORE_0..opcodes::IASTORE).contains(&op) => {
            let position = op - opcodes::ISTORE_0;
            let kind = ValueKind::ALL[(position / 4) as usize];
            Instruction::Store(kind, (position % 4) as u16)
        }
        opcodes::IINC => {
            let index = reader.read_u8()? as u16;
            let delta = reader.read::<i8>()? as i16;
            Instruction::IInc(index, delta)
        }
        opcodes::JSR | opcodes::RET | opcodes::JSR_W => {
            return Err(Error::unsupported(at, UnsupportedConstruct::Opcode(opcode)))
        }
        opcodes::GOTO_W => {
            let target = pc + reader.read::<i32>()? as i64;
            Instruction::Jump(JumpKind::Goto, labels.label_at(target, at))
        }
        op if JumpKind::from_opcode(op).is_some() => {
            let target = pc + reader.read::<i16>()? as i64;
            let kind = JumpKind::from_opcode(op).ok_or_else(|| {
                Error::malformed(at, MalformedKind::UnknownOpcode(op))
            })?;
            Instruction::Jump(kind, labels.label_at(target, at))
        }
        opcodes::TABLESWITCH => {
            reader.align_to_four()?;
            let default = pc + reader.read::<i32>()? as i64;
            let low = reader.read::<i32>()?;
            let high = reader.read::<i32>()?;
            if high < low {
                return Err(Error::malformed(at, MalformedKind::InvalidSwitch));
            }
            let count = (high as i64 - low as i64 + 1) as usize;
            if reader.remaining() / 4 < count {
                return Err(Error::malformed(reader.offset(), MalformedKind::UnexpectedEof));
            }
            let default = labels.label_at(default, at);
            let mut targets = Vec::with_capacity(count);
            for _ in 0..count {
                let target = pc + reader.read::<i32>()? as i64;
                targets.push(labels.label_at(target, at));
            }
            Instruction::TableSwitch {
                default,
                low,
                targets,
            }
        }
        opcodes::LOOKUPSWITCH => {
            reader.align_to_four()?;
            let default = pc + reader.read::<i32>()? as i64;
            let count = reader.read::<i32>()?;
            if count < 0 {
                return Err(Error::malformed(at, MalformedKind::InvalidSwitch));
            }
            let count = count as usize;
            if reader.remaining() / 8 < count {
                return Err(Error::malformed(reader.offset(), MalformedKind::UnexpectedEof));
            }
            let default = labels.label_at(default, at);
            let mut pairs = Vec::with_capacity(count);
            for _ in 0..count {
                let key = reader.read::<i32>()?;
                let target = pc + reader.read::<i32>()? as i64;
                pairs.push((key, labels.label_at(target, at)));
            }
            Instruction::LookupSwitch { default, pairs }
        }
        opcodes::GETSTATIC | opcodes::PUTSTATIC | opcodes::GETFIELD | opcodes::PUTFIELD => {
            let op = match opcode {
                opcodes::GETSTATIC => FieldOp::GetStatic,
                opcodes::PUTSTATIC => FieldOp::PutStatic,
                opcodes::GETFIELD => FieldOp::GetField,
                _ => FieldOp::PutField,
            };
            let index: ConstantIndex = reader.read()?;
            Instruction::Field(op, symbols.field_ref(index, at)?)
        }
        opcodes::INVOKEVIRTUAL | opcodes::INVOKESPECIAL | opcodes::INVOKESTATIC => {
            let kind = match opcode {
                opcodes::INVOKEVIRTUAL => InvokeType::Virtual,
                opcodes::INVOKESPECIAL => InvokeType::Special,
                _ => InvokeType::Static,
            };
            let index: ConstantIndex = reader.read()?;
            let (method, is_interface) = symbols.method_ref(index, at)?;
            Instruction::Invoke {
                kind,
                method,
                is_interface,
            }
        }
        opcodes::INVOKEINTERFACE => {
            let index: ConstantIndex = reader.read()?;
            let _count = reader.read_u8()?;
            let _zero = reader.read_u8()?;
            let (method, is_interface) = symbols.method_ref(index, at)?;
            Instruction::Invoke {
                kind: InvokeType::Interface,
                method,
                is_interface,
            }
        }
        opcodes::INVOKEDYNAMIC => {
            let index: ConstantIndex = reader.read()?;
            let _zero = reader.read_u16()?;
            let (bootstrap, name, descriptor) = symbols.invoke_dynamic(index, at)?;
            let bootstrap = bootstrap_methods.get(bootstrap as usize).ok_or_else(|| {
                Error::malformed(at, MalformedKind::MissingBootstrapMethod(bootstrap))
            })?;
            Instruction::InvokeDynamic {
                bootstrap: bootstrap.clone(),
                name: name.to_owned(),
                descriptor: descriptor.to_owned(),
            }
        }
        opcodes::NEW | opcodes::ANEWARRAY | opcodes::CHECKCAST | opcodes::INSTANCEOF => {
            let op = match opcode {
                opcodes::NEW => TypeOp::New,
                opcodes::ANEWARRAY => TypeOp::ANewArray,
                opcodes::CHECKCAST => TypeOp::CheckCast,
                _ => TypeOp::InstanceOf,
            };
            let index: ClassConstantIndex = reader.read()?;
            Instruction::Type(op, symbols.class_name(index, at)?.to_owned())
        }
        opcodes::NEWARRAY => {
            let code = reader.read_u8()?;
            let base_type = array_type_from_code(code)
                .ok_or_else(|| Error::malformed(at, MalformedKind::InvalidArrayType(code)))?;
            Instruction::NewArray(base_type)
        }
        opcodes::MULTIANEWARRAY => {
            let index: ClassConstantIndex = reader.read()?;
            let dimensions = reader.read_u8()?;
            Instruction::MultiANewArray(symbols.class_name(index, at)?.to_owned(), dimensions)
        }
        opcodes::WIDE => read_wide(reader, at)?,
        _ => return Err(Error::malformed(at, MalformedKind::UnknownOpcode(opcode))),
    };
    Ok(insn)
}

/// Instruction following a `wide` prefix
fn read_wide(reader: &mut ByteReader<'_>, at: usize) -> Result<Instruction, Error> {
    let opcode = reader.read_u8()?;
    let insn = match opcode {
        op if (opcodes::ILOAD..opcodes::ILOAD_0).contains(&op) => {
            let kind = ValueKind::ALL[(op - opcodes::ILOAD) as usize];
            Instruction::Load(kind, reader.read_u16()?)
        }
        op if (opcodes::ISTORE..opcodes::ISTORE_0).contains(&op) => {
            let kind = ValueKind::ALL[(op - opcodes::ISTORE) as usize];
            Instruction::Store(kind, reader.read_u16()?)
        }
        opcodes::IINC => {
            let index = reader.read_u16()?;
            let delta = reader.read::<i16>()?;
            Instruction::IInc(index, delta)
        }
        opcodes::RET => return Err(Error::unsupported(at, UnsupportedConstruct::Opcode(opcode))),
        _ => return Err(Error::malformed(at, MalformedKind::InvalidWideOpcode(opcode))),
    };
    Ok(insn)
}

fn read_ldc(
    symbols: &SymbolTable,
    index: ConstantIndex,
    wide: bool,
    at: usize,
) -> Result<Instruction, Error> {
    let constant = symbols.loadable(index, at)?;
    if constant.is_wide() != wide {
        let expected = if wide {
            "Long or Double"
        } else {
            "single-slot loadable constant"
        };
        let kind = MalformedKind::ConstantTypeMismatch {
            index: index.0,
            expected,
        };
        return Err(Error::malformed(at, kind));
    }
    Ok(Instruction::Ldc(constant))
}

fn read_local_variables(
    body: &mut ByteReader<'_>,
    symbols: &SymbolTable,
    labels: &mut LabelTable,
) -> Result<Vec<LocalVariable>, Error> {
    let count = body.read_u16()?;
    let mut variables = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let site = body.offset();
        let start_pc = body.read_u16()? as i64;
        let length = body.read_u16()? as i64;
        let name = symbols.utf8(body.read::<Utf8ConstantIndex>()?, site)?;
        let descriptor = symbols.utf8(body.read::<Utf8ConstantIndex>()?, site)?;
        let index = body.read_u16()?;
        variables.push(LocalVariable {
            name: name.to_owned(),
            descriptor: descriptor.to_owned(),
            start: labels.label_at(start_pc, site),
            end: labels.range_end_at(start_pc + length, site),
            index,
        });
    }
    Ok(variables)
}

/// Frames along with their input offset and the bytecode offset they apply to
fn read_frames(
    body: &mut ByteReader<'_>,
    symbols: &SymbolTable,
    labels: &mut LabelTable,
) -> Result<Vec<(usize, i64, Frame)>, Error> {
    let count = body.read_u16()?;
    let mut frames = Vec::with_capacity(count as usize);
    let mut previous_pc: Option<i64> = None;
    for _ in 0..count {
        let site = body.offset();
        let frame_type = body.read_u8()?;
        let (offset_delta, frame) = match frame_type {
            0..=63 => (frame_type as u16, Frame::Same),
            64..=127 => {
                let stack = read_verification_type(body, symbols, labels)?;
                (frame_type as u16 - 64, Frame::SameLocalsOneStack(stack))
            }
            247 => {
                let offset_delta = body.read_u16()?;
                let stack = read_verification_type(body, symbols, labels)?;
                (offset_delta, Frame::SameLocalsOneStack(stack))
            }
            248..=250 => (body.read_u16()?, Frame::Chop(251 - frame_type)),
            251 => (body.read_u16()?, Frame::Same),
            252..=254 => {
                let offset_delta = body.read_u16()?;
                let mut locals = vec![];
                for _ in 0..(frame_type - 251) {
                    locals.push(read_verification_type(body, symbols, labels)?);
                }
                (offset_delta, Frame::Append(locals))
            }
            255 => {
                let offset_delta = body.read_u16()?;
                let mut locals = vec![];
                for _ in 0..body.read_u16()? {
                    locals.push(read_verification_type(body, symbols, labels)?);
                }
                let mut stack = vec![];
                for _ in 0..body.read_u16()? {
                    stack.push(read_verification_type(body, symbols, labels)?);
                }
                (offset_delta, Frame::Full { locals, stack })
            }
            _ => {
                return Err(Error::malformed(
                    site,
                    MalformedKind::InvalidFrameType(frame_type),
                ))
            }
        };
        let pc = match previous_pc {
            None => offset_delta as i64,
            Some(previous_pc) => previous_pc + offset_delta as i64 + 1,
        };
        previous_pc = Some(pc);
        frames.push((site, pc, frame));
    }
    Ok(frames)
}

fn read_verification_type(
    body: &mut ByteReader<'_>,
    symbols: &SymbolTable,
    labels: &mut LabelTable,
) -> Result<VerificationType<String, Label>, Error> {
    let site = body.offset();
    let typ = match body.read_u8()? {
        0 => VerificationType::Top,
        1 => VerificationType::Integer,
        2 => VerificationType::Float,
        3 => VerificationType::Double,
        4 => VerificationType::Long,
        5 => VerificationType::Null,
        6 => VerificationType::UninitializedThis,
        7 => {
            let class: ClassConstantIndex = body.read()?;
            VerificationType::Object(symbols.class_name(class, site)?.to_owned())
        }
        8 => {
            let offset = body.read_u16()? as i64;
            VerificationType::Uninitialized(labels.label_at(offset, site))
        }
        tag => {
            return Err(Error::malformed(
                site,
                MalformedKind::InvalidVerificationType(tag),
            ))
        }
    };
    Ok(typ)
}
