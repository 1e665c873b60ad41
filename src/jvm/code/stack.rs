use super::{opcodes, FieldOp, Instruction, InvokeType, TypeOp};
use crate::jvm::{FieldType, MethodDescriptor, ParseDescriptor};

/// Number of stack slots popped and pushed by an instruction
///
/// Returns `None` when the effect can't be known from the instruction alone (a descriptor that
/// doesn't parse, or an opcode this doesn't know about).
pub fn stack_effect(insn: &Instruction) -> Option<(u16, u16)> {
    let effect = match insn {
        Instruction::Label(_) | Instruction::LineNumber(_) | Instruction::Frame(_) => (0, 0),
        Instruction::Plain(opcode) => plain_effect(*opcode)?,
        Instruction::Push(_) => (0, 1),
        Instruction::Load(kind, _) => (0, kind.width()),
        Instruction::Store(kind, _) => (kind.width(), 0),
        Instruction::IInc(_, _) => (0, 0),
        Instruction::Ldc(constant) => (0, if constant.is_wide() { 2 } else { 1 }),
        Instruction::Field(op, field) => {
            let width = FieldType::parse(&field.descriptor).ok()?.slot_width();
            match op {
                FieldOp::GetStatic => (0, width),
                FieldOp::PutStatic => (width, 0),
                FieldOp::GetField => (1, width),
                FieldOp::PutField => (1 + width, 0),
            }
        }
        Instruction::Invoke { kind, method, .. } => {
            let descriptor = MethodDescriptor::parse(&method.descriptor).ok()?;
            let has_this = *kind != InvokeType::Static;
            let pops = descriptor.parameter_length(has_this) as u16;
            (pops, descriptor.return_width())
        }
        Instruction::InvokeDynamic { descriptor, .. } => {
            let descriptor = MethodDescriptor::parse(descriptor).ok()?;
            (descriptor.parameter_length(false) as u16, descriptor.return_width())
        }
        Instruction::Type(TypeOp::New, _) => (0, 1),
        Instruction::Type(_, _) => (1, 1),
        Instruction::NewArray(_) => (1, 1),
        Instruction::MultiANewArray(_, dimensions) => (*dimensions as u16, 1),
        Instruction::Jump(kind, _) => {
            use super::JumpKind::*;
            match kind {
                If(_) | IfNull(_) => (1, 0),
                IfICmp(_) | IfACmp(_) => (2, 0),
                Goto => (0, 0),
            }
        }
        Instruction::TableSwitch { .. } | Instruction::LookupSwitch { .. } => (1, 0),
    };
    Some(effect)
}

fn plain_effect(opcode: u8) -> Option<(u16, u16)> {
    use opcodes::*;

    let effect = match opcode {
        NOP => (0, 0),
        ACONST_NULL..=ICONST_5 | FCONST_0..=FCONST_2 => (0, 1),
        LCONST_0 | LCONST_1 | DCONST_0 | DCONST_1 => (0, 2),

        // `iaload`, `laload`, `faload`, `daload`, `aaload`, `baload`, `caload`, `saload`
        0x2e | 0x30 | 0x32..=0x35 => (2, 1),
        0x2f | 0x31 => (2, 2),

        // `iastore`, `lastore`, `fastore`, `dastore`, `aastore`, `bastore`, `castore`, `sastore`
        IASTORE | 0x51 | 0x53..=SASTORE => (3, 0),
        LASTORE | DASTORE => (4, 0),

        POP => (1, 0),
        POP2 => (2, 0),
        DUP => (1, 2),
        DUP_X1 => (2, 3),
        DUP_X2 => (3, 4),
        DUP2 => (2, 4),
        DUP2_X1 => (3, 5),
        DUP2_X2 => (4, 6),
        SWAP => (2, 2),

        // Binary arithmetic alternates `i`, `l`, `f`, `d` from `iadd` to `drem`
        op @ IADD..=0x73 => {
            if (op - IADD) % 2 == 0 {
                (2, 1)
            } else {
                (4, 2)
            }
        }
        0x74 | 0x76 => (1, 1), // `ineg`, `fneg`
        0x75 | 0x77 => (2, 2), // `lneg`, `dneg`
        0x78 | 0x7a | 0x7c => (2, 1), // `ishl`, `ishr`, `iushr`
        0x79 | 0x7b | 0x7d => (3, 2), // `lshl`, `lshr`, `lushr`
        0x7e | 0x80 | 0x82 => (2, 1), // `iand`, `ior`, `ixor`
        0x7f | 0x81 | LXOR => (4, 2), // `land`, `lor`, `lxor`

        // Conversions
        I2L | 0x87 | 0x8c | 0x8d => (1, 2), // `i2l`, `i2d`, `f2l`, `f2d`
        0x86 | 0x8b | 0x91..=I2S => (1, 1), // `i2f`, `f2i`, `i2b`, `i2c`, `i2s`
        0x88 | 0x89 | D2I | 0x90 => (2, 1), // `l2i`, `l2f`, `d2i`, `d2f`
        0x8a | 0x8f => (2, 2),              // `l2d`, `d2l`

        LCMP => (4, 1),
        0x95 | 0x96 => (2, 1), // `fcmpl`, `fcmpg`
        0x97 | DCMPG => (4, 1),

        IRETURN | FRETURN | ARETURN => (1, 0),
        LRETURN | DRETURN => (2, 0),
        RETURN => (0, 0),

        ARRAYLENGTH => (1, 1),
        ATHROW => (1, 0),
        MONITORENTER | MONITOREXIT => (1, 0),
        _ => return None,
    };
    Some(effect)
}

/// Deepest the operand stack gets while running the instructions in sequence from an empty stack
///
/// Control flow is ignored, so this is only meaningful for straight-line snippets (like a method
/// prologue). Returns `None` if some effect is unknown or the sequence pops more than it pushed.
pub fn peak_stack_depth(instructions: &[Instruction]) -> Option<u16> {
    let mut depth: u16 = 0;
    let mut peak: u16 = 0;
    for insn in instructions {
        let (pops, pushes) = stack_effect(insn)?;
        depth = depth.checked_sub(pops)?.checked_add(pushes)?;
        peak = peak.max(depth);
    }
    Some(peak)
}
