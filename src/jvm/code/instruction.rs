use super::{Frame, Handle, Label, LoadableConstant};
use crate::jvm::BaseType;
use std::ops::Not;

/// One entry in a method body
///
/// Besides real bytecode instructions, the list holds zero-width markers (`Label`, `LineNumber`,
/// `Frame`) which attach to the position of the next real instruction. Operands that live in the
/// constant pool in the class file (member references, literals, type names) are stored by value,
/// so that the pool can be rebuilt from scratch when encoding.
///
/// A handful of opcode families are folded together: the short `xload_<n>`/`xstore_<n>` forms and
/// `wide` variants become `Load`/`Store`/`IInc`, `bipush`/`sipush` become `Push`, `ldc`/`ldc_w`/
/// `ldc2_w` become `Ldc`, and `goto_w` becomes `Jump(Goto)`. The encoder picks the smallest form.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-6.html#jvms-6.5
#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    /// Marks a position that other instructions or ranges refer to
    Label(Label),

    /// Source line of the instructions that follow
    LineNumber(u16),

    /// Stack map frame describing the state at the next instruction
    Frame(Frame),

    /// Instruction with no operands (arithmetic, array access, stack shuffling, returns, ...)
    ///
    /// The payload is the opcode (see [`opcodes`]).
    Plain(u8),

    /// `bipush` or `sipush`
    Push(i16),

    Load(ValueKind, u16),
    Store(ValueKind, u16),

    /// Increment local variable by constant
    IInc(u16, i16),

    /// Push a constant from the constant pool
    Ldc(LoadableConstant),

    Field(FieldOp, MemberRef),

    Invoke {
        kind: InvokeType,
        method: MemberRef,

        /// Is the owner an interface? (always true for `invokeinterface`, and may be true for
        /// `invokestatic` and `invokespecial`)
        is_interface: bool,
    },

    InvokeDynamic {
        bootstrap: BootstrapMethod,
        name: String,
        descriptor: String,
    },

    /// Instruction taking a class operand (internal name or array descriptor)
    Type(TypeOp, String),

    /// Create a new array of primitives
    NewArray(BaseType),

    /// Create a multi-dimensional array, filling in the first `dimensions` dimensions
    MultiANewArray(String, u8),

    Jump(JumpKind, Label),

    /// Jump to `targets[value - low]`, or to `default` if out of range
    TableSwitch {
        default: Label,
        low: i32,
        targets: Vec<Label>,
    },

    /// Jump to the target matching the value, or to `default`
    LookupSwitch {
        default: Label,
        pairs: Vec<(i32, Label)>,
    },
}

impl Instruction {
    /// Zero-width markers which don't correspond to bytecode
    pub fn is_pseudo(&self) -> bool {
        matches!(
            self,
            Instruction::Label(_) | Instruction::LineNumber(_) | Instruction::Frame(_)
        )
    }

    pub fn get_static(owner: &str, name: &str, descriptor: &str) -> Instruction {
        Instruction::Field(FieldOp::GetStatic, MemberRef::new(owner, name, descriptor))
    }

    pub fn invoke_virtual(owner: &str, name: &str, descriptor: &str) -> Instruction {
        Instruction::Invoke {
            kind: InvokeType::Virtual,
            method: MemberRef::new(owner, name, descriptor),
            is_interface: false,
        }
    }

    pub fn ldc_string<S: Into<String>>(string: S) -> Instruction {
        Instruction::Ldc(LoadableConstant::String(string.into()))
    }
}

/// Reference to a field or method of some class
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MemberRef {
    /// Internal name of the class declaring the member
    pub owner: String,
    pub name: String,
    pub descriptor: String,
}

impl MemberRef {
    pub fn new(owner: &str, name: &str, descriptor: &str) -> MemberRef {
        MemberRef {
            owner: owner.to_owned(),
            name: name.to_owned(),
            descriptor: descriptor.to_owned(),
        }
    }
}

/// Bootstrap method of an `invokedynamic` call site
#[derive(Clone, Debug, PartialEq)]
pub struct BootstrapMethod {
    pub handle: Handle,
    pub arguments: Vec<LoadableConstant>,
}

/// Type of value held in a local variable slot
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum ValueKind {
    Int,
    Long,
    Float,
    Double,
    Reference,
}

impl ValueKind {
    /// Order used by the `iload`/`lload`/`fload`/`dload`/`aload` opcode families
    pub(crate) const ALL: [ValueKind; 5] = [
        ValueKind::Int,
        ValueKind::Long,
        ValueKind::Float,
        ValueKind::Double,
        ValueKind::Reference,
    ];

    pub(crate) fn position(&self) -> u8 {
        match self {
            ValueKind::Int => 0,
            ValueKind::Long => 1,
            ValueKind::Float => 2,
            ValueKind::Double => 3,
            ValueKind::Reference => 4,
        }
    }

    /// Number of stack or local slots taken by the value
    pub fn width(&self) -> u16 {
        match self {
            ValueKind::Long | ValueKind::Double => 2,
            _ => 1,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum FieldOp {
    GetStatic,
    PutStatic,
    GetField,
    PutField,
}

/// Type of method to invoke
///
/// `invokedynamic` is kept separate because it refers to a call site, not to a method.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum InvokeType {
    Virtual,
    Special,
    Static,
    Interface,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum TypeOp {
    New,
    ANewArray,
    CheckCast,
    InstanceOf,
}

/// Kind of branch
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum JumpKind {
    /// Compare an `int` against zero (`ifeq`, `ifne`, `iflt`, `ifge`, `ifgt`, `ifle`)
    If(OrdComparison),

    /// Compare two `int`s (`if_icmpeq`, ..., `if_icmple`)
    IfICmp(OrdComparison),

    /// Compare two references (`if_acmpeq`, `if_acmpne`)
    IfACmp(EqComparison),

    /// Compare a reference against `null` (`ifnull`, `ifnonnull`)
    IfNull(EqComparison),
    Goto,
}

/// Ordered comparison operators
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum OrdComparison {
    EQ,
    NE,
    LT,
    GE,
    GT,
    LE,
}

impl OrdComparison {
    /// Order used by the `if<cond>` and `if_icmp<cond>` opcode families
    pub(crate) const ALL: [OrdComparison; 6] = [
        OrdComparison::EQ,
        OrdComparison::NE,
        OrdComparison::LT,
        OrdComparison::GE,
        OrdComparison::GT,
        OrdComparison::LE,
    ];

    pub(crate) fn position(&self) -> u8 {
        match self {
            OrdComparison::EQ => 0,
            OrdComparison::NE => 1,
            OrdComparison::LT => 2,
            OrdComparison::GE => 3,
            OrdComparison::GT => 4,
            OrdComparison::LE => 5,
        }
    }
}

impl Not for OrdComparison {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            OrdComparison::EQ => OrdComparison::NE,
            OrdComparison::GE => OrdComparison::LT,
            OrdComparison::GT => OrdComparison::LE,
            OrdComparison::LE => OrdComparison::GT,
            OrdComparison::LT => OrdComparison::GE,
            OrdComparison::NE => OrdComparison::EQ,
        }
    }
}

/// Equality/inequality comparison operators
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum EqComparison {
    EQ,
    NE,
}

impl Not for EqComparison {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            EqComparison::EQ => EqComparison::NE,
            EqComparison::NE => EqComparison::EQ,
        }
    }
}

/// Opcode values
///
/// Only the opcodes which are referred to by name somewhere are listed. Zero-operand opcodes
/// which aren't listed are still valid payloads for [`Instruction::Plain`].
pub mod opcodes {
    pub const NOP: u8 = 0x00;
    pub const ACONST_NULL: u8 = 0x01;
    pub const ICONST_M1: u8 = 0x02;
    pub const ICONST_0: u8 = 0x03;
    pub const ICONST_1: u8 = 0x04;
    pub const ICONST_5: u8 = 0x08;
    pub const LCONST_0: u8 = 0x09;
    pub const LCONST_1: u8 = 0x0a;
    pub const FCONST_0: u8 = 0x0b;
    pub const FCONST_2: u8 = 0x0d;
    pub const DCONST_0: u8 = 0x0e;
    pub const DCONST_1: u8 = 0x0f;
    pub const BIPUSH: u8 = 0x10;
    pub const SIPUSH: u8 = 0x11;
    pub const LDC: u8 = 0x12;
    pub const LDC_W: u8 = 0x13;
    pub const LDC2_W: u8 = 0x14;
    pub const ILOAD: u8 = 0x15;
    pub const ILOAD_0: u8 = 0x1a;
    pub const IALOAD: u8 = 0x2e;
    pub const SALOAD: u8 = 0x35;
    pub const ISTORE: u8 = 0x36;
    pub const ISTORE_0: u8 = 0x3b;
    pub const IASTORE: u8 = 0x4f;
    pub const LASTORE: u8 = 0x50;
    pub const DASTORE: u8 = 0x52;
    pub const SASTORE: u8 = 0x56;
    pub const POP: u8 = 0x57;
    pub const POP2: u8 = 0x58;
    pub const DUP: u8 = 0x59;
    pub const DUP_X1: u8 = 0x5a;
    pub const DUP_X2: u8 = 0x5b;
    pub const DUP2: u8 = 0x5c;
    pub const DUP2_X1: u8 = 0x5d;
    pub const DUP2_X2: u8 = 0x5e;
    pub const SWAP: u8 = 0x5f;
    pub const IADD: u8 = 0x60;
    pub const LXOR: u8 = 0x83;
    pub const IINC: u8 = 0x84;
    pub const I2L: u8 = 0x85;
    pub const D2I: u8 = 0x8e;
    pub const I2S: u8 = 0x93;
    pub const LCMP: u8 = 0x94;
    pub const DCMPG: u8 = 0x98;
    pub const IFEQ: u8 = 0x99;
    pub const IF_ICMPEQ: u8 = 0x9f;
    pub const IF_ACMPEQ: u8 = 0xa5;
    pub const IF_ACMPNE: u8 = 0xa6;
    pub const GOTO: u8 = 0xa7;
    pub const JSR: u8 = 0xa8;
    pub const RET: u8 = 0xa9;
    pub const TABLESWITCH: u8 = 0xaa;
    pub const LOOKUPSWITCH: u8 = 0xab;
    pub const IRETURN: u8 = 0xac;
    pub const LRETURN: u8 = 0xad;
    pub const FRETURN: u8 = 0xae;
    pub const DRETURN: u8 = 0xaf;
    pub const ARETURN: u8 = 0xb0;
    pub const RETURN: u8 = 0xb1;
    pub const GETSTATIC: u8 = 0xb2;
    pub const PUTSTATIC: u8 = 0xb3;
    pub const GETFIELD: u8 = 0xb4;
    pub const PUTFIELD: u8 = 0xb5;
    pub const INVOKEVIRTUAL: u8 = 0xb6;
    pub const INVOKESPECIAL: u8 = 0xb7;
    pub const INVOKESTATIC: u8 = 0xb8;
    pub const INVOKEINTERFACE: u8 = 0xb9;
    pub const INVOKEDYNAMIC: u8 = 0xba;
    pub const NEW: u8 = 0xbb;
    pub const NEWARRAY: u8 = 0xbc;
    pub const ANEWARRAY: u8 = 0xbd;
    pub const ARRAYLENGTH: u8 = 0xbe;
    pub const ATHROW: u8 = 0xbf;
    pub const CHECKCAST: u8 = 0xc0;
    pub const INSTANCEOF: u8 = 0xc1;
    pub const MONITORENTER: u8 = 0xc2;
    pub const MONITOREXIT: u8 = 0xc3;
    pub const WIDE: u8 = 0xc4;
    pub const MULTIANEWARRAY: u8 = 0xc5;
    pub const IFNULL: u8 = 0xc6;
    pub const IFNONNULL: u8 = 0xc7;
    pub const GOTO_W: u8 = 0xc8;
    pub const JSR_W: u8 = 0xc9;

    /// Opcodes with no operands, which are carried as-is by [`super::Instruction::Plain`]
    pub fn is_plain(opcode: u8) -> bool {
        matches!(
            opcode,
            NOP..=DCONST_1
                | IALOAD..=SALOAD
                | IASTORE..=LXOR
                | I2L..=DCMPG
                | IRETURN..=RETURN
                | ARRAYLENGTH
                | ATHROW
                | MONITORENTER
                | MONITOREXIT
        )
    }
}

impl FieldOp {
    pub(crate) fn opcode(&self) -> u8 {
        match self {
            FieldOp::GetStatic => opcodes::GETSTATIC,
            FieldOp::PutStatic => opcodes::PUTSTATIC,
            FieldOp::GetField => opcodes::GETFIELD,
            FieldOp::PutField => opcodes::PUTFIELD,
        }
    }
}

impl TypeOp {
    pub(crate) fn opcode(&self) -> u8 {
        match self {
            TypeOp::New => opcodes::NEW,
            TypeOp::ANewArray => opcodes::ANEWARRAY,
            TypeOp::CheckCast => opcodes::CHECKCAST,
            TypeOp::InstanceOf => opcodes::INSTANCEOF,
        }
    }
}

impl InvokeType {
    pub(crate) fn opcode(&self) -> u8 {
        match self {
            InvokeType::Virtual => opcodes::INVOKEVIRTUAL,
            InvokeType::Special => opcodes::INVOKESPECIAL,
            InvokeType::Static => opcodes::INVOKESTATIC,
            InvokeType::Interface => opcodes::INVOKEINTERFACE,
        }
    }
}

impl JumpKind {
    pub(crate) fn opcode(&self) -> u8 {
        match self {
            JumpKind::If(cmp) => opcodes::IFEQ + cmp.position(),
            JumpKind::IfICmp(cmp) => opcodes::IF_ICMPEQ + cmp.position(),
            JumpKind::IfACmp(EqComparison::EQ) => opcodes::IF_ACMPEQ,
            JumpKind::IfACmp(EqComparison::NE) => opcodes::IF_ACMPNE,
            JumpKind::IfNull(EqComparison::EQ) => opcodes::IFNULL,
            JumpKind::IfNull(EqComparison::NE) => opcodes::IFNONNULL,
            JumpKind::Goto => opcodes::GOTO,
        }
    }

    /// Inverse of [`JumpKind::opcode`] (`goto_w` is folded into `Goto`)
    pub(crate) fn from_opcode(opcode: u8) -> Option<JumpKind> {
        let kind = match opcode {
            0x99..=0x9e => JumpKind::If(OrdComparison::ALL[(opcode - opcodes::IFEQ) as usize]),
            0x9f..=0xa4 => {
                JumpKind::IfICmp(OrdComparison::ALL[(opcode - opcodes::IF_ICMPEQ) as usize])
            }
            opcodes::IF_ACMPEQ => JumpKind::IfACmp(EqComparison::EQ),
            opcodes::IF_ACMPNE => JumpKind::IfACmp(EqComparison::NE),
            opcodes::IFNULL => JumpKind::IfNull(EqComparison::EQ),
            opcodes::IFNONNULL => JumpKind::IfNull(EqComparison::NE),
            opcodes::GOTO | opcodes::GOTO_W => JumpKind::Goto,
            _ => return None,
        };
        Some(kind)
    }
}

/// `atype` operand of `newarray`
pub(crate) fn array_type_code(base_type: BaseType) -> u8 {
    match base_type {
        BaseType::Boolean => 4,
        BaseType::Char => 5,
        BaseType::Float => 6,
        BaseType::Double => 7,
        BaseType::Byte => 8,
        BaseType::Short => 9,
        BaseType::Int => 10,
        BaseType::Long => 11,
    }
}

pub(crate) fn array_type_from_code(code: u8) -> Option<BaseType> {
    let base_type = match code {
        4 => BaseType::Boolean,
        5 => BaseType::Char,
        6 => BaseType::Float,
        7 => BaseType::Double,
        8 => BaseType::Byte,
        9 => BaseType::Short,
        10 => BaseType::Int,
        11 => BaseType::Long,
        _ => return None,
    };
    Some(base_type)
}
