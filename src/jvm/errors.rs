use super::class_file::{Constant, Version};
use super::code::Label;
use std::fmt;

/// Everything that can go wrong while decoding, editing, or encoding a class
#[derive(Debug)]
pub enum Error {
    /// Input is not a well-formed class file
    Malformed { offset: usize, kind: MalformedKind },

    /// Input is well-formed, but uses something that isn't modelled
    Unsupported {
        offset: usize,
        construct: UnsupportedConstruct,
    },

    /// Object model cannot be turned back into a class file
    Encode(EncodeError),

    /// Method body cannot be edited as requested
    Edit(EditError),

    IoError(std::io::Error),
}

impl Error {
    pub fn malformed(offset: usize, kind: MalformedKind) -> Error {
        Error::Malformed { offset, kind }
    }

    pub fn unsupported(offset: usize, construct: UnsupportedConstruct) -> Error {
        Error::Unsupported { offset, construct }
    }

    /// Byte offset in the input where decoding failed
    pub fn offset(&self) -> Option<usize> {
        match self {
            Error::Malformed { offset, .. } | Error::Unsupported { offset, .. } => Some(*offset),
            Error::Encode(_) | Error::Edit(_) | Error::IoError(_) => None,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum MalformedKind {
    BadMagic(u32),
    UnsupportedVersion(Version),
    UnexpectedEof,
    TrailingBytes(usize),

    /// Constant index is zero, past the end of the pool, or the unusable half of a `long`/`double`
    InvalidConstantIndex(u16),

    /// Constant exists but has the wrong kind for where it is used
    ConstantTypeMismatch {
        index: u16,
        expected: &'static str,
    },
    UnknownConstantTag(u8),
    InvalidModifiedUtf8,
    InvalidHandleKind(u8),
    InvalidDescriptor(String),

    /// Non-root class without a superclass
    MissingSuperclass,
    AttributeLengthMismatch {
        name: String,
        declared: u32,
        consumed: usize,
    },
    MissingBootstrapMethod(u16),

    InvalidCodeLength(u32),
    UnknownOpcode(u8),
    InvalidWideOpcode(u8),
    InvalidArrayType(u8),

    /// `tableswitch` with `high < low`, or `lookupswitch` with a negative pair count
    InvalidSwitch,

    /// Offset inside the method body which isn't the start of an instruction
    InvalidCodeOffset(i64),
    InvalidFrameType(u8),
    InvalidVerificationType(u8),
}

/// Constructs which are valid in a class file but not modelled here
#[derive(Debug, PartialEq)]
pub enum UnsupportedConstruct {
    Attribute(String),
    Opcode(u8),

    /// Constant tag (eg. `CONSTANT_Dynamic`) used by a modelled structure
    Constant(u8),

    /// Utf8 constant holding an unpaired surrogate
    LoneSurrogate,
}

#[derive(Debug)]
pub enum EncodeError {
    ConstantPoolOverflow {
        constant: Constant,
        offset: u16,
    },

    /// String is longer than 65535 bytes once encoded as modified UTF-8
    Utf8TooLong(usize),

    /// Label is the target of some instruction or range, but is never placed in the body
    UnplacedLabel(Label),

    /// Label is placed at two positions in the body
    DuplicateLabel(Label),

    /// Jump needs more than the 16 bits available for branch offsets
    BranchOffsetOverflow {
        target: Label,
        offset: isize,
    },

    /// Method body is longer than 65535 bytes
    CodeTooLarge(usize),

    /// Two frames are placed at the same bytecode offset
    ConflictingFrames(usize),
    InvalidFrame {
        offset: usize,
        reason: &'static str,
    },

    /// Line number or frame with no instruction after it
    TrailingMarker(&'static str),
    EmptyTableSwitch,

    /// Range whose end is placed before its start
    InvertedRange {
        start: Label,
        end: Label,
    },
    InvalidDescriptor(String),

    /// `ConstantValue` can only hold numbers and strings
    InvalidConstantValue(String),

    /// Too many elements to count with a `u16`
    TooManyItems {
        what: &'static str,
        count: usize,
    },
    MissingSuperclass(String),
}

#[derive(Debug, PartialEq)]
pub enum EditError {
    /// Method is abstract or native
    NoCode,
    IndexOutOfBounds { index: usize, len: usize },

    /// `max_stack` would grow past 65535
    StackOverflow { max_stack: u16, extra: u16 },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Malformed { offset, kind } => {
                write!(f, "malformed class file at byte {}: {:?}", offset, kind)
            }
            Error::Unsupported { offset, construct } => {
                write!(f, "unsupported construct at byte {}: {:?}", offset, construct)
            }
            Error::Encode(err) => write!(f, "cannot encode class: {:?}", err),
            Error::Edit(err) => write!(f, "cannot edit method: {:?}", err),
            Error::IoError(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}

impl From<EncodeError> for Error {
    fn from(err: EncodeError) -> Error {
        Error::Encode(err)
    }
}

impl From<EditError> for Error {
    fn from(err: EditError) -> Error {
        Error::Edit(err)
    }
}
