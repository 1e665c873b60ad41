use super::Label;
use crate::jvm::class_file::{ClassConstantIndex, Serialize};
use crate::util::Width;
use byteorder::WriteBytesExt;

/// These types are from [this hierarchy][0]
///
/// The type parameters vary with the representation: in the object model classes are internal
/// names and `new` instructions are labels, while in the class file they are constant pool
/// indices and bytecode offsets.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.10.1.2
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub enum VerificationType<Cls, U> {
    /// Unusable slot (eg. the second half of a `long`, or an unassigned local)
    Top,
    Integer,
    Float,
    Double,
    Long,
    Null,

    /// In the constructor, the `this` parameter starts with this type then turns into an object
    /// type after `<init>` is called
    UninitializedThis,

    /// Object type
    Object(Cls),

    /// State of an object after `new` has been called but `<init>` has not been called, pointing
    /// at the `new` instruction
    Uninitialized(U),
}

impl<Cls, U> VerificationType<Cls, U> {
    /// Is this type is a reference type?
    pub fn is_reference(&self) -> bool {
        match self {
            VerificationType::Top
            | VerificationType::Integer
            | VerificationType::Float
            | VerificationType::Double
            | VerificationType::Long => false,

            VerificationType::Null
            | VerificationType::UninitializedThis
            | VerificationType::Object(_)
            | VerificationType::Uninitialized(_) => true,
        }
    }

    /// Convert the class and offset representations
    pub fn try_map<Cls2, U2, E>(
        &self,
        map_class: impl FnOnce(&Cls) -> Result<Cls2, E>,
        map_offset: impl FnOnce(&U) -> Result<U2, E>,
    ) -> Result<VerificationType<Cls2, U2>, E> {
        Ok(match self {
            VerificationType::Top => VerificationType::Top,
            VerificationType::Integer => VerificationType::Integer,
            VerificationType::Float => VerificationType::Float,
            VerificationType::Double => VerificationType::Double,
            VerificationType::Long => VerificationType::Long,
            VerificationType::Null => VerificationType::Null,
            VerificationType::UninitializedThis => VerificationType::UninitializedThis,
            VerificationType::Object(cls) => VerificationType::Object(map_class(cls)?),
            VerificationType::Uninitialized(off) => {
                VerificationType::Uninitialized(map_offset(off)?)
            }
        })
    }
}

impl Serialize for VerificationType<ClassConstantIndex, u16> {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        match self {
            VerificationType::Top => 0u8.serialize(writer)?,
            VerificationType::Integer => 1u8.serialize(writer)?,
            VerificationType::Float => 2u8.serialize(writer)?,
            VerificationType::Double => 3u8.serialize(writer)?,
            VerificationType::Long => 4u8.serialize(writer)?,
            VerificationType::Null => 5u8.serialize(writer)?,
            VerificationType::UninitializedThis => 6u8.serialize(writer)?,
            VerificationType::Object(cls) => {
                7u8.serialize(writer)?;
                cls.serialize(writer)?;
            }
            VerificationType::Uninitialized(off) => {
                8u8.serialize(writer)?;
                off.serialize(writer)?;
            }
        };
        Ok(())
    }
}

impl<Cls, A> Width for VerificationType<Cls, A> {
    fn width(&self) -> usize {
        match self {
            VerificationType::Double | VerificationType::Long => 2,
            _ => 1,
        }
    }
}

/// Stack map frame, as a difference from the previous frame in the method
///
/// Frames are kept in the compressed form they have in the class file: since each one is
/// described relative to the one before, inserting instructions only changes offsets, which are
/// recomputed from the frame's position when encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Same locals as the previous frame, empty stack
    Same,

    /// Same locals as the previous frame, one stack entry
    SameLocalsOneStack(VerificationType<String, Label>),

    /// Previous frame's locals without the last 1 to 3 of them, empty stack
    Chop(u8),

    /// Previous frame's locals with 1 to 3 extra, empty stack
    Append(Vec<VerificationType<String, Label>>),

    /// Locals and stack given in full
    Full {
        locals: Vec<VerificationType<String, Label>>,
        stack: Vec<VerificationType<String, Label>>,
    },
}

impl Frame {
    /// All the verification types mentioned by the frame
    pub fn types(&self) -> Vec<&VerificationType<String, Label>> {
        match self {
            Frame::Same | Frame::Chop(_) => vec![],
            Frame::SameLocalsOneStack(stack) => vec![stack],
            Frame::Append(locals) => locals.iter().collect(),
            Frame::Full { locals, stack } => locals.iter().chain(stack.iter()).collect(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn verification_type_tags() {
        let mut bytes = vec![];
        VerificationType::<ClassConstantIndex, u16>::Top
            .serialize(&mut bytes)
            .unwrap();
        VerificationType::<ClassConstantIndex, u16>::Uninitialized(0x0102)
            .serialize(&mut bytes)
            .unwrap();
        assert_eq!(bytes, vec![0, 8, 1, 2]);
        assert_eq!(VerificationType::<String, Label>::Long.width(), 2);
    }
}
