use super::class_file::{ByteReader, Deserialize, Serialize};
use super::Error;
use bitflags::bitflags;
use byteorder::WriteBytesExt;

bitflags! {
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.1-200-E.1
    pub struct ClassAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const MODULE = 0x8000;
    }
}

bitflags! {
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.6-200-A.1
    pub struct MethodAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNCHRONIZED = 0x0020;
        const BRIDGE = 0x0040;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
    }
}

bitflags! {
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.5-200-A.1
    pub struct FieldAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const VOLATILE = 0x0040;
        const TRANSIENT = 0x0080;
        const SYNTHETIC = 0x1000;
        const ENUM = 0x4000;
    }
}

bitflags! {
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.7.6-300-D.1-D.1
    pub struct InnerClassAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
    }
}

/// Flags are written as their raw `u16`. Reading drops bits with no assigned meaning, which the
/// JVM ignores anyway.
macro_rules! flags_codec {
    ($($flags:ty),*) => {
        $(
            impl Serialize for $flags {
                fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
                    self.bits().serialize(writer)
                }
            }

            impl Deserialize for $flags {
                fn deserialize(reader: &mut ByteReader<'_>) -> Result<Self, Error> {
                    Ok(<$flags>::from_bits_truncate(reader.read_u16()?))
                }
            }
        )*
    };
}

flags_codec!(
    ClassAccessFlags,
    MethodAccessFlags,
    FieldAccessFlags,
    InnerClassAccessFlags
);

impl MethodAccessFlags {
    /// Abstract and native methods have no `Code` attribute
    pub fn has_code(&self) -> bool {
        !self.intersects(MethodAccessFlags::ABSTRACT | MethodAccessFlags::NATIVE)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reserved_bits_are_dropped() {
        let mut reader = ByteReader::new(&[0x80, 0x21]);
        let flags = ClassAccessFlags::deserialize(&mut reader).unwrap();
        assert_eq!(flags, ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER | ClassAccessFlags::MODULE);

        let mut reader = ByteReader::new(&[0x02, 0x09]);
        let flags = MethodAccessFlags::deserialize(&mut reader).unwrap();
        assert_eq!(flags, MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC);
    }

    #[test]
    fn abstract_and_native_have_no_code() {
        assert!(MethodAccessFlags::PUBLIC.has_code());
        assert!(!(MethodAccessFlags::PUBLIC | MethodAccessFlags::ABSTRACT).has_code());
        assert!(!MethodAccessFlags::NATIVE.has_code());
    }
}
