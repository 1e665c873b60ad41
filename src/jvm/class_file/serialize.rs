use crate::jvm::{Error, MalformedKind};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

/// Utility trait for serializing data inside class files
///
/// Java class files have some peculiarities that make it useful to define an extra trait (instead
/// of just using `serde`):
///
///   - everything is big-endian
///   - tags are always `u8`
///   - when serializing a sequence, the length of the sequence is usually `u16`
///
pub trait Serialize: Sized {
    /// Serialize construct into a binary output stream
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()>;
}

/// Counterpart of [`Serialize`] for fixed-layout pieces of a class file
///
/// Anything whose layout depends on the constant pool is decoded by hand instead.
pub trait Deserialize: Sized {
    fn deserialize(reader: &mut ByteReader<'_>) -> Result<Self, Error>;
}

macro_rules! primitive_codec {
    ($($typ:ty => $write:ident, $read:ident;)*) => {
        $(
            impl Serialize for $typ {
                fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
                    writer.$write::<BigEndian>(*self)
                }
            }

            impl Deserialize for $typ {
                fn deserialize(reader: &mut ByteReader<'_>) -> Result<Self, Error> {
                    let offset = reader.offset();
                    reader
                        .cursor
                        .$read::<BigEndian>()
                        .map_err(|_| Error::malformed(offset, MalformedKind::UnexpectedEof))
                }
            }
        )*
    };
}

primitive_codec! {
    u16 => write_u16, read_u16;
    u32 => write_u32, read_u32;
    i16 => write_i16, read_i16;
    i32 => write_i32, read_i32;
    i64 => write_i64, read_i64;
    f32 => write_f32, read_f32;
    f64 => write_f64, read_f64;
}

impl Serialize for u8 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u8(*self)
    }
}

impl Deserialize for u8 {
    fn deserialize(reader: &mut ByteReader<'_>) -> Result<Self, Error> {
        let offset = reader.offset();
        reader
            .cursor
            .read_u8()
            .map_err(|_| Error::malformed(offset, MalformedKind::UnexpectedEof))
    }
}

impl Serialize for i8 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_i8(*self)
    }
}

impl Deserialize for i8 {
    fn deserialize(reader: &mut ByteReader<'_>) -> Result<Self, Error> {
        let offset = reader.offset();
        reader
            .cursor
            .read_i8()
            .map_err(|_| Error::malformed(offset, MalformedKind::UnexpectedEof))
    }
}

/// Size in `u16` is the first thing serialized/deserialized
impl<A: Serialize> Serialize for Vec<A> {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        (self.len() as u16).serialize(writer)?;
        for elem in self {
            elem.serialize(writer)?;
        }
        Ok(())
    }
}

impl<A: Deserialize> Deserialize for Vec<A> {
    fn deserialize(reader: &mut ByteReader<'_>) -> Result<Self, Error> {
        let len = reader.read_u16()?;
        (0..len).map(|_| A::deserialize(reader)).collect()
    }
}

/// Big-endian reader over a slice of the input, tracking absolute offsets for error reporting
#[derive(Clone, Debug)]
pub struct ByteReader<'a> {
    cursor: Cursor<&'a [u8]>,

    /// Offset of the start of the slice inside the whole class file
    base: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> ByteReader<'a> {
        ByteReader::new_at(bytes, 0)
    }

    /// Reader over a sub-slice of the input which starts at `base` in the whole input
    pub fn new_at(bytes: &'a [u8], base: usize) -> ByteReader<'a> {
        ByteReader {
            cursor: Cursor::new(bytes),
            base,
        }
    }

    /// Absolute offset of the next byte to be read
    pub fn offset(&self) -> usize {
        self.base + self.cursor.position() as usize
    }

    /// Offset of the next byte relative to the start of this reader
    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    pub fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.position())
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read<A: Deserialize>(&mut self) -> Result<A, Error> {
        A::deserialize(self)
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        self.read()
    }

    pub fn read_u16(&mut self) -> Result<u16, Error> {
        self.read()
    }

    pub fn read_u32(&mut self) -> Result<u32, Error> {
        self.read()
    }

    /// Borrow the next `len` bytes and advance past them
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], Error> {
        if self.remaining() < len {
            return Err(Error::malformed(self.offset(), MalformedKind::UnexpectedEof));
        }
        let start = self.position();
        let bytes: &'a [u8] = *self.cursor.get_ref();
        self.cursor.set_position((start + len) as u64);
        Ok(&bytes[start..start + len])
    }

    /// Sub-reader over the next `len` bytes (offsets stay absolute)
    pub fn split(&mut self, len: usize) -> Result<ByteReader<'a>, Error> {
        let base = self.offset();
        let bytes = self.read_bytes(len)?;
        Ok(ByteReader::new_at(bytes, base))
    }

    /// Skip forward so that the position is a multiple of four, relative to the start of this
    /// reader (used for `tableswitch` and `lookupswitch` padding)
    pub fn align_to_four(&mut self) -> Result<(), Error> {
        let padding = (4 - self.position() % 4) % 4;
        self.read_bytes(padding).map(|_| ())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn big_endian_values() {
        let mut reader = ByteReader::new(&[0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x2A, 0xFF]);
        assert_eq!(reader.read_u32().unwrap(), 0xCAFEBABE);
        assert_eq!(reader.read_u16().unwrap(), 42);
        assert_eq!(reader.read::<i8>().unwrap(), -1);
        assert!(reader.is_empty());

        let mut written = vec![];
        0xCAFEBABEu32.serialize(&mut written).unwrap();
        42u16.serialize(&mut written).unwrap();
        (-1i8).serialize(&mut written).unwrap();
        assert_eq!(written, vec![0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x2A, 0xFF]);
    }

    #[test]
    fn truncation_reports_offset() {
        let mut reader = ByteReader::new_at(&[0x00, 0x01, 0x02], 10);
        reader.read_u16().unwrap();
        match reader.read_u32() {
            Err(Error::Malformed { offset, kind }) => {
                assert_eq!(offset, 12);
                assert_eq!(kind, MalformedKind::UnexpectedEof);
            }
            other => panic!("expected truncation, got {:?}", other),
        }
    }

    #[test]
    fn length_prefixed_sequences() {
        let mut reader = ByteReader::new(&[0x00, 0x02, 0x00, 0x07, 0x00, 0x09]);
        assert_eq!(reader.read::<Vec<u16>>().unwrap(), vec![7, 9]);

        let mut written = vec![];
        vec![7u16, 9u16].serialize(&mut written).unwrap();
        assert_eq!(written, vec![0x00, 0x02, 0x00, 0x07, 0x00, 0x09]);
    }

    #[test]
    fn split_keeps_absolute_offsets() {
        let mut reader = ByteReader::new(&[1, 2, 3, 4, 5]);
        reader.read_u8().unwrap();
        let mut inner = reader.split(2).unwrap();
        assert_eq!(inner.offset(), 1);
        assert_eq!(inner.read_u16().unwrap(), 0x0203);
        assert_eq!(reader.offset(), 3);
        assert!(reader.split(3).is_err());
    }
}
