use super::{Attribute, ClassConstantIndex, Constant, Serialize, Version};
use crate::jvm::{ClassAccessFlags, FieldAccessFlags, MethodAccessFlags};
use crate::util::OffsetVec;
use byteorder::WriteBytesExt;

/// Representation of the [`class` file format of the JVM][0], ready to be written out
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html
#[derive(Debug)]
pub struct ClassFile {
    pub version: Version,
    pub constants: OffsetVec<Constant>,
    pub access_flags: ClassAccessFlags,
    pub this_class: ClassConstantIndex,

    /// Only `java/lang/Object` has no superclass
    pub super_class: Option<ClassConstantIndex>,
    pub interfaces: Vec<ClassConstantIndex>,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
    pub attributes: Vec<Attribute>,
}

impl ClassFile {
    /// Magic header bytes that go at the front of the serialized class file
    pub const MAGIC: u32 = 0xCAFE_BABE;
}

impl Serialize for ClassFile {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        ClassFile::MAGIC.serialize(writer)?;
        self.version.serialize(writer)?;
        self.constants.serialize(writer)?;
        self.access_flags.serialize(writer)?;
        self.this_class.serialize(writer)?;
        match self.super_class {
            Some(super_class) => super_class.serialize(writer)?,
            None => 0u16.serialize(writer)?,
        }
        self.interfaces.serialize(writer)?;
        self.fields.serialize(writer)?;
        self.methods.serialize(writer)?;
        self.attributes.serialize(writer)?;
        Ok(())
    }
}

/// The count written is one more than the largest index, not the number of entries
impl Serialize for OffsetVec<Constant> {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        (self.offset_len().0 as u16).serialize(writer)?;
        for (_, _, constant) in self {
            constant.serialize(writer)?;
        }
        Ok(())
    }
}

/// Field or method declared by a class or interface
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.5
/// [1]: https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.6
#[derive(Debug)]
pub struct Member<Flags> {
    pub access_flags: Flags,
    pub name_index: super::Utf8ConstantIndex,
    pub descriptor_index: super::Utf8ConstantIndex,
    pub attributes: Vec<Attribute>,
}

pub type Field = Member<FieldAccessFlags>;
pub type Method = Member<MethodAccessFlags>;

impl<Flags: Serialize> Serialize for Member<Flags> {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.access_flags.serialize(writer)?;
        self.name_index.serialize(writer)?;
        self.descriptor_index.serialize(writer)?;
        self.attributes.serialize(writer)?;
        Ok(())
    }
}
