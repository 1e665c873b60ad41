use super::{
    ClassConstantIndex, ConstantIndex, NameAndTypeConstantIndex, Serialize, Utf8ConstantIndex,
};
use crate::jvm::code::VerificationType;
use crate::jvm::InnerClassAccessFlags;
use byteorder::WriteBytesExt;
use std::io::{Error, ErrorKind};

/// Attributes (used in classes, fields, methods, and even on some attributes)
///
/// The representation is designed to be easily extended with custom attributes.
/// While some attributes aren't essential, others are really important (eg. the
/// code attribute for including the actual bytecode).
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.7
#[derive(Debug)]
pub struct Attribute {
    pub name_index: Utf8ConstantIndex,
    pub info: Vec<u8>,
}

impl Serialize for Attribute {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.name_index.serialize(writer)?;

        // Attribute info length is 4 bytes
        (self.info.len() as u32).serialize(writer)?;
        writer.write_all(&self.info)?;

        Ok(())
    }
}

/// Attributes are all stored in the same way (see `Attribute`), but internally
/// they represent very different things. This trait is implemented by things
/// which can be turned into attributes.
pub trait AttributeLike: Serialize {
    /// Name of the attribute
    const NAME: &'static str;
}

/// Optional constant references are encoded as index `0`
fn serialize_optional<W: WriteBytesExt, I: Into<ConstantIndex> + Copy>(
    index: Option<I>,
    writer: &mut W,
) -> std::io::Result<()> {
    match index {
        None => 0u16.serialize(writer),
        Some(index) => index.into().serialize(writer),
    }
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.7.2
pub struct ConstantValue(pub ConstantIndex);

impl Serialize for ConstantValue {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

impl AttributeLike for ConstantValue {
    const NAME: &'static str = "ConstantValue";
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.7.3
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code_array: BytecodeArray,
    pub exception_table: Vec<ExceptionHandler>,
    pub attributes: Vec<Attribute>,
}

impl Serialize for Code {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.max_stack.serialize(writer)?;
        self.max_locals.serialize(writer)?;
        self.code_array.serialize(writer)?;
        self.exception_table.serialize(writer)?;
        self.attributes.serialize(writer)?;
        Ok(())
    }
}

impl AttributeLike for Code {
    const NAME: &'static str = "Code";
}

pub struct ExceptionHandler {
    /// Start of exception handler range (inclusive)
    pub start_pc: u16,

    /// End of exception handler range (exclusive)
    pub end_pc: u16,

    /// Start of the exception handler
    pub handler_pc: u16,

    /// `None` catches everything (used for `finally`)
    pub catch_type: Option<ClassConstantIndex>,
}

impl Serialize for ExceptionHandler {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.start_pc.serialize(writer)?;
        self.end_pc.serialize(writer)?;
        self.handler_pc.serialize(writer)?;
        serialize_optional(self.catch_type, writer)
    }
}

/// Encoded bytecode instructions
pub struct BytecodeArray(pub Vec<u8>);

impl Serialize for BytecodeArray {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        let len = self.0.len() as u32;
        len.serialize(writer)?;
        writer.write_all(&self.0)?;
        Ok(())
    }
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.7.4
#[derive(Debug)]
pub struct StackMapTable(pub Vec<StackMapFrame>);

impl AttributeLike for StackMapTable {
    const NAME: &'static str = "StackMapTable";
}

impl Serialize for StackMapTable {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

/// Frame as it appears in the `StackMapTable`, positioned relative to the previous frame
#[derive(Debug, PartialEq)]
pub enum StackMapFrame {
    /// Frame has the same locals as the previous frame and number of stack items is zero
    /// Tags: 0-63 or 251
    SameLocalsNoStack { offset_delta: u16 },

    /// Frame has the same locals as the previous frame and number of stack items is one
    /// Tags: 64-127 or 247
    SameLocalsOneStack {
        offset_delta: u16,
        stack: VerificationType<ClassConstantIndex, u16>,
    },

    /// Frame is like the previous frame, but without the last `chopped_k` locals
    ///
    /// Note: `chopped_k` must be in the range 1 to 3 inclusive
    /// Tags: 248-250
    ChopLocalsNoStack { offset_delta: u16, chopped_k: u8 },

    /// Frame is like the previous frame, but with 1 to 3 extra locals
    /// Tags: 252-254
    AppendLocalsNoStack {
        offset_delta: u16,
        locals: Vec<VerificationType<ClassConstantIndex, u16>>,
    },

    /// Frame has exactly the locals and stack specified
    /// Tag: 255
    Full {
        offset_delta: u16,
        locals: Vec<VerificationType<ClassConstantIndex, u16>>,
        stack: Vec<VerificationType<ClassConstantIndex, u16>>,
    },
}

impl Serialize for StackMapFrame {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        match self {
            // `same_frame` and `same_frame_extended`
            StackMapFrame::SameLocalsNoStack { offset_delta } => {
                if *offset_delta <= 63 {
                    (*offset_delta as u8).serialize(writer)?;
                } else {
                    251u8.serialize(writer)?;
                    offset_delta.serialize(writer)?;
                }
            }

            // `same_locals_1_stack_item_frame` and `same_locals_1_stack_item_frame_extended`
            StackMapFrame::SameLocalsOneStack {
                offset_delta,
                stack,
            } => {
                if *offset_delta <= 63 {
                    (*offset_delta as u8 + 64).serialize(writer)?;
                } else {
                    247u8.serialize(writer)?;
                    offset_delta.serialize(writer)?;
                }
                stack.serialize(writer)?;
            }

            // `chop_frame`
            StackMapFrame::ChopLocalsNoStack {
                offset_delta,
                chopped_k,
            } => {
                if !(1..=3).contains(chopped_k) {
                    return Err(Error::new(ErrorKind::InvalidInput, "chop frame removes 1-3 locals"));
                }
                (251 - chopped_k).serialize(writer)?;
                offset_delta.serialize(writer)?;
            }

            // `append_frame`
            StackMapFrame::AppendLocalsNoStack {
                offset_delta,
                locals,
            } => {
                let added_k = locals.len();
                if !(1..=3).contains(&added_k) {
                    return Err(Error::new(ErrorKind::InvalidInput, "append frame adds 1-3 locals"));
                }
                (251 + added_k as u8).serialize(writer)?;
                offset_delta.serialize(writer)?;
                for local in locals {
                    local.serialize(writer)?;
                }
            }

            // `full_frame`
            StackMapFrame::Full {
                offset_delta,
                locals,
                stack,
            } => {
                255u8.serialize(writer)?;
                offset_delta.serialize(writer)?;
                locals.serialize(writer)?;
                stack.serialize(writer)?;
            }
        };
        Ok(())
    }
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.7.12
#[derive(Debug)]
pub struct LineNumberTable(pub Vec<LineNumberEntry>);

#[derive(Debug)]
pub struct LineNumberEntry {
    pub start_pc: u16,
    pub line_number: u16,
}

impl AttributeLike for LineNumberTable {
    const NAME: &'static str = "LineNumberTable";
}

impl Serialize for LineNumberTable {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

impl Serialize for LineNumberEntry {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.start_pc.serialize(writer)?;
        self.line_number.serialize(writer)
    }
}

/// Entry shared by `LocalVariableTable` and `LocalVariableTypeTable`
///
/// In the latter, `descriptor_index` points at a generic signature instead of a descriptor.
#[derive(Debug)]
pub struct LocalVariableEntry {
    pub start_pc: u16,
    pub length: u16,
    pub name_index: Utf8ConstantIndex,
    pub descriptor_index: Utf8ConstantIndex,
    pub index: u16,
}

impl Serialize for LocalVariableEntry {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.start_pc.serialize(writer)?;
        self.length.serialize(writer)?;
        self.name_index.serialize(writer)?;
        self.descriptor_index.serialize(writer)?;
        self.index.serialize(writer)
    }
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.7.13
#[derive(Debug)]
pub struct LocalVariableTable(pub Vec<LocalVariableEntry>);

impl AttributeLike for LocalVariableTable {
    const NAME: &'static str = "LocalVariableTable";
}

impl Serialize for LocalVariableTable {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.7.14
#[derive(Debug)]
pub struct LocalVariableTypeTable(pub Vec<LocalVariableEntry>);

impl AttributeLike for LocalVariableTypeTable {
    const NAME: &'static str = "LocalVariableTypeTable";
}

impl Serialize for LocalVariableTypeTable {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

/// Checked exceptions a method declares
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.7.5
#[derive(Debug)]
pub struct Exceptions(pub Vec<ClassConstantIndex>);

impl AttributeLike for Exceptions {
    const NAME: &'static str = "Exceptions";
}

impl Serialize for Exceptions {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.7.10
#[derive(Debug)]
pub struct SourceFile(pub Utf8ConstantIndex);

impl AttributeLike for SourceFile {
    const NAME: &'static str = "SourceFile";
}

impl Serialize for SourceFile {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.7.23
#[derive(Debug)]
pub struct BootstrapMethods(pub Vec<BootstrapMethodEntry>);

#[derive(Debug)]
pub struct BootstrapMethodEntry {
    pub bootstrap_method: ConstantIndex,
    pub bootstrap_arguments: Vec<ConstantIndex>,
}

impl AttributeLike for BootstrapMethods {
    const NAME: &'static str = "BootstrapMethods";
}

impl Serialize for BootstrapMethods {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

impl Serialize for BootstrapMethodEntry {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.bootstrap_method.serialize(writer)?;
        self.bootstrap_arguments.serialize(writer)?;
        Ok(())
    }
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.7.28
#[derive(Debug)]
pub struct NestHost(pub ClassConstantIndex);

impl AttributeLike for NestHost {
    const NAME: &'static str = "NestHost";
}

impl Serialize for NestHost {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.7.29
#[derive(Debug)]
pub struct NestMembers(pub Vec<ClassConstantIndex>);

impl AttributeLike for NestMembers {
    const NAME: &'static str = "NestMembers";
}

impl Serialize for NestMembers {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.7.31
#[derive(Debug)]
pub struct PermittedSubclasses(pub Vec<ClassConstantIndex>);

impl AttributeLike for PermittedSubclasses {
    const NAME: &'static str = "PermittedSubclasses";
}

impl Serialize for PermittedSubclasses {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

/// Every inner class referenced in a class' constant pool must be included in the inner classes
/// attribute on the class.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.7.6
#[derive(Debug)]
pub struct InnerClasses(pub Vec<InnerClass>);

impl AttributeLike for InnerClasses {
    const NAME: &'static str = "InnerClasses";
}

impl Serialize for InnerClasses {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

#[derive(Debug)]
pub struct InnerClass {
    pub inner_class: ClassConstantIndex,

    /// Absent for local and anonymous classes
    pub outer_class: Option<ClassConstantIndex>,

    /// Absent for anonymous classes
    pub inner_name: Option<Utf8ConstantIndex>,
    pub access_flags: InnerClassAccessFlags,
}

impl Serialize for InnerClass {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.inner_class.serialize(writer)?;
        serialize_optional(self.outer_class, writer)?;
        serialize_optional(self.inner_name, writer)?;
        self.access_flags.serialize(writer)?;
        Ok(())
    }
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.7.7
#[derive(Debug)]
pub struct EnclosingMethod {
    pub class: ClassConstantIndex,

    /// Absent when the class is not immediately enclosed by a method or constructor
    pub method: Option<NameAndTypeConstantIndex>,
}

impl AttributeLike for EnclosingMethod {
    const NAME: &'static str = "EnclosingMethod";
}

impl Serialize for EnclosingMethod {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.class.serialize(writer)?;
        serialize_optional(self.method, writer)
    }
}

#[derive(Debug)]
pub struct Signature {
    pub signature: Utf8ConstantIndex,
}

impl AttributeLike for Signature {
    const NAME: &'static str = "Signature";
}

impl Serialize for Signature {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.signature.serialize(writer)?;
        Ok(())
    }
}

/// Marker attributes with an empty body
macro_rules! marker_attribute {
    ($($name:ident),*) => {
        $(
            #[derive(Debug)]
            pub struct $name;

            impl AttributeLike for $name {
                const NAME: &'static str = stringify!($name);
            }

            impl Serialize for $name {
                fn serialize<W: WriteBytesExt>(&self, _writer: &mut W) -> std::io::Result<()> {
                    Ok(())
                }
            }
        )*
    };
}

marker_attribute!(Deprecated, Synthetic);
