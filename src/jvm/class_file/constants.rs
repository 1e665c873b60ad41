use super::{
    Attribute, AttributeLike, BootstrapMethodEntry, BootstrapMethods, ByteReader, Deserialize,
    Serialize,
};
use crate::jvm::code::{BootstrapMethod, Handle, LoadableConstant, MemberRef};
use crate::jvm::{EncodeError, Error, MalformedKind, UnsupportedConstruct};
use crate::util::{Offset, OffsetVec, Width};
use byteorder::WriteBytesExt;
use std::borrow::{Borrow, Cow};
use std::collections::HashMap;

/// Class file constants pool builder
///
/// The pool is append only and deduplicating: asking twice for the same constant returns the same
/// index. Once the whole class has been walked, the pool is consumed into a regular
/// [`OffsetVec`].
pub struct ConstantsPool {
    constants: OffsetVec<Constant>,

    utf8s: HashMap<String, Utf8ConstantIndex>,
    classes: HashMap<Utf8ConstantIndex, ClassConstantIndex>,
    strings: HashMap<Utf8ConstantIndex, StringConstantIndex>,
    integers: HashMap<i32, ConstantIndex>,
    floats: HashMap<u32, ConstantIndex>,
    longs: HashMap<i64, ConstantIndex>,
    doubles: HashMap<u64, ConstantIndex>,
    name_and_types: HashMap<(Utf8ConstantIndex, Utf8ConstantIndex), NameAndTypeConstantIndex>,
    fieldrefs: HashMap<(ClassConstantIndex, NameAndTypeConstantIndex), FieldRefConstantIndex>,
    methodrefs:
        HashMap<(ClassConstantIndex, NameAndTypeConstantIndex, bool), MethodRefConstantIndex>,
    method_types: HashMap<Utf8ConstantIndex, ConstantIndex>,
    method_handles: HashMap<(HandleKind, ConstantIndex), ConstantIndex>,
    invoke_dynamics: HashMap<(u16, NameAndTypeConstantIndex), InvokeDynamicConstantIndex>,
}

impl ConstantsPool {
    /// Make a fresh empty constants pool
    pub fn new() -> ConstantsPool {
        ConstantsPool {
            constants: OffsetVec::new_starting_at(Offset(1)),
            utf8s: HashMap::new(),
            classes: HashMap::new(),
            strings: HashMap::new(),
            integers: HashMap::new(),
            floats: HashMap::new(),
            longs: HashMap::new(),
            doubles: HashMap::new(),
            name_and_types: HashMap::new(),
            fieldrefs: HashMap::new(),
            methodrefs: HashMap::new(),
            method_types: HashMap::new(),
            method_handles: HashMap::new(),
            invoke_dynamics: HashMap::new(),
        }
    }

    /// Push a constant into the constant pool, provided there is space for it
    ///
    /// Note: the largest valid index is 65535, indexing starts at 1, and some constants take two
    /// spaces.
    fn push_constant(&mut self, constant: Constant) -> Result<ConstantIndex, ConstantPoolError> {
        let offset = self.constants.offset_len().0;
        if offset + constant.width() > u16::MAX as usize {
            return Err(ConstantPoolError::Overflow {
                constant,
                offset: offset as u16,
            });
        }

        self.constants.push(constant);
        Ok(ConstantIndex(offset as u16))
    }

    /// Consume the pool and return the final vector of constants
    pub fn into_offset_vec(self) -> OffsetVec<Constant> {
        self.constants
    }

    /// Number of entries (not slots) in the pool
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// Get or insert a utf8 constant from the constant pool
    pub fn get_utf8<'a, S: Into<Cow<'a, str>>>(
        &mut self,
        utf8: S,
    ) -> Result<Utf8ConstantIndex, ConstantPoolError> {
        let cow = utf8.into();

        if let Some(idx) = self.utf8s.get::<str>(cow.borrow()) {
            Ok(*idx)
        } else {
            let encoded_len = modified_utf8_len(&cow);
            if encoded_len > u16::MAX as usize {
                return Err(ConstantPoolError::Utf8TooLong(encoded_len));
            }
            let owned = cow.into_owned();
            let constant = Constant::Utf8(owned.clone());
            let idx = Utf8ConstantIndex(self.push_constant(constant)?);
            self.utf8s.insert(owned, idx);
            Ok(idx)
        }
    }

    /// Get or insert a class constant
    ///
    /// The name is an internal name like `java/lang/Object`, or an array descriptor like `[I`.
    pub fn get_class(&mut self, name: &str) -> Result<ClassConstantIndex, ConstantPoolError> {
        let name = self.get_utf8(name)?;
        if let Some(idx) = self.classes.get(&name) {
            Ok(*idx)
        } else {
            let idx = ClassConstantIndex(self.push_constant(Constant::Class(name))?);
            self.classes.insert(name, idx);
            Ok(idx)
        }
    }

    /// Get or insert a string constant from the constant pool
    pub fn get_string(&mut self, string: &str) -> Result<StringConstantIndex, ConstantPoolError> {
        let utf8 = self.get_utf8(string)?;
        if let Some(idx) = self.strings.get(&utf8) {
            Ok(*idx)
        } else {
            let idx = StringConstantIndex(self.push_constant(Constant::String(utf8))?);
            self.strings.insert(utf8, idx);
            Ok(idx)
        }
    }

    pub fn get_integer(&mut self, integer: i32) -> Result<ConstantIndex, ConstantPoolError> {
        if let Some(idx) = self.integers.get(&integer) {
            Ok(*idx)
        } else {
            let idx = self.push_constant(Constant::Integer(integer))?;
            self.integers.insert(integer, idx);
            Ok(idx)
        }
    }

    /// Floats are deduplicated by bit pattern, so distinct NaNs stay distinct
    pub fn get_float(&mut self, float: f32) -> Result<ConstantIndex, ConstantPoolError> {
        if let Some(idx) = self.floats.get(&float.to_bits()) {
            Ok(*idx)
        } else {
            let idx = self.push_constant(Constant::Float(float))?;
            self.floats.insert(float.to_bits(), idx);
            Ok(idx)
        }
    }

    pub fn get_long(&mut self, long: i64) -> Result<ConstantIndex, ConstantPoolError> {
        if let Some(idx) = self.longs.get(&long) {
            Ok(*idx)
        } else {
            let idx = self.push_constant(Constant::Long(long))?;
            self.longs.insert(long, idx);
            Ok(idx)
        }
    }

    pub fn get_double(&mut self, double: f64) -> Result<ConstantIndex, ConstantPoolError> {
        if let Some(idx) = self.doubles.get(&double.to_bits()) {
            Ok(*idx)
        } else {
            let idx = self.push_constant(Constant::Double(double))?;
            self.doubles.insert(double.to_bits(), idx);
            Ok(idx)
        }
    }

    /// Get or insert a name & type constant from the constant pool
    pub fn get_name_and_type(
        &mut self,
        name: &str,
        descriptor: &str,
    ) -> Result<NameAndTypeConstantIndex, ConstantPoolError> {
        let name = self.get_utf8(name)?;
        let descriptor = self.get_utf8(descriptor)?;
        let name_and_type_key = (name, descriptor);
        if let Some(idx) = self.name_and_types.get(&name_and_type_key) {
            Ok(*idx)
        } else {
            let constant = Constant::NameAndType { name, descriptor };
            let idx = NameAndTypeConstantIndex(self.push_constant(constant)?);
            self.name_and_types.insert(name_and_type_key, idx);
            Ok(idx)
        }
    }

    /// Get or insert a `CONSTANT_Fieldref_info`
    pub fn get_field_ref(
        &mut self,
        field: &MemberRef,
    ) -> Result<FieldRefConstantIndex, ConstantPoolError> {
        let class = self.get_class(&field.owner)?;
        let name_and_type = self.get_name_and_type(&field.name, &field.descriptor)?;
        if let Some(idx) = self.fieldrefs.get(&(class, name_and_type)) {
            Ok(*idx)
        } else {
            let constant = Constant::FieldRef(class, name_and_type);
            let idx = FieldRefConstantIndex(self.push_constant(constant)?);
            self.fieldrefs.insert((class, name_and_type), idx);
            Ok(idx)
        }
    }

    /// Get or insert a `CONSTANT_Methodref_info` or `CONSTANT_InterfaceMethodref_info`
    pub fn get_method_ref(
        &mut self,
        method: &MemberRef,
        is_interface: bool,
    ) -> Result<MethodRefConstantIndex, ConstantPoolError> {
        let class = self.get_class(&method.owner)?;
        let name_and_type = self.get_name_and_type(&method.name, &method.descriptor)?;
        let key = (class, name_and_type, is_interface);
        if let Some(idx) = self.methodrefs.get(&key) {
            Ok(*idx)
        } else {
            let constant = Constant::MethodRef {
                class,
                name_and_type,
                is_interface,
            };
            let idx = MethodRefConstantIndex(self.push_constant(constant)?);
            self.methodrefs.insert(key, idx);
            Ok(idx)
        }
    }

    pub fn get_method_type(
        &mut self,
        descriptor: &str,
    ) -> Result<ConstantIndex, ConstantPoolError> {
        let descriptor = self.get_utf8(descriptor)?;
        if let Some(idx) = self.method_types.get(&descriptor) {
            Ok(*idx)
        } else {
            let idx = self.push_constant(Constant::MethodType { descriptor })?;
            self.method_types.insert(descriptor, idx);
            Ok(idx)
        }
    }

    /// Get or insert a method handle constant from the constant pool
    pub fn get_method_handle(&mut self, handle: &Handle) -> Result<ConstantIndex, ConstantPoolError> {
        let member: ConstantIndex = if handle.kind.is_field() {
            self.get_field_ref(&handle.member)?.into()
        } else {
            self.get_method_ref(&handle.member, handle.is_interface)?.into()
        };
        let handle_key = (handle.kind, member);
        if let Some(idx) = self.method_handles.get(&handle_key) {
            Ok(*idx)
        } else {
            let constant = Constant::MethodHandle {
                handle_kind: handle.kind,
                member,
            };
            let idx = self.push_constant(constant)?;
            self.method_handles.insert(handle_key, idx);
            Ok(idx)
        }
    }

    /// Get or insert an invoke dynamic constant from the constant pool
    pub fn get_invoke_dynamic(
        &mut self,
        bootstrap_method: u16,
        name: &str,
        descriptor: &str,
    ) -> Result<InvokeDynamicConstantIndex, ConstantPoolError> {
        let method_descriptor = self.get_name_and_type(name, descriptor)?;
        let indy_key = (bootstrap_method, method_descriptor);
        if let Some(idx) = self.invoke_dynamics.get(&indy_key) {
            Ok(*idx)
        } else {
            let constant = Constant::InvokeDynamic {
                bootstrap_method,
                method_descriptor,
            };
            let idx = InvokeDynamicConstantIndex(self.push_constant(constant)?);
            self.invoke_dynamics.insert(indy_key, idx);
            Ok(idx)
        }
    }

    /// Add an attribute to the constant pool
    pub fn get_attribute<A: AttributeLike>(&mut self, attribute: A) -> Result<Attribute, Error> {
        let name_index = self.get_utf8(A::NAME)?;
        let mut info = vec![];

        attribute.serialize(&mut info).map_err(Error::IoError)?;

        Ok(Attribute { name_index, info })
    }
}

impl Default for ConstantsPool {
    fn default() -> Self {
        ConstantsPool::new()
    }
}

#[derive(Debug)]
pub enum ConstantPoolError {
    /// No slot left for the constant (indices stop at 65535)
    Overflow { constant: Constant, offset: u16 },

    /// Encoded string doesn't fit in the `u16` length of a utf8 constant
    Utf8TooLong(usize),
}

impl From<ConstantPoolError> for EncodeError {
    fn from(err: ConstantPoolError) -> EncodeError {
        match err {
            ConstantPoolError::Overflow { constant, offset } => {
                EncodeError::ConstantPoolOverflow { constant, offset }
            }
            ConstantPoolError::Utf8TooLong(len) => EncodeError::Utf8TooLong(len),
        }
    }
}

impl From<ConstantPoolError> for Error {
    fn from(err: ConstantPoolError) -> Error {
        Error::Encode(err.into())
    }
}

/// Bootstrap methods accumulated while encoding `invokedynamic` instructions
///
/// These end up in the `BootstrapMethods` attribute of the class, and `invokedynamic` constants
/// refer to them by their position.
#[derive(Default)]
pub struct BootstrapTable {
    methods: Vec<BootstrapMethod>,
    entries: Vec<BootstrapMethodEntry>,
}

impl BootstrapTable {
    /// Get or insert a bootstrap method, returning its position in the attribute
    pub fn get_bootstrap_method(
        &mut self,
        constants: &mut ConstantsPool,
        method: &BootstrapMethod,
    ) -> Result<u16, ConstantPoolError> {
        if let Some(position) = self.methods.iter().position(|known| known == method) {
            return Ok(position as u16);
        }
        let bootstrap_method = constants.get_method_handle(&method.handle)?;
        let mut bootstrap_arguments = vec![];
        for argument in &method.arguments {
            bootstrap_arguments.push(argument.constant_index(constants)?);
        }
        self.methods.push(method.clone());
        self.entries.push(BootstrapMethodEntry {
            bootstrap_method,
            bootstrap_arguments,
        });
        Ok((self.methods.len() - 1) as u16)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_attribute(self) -> BootstrapMethods {
        BootstrapMethods(self.entries)
    }
}

/// Constants as in the constant pool
///
/// `Dynamic`, `Module`, and `Package` are only ever read: nothing in the object model refers to
/// them, so the writer never produces them.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.4
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// Class or an interface
    Class(Utf8ConstantIndex),

    /// Field
    FieldRef(ClassConstantIndex, NameAndTypeConstantIndex),

    /// Method (this combines `Methodref` and `InterfaceMethodref`)
    MethodRef {
        class: ClassConstantIndex,
        name_and_type: NameAndTypeConstantIndex,
        is_interface: bool,
    },

    /// Constant object of type `java.lang.String`
    String(Utf8ConstantIndex),

    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),

    /// Name and a type (eg. for a field or a method)
    NameAndType {
        name: Utf8ConstantIndex,
        descriptor: Utf8ConstantIndex,
    },

    /// Constant UTF-8 encoded raw string value
    ///
    /// Despite the name, the encoding is not quite UTF-8 (the encoding of the
    /// null character `\u{0000}` and the encoding of supplementary characters
    /// is different).
    Utf8(String),

    /// Constant object of type `java.lang.invoke.MethodHandle`
    MethodHandle {
        handle_kind: HandleKind,

        /// `FieldRef` for the field kinds, `MethodRef` for the rest
        member: ConstantIndex,
    },

    MethodType { descriptor: Utf8ConstantIndex },

    /// Dynamically-computed constant
    Dynamic {
        bootstrap_method: u16,
        name_and_type: NameAndTypeConstantIndex,
    },

    /// Dynamically-computed call site
    InvokeDynamic {
        /// Index into the `BootstrapMethods` attribute
        bootstrap_method: u16,
        method_descriptor: NameAndTypeConstantIndex,
    },

    Module(Utf8ConstantIndex),
    Package(Utf8ConstantIndex),
}

impl Constant {
    /// Tag byte preceding the constant in the pool
    pub fn tag(&self) -> u8 {
        match self {
            Constant::Utf8(_) => 1,
            Constant::Integer(_) => 3,
            Constant::Float(_) => 4,
            Constant::Long(_) => 5,
            Constant::Double(_) => 6,
            Constant::Class(_) => 7,
            Constant::String(_) => 8,
            Constant::FieldRef(_, _) => 9,
            Constant::MethodRef {
                is_interface: false,
                ..
            } => 10,
            Constant::MethodRef {
                is_interface: true, ..
            } => 11,
            Constant::NameAndType { .. } => 12,
            Constant::MethodHandle { .. } => 15,
            Constant::MethodType { .. } => 16,
            Constant::Dynamic { .. } => 17,
            Constant::InvokeDynamic { .. } => 18,
            Constant::Module(_) => 19,
            Constant::Package(_) => 20,
        }
    }
}

impl Serialize for Constant {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.tag().serialize(writer)?;
        match self {
            Constant::Utf8(string) => {
                let buffer: Vec<u8> = encode_modified_utf8(string);
                (buffer.len() as u16).serialize(writer)?;
                writer.write_all(&buffer)?;
            }
            Constant::Integer(integer) => integer.serialize(writer)?,
            Constant::Float(float) => float.serialize(writer)?,
            Constant::Long(long) => long.serialize(writer)?,
            Constant::Double(double) => double.serialize(writer)?,
            Constant::Class(name) => name.serialize(writer)?,
            Constant::String(utf8) => utf8.serialize(writer)?,
            Constant::FieldRef(class, name_and_type) => {
                class.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            Constant::MethodRef {
                class,
                name_and_type,
                ..
            } => {
                class.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            Constant::NameAndType { name, descriptor } => {
                name.serialize(writer)?;
                descriptor.serialize(writer)?;
            }
            Constant::MethodHandle {
                handle_kind,
                member,
            } => {
                handle_kind.serialize(writer)?;
                member.serialize(writer)?;
            }
            Constant::MethodType { descriptor } => descriptor.serialize(writer)?,
            Constant::Dynamic {
                bootstrap_method,
                name_and_type,
            } => {
                bootstrap_method.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            Constant::InvokeDynamic {
                bootstrap_method,
                method_descriptor,
            } => {
                bootstrap_method.serialize(writer)?;
                method_descriptor.serialize(writer)?;
            }
            Constant::Module(name) | Constant::Package(name) => name.serialize(writer)?,
        };
        Ok(())
    }
}

impl Deserialize for Constant {
    fn deserialize(reader: &mut ByteReader<'_>) -> Result<Self, Error> {
        let tag_offset = reader.offset();
        let constant = match reader.read_u8()? {
            1 => {
                let len = reader.read_u16()? as usize;
                let offset = reader.offset();
                let bytes = reader.read_bytes(len)?;
                let string = decode_modified_utf8(bytes).map_err(|err| match err {
                    ModifiedUtf8Error::InvalidBytes => {
                        Error::malformed(offset, MalformedKind::InvalidModifiedUtf8)
                    }
                    ModifiedUtf8Error::LoneSurrogate => {
                        Error::unsupported(offset, UnsupportedConstruct::LoneSurrogate)
                    }
                })?;
                Constant::Utf8(string)
            }
            3 => Constant::Integer(reader.read()?),
            4 => Constant::Float(reader.read()?),
            5 => Constant::Long(reader.read()?),
            6 => Constant::Double(reader.read()?),
            7 => Constant::Class(reader.read()?),
            8 => Constant::String(reader.read()?),
            9 => Constant::FieldRef(reader.read()?, reader.read()?),
            tag @ (10 | 11) => Constant::MethodRef {
                class: reader.read()?,
                name_and_type: reader.read()?,
                is_interface: tag == 11,
            },
            12 => Constant::NameAndType {
                name: reader.read()?,
                descriptor: reader.read()?,
            },
            15 => Constant::MethodHandle {
                handle_kind: reader.read()?,
                member: reader.read()?,
            },
            16 => Constant::MethodType {
                descriptor: reader.read()?,
            },
            17 => Constant::Dynamic {
                bootstrap_method: reader.read()?,
                name_and_type: reader.read()?,
            },
            18 => Constant::InvokeDynamic {
                bootstrap_method: reader.read()?,
                method_descriptor: reader.read()?,
            },
            19 => Constant::Module(reader.read()?),
            20 => Constant::Package(reader.read()?),
            other => {
                return Err(Error::malformed(
                    tag_offset,
                    MalformedKind::UnknownConstantTag(other),
                ))
            }
        };
        Ok(constant)
    }
}

/// Modified UTF-8 format used in class files.
///
/// See [this `DataInput` section for details][0]. Quoting from that section:
///
/// > The differences between this format and the standard UTF-8 format are the following:
/// >
/// >  * The null byte `\u0000` is encoded in 2-byte format rather than 1-byte, so that the encoded
/// >    strings never have embedded nulls.
/// >  * Only the 1-byte, 2-byte, and 3-byte formats are used.
/// >  * Supplementary characters are represented in the form of surrogate pairs.
///
/// [0]: https://docs.oracle.com/en/java/javase/17/docs/api/java.base/java/io/DataInput.html#modified-utf-8
pub fn encode_modified_utf8(string: &str) -> Vec<u8> {
    let mut buffer: Vec<u8> = vec![];
    let mut units = [0u16; 2];
    for c in string.chars() {
        for unit in c.encode_utf16(&mut units).iter().copied() {
            match unit {
                0x0001..=0x007F => buffer.push(unit as u8),
                0x0000 | 0x0080..=0x07FF => {
                    buffer.push((unit >> 6 & 0x1F) as u8 | 0b1100_0000);
                    buffer.push((unit & 0x3F) as u8 | 0b1000_0000);
                }
                _ => {
                    buffer.push((unit >> 12 & 0x0F) as u8 | 0b1110_0000);
                    buffer.push((unit >> 6 & 0x3F) as u8 | 0b1000_0000);
                    buffer.push((unit & 0x3F) as u8 | 0b1000_0000);
                }
            }
        }
    }
    buffer
}

/// Length in bytes of [`encode_modified_utf8`] for the string
pub fn modified_utf8_len(string: &str) -> usize {
    string
        .chars()
        .map(|c| match c as u32 {
            0x0001..=0x007F => 1,
            0x0000 | 0x0080..=0x07FF => 2,
            0x0800..=0xFFFF => 3,
            _ => 6,
        })
        .sum()
}

/// Why bytes failed to decode as modified UTF-8
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ModifiedUtf8Error {
    /// Truncated sequence, raw null byte, or a 4-byte UTF-8 form
    InvalidBytes,

    /// Well formed, but holds an unpaired surrogate (which Rust strings cannot)
    LoneSurrogate,
}

/// Inverse of [`encode_modified_utf8`]
pub fn decode_modified_utf8(bytes: &[u8]) -> Result<String, ModifiedUtf8Error> {
    let units = utf16_units(bytes).ok_or(ModifiedUtf8Error::InvalidBytes)?;
    String::from_utf16(&units).map_err(|_| ModifiedUtf8Error::LoneSurrogate)
}

fn utf16_units(bytes: &[u8]) -> Option<Vec<u16>> {
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut iter = bytes.iter().copied();
    let continuation = |byte: Option<u8>| -> Option<u16> {
        byte.filter(|b| b & 0b1100_0000 == 0b1000_0000)
            .map(|b| (b & 0x3F) as u16)
    };
    while let Some(byte) = iter.next() {
        let unit = match byte {
            0x01..=0x7F => byte as u16,
            0xC0..=0xDF => ((byte & 0x1F) as u16) << 6 | continuation(iter.next())?,
            0xE0..=0xEF => {
                let high = continuation(iter.next())?;
                let low = continuation(iter.next())?;
                ((byte & 0x0F) as u16) << 12 | high << 6 | low
            }
            _ => return None,
        };
        units.push(unit);
    }
    Some(units)
}


/// Almost all constants have width 1, except for `Constant::Long` and `Constant::Double`. Quoting
/// the JVM specification:
///
/// > All 8-byte constants take up two entries in the constant_pool table of the class file. If a
/// > CONSTANT_Long_info or CONSTANT_Double_info structure is the item in the constant_pool table
/// > at index n, then the next usable item in the pool is located at index n+2. The constant_pool
/// > index n+1 must be valid but is considered unusable.
impl Width for Constant {
    fn width(&self) -> usize {
        match self {
            Constant::Long(_) | Constant::Double(_) => 2,
            _ => 1,
        }
    }
}

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct ConstantIndex(pub u16);

impl Serialize for ConstantIndex {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

impl Deserialize for ConstantIndex {
    fn deserialize(reader: &mut ByteReader<'_>) -> Result<Self, Error> {
        Ok(ConstantIndex(reader.read_u16()?))
    }
}

/// Indices which are statically known to point at one kind of constant
macro_rules! typed_index {
    ($($(#[$doc:meta])* $name:ident;)*) => {
        $(
            $(#[$doc])*
            #[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
            pub struct $name(pub ConstantIndex);

            impl From<$name> for ConstantIndex {
                fn from(index: $name) -> ConstantIndex {
                    index.0
                }
            }

            impl Serialize for $name {
                fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
                    self.0.serialize(writer)
                }
            }

            impl Deserialize for $name {
                fn deserialize(reader: &mut ByteReader<'_>) -> Result<Self, Error> {
                    Ok($name(reader.read()?))
                }
            }
        )*
    };
}

typed_index! {
    Utf8ConstantIndex;
    StringConstantIndex;
    NameAndTypeConstantIndex;
    ClassConstantIndex;
    FieldRefConstantIndex;

    /// Index of either a `Methodref` or an `InterfaceMethodref`
    MethodRefConstantIndex;
    InvokeDynamicConstantIndex;
}

/// Type of method handle
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-5.html#jvms-5.4.3.5-220
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub enum HandleKind {
    GetField,
    GetStatic,
    PutField,
    PutStatic,
    InvokeVirtual,
    InvokeStatic,
    InvokeSpecial,
    NewInvokeSpecial,
    InvokeInterface,
}

impl HandleKind {
    /// Does the handle refer to a `Fieldref` (as opposed to a method reference)?
    pub fn is_field(&self) -> bool {
        matches!(
            self,
            HandleKind::GetField | HandleKind::GetStatic | HandleKind::PutField | HandleKind::PutStatic
        )
    }

    fn from_u8(byte: u8) -> Option<HandleKind> {
        Some(match byte {
            1 => HandleKind::GetField,
            2 => HandleKind::GetStatic,
            3 => HandleKind::PutField,
            4 => HandleKind::PutStatic,
            5 => HandleKind::InvokeVirtual,
            6 => HandleKind::InvokeStatic,
            7 => HandleKind::InvokeSpecial,
            8 => HandleKind::NewInvokeSpecial,
            9 => HandleKind::InvokeInterface,
            _ => return None,
        })
    }
}

impl Serialize for HandleKind {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        let byte: u8 = match self {
            HandleKind::GetField => 1,
            HandleKind::GetStatic => 2,
            HandleKind::PutField => 3,
            HandleKind::PutStatic => 4,
            HandleKind::InvokeVirtual => 5,
            HandleKind::InvokeStatic => 6,
            HandleKind::InvokeSpecial => 7,
            HandleKind::NewInvokeSpecial => 8,
            HandleKind::InvokeInterface => 9,
        };
        byte.serialize(writer)
    }
}

impl Deserialize for HandleKind {
    fn deserialize(reader: &mut ByteReader<'_>) -> Result<Self, Error> {
        let offset = reader.offset();
        let byte = reader.read_u8()?;
        HandleKind::from_u8(byte)
            .ok_or_else(|| Error::malformed(offset, MalformedKind::InvalidHandleKind(byte)))
    }
}

/// Things that can be written into the constants pool
pub trait ConstantsWriter<Index = ConstantIndex> {
    /// Get or insert a constant into the constant pool and return the associated index
    fn constant_index(&self, constants_pool: &mut ConstantsPool)
        -> Result<Index, ConstantPoolError>;
}

/// Write a constant which can be loaded up using `ldc`, `ldc_w`, or `ldc2_w`
impl ConstantsWriter for LoadableConstant {
    fn constant_index(
        &self,
        constants: &mut ConstantsPool,
    ) -> Result<ConstantIndex, ConstantPoolError> {
        match self {
            LoadableConstant::Integer(integer) => constants.get_integer(*integer),
            LoadableConstant::Float(float) => constants.get_float(*float),
            LoadableConstant::Long(long) => constants.get_long(*long),
            LoadableConstant::Double(double) => constants.get_double(*double),
            LoadableConstant::String(string) => Ok(constants.get_string(string)?.into()),
            LoadableConstant::Class(class) => Ok(constants.get_class(class)?.into()),
            LoadableConstant::MethodType(descriptor) => constants.get_method_type(descriptor),
            LoadableConstant::MethodHandle(handle) => constants.get_method_handle(handle),
        }
    }
}
