use super::{
    ByteReader, ClassConstantIndex, ConstantIndex, NameAndTypeConstantIndex, SymbolTable,
    Utf8ConstantIndex, Version,
};
use crate::jvm::code::{BootstrapMethod, Code};
use crate::jvm::model::{
    ClassUnit, EnclosingMethodEntry, FieldUnit, InnerClassEntry, MethodUnit, ROOT_CLASS_NAME,
};
use crate::jvm::{
    traverse, ClassAccessFlags, ClassVisitor, Error, FieldAccessFlags, InnerClassAccessFlags,
    MalformedKind, MethodAccessFlags, UnsupportedConstruct,
};

/// Attribute whose body hasn't been decoded yet
#[derive(Clone, Debug)]
pub struct AttributeRecord<'a> {
    pub name: String,

    /// Offset of the attribute header in the input
    pub offset: usize,
    body: ByteReader<'a>,
}

impl<'a> AttributeRecord<'a> {
    /// Read a `u16`-prefixed list of attribute headers, splitting off their bodies
    pub fn read_all(
        reader: &mut ByteReader<'a>,
        symbols: &SymbolTable,
    ) -> Result<Vec<AttributeRecord<'a>>, Error> {
        let count = reader.read_u16()?;
        let mut records = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let offset = reader.offset();
            let name_index: Utf8ConstantIndex = reader.read()?;
            let name = symbols.utf8(name_index, offset)?.to_owned();
            let length = reader.read_u32()? as usize;
            let body = reader.split(length)?;
            records.push(AttributeRecord { name, offset, body });
        }
        Ok(records)
    }

    /// Decode the body, checking that the declared length is consumed exactly
    pub fn decode<A>(
        &self,
        decode: impl FnOnce(&mut ByteReader<'a>) -> Result<A, Error>,
    ) -> Result<A, Error> {
        let mut body = self.body.clone();
        let declared = body.remaining();
        let value = decode(&mut body)?;
        if !body.is_empty() {
            let kind = MalformedKind::AttributeLengthMismatch {
                name: self.name.clone(),
                declared: declared as u32,
                consumed: declared - body.remaining(),
            };
            return Err(Error::malformed(body.offset(), kind));
        }
        Ok(value)
    }

    /// Error for an attribute that isn't modelled where it appears
    pub fn unsupported(&self) -> Error {
        let construct = UnsupportedConstruct::Attribute(self.name.clone());
        Error::unsupported(self.offset, construct)
    }
}

/// Field or method whose attributes haven't been decoded yet
#[derive(Debug)]
struct MemberRecord<'a, Flags> {
    access_flags: Flags,
    name: String,
    descriptor: String,
    attributes: Vec<AttributeRecord<'a>>,
}

impl<'a, Flags: super::Deserialize> MemberRecord<'a, Flags> {
    fn read_all(
        reader: &mut ByteReader<'a>,
        symbols: &SymbolTable,
    ) -> Result<Vec<MemberRecord<'a, Flags>>, Error> {
        let count = reader.read_u16()?;
        let mut members = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let offset = reader.offset();
            let access_flags: Flags = reader.read()?;
            let name_index: Utf8ConstantIndex = reader.read()?;
            let descriptor_index: Utf8ConstantIndex = reader.read()?;
            members.push(MemberRecord {
                access_flags,
                name: symbols.utf8(name_index, offset)?.to_owned(),
                descriptor: symbols.utf8(descriptor_index, offset)?.to_owned(),
                attributes: AttributeRecord::read_all(reader, symbols)?,
            });
        }
        Ok(members)
    }
}

/// Binary reader for class files
///
/// Construction parses the layout of the whole class (constant pool, header, and the position of
/// every field, method, and attribute), which is enough to answer questions about the class
/// header. Attribute bodies, including method code, are only decoded by [`ClassReader::read`].
#[derive(Debug)]
pub struct ClassReader<'a> {
    version: Version,
    symbols: SymbolTable,
    access_flags: ClassAccessFlags,
    name: String,
    super_name: Option<String>,
    interfaces: Vec<String>,
    fields: Vec<MemberRecord<'a, FieldAccessFlags>>,
    methods: Vec<MemberRecord<'a, MethodAccessFlags>>,
    attributes: Vec<AttributeRecord<'a>>,
}

impl<'a> ClassReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Result<ClassReader<'a>, Error> {
        let mut reader = ByteReader::new(bytes);

        let magic = reader.read_u32()?;
        if magic != super::ClassFile::MAGIC {
            return Err(Error::malformed(0, MalformedKind::BadMagic(magic)));
        }

        let version_offset = reader.offset();
        let version: Version = reader.read()?;
        if !version.is_supported() {
            return Err(Error::malformed(
                version_offset,
                MalformedKind::UnsupportedVersion(version),
            ));
        }

        let symbols: SymbolTable = reader.read()?;
        let access_flags: ClassAccessFlags = reader.read()?;

        let this_offset = reader.offset();
        let this_class: ClassConstantIndex = reader.read()?;
        let name = symbols.class_name(this_class, this_offset)?.to_owned();

        let super_offset = reader.offset();
        let super_class: ClassConstantIndex = reader.read()?;
        let super_name = symbols
            .optional_class_name(super_class, super_offset)?
            .map(str::to_owned);
        if super_name.is_none() && name != ROOT_CLASS_NAME {
            return Err(Error::malformed(super_offset, MalformedKind::MissingSuperclass));
        }

        let interface_count = reader.read_u16()?;
        let mut interfaces = Vec::with_capacity(interface_count as usize);
        for _ in 0..interface_count {
            let offset = reader.offset();
            let interface: ClassConstantIndex = reader.read()?;
            interfaces.push(symbols.class_name(interface, offset)?.to_owned());
        }

        let fields = MemberRecord::read_all(&mut reader, &symbols)?;
        let methods = MemberRecord::read_all(&mut reader, &symbols)?;
        let attributes = AttributeRecord::read_all(&mut reader, &symbols)?;

        if !reader.is_empty() {
            return Err(Error::malformed(
                reader.offset(),
                MalformedKind::TrailingBytes(reader.remaining()),
            ));
        }

        Ok(ClassReader {
            version,
            symbols,
            access_flags,
            name,
            super_name,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn access_flags(&self) -> ClassAccessFlags {
        self.access_flags
    }

    /// Internal name of the class (eg. `java/lang/String`)
    pub fn class_name(&self) -> &str {
        &self.name
    }

    pub fn super_name(&self) -> Option<&str> {
        self.super_name.as_deref()
    }

    pub fn interfaces(&self) -> &[String] {
        &self.interfaces
    }

    /// Decode the whole class
    ///
    /// Class attributes are decoded first since `invokedynamic` instructions need the bootstrap
    /// methods, then fields, then methods.
    pub fn read(&self) -> Result<ClassUnit, Error> {
        let mut class = ClassUnit::new(
            self.version,
            self.access_flags,
            &self.name,
            self.super_name.as_deref(),
        );
        class.interfaces = self.interfaces.clone();

        let mut bootstrap_methods = vec![];
        for record in &self.attributes {
            self.read_class_attribute(record, &mut class, &mut bootstrap_methods)?;
        }

        for record in &self.fields {
            class.fields.push(self.read_field(record)?);
        }
        for record in &self.methods {
            class.methods.push(self.read_method(record, &bootstrap_methods)?);
        }

        Ok(class)
    }

    /// Decode the class, then walk it with the visitor
    pub fn accept<V: ClassVisitor>(&self, visitor: &mut V) -> Result<ClassUnit, Error> {
        let mut class = self.read()?;
        traverse(&mut class, visitor)?;
        Ok(class)
    }

    fn utf8(&self, body: &mut ByteReader<'_>) -> Result<String, Error> {
        let offset = body.offset();
        let index: Utf8ConstantIndex = body.read()?;
        Ok(self.symbols.utf8(index, offset)?.to_owned())
    }

    fn class_name_at(&self, body: &mut ByteReader<'_>) -> Result<String, Error> {
        let offset = body.offset();
        let index: ClassConstantIndex = body.read()?;
        Ok(self.symbols.class_name(index, offset)?.to_owned())
    }

    fn class_names(&self, body: &mut ByteReader<'_>) -> Result<Vec<String>, Error> {
        let count = body.read_u16()?;
        (0..count).map(|_| self.class_name_at(body)).collect()
    }

    fn read_class_attribute(
        &self,
        record: &AttributeRecord<'a>,
        class: &mut ClassUnit,
        bootstrap_methods: &mut Vec<BootstrapMethod>,
    ) -> Result<(), Error> {
        match record.name.as_str() {
            "SourceFile" => class.source_file = Some(record.decode(|body| self.utf8(body))?),
            "Signature" => class.signature = Some(record.decode(|body| self.utf8(body))?),
            "InnerClasses" => {
                class.inner_classes = record.decode(|body| {
                    let count = body.read_u16()?;
                    let mut entries = Vec::with_capacity(count as usize);
                    for _ in 0..count {
                        let offset = body.offset();
                        let inner_class: ClassConstantIndex = body.read()?;
                        let outer_class: ClassConstantIndex = body.read()?;
                        let inner_name: Utf8ConstantIndex = body.read()?;
                        let access_flags: InnerClassAccessFlags = body.read()?;
                        let inner_name = if ConstantIndex::from(inner_name) == ConstantIndex(0) {
                            None
                        } else {
                            Some(self.symbols.utf8(inner_name, offset)?.to_owned())
                        };
                        entries.push(InnerClassEntry {
                            inner_class: self.symbols.class_name(inner_class, offset)?.to_owned(),
                            outer_class: self
                                .symbols
                                .optional_class_name(outer_class, offset)?
                                .map(str::to_owned),
                            inner_name,
                            access_flags,
                        });
                    }
                    Ok(entries)
                })?
            }
            "EnclosingMethod" => {
                let entry = record.decode(|body| {
                    let offset = body.offset();
                    let owner = self.class_name_at(body)?;
                    let method: NameAndTypeConstantIndex = body.read()?;
                    let method = if ConstantIndex::from(method) == ConstantIndex(0) {
                        None
                    } else {
                        let (name, descriptor) = self.symbols.name_and_type(method, offset)?;
                        Some((name.to_owned(), descriptor.to_owned()))
                    };
                    Ok(EnclosingMethodEntry {
                        class: owner,
                        method,
                    })
                })?;
                class.enclosing_method = Some(entry);
            }
            "NestHost" => class.nest_host = Some(record.decode(|body| self.class_name_at(body))?),
            "NestMembers" => class.nest_members = record.decode(|body| self.class_names(body))?,
            "PermittedSubclasses" => {
                class.permitted_subclasses = record.decode(|body| self.class_names(body))?
            }
            "BootstrapMethods" => {
                *bootstrap_methods = record.decode(|body| {
                    let count = body.read_u16()?;
                    let mut methods = Vec::with_capacity(count as usize);
                    for _ in 0..count {
                        let offset = body.offset();
                        let handle: ConstantIndex = body.read()?;
                        let handle = self.symbols.method_handle(handle, offset)?;
                        let arguments: Vec<ConstantIndex> = body.read()?;
                        let arguments = arguments
                            .into_iter()
                            .map(|argument| self.symbols.loadable(argument, offset))
                            .collect::<Result<_, _>>()?;
                        methods.push(BootstrapMethod { handle, arguments });
                    }
                    Ok(methods)
                })?
            }
            "Deprecated" => {
                record.decode(|_| Ok(()))?;
                class.deprecated = true;
            }
            "Synthetic" => {
                record.decode(|_| Ok(()))?;
                class.synthetic = true;
            }
            _ => return Err(record.unsupported()),
        }
        Ok(())
    }

    fn read_field(&self, record: &MemberRecord<'a, FieldAccessFlags>) -> Result<FieldUnit, Error> {
        let mut field = FieldUnit::new(record.access_flags, &record.name, &record.descriptor);
        for attribute in &record.attributes {
            match attribute.name.as_str() {
                "ConstantValue" => {
                    let constant = attribute.decode(|body| {
                        let offset = body.offset();
                        let index: ConstantIndex = body.read()?;
                        self.symbols.loadable(index, offset)
                    })?;
                    field.constant_value = Some(constant);
                }
                "Signature" => field.signature = Some(attribute.decode(|body| self.utf8(body))?),
                "Deprecated" => {
                    attribute.decode(|_| Ok(()))?;
                    field.deprecated = true;
                }
                "Synthetic" => {
                    attribute.decode(|_| Ok(()))?;
                    field.synthetic = true;
                }
                _ => return Err(attribute.unsupported()),
            }
        }
        Ok(field)
    }

    fn read_method(
        &self,
        record: &MemberRecord<'a, MethodAccessFlags>,
        bootstrap_methods: &[BootstrapMethod],
    ) -> Result<MethodUnit, Error> {
        let mut method = MethodUnit::new(record.access_flags, &record.name, &record.descriptor);
        for attribute in &record.attributes {
            match attribute.name.as_str() {
                "Code" => {
                    let code = attribute.decode(|body| {
                        Code::deserialize_code(body, &self.symbols, bootstrap_methods)
                    })?;
                    method.code = Some(code);
                }
                "Exceptions" => method.exceptions = attribute.decode(|body| self.class_names(body))?,
                "Signature" => method.signature = Some(attribute.decode(|body| self.utf8(body))?),
                "Deprecated" => {
                    attribute.decode(|_| Ok(()))?;
                    method.deprecated = true;
                }
                "Synthetic" => {
                    attribute.decode(|_| Ok(()))?;
                    method.synthetic = true;
                }
                _ => return Err(attribute.unsupported()),
            }
        }
        Ok(method)
    }
}

/// Decode a class file into the object model
pub fn decode(bytes: &[u8]) -> Result<ClassUnit, Error> {
    ClassReader::new(bytes)?.read()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::{Handle, LoadableConstant, MemberRef};
    use crate::jvm::class_file::HandleKind;
    use crate::jvm::encode;

    fn sample() -> ClassUnit {
        let mut class = ClassUnit::new(
            Version::JAVA17,
            ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
            "me/alec/Outer",
            Some(ROOT_CLASS_NAME),
        );
        class.source_file = Some(String::from("Outer.java"));
        class.signature = Some(String::from("<T:Ljava/lang/Object;>Ljava/lang/Object;"));
        class.inner_classes.push(InnerClassEntry {
            inner_class: String::from("me/alec/Outer$1"),
            outer_class: None,
            inner_name: None,
            access_flags: InnerClassAccessFlags::STATIC,
        });
        class.nest_members.push(String::from("me/alec/Outer$1"));
        class.deprecated = true;

        let mut field = FieldUnit::new(FieldAccessFlags::STATIC | FieldAccessFlags::FINAL, "MAX", "J");
        field.constant_value = Some(LoadableConstant::Long(-1));
        field.synthetic = true;
        class.fields.push(field);

        let mut method = MethodUnit::new(MethodAccessFlags::NATIVE, "poll", "()V");
        method.exceptions.push(String::from("java/io/IOException"));
        method.signature = Some(String::from("()V"));
        class.methods.push(method);
        class
    }

    #[test]
    fn class_attributes_are_decoded() {
        let class = sample();
        let bytes = encode(&class).unwrap();

        let reader = ClassReader::new(&bytes).unwrap();
        assert_eq!(reader.class_name(), "me/alec/Outer");
        assert_eq!(reader.super_name(), Some(ROOT_CLASS_NAME));
        assert!(reader.interfaces().is_empty());
        assert_eq!(reader.version(), Version::JAVA17);
        assert_eq!(reader.read().unwrap(), class);
    }

    #[test]
    fn bootstrap_methods_are_resolved() {
        let mut class = sample();
        let handle = Handle {
            kind: HandleKind::InvokeStatic,
            member: MemberRef::new(
                "java/lang/invoke/StringConcatFactory",
                "makeConcatWithConstants",
                "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/invoke/MethodType;Ljava/lang/String;[Ljava/lang/Object;)Ljava/lang/invoke/CallSite;",
            ),
            is_interface: false,
        };
        let mut code = crate::jvm::code::Code::new(1, 0);
        code.instructions.push(crate::jvm::code::Instruction::InvokeDynamic {
            bootstrap: crate::jvm::code::BootstrapMethod {
                handle,
                arguments: vec![LoadableConstant::String(String::from("\u{1}!"))],
            },
            name: String::from("makeConcatWithConstants"),
            descriptor: String::from("()Ljava/lang/String;"),
        });
        code.instructions.push(crate::jvm::code::Instruction::Plain(
            crate::jvm::code::opcodes::ARETURN,
        ));
        let mut method = MethodUnit::new(MethodAccessFlags::STATIC, "shout", "()Ljava/lang/String;");
        method.code = Some(code);
        class.methods.push(method);

        let bytes = encode(&class).unwrap();
        assert_eq!(decode(&bytes).unwrap(), class);
    }

    #[test]
    fn unknown_and_oversized_attributes() {
        let mut class = sample();
        class.inner_classes.clear();
        class.nest_members.clear();
        class.signature = None;
        class.deprecated = false;
        let bytes = encode(&class).unwrap();
        let name_at = bytes
            .windows(10)
            .position(|window| window == b"SourceFile")
            .unwrap();

        // `SourceFile` is the last thing in the class: 6 bytes of header and 2 of body
        let mut renamed = bytes.clone();
        renamed[name_at..name_at + 10].copy_from_slice(b"SourceFilf");
        match decode(&renamed) {
            Err(Error::Unsupported { offset, construct }) => {
                assert_eq!(offset, bytes.len() - 8);
                assert_eq!(construct, UnsupportedConstruct::Attribute(String::from("SourceFilf")));
            }
            other => panic!("expected unsupported attribute, got {:?}", other),
        }

        let mut renamed = bytes.clone();
        renamed[name_at..name_at + 10].copy_from_slice(b"Deprecated");
        match decode(&renamed) {
            Err(Error::Malformed { offset, kind }) => {
                assert_eq!(offset, bytes.len() - 2);
                assert_eq!(
                    kind,
                    MalformedKind::AttributeLengthMismatch {
                        name: String::from("Deprecated"),
                        declared: 2,
                        consumed: 0,
                    }
                );
            }
            other => panic!("expected length mismatch, got {:?}", other),
        }
    }

    #[test]
    fn trailing_bytes() {
        let mut bytes = encode(&sample()).unwrap();
        let end = bytes.len();
        bytes.push(0);
        match ClassReader::new(&bytes) {
            Err(Error::Malformed { offset, kind }) => {
                assert_eq!(offset, end);
                assert_eq!(kind, MalformedKind::TrailingBytes(1));
            }
            other => panic!("expected trailing bytes, got {:?}", other),
        }
    }
}
