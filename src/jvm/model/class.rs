use crate::jvm::class_file;
use crate::jvm::class_file::{
    BootstrapTable, ClassConstantIndex, ClassFile, ConstantsPool, EnclosingMethod, InnerClass,
    InnerClasses, NestHost, NestMembers, PermittedSubclasses, Serialize, SourceFile, Version,
};
use crate::jvm::model::{FieldUnit, MethodUnit};
use crate::jvm::{ClassAccessFlags, EncodeError, Error, InnerClassAccessFlags};

/// Name of the root of the class hierarchy, the only class without a superclass
pub const ROOT_CLASS_NAME: &str = "java/lang/Object";

/// Semantic representation of a class
///
/// Class names are internal names (eg. `java/lang/String`).
#[derive(Clone, Debug, PartialEq)]
pub struct ClassUnit {
    pub version: Version,
    pub access_flags: ClassAccessFlags,
    pub name: String,

    /// Only `java/lang/Object` has no superclass
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,

    /// Fields, in declaration order
    pub fields: Vec<FieldUnit>,

    /// Methods, in declaration order
    pub methods: Vec<MethodUnit>,

    pub source_file: Option<String>,

    /// Generic class signature
    ///
    /// [Format](https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.7.9.1)
    pub signature: Option<String>,
    pub inner_classes: Vec<InnerClassEntry>,
    pub enclosing_method: Option<EnclosingMethodEntry>,
    pub nest_host: Option<String>,
    pub nest_members: Vec<String>,
    pub permitted_subclasses: Vec<String>,
    pub deprecated: bool,
    pub synthetic: bool,
}

/// Entry of the `InnerClasses` attribute
#[derive(Clone, Debug, PartialEq)]
pub struct InnerClassEntry {
    pub inner_class: String,

    /// Absent for local and anonymous classes
    pub outer_class: Option<String>,

    /// Simple name, absent for anonymous classes
    pub inner_name: Option<String>,
    pub access_flags: InnerClassAccessFlags,
}

/// Innermost method (or class) enclosing a local or anonymous class
#[derive(Clone, Debug, PartialEq)]
pub struct EnclosingMethodEntry {
    pub class: String,

    /// Name and descriptor of the method, if the class is inside one
    pub method: Option<(String, String)>,
}

impl ClassUnit {
    /// Create a new class with no members
    pub fn new(version: Version, access_flags: ClassAccessFlags, name: &str, super_name: Option<&str>) -> ClassUnit {
        ClassUnit {
            version,
            access_flags,
            name: name.to_owned(),
            super_name: super_name.map(str::to_owned),
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
            source_file: None,
            signature: None,
            inner_classes: vec![],
            enclosing_method: None,
            nest_host: None,
            nest_members: vec![],
            permitted_subclasses: vec![],
            deprecated: false,
            synthetic: false,
        }
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags.contains(ClassAccessFlags::INTERFACE)
    }

    /// Serialize the class into a class file
    ///
    /// The constant pool is built from scratch, in the order things are visited: the class and its
    /// superclass and interfaces, then fields, then methods, then class attributes. The
    /// `BootstrapMethods` attribute is rebuilt from the `invokedynamic` instructions in the
    /// methods, so bootstrap methods which no call site uses are dropped.
    pub fn serialize(&self) -> Result<ClassFile, Error> {
        // Construct a fresh constant pool
        let mut constants_pool = ConstantsPool::new();
        let mut bootstrap_methods = BootstrapTable::default();

        let this_class = constants_pool.get_class(&self.name)?;
        let super_class = match &self.super_name {
            Some(super_name) => Some(constants_pool.get_class(super_name)?),
            None if self.name == ROOT_CLASS_NAME => None,
            None => return Err(EncodeError::MissingSuperclass(self.name.clone()).into()),
        };
        let interfaces = get_classes(&mut constants_pool, "interfaces", &self.interfaces)?;

        // Serialize fields and methods
        check_count("fields", self.fields.len())?;
        let fields: Vec<class_file::Field> = self
            .fields
            .iter()
            .map(|field| field.serialize_field(&mut constants_pool))
            .collect::<Result<Vec<class_file::Field>, Error>>()?;
        check_count("methods", self.methods.len())?;
        let methods: Vec<class_file::Method> = self
            .methods
            .iter()
            .map(|method| method.serialize_method(&mut constants_pool, &mut bootstrap_methods))
            .collect::<Result<Vec<class_file::Method>, Error>>()?;

        let mut attributes = vec![];

        if let Some(source_file) = &self.source_file {
            let source_file = SourceFile(constants_pool.get_utf8(source_file.as_str())?);
            attributes.push(constants_pool.get_attribute(source_file)?);
        }

        if let Some(signature) = &self.signature {
            let signature = constants_pool.get_utf8(signature.as_str())?;
            let signature = class_file::Signature { signature };
            attributes.push(constants_pool.get_attribute(signature)?);
        }

        // `InnerClasses` attribute
        if !self.inner_classes.is_empty() {
            check_count("inner classes", self.inner_classes.len())?;
            let mut inner_classes: Vec<InnerClass> = vec![];
            for entry in &self.inner_classes {
                let inner_class = constants_pool.get_class(&entry.inner_class)?;
                let outer_class = match &entry.outer_class {
                    Some(outer_class) => Some(constants_pool.get_class(outer_class)?),
                    None => None,
                };
                let inner_name = match &entry.inner_name {
                    Some(inner_name) => Some(constants_pool.get_utf8(inner_name.as_str())?),
                    None => None,
                };
                inner_classes.push(InnerClass {
                    inner_class,
                    outer_class,
                    inner_name,
                    access_flags: entry.access_flags,
                });
            }
            attributes.push(constants_pool.get_attribute(InnerClasses(inner_classes))?);
        }

        if let Some(enclosing) = &self.enclosing_method {
            let class = constants_pool.get_class(&enclosing.class)?;
            let method = match &enclosing.method {
                Some((name, descriptor)) => {
                    Some(constants_pool.get_name_and_type(name, descriptor)?)
                }
                None => None,
            };
            attributes.push(constants_pool.get_attribute(EnclosingMethod { class, method })?);
        }

        // `NestHost`/`NestMembers` attributes
        if let Some(nest_host) = &self.nest_host {
            let nest_host = constants_pool.get_class(nest_host)?;
            attributes.push(constants_pool.get_attribute(NestHost(nest_host))?);
        }
        if !self.nest_members.is_empty() {
            let members = get_classes(&mut constants_pool, "nest members", &self.nest_members)?;
            attributes.push(constants_pool.get_attribute(NestMembers(members))?);
        }

        if !self.permitted_subclasses.is_empty() {
            let permitted = get_classes(
                &mut constants_pool,
                "permitted subclasses",
                &self.permitted_subclasses,
            )?;
            attributes.push(constants_pool.get_attribute(PermittedSubclasses(permitted))?);
        }

        // `BootstrapMethods` attribute
        if !bootstrap_methods.is_empty() {
            let bootstrap_methods = bootstrap_methods.into_attribute();
            attributes.push(constants_pool.get_attribute(bootstrap_methods)?);
        }

        if self.deprecated {
            attributes.push(constants_pool.get_attribute(class_file::Deprecated)?);
        }
        if self.synthetic {
            attributes.push(constants_pool.get_attribute(class_file::Synthetic)?);
        }

        Ok(ClassFile {
            version: self.version,
            constants: constants_pool.into_offset_vec(),
            access_flags: self.access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }
}

fn check_count(what: &'static str, count: usize) -> Result<(), EncodeError> {
    if count > u16::MAX as usize {
        Err(EncodeError::TooManyItems { what, count })
    } else {
        Ok(())
    }
}

fn get_classes(
    constants_pool: &mut ConstantsPool,
    what: &'static str,
    names: &[String],
) -> Result<Vec<ClassConstantIndex>, Error> {
    check_count(what, names.len())?;
    let mut classes = Vec::with_capacity(names.len());
    for name in names {
        classes.push(constants_pool.get_class(name)?);
    }
    Ok(classes)
}

/// Encode a class into the bytes of a class file
///
/// The output is built in a fresh buffer, so either the whole class is returned or nothing is.
pub fn encode(class: &ClassUnit) -> Result<Vec<u8>, Error> {
    let class_file = class.serialize()?;
    let mut bytes = vec![];
    class_file.serialize(&mut bytes)?;
    Ok(bytes)
}
