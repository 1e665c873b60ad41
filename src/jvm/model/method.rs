use crate::jvm::class_file;
use crate::jvm::class_file::{BootstrapTable, ClassConstantIndex, ConstantsPool};
use crate::jvm::code::Code;
use crate::jvm::{Error, MethodAccessFlags};

/// Name of instance initializers
pub const CONSTRUCTOR_NAME: &str = "<init>";

/// Name of the static initializer
pub const STATIC_INITIALIZER_NAME: &str = "<clinit>";

/// Semantic representation of a method
#[derive(Clone, Debug, PartialEq)]
pub struct MethodUnit {
    pub access_flags: MethodAccessFlags,
    pub name: String,

    /// Method descriptor (eg. `(I)Ljava/lang/String;`)
    pub descriptor: String,

    /// Method code implementation (absent for `abstract` and `native` methods)
    pub code: Option<Code>,

    /// Which exceptions can this method throw?
    ///
    /// Note: this does not need to include `RuntimeException`, `Error`, or subclasses
    pub exceptions: Vec<String>,

    /// Generic method signature
    ///
    /// [Format](https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.7.9.1)
    pub signature: Option<String>,
    pub deprecated: bool,
    pub synthetic: bool,
}

impl MethodUnit {
    pub fn new(access_flags: MethodAccessFlags, name: &str, descriptor: &str) -> MethodUnit {
        MethodUnit {
            access_flags,
            name: name.to_owned(),
            descriptor: descriptor.to_owned(),
            code: None,
            exceptions: vec![],
            signature: None,
            deprecated: false,
            synthetic: false,
        }
    }

    /// Is this a constructor or the static initializer?
    pub fn is_initializer(&self) -> bool {
        self.name == CONSTRUCTOR_NAME || self.name == STATIC_INITIALIZER_NAME
    }

    /// Serialize the method
    pub fn serialize_method(
        &self,
        constants_pool: &mut ConstantsPool,
        bootstrap_methods: &mut BootstrapTable,
    ) -> Result<class_file::Method, Error> {
        let name_index = constants_pool.get_utf8(self.name.as_str())?;
        let descriptor_index = constants_pool.get_utf8(self.descriptor.as_str())?;

        let mut attributes = vec![];

        // `Code` attribute
        if let Some(code) = &self.code {
            let code = code.serialize_code(constants_pool, bootstrap_methods)?;
            attributes.push(constants_pool.get_attribute(code)?);
        }

        // `Exceptions` attribute
        if !self.exceptions.is_empty() {
            let exceptions = self
                .exceptions
                .iter()
                .map(|exception| constants_pool.get_class(exception))
                .collect::<Result<Vec<ClassConstantIndex>, _>>()?;
            attributes.push(constants_pool.get_attribute(class_file::Exceptions(exceptions))?);
        }

        // `Signature` attribute
        if let Some(signature) = &self.signature {
            let signature = constants_pool.get_utf8(signature.as_str())?;
            let signature = class_file::Signature { signature };
            attributes.push(constants_pool.get_attribute(signature)?);
        }

        if self.deprecated {
            attributes.push(constants_pool.get_attribute(class_file::Deprecated)?);
        }
        if self.synthetic {
            attributes.push(constants_pool.get_attribute(class_file::Synthetic)?);
        }

        Ok(class_file::Method {
            access_flags: self.access_flags,
            name_index,
            descriptor_index,
            attributes,
        })
    }
}
