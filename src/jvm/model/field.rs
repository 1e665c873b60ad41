use crate::jvm::class_file;
use crate::jvm::class_file::{ConstantsPool, ConstantsWriter};
use crate::jvm::code::LoadableConstant;
use crate::jvm::{EncodeError, Error, FieldAccessFlags};

/// Semantic representation of a field
#[derive(Clone, Debug, PartialEq)]
pub struct FieldUnit {
    pub access_flags: FieldAccessFlags,
    pub name: String,

    /// Field descriptor (eg. `Ljava/lang/String;`)
    pub descriptor: String,

    /// Constant field value
    ///
    /// Only numbers and strings are valid here.
    pub constant_value: Option<LoadableConstant>,

    /// Generic field signature
    ///
    /// [Format](https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.7.9.1)
    pub signature: Option<String>,
    pub deprecated: bool,
    pub synthetic: bool,
}

impl FieldUnit {
    pub fn new(access_flags: FieldAccessFlags, name: &str, descriptor: &str) -> FieldUnit {
        FieldUnit {
            access_flags,
            name: name.to_owned(),
            descriptor: descriptor.to_owned(),
            constant_value: None,
            signature: None,
            deprecated: false,
            synthetic: false,
        }
    }

    /// Serialize the field
    pub fn serialize_field(&self, constants_pool: &mut ConstantsPool) -> Result<class_file::Field, Error> {
        let name_index = constants_pool.get_utf8(self.name.as_str())?;
        let descriptor_index = constants_pool.get_utf8(self.descriptor.as_str())?;

        let mut attributes = vec![];

        // `ConstantValue` attribute
        if let Some(constant) = &self.constant_value {
            match constant {
                LoadableConstant::Class(_)
                | LoadableConstant::MethodType(_)
                | LoadableConstant::MethodHandle(_) => {
                    let message = format!("{:?}", constant);
                    return Err(EncodeError::InvalidConstantValue(message).into());
                }
                _ => (),
            }
            let constant_value = class_file::ConstantValue(constant.constant_index(constants_pool)?);
            attributes.push(constants_pool.get_attribute(constant_value)?);
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

        Ok(class_file::Field {
            access_flags: self.access_flags,
            name_index,
            descriptor_index,
            attributes,
        })
    }
}
