use super::{ByteReader, Constant, ConstantIndex, Deserialize};
use crate::jvm::code::{Handle, LoadableConstant, MemberRef};
use crate::jvm::{Error, MalformedKind, UnsupportedConstruct};
use crate::util::{Offset, OffsetVec};

/// Constant pool of a class being decoded
///
/// Entries are decoded eagerly, but references between them are only checked when something
/// resolves them. Every accessor takes the byte offset of the structure doing the lookup, so that
/// a dangling index is reported where it is used.
#[derive(Debug)]
pub struct SymbolTable {
    constants: OffsetVec<Constant>,
}

impl SymbolTable {
    /// Number of entries (not slots) in the pool
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// Look up any constant
    pub fn get<I: Into<ConstantIndex>>(&self, index: I, at: usize) -> Result<&Constant, Error> {
        let ConstantIndex(index) = index.into();
        self.constants
            .get_offset(Offset(index as usize))
            .ok()
            .ok_or_else(|| Error::malformed(at, MalformedKind::InvalidConstantIndex(index)))
    }

    fn mismatch<I: Into<ConstantIndex>>(index: I, at: usize, expected: &'static str) -> Error {
        let ConstantIndex(index) = index.into();
        Error::malformed(at, MalformedKind::ConstantTypeMismatch { index, expected })
    }

    pub fn utf8<I: Into<ConstantIndex> + Copy>(&self, index: I, at: usize) -> Result<&str, Error> {
        match self.get(index, at)? {
            Constant::Utf8(string) => Ok(string),
            _ => Err(SymbolTable::mismatch(index, at, "Utf8")),
        }
    }

    /// Internal name of a class (or descriptor, for array classes)
    pub fn class_name<I: Into<ConstantIndex> + Copy>(
        &self,
        index: I,
        at: usize,
    ) -> Result<&str, Error> {
        match self.get(index, at)? {
            Constant::Class(name) => self.utf8(*name, at),
            _ => Err(SymbolTable::mismatch(index, at, "Class")),
        }
    }

    /// Like [`SymbolTable::class_name`], but index `0` means there is no class
    pub fn optional_class_name<I: Into<ConstantIndex> + Copy>(
        &self,
        index: I,
        at: usize,
    ) -> Result<Option<&str>, Error> {
        if index.into() == ConstantIndex(0) {
            Ok(None)
        } else {
            self.class_name(index, at).map(Some)
        }
    }

    /// Name and descriptor
    pub fn name_and_type<I: Into<ConstantIndex> + Copy>(
        &self,
        index: I,
        at: usize,
    ) -> Result<(&str, &str), Error> {
        match self.get(index, at)? {
            Constant::NameAndType { name, descriptor } => {
                Ok((self.utf8(*name, at)?, self.utf8(*descriptor, at)?))
            }
            _ => Err(SymbolTable::mismatch(index, at, "NameAndType")),
        }
    }

    pub fn field_ref<I: Into<ConstantIndex> + Copy>(
        &self,
        index: I,
        at: usize,
    ) -> Result<MemberRef, Error> {
        match self.get(index, at)? {
            Constant::FieldRef(class, name_and_type) => {
                let owner = self.class_name(*class, at)?;
                let (name, descriptor) = self.name_and_type(*name_and_type, at)?;
                Ok(MemberRef::new(owner, name, descriptor))
            }
            _ => Err(SymbolTable::mismatch(index, at, "Fieldref")),
        }
    }

    /// Method reference, along with whether it is an `InterfaceMethodref`
    pub fn method_ref<I: Into<ConstantIndex> + Copy>(
        &self,
        index: I,
        at: usize,
    ) -> Result<(MemberRef, bool), Error> {
        match self.get(index, at)? {
            Constant::MethodRef {
                class,
                name_and_type,
                is_interface,
            } => {
                let owner = self.class_name(*class, at)?;
                let (name, descriptor) = self.name_and_type(*name_and_type, at)?;
                Ok((MemberRef::new(owner, name, descriptor), *is_interface))
            }
            _ => Err(SymbolTable::mismatch(index, at, "Methodref")),
        }
    }

    pub fn method_handle<I: Into<ConstantIndex> + Copy>(
        &self,
        index: I,
        at: usize,
    ) -> Result<Handle, Error> {
        match self.get(index, at)? {
            Constant::MethodHandle {
                handle_kind,
                member,
            } => {
                let (member, is_interface) = if handle_kind.is_field() {
                    (self.field_ref(*member, at)?, false)
                } else {
                    self.method_ref(*member, at)?
                };
                Ok(Handle {
                    kind: *handle_kind,
                    member,
                    is_interface,
                })
            }
            _ => Err(SymbolTable::mismatch(index, at, "MethodHandle")),
        }
    }

    /// Constant usable by `ldc`, in a `ConstantValue`, or as a bootstrap argument
    pub fn loadable<I: Into<ConstantIndex> + Copy>(
        &self,
        index: I,
        at: usize,
    ) -> Result<LoadableConstant, Error> {
        let constant = match self.get(index, at)? {
            Constant::Integer(integer) => LoadableConstant::Integer(*integer),
            Constant::Float(float) => LoadableConstant::Float(*float),
            Constant::Long(long) => LoadableConstant::Long(*long),
            Constant::Double(double) => LoadableConstant::Double(*double),
            Constant::String(utf8) => LoadableConstant::String(self.utf8(*utf8, at)?.to_owned()),
            Constant::Class(name) => LoadableConstant::Class(self.utf8(*name, at)?.to_owned()),
            Constant::MethodType { descriptor } => {
                LoadableConstant::MethodType(self.utf8(*descriptor, at)?.to_owned())
            }
            Constant::MethodHandle { .. } => {
                LoadableConstant::MethodHandle(self.method_handle(index, at)?)
            }
            dynamic @ Constant::Dynamic { .. } => {
                let construct = UnsupportedConstruct::Constant(dynamic.tag());
                return Err(Error::unsupported(at, construct));
            }
            _ => return Err(SymbolTable::mismatch(index, at, "loadable constant")),
        };
        Ok(constant)
    }

    /// Bootstrap method position, name, and descriptor of an `invokedynamic` call site
    pub fn invoke_dynamic<I: Into<ConstantIndex> + Copy>(
        &self,
        index: I,
        at: usize,
    ) -> Result<(u16, &str, &str), Error> {
        match self.get(index, at)? {
            Constant::InvokeDynamic {
                bootstrap_method,
                method_descriptor,
            } => {
                let (name, descriptor) = self.name_and_type(*method_descriptor, at)?;
                Ok((*bootstrap_method, name, descriptor))
            }
            _ => Err(SymbolTable::mismatch(index, at, "InvokeDynamic")),
        }
    }
}

/// The count is one more than the largest index, and `long`/`double` entries take two slots
impl Deserialize for SymbolTable {
    fn deserialize(reader: &mut ByteReader<'_>) -> Result<Self, Error> {
        let count_offset = reader.offset();
        let count = reader.read_u16()? as usize;
        if count == 0 {
            return Err(Error::malformed(
                count_offset,
                MalformedKind::InvalidConstantIndex(0),
            ));
        }

        let mut constants = OffsetVec::new_starting_at(Offset(1));
        while constants.offset_len().0 < count {
            let offset = reader.offset();
            constants.push(reader.read::<Constant>()?);
            if constants.offset_len().0 > count {
                let index = (constants.offset_len().0 - 2) as u16;
                return Err(Error::malformed(
                    offset,
                    MalformedKind::InvalidConstantIndex(index),
                ));
            }
        }
        Ok(SymbolTable { constants })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn table(bytes: &[u8]) -> SymbolTable {
        ByteReader::new(bytes).read::<SymbolTable>().unwrap()
    }

    /// #1 = Utf8 "Sample", #2 = Class #1, #3 = Long 5, #5 = String #1
    const POOL: [u8; 25] = [
        0x00, 0x06, // count
        0x01, 0x00, 0x06, b'S', b'a', b'm', b'p', b'l', b'e', // #1
        0x07, 0x00, 0x01, // #2
        0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x05, // #3
        0x08, 0x00, // #5 (truncated below)
    ];

    fn pool_bytes() -> Vec<u8> {
        let mut bytes = POOL.to_vec();
        bytes.push(0x01);
        bytes
    }

    #[test]
    fn resolves_typed_entries() {
        let symbols = table(&pool_bytes());
        assert_eq!(symbols.len(), 4);
        assert_eq!(symbols.class_name(ConstantIndex(2), 0).unwrap(), "Sample");
        assert_eq!(
            symbols.loadable(ConstantIndex(3), 0).unwrap(),
            LoadableConstant::Long(5)
        );
        assert_eq!(
            symbols.loadable(ConstantIndex(5), 0).unwrap(),
            LoadableConstant::String(String::from("Sample"))
        );
        assert_eq!(symbols.optional_class_name(ConstantIndex(0), 0).unwrap(), None);
    }

    #[test]
    fn dangling_and_mistyped_indices() {
        let symbols = table(&pool_bytes());
        let invalid = |index: u16| match symbols.get(ConstantIndex(index), 42) {
            Err(Error::Malformed { offset: 42, kind }) => {
                kind == MalformedKind::InvalidConstantIndex(index)
            }
            _ => false,
        };
        assert!(invalid(0));
        assert!(invalid(4)); // second half of the long
        assert!(invalid(6));

        match symbols.class_name(ConstantIndex(1), 7) {
            Err(Error::Malformed {
                offset: 7,
                kind: MalformedKind::ConstantTypeMismatch { index: 1, .. },
            }) => (),
            other => panic!("expected type mismatch, got {:?}", other),
        }
    }

    #[test]
    fn truncated_pool() {
        match ByteReader::new(&POOL).read::<SymbolTable>() {
            Err(Error::Malformed { offset, kind }) => {
                assert_eq!(offset, 24);
                assert_eq!(kind, MalformedKind::UnexpectedEof);
            }
            other => panic!("expected truncation, got {:?}", other),
        }
    }
}
