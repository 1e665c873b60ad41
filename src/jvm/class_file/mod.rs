//! Binary layout of class files
//!
//! Encoding goes through the [`Serialize`] structures here, which hold constant pool indices
//! instead of names. Decoding goes through [`ClassReader`], which resolves those indices against
//! a [`SymbolTable`] as it builds the [object model](crate::jvm::model).

mod attribute;
mod class;
mod constants;
mod reader;
mod serialize;
mod symbol_table;
mod version;

pub use attribute::*;
pub use class::*;
pub use constants::*;
pub use reader::*;
pub use serialize::*;
pub use symbol_table::*;
pub use version::*;
