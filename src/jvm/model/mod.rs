//! Semantic representations of classes
//!
//! This is the representation to work with when inspecting or editing a class. Every reference
//! to the constant pool is resolved into owned strings and values, so the pool can be dropped
//! after decoding and rebuilt from scratch when encoding.
//!
//!   - __Class__ is represented using [`ClassUnit`]
//!   - __Method__ is represented using [`MethodUnit`]
//!   - __Field__ is represented using [`FieldUnit`]

mod class;
mod field;
mod method;

pub use class::*;
pub use field::*;
pub use method::*;
