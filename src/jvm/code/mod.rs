//! Method bodies
//!
//! ### Structure
//!
//! Despite being pushed off into [just another method attribute](crate::jvm::class_file::Code),
//! the bytecode is arguably the most important part of the class file - it contains the actual
//! executable instructions. Here, a method [`Code`] body is a flat list of [`Instruction`]s,
//! where zero-width markers sit next to the real instructions:
//!
//!   - [`Label`]s mark positions that jumps, switches, exception ranges, local variable ranges,
//!     and `Uninitialized` verification types refer to
//!   - line numbers attach to the instruction that follows them
//!   - stack map [`Frame`]s describe the state at the instruction that follows them
//!
//! Since nothing refers to a bytecode offset, instructions can be inserted anywhere without
//! invalidating anything. Offsets, `tableswitch`/`lookupswitch` padding, short and wide
//! instruction forms, and `StackMapTable` deltas are all recomputed by
//! [`Code::serialize_code`].
//!
//! [0]: https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-6.html#jvms-6.5

mod code;
mod constant;
mod frame;
mod instruction;
mod label;
mod reader;
mod stack;

pub use code::*;
pub use constant::*;
pub use frame::*;
pub use instruction::*;
pub use label::*;
pub use stack::*;
