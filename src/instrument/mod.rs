//! Entry logging
//!
//! The pass inserts, at the start of every method of the target classes (except constructors and
//! static initializers), the equivalent of:
//!
//! ```java,ignore,no_run
//! System.out.println("Enter method-> Klass.method");
//! ```
//!
//! and grows the declared `max_stack` of the method to make room for it. Which classes are
//! targets, and what exactly gets printed where, is configured through [`Settings`].

mod entry_log;
mod settings;

pub use entry_log::*;
pub use settings::*;
