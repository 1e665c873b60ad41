//! Read, edit, and write JVM classes
//!
//! ### Simple example
//!
//! Consider the following simple Java class:
//!
//! ```java,ignore,no_run
//! public class Greeter {
//!     public static void greet() {
//!         System.out.println("hello");
//!     }
//! }
//! ```
//!
//! Building an analogous class, encoding it, and reading it back can be done as follows:
//!
//! ```
//! use classtrace::jvm::class_file::Version;
//! use classtrace::jvm::code::{opcodes, Code, Instruction};
//! use classtrace::jvm::*;
//!
//! # fn generate_class() -> Result<(), Error> {
//! let mut class = ClassUnit::new(
//!     Version::JAVA8,
//!     ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
//!     "me/alec/Greeter",
//!     Some(ROOT_CLASS_NAME),
//! );
//!
//! // Generate the method body
//! let mut code = Code::new(2, 0);
//! code.instructions.push(Instruction::get_static(
//!     "java/lang/System",
//!     "out",
//!     "Ljava/io/PrintStream;",
//! ));
//! code.instructions.push(Instruction::ldc_string("hello"));
//! code.instructions.push(Instruction::invoke_virtual(
//!     "java/io/PrintStream",
//!     "println",
//!     "(Ljava/lang/String;)V",
//! ));
//! code.instructions.push(Instruction::Plain(opcodes::RETURN));
//!
//! let mut greet = MethodUnit::new(
//!     MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
//!     "greet",
//!     "()V",
//! );
//! greet.code = Some(code);
//! class.methods.push(greet);
//!
//! // Encode the class into bytes, then decode it again
//! let class_bytes: Vec<u8> = encode(&class)?;
//! let decoded: ClassUnit = decode(&class_bytes)?;
//! assert_eq!(decoded.methods[0].name, "greet");
//! # Ok(())
//! # }
//! # generate_class().unwrap();
//! ```

mod access_flags;
pub mod class_file;
pub mod code;
mod descriptors;
mod errors;
pub mod model;
mod printer;
mod visitor;

pub use access_flags::*;
pub use class_file::{decode, ClassReader};
pub use descriptors::*;
pub use errors::*;
pub use model::*;
pub use printer::*;
pub use visitor::*;
