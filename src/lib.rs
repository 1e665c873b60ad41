pub mod agent;
pub mod instrument;
pub mod jvm;
mod util;
