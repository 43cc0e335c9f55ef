pub use crate::errors::{ErrorCategory, ErrorKind, HarnessError};
pub use crate::runner::run;

pub mod builder;
pub mod compiler;
pub mod discovery;
pub mod errors;
pub mod loader;
pub mod markers;
pub mod output;
pub mod rewrite;
pub mod runner;
pub mod stylesheet;
pub mod tree;
