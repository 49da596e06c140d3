pub mod cli;
pub mod config;
pub mod executor;
pub mod parser;
pub mod program;

// Re-export main types
pub use executor::{Runtime, RuntimeBuilder, Value, VmError};
pub use parser::{parse, ParseError};
