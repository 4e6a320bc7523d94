//! Streamdef – stream definition front end and tuple records
//!
//! This crate implements the two pure, in-process pieces of a distributed
//! pipeline platform:
//! - The stream definition language parser that turns text such as
//!   `http --port=9000 | filter --expr=x>1 | log` into module deployment
//!   requests for a scheduler
//! - The tuple record type that running modules exchange, with typed access
//!   through a pluggable conversion service

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Parser and conversion configuration
pub mod config;
/// Stream definition lexer, parser, and deployment requests
pub mod stream;
/// Tuple records, values, and conversions
pub mod tuple;

// Re-export key types for convenience
pub use config::Config;
pub use stream::{ModuleDeploymentRequest, ModuleType, ParseError, ParseErrorKind, StreamParser};
pub use tuple::{Tuple, TupleBuilder, Value};

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
