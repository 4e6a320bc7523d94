//! Stream definition language front end.
//!
//! A stream definition such as `http --port=9000 | transform --expr=x | log`
//! is tokenized by the [`lexer`], grouped into modules by the [`parser`], and
//! emitted as an ordered list of [`ModuleDeploymentRequest`]s for the
//! scheduler. Parsing is a pure function over text; no state is shared between
//! calls.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Context-sensitive tokenizer for definition text.
pub mod lexer;
/// Groups tokens into modules and emits deployment requests.
pub mod parser;
/// Deployment request value types handed to the scheduler.
pub mod request;

pub use lexer::{Token, TokenKind, tokenize};
pub use parser::{StreamParser, get_parameters, parse};
pub use request::{ModuleDeploymentRequest, ModuleType};

/// Convenience result alias for parser operations.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Category of a definition parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParseErrorKind {
    /// The definition (or its name) is blank.
    EmptyDefinition,
    /// A `|` with no module on one side of it.
    MissingModule,
    /// A module position holds something that is not an identifier.
    InvalidModuleName,
    /// A `--` token that is not a well-formed `--key=value` pair.
    MalformedOption,
    /// The same option key appears twice in one module.
    DuplicateOption,
    /// A token that cannot appear at this position.
    UnexpectedToken,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ParseErrorKind::EmptyDefinition => "empty definition",
            ParseErrorKind::MissingModule => "missing module",
            ParseErrorKind::InvalidModuleName => "invalid module name",
            ParseErrorKind::MalformedOption => "malformed option",
            ParseErrorKind::DuplicateOption => "duplicate option",
            ParseErrorKind::UnexpectedToken => "unexpected token",
        };
        f.write_str(label)
    }
}

/// A definition parse failure.
///
/// `offset` is the character (not byte) position of `fragment` within the raw
/// input text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at offset {offset} ('{fragment}'): {message}")]
pub struct ParseError {
    /// Failure category.
    pub kind: ParseErrorKind,
    /// The offending substring of the input.
    pub fragment: String,
    /// Character offset of `fragment` in the input.
    pub offset: usize,
    /// Human-readable explanation.
    pub message: String,
}

impl ParseError {
    /// Construct a new parse error.
    pub fn new(
        kind: ParseErrorKind,
        fragment: impl Into<String>,
        offset: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            fragment: fragment.into(),
            offset,
            message: message.into(),
        }
    }
}
