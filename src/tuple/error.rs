//! Error types for tuple construction and field access

use thiserror::Error;

use super::conversion::ConversionFailure;

/// Constructor violations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TupleShapeError {
    /// Names and values differ in length
    #[error("Field names must be same length as values: {names} names, {values} values")]
    SizeMismatch {
        /// Number of names supplied
        names: usize,
        /// Number of values supplied
        values: usize,
    },

    /// A field name is the empty string
    #[error("Field names must not be empty")]
    EmptyName,

    /// A field name appears more than once
    #[error("Duplicate field name [{0}]")]
    DuplicateName(String),

    /// A field holds `Value::Null`
    #[error("Field [{0}] has a null value")]
    NullValue(String),
}

/// Field access errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TupleError {
    /// No field has the requested name
    #[error("Cannot access field [{name}] from {known:?}")]
    UnknownField {
        /// Requested field name
        name: String,
        /// Field names the tuple does have
        known: Vec<String>,
    },

    /// Positional access past the last field
    #[error("Field index {index} out of bounds for tuple of size {size}")]
    IndexOutOfBounds {
        /// Requested index
        index: usize,
        /// Number of fields
        size: usize,
    },

    /// The conversion service could not produce the requested type
    #[error("Cannot convert field {field}: {source}")]
    Conversion {
        /// Field name (`[name]`) or position (`#index`)
        field: String,
        /// Underlying conversion failure
        #[source]
        source: ConversionFailure,
    },

    /// A selection expression could not be parsed
    #[error("Invalid selection '{expression}': {reason}")]
    InvalidSelection {
        /// The expression as given
        expression: String,
        /// What is wrong with it
        reason: String,
    },

    /// Constructor violation while building a derived tuple
    #[error(transparent)]
    Shape(#[from] TupleShapeError),
}

/// Convenience result alias for tuple operations
pub type Result<T> = std::result::Result<T, TupleError>;
