//! Tuple record type exchanged between running modules.
//!
//! A [`Tuple`] is an immutable, ordered, name-indexed record of heterogeneous
//! [`Value`]s. Typed accessors delegate to a [`ConversionService`] injected
//! through the [`TupleBuilder`]; the service is shared, never global.

/// Builders that inject the conversion service.
pub mod builder;
/// Conversion service trait and default implementation.
pub mod conversion;
/// Tuple construction and access errors.
pub mod error;
/// The tuple record and its accessors.
pub mod record;
/// Selection expressions.
pub mod select;
/// Field value representation.
pub mod value;

pub use builder::TupleBuilder;
pub use conversion::{ConversionFailure, ConversionService, DefaultConversionService, parse_date};
pub use error::{Result, TupleError, TupleShapeError};
pub use record::{Field, Tuple, TupleId};
pub use select::{FieldPath, Selection};
pub use value::{FromValue, Opaque, Value, ValueType};
