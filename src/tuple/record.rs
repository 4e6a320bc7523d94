use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::conversion::{ConversionFailure, ConversionService, parse_date};
use super::error::{Result, TupleError, TupleShapeError};
use super::select::Selection;
use super::value::{FromValue, Value, ValueType};

/// Tuple identifier, unique per construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TupleId(pub Uuid);

impl TupleId {
    /// Create a new random TupleId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TupleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TupleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Addresses a tuple field by name or by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field<'a> {
    /// Field name.
    Name(&'a str),
    /// Zero-based position.
    Index(usize),
}

impl<'a> From<&'a str> for Field<'a> {
    fn from(name: &'a str) -> Self {
        Field::Name(name)
    }
}

impl<'a> From<&'a String> for Field<'a> {
    fn from(name: &'a String) -> Self {
        Field::Name(name)
    }
}

impl From<usize> for Field<'_> {
    fn from(index: usize) -> Self {
        Field::Index(index)
    }
}

impl fmt::Display for Field<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Name(name) => write!(f, "[{}]", name),
            Field::Index(index) => write!(f, "#{}", index),
        }
    }
}

/// Immutable, ordered, name-indexed record of heterogeneous values.
///
/// Typed accessors delegate to the tuple's [`ConversionService`]. Equality and
/// hashing consider only names and values; `id` and `timestamp` are ignored.
#[derive(Clone)]
pub struct Tuple {
    names: Vec<String>,
    values: Vec<Value>,
    id: TupleId,
    timestamp: i64,
    conversion: Arc<dyn ConversionService>,
}

impl Tuple {
    /// Construct a tuple, taking ownership of `names` and `values`.
    ///
    /// Fails when the lengths differ, a name is empty or repeated, or a value
    /// is [`Value::Null`].
    pub fn new(
        names: Vec<String>,
        values: Vec<Value>,
        conversion: Arc<dyn ConversionService>,
    ) -> std::result::Result<Self, TupleShapeError> {
        validate_shape(&names, &values)?;
        Ok(Self {
            names,
            values,
            id: TupleId::new(),
            timestamp: Utc::now().timestamp_millis(),
            conversion,
        })
    }

    /// A tuple with no fields.
    pub fn empty(conversion: Arc<dyn ConversionService>) -> Self {
        Self {
            names: Vec::new(),
            values: Vec::new(),
            id: TupleId::new(),
            timestamp: Utc::now().timestamp_millis(),
            conversion,
        }
    }

    /// Build a tuple from an insertion-ordered name -> value map.
    pub fn from_map(
        map: IndexMap<String, Value>,
        conversion: Arc<dyn ConversionService>,
    ) -> std::result::Result<Self, TupleShapeError> {
        let (names, values) = map.into_iter().unzip();
        Self::new(names, values, conversion)
    }

    /// Copy the fields into an insertion-ordered name -> value map.
    pub fn to_map(&self) -> IndexMap<String, Value> {
        self.names
            .iter()
            .cloned()
            .zip(self.values.iter().cloned())
            .collect()
    }

    /// Unique identifier assigned at construction.
    pub fn id(&self) -> TupleId {
        self.id
    }

    /// Construction time in epoch milliseconds.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Number of fields.
    pub fn size(&self) -> usize {
        self.values.len()
    }

    /// Number of fields.
    pub fn field_count(&self) -> usize {
        self.names.len()
    }

    /// Whether the tuple has no fields.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Field names in order.
    pub fn field_names(&self) -> &[String] {
        &self.names
    }

    /// Raw values in field order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Type of each value in field order.
    pub fn field_types(&self) -> Vec<ValueType> {
        self.values.iter().map(Value::value_type).collect()
    }

    /// The conversion service used by typed accessors.
    pub fn conversion_service(&self) -> &Arc<dyn ConversionService> {
        &self.conversion
    }

    /// Whether a field with this name exists.
    pub fn has_field(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Position of the named field.
    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| TupleError::UnknownField {
                name: name.to_string(),
                known: self.names.clone(),
            })
    }

    /// Raw value, without conversion.
    pub fn value<'a>(&self, field: impl Into<Field<'a>>) -> Result<&Value> {
        let index = self.resolve(field.into())?;
        Ok(&self.values[index])
    }

    /// Value converted to `T` by the conversion service.
    pub fn get<'a, T: FromValue>(&self, field: impl Into<Field<'a>>) -> Result<T> {
        let field = field.into();
        let index = self.resolve(field)?;
        self.convert(index, field)
    }

    /// Text form of the value, trimmed.
    pub fn string<'a>(&self, field: impl Into<Field<'a>>) -> Result<String> {
        let field = field.into();
        let index = self.resolve(field)?;
        self.read_and_trim(index, field)
    }

    /// The single character of the trimmed text form.
    pub fn char<'a>(&self, field: impl Into<Field<'a>>) -> Result<char> {
        let field = field.into();
        let index = self.resolve(field)?;
        let text = self.read_and_trim(index, field)?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => Ok(ch),
            _ => Err(TupleError::Conversion {
                field: field.to_string(),
                source: ConversionFailure::new(
                    &self.values[index],
                    ValueType::Char,
                    format!("cannot convert field value '{}' to char", text),
                ),
            }),
        }
    }

    /// True when the trimmed text form is exactly `"true"`.
    pub fn bool<'a>(&self, field: impl Into<Field<'a>>) -> Result<bool> {
        self.bool_with(field, "true")
    }

    /// True when the trimmed text form equals `true_value`; false otherwise.
    pub fn bool_with<'a>(&self, field: impl Into<Field<'a>>, true_value: &str) -> Result<bool> {
        let field = field.into();
        let index = self.resolve(field)?;
        Ok(self.read_and_trim(index, field)? == true_value)
    }

    /// Value as an 8-bit integer.
    pub fn byte<'a>(&self, field: impl Into<Field<'a>>) -> Result<i8> {
        self.get(field)
    }

    /// Value as a 16-bit integer.
    pub fn short<'a>(&self, field: impl Into<Field<'a>>) -> Result<i16> {
        self.get(field)
    }

    /// Value as a 32-bit integer.
    pub fn int<'a>(&self, field: impl Into<Field<'a>>) -> Result<i32> {
        self.get(field)
    }

    /// Value as a 64-bit integer.
    pub fn long<'a>(&self, field: impl Into<Field<'a>>) -> Result<i64> {
        self.get(field)
    }

    /// Value as a 32-bit float.
    pub fn float<'a>(&self, field: impl Into<Field<'a>>) -> Result<f32> {
        self.get(field)
    }

    /// Value as a 64-bit float.
    pub fn double<'a>(&self, field: impl Into<Field<'a>>) -> Result<f64> {
        self.get(field)
    }

    /// Value as an arbitrary precision decimal.
    pub fn big_decimal<'a>(&self, field: impl Into<Field<'a>>) -> Result<BigDecimal> {
        self.get(field)
    }

    /// Value as a date, using the conversion service's default pattern.
    pub fn date<'a>(&self, field: impl Into<Field<'a>>) -> Result<DateTime<Utc>> {
        self.get(field)
    }

    /// Trimmed text form parsed with a strftime `pattern`.
    pub fn date_with_pattern<'a>(
        &self,
        field: impl Into<Field<'a>>,
        pattern: &str,
    ) -> Result<DateTime<Utc>> {
        let field = field.into();
        let index = self.resolve(field)?;
        let text = self.read_and_trim(index, field)?;
        parse_date(&text, pattern).map_err(|reason| TupleError::Conversion {
            field: field.to_string(),
            source: ConversionFailure::new(&Value::String(text), ValueType::Date, reason),
        })
    }

    /// Evaluate a selection expression against this tuple.
    ///
    /// See [`Selection`] for the expression forms.
    pub fn select(&self, expression: &str) -> Result<Tuple> {
        Selection::parse(expression)?.apply(self)
    }

    fn resolve(&self, field: Field<'_>) -> Result<usize> {
        match field {
            Field::Name(name) => self.index_of(name),
            Field::Index(index) if index < self.values.len() => Ok(index),
            Field::Index(index) => Err(TupleError::IndexOutOfBounds {
                index,
                size: self.values.len(),
            }),
        }
    }

    fn convert<T: FromValue>(&self, index: usize, field: Field<'_>) -> Result<T> {
        let raw = &self.values[index];
        let converted = self
            .conversion
            .convert(raw, T::VALUE_TYPE)
            .map_err(|source| TupleError::Conversion {
                field: field.to_string(),
                source,
            })?;
        let produced = converted.value_type();
        T::from_value(converted).ok_or_else(|| TupleError::Conversion {
            field: field.to_string(),
            source: ConversionFailure::new(
                raw,
                T::VALUE_TYPE,
                format!("conversion service produced a {} value", produced),
            ),
        })
    }

    fn read_and_trim(&self, index: usize, field: Field<'_>) -> Result<String> {
        let text: String = self.convert(index, field)?;
        Ok(text.trim().to_string())
    }
}

fn validate_shape(names: &[String], values: &[Value]) -> std::result::Result<(), TupleShapeError> {
    if names.len() != values.len() {
        return Err(TupleShapeError::SizeMismatch {
            names: names.len(),
            values: values.len(),
        });
    }
    let mut seen = HashSet::with_capacity(names.len());
    for (name, value) in names.iter().zip(values) {
        if name.is_empty() {
            return Err(TupleShapeError::EmptyName);
        }
        if !seen.insert(name.as_str()) {
            return Err(TupleShapeError::DuplicateName(name.clone()));
        }
        if value.is_null() {
            return Err(TupleShapeError::NullValue(name.clone()));
        }
    }
    Ok(())
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.names == other.names && self.values == other.values
    }
}

impl Eq for Tuple {}

impl Hash for Tuple {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.names.hash(state);
        self.values.hash(state);
    }
}

impl fmt::Debug for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tuple")
            .field("names", &self.names)
            .field("values", &self.values)
            .field("id", &self.id)
            .field("timestamp", &self.timestamp)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Tuple [names=[")?;
        for (i, name) in self.names.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(name)?;
        }
        f.write_str("], values=[")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, "], id={}, timestamp={}]", self.id, self.timestamp)
    }
}
