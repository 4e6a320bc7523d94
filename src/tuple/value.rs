use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::record::Tuple;

/// Type descriptor for a [`Value`], used as the conversion target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Absence of a value.
    Null,
    /// Boolean.
    Bool,
    /// 8-bit signed integer.
    Byte,
    /// 16-bit signed integer.
    Short,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    /// Arbitrary precision decimal.
    BigDecimal,
    /// UTF-8 text.
    String,
    /// Single character.
    Char,
    /// UTC instant.
    Date,
    /// Raw bytes.
    Bytes,
    /// Nested tuple.
    Tuple,
    /// Application-defined payload.
    Opaque,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Null => "null",
            ValueType::Bool => "bool",
            ValueType::Byte => "byte",
            ValueType::Short => "short",
            ValueType::Int => "int",
            ValueType::Long => "long",
            ValueType::Float => "float",
            ValueType::Double => "double",
            ValueType::BigDecimal => "bigdecimal",
            ValueType::String => "string",
            ValueType::Char => "char",
            ValueType::Date => "date",
            ValueType::Bytes => "bytes",
            ValueType::Tuple => "tuple",
            ValueType::Opaque => "opaque",
        };
        f.write_str(name)
    }
}

/// Shared handle to an application-defined value carried through a tuple.
///
/// Two opaque values are equal only when they share the same allocation.
#[derive(Clone)]
pub struct Opaque {
    type_name: &'static str,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Opaque {
    /// Wrap an arbitrary value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            inner: Arc::new(value),
        }
    }

    /// Rust type name of the wrapped value.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Borrow the wrapped value if it has type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }
}

impl PartialEq for Opaque {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for Opaque {}

impl Hash for Opaque {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque({})", self.type_name)
    }
}

/// A single tuple field value.
///
/// Floats compare by bit pattern so that equality stays reflexive and agrees
/// with hashing.
#[derive(Debug, Clone)]
pub enum Value {
    /// Absence of a value. Never stored in a tuple.
    Null,
    /// Boolean.
    Bool(bool),
    /// 8-bit signed integer.
    Byte(i8),
    /// 16-bit signed integer.
    Short(i16),
    /// 32-bit signed integer.
    Int(i32),
    /// 64-bit signed integer.
    Long(i64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// Arbitrary precision decimal.
    BigDecimal(BigDecimal),
    /// UTF-8 text.
    String(String),
    /// Single character.
    Char(char),
    /// UTC instant.
    Date(DateTime<Utc>),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Nested tuple, addressable by dotted selection paths.
    Tuple(Box<Tuple>),
    /// Application-defined payload.
    Opaque(Opaque),
}

impl Value {
    /// Type descriptor of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Bool,
            Value::Byte(_) => ValueType::Byte,
            Value::Short(_) => ValueType::Short,
            Value::Int(_) => ValueType::Int,
            Value::Long(_) => ValueType::Long,
            Value::Float(_) => ValueType::Float,
            Value::Double(_) => ValueType::Double,
            Value::BigDecimal(_) => ValueType::BigDecimal,
            Value::String(_) => ValueType::String,
            Value::Char(_) => ValueType::Char,
            Value::Date(_) => ValueType::Date,
            Value::Bytes(_) => ValueType::Bytes,
            Value::Tuple(_) => ValueType::Tuple,
            Value::Opaque(_) => ValueType::Opaque,
        }
    }

    /// Whether this is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Convenience accessor for string references.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(text) => Some(text),
            _ => None,
        }
    }

    /// Convenience accessor for nested tuples.
    pub fn as_tuple(&self) -> Option<&Tuple> {
        match self {
            Value::Tuple(tuple) => Some(tuple),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::BigDecimal(a), Value::BigDecimal(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Opaque(a), Value::Opaque(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(v) => v.hash(state),
            Value::Byte(v) => v.hash(state),
            Value::Short(v) => v.hash(state),
            Value::Int(v) => v.hash(state),
            Value::Long(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::Double(v) => v.to_bits().hash(state),
            Value::BigDecimal(v) => v.hash(state),
            Value::String(v) => v.hash(state),
            Value::Char(v) => v.hash(state),
            Value::Date(v) => v.hash(state),
            Value::Bytes(v) => v.hash(state),
            Value::Tuple(v) => v.hash(state),
            Value::Opaque(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Byte(v) => write!(f, "{}", v),
            Value::Short(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::BigDecimal(v) => write!(f, "{}", v),
            Value::String(v) => f.write_str(v),
            Value::Char(v) => write!(f, "{}", v),
            Value::Date(v) => f.write_str(&v.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Value::Bytes(v) => write!(f, "{:?}", v),
            Value::Tuple(v) => write!(f, "{}", v),
            Value::Opaque(v) => write!(f, "<{}>", v.type_name()),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    BigDecimal => BigDecimal,
    String => String,
    char => Char,
    DateTime<Utc> => Date,
    Vec<u8> => Bytes,
    Opaque => Opaque,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<Tuple> for Value {
    fn from(value: Tuple) -> Self {
        Value::Tuple(Box::new(value))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Rust types that a converted [`Value`] can be unwrapped into.
pub trait FromValue: Sized {
    /// Conversion target handed to the conversion service.
    const VALUE_TYPE: ValueType;

    /// Unwrap a value already converted to [`Self::VALUE_TYPE`].
    fn from_value(value: Value) -> Option<Self>;
}

macro_rules! from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FromValue for $ty {
                const VALUE_TYPE: ValueType = ValueType::$variant;

                fn from_value(value: Value) -> Option<Self> {
                    match value {
                        Value::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            }
        )*
    };
}

from_value! {
    bool => Bool,
    i8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    BigDecimal => BigDecimal,
    String => String,
    char => Char,
    DateTime<Utc> => Date,
    Vec<u8> => Bytes,
    Opaque => Opaque,
}

impl FromValue for Tuple {
    const VALUE_TYPE: ValueType = ValueType::Tuple;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Tuple(inner) => Some(*inner),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(value: &Value) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn nan_equals_itself() {
        let a = Value::Double(f64::NAN);
        assert_eq!(a, a.clone());
        assert_eq!(hash_of(&a), hash_of(&a.clone()));
    }

    #[test]
    fn different_tags_are_not_equal() {
        assert_ne!(Value::Int(1), Value::Long(1));
        assert_ne!(Value::from("1"), Value::Int(1));
    }

    #[test]
    fn opaque_equality_is_identity() {
        let a = Opaque::new(vec![1, 2, 3]);
        let b = Opaque::new(vec![1, 2, 3]);
        assert_eq!(Value::Opaque(a.clone()), Value::Opaque(a.clone()));
        assert_ne!(Value::Opaque(a.clone()), Value::Opaque(b));
        assert_eq!(a.downcast_ref::<Vec<i32>>(), Some(&vec![1, 2, 3]));
        assert!(a.type_name().contains("Vec"));
    }

    #[test]
    fn option_none_becomes_null() {
        assert!(Value::from(None::<i32>).is_null());
        assert_eq!(Value::from(Some(3)), Value::Int(3));
    }

    #[test]
    fn from_value_checks_the_tag() {
        assert_eq!(i32::from_value(Value::Int(7)), Some(7));
        assert_eq!(i32::from_value(Value::Long(7)), None);
        assert_eq!(String::from_value("x".into()), Some("x".to_string()));
    }
}
