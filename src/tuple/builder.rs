use std::sync::Arc;

use indexmap::IndexMap;

use super::conversion::{ConversionService, DefaultConversionService};
use super::error::TupleShapeError;
use super::record::Tuple;
use super::value::Value;
use crate::config::ConversionConfig;

/// Accumulates fields and builds [`Tuple`]s that share one conversion service.
///
/// The builder is where the conversion service is injected; every tuple it
/// produces (and every tuple selected from those) references the same service.
#[derive(Debug, Clone)]
pub struct TupleBuilder {
    names: Vec<String>,
    values: Vec<Value>,
    conversion: Arc<dyn ConversionService>,
}

impl Default for TupleBuilder {
    fn default() -> Self {
        Self::new(Arc::new(DefaultConversionService::default()))
    }
}

impl TupleBuilder {
    /// Create a builder around an existing conversion service.
    pub fn new(conversion: Arc<dyn ConversionService>) -> Self {
        Self {
            names: Vec::new(),
            values: Vec::new(),
            conversion,
        }
    }

    /// Create a builder with a [`DefaultConversionService`] using `config`.
    pub fn with_config(config: &ConversionConfig) -> Self {
        Self::new(Arc::new(DefaultConversionService::new(config.clone())))
    }

    /// The conversion service handed to built tuples.
    pub fn conversion_service(&self) -> &Arc<dyn ConversionService> {
        &self.conversion
    }

    /// Append a field.
    pub fn put(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.names.push(name.into());
        self.values.push(value.into());
        self
    }

    /// Append several fields in order.
    pub fn put_all<N, V>(mut self, fields: impl IntoIterator<Item = (N, V)>) -> Self
    where
        N: Into<String>,
        V: Into<Value>,
    {
        for (name, value) in fields {
            self.names.push(name.into());
            self.values.push(value.into());
        }
        self
    }

    /// Build a tuple from the accumulated fields.
    pub fn build(self) -> Result<Tuple, TupleShapeError> {
        Tuple::new(self.names, self.values, self.conversion)
    }

    /// Build a tuple directly from parallel names and values, ignoring any
    /// accumulated fields.
    pub fn of(&self, names: Vec<String>, values: Vec<Value>) -> Result<Tuple, TupleShapeError> {
        Tuple::new(names, values, self.conversion.clone())
    }

    /// Build a tuple from an insertion-ordered map.
    pub fn from_map(&self, map: IndexMap<String, Value>) -> Result<Tuple, TupleShapeError> {
        Tuple::from_map(map, self.conversion.clone())
    }

    /// A tuple with no fields.
    pub fn empty(&self) -> Tuple {
        Tuple::empty(self.conversion.clone())
    }
}
