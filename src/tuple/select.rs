//! Selection expressions over tuples
//!
//! A small path language standing in for general expression evaluation:
//!
//! - `*` selects the whole tuple.
//! - `a` looks up field `a`; `a.b` looks up a field named `a.b`, or failing
//!   that descends into nested tuples. The result is the nested tuple it
//!   names, or the empty tuple when it names anything else.
//! - `a, b.c` (or `{a}` for a single field) projects the listed paths into a
//!   new tuple whose field names are the paths as written. Paths that do not
//!   resolve are skipped.

use super::error::{Result, TupleError};
use super::record::Tuple;
use super::value::Value;

/// A parsed selection expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every field
    All,
    /// A single path, yielding the nested tuple it names
    Path(FieldPath),
    /// Projection onto the listed paths
    Project(Vec<FieldPath>),
}

/// Dotted path through nested tuples
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    text: String,
    segments: Vec<String>,
}

impl FieldPath {
    fn parse(text: &str, expression: &str) -> Result<Self> {
        let segments: Vec<String> = text.split('.').map(|s| s.trim().to_string()).collect();
        if segments.iter().any(String::is_empty) {
            return Err(invalid(expression, format!("empty segment in path '{}'", text)));
        }
        Ok(Self {
            text: segments.join("."),
            segments,
        })
    }

    /// The path as written, whitespace around segments removed
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// A field named exactly like the path wins over descending into nested
    /// tuples.
    fn resolve<'t>(&self, tuple: &'t Tuple) -> Option<&'t Value> {
        if let Ok(value) = tuple.value(self.text.as_str()) {
            return Some(value);
        }
        let (last, parents) = self.segments.split_last()?;
        let mut current = tuple;
        for segment in parents {
            current = current.value(segment.as_str()).ok()?.as_tuple()?;
        }
        current.value(last.as_str()).ok()
    }
}

impl Selection {
    /// Parse a selection expression
    pub fn parse(expression: &str) -> Result<Self> {
        let trimmed = expression.trim();
        if trimmed.is_empty() {
            return Err(invalid(expression, "expression is blank"));
        }
        if trimmed == "*" {
            return Ok(Selection::All);
        }

        let braced = trimmed
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'));
        let body = braced.unwrap_or(trimmed);
        if braced.is_none() && !body.contains(',') {
            return FieldPath::parse(body, expression).map(Selection::Path);
        }

        let paths = body
            .split(',')
            .map(|part| FieldPath::parse(part, expression))
            .collect::<Result<Vec<_>>>()?;
        Ok(Selection::Project(paths))
    }

    /// Evaluate against `tuple`, producing a new tuple sharing its conversion
    /// service
    pub fn apply(&self, tuple: &Tuple) -> Result<Tuple> {
        let conversion = tuple.conversion_service().clone();
        match self {
            Selection::All => Ok(Tuple::new(
                tuple.field_names().to_vec(),
                tuple.values().to_vec(),
                conversion,
            )?),
            Selection::Path(path) => match path.resolve(tuple) {
                Some(Value::Tuple(nested)) => Ok(Tuple::new(
                    nested.field_names().to_vec(),
                    nested.values().to_vec(),
                    conversion,
                )?),
                _ => {
                    tracing::trace!(path = path.as_str(), "selection did not yield a tuple");
                    Ok(Tuple::empty(conversion))
                }
            },
            Selection::Project(paths) => {
                let mut names: Vec<String> = Vec::with_capacity(paths.len());
                let mut values = Vec::with_capacity(paths.len());
                for path in paths {
                    if names.iter().any(|n| n == path.as_str()) {
                        continue;
                    }
                    match path.resolve(tuple) {
                        Some(value) => {
                            names.push(path.as_str().to_string());
                            values.push(value.clone());
                        }
                        None => {
                            tracing::trace!(path = path.as_str(), "skipping unresolved path");
                        }
                    }
                }
                Ok(Tuple::new(names, values, conversion)?)
            }
        }
    }
}

fn invalid(expression: &str, reason: impl Into<String>) -> TupleError {
    TupleError::InvalidSelection {
        expression: expression.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::TupleBuilder;

    fn sample() -> Tuple {
        let address = TupleBuilder::default()
            .put("city", "Oslo")
            .put("zip", "0150")
            .build()
            .unwrap();
        TupleBuilder::default()
            .put("name", "ada")
            .put("age", 36)
            .put("address", address)
            .build()
            .unwrap()
    }

    #[test]
    fn parses_expression_forms() {
        assert_eq!(Selection::parse(" * ").unwrap(), Selection::All);
        assert!(matches!(Selection::parse("a.b").unwrap(), Selection::Path(_)));
        assert!(matches!(Selection::parse("a, b").unwrap(), Selection::Project(p) if p.len() == 2));
        assert!(matches!(Selection::parse("{a}").unwrap(), Selection::Project(p) if p.len() == 1));
    }

    #[test]
    fn rejects_blank_expressions_and_segments() {
        for expression in ["", "  ", "a,,b", "a..b", "{}", ".a"] {
            assert!(
                matches!(Selection::parse(expression), Err(TupleError::InvalidSelection { .. })),
                "{}",
                expression
            );
        }
    }

    #[test]
    fn star_copies_the_tuple() {
        let t = sample();
        let selected = t.select("*").unwrap();
        assert_eq!(selected, t);
        assert_ne!(selected.id(), t.id());
    }

    #[test]
    fn path_to_nested_tuple() {
        let selected = sample().select("address").unwrap();
        assert_eq!(selected.field_names(), &["city".to_string(), "zip".to_string()]);
        assert_eq!(selected.string("city").unwrap(), "Oslo");
    }

    #[test]
    fn path_to_scalar_is_empty() {
        assert!(sample().select("name").unwrap().is_empty());
        assert!(sample().select("missing.field").unwrap().is_empty());
        assert!(sample().select("name.first").unwrap().is_empty());
    }

    #[test]
    fn projection_keeps_listed_fields_in_order() {
        let selected = sample().select("age, address.city, missing, age").unwrap();
        assert_eq!(
            selected.field_names(),
            &["age".to_string(), "address.city".to_string()]
        );
        assert_eq!(selected.int("age").unwrap(), 36);
        assert_eq!(selected.string("address.city").unwrap(), "Oslo");
    }

    #[test]
    fn dotted_field_names_resolve_literally_first() {
        let nested = TupleBuilder::default().put("name", "inner").build().unwrap();
        let t = TupleBuilder::default()
            .put("user.name", "outer")
            .put("age", 36)
            .put("user", nested)
            .build()
            .unwrap();

        let selected = t.select("{user.name,age}").unwrap();
        assert_eq!(selected.field_names(), &["user.name".to_string(), "age".to_string()]);
        assert_eq!(selected.string("user.name").unwrap(), "outer");
    }

    #[test]
    fn projecting_all_field_names_round_trips() {
        let t = sample();
        let expression = format!("{{{}}}", t.field_names().join(","));
        assert_eq!(t.select(&expression).unwrap(), t);
    }
}
