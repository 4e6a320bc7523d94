//! Typed coercion of tuple values
//!
//! Tuples hold heterogeneous [`Value`]s and delegate typed access to a
//! [`ConversionService`]. [`DefaultConversionService`] covers the primitive
//! ladder and string parsing; applications can inject their own.

use std::fmt::{self, Write};
use std::str::FromStr;

use bigdecimal::{BigDecimal, FromPrimitive, ToPrimitive};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

use super::value::{Value, ValueType};
use crate::config::ConversionConfig;

/// Converts values between [`ValueType`]s.
///
/// The source type is the tag of `value`. Implementations are shared by every
/// tuple built from the same builder and must be thread-safe.
pub trait ConversionService: fmt::Debug + Send + Sync {
    /// Convert `value` to `target`.
    fn convert(&self, value: &Value, target: ValueType) -> Result<Value, ConversionFailure>;
}

/// A conversion the service could not perform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert {from} value '{value}' to {target}: {reason}")]
pub struct ConversionFailure {
    /// Type of the input value
    pub from: ValueType,
    /// Requested type
    pub target: ValueType,
    /// Rendering of the input value
    pub value: String,
    /// Why the conversion failed
    pub reason: String,
}

impl ConversionFailure {
    /// Describe a failed conversion of `value` to `target`.
    pub fn new(value: &Value, target: ValueType, reason: impl Into<String>) -> Self {
        Self {
            from: value.value_type(),
            target,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Conversion service for the built-in value types.
#[derive(Debug, Clone, Default)]
pub struct DefaultConversionService {
    config: ConversionConfig,
}

impl DefaultConversionService {
    /// Create a service with explicit settings.
    pub fn new(config: ConversionConfig) -> Self {
        Self { config }
    }

    /// strftime pattern used for dates.
    pub fn date_pattern(&self) -> &str {
        &self.config.date_pattern
    }

    fn to_text(&self, value: &Value) -> Result<String, String> {
        match value {
            Value::String(text) => Ok(text.clone()),
            Value::Bool(_)
            | Value::Byte(_)
            | Value::Short(_)
            | Value::Int(_)
            | Value::Long(_)
            | Value::Float(_)
            | Value::Double(_)
            | Value::BigDecimal(_)
            | Value::Char(_) => Ok(value.to_string()),
            Value::Date(date) => format_date(date, self.date_pattern()),
            Value::Bytes(bytes) => {
                String::from_utf8(bytes.clone()).map_err(|_| "bytes are not valid UTF-8".to_string())
            }
            other => Err(format!("{} has no text form", other.value_type())),
        }
    }

    fn to_date(&self, value: &Value) -> Result<DateTime<Utc>, String> {
        match value {
            Value::String(text) => {
                let text = text.trim();
                parse_date(text, self.date_pattern()).or_else(|err| {
                    DateTime::parse_from_rfc3339(text)
                        .map(|date| date.with_timezone(&Utc))
                        .map_err(|_| err)
                })
            }
            Value::Int(_) | Value::Long(_) => {
                let millis = integral(value)?;
                DateTime::<Utc>::from_timestamp_millis(millis)
                    .ok_or_else(|| "epoch milliseconds out of range".to_string())
            }
            other => Err(format!("{} is not a date", other.value_type())),
        }
    }
}

impl ConversionService for DefaultConversionService {
    fn convert(&self, value: &Value, target: ValueType) -> Result<Value, ConversionFailure> {
        let from = value.value_type();
        if from == target || value.is_null() {
            return Ok(value.clone());
        }
        tracing::trace!(%from, %target, "converting tuple value");

        let converted = match target {
            ValueType::String => self.to_text(value).map(Value::String),
            ValueType::Bool => boolean(value).map(Value::Bool),
            ValueType::Byte => integral(value).and_then(narrow::<i8>).map(Value::Byte),
            ValueType::Short => integral(value).and_then(narrow::<i16>).map(Value::Short),
            ValueType::Int => integral(value).and_then(narrow::<i32>).map(Value::Int),
            ValueType::Long => integral(value).map(Value::Long),
            ValueType::Float => floating(value).and_then(single_precision).map(Value::Float),
            ValueType::Double => floating(value).map(Value::Double),
            ValueType::BigDecimal => decimal(value).map(Value::BigDecimal),
            ValueType::Char => character(value).map(Value::Char),
            ValueType::Date => self.to_date(value).map(Value::Date),
            ValueType::Bytes => match value {
                Value::String(text) => Ok(Value::Bytes(text.as_bytes().to_vec())),
                other => Err(format!("{} has no byte form", other.value_type())),
            },
            ValueType::Null | ValueType::Tuple | ValueType::Opaque => {
                Err(format!("no conversion to {}", target))
            }
        };

        converted.map_err(|reason| ConversionFailure::new(value, target, reason))
    }
}

/// Parse `text` with a strftime `pattern`.
///
/// Patterns with a timezone yield that instant; patterns with a time but no
/// zone are read as UTC; date-only patterns yield UTC midnight.
pub fn parse_date(text: &str, pattern: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(date) = DateTime::parse_from_str(text, pattern) {
        return Ok(date.with_timezone(&Utc));
    }
    match NaiveDateTime::parse_from_str(text, pattern) {
        Ok(date) => Ok(date.and_utc()),
        Err(err) => NaiveDate::parse_from_str(text, pattern)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|date| date.and_utc())
            .ok_or_else(|| format!("'{}' does not match pattern '{}': {}", text, pattern, err)),
    }
}

fn format_date(date: &DateTime<Utc>, pattern: &str) -> Result<String, String> {
    let mut out = String::new();
    write!(out, "{}", date.format(pattern))
        .map_err(|_| format!("invalid date pattern '{}'", pattern))?;
    Ok(out)
}

fn boolean(value: &Value) -> Result<bool, String> {
    match value {
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "on" | "yes" | "1" => Ok(true),
            "false" | "off" | "no" | "0" => Ok(false),
            _ => Err("not a boolean literal".to_string()),
        },
        other => Err(format!("{} is not a boolean", other.value_type())),
    }
}

fn integral(value: &Value) -> Result<i64, String> {
    match value {
        Value::Byte(n) => Ok(i64::from(*n)),
        Value::Short(n) => Ok(i64::from(*n)),
        Value::Int(n) => Ok(i64::from(*n)),
        Value::Long(n) => Ok(*n),
        Value::Float(n) => truncate(f64::from(*n)),
        Value::Double(n) => truncate(*n),
        Value::BigDecimal(n) => n
            .with_scale(0)
            .to_i64()
            .ok_or_else(|| "value out of range".to_string()),
        Value::String(text) => parse_integer(text.trim()),
        other => Err(format!("{} is not numeric", other.value_type())),
    }
}

/// Decimal, `0x`-prefixed or `#`-prefixed hexadecimal, with optional sign.
fn parse_integer(text: &str) -> Result<i64, String> {
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let hex = unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
        .or_else(|| unsigned.strip_prefix('#'));
    let (digits, radix) = match hex {
        Some(digits) => (digits, 16),
        None => (unsigned, 10),
    };
    // only one sign, and only ahead of the radix prefix
    if digits.is_empty() || !digits.chars().all(|ch| ch.is_digit(radix)) {
        return Err("not an integer literal".to_string());
    }
    let magnitude =
        i128::from_str_radix(digits, radix).map_err(|_| "value out of range".to_string())?;
    let signed = if negative {
        magnitude.checked_neg()
    } else {
        Some(magnitude)
    };
    signed
        .and_then(|n| i64::try_from(n).ok())
        .ok_or_else(|| "value out of range".to_string())
}

fn truncate(n: f64) -> Result<i64, String> {
    if !n.is_finite() {
        return Err("not a finite number".to_string());
    }
    let whole = n.trunc();
    if whole < i64::MIN as f64 || whole >= i64::MAX as f64 {
        return Err("value out of range".to_string());
    }
    Ok(whole as i64)
}

fn narrow<T: TryFrom<i64>>(n: i64) -> Result<T, String> {
    T::try_from(n).map_err(|_| "value out of range".to_string())
}

fn floating(value: &Value) -> Result<f64, String> {
    match value {
        Value::Byte(n) => Ok(f64::from(*n)),
        Value::Short(n) => Ok(f64::from(*n)),
        Value::Int(n) => Ok(f64::from(*n)),
        Value::Long(n) => Ok(*n as f64),
        Value::Float(n) => Ok(f64::from(*n)),
        Value::Double(n) => Ok(*n),
        Value::BigDecimal(n) => n.to_f64().ok_or_else(|| "value out of range".to_string()),
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| "not a number literal".to_string()),
        other => Err(format!("{} is not numeric", other.value_type())),
    }
}

fn single_precision(n: f64) -> Result<f32, String> {
    let narrowed = n as f32;
    if n.is_finite() && narrowed.is_infinite() {
        return Err("value out of range".to_string());
    }
    Ok(narrowed)
}

fn decimal(value: &Value) -> Result<BigDecimal, String> {
    match value {
        Value::Byte(n) => Ok(BigDecimal::from(*n)),
        Value::Short(n) => Ok(BigDecimal::from(*n)),
        Value::Int(n) => Ok(BigDecimal::from(*n)),
        Value::Long(n) => Ok(BigDecimal::from(*n)),
        Value::Float(n) => {
            BigDecimal::from_f32(*n).ok_or_else(|| "not a finite number".to_string())
        }
        Value::Double(n) => {
            BigDecimal::from_f64(*n).ok_or_else(|| "not a finite number".to_string())
        }
        Value::String(text) => {
            BigDecimal::from_str(text.trim()).map_err(|_| "not a decimal literal".to_string())
        }
        other => Err(format!("{} is not numeric", other.value_type())),
    }
}

fn character(value: &Value) -> Result<char, String> {
    match value {
        Value::String(text) => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) => Ok(ch),
                _ => Err("must be exactly one character".to_string()),
            }
        }
        other => Err(format!("{} is not a character", other.value_type())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn convert(value: impl Into<Value>, target: ValueType) -> Result<Value, ConversionFailure> {
        DefaultConversionService::default().convert(&value.into(), target)
    }

    #[test]
    fn strings_are_trimmed_before_parsing() {
        assert_eq!(convert(" 42 ", ValueType::Int), Ok(Value::Int(42)));
        assert_eq!(convert("\t-7\n", ValueType::Long), Ok(Value::Long(-7)));
        assert_eq!(convert(" 2.5 ", ValueType::Double), Ok(Value::Double(2.5)));
    }

    #[test]
    fn hex_literals_parse_as_integers() {
        assert_eq!(convert("0x1F", ValueType::Int), Ok(Value::Int(31)));
        assert_eq!(convert("#ff", ValueType::Short), Ok(Value::Short(255)));
        assert_eq!(convert("-0x10", ValueType::Long), Ok(Value::Long(-16)));
    }

    #[test]
    fn repeated_or_misplaced_signs_are_rejected() {
        for text in ["--5", "+-5", "-+5", "0x-5", "#+f", "-", "0x"] {
            let err = convert(text, ValueType::Int).unwrap_err();
            assert_eq!(err.reason, "not an integer literal", "{}", text);
        }
    }

    #[test]
    fn oversized_literals_fail_without_panicking() {
        for text in [
            "--170141183460469231731687303715884105728",
            "-170141183460469231731687303715884105728",
            "170141183460469231731687303715884105728",
            "9223372036854775808",
        ] {
            assert!(convert(text, ValueType::Long).is_err(), "{}", text);
        }
        assert_eq!(
            convert("-9223372036854775808", ValueType::Long),
            Ok(Value::Long(i64::MIN))
        );
    }

    #[test]
    fn narrowing_checks_range() {
        assert_eq!(convert(127i64, ValueType::Byte), Ok(Value::Byte(127)));
        let err = convert(128i64, ValueType::Byte).unwrap_err();
        assert_eq!(err.from, ValueType::Long);
        assert_eq!(err.target, ValueType::Byte);
        assert!(convert(f64::MAX, ValueType::Float).is_err());
    }

    #[test]
    fn floats_truncate_toward_zero() {
        assert_eq!(convert(-3.9f64, ValueType::Int), Ok(Value::Int(-3)));
        assert!(convert(f64::NAN, ValueType::Long).is_err());
    }

    #[test]
    fn decimals_convert_both_ways() {
        let decimal = BigDecimal::from_str("12.75").unwrap();
        assert_eq!(convert("12.75", ValueType::BigDecimal), Ok(Value::BigDecimal(decimal.clone())));
        assert_eq!(convert(decimal.clone(), ValueType::Int), Ok(Value::Int(12)));
        assert_eq!(convert(decimal, ValueType::String), Ok(Value::from("12.75")));
    }

    #[test]
    fn boolean_literals() {
        for text in ["true", " YES ", "on", "1"] {
            assert_eq!(convert(text, ValueType::Bool), Ok(Value::Bool(true)), "{}", text);
        }
        for text in ["false", "No", "off", "0"] {
            assert_eq!(convert(text, ValueType::Bool), Ok(Value::Bool(false)), "{}", text);
        }
        assert!(convert("maybe", ValueType::Bool).is_err());
        assert!(convert(1, ValueType::Bool).is_err());
    }

    #[test]
    fn dates_use_configured_pattern() {
        let service = DefaultConversionService::new(ConversionConfig {
            date_pattern: "%d/%m/%Y".to_string(),
        });
        let expected = Utc.with_ymd_and_hms(2013, 6, 14, 0, 0, 0).unwrap();
        assert_eq!(
            service.convert(&Value::from("14/06/2013"), ValueType::Date),
            Ok(Value::Date(expected))
        );
        assert_eq!(
            service.convert(&Value::Date(expected), ValueType::String),
            Ok(Value::from("14/06/2013"))
        );
    }

    #[test]
    fn dates_fall_back_to_rfc3339_and_epoch_millis() {
        let expected = Utc.with_ymd_and_hms(2013, 6, 14, 12, 30, 0).unwrap();
        assert_eq!(
            convert("2013-06-14T12:30:00Z", ValueType::Date),
            Ok(Value::Date(expected))
        );
        assert_eq!(
            convert(expected.timestamp_millis(), ValueType::Date),
            Ok(Value::Date(expected))
        );
    }

    #[test]
    fn invalid_date_pattern_is_an_error_not_a_panic() {
        let service = DefaultConversionService::new(ConversionConfig {
            date_pattern: "%Q".to_string(),
        });
        let date = Utc.with_ymd_and_hms(2013, 6, 14, 0, 0, 0).unwrap();
        assert!(service.convert(&Value::Date(date), ValueType::String).is_err());
    }

    #[test]
    fn parse_date_accepts_times_and_dates() {
        assert_eq!(
            parse_date("2013-06-14 08:15", "%Y-%m-%d %H:%M"),
            Ok(Utc.with_ymd_and_hms(2013, 6, 14, 8, 15, 0).unwrap())
        );
        assert_eq!(
            parse_date("2013-06-14", "%Y-%m-%d"),
            Ok(Utc.with_ymd_and_hms(2013, 6, 14, 0, 0, 0).unwrap())
        );
        assert!(parse_date("14.06.2013", "%Y-%m-%d").is_err());
    }

    #[test]
    fn characters_need_exactly_one() {
        assert_eq!(convert("x", ValueType::Char), Ok(Value::Char('x')));
        assert!(convert("xy", ValueType::Char).is_err());
        assert!(convert("", ValueType::Char).is_err());
    }

    #[test]
    fn strings_and_bytes() {
        assert_eq!(convert("hé", ValueType::Bytes), Ok(Value::Bytes("hé".as_bytes().to_vec())));
        assert_eq!(convert(b"ok".to_vec(), ValueType::String), Ok(Value::from("ok")));
        assert!(convert(vec![0xff, 0xfe], ValueType::String).is_err());
    }

    #[test]
    fn identity_conversion_returns_the_value() {
        assert_eq!(convert('c', ValueType::Char), Ok(Value::Char('c')));
        assert_eq!(convert(true, ValueType::String), Ok(Value::from("true")));
    }
}
