//! Canonical (dialect-independent) values and per-column normalization hints.
//!
//! Every dialect reduces its raw cells to a [`CanonicalValue`]. Two values
//! from different engines describe the same datum exactly when their
//! canonical forms are equal, so the reconciliation engine only ever uses
//! `==` and `Hash`.
//!
//! ```text
//!   Oracle DATE 2024-01-01         ─┐
//!   PostgreSQL date 2024-01-01     ─┼─►  Naive(2024-01-01 00:00:00)
//!   ClickHouse Date 2024-01-01     ─┘
//! ```

use std::fmt;

use chrono::{DateTime, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

use crate::core::value::RawValue;
use crate::normalize::numeric::{decimal_from_f64, parse_decimal};
use crate::normalize::temporal::{parse_temporal, parse_time, ParsedTemporal};

/// Rendering of the null sentinel in reports.
pub const NULL_MARKER: &str = "N/A";

/// A normalized scalar.
///
/// `Null` equals only itself; in particular it never equals `Text("N/A")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalValue {
    Null,
    Bool(bool),
    /// Exact decimal with trailing zeros stripped.
    Number(Decimal),
    Text(String),
    /// Absolute point in time.
    Instant(DateTime<Utc>),
    /// Wall-clock date-time without zone.
    Naive(NaiveDateTime),
    Time(NaiveTime),
}

impl CanonicalValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CanonicalValue::Null)
    }

    /// Build a number, normalizing its representation.
    pub fn number(d: Decimal) -> Self {
        CanonicalValue::Number(d.normalize())
    }

    /// Interpret the value as a boolean when it looks like one
    /// (`true/false`, 0/1, or a single-word flag).
    pub fn as_bool_like(&self) -> Option<bool> {
        match self {
            CanonicalValue::Bool(b) => Some(*b),
            CanonicalValue::Number(n) if n.is_zero() => Some(false),
            CanonicalValue::Number(n) if *n == Decimal::ONE => Some(true),
            CanonicalValue::Text(s) => parse_bool_flag(s),
            _ => None,
        }
    }
}

impl fmt::Display for CanonicalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanonicalValue::Null => f.write_str(NULL_MARKER),
            CanonicalValue::Bool(b) => write!(f, "{}", b),
            CanonicalValue::Number(n) => write!(f, "{}", n),
            CanonicalValue::Text(s) => f.write_str(s),
            CanonicalValue::Instant(t) => {
                f.write_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            CanonicalValue::Naive(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S%.f")),
            CanonicalValue::Time(t) => write!(f, "{}", t.format("%H:%M:%S%.f")),
        }
    }
}

impl Serialize for CanonicalValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            CanonicalValue::Null => serializer.serialize_none(),
            CanonicalValue::Bool(b) => serializer.serialize_bool(*b),
            other => serializer.collect_str(other),
        }
    }
}

/// Case-insensitive boolean flags accepted from text columns.
pub fn parse_bool_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "y" | "yes" | "1" => Some(true),
        "f" | "false" | "n" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// How a column's values should be interpreted, derived from its declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeHint {
    Boolean,
    Integer,
    Decimal,
    Float,
    Text,
    /// Blank-padded character type; trailing padding is not significant.
    FixedChar,
    /// Timestamp without timezone.
    Timestamp,
    /// Timestamp with timezone, optionally with a declared zone used to
    /// localize naive values.
    TimestampTz(Option<Tz>),
    Date,
    Time,
    Uuid,
    Binary,
    /// No declared type; interpretation follows the raw value's variant.
    Unknown,
}

impl TypeHint {
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            TypeHint::Timestamp | TypeHint::TimestampTz(_) | TypeHint::Date
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, TypeHint::Integer | TypeHint::Decimal | TypeHint::Float)
    }
}

impl fmt::Display for TypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeHint::Boolean => f.write_str("boolean"),
            TypeHint::Integer => f.write_str("integer"),
            TypeHint::Decimal => f.write_str("decimal"),
            TypeHint::Float => f.write_str("float"),
            TypeHint::Text => f.write_str("text"),
            TypeHint::FixedChar => f.write_str("char"),
            TypeHint::Timestamp => f.write_str("timestamp"),
            TypeHint::TimestampTz(None) => f.write_str("timestamptz"),
            TypeHint::TimestampTz(Some(tz)) => write!(f, "timestamptz({})", tz.name()),
            TypeHint::Date => f.write_str("date"),
            TypeHint::Time => f.write_str("time"),
            TypeHint::Uuid => f.write_str("uuid"),
            TypeHint::Binary => f.write_str("binary"),
            TypeHint::Unknown => f.write_str("unknown"),
        }
    }
}

/// Map an ANSI / commonly shared declared type to a hint.
///
/// Dialects handle their own vocabulary first and fall back to this.
pub fn generic_type_hint(declared: &str) -> TypeHint {
    let base = strip_modifiers(declared);
    let base = base.as_str();

    if base.ends_with("with time zone") || base.ends_with("with local time zone") {
        return if base.starts_with("time ") {
            TypeHint::Time
        } else {
            TypeHint::TimestampTz(None)
        };
    }

    match base {
        "bool" | "boolean" => TypeHint::Boolean,
        "smallint" | "int" | "integer" | "bigint" | "int2" | "int4" | "int8" | "tinyint"
        | "serial" | "bigserial" => TypeHint::Integer,
        "numeric" | "decimal" | "number" | "money" => TypeHint::Decimal,
        "real" | "float" | "float4" | "float8" | "double" | "double precision" => {
            TypeHint::Float
        }
        "char" | "character" | "nchar" | "bpchar" => TypeHint::FixedChar,
        "varchar" | "character varying" | "nvarchar" | "text" | "string" | "clob" | "nclob" => {
            TypeHint::Text
        }
        "timestamp" | "timestamp without time zone" | "datetime" => TypeHint::Timestamp,
        "timestamptz" => TypeHint::TimestampTz(None),
        "date" => TypeHint::Date,
        "time" | "time without time zone" => TypeHint::Time,
        "uuid" => TypeHint::Uuid,
        "bytea" | "blob" | "binary" | "varbinary" | "raw" => TypeHint::Binary,
        _ if base.starts_with("timestamp") => TypeHint::Timestamp,
        _ => TypeHint::Unknown,
    }
}

/// Lower-case a declared type and drop `(...)` modifiers:
/// `TIMESTAMP(6) WITH TIME ZONE` becomes `timestamp with time zone`.
pub fn strip_modifiers(declared: &str) -> String {
    let mut out = String::with_capacity(declared.len());
    let mut depth = 0usize;
    for c in declared.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c.to_ascii_lowercase()),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Outcome of normalizing a single cell; the error is a human-readable reason.
pub type NormalizeResult = std::result::Result<CanonicalValue, String>;

/// Shared normalization rules used by every dialect unless overridden.
pub fn normalize_with_hint(value: &RawValue, hint: &TypeHint) -> NormalizeResult {
    if value.is_null() {
        return Ok(CanonicalValue::Null);
    }

    match hint {
        TypeHint::Boolean => normalize_boolean(value),
        TypeHint::Integer | TypeHint::Decimal | TypeHint::Float => normalize_numeric(value),
        TypeHint::FixedChar => match value {
            RawValue::Text(s) => Ok(CanonicalValue::Text(trim_padding(s).to_string())),
            other => infer(other),
        },
        TypeHint::Timestamp | TypeHint::Date => normalize_naive_temporal(value),
        TypeHint::TimestampTz(zone) => normalize_aware_temporal(value, *zone),
        TypeHint::Time => match value {
            RawValue::Time(t) => Ok(CanonicalValue::Time(*t)),
            RawValue::Text(s) => parse_time(s).map(CanonicalValue::Time),
            other => infer(other),
        },
        TypeHint::Uuid => match value {
            RawValue::Text(s) => uuid::Uuid::parse_str(s.trim())
                .map(|u| CanonicalValue::Text(u.hyphenated().to_string()))
                .map_err(|e| format!("invalid uuid {:?}: {}", s, e)),
            other => infer(other),
        },
        TypeHint::Text | TypeHint::Binary | TypeHint::Unknown => infer(value),
    }
}

/// Interpretation driven only by the raw variant.
pub fn infer(value: &RawValue) -> NormalizeResult {
    Ok(match value {
        RawValue::Null => CanonicalValue::Null,
        RawValue::Bool(b) => CanonicalValue::Bool(*b),
        RawValue::Int(i) => CanonicalValue::number(Decimal::from(*i)),
        RawValue::Float(f) => float_value(*f),
        RawValue::Decimal(d) => CanonicalValue::number(*d),
        RawValue::Text(s) => CanonicalValue::Text(s.clone()),
        RawValue::Bytes(b) => CanonicalValue::Text(hex::encode(b)),
        RawValue::Uuid(u) => CanonicalValue::Text(u.hyphenated().to_string()),
        RawValue::DateTime(dt) => CanonicalValue::Naive(*dt),
        RawValue::DateTimeOffset(dt) => CanonicalValue::Instant(dt.with_timezone(&Utc)),
        RawValue::Date(d) => CanonicalValue::Naive(d.and_time(NaiveTime::MIN)),
        RawValue::Time(t) => CanonicalValue::Time(*t),
    })
}

fn float_value(f: f64) -> CanonicalValue {
    match decimal_from_f64(f) {
        Some(d) => CanonicalValue::number(d),
        None => CanonicalValue::Text(f.to_string()),
    }
}

fn normalize_boolean(value: &RawValue) -> NormalizeResult {
    let parsed = match value {
        RawValue::Bool(b) => Some(*b),
        RawValue::Int(0) => Some(false),
        RawValue::Int(1) => Some(true),
        RawValue::Decimal(d) if d.is_zero() => Some(false),
        RawValue::Decimal(d) if d.normalize() == Decimal::ONE => Some(true),
        RawValue::Float(f) if *f == 0.0 => Some(false),
        RawValue::Float(f) if *f == 1.0 => Some(true),
        RawValue::Text(s) => parse_bool_flag(s),
        _ => None,
    };
    parsed
        .map(CanonicalValue::Bool)
        .ok_or_else(|| format!("{} value is not boolean-like", value.kind()))
}

fn normalize_numeric(value: &RawValue) -> NormalizeResult {
    match value {
        RawValue::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(CanonicalValue::Text(s.clone()));
            }
            parse_decimal(trimmed).map(CanonicalValue::number)
        }
        other => infer(other),
    }
}

fn normalize_naive_temporal(value: &RawValue) -> NormalizeResult {
    match value {
        RawValue::Text(s) => Ok(match parse_temporal(s)? {
            ParsedTemporal::Aware(t) => CanonicalValue::Instant(t),
            ParsedTemporal::Naive(t) => CanonicalValue::Naive(t),
        }),
        RawValue::DateTime(_) | RawValue::DateTimeOffset(_) | RawValue::Date(_) => infer(value),
        other => Err(format!("{} value in a timestamp column", other.kind())),
    }
}

fn normalize_aware_temporal(value: &RawValue, zone: Option<Tz>) -> NormalizeResult {
    let naive = match value {
        RawValue::DateTimeOffset(_) => return infer(value),
        RawValue::DateTime(dt) => *dt,
        RawValue::Date(d) => d.and_time(NaiveTime::MIN),
        RawValue::Text(s) => match parse_temporal(s)? {
            ParsedTemporal::Aware(t) => return Ok(CanonicalValue::Instant(t)),
            ParsedTemporal::Naive(t) => t,
        },
        other => return Err(format!("{} value in a timezone-aware column", other.kind())),
    };

    let tz = zone.ok_or_else(|| {
        "naive value in a timezone-aware column with no declared zone".to_string()
    })?;
    localize(naive, tz).map(CanonicalValue::Instant)
}

/// Interpret a wall-clock value in `tz`; ambiguous times resolve to the
/// earlier instant, times inside a DST gap are rejected.
pub fn localize(naive: NaiveDateTime, tz: Tz) -> std::result::Result<DateTime<Utc>, String> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| format!("{} does not exist in {}", naive, tz.name()))
}

/// Strip trailing blank and NUL padding of fixed-width character types.
pub fn trim_padding(s: &str) -> &str {
    s.trim_end_matches([' ', '\0'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn naive(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_null_differs_from_marker_text() {
        assert_ne!(CanonicalValue::Null, CanonicalValue::Text(NULL_MARKER.into()));
        assert_eq!(CanonicalValue::Null.to_string(), "N/A");
    }

    #[test]
    fn test_decimal_trailing_zeros_equal() {
        let a = normalize_with_hint(&RawValue::Text("10.500".into()), &TypeHint::Decimal).unwrap();
        let b = normalize_with_hint(
            &RawValue::Decimal(Decimal::from_str("10.5").unwrap()),
            &TypeHint::Decimal,
        )
        .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "10.5");
    }

    #[test]
    fn test_int_and_float_equal_when_integral() {
        let a = infer(&RawValue::Int(3)).unwrap();
        let b = infer(&RawValue::Float(3.0)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_boolean_flags() {
        for (raw, expected) in [
            (RawValue::Int(1), true),
            (RawValue::Text("Y".into()), true),
            (RawValue::Text("f".into()), false),
            (RawValue::Bool(false), false),
        ] {
            assert_eq!(
                normalize_with_hint(&raw, &TypeHint::Boolean).unwrap(),
                CanonicalValue::Bool(expected)
            );
        }
        assert!(normalize_with_hint(&RawValue::Int(2), &TypeHint::Boolean).is_err());
    }

    #[test]
    fn test_date_equals_midnight_timestamp() {
        let d = normalize_with_hint(
            &RawValue::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            &TypeHint::Date,
        )
        .unwrap();
        let ts = normalize_with_hint(
            &RawValue::DateTime(naive(2024, 1, 1, 0)),
            &TypeHint::Timestamp,
        )
        .unwrap();
        assert_eq!(d, ts);
    }

    #[test]
    fn test_aware_offsets_compare_as_instants() {
        let a = normalize_with_hint(
            &RawValue::Text("2024-03-01 12:00:00+02:00".into()),
            &TypeHint::TimestampTz(None),
        )
        .unwrap();
        let b = normalize_with_hint(
            &RawValue::Text("2024-03-01T10:00:00Z".into()),
            &TypeHint::TimestampTz(None),
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_naive_in_aware_column_requires_zone() {
        let raw = RawValue::DateTime(naive(2024, 7, 1, 12));
        assert!(normalize_with_hint(&raw, &TypeHint::TimestampTz(None)).is_err());

        let athens =
            normalize_with_hint(&raw, &TypeHint::TimestampTz(Some(chrono_tz::Europe::Athens)))
                .unwrap();
        let utc = Utc.from_utc_datetime(&naive(2024, 7, 1, 9));
        assert_eq!(athens, CanonicalValue::Instant(utc));
    }

    #[test]
    fn test_fixed_char_padding_trimmed() {
        let v =
            normalize_with_hint(&RawValue::Text("ab  \0".into()), &TypeHint::FixedChar).unwrap();
        assert_eq!(v, CanonicalValue::Text("ab".into()));
    }

    #[test]
    fn test_uuid_lowercased() {
        let v = normalize_with_hint(
            &RawValue::Text("6F9619FF-8B86-D011-B42D-00C04FC964FF".into()),
            &TypeHint::Uuid,
        )
        .unwrap();
        assert_eq!(v.to_string(), "6f9619ff-8b86-d011-b42d-00c04fc964ff");
    }

    #[test]
    fn test_unparseable_timestamp_is_error() {
        let err = normalize_with_hint(&RawValue::Text("yesterday".into()), &TypeHint::Timestamp)
            .unwrap_err();
        assert!(err.contains("yesterday"));
    }

    #[test]
    fn test_generic_type_hints() {
        assert_eq!(generic_type_hint("NUMERIC(10,2)"), TypeHint::Decimal);
        assert_eq!(
            generic_type_hint("timestamp with time zone"),
            TypeHint::TimestampTz(None)
        );
        assert_eq!(generic_type_hint("timestamp(6)"), TypeHint::Timestamp);
        assert_eq!(
            generic_type_hint("TIMESTAMP(6) WITH TIME ZONE"),
            TypeHint::TimestampTz(None)
        );
        assert_eq!(generic_type_hint("bpchar"), TypeHint::FixedChar);
        assert_eq!(generic_type_hint("jsonb"), TypeHint::Unknown);
    }

    #[test]
    fn test_bytes_render_as_hex() {
        assert_eq!(
            infer(&RawValue::Bytes(vec![0xCA, 0xFE])).unwrap(),
            CanonicalValue::Text("cafe".into())
        );
    }
}
