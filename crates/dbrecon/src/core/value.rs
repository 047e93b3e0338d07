//! Raw cell values as handed over by a query executor.
//!
//! A [`RawValue`] is whatever the driver produced for a cell, before any
//! dialect-specific interpretation. The normalizer turns it into a
//! [`CanonicalValue`](crate::dialect::CanonicalValue).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Driver-level value for a single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// SQL NULL (or a driver's missing-value marker).
    Null,

    /// Native boolean.
    Bool(bool),

    /// Any integer type, widened to 64 bits.
    Int(i64),

    /// Binary floating point.
    Float(f64),

    /// Exact decimal (NUMBER, NUMERIC, Decimal(p,s)).
    Decimal(Decimal),

    /// Character data.
    Text(String),

    /// Binary data.
    Bytes(Vec<u8>),

    /// UUID/GUID value.
    Uuid(Uuid),

    /// Timestamp without timezone.
    DateTime(NaiveDateTime),

    /// Timestamp with timezone offset.
    DateTimeOffset(DateTime<FixedOffset>),

    /// Date without time component.
    Date(NaiveDate),

    /// Time without date component.
    Time(NaiveTime),
}

impl RawValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    /// Short name of the variant, used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            RawValue::Null => "null",
            RawValue::Bool(_) => "bool",
            RawValue::Int(_) => "int",
            RawValue::Float(_) => "float",
            RawValue::Decimal(_) => "decimal",
            RawValue::Text(_) => "text",
            RawValue::Bytes(_) => "bytes",
            RawValue::Uuid(_) => "uuid",
            RawValue::DateTime(_) => "datetime",
            RawValue::DateTimeOffset(_) => "datetimeoffset",
            RawValue::Date(_) => "date",
            RawValue::Time(_) => "time",
        }
    }

    /// Approximate heap + inline footprint in bytes.
    ///
    /// Used by the memory guard; exactness is not required.
    #[must_use]
    pub fn estimated_size(&self) -> usize {
        let inline = std::mem::size_of::<RawValue>();
        match self {
            RawValue::Text(s) => inline + s.capacity(),
            RawValue::Bytes(b) => inline + b.capacity(),
            _ => inline,
        }
    }

    /// Borrow the text of a `Text` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render the value for error messages and mismatch evidence.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Null => write!(f, "NULL"),
            RawValue::Bool(v) => write!(f, "{}", v),
            RawValue::Int(v) => write!(f, "{}", v),
            RawValue::Float(v) => write!(f, "{}", v),
            RawValue::Decimal(v) => write!(f, "{}", v),
            RawValue::Text(v) => write!(f, "{:?}", v),
            RawValue::Bytes(v) => write!(f, "0x{}", hex::encode(v)),
            RawValue::Uuid(v) => write!(f, "{}", v),
            RawValue::DateTime(v) => write!(f, "{}", v),
            RawValue::DateTimeOffset(v) => write!(f, "{}", v.to_rfc3339()),
            RawValue::Date(v) => write!(f, "{}", v),
            RawValue::Time(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for RawValue {
    fn from(v: bool) -> Self {
        RawValue::Bool(v)
    }
}

impl From<i32> for RawValue {
    fn from(v: i32) -> Self {
        RawValue::Int(i64::from(v))
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        RawValue::Int(v)
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Float(v)
    }
}

impl From<Decimal> for RawValue {
    fn from(v: Decimal) -> Self {
        RawValue::Decimal(v)
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        RawValue::Text(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Text(v.to_string())
    }
}

impl From<Vec<u8>> for RawValue {
    fn from(v: Vec<u8>) -> Self {
        RawValue::Bytes(v)
    }
}

impl From<Uuid> for RawValue {
    fn from(v: Uuid) -> Self {
        RawValue::Uuid(v)
    }
}

impl From<NaiveDateTime> for RawValue {
    fn from(v: NaiveDateTime) -> Self {
        RawValue::DateTime(v)
    }
}

impl From<DateTime<FixedOffset>> for RawValue {
    fn from(v: DateTime<FixedOffset>) -> Self {
        RawValue::DateTimeOffset(v)
    }
}

impl From<NaiveDate> for RawValue {
    fn from(v: NaiveDate) -> Self {
        RawValue::Date(v)
    }
}

impl From<NaiveTime> for RawValue {
    fn from(v: NaiveTime) -> Self {
        RawValue::Time(v)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(RawValue::Null, Into::into)
    }
}

impl From<&serde_json::Value> for RawValue {
    /// Map a JSON cell from a row dump; objects and arrays are kept as JSON text.
    fn from(v: &serde_json::Value) -> Self {
        use serde_json::Value;
        match v {
            Value::Null => RawValue::Null,
            Value::Bool(b) => RawValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => RawValue::Int(i),
                None => json_number(n),
            },
            Value::String(s) => RawValue::Text(s.clone()),
            other => RawValue::Text(other.to_string()),
        }
    }
}

/// Exact decimal from the number's source text; f64 only past Decimal's range.
fn json_number(n: &serde_json::Number) -> RawValue {
    let text = n.to_string();
    let exact = Decimal::from_str(&text).or_else(|_| Decimal::from_scientific(&text));
    match (exact, n.as_f64()) {
        (Ok(d), _) => RawValue::Decimal(d),
        (Err(_), Some(f)) if f.is_finite() => RawValue::Float(f),
        _ => RawValue::Text(text),
    }
}
