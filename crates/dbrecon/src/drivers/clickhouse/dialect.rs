//! ClickHouse SQL dialect (Strategy pattern).
//!
//! ClickHouse type names are structured (`Nullable(LowCardinality(String))`,
//! `DateTime64(3, 'Europe/Athens')`), so hints are derived after peeling the
//! wrapper types. A `DateTime` with an explicit zone is timezone-aware and
//! its naive wall-clock values are localized in that zone.

use chrono_tz::Tz;
use tracing::warn;

use crate::core::identifier::{quote_backtick, quote_literal};
use crate::core::schema::TableRef;
use crate::core::traits::{Dialect, QueryParams, RECENT_FLAG_COLUMN};
use crate::core::value::RawValue;
use crate::dialect::canonical::{generic_type_hint, TypeHint};

/// ClickHouse dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct ClickHouseDialect;

impl ClickHouseDialect {
    /// Create a new ClickHouse dialect instance.
    pub fn new() -> Self {
        Self
    }
}

/// Strip `Nullable(...)` and `LowCardinality(...)` wrappers.
fn unwrap_type(declared: &str) -> &str {
    let mut t = declared.trim();
    loop {
        let inner = ["Nullable(", "LowCardinality("]
            .iter()
            .find_map(|w| t.strip_prefix(w))
            .and_then(|rest| rest.strip_suffix(')'));
        match inner {
            Some(inner) => t = inner.trim(),
            None => return t,
        }
    }
}

/// Zone name from `DateTime('Zone')` / `DateTime64(3, 'Zone')`.
fn quoted_zone(declared: &str) -> Option<&str> {
    let start = declared.find('\'')?;
    let rest = &declared[start + 1..];
    let end = rest.find('\'')?;
    Some(&rest[..end])
}

fn datetime_hint(declared: &str) -> TypeHint {
    match quoted_zone(declared) {
        None => TypeHint::Timestamp,
        Some(zone) => match zone.parse::<Tz>() {
            Ok(tz) => TypeHint::TimestampTz(Some(tz)),
            Err(_) => {
                warn!("Unknown timezone '{}' in ClickHouse type {}", zone, declared);
                TypeHint::TimestampTz(None)
            }
        },
    }
}

fn param_type(value: Option<&RawValue>) -> &'static str {
    match value {
        Some(RawValue::Date(_)) => "Date",
        Some(RawValue::DateTime(_)) | Some(RawValue::DateTimeOffset(_)) => "DateTime64(6)",
        Some(RawValue::Int(_)) => "Int64",
        Some(RawValue::Float(_)) => "Float64",
        Some(RawValue::Bool(_)) => "Bool",
        Some(RawValue::Uuid(_)) => "UUID",
        _ => "String",
    }
}

impl Dialect for ClickHouseDialect {
    fn name(&self) -> &str {
        "clickhouse"
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_backtick(name)
    }

    fn param_placeholder(&self, name: &str, params: &QueryParams) -> String {
        // Server-side query parameters: {name:Type}
        format!("{{{}:{}}}", name, param_type(params.get(name)))
    }

    fn type_hint(&self, declared_type: &str) -> TypeHint {
        let t = unwrap_type(declared_type);
        let base = t.split('(').next().unwrap_or(t).trim();

        match base {
            "Bool" | "Boolean" => TypeHint::Boolean,
            "UInt8" | "UInt16" | "UInt32" | "UInt64" | "UInt128" | "UInt256" | "Int8"
            | "Int16" | "Int32" | "Int64" | "Int128" | "Int256" => TypeHint::Integer,
            "Float32" | "Float64" => TypeHint::Float,
            "Decimal" | "Decimal32" | "Decimal64" | "Decimal128" | "Decimal256" => {
                TypeHint::Decimal
            }
            "String" | "Enum8" | "Enum16" | "IPv4" | "IPv6" => TypeHint::Text,
            "FixedString" => TypeHint::FixedChar,
            "Date" | "Date32" => TypeHint::Date,
            "DateTime" | "DateTime64" => datetime_hint(t),
            "UUID" => TypeHint::Uuid,
            _ => generic_type_hint(t),
        }
    }

    fn recency_flag_fragment(&self, update_column: &str, hours: u32) -> String {
        format!(
            "if({} >= now() - INTERVAL {} HOUR, 'y', 'n') AS {}",
            self.quote_ident(update_column),
            hours,
            RECENT_FLAG_COLUMN
        )
    }

    fn primary_key_query(&self, table: &TableRef) -> String {
        format!(
            "SELECT name FROM system.columns WHERE database = {} AND table = {} \
             AND is_in_primary_key = 1 ORDER BY position",
            quote_literal(&table.schema),
            quote_literal(&table.name)
        )
    }

    fn day_expr(&self, column: &str) -> String {
        format!("toDate({})", self.quote_ident(column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::{END_DATE_PARAM, START_DATE_PARAM};
    use chrono::NaiveDate;

    #[test]
    fn test_unwrap_type() {
        assert_eq!(unwrap_type("Nullable(LowCardinality(String))"), "String");
        assert_eq!(unwrap_type("DateTime64(3)"), "DateTime64(3)");
    }

    #[test]
    fn test_datetime_zone_hints() {
        let dialect = ClickHouseDialect::new();
        assert_eq!(
            dialect.type_hint("DateTime('Europe/Athens')"),
            TypeHint::TimestampTz(Some(chrono_tz::Europe::Athens))
        );
        assert_eq!(
            dialect.type_hint("Nullable(DateTime64(3, 'UTC'))"),
            TypeHint::TimestampTz(Some(Tz::UTC))
        );
        assert_eq!(dialect.type_hint("DateTime64(6)"), TypeHint::Timestamp);
        assert_eq!(
            dialect.type_hint("DateTime('Mars/Olympus')"),
            TypeHint::TimestampTz(None)
        );
    }

    #[test]
    fn test_scalar_hints() {
        let dialect = ClickHouseDialect::new();
        assert_eq!(dialect.type_hint("UInt8"), TypeHint::Integer);
        assert_eq!(dialect.type_hint("Bool"), TypeHint::Boolean);
        assert_eq!(dialect.type_hint("Decimal(18, 4)"), TypeHint::Decimal);
        assert_eq!(dialect.type_hint("FixedString(8)"), TypeHint::FixedChar);
        assert_eq!(dialect.type_hint("LowCardinality(String)"), TypeHint::Text);
        assert_eq!(dialect.type_hint("Date32"), TypeHint::Date);
    }

    #[test]
    fn test_typed_placeholders() {
        let dialect = ClickHouseDialect::new();
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let params = QueryParams::new()
            .with(START_DATE_PARAM, day)
            .with(END_DATE_PARAM, day.succ_opt().unwrap());
        assert_eq!(
            dialect.date_filter_fragment("created_at", &params),
            "`created_at` >= {start_date:Date} AND `created_at` < {end_date:Date}"
        );
    }

    #[test]
    fn test_count_query_groups_by_day() {
        use crate::core::traits::CountQueryOptions;
        let dialect = ClickHouseDialect::new();
        let opts = CountQueryOptions {
            table: TableRef::new("events", "analytics"),
            date_column: "ts".into(),
        };
        let sql = dialect.build_count_query(&opts, &QueryParams::new());
        assert!(sql.starts_with(
            "SELECT toDate(`ts`) AS dt, COUNT(*) AS cnt FROM `analytics`.`events`"
        ));
    }
}
