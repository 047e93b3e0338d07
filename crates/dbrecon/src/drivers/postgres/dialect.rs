//! PostgreSQL SQL dialect (Strategy pattern).
//!
//! Provides PostgreSQL-specific identifier quoting, positional bind
//! placeholders, day truncation and type hints.

use crate::core::identifier::{quote_double, quote_literal};
use crate::core::schema::TableRef;
use crate::core::traits::{Dialect, QueryParams, RECENT_FLAG_COLUMN};
use crate::dialect::canonical::{generic_type_hint, strip_modifiers, TypeHint};

/// PostgreSQL dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Create a new PostgreSQL dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgres"
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_double(name)
    }

    fn param_placeholder(&self, name: &str, params: &QueryParams) -> String {
        // $1, $2, ... in bind order
        match params.position(name) {
            Some(idx) => format!("${}", idx + 1),
            None => format!("${}", params.len() + 1),
        }
    }

    fn type_hint(&self, declared_type: &str) -> TypeHint {
        match strip_modifiers(declared_type).as_str() {
            "oid" | "smallserial" | "serial4" | "serial8" => TypeHint::Integer,
            "citext" | "name" | "json" | "jsonb" | "xml" => TypeHint::Text,
            "timetz" => TypeHint::Time,
            _ => generic_type_hint(declared_type),
        }
    }

    fn recency_flag_fragment(&self, update_column: &str, hours: u32) -> String {
        format!(
            "CASE WHEN {} >= now() - interval '{} hours' THEN 'y' ELSE 'n' END AS {}",
            self.quote_ident(update_column),
            hours,
            RECENT_FLAG_COLUMN
        )
    }

    fn primary_key_query(&self, table: &TableRef) -> String {
        format!(
            r#"SELECT a.attname AS column_name
FROM pg_index i
JOIN pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = ANY(i.indkey)
WHERE i.indrelid = {}::regclass AND i.indisprimary
ORDER BY array_position(i.indkey, a.attnum)"#,
            quote_literal(&self.qualify(table))
        )
    }

    fn day_expr(&self, column: &str) -> String {
        format!("date_trunc('day', {})::date", self.quote_ident(column))
    }
}
