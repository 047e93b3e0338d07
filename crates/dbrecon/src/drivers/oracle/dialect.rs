//! Oracle SQL dialect (Strategy pattern).
//!
//! Oracle differs from the shared rules in three ways that matter for
//! reconciliation:
//!
//! - `DATE` carries a time of day, so it maps to a naive timestamp.
//! - The empty string cannot be stored; `''` reads back as NULL, so text
//!   `''` is folded to the null sentinel.
//! - Unquoted identifiers are upper-case in the data dictionary.

use crate::core::identifier::{quote_literal, quote_oracle};
use crate::core::schema::TableRef;
use crate::core::traits::{Dialect, QueryParams, RECENT_FLAG_COLUMN};
use crate::core::value::RawValue;
use crate::dialect::canonical::{
    generic_type_hint, normalize_with_hint, strip_modifiers, CanonicalValue, NormalizeResult,
    TypeHint,
};

/// Oracle dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct OracleDialect;

impl OracleDialect {
    /// Create a new Oracle dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for OracleDialect {
    fn name(&self) -> &str {
        "oracle"
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_oracle(name)
    }

    fn param_placeholder(&self, name: &str, _params: &QueryParams) -> String {
        format!(":{}", name)
    }

    fn type_hint(&self, declared_type: &str) -> TypeHint {
        match strip_modifiers(declared_type).as_str() {
            "date" => TypeHint::Timestamp,
            "varchar2" | "nvarchar2" | "long" | "rowid" | "urowid" => TypeHint::Text,
            "binary_float" | "binary_double" => TypeHint::Float,
            "long raw" | "bfile" => TypeHint::Binary,
            "pls_integer" | "binary_integer" => TypeHint::Integer,
            _ => generic_type_hint(declared_type),
        }
    }

    fn normalize(&self, value: &RawValue, hint: &TypeHint) -> NormalizeResult {
        match value {
            RawValue::Text(s) if s.is_empty() => Ok(CanonicalValue::Null),
            _ => normalize_with_hint(value, hint),
        }
    }

    fn recency_flag_fragment(&self, update_column: &str, hours: u32) -> String {
        format!(
            "CASE WHEN {} >= SYSTIMESTAMP - NUMTODSINTERVAL({}, 'HOUR') THEN 'y' ELSE 'n' END AS {}",
            self.quote_ident(update_column),
            hours,
            RECENT_FLAG_COLUMN
        )
    }

    fn primary_key_query(&self, table: &TableRef) -> String {
        format!(
            r#"SELECT cols.column_name
FROM all_constraints cons
JOIN all_cons_columns cols
  ON cons.constraint_name = cols.constraint_name AND cons.owner = cols.owner
WHERE cons.constraint_type = 'P'
  AND cons.owner = UPPER({})
  AND cols.table_name = UPPER({})
ORDER BY cols.position"#,
            quote_literal(&table.schema),
            quote_literal(&table.name)
        )
    }

    fn day_expr(&self, column: &str) -> String {
        format!("TRUNC({})", self.quote_ident(column))
    }
}
