//! Core traits for database-agnostic row reconciliation.
//!
//! - [`Dialect`]: per-engine SQL fragments and normalization hints
//! - [`QueryExecutor`]: runs a query and hands back a [`RowSet`]
//!
//! The reconciliation core never talks to a database. The orchestrator asks
//! each side's dialect for SQL text, runs it through the injected executor
//! and feeds the resulting row sets to the normalizer.

use async_trait::async_trait;

use crate::dialect::canonical::{generic_type_hint, normalize_with_hint, NormalizeResult, TypeHint};
use crate::error::Result;

use super::schema::{RowSet, TableRef};
use super::value::RawValue;

/// Name of the projected flag column marking recently updated rows.
pub const RECENT_FLAG_COLUMN: &str = "xrecently_changed";

/// Bind parameter names used by the date-range filter.
pub const START_DATE_PARAM: &str = "start_date";
pub const END_DATE_PARAM: &str = "end_date";

/// Named bind parameters, kept in insertion order.
///
/// Dialects with positional placeholders number them in this order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    values: Vec<(String, RawValue)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a parameter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<RawValue>) {
        let name = name.into();
        let value = value.into();
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Zero-based position of a parameter.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.values.iter().position(|(n, _)| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Options for building a row-sampling query.
#[derive(Debug, Clone)]
pub struct SampleQueryOptions {
    /// Table to read.
    pub table: TableRef,
    /// Columns to select; empty selects every column.
    pub columns: Vec<String>,
    /// Column restricted to the bound date range, if any.
    pub date_column: Option<String>,
    /// Column holding the last update time, for the recency flag.
    pub update_column: Option<String>,
    /// Rows updated within this many hours are flagged.
    pub exclude_recent_hours: Option<u32>,
}

impl SampleQueryOptions {
    pub fn new(table: TableRef) -> Self {
        Self {
            table,
            columns: Vec::new(),
            date_column: None,
            update_column: None,
            exclude_recent_hours: None,
        }
    }

    /// Recency flag settings, present only when both parts are configured.
    pub fn recency(&self) -> Option<(&str, u32)> {
        match (&self.update_column, self.exclude_recent_hours) {
            (Some(col), Some(hours)) => Some((col.as_str(), hours)),
            _ => None,
        }
    }
}

/// Options for building a per-day row count query.
#[derive(Debug, Clone)]
pub struct CountQueryOptions {
    pub table: TableRef,
    /// Column bucketed by day and filtered by the bound date range.
    pub date_column: String,
}

/// SQL syntax and value interpretation for one database engine.
///
/// The normalization methods have shared defaults; dialects override them
/// only where their type system differs.
pub trait Dialect: Send + Sync {
    /// Get the dialect identifier (e.g., "oracle", "postgres").
    fn name(&self) -> &str;

    /// Quote an identifier (table name, column name, etc.).
    fn quote_ident(&self, name: &str) -> String;

    /// Placeholder text for a named bind parameter.
    fn param_placeholder(&self, name: &str, params: &QueryParams) -> String;

    /// Normalization hint for a declared column type.
    fn type_hint(&self, declared_type: &str) -> TypeHint {
        generic_type_hint(declared_type)
    }

    /// Convert a raw cell into its canonical form.
    fn normalize(&self, value: &RawValue, hint: &TypeHint) -> NormalizeResult {
        normalize_with_hint(value, hint)
    }

    /// `WHERE` fragment restricting `date_column` to
    /// `[start_date, end_date)` using the [`START_DATE_PARAM`] and
    /// [`END_DATE_PARAM`] binds.
    fn date_filter_fragment(&self, date_column: &str, params: &QueryParams) -> String {
        let col = self.quote_ident(date_column);
        format!(
            "{col} >= {} AND {col} < {}",
            self.param_placeholder(START_DATE_PARAM, params),
            self.param_placeholder(END_DATE_PARAM, params),
        )
    }

    /// Projection computing the [`RECENT_FLAG_COLUMN`] (`'y'` or `'n'`).
    fn recency_flag_fragment(&self, update_column: &str, hours: u32) -> String;

    /// Metadata query returning the primary key column names of `table`,
    /// one per row, in key order.
    fn primary_key_query(&self, table: &TableRef) -> String;

    /// Qualified, quoted table name.
    fn qualify(&self, table: &TableRef) -> String {
        format!(
            "{}.{}",
            self.quote_ident(&table.schema),
            self.quote_ident(&table.name)
        )
    }

    /// Build the row-sampling query.
    fn build_sample_query(&self, opts: &SampleQueryOptions, params: &QueryParams) -> String {
        let cols = if opts.columns.is_empty() {
            "t.*".to_string()
        } else {
            opts.columns
                .iter()
                .map(|c| format!("t.{}", self.quote_ident(c)))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut sql = format!("SELECT {}", cols);
        if let Some((update_column, hours)) = opts.recency() {
            sql.push_str(", ");
            sql.push_str(&self.recency_flag_fragment(update_column, hours));
        }
        sql.push_str(&format!(" FROM {} t", self.qualify(&opts.table)));

        if let Some(ref date_column) = opts.date_column {
            sql.push_str(" WHERE ");
            sql.push_str(&self.date_filter_fragment(date_column, params));
        }

        sql
    }

    /// Expression truncating `column` to its calendar day.
    fn day_expr(&self, column: &str) -> String;

    /// Build the per-day count query (`dt`, `cnt` columns).
    fn build_count_query(&self, opts: &CountQueryOptions, params: &QueryParams) -> String {
        let day = self.day_expr(&opts.date_column);
        format!(
            "SELECT {day} AS dt, COUNT(*) AS cnt FROM {} WHERE {} GROUP BY {day} ORDER BY dt",
            self.qualify(&opts.table),
            self.date_filter_fragment(&opts.date_column, params),
        )
    }
}

/// Runs dialect-specific SQL and returns the fetched rows.
///
/// Implementations wrap a connection pool (or, in tests, canned data).
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn fetch(&self, sql: &str, params: &QueryParams) -> Result<RowSet>;
}
