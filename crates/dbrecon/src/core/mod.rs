//! Core abstractions shared by the normalizer and the orchestrator.
//!
//! - [`schema`]: table references and fetched row sets
//! - [`value`]: raw cell values as produced by a query executor
//! - [`traits`]: the [`Dialect`] and [`QueryExecutor`] seams
//! - [`catalog`]: dialect registry for dependency injection
//! - [`identifier`]: identifier validation and quoting

pub mod catalog;
pub mod identifier;
pub mod schema;
pub mod traits;
pub mod value;

// Re-export commonly used types for convenience
pub use catalog::DialectCatalog;
pub use schema::{ColumnMeta, RowSet, TableRef};
pub use traits::{
    CountQueryOptions, Dialect, QueryExecutor, QueryParams, SampleQueryOptions,
    END_DATE_PARAM, RECENT_FLAG_COLUMN, START_DATE_PARAM,
};
pub use value::RawValue;
