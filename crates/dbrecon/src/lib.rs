//! # dbrecon
//!
//! Cross-database row reconciliation and discrepancy scoring.
//!
//! This library compares rows of the same logical table held by two
//! databases of different engines and condenses the differences into a
//! single score:
//!
//! - **Canonical normalization** of values through per-engine dialects
//!   (Oracle, PostgreSQL, ClickHouse)
//! - **Keyed reconciliation** with duplicate-key accounting and bounded
//!   mismatch examples
//! - **Per-day count comparison** for cheap volume checks
//! - **Weighted diff score** decided against a tolerance
//!
//! The library never connects to a database itself: queries run through an
//! injected [`QueryExecutor`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use dbrecon::{
//!     ColumnSelection, ComparatorOptions, DialectCatalog, KeySpec, Reconciler, RowSet,
//! };
//!
//! fn main() -> dbrecon::Result<()> {
//!     let reconciler = Reconciler::from_catalog(
//!         &DialectCatalog::with_builtins(),
//!         "oracle",
//!         "postgres",
//!         ComparatorOptions::default(),
//!     )?;
//!     let outcome = reconciler.compare_rows(
//!         &RowSet::empty(),
//!         &RowSet::empty(),
//!         &KeySpec::explicit(["id"]),
//!         &ColumnSelection::default(),
//!     )?;
//!     println!("{}", outcome.status());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod dialect;
pub mod drivers;
pub mod error;
pub mod normalize;
pub mod orchestrator;
pub mod reconcile;
pub mod report;

// Re-exports for convenient access
pub use crate::core::{
    ColumnMeta, Dialect, DialectCatalog, QueryExecutor, QueryParams, RawValue, RowSet, TableRef,
};
pub use config::{CompareMode, ComparisonConfig, Config, SideConfig};
pub use dialect::{CanonicalValue, TypeHint};
pub use error::{ReconError, Result, Side};
pub use normalize::{ColumnSelection, NormalizeOptions, NormalizedRowSet, Normalizer};
pub use orchestrator::{
    Comparator, ComparatorOptions, Comparison, ComparisonOutcome, CountRequest,
    CustomQueryRequest, DateRange, KeySpec, MemoryGuard, Reconciler, RunSummary, SampleRequest,
};
pub use reconcile::{ComparisonDiffDetails, ComparisonStats, ComparisonStatus, MismatchExample};
