//! Reconciliation core: key index, keyed and per-day comparison, scoring.
//!
//! Everything here is synchronous and works on normalized row sets; fetching
//! and normalization happen in the orchestrator.

pub mod counts;
pub mod engine;
pub mod index;
pub mod recency;
pub mod score;
pub mod types;

pub use counts::{
    cross_fill, daily_counts, daily_counts_by_column, reconcile_counts, DailyCount,
    ROW_COUNT_COLUMN,
};
pub use engine::{
    check_key_columns, reconcile, ReconcileOptions, Reconciliation, DEFAULT_MAX_EXAMPLES,
};
pub use index::{Key, KeyDisplay, KeyGroup, RowIndex};
pub use recency::exclude_recently_changed;
pub use score::{decide, ComparisonStatus};
pub use types::{ComparisonDiffDetails, ComparisonStats, MismatchExample, RowCounts};
