//! Comparison orchestrator - main workflow coordinator.
//!
//! [`Reconciler`] runs the synchronous pipeline on row sets that are already
//! in memory: memory guard, normalization, recency exclusion, reconciliation,
//! decision and report. [`Comparator`] adds query building and concurrent
//! fetching through each side's [`QueryExecutor`].

pub mod guard;

pub use guard::MemoryGuard;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::catalog::DialectCatalog;
use crate::core::identifier::normalize_column_name;
use crate::core::schema::{RowSet, TableRef};
use crate::core::traits::{
    CountQueryOptions, Dialect, QueryExecutor, QueryParams, SampleQueryOptions, END_DATE_PARAM,
    START_DATE_PARAM,
};
use crate::core::value::RawValue;
use crate::error::{ReconError, Result, Side};
use crate::normalize::{ColumnSelection, NormalizeOptions, NormalizedRowSet, Normalizer};
use crate::reconcile::{
    self, cross_fill, daily_counts, daily_counts_by_column, decide, exclude_recently_changed,
    reconcile_counts, ComparisonDiffDetails, ComparisonStats, ComparisonStatus, ReconcileOptions,
    Reconciliation, DEFAULT_MAX_EXAMPLES,
};
use crate::report::{self, ReportContext};

/// Which columns identify a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySpec {
    /// Caller-named key columns.
    Explicit(Vec<String>),
    /// Primary key metadata when available, else `id`, else the first column.
    Inferred,
}

impl KeySpec {
    pub fn explicit<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::Explicit(
            columns
                .into_iter()
                .map(|c| normalize_column_name(c.as_ref()))
                .collect(),
        )
    }

    /// Case-folded explicit columns; `None` when the key is inferred.
    pub fn explicit_columns(&self) -> Option<Vec<String>> {
        match self {
            KeySpec::Explicit(columns) => {
                Some(columns.iter().map(|c| normalize_column_name(c)).collect())
            }
            KeySpec::Inferred => None,
        }
    }
}

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(ReconError::Config(format!(
                "Date range end {} is before start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// Bind `[start 00:00, end + 1 day 00:00)` in `tz`.
    pub fn bind(&self, tz: Tz) -> Result<QueryParams> {
        let start = start_of_day(self.start, tz)?;
        let end = start_of_day(self.end + Duration::days(1), tz)?;
        Ok(QueryParams::new()
            .with(START_DATE_PARAM, RawValue::DateTimeOffset(start.fixed_offset()))
            .with(END_DATE_PARAM, RawValue::DateTimeOffset(end.fixed_offset())))
    }
}

fn start_of_day(day: NaiveDate, tz: Tz) -> Result<DateTime<Tz>> {
    day.and_hms_opt(0, 0, 0)
        .and_then(|midnight| tz.from_local_datetime(&midnight).earliest())
        .ok_or_else(|| ReconError::Config(format!("No local midnight on {} in {}", day, tz)))
}

/// Shared comparison settings.
#[derive(Debug, Clone)]
pub struct ComparatorOptions {
    /// Highest diff score still considered a success, in percent.
    pub tolerance: f64,
    pub max_examples: usize,
    /// Zone of date-range boundaries and day buckets.
    pub reference_tz: Tz,
    pub normalize: NormalizeOptions,
    /// Explicit memory ceiling; auto-tuned from RAM when unset.
    pub memory_limit_bytes: Option<u64>,
}

impl Default for ComparatorOptions {
    fn default() -> Self {
        Self {
            tolerance: 0.0,
            max_examples: DEFAULT_MAX_EXAMPLES,
            reference_tz: Tz::UTC,
            normalize: NormalizeOptions::default(),
            memory_limit_bytes: None,
        }
    }
}

/// Validate a tolerance percentage.
pub fn validate_tolerance(tolerance: f64) -> Result<()> {
    if !tolerance.is_finite() || !(0.0..=100.0).contains(&tolerance) {
        return Err(ReconError::Config(format!(
            "Tolerance must be a finite percentage in [0, 100], got {}",
            tolerance
        )));
    }
    Ok(())
}

/// Stats, details and rendered report of a decided comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub report: Option<String>,
    pub stats: ComparisonStats,
    pub details: ComparisonDiffDetails,
}

/// Terminal result of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum ComparisonOutcome {
    Success(Comparison),
    Failed(Comparison),
    Skipped { report: Option<String> },
}

impl ComparisonOutcome {
    fn decided(
        reconciliation: Option<Reconciliation>,
        tolerance: f64,
        render: impl FnOnce(
            ComparisonStatus,
            Option<&ComparisonStats>,
            Option<&ComparisonDiffDetails>,
        ) -> String,
    ) -> Self {
        let status = decide(reconciliation.as_ref().map(|r| &r.stats), tolerance);
        match reconciliation {
            None => ComparisonOutcome::Skipped {
                report: Some(render(status, None, None)),
            },
            Some(Reconciliation { stats, details }) => {
                let comparison = Comparison {
                    report: Some(render(status, Some(&stats), Some(&details))),
                    stats,
                    details,
                };
                if status == ComparisonStatus::Success {
                    ComparisonOutcome::Success(comparison)
                } else {
                    ComparisonOutcome::Failed(comparison)
                }
            }
        }
    }

    pub fn status(&self) -> ComparisonStatus {
        match self {
            ComparisonOutcome::Success(_) => ComparisonStatus::Success,
            ComparisonOutcome::Failed(_) => ComparisonStatus::Failed,
            ComparisonOutcome::Skipped { .. } => ComparisonStatus::Skipped,
        }
    }

    fn comparison(&self) -> Option<&Comparison> {
        match self {
            ComparisonOutcome::Success(c) | ComparisonOutcome::Failed(c) => Some(c),
            ComparisonOutcome::Skipped { .. } => None,
        }
    }

    pub fn stats(&self) -> Option<&ComparisonStats> {
        self.comparison().map(|c| &c.stats)
    }

    pub fn details(&self) -> Option<&ComparisonDiffDetails> {
        self.comparison().map(|c| &c.details)
    }

    pub fn report(&self) -> Option<&str> {
        match self {
            ComparisonOutcome::Success(c) | ComparisonOutcome::Failed(c) => c.report.as_deref(),
            ComparisonOutcome::Skipped { report } => report.as_deref(),
        }
    }

    /// Decompose into `(status, report, stats, details)`.
    pub fn into_parts(
        self,
    ) -> (
        ComparisonStatus,
        Option<String>,
        Option<ComparisonStats>,
        Option<ComparisonDiffDetails>,
    ) {
        let status = self.status();
        match self {
            ComparisonOutcome::Success(c) | ComparisonOutcome::Failed(c) => {
                (status, c.report, Some(c.stats), Some(c.details))
            }
            ComparisonOutcome::Skipped { report } => (status, report, None, None),
        }
    }
}

/// Machine-readable record of one comparison run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Unique run identifier.
    pub run_id: String,
    pub status: ComparisonStatus,
    pub mode: String,
    pub duration_seconds: f64,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// SHA-256 of the job configuration.
    pub config_hash: String,
    pub stats: Option<ComparisonStats>,
    pub details: Option<ComparisonDiffDetails>,
}

impl RunSummary {
    pub fn new(
        mode: impl Into<String>,
        config_hash: impl Into<String>,
        started_at: DateTime<Utc>,
        outcome: &ComparisonOutcome,
    ) -> Self {
        let completed_at = Utc::now();
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            status: outcome.status(),
            mode: mode.into(),
            duration_seconds: (completed_at - started_at).num_milliseconds() as f64 / 1000.0,
            started_at,
            completed_at,
            config_hash: config_hash.into(),
            stats: outcome.stats().cloned(),
            details: outcome.details().cloned(),
        }
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Key columns for an inferred key from fetched schemas.
fn infer_key(source: &RowSet, target: &RowSet) -> Result<Vec<String>> {
    let columns = if source.columns().is_empty() {
        target.column_names()
    } else {
        source.column_names()
    };
    if columns.iter().any(|c| c == "id") {
        return Ok(vec!["id".to_string()]);
    }
    columns
        .into_iter()
        .next()
        .map(|first| vec![first])
        .ok_or_else(|| ReconError::Config("Cannot infer a key: no columns on either side".into()))
}

/// Synchronous comparison of in-memory row sets.
pub struct Reconciler {
    source_dialect: Arc<dyn Dialect>,
    target_dialect: Arc<dyn Dialect>,
    options: ComparatorOptions,
    guard: MemoryGuard,
    labels: Option<(String, String)>,
}

impl Reconciler {
    pub fn new(
        source_dialect: Arc<dyn Dialect>,
        target_dialect: Arc<dyn Dialect>,
        options: ComparatorOptions,
    ) -> Result<Self> {
        validate_tolerance(options.tolerance)?;
        let guard = match options.memory_limit_bytes {
            Some(limit) => MemoryGuard::new(limit),
            None => MemoryGuard::auto(),
        };
        Ok(Self {
            source_dialect,
            target_dialect,
            options,
            guard,
            labels: None,
        })
    }

    /// Side descriptions for reports, in place of the dialect names.
    pub fn with_labels(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.labels = Some((source.into(), target.into()));
        self
    }

    /// Resolve both dialects by name.
    pub fn from_catalog(
        catalog: &DialectCatalog,
        source_dialect: &str,
        target_dialect: &str,
        options: ComparatorOptions,
    ) -> Result<Self> {
        Self::new(
            catalog.require_dialect(source_dialect)?,
            catalog.require_dialect(target_dialect)?,
            options,
        )
    }

    pub fn options(&self) -> &ComparatorOptions {
        &self.options
    }

    pub fn source_dialect(&self) -> &dyn Dialect {
        self.source_dialect.as_ref()
    }

    pub fn target_dialect(&self) -> &dyn Dialect {
        self.target_dialect.as_ref()
    }

    fn context(&self, mode: &str, source: String, target: String) -> ReportContext {
        ReportContext {
            mode: mode.to_string(),
            source,
            target,
            key_columns: Vec::new(),
            tolerance: self.options.tolerance,
            date_range: None,
        }
    }

    fn labelled_context(&self, mode: &str) -> ReportContext {
        let (source, target) = match &self.labels {
            Some((s, t)) => (s.clone(), t.clone()),
            None => (
                self.source_dialect.name().to_string(),
                self.target_dialect.name().to_string(),
            ),
        };
        self.context(mode, source, target)
    }

    fn normalize_pair(
        &self,
        source: &RowSet,
        target: &RowSet,
        key_columns: &[String],
    ) -> Result<(NormalizedRowSet, NormalizedRowSet)> {
        self.guard.check(source, target)?;
        let source = Normalizer::new(Side::Source, self.source_dialect(), self.options.normalize)
            .normalize(source, key_columns)?;
        let target = Normalizer::new(Side::Target, self.target_dialect(), self.options.normalize)
            .normalize(target, key_columns)?;
        Ok((source, target))
    }

    /// Reconcile two fetched row sets by key.
    pub fn compare_rows(
        &self,
        source: &RowSet,
        target: &RowSet,
        key: &KeySpec,
        selection: &ColumnSelection,
    ) -> Result<ComparisonOutcome> {
        let ctx = self.labelled_context("rows");
        let keys = match key.explicit_columns() {
            Some(columns) => columns,
            None => infer_key(source, target)?,
        };
        self.run_keyed(source, target, keys, selection, ctx)
    }

    fn run_keyed(
        &self,
        source: &RowSet,
        target: &RowSet,
        keys: Vec<String>,
        selection: &ColumnSelection,
        mut ctx: ReportContext,
    ) -> Result<ComparisonOutcome> {
        let (mut source, mut target) = self.normalize_pair(source, target, &keys)?;
        exclude_recently_changed(&mut source, &mut target, &keys);

        let options = ReconcileOptions {
            selection: selection.clone(),
            max_examples: self.options.max_examples,
        };
        let reconciliation = reconcile::reconcile(&source, &target, &keys, &options)?;

        ctx.key_columns = keys;
        let outcome = ComparisonOutcome::decided(
            reconciliation,
            self.options.tolerance,
            |status, stats, details| report::render_sample(&ctx, status, stats, details),
        );
        info!("Comparison finished: {}", outcome.status());
        Ok(outcome)
    }

    /// Compare per-day count rows (`dt`, `cnt`) of both sides.
    pub fn compare_daily_counts(
        &self,
        source: &RowSet,
        target: &RowSet,
    ) -> Result<ComparisonOutcome> {
        let ctx = self.labelled_context("counts");
        self.run_counts(source, target, ctx)
    }

    /// Count rows per day of `date_column` on both sides and compare.
    pub fn compare_counts_by_column(
        &self,
        source: &RowSet,
        target: &RowSet,
        date_column: &str,
    ) -> Result<ComparisonOutcome> {
        let column = normalize_column_name(date_column);
        let ctx = self.labelled_context("counts");
        let (source, target) = self.normalize_pair(source, target, &[])?;
        let tz = self.options.reference_tz;
        let source = daily_counts_by_column(&source, &column, tz)?;
        let target = daily_counts_by_column(&target, &column, tz)?;
        Ok(self.finish_counts(&source, &target, ctx))
    }

    fn run_counts(
        &self,
        source: &RowSet,
        target: &RowSet,
        ctx: ReportContext,
    ) -> Result<ComparisonOutcome> {
        let (source, target) = self.normalize_pair(source, target, &[])?;
        let tz = self.options.reference_tz;
        let source = daily_counts(&source, tz)?;
        let target = daily_counts(&target, tz)?;
        Ok(self.finish_counts(&source, &target, ctx))
    }

    fn finish_counts(
        &self,
        source: &BTreeMap<NaiveDate, u64>,
        target: &BTreeMap<NaiveDate, u64>,
        ctx: ReportContext,
    ) -> ComparisonOutcome {
        let (source, target) = cross_fill(source, target);
        debug!("Cross-filled daily counts over {} days", source.len());

        let reconciliation = reconcile_counts(&source, &target, self.options.max_examples);
        let outcome = ComparisonOutcome::decided(
            reconciliation,
            self.options.tolerance,
            |status, stats, details| report::render_counts(&ctx, status, stats, details),
        );
        info!("Count comparison finished: {}", outcome.status());
        outcome
    }
}

/// Sample-mode request: both tables, optionally restricted to a day range.
#[derive(Debug, Clone)]
pub struct SampleRequest {
    pub source_table: TableRef,
    pub target_table: TableRef,
    pub date_column: Option<String>,
    pub date_range: Option<DateRange>,
    pub update_column: Option<String>,
    pub exclude_recent_hours: Option<u32>,
    pub key: KeySpec,
    pub selection: ColumnSelection,
}

impl SampleRequest {
    pub fn new(source_table: TableRef, target_table: TableRef) -> Self {
        Self {
            source_table,
            target_table,
            date_column: None,
            date_range: None,
            update_column: None,
            exclude_recent_hours: None,
            key: KeySpec::Inferred,
            selection: ColumnSelection::default(),
        }
    }
}

/// Count-mode request: rows per day of `date_column` within the range.
#[derive(Debug, Clone)]
pub struct CountRequest {
    pub source_table: TableRef,
    pub target_table: TableRef,
    pub date_column: String,
    pub date_range: DateRange,
}

/// Caller-written SQL for each side.
#[derive(Debug, Clone)]
pub struct CustomQueryRequest {
    pub source_sql: String,
    pub source_params: QueryParams,
    pub target_sql: String,
    pub target_params: QueryParams,
    pub key: KeySpec,
    pub selection: ColumnSelection,
}

/// Fetches both sides through their executors, then reconciles.
pub struct Comparator {
    reconciler: Reconciler,
    source: Arc<dyn QueryExecutor>,
    target: Arc<dyn QueryExecutor>,
}

impl Comparator {
    pub fn new(
        reconciler: Reconciler,
        source: Arc<dyn QueryExecutor>,
        target: Arc<dyn QueryExecutor>,
    ) -> Self {
        Self {
            reconciler,
            source,
            target,
        }
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    async fn fetch_both(
        &self,
        source: (&str, &QueryParams),
        target: (&str, &QueryParams),
    ) -> Result<(RowSet, RowSet)> {
        debug!("Source query: {}", source.0);
        debug!("Target query: {}", target.0);
        let started = Instant::now();
        let (s, t) = tokio::join!(
            self.source.fetch(source.0, source.1),
            self.target.fetch(target.0, target.1)
        );
        let (s, t) = (s?, t?);
        info!(
            "Fetched {} source and {} target rows in {:.2}s",
            s.len(),
            t.len(),
            started.elapsed().as_secs_f64()
        );
        Ok((s, t))
    }

    /// Primary key columns of the source table, if the metadata query
    /// yields any.
    async fn primary_key(&self, table: &TableRef) -> Option<Vec<String>> {
        let sql = self.reconciler.source_dialect().primary_key_query(table);
        match self.source.fetch(&sql, &QueryParams::new()).await {
            Ok(rows) => {
                let keys: Vec<String> = rows
                    .rows()
                    .iter()
                    .filter_map(|row| row.first().and_then(RawValue::as_str))
                    .map(normalize_column_name)
                    .collect();
                if keys.is_empty() {
                    None
                } else {
                    info!("Using primary key of {}: {}", table, keys.join(", "));
                    Some(keys)
                }
            }
            Err(e) => {
                warn!("Primary key lookup for {} failed: {}", table, e);
                None
            }
        }
    }

    fn describe(dialect: &dyn Dialect, table: &TableRef) -> String {
        format!("{} {}", dialect.name(), table)
    }

    /// Compare sampled rows of two tables.
    pub async fn compare_sample(&self, req: &SampleRequest) -> Result<ComparisonOutcome> {
        let tz = self.reconciler.options().reference_tz;
        let params = match (&req.date_column, req.date_range) {
            (Some(_), Some(range)) => range.bind(tz)?,
            (Some(_), None) => {
                return Err(ReconError::Config(
                    "A date column requires a date range".into(),
                ))
            }
            (None, Some(_)) => {
                return Err(ReconError::Config(
                    "A date range requires a date column".into(),
                ))
            }
            (None, None) => QueryParams::new(),
        };

        let known_keys = match req.key.explicit_columns() {
            Some(columns) => Some(columns),
            None => self.primary_key(&req.source_table).await,
        };

        let build = |dialect: &dyn Dialect, table: &TableRef| {
            let mut opts = SampleQueryOptions::new(table.clone());
            opts.date_column = req.date_column.clone();
            opts.update_column = req.update_column.clone();
            opts.exclude_recent_hours = req.exclude_recent_hours;
            if let (Some(keys), false) = (&known_keys, req.selection.include.is_empty()) {
                opts.columns = keys
                    .iter()
                    .chain(&req.selection.include)
                    .cloned()
                    .collect();
            }
            dialect.build_sample_query(&opts, &params)
        };
        let source_sql = build(self.reconciler.source_dialect(), &req.source_table);
        let target_sql = build(self.reconciler.target_dialect(), &req.target_table);

        let (source, target) = self
            .fetch_both((&source_sql, &params), (&target_sql, &params))
            .await?;

        let keys = match known_keys {
            Some(keys) => keys,
            None => infer_key(&source, &target)?,
        };
        let mut ctx = self.reconciler.context(
            "sample",
            Self::describe(self.reconciler.source_dialect(), &req.source_table),
            Self::describe(self.reconciler.target_dialect(), &req.target_table),
        );
        ctx.date_range = req.date_range.map(|r| (r.start, r.end));
        self.reconciler
            .run_keyed(&source, &target, keys, &req.selection, ctx)
    }

    /// Compare per-day row counts of two tables.
    pub async fn compare_counts(&self, req: &CountRequest) -> Result<ComparisonOutcome> {
        let params = req.date_range.bind(self.reconciler.options().reference_tz)?;
        let build = |dialect: &dyn Dialect, table: &TableRef| {
            dialect.build_count_query(
                &CountQueryOptions {
                    table: table.clone(),
                    date_column: req.date_column.clone(),
                },
                &params,
            )
        };
        let source_sql = build(self.reconciler.source_dialect(), &req.source_table);
        let target_sql = build(self.reconciler.target_dialect(), &req.target_table);

        let (source, target) = self
            .fetch_both((&source_sql, &params), (&target_sql, &params))
            .await?;

        let mut ctx = self.reconciler.context(
            "counts",
            Self::describe(self.reconciler.source_dialect(), &req.source_table),
            Self::describe(self.reconciler.target_dialect(), &req.target_table),
        );
        ctx.date_range = Some((req.date_range.start, req.date_range.end));
        self.reconciler.run_counts(&source, &target, ctx)
    }

    /// Run caller-supplied queries and compare their rows by key.
    pub async fn compare_custom_query(
        &self,
        req: &CustomQueryRequest,
    ) -> Result<ComparisonOutcome> {
        let (source, target) = self
            .fetch_both(
                (&req.source_sql, &req.source_params),
                (&req.target_sql, &req.target_params),
            )
            .await?;

        let keys = match req.key.explicit_columns() {
            Some(columns) => columns,
            None => infer_key(&source, &target)?,
        };
        let ctx = self.reconciler.labelled_context("custom query");
        self.reconciler
            .run_keyed(&source, &target, keys, &req.selection, ctx)
    }
}
