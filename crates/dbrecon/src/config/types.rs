//! Configuration type definitions with auto-tuning based on system resources.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sysinfo::System;
use tracing::info;

use crate::error::ReconError;
use crate::orchestrator::guard::{auto_limit_bytes, MIN_MEMORY_LIMIT_BYTES};

/// System resource information for auto-tuning.
#[derive(Debug, Clone)]
pub struct SystemResources {
    /// Total RAM in bytes.
    pub total_memory_bytes: u64,
    /// Total RAM in GB.
    pub total_memory_gb: f64,
}

impl SystemResources {
    /// Detect system resources.
    pub fn detect() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();

        let total_memory_bytes = sys.total_memory();
        let total_memory_gb = total_memory_bytes as f64 / (1024.0 * 1024.0 * 1024.0);

        Self {
            total_memory_bytes,
            total_memory_gb,
        }
    }

    /// Log detected system resources.
    pub fn log(&self) {
        info!("System resources: {:.1} GB RAM", self.total_memory_gb);
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source side of the comparison.
    pub source: SideConfig,

    /// Target side of the comparison.
    pub target: SideConfig,

    /// Comparison behavior.
    #[serde(default)]
    pub comparison: ComparisonConfig,
}

impl Config {
    /// Apply auto-tuned defaults based on system resources.
    /// Only fills in values that weren't explicitly set in the config file.
    pub fn with_auto_tuning(mut self) -> Self {
        let resources = SystemResources::detect();
        resources.log();
        self.comparison = self.comparison.with_auto_tuning(&resources);
        self
    }
}

/// One side of the comparison: its dialect and where its rows come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SideConfig {
    /// Dialect name (`oracle`, `postgres`, `clickhouse`).
    pub dialect: String,

    /// JSON file holding the side's rows (an array of objects).
    pub file: PathBuf,

    /// Table label used in reports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    /// Declared database types per column, in the dialect's vocabulary.
    #[serde(default)]
    pub column_types: BTreeMap<String, String>,
}

impl SideConfig {
    /// Report label: `dialect table` or just the dialect.
    pub fn label(&self) -> String {
        match &self.table {
            Some(table) => format!("{} {}", self.dialect, table),
            None => self.dialect.clone(),
        }
    }
}

/// Comparison mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareMode {
    /// Keyed row-by-row comparison.
    #[default]
    Sample,

    /// Rows per day of the date column.
    Counts,
}

impl fmt::Display for CompareMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareMode::Sample => write!(f, "sample"),
            CompareMode::Counts => write!(f, "counts"),
        }
    }
}

impl FromStr for CompareMode {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sample" => Ok(CompareMode::Sample),
            "counts" | "count" => Ok(CompareMode::Counts),
            other => Err(ReconError::Config(format!(
                "Unknown comparison mode '{}' (expected sample or counts)",
                other
            ))),
        }
    }
}

/// Comparison behavior configuration.
/// Resource-related fields use Option<T> to distinguish between
/// "not set" (use auto-tuned default) and "explicitly set" (use provided value).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonConfig {
    /// Comparison mode (default: sample).
    #[serde(default)]
    pub mode: CompareMode,

    /// Key columns. Inferred when empty.
    #[serde(default)]
    pub primary_key: Vec<String>,

    /// Columns to compare; all shared columns when empty.
    #[serde(default)]
    pub include_columns: Vec<String>,

    /// Columns never compared.
    #[serde(default)]
    pub exclude_columns: Vec<String>,

    /// Column bucketed by day in counts mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_column: Option<String>,

    /// Highest acceptable diff score in percent (default: 0).
    #[serde(default)]
    pub tolerance_percentage: f64,

    /// Examples kept per mismatched column (default: 3).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_examples: Option<usize>,

    /// IANA reference timezone (default: "UTC").
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Memory ceiling in MB. Auto-tuned based on RAM if not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_memory_mb: Option<u64>,

    /// Treat whitespace-only text as null on both sides (default: false).
    #[serde(default)]
    pub treat_blank_as_null: bool,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            mode: CompareMode::default(),
            primary_key: Vec::new(),
            include_columns: Vec::new(),
            exclude_columns: Vec::new(),
            date_column: None,
            tolerance_percentage: 0.0,
            max_examples: None,
            timezone: default_timezone(),
            max_memory_mb: None,
            treat_blank_as_null: false,
        }
    }
}

impl ComparisonConfig {
    /// Apply auto-tuned defaults based on system resources.
    /// Only fills in values that are None (not explicitly set).
    pub fn with_auto_tuning(mut self, resources: &SystemResources) -> Self {
        if self.max_memory_mb.is_none() {
            let bytes = auto_limit_bytes(resources.total_memory_bytes);
            self.max_memory_mb = Some(bytes / (1024 * 1024));
        }

        info!(
            "Auto-tuned config: max_memory_mb={}",
            self.get_max_memory_mb()
        );

        self
    }

    pub fn get_max_examples(&self) -> usize {
        self.max_examples
            .unwrap_or(crate::reconcile::DEFAULT_MAX_EXAMPLES)
    }

    pub fn get_max_memory_mb(&self) -> u64 {
        self.max_memory_mb
            .unwrap_or(MIN_MEMORY_LIMIT_BYTES / (1024 * 1024))
    }
}

fn default_timezone() -> String {
    "UTC".to_string()
}
