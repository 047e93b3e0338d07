//! Error types for the reconciliation library.

use std::fmt;

use thiserror::Error;

/// Which half of a comparison an error or value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Source,
    Target,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Source => write!(f, "source"),
            Side::Target => write!(f, "target"),
        }
    }
}

/// Main error type for comparison operations.
#[derive(Error, Debug)]
pub enum ReconError {
    /// Configuration error (invalid YAML, bad tolerance, unknown dialect, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A declared key column is absent from one side's schema.
    #[error("Key columns missing in {side}: {column} (available columns: {available})")]
    MissingKeyColumn {
        side: Side,
        column: String,
        available: String,
    },

    /// A raw value could not be converted to its canonical form.
    #[error(
        "Cannot normalize {side} value {value} in column '{column}' \
         (dialect: {dialect}, row: {row}): {reason}"
    )]
    Normalization {
        side: Side,
        dialect: String,
        column: String,
        value: String,
        row: String,
        reason: String,
    },

    /// Same logical column is timezone-aware on one side and naive on the other.
    #[error(
        "Column '{column}' is timezone-aware in {aware_side} ({aware_dialect}) \
         but naive in the other side ({naive_dialect}); declare both as the same kind"
    )]
    MixedTimezoneAwareness {
        column: String,
        aware_side: Side,
        aware_dialect: String,
        naive_dialect: String,
    },

    /// Estimated in-memory footprint is above the configured ceiling.
    #[error(
        "Estimated row data size {estimated_bytes} bytes ({source_rows} source rows, \
         {target_rows} target rows) exceeds limit of {limit_bytes} bytes"
    )]
    SizeLimitExceeded {
        estimated_bytes: u64,
        limit_bytes: u64,
        source_rows: usize,
        target_rows: usize,
    },

    /// Two columns collapse to the same name after case normalization.
    #[error("Duplicate column '{column}' in {side} result set")]
    DuplicateColumn { side: Side, column: String },

    /// The query executor failed for one side.
    #[error("Query failed for {side} ({dialect}): {message}")]
    Query {
        side: Side,
        dialect: String,
        message: String,
    },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Exit codes used by the CLI for each error class.
pub const EXIT_CONFIG_ERROR: u8 = 1;
pub const EXIT_MISSING_KEY: u8 = 2;
pub const EXIT_NORMALIZATION: u8 = 3;
pub const EXIT_MIXED_TIMEZONE: u8 = 4;
pub const EXIT_SIZE_LIMIT: u8 = 5;
pub const EXIT_QUERY_ERROR: u8 = 6;
pub const EXIT_IO_ERROR: u8 = 7;

impl ReconError {
    /// Create a Query error for a failed fetch on one side.
    pub fn query(side: Side, dialect: impl Into<String>, message: impl Into<String>) -> Self {
        ReconError::Query {
            side,
            dialect: dialect.into(),
            message: message.into(),
        }
    }

    /// Create a MissingKeyColumn error listing the columns that were available.
    pub fn missing_key(side: Side, column: impl Into<String>, available: &[String]) -> Self {
        ReconError::MissingKeyColumn {
            side,
            column: column.into(),
            available: available.join(", "),
        }
    }

    /// Exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            ReconError::Config(_)
            | ReconError::Yaml(_)
            | ReconError::Json(_)
            | ReconError::DuplicateColumn { .. } => EXIT_CONFIG_ERROR,
            ReconError::MissingKeyColumn { .. } => EXIT_MISSING_KEY,
            ReconError::Normalization { .. } => EXIT_NORMALIZATION,
            ReconError::MixedTimezoneAwareness { .. } => EXIT_MIXED_TIMEZONE,
            ReconError::SizeLimitExceeded { .. } => EXIT_SIZE_LIMIT,
            ReconError::Query { .. } => EXIT_QUERY_ERROR,
            ReconError::Io(_) => EXIT_IO_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for comparison operations.
pub type Result<T> = std::result::Result<T, ReconError>;
