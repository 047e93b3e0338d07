//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::{ReconError, Result};
use crate::normalize::{ColumnSelection, NormalizeOptions};
use crate::orchestrator::{ComparatorOptions, KeySpec};
use chrono_tz::Tz;
use sha2::{Digest, Sha256};
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Compute a SHA256 hash of the configuration for the run summary.
    pub fn hash(&self) -> String {
        let yaml = serde_yaml::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(yaml.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl ComparisonConfig {
    /// Parsed reference timezone.
    pub fn reference_tz(&self) -> Result<Tz> {
        self.timezone.parse::<Tz>().map_err(|_| {
            ReconError::Config(format!(
                "comparison.timezone '{}' is not an IANA zone name",
                self.timezone
            ))
        })
    }

    pub fn key_spec(&self) -> KeySpec {
        if self.primary_key.is_empty() {
            KeySpec::Inferred
        } else {
            KeySpec::explicit(&self.primary_key)
        }
    }

    pub fn selection(&self) -> ColumnSelection {
        ColumnSelection::new(&self.include_columns, &self.exclude_columns)
    }

    /// Options for the comparison orchestrator.
    pub fn comparator_options(&self) -> Result<ComparatorOptions> {
        Ok(ComparatorOptions {
            tolerance: self.tolerance_percentage,
            max_examples: self.get_max_examples(),
            reference_tz: self.reference_tz()?,
            normalize: NormalizeOptions {
                treat_blank_as_null: self.treat_blank_as_null,
            },
            memory_limit_bytes: self.max_memory_mb.map(|mb| mb.saturating_mul(1024 * 1024)),
        })
    }
}
