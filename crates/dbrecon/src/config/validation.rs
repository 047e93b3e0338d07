//! Configuration validation.

use super::{CompareMode, Config, SideConfig};
use crate::core::catalog::DialectCatalog;
use crate::core::identifier::validate_identifier;
use crate::error::{ReconError, Result};
use crate::orchestrator::validate_tolerance;

fn validate_side(name: &str, side: &SideConfig, catalog: &DialectCatalog) -> Result<()> {
    if side.dialect.trim().is_empty() {
        return Err(ReconError::Config(format!("{name}.dialect is required")));
    }
    if !catalog.has_dialect(&side.dialect) {
        return Err(ReconError::Config(format!(
            "{name}.dialect '{}' is not supported (known: {})",
            side.dialect,
            catalog.dialect_names().join(", ")
        )));
    }
    if side.file.as_os_str().is_empty() {
        return Err(ReconError::Config(format!("{name}.file is required")));
    }
    for (column, declared) in &side.column_types {
        validate_identifier(column)
            .map_err(|e| ReconError::Config(format!("{name}.column_types: {e}")))?;
        if declared.trim().is_empty() {
            return Err(ReconError::Config(format!(
                "{name}.column_types.{column} must name a type"
            )));
        }
    }
    Ok(())
}

fn validate_columns(field: &str, columns: &[String]) -> Result<()> {
    for column in columns {
        validate_identifier(column)
            .map_err(|e| ReconError::Config(format!("comparison.{field}: {e}")))?;
    }
    Ok(())
}

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    let catalog = DialectCatalog::with_builtins();
    validate_side("source", &config.source, &catalog)?;
    validate_side("target", &config.target, &catalog)?;

    let cmp = &config.comparison;
    validate_columns("primary_key", &cmp.primary_key)?;
    validate_columns("include_columns", &cmp.include_columns)?;
    validate_columns("exclude_columns", &cmp.exclude_columns)?;

    // A key column cannot also be excluded
    if let Some(key) = cmp
        .primary_key
        .iter()
        .find(|k| cmp.exclude_columns.iter().any(|e| e.eq_ignore_ascii_case(k)))
    {
        return Err(ReconError::Config(format!(
            "comparison.exclude_columns contains key column '{}'",
            key
        )));
    }

    validate_tolerance(cmp.tolerance_percentage).map_err(|_| {
        ReconError::Config(format!(
            "comparison.tolerance_percentage must be within [0, 100], got {}",
            cmp.tolerance_percentage
        ))
    })?;

    cmp.reference_tz()?;

    if cmp.mode == CompareMode::Counts {
        match cmp.date_column.as_deref() {
            None => {
                return Err(ReconError::Config(
                    "comparison.date_column is required in counts mode".into(),
                ))
            }
            Some(column) => validate_identifier(column)
                .map_err(|e| ReconError::Config(format!("comparison.date_column: {e}")))?,
        }
    }

    if let Some(0) = cmp.max_memory_mb {
        return Err(ReconError::Config(
            "comparison.max_memory_mb must be at least 1".into(),
        ));
    }

    Ok(())
}
