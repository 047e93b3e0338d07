//! Row dump loading.
//!
//! Each side's rows come from a JSON file holding an array of objects, one
//! object per row. Declared column types from the config are attached so the
//! side's dialect can interpret text-typed values.

use std::path::{Path, PathBuf};

use dbrecon::core::identifier::normalize_column_name;
use dbrecon::{ReconError, RowSet, Side, SideConfig};
use tracing::{info, warn};

/// Resolve `file` against the directory of the config file.
pub fn resolve(base_dir: &Path, file: &Path) -> PathBuf {
    if file.is_absolute() {
        file.to_path_buf()
    } else {
        base_dir.join(file)
    }
}

pub fn load_side(side: Side, config: &SideConfig, base_dir: &Path) -> Result<RowSet, ReconError> {
    let path = resolve(base_dir, &config.file);
    let content = std::fs::read_to_string(&path)?;
    let value: serde_json::Value = serde_json::from_str(&content)?;
    let objects = value.as_array().ok_or_else(|| {
        ReconError::Config(format!(
            "{} file {:?} must hold a JSON array of row objects",
            side, path
        ))
    })?;

    let mut rows = RowSet::from_json_objects(side, objects)?;
    for (column, declared) in &config.column_types {
        if !rows.set_declared_type(&normalize_column_name(column), declared.as_str()) {
            warn!(
                "{} column_types names '{}', which is not in {:?}",
                side, column, path
            );
        }
    }

    info!(
        "Loaded {} {} rows x {} columns from {:?}",
        rows.len(),
        side,
        rows.columns().len(),
        path
    );
    Ok(rows)
}

/// Load a side on the blocking pool.
pub async fn load_side_blocking(
    side: Side,
    config: SideConfig,
    base_dir: PathBuf,
) -> Result<RowSet, ReconError> {
    tokio::task::spawn_blocking(move || load_side(side, &config, &base_dir))
        .await
        .map_err(|e| ReconError::Config(format!("{} loader task failed: {}", side, e)))?
}
