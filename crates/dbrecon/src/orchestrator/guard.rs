//! Memory ceiling for fetched row sets.

use sysinfo::System;
use tracing::{debug, info};

use crate::core::schema::RowSet;
use crate::core::value::RawValue;
use crate::error::{ReconError, Result};

/// Lower bound of the auto-tuned ceiling.
pub const MIN_MEMORY_LIMIT_BYTES: u64 = 512 * 1024 * 1024;

/// Rows inspected when estimating the average row size.
const SAMPLE_ROWS: usize = 1000;

/// Half of `total_memory_bytes`, never below [`MIN_MEMORY_LIMIT_BYTES`].
pub fn auto_limit_bytes(total_memory_bytes: u64) -> u64 {
    (total_memory_bytes / 2).max(MIN_MEMORY_LIMIT_BYTES)
}

/// Rejects inputs whose estimated in-memory size exceeds a ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryGuard {
    limit_bytes: u64,
}

impl MemoryGuard {
    pub fn new(limit_bytes: u64) -> Self {
        Self { limit_bytes }
    }

    /// Ceiling derived from physical memory by [`auto_limit_bytes`].
    pub fn auto() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        let total = sys.total_memory();
        let limit_bytes = auto_limit_bytes(total);
        info!(
            "Memory ceiling auto-tuned to {:.1} MB ({:.1} GB RAM)",
            limit_bytes as f64 / (1024.0 * 1024.0),
            total as f64 / (1024.0 * 1024.0 * 1024.0)
        );
        Self { limit_bytes }
    }

    pub fn limit_bytes(&self) -> u64 {
        self.limit_bytes
    }

    /// Check both sides together; returns the combined estimate.
    pub fn check(&self, source: &RowSet, target: &RowSet) -> Result<u64> {
        let estimated_bytes = estimate_bytes(source).saturating_add(estimate_bytes(target));
        debug!(
            "Estimated input size {} bytes (limit {})",
            estimated_bytes, self.limit_bytes
        );
        if estimated_bytes > self.limit_bytes {
            return Err(ReconError::SizeLimitExceeded {
                estimated_bytes,
                limit_bytes: self.limit_bytes,
                source_rows: source.len(),
                target_rows: target.len(),
            });
        }
        Ok(estimated_bytes)
    }
}

fn row_size(row: &[RawValue]) -> u64 {
    let values: usize = row.iter().map(RawValue::estimated_size).sum();
    (std::mem::size_of::<Vec<RawValue>>() + values) as u64
}

/// Average size of evenly spaced sample rows times the row count.
pub fn estimate_bytes(rows: &RowSet) -> u64 {
    let all = rows.rows();
    if all.is_empty() {
        return 0;
    }
    let step = (all.len() / SAMPLE_ROWS).max(1);
    let (total, sampled) = all
        .iter()
        .step_by(step)
        .take(SAMPLE_ROWS)
        .fold((0u64, 0u64), |(total, n), row| (total + row_size(row), n + 1));
    (total / sampled).saturating_mul(all.len() as u64)
}
