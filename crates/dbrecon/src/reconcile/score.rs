//! Diff scoring model.
//!
//! The score is a linear combination of five percentages with fixed policy
//! weights. Value mismatches among shared keys weigh most, missing rows on
//! either side weigh equally, duplicate keys weigh least. The weights sum to
//! 1.0; changing them changes every historical score, so they are not
//! configurable.

use serde::{Deserialize, Serialize};

use super::types::{ComparisonStats, RowCounts};

pub const MISMATCH_WEIGHT: f64 = 0.5;
pub const SOURCE_ONLY_WEIGHT: f64 = 0.15;
pub const TARGET_ONLY_WEIGHT: f64 = 0.15;
pub const DUP_SOURCE_WEIGHT: f64 = 0.1;
pub const DUP_TARGET_WEIGHT: f64 = 0.1;

/// The five derived percentages, each in `[0, 100]` except the side-only
/// terms which are relative to common keys and may exceed 100.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Percentages {
    pub mismatch: f64,
    pub source_only: f64,
    pub target_only: f64,
    pub dup_source: f64,
    pub dup_target: f64,
}

fn ratio(part: usize, whole: usize) -> f64 {
    part as f64 / whole as f64 * 100.0
}

pub fn percentages(c: &RowCounts) -> Percentages {
    let side_only = |only: usize| {
        if c.common_pk_rows > 0 {
            ratio(only, c.common_pk_rows)
        } else if only > 0 {
            100.0
        } else {
            0.0
        }
    };

    Percentages {
        mismatch: if c.common_pk_rows > 0 {
            ratio(c.common_pk_rows - c.total_matched_rows, c.common_pk_rows)
        } else {
            0.0
        },
        source_only: side_only(c.only_source_rows),
        target_only: side_only(c.only_target_rows),
        dup_source: if c.total_source_rows > 0 {
            ratio(c.dup_source_rows, c.total_source_rows)
        } else {
            0.0
        },
        dup_target: if c.total_target_rows > 0 {
            ratio(c.dup_target_rows, c.total_target_rows)
        } else {
            0.0
        },
    }
}

/// Weighted diff score, clamped to `[0, 100]`.
///
/// Full disjointness (no shared key, at least one side-only key) is 100.
pub fn final_diff_score(c: &RowCounts, p: &Percentages) -> f64 {
    if c.common_pk_rows == 0 && (c.only_source_rows > 0 || c.only_target_rows > 0) {
        return 100.0;
    }
    let score = p.mismatch * MISMATCH_WEIGHT
        + p.source_only * SOURCE_ONLY_WEIGHT
        + p.target_only * TARGET_ONLY_WEIGHT
        + p.dup_source * DUP_SOURCE_WEIGHT
        + p.dup_target * DUP_TARGET_WEIGHT;
    score.clamp(0.0, 100.0)
}

/// Terminal state of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ComparisonStatus {
    Success,
    Failed,
    Skipped,
}

impl std::fmt::Display for ComparisonStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComparisonStatus::Success => write!(f, "SUCCESS"),
            ComparisonStatus::Failed => write!(f, "FAILED"),
            ComparisonStatus::Skipped => write!(f, "SKIPPED"),
        }
    }
}

/// Decide the status against a tolerance percentage.
pub fn decide(stats: Option<&ComparisonStats>, tolerance: f64) -> ComparisonStatus {
    match stats {
        None => ComparisonStatus::Skipped,
        Some(s) if s.final_diff_score <= tolerance => ComparisonStatus::Success,
        Some(_) => ComparisonStatus::Failed,
    }
}
