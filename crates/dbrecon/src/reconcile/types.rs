//! Result types of a reconciliation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dialect::canonical::CanonicalValue;

use super::index::KeyDisplay;
use super::score;

/// Raw counts produced by the engine, before any percentage is derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowCounts {
    pub total_source_rows: usize,
    pub total_target_rows: usize,
    /// Keys present on both sides.
    pub common_pk_rows: usize,
    /// Distinct keys present only in the source.
    pub only_source_rows: usize,
    /// Distinct keys present only in the target.
    pub only_target_rows: usize,
    /// Source rows beyond the first occurrence of their key.
    pub dup_source_rows: usize,
    /// Target rows beyond the first occurrence of their key.
    pub dup_target_rows: usize,
    /// Common keys whose compared columns are all equal.
    pub total_matched_rows: usize,
}

/// Statistics of one comparison. Built once from counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonStats {
    pub total_source_rows: usize,
    pub total_target_rows: usize,
    pub common_pk_rows: usize,
    pub only_source_rows: usize,
    pub only_target_rows: usize,
    pub dup_source_rows: usize,
    pub dup_target_rows: usize,
    pub total_matched_rows: usize,
    pub mismatch_percentage_rows: f64,
    pub source_only_percentage_rows: f64,
    pub target_only_percentage_rows: f64,
    pub dup_source_percentage_rows: f64,
    pub dup_target_percentage_rows: f64,
    pub final_diff_score: f64,
    pub final_score: f64,
}

impl ComparisonStats {
    /// Derive percentages and scores from engine counts.
    pub fn from_counts(counts: RowCounts) -> Self {
        let pct = score::percentages(&counts);
        let final_diff_score = score::final_diff_score(&counts, &pct);

        Self {
            total_source_rows: counts.total_source_rows,
            total_target_rows: counts.total_target_rows,
            common_pk_rows: counts.common_pk_rows,
            only_source_rows: counts.only_source_rows,
            only_target_rows: counts.only_target_rows,
            dup_source_rows: counts.dup_source_rows,
            dup_target_rows: counts.dup_target_rows,
            total_matched_rows: counts.total_matched_rows,
            mismatch_percentage_rows: pct.mismatch,
            source_only_percentage_rows: pct.source_only,
            target_only_percentage_rows: pct.target_only,
            dup_source_percentage_rows: pct.dup_source,
            dup_target_percentage_rows: pct.dup_target,
            final_diff_score,
            final_score: 100.0 - final_diff_score,
        }
    }

    pub fn counts(&self) -> RowCounts {
        RowCounts {
            total_source_rows: self.total_source_rows,
            total_target_rows: self.total_target_rows,
            common_pk_rows: self.common_pk_rows,
            only_source_rows: self.only_source_rows,
            only_target_rows: self.only_target_rows,
            dup_source_rows: self.dup_source_rows,
            dup_target_rows: self.dup_target_rows,
            total_matched_rows: self.total_matched_rows,
        }
    }

    /// Common keys with at least one differing column.
    pub fn mismatched_rows(&self) -> usize {
        self.common_pk_rows - self.total_matched_rows
    }
}

/// One retained piece of mismatch evidence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MismatchExample {
    pub key: Vec<CanonicalValue>,
    pub source: CanonicalValue,
    pub target: CanonicalValue,
}

impl MismatchExample {
    pub fn key_display(&self) -> KeyDisplay<'_> {
        KeyDisplay(&self.key)
    }
}

/// Per-column mismatch counts with a bounded sample of examples.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComparisonDiffDetails {
    pub mismatches_per_column: BTreeMap<String, usize>,
    pub discrepancies_per_col_examples: BTreeMap<String, Vec<MismatchExample>>,
    #[serde(skip)]
    max_examples: usize,
}

impl ComparisonDiffDetails {
    pub fn new(max_examples: usize) -> Self {
        Self {
            max_examples,
            ..Default::default()
        }
    }

    /// Count a mismatch in `column`; the example is built only while the
    /// column is below the example cap.
    pub fn record<F>(&mut self, column: &str, example: F)
    where
        F: FnOnce() -> MismatchExample,
    {
        match self.mismatches_per_column.get_mut(column) {
            Some(count) => *count += 1,
            None => {
                self.mismatches_per_column.insert(column.to_string(), 1);
            }
        }

        if self.max_examples == 0 {
            return;
        }
        let examples = self
            .discrepancies_per_col_examples
            .entry(column.to_string())
            .or_default();
        if examples.len() < self.max_examples {
            examples.push(example());
        }
    }

    pub fn max_examples(&self) -> usize {
        self.max_examples
    }

    /// Total number of retained examples across columns.
    pub fn example_count(&self) -> usize {
        self.discrepancies_per_col_examples.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.mismatches_per_column.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::index::Key;
    use rust_decimal::Decimal;

    fn example(k: i64) -> MismatchExample {
        MismatchExample {
            key: vec![CanonicalValue::number(Decimal::from(k))],
            source: CanonicalValue::Text("a".into()),
            target: CanonicalValue::Text("b".into()),
        }
    }

    #[test]
    fn test_examples_capped_but_counts_complete() {
        let mut details = ComparisonDiffDetails::new(2);
        for k in 0..5 {
            details.record("name", || example(k));
        }
        assert_eq!(details.mismatches_per_column["name"], 5);
        assert_eq!(details.discrepancies_per_col_examples["name"].len(), 2);
        assert_eq!(details.example_count(), 2);
    }

    #[test]
    fn test_zero_examples_keeps_counts() {
        let mut details = ComparisonDiffDetails::new(0);
        details.record("name", || example(1));
        assert_eq!(details.mismatches_per_column["name"], 1);
        assert_eq!(details.example_count(), 0);
    }

    #[test]
    fn test_stats_round_trip_counts() {
        let counts = RowCounts {
            total_source_rows: 3,
            total_target_rows: 3,
            common_pk_rows: 3,
            total_matched_rows: 3,
            ..Default::default()
        };
        let stats = ComparisonStats::from_counts(counts);
        assert_eq!(stats.counts(), counts);
        assert_eq!(stats.final_score, 100.0);
    }

    #[test]
    fn test_compound_key_display() {
        let ex = MismatchExample {
            key: vec![
                CanonicalValue::number(Decimal::from(1)),
                CanonicalValue::Text("A".into()),
            ],
            ..example(0)
        };
        assert_eq!(ex.key_display().to_string(), "(1, A)");
        assert_eq!(example(7).key_display().to_string(), "7");
        assert_eq!(
            ex.key_display().to_string(),
            Key(ex.key.clone()).to_string()
        );
    }
}
