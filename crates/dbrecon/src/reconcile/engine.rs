//! Keyed row comparison.

use tracing::{debug, info};

use crate::dialect::canonical::CanonicalValue;
use crate::error::{ReconError, Result};
use crate::normalize::{plan_columns, ColumnPlan, ColumnSelection, NormalizedRowSet};

use super::index::{Key, RowIndex};
use super::types::{ComparisonDiffDetails, ComparisonStats, MismatchExample, RowCounts};

/// Examples kept per column when the caller does not say otherwise.
pub const DEFAULT_MAX_EXAMPLES: usize = 3;

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub selection: ColumnSelection,
    pub max_examples: usize,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            selection: ColumnSelection::default(),
            max_examples: DEFAULT_MAX_EXAMPLES,
        }
    }
}

/// Stats and mismatch details of one comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub stats: ComparisonStats,
    pub details: ComparisonDiffDetails,
}

/// Every key column must exist on a side that carries a schema.
pub fn check_key_columns(set: &NormalizedRowSet, key_columns: &[String]) -> Result<()> {
    if set.is_blank() {
        return Ok(());
    }
    for key in key_columns {
        if set.column_index(key).is_none() {
            return Err(ReconError::missing_key(set.side(), key, set.columns()));
        }
    }
    Ok(())
}

/// Compare two normalized sides by key.
///
/// Returns `None` when both sides are empty. Duplicate keys collapse to their
/// first row before comparison.
pub fn reconcile(
    source: &NormalizedRowSet,
    target: &NormalizedRowSet,
    key_columns: &[String],
    options: &ReconcileOptions,
) -> Result<Option<Reconciliation>> {
    if key_columns.is_empty() {
        return Err(ReconError::Config(
            "At least one key column is required".into(),
        ));
    }
    check_key_columns(source, key_columns)?;
    check_key_columns(target, key_columns)?;

    if source.is_empty() && target.is_empty() {
        debug!("Both sides empty, nothing to compare");
        return Ok(None);
    }

    let plan = plan_columns(source, target, key_columns, &options.selection)?;

    let source_index = RowIndex::build(source.rows(), |row| {
        Key(plan.keys.iter().map(|k| k.source_value(row)).collect())
    });
    let target_index = RowIndex::build(target.rows(), |row| {
        Key(plan.keys.iter().map(|k| k.target_value(row)).collect())
    });

    let mut details = ComparisonDiffDetails::new(options.max_examples);
    let (common, matched) = compare_common(
        source,
        &source_index,
        target,
        &target_index,
        &plan.values,
        &mut details,
    );

    let counts = RowCounts {
        total_source_rows: source_index.total_row_count(),
        total_target_rows: target_index.total_row_count(),
        common_pk_rows: common,
        only_source_rows: source_index.distinct_key_count() - common,
        only_target_rows: target_index.distinct_key_count() - common,
        dup_source_rows: source_index.duplicate_row_count(),
        dup_target_rows: target_index.duplicate_row_count(),
        total_matched_rows: matched,
    };
    let stats = ComparisonStats::from_counts(counts);

    info!(
        "Compared {} source / {} target rows on {} columns: {} common, {} matched, diff score {:.4}",
        counts.total_source_rows,
        counts.total_target_rows,
        plan.values.len(),
        counts.common_pk_rows,
        counts.total_matched_rows,
        stats.final_diff_score
    );

    Ok(Some(Reconciliation { stats, details }))
}

/// Walk the smaller index, looking keys up in the larger; returns (common, matched).
fn compare_common(
    source: &NormalizedRowSet,
    source_index: &RowIndex,
    target: &NormalizedRowSet,
    target_index: &RowIndex,
    columns: &[ColumnPlan],
    details: &mut ComparisonDiffDetails,
) -> (usize, usize) {
    let source_scanned = source_index.distinct_key_count() <= target_index.distinct_key_count();
    let (scanned, lookup) = if source_scanned {
        (source_index, target_index)
    } else {
        (target_index, source_index)
    };

    let mut common = 0;
    let mut matched = 0;
    for group in scanned.groups() {
        let Some(other) = lookup.get(&group.key) else {
            continue;
        };
        common += 1;
        let (s, t) = if source_scanned {
            (group.first_row, other.first_row)
        } else {
            (other.first_row, group.first_row)
        };
        if compare_rows(
            &group.key,
            &source.rows()[s],
            &target.rows()[t],
            columns,
            details,
        ) {
            matched += 1;
        }
    }
    (common, matched)
}

fn compare_rows(
    key: &Key,
    source_row: &[CanonicalValue],
    target_row: &[CanonicalValue],
    columns: &[ColumnPlan],
    details: &mut ComparisonDiffDetails,
) -> bool {
    let mut equal = true;
    for column in columns {
        let s = column.source_value(source_row);
        let t = column.target_value(target_row);
        if s != t {
            equal = false;
            details.record(&column.name, || MismatchExample {
                key: key.values().to_vec(),
                source: s.into_owned(),
                target: t.into_owned(),
            });
        }
    }
    equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Side;
    use rust_decimal::Decimal;

    fn num(v: i64) -> CanonicalValue {
        CanonicalValue::number(Decimal::from(v))
    }

    fn text(v: &str) -> CanonicalValue {
        CanonicalValue::Text(v.into())
    }

    fn set(side: Side, columns: &[&str], rows: Vec<Vec<CanonicalValue>>) -> NormalizedRowSet {
        NormalizedRowSet::new(
            side,
            "postgres",
            columns.iter().map(|c| c.to_string()).collect(),
            vec![],
            rows,
        )
    }

    fn keyed(side: Side, ids: &[i64], values: &[&str]) -> NormalizedRowSet {
        set(
            side,
            &["id", "value"],
            ids.iter()
                .zip(values)
                .map(|(id, v)| vec![num(*id), text(v)])
                .collect(),
        )
    }

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn run(source: &NormalizedRowSet, target: &NormalizedRowSet, key: &[&str]) -> Reconciliation {
        reconcile(source, target, &keys(key), &ReconcileOptions::default())
            .unwrap()
            .unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_identical_sides() {
        let s = keyed(Side::Source, &[1, 2, 3], &["a", "b", "c"]);
        let t = keyed(Side::Target, &[1, 2, 3], &["a", "b", "c"]);
        let r = run(&s, &t, &["id"]);
        assert_eq!(r.stats.final_diff_score, 0.0);
        assert_eq!(r.stats.final_score, 100.0);
        assert!(r.details.is_empty());
    }

    #[test]
    fn test_one_missing_key_each_side() {
        let s = keyed(Side::Source, &[1, 2, 3], &["a", "b", "c"]);
        let t = keyed(Side::Target, &[1, 2, 4], &["a", "b", "d"]);
        let r = run(&s, &t, &["id"]);
        assert_eq!(r.stats.common_pk_rows, 2);
        assert_eq!(r.stats.only_source_rows, 1);
        assert_eq!(r.stats.only_target_rows, 1);
        assert_close(r.stats.final_diff_score, 15.0);
    }

    #[test]
    fn test_value_mismatches_counted_per_column() {
        let s = set(
            Side::Source,
            &["id", "name", "age"],
            vec![
                vec![num(1), text("ann"), num(10)],
                vec![num(2), text("bob"), num(20)],
                vec![num(3), text("cy"), num(30)],
            ],
        );
        let t = set(
            Side::Target,
            &["id", "name", "age"],
            vec![
                vec![num(1), text("ann"), num(10)],
                vec![num(2), text("rob"), num(21)],
                vec![num(3), text("cy"), num(31)],
            ],
        );
        let r = run(&s, &t, &["id"]);
        assert_eq!(r.stats.total_matched_rows, 1);
        assert_eq!(r.stats.mismatched_rows(), 2);
        assert_close(r.stats.final_diff_score, 2.0 / 3.0 * 100.0 * 0.5);
        assert_eq!(r.details.mismatches_per_column["name"], 1);
        assert_eq!(r.details.mismatches_per_column["age"], 2);
        assert_eq!(r.details.example_count(), 3);

        let ex = &r.details.discrepancies_per_col_examples["name"][0];
        assert_eq!(ex.key, vec![num(2)]);
        assert_eq!(ex.source, text("bob"));
        assert_eq!(ex.target, text("rob"));
    }

    #[test]
    fn test_disjoint_sides_score_hundred() {
        let s = keyed(Side::Source, &[1, 2, 3], &["a", "b", "c"]);
        let t = keyed(Side::Target, &[4, 5, 6], &["a", "b", "c"]);
        let r = run(&s, &t, &["id"]);
        assert_eq!(r.stats.common_pk_rows, 0);
        assert_eq!(r.stats.final_diff_score, 100.0);
    }

    #[test]
    fn test_duplicate_key_in_source() {
        let s = keyed(Side::Source, &[1, 1, 2, 3], &["A", "B", "C", "D"]);
        let t = keyed(Side::Target, &[1, 2, 3, 4], &["A", "C", "D", "E"]);
        let r = run(&s, &t, &["id"]);
        assert_eq!(r.stats.dup_source_rows, 1);
        assert_eq!(r.stats.dup_target_rows, 0);
        assert_eq!(r.stats.total_matched_rows, 3);
        assert_close(r.stats.final_diff_score, 7.5);
    }

    #[test]
    fn test_duplicate_key_in_target() {
        let s = keyed(Side::Source, &[1, 2, 3, 4], &["A", "C", "D", "E"]);
        let t = keyed(Side::Target, &[1, 1, 2, 3], &["A", "B", "C", "D"]);
        let r = run(&s, &t, &["id"]);
        assert_eq!(r.stats.dup_target_rows, 1);
        assert_eq!(r.stats.only_source_rows, 1);
        assert_close(r.stats.final_diff_score, 7.5);
    }

    fn compound(side: Side, k1: &[i64], k2: &[&str], values: &[i64]) -> NormalizedRowSet {
        set(
            side,
            &["key1", "key2", "value"],
            k1.iter()
                .zip(k2)
                .zip(values)
                .map(|((a, b), v)| vec![num(*a), text(b), num(*v)])
                .collect(),
        )
    }

    #[test]
    fn test_compound_key_side_only() {
        let s = compound(
            Side::Source,
            &[1, 1, 2, 3, 3],
            &["a", "b", "a", "a", "b"],
            &[1, 2, 3, 4, 5],
        );
        let t = compound(
            Side::Target,
            &[1, 1, 2, 4, 4],
            &["a", "b", "a", "a", "b"],
            &[1, 2, 3, 4, 5],
        );
        let r = run(&s, &t, &["key1", "key2"]);
        assert_eq!(r.stats.common_pk_rows, 3);
        assert_eq!(r.stats.only_source_rows, 2);
        assert_eq!(r.stats.only_target_rows, 2);
        assert_eq!(r.stats.total_matched_rows, 3);
        assert_close(r.stats.final_diff_score, 20.0);
    }

    #[test]
    fn test_compound_key_with_duplicates() {
        let s = compound(
            Side::Source,
            &[1, 1, 1, 2],
            &["A", "A", "B", "A"],
            &[10, 20, 30, 40],
        );
        let t = compound(
            Side::Target,
            &[1, 1, 2, 3],
            &["A", "B", "A", "A"],
            &[10, 30, 40, 50],
        );
        let r = run(&s, &t, &["key1", "key2"]);
        assert_eq!(r.stats.dup_source_rows, 1);
        assert_eq!(r.stats.total_matched_rows, 3);
        assert_close(r.stats.final_diff_score, 7.5);
    }

    #[test]
    fn test_compound_duplicate_with_value_mismatch() {
        let s = compound(Side::Source, &[1, 1, 2], &["A", "A", "A"], &[99, 10, 40]);
        let t = compound(Side::Target, &[1, 2], &["A", "A"], &[10, 40]);
        let r = run(&s, &t, &["key1", "key2"]);
        // first source row for (1, A) carries 99
        assert_eq!(r.stats.total_matched_rows, 1);
        assert!(r.stats.final_diff_score > 10.0);
        assert_eq!(r.details.discrepancies_per_col_examples["value"][0].source, num(99));
    }

    #[test]
    fn test_large_sample_with_few_changes() {
        let ids: Vec<i64> = (0..10_000).collect();
        let source_values: Vec<String> = ids.iter().map(|i| format!("v{i}")).collect();
        let target_values: Vec<String> = ids
            .iter()
            .map(|i| {
                if i % 1_000 == 7 && *i < 6_000 {
                    format!("changed{i}")
                } else {
                    format!("v{i}")
                }
            })
            .collect();
        let s_refs: Vec<&str> = source_values.iter().map(String::as_str).collect();
        let t_refs: Vec<&str> = target_values.iter().map(String::as_str).collect();

        let r = run(
            &keyed(Side::Source, &ids, &s_refs),
            &keyed(Side::Target, &ids, &t_refs),
            &["id"],
        );
        assert_eq!(r.stats.mismatched_rows(), 6);
        assert_close(r.stats.final_diff_score, 0.03);
        assert_eq!(r.details.mismatches_per_column["value"], 6);
        assert_eq!(r.details.example_count(), DEFAULT_MAX_EXAMPLES);
    }

    #[test]
    fn test_both_empty_is_none() {
        let s = set(Side::Source, &["id"], vec![]);
        let t = set(Side::Target, &["id"], vec![]);
        let r = reconcile(&s, &t, &keys(&["id"]), &ReconcileOptions::default()).unwrap();
        assert!(r.is_none());
    }

    #[test]
    fn test_one_empty_side_is_fully_one_sided() {
        let s = keyed(Side::Source, &[1, 2], &["a", "b"]);
        let t = set(Side::Target, &[], vec![]);
        let r = run(&s, &t, &["id"]);
        assert_eq!(r.stats.only_source_rows, 2);
        assert_eq!(r.stats.final_diff_score, 100.0);
    }

    #[test]
    fn test_missing_key_column_is_error() {
        let s = keyed(Side::Source, &[1], &["a"]);
        let t = set(Side::Target, &["value"], vec![vec![text("a")]]);
        let err = reconcile(&s, &t, &keys(&["id"]), &ReconcileOptions::default()).unwrap_err();
        match err {
            ReconError::MissingKeyColumn { side, column, .. } => {
                assert_eq!(side, Side::Target);
                assert_eq!(column, "id");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_excluded_column_not_compared() {
        let s = keyed(Side::Source, &[1], &["a"]);
        let t = keyed(Side::Target, &[1], &["b"]);
        let options = ReconcileOptions {
            selection: ColumnSelection::new(Vec::<String>::new(), ["VALUE"]),
            ..Default::default()
        };
        let r = reconcile(&s, &t, &keys(&["id"]), &options).unwrap().unwrap();
        assert_eq!(r.stats.final_diff_score, 0.0);
    }

    #[test]
    fn test_null_equals_null() {
        let s = set(Side::Source, &["id", "v"], vec![vec![num(1), CanonicalValue::Null]]);
        let t = set(Side::Target, &["id", "v"], vec![vec![num(1), CanonicalValue::Null]]);
        assert_eq!(run(&s, &t, &["id"]).stats.total_matched_rows, 1);
    }
}
