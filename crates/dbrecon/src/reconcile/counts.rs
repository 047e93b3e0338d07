//! Per-day row count comparison.
//!
//! Each side reports `(dt, cnt)` rows. Days missing on one side count as
//! zero there. For every day the smaller count is common, the surplus is
//! side-only; these feed the same scoring model as keyed comparison.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use chrono_tz::Tz;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use crate::dialect::canonical::CanonicalValue;
use crate::error::{ReconError, Result};
use crate::normalize::NormalizedRowSet;

use super::engine::Reconciliation;
use super::types::{ComparisonDiffDetails, ComparisonStats, MismatchExample, RowCounts};

pub const DAY_COLUMN: &str = "dt";
pub const COUNT_COLUMN: &str = "cnt";

/// Pseudo column under which differing days are reported.
pub const ROW_COUNT_COLUMN: &str = "row_count";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub day: NaiveDate,
    pub count: u64,
}

fn invalid_value(
    set: &NormalizedRowSet,
    ordinal: usize,
    column: &str,
    value: &CanonicalValue,
    reason: &str,
) -> ReconError {
    ReconError::Normalization {
        side: set.side(),
        dialect: set.dialect().to_string(),
        column: column.to_string(),
        value: value.to_string(),
        row: format!("#{}", ordinal + 1),
        reason: reason.to_string(),
    }
}

fn require_column(set: &NormalizedRowSet, column: &str) -> Result<usize> {
    set.column_index(column)
        .ok_or_else(|| ReconError::missing_key(set.side(), column, set.columns()))
}

/// Day to row count for one side's `(dt, cnt)` rows. Instants are bucketed
/// in `reference_tz`; days repeated after bucketing are summed.
pub fn daily_counts(set: &NormalizedRowSet, reference_tz: Tz) -> Result<BTreeMap<NaiveDate, u64>> {
    let mut out = BTreeMap::new();
    if set.is_blank() {
        return Ok(out);
    }
    let day_idx = require_column(set, DAY_COLUMN)?;
    let count_idx = require_column(set, COUNT_COLUMN)?;

    for (ordinal, row) in set.rows().iter().enumerate() {
        let day_value = &row[day_idx];
        let day = bucket_day(day_value, reference_tz)
            .ok_or_else(|| invalid_value(set, ordinal, DAY_COLUMN, day_value, "not a date"))?;

        let count_value = &row[count_idx];
        let count = match count_value {
            CanonicalValue::Number(n) => n.to_u64(),
            CanonicalValue::Text(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        }
        .ok_or_else(|| {
            invalid_value(set, ordinal, COUNT_COLUMN, count_value, "not a non-negative count")
        })?;

        *out.entry(day).or_insert(0) += count;
    }
    Ok(out)
}

/// Count rows per day of `date_column`, for sides fetched as plain rows.
pub fn daily_counts_by_column(
    set: &NormalizedRowSet,
    date_column: &str,
    reference_tz: Tz,
) -> Result<BTreeMap<NaiveDate, u64>> {
    let mut out = BTreeMap::new();
    if set.is_blank() {
        return Ok(out);
    }
    let idx = require_column(set, date_column)?;
    for (ordinal, row) in set.rows().iter().enumerate() {
        let value = &row[idx];
        let day = bucket_day(value, reference_tz)
            .ok_or_else(|| invalid_value(set, ordinal, date_column, value, "not a date"))?;
        *out.entry(day).or_insert(0) += 1;
    }
    Ok(out)
}

fn bucket_day(value: &CanonicalValue, reference_tz: Tz) -> Option<NaiveDate> {
    match value {
        CanonicalValue::Naive(dt) => Some(dt.date()),
        CanonicalValue::Instant(dt) => Some(dt.with_timezone(&reference_tz).date_naive()),
        CanonicalValue::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok(),
        _ => None,
    }
}

/// Union both sides' days, filling absent days with zero.
pub fn cross_fill(
    source: &BTreeMap<NaiveDate, u64>,
    target: &BTreeMap<NaiveDate, u64>,
) -> (Vec<DailyCount>, Vec<DailyCount>) {
    let mut days: Vec<NaiveDate> = source.keys().chain(target.keys()).copied().collect();
    days.sort_unstable();
    days.dedup();

    let fill = |side: &BTreeMap<NaiveDate, u64>| {
        days.iter()
            .map(|day| DailyCount {
                day: *day,
                count: side.get(day).copied().unwrap_or(0),
            })
            .collect::<Vec<_>>()
    };
    (fill(source), fill(target))
}

/// Compare cross-filled daily counts. `None` when both sides counted no rows.
pub fn reconcile_counts(
    source: &[DailyCount],
    target: &[DailyCount],
    max_examples: usize,
) -> Option<Reconciliation> {
    let total_source: u64 = source.iter().map(|d| d.count).sum();
    let total_target: u64 = target.iter().map(|d| d.count).sum();
    if total_source == 0 && total_target == 0 {
        return None;
    }

    let mut counts = RowCounts {
        total_source_rows: total_source as usize,
        total_target_rows: total_target as usize,
        ..Default::default()
    };
    let mut details = ComparisonDiffDetails::new(max_examples);

    for (s, t) in source.iter().zip(target) {
        let common = s.count.min(t.count);
        counts.common_pk_rows += common as usize;
        counts.only_source_rows += (s.count - common) as usize;
        counts.only_target_rows += (t.count - common) as usize;
        if s.count != t.count {
            details.record(ROW_COUNT_COLUMN, || MismatchExample {
                key: vec![CanonicalValue::Text(s.day.format("%Y-%m-%d").to_string())],
                source: CanonicalValue::number(Decimal::from(s.count)),
                target: CanonicalValue::number(Decimal::from(t.count)),
            });
        }
    }
    counts.total_matched_rows = counts.common_pk_rows;

    let stats = ComparisonStats::from_counts(counts);
    info!(
        "Compared daily counts over {} days: {} source / {} target rows, diff score {:.4}",
        source.len(),
        total_source,
        total_target,
        stats.final_diff_score
    );
    Some(Reconciliation { stats, details })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Side;
    use chrono::{TimeZone, Utc};

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn naive(s: &str) -> CanonicalValue {
        CanonicalValue::Naive(day(s).and_hms_opt(0, 0, 0).unwrap())
    }

    fn set(side: Side, rows: Vec<(CanonicalValue, i64)>) -> NormalizedRowSet {
        NormalizedRowSet::new(
            side,
            "postgres",
            vec!["dt".into(), "cnt".into()],
            vec![],
            rows.into_iter()
                .map(|(d, c)| vec![d, CanonicalValue::number(Decimal::from(c))])
                .collect(),
        )
    }

    #[test]
    fn test_cross_fill_unions_days() {
        let s = daily_counts(
            &set(Side::Source, vec![(naive("2024-01-01"), 10), (naive("2024-01-02"), 20)]),
            Tz::UTC,
        )
        .unwrap();
        let t = daily_counts(
            &set(Side::Target, vec![(naive("2024-01-02"), 15), (naive("2024-01-03"), 25)]),
            Tz::UTC,
        )
        .unwrap();

        let (s, t) = cross_fill(&s, &t);
        assert_eq!(s.len(), 3);
        assert_eq!(t.len(), 3);
        assert_eq!(s.iter().map(|d| d.count).sum::<u64>(), 30);
        assert_eq!(t.iter().map(|d| d.count).sum::<u64>(), 40);
        assert_eq!(s[2], DailyCount { day: day("2024-01-03"), count: 0 });
        assert_eq!(t[0].count, 0);
    }

    #[test]
    fn test_instants_bucketed_in_reference_zone() {
        let late = CanonicalValue::Instant(Utc.with_ymd_and_hms(2024, 1, 1, 23, 30, 0).unwrap());
        let counts = daily_counts(
            &set(Side::Source, vec![(late, 4)]),
            "Europe/Berlin".parse().unwrap(),
        )
        .unwrap();
        assert_eq!(counts.get(&day("2024-01-02")), Some(&4));
    }

    #[test]
    fn test_count_scoring() {
        let s = vec![
            DailyCount { day: day("2024-01-01"), count: 10 },
            DailyCount { day: day("2024-01-02"), count: 20 },
        ];
        let t = vec![
            DailyCount { day: day("2024-01-01"), count: 10 },
            DailyCount { day: day("2024-01-02"), count: 18 },
        ];
        let r = reconcile_counts(&s, &t, 3).unwrap();
        assert_eq!(r.stats.common_pk_rows, 28);
        assert_eq!(r.stats.only_source_rows, 2);
        assert_eq!(r.stats.only_target_rows, 0);
        assert!((r.stats.final_diff_score - 2.0 / 28.0 * 100.0 * 0.15).abs() < 1e-9);
        assert_eq!(r.details.mismatches_per_column[ROW_COUNT_COLUMN], 1);
        let ex = &r.details.discrepancies_per_col_examples[ROW_COUNT_COLUMN][0];
        assert_eq!(ex.key, vec![CanonicalValue::Text("2024-01-02".into())]);
    }

    #[test]
    fn test_counts_by_date_column() {
        let set = NormalizedRowSet::new(
            Side::Source,
            "oracle",
            vec!["id".into(), "created_at".into()],
            vec![],
            vec![
                vec![CanonicalValue::number(Decimal::ONE), naive("2024-01-01")],
                vec![CanonicalValue::number(Decimal::TWO), naive("2024-01-01")],
                vec![CanonicalValue::number(Decimal::TEN), naive("2024-01-03")],
            ],
        );
        let counts = daily_counts_by_column(&set, "created_at", Tz::UTC).unwrap();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[&day("2024-01-01")], 2);
        let err = daily_counts_by_column(&set, "id", Tz::UTC).unwrap_err();
        assert!(err.to_string().contains("not a date"));
    }

    #[test]
    fn test_zero_counts_skip() {
        assert!(reconcile_counts(&[], &[], 3).is_none());
    }

    #[test]
    fn test_negative_count_rejected() {
        let err = daily_counts(&set(Side::Target, vec![(naive("2024-01-01"), -1)]), Tz::UTC)
            .unwrap_err();
        assert!(matches!(err, ReconError::Normalization { .. }));
    }

    #[test]
    fn test_missing_count_column() {
        let set = NormalizedRowSet::new(
            Side::Source,
            "postgres",
            vec!["dt".into()],
            vec![],
            vec![vec![naive("2024-01-01")]],
        );
        assert!(matches!(
            daily_counts(&set, Tz::UTC),
            Err(ReconError::MissingKeyColumn { .. })
        ));
    }
}
