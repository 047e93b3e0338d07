//! Exclusion of rows flagged as recently changed.

use std::collections::HashSet;

use tracing::info;

use crate::core::traits::RECENT_FLAG_COLUMN;
use crate::dialect::canonical::CanonicalValue;
use crate::normalize::NormalizedRowSet;

/// Drop the recency flag column from both sides and remove every key that
/// is flagged on either side from both. Returns the number of keys removed.
pub fn exclude_recently_changed(
    source: &mut NormalizedRowSet,
    target: &mut NormalizedRowSet,
    key_columns: &[String],
) -> usize {
    let source_flags = source.remove_column(RECENT_FLAG_COLUMN);
    let target_flags = target.remove_column(RECENT_FLAG_COLUMN);
    if source_flags.is_none() && target_flags.is_none() {
        return 0;
    }

    let mut flagged: HashSet<Vec<CanonicalValue>> = HashSet::new();
    collect_flagged(source, source_flags.as_deref(), key_columns, &mut flagged);
    collect_flagged(target, target_flags.as_deref(), key_columns, &mut flagged);
    if flagged.is_empty() {
        return 0;
    }

    let before = (source.len(), target.len());
    drop_keys(source, key_columns, &flagged);
    drop_keys(target, key_columns, &flagged);

    info!(
        "Excluded {} recently changed keys ({} source rows, {} target rows)",
        flagged.len(),
        before.0 - source.len(),
        before.1 - target.len()
    );
    flagged.len()
}

fn key_indexes(set: &NormalizedRowSet, key_columns: &[String]) -> Option<Vec<usize>> {
    key_columns.iter().map(|k| set.column_index(k)).collect()
}

fn key_of(row: &[CanonicalValue], idx: &[usize]) -> Vec<CanonicalValue> {
    idx.iter().map(|&i| row[i].clone()).collect()
}

fn collect_flagged(
    set: &NormalizedRowSet,
    flags: Option<&[CanonicalValue]>,
    key_columns: &[String],
    flagged: &mut HashSet<Vec<CanonicalValue>>,
) {
    let (Some(flags), Some(idx)) = (flags, key_indexes(set, key_columns)) else {
        return;
    };
    for (row, flag) in set.rows().iter().zip(flags) {
        if flag.as_bool_like() == Some(true) {
            flagged.insert(key_of(row, &idx));
        }
    }
}

fn drop_keys(
    set: &mut NormalizedRowSet,
    key_columns: &[String],
    flagged: &HashSet<Vec<CanonicalValue>>,
) {
    let Some(idx) = key_indexes(set, key_columns) else {
        return;
    };
    let keep: Vec<bool> = set
        .rows()
        .iter()
        .map(|row| !flagged.contains(&key_of(row, &idx)))
        .collect();
    set.retain_rows(|i| keep[i]);
}
