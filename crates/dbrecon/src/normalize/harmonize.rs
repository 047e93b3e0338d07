//! Cross-side column planning.
//!
//! Decides which columns are compared and how: a column that is boolean on
//! one side and numeric or text on the other has the other side's 0/1 and
//! flag values read as booleans. Untyped text facing a temporal column is
//! parsed as timestamps. A column that is timezone-aware on one side and
//! naive on the other is rejected.

use std::borrow::Cow;
use std::collections::HashSet;

use tracing::warn;

use crate::core::identifier::normalize_column_name;
use crate::core::traits::RECENT_FLAG_COLUMN;
use crate::dialect::canonical::{CanonicalValue, TypeHint};
use crate::error::{ReconError, Result};

use super::temporal::{parse_temporal, ParsedTemporal};
use super::{ColumnProfile, NormalizedRowSet};

/// Which side's values are converted before comparison, and to what.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    None,
    SourceToBool,
    TargetToBool,
    SourceToTemporal,
    TargetToTemporal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Convert {
    Bool,
    Temporal,
}

impl Coercion {
    fn source(self) -> Option<Convert> {
        match self {
            Coercion::SourceToBool => Some(Convert::Bool),
            Coercion::SourceToTemporal => Some(Convert::Temporal),
            _ => None,
        }
    }

    fn target(self) -> Option<Convert> {
        match self {
            Coercion::TargetToBool => Some(Convert::Bool),
            Coercion::TargetToTemporal => Some(Convert::Temporal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Awareness {
    Aware,
    Naive,
}

/// Effective kind of a column on one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Boolean,
    Temporal(Awareness),
    Other,
}

/// Kind from observed values, falling back to the declared hint when the
/// column holds no informative values.
pub fn column_kind(hint: &TypeHint, profile: &ColumnProfile) -> ColumnKind {
    if *hint == TypeHint::Boolean || (profile.bools > 0 && profile.bools == profile.non_null()) {
        return ColumnKind::Boolean;
    }
    if profile.instants > 0 {
        return ColumnKind::Temporal(Awareness::Aware);
    }
    if profile.naives > 0 {
        return ColumnKind::Temporal(Awareness::Naive);
    }
    match hint {
        TypeHint::TimestampTz(_) => ColumnKind::Temporal(Awareness::Aware),
        TypeHint::Timestamp | TypeHint::Date => ColumnKind::Temporal(Awareness::Naive),
        _ => ColumnKind::Other,
    }
}

fn temporal_value(parsed: ParsedTemporal) -> CanonicalValue {
    match parsed {
        ParsedTemporal::Aware(t) => CanonicalValue::Instant(t),
        ParsedTemporal::Naive(t) => CanonicalValue::Naive(t),
    }
}

fn coerce(value: &CanonicalValue, convert: Option<Convert>) -> Cow<'_, CanonicalValue> {
    match (convert, value) {
        (Some(Convert::Bool), CanonicalValue::Bool(_)) => Cow::Borrowed(value),
        (Some(Convert::Bool), _) => match value.as_bool_like() {
            Some(b) => Cow::Owned(CanonicalValue::Bool(b)),
            None => Cow::Borrowed(value),
        },
        (Some(Convert::Temporal), CanonicalValue::Text(s)) => match parse_temporal(s) {
            Ok(parsed) => Cow::Owned(temporal_value(parsed)),
            Err(_) => Cow::Borrowed(value),
        },
        _ => Cow::Borrowed(value),
    }
}

/// A value column compared between sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPlan {
    pub name: String,
    pub source_idx: usize,
    pub target_idx: usize,
    pub coercion: Coercion,
}

impl ColumnPlan {
    pub fn source_value<'r>(&self, row: &'r [CanonicalValue]) -> Cow<'r, CanonicalValue> {
        coerce(&row[self.source_idx], self.coercion.source())
    }

    pub fn target_value<'r>(&self, row: &'r [CanonicalValue]) -> Cow<'r, CanonicalValue> {
        coerce(&row[self.target_idx], self.coercion.target())
    }
}

/// A key column; either index is absent only for a side without schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyColumn {
    pub name: String,
    pub source_idx: Option<usize>,
    pub target_idx: Option<usize>,
    pub coercion: Coercion,
}

impl KeyColumn {
    pub fn source_value(&self, row: &[CanonicalValue]) -> CanonicalValue {
        self.source_idx.map_or(CanonicalValue::Null, |i| {
            coerce(&row[i], self.coercion.source()).into_owned()
        })
    }

    pub fn target_value(&self, row: &[CanonicalValue]) -> CanonicalValue {
        self.target_idx.map_or(CanonicalValue::Null, |i| {
            coerce(&row[i], self.coercion.target()).into_owned()
        })
    }
}

/// Caller restriction of the compared columns (names case-normalized).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSelection {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl ColumnSelection {
    pub fn new<I, E, S, T>(include: I, exclude: E) -> Self
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        Self {
            include: include
                .into_iter()
                .map(|c| normalize_column_name(c.as_ref()))
                .collect(),
            exclude: exclude
                .into_iter()
                .map(|c| normalize_column_name(c.as_ref()))
                .collect(),
        }
    }
}

/// Key and value columns of one comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparePlan {
    pub keys: Vec<KeyColumn>,
    pub values: Vec<ColumnPlan>,
}

fn mixed_awareness(
    column: &str,
    aware: &NormalizedRowSet,
    naive: &NormalizedRowSet,
) -> ReconError {
    ReconError::MixedTimezoneAwareness {
        column: column.to_string(),
        aware_side: aware.side(),
        aware_dialect: aware.dialect().to_string(),
        naive_dialect: naive.dialect().to_string(),
    }
}

/// Awareness of an all-text column read as timestamps.
///
/// Every non-null cell must parse as a timestamp of one awareness.
fn text_awareness(name: &str, set: &NormalizedRowSet, idx: usize) -> Result<Awareness> {
    let mut seen: Option<Awareness> = None;
    for (ordinal, row) in set.rows().iter().enumerate() {
        let CanonicalValue::Text(text) = &row[idx] else {
            continue;
        };
        let awareness = match parse_temporal(text) {
            Ok(ParsedTemporal::Aware(_)) => Awareness::Aware,
            Ok(ParsedTemporal::Naive(_)) => Awareness::Naive,
            Err(reason) => {
                return Err(ReconError::Normalization {
                    side: set.side(),
                    dialect: set.dialect().to_string(),
                    column: name.to_string(),
                    value: format!("{:?}", text),
                    row: format!("#{}", ordinal + 1),
                    reason: format!("{reason}; the other side holds timestamps"),
                })
            }
        };
        match seen {
            Some(prev) if prev != awareness => {
                return Err(ReconError::Normalization {
                    side: set.side(),
                    dialect: set.dialect().to_string(),
                    column: name.to_string(),
                    value: format!("{:?}", text),
                    row: format!("#{}", ordinal + 1),
                    reason: "text timestamps mix zoned and unzoned values".to_string(),
                })
            }
            _ => seen = Some(awareness),
        }
    }
    Ok(seen.unwrap_or(Awareness::Naive))
}

fn all_text(profile: &ColumnProfile) -> bool {
    profile.texts > 0 && profile.texts == profile.non_null()
}

/// Check awareness and choose coercion for a column present on both sides.
fn reconcile_kinds(
    name: &str,
    source: &NormalizedRowSet,
    source_idx: usize,
    target: &NormalizedRowSet,
    target_idx: usize,
) -> Result<Coercion> {
    let sk = column_kind(source.hint(source_idx), source.profile(source_idx));
    let tk = column_kind(target.hint(target_idx), target.profile(target_idx));

    match (sk, tk) {
        (ColumnKind::Temporal(Awareness::Aware), ColumnKind::Temporal(Awareness::Naive)) => {
            Err(mixed_awareness(name, source, target))
        }
        (ColumnKind::Temporal(Awareness::Naive), ColumnKind::Temporal(Awareness::Aware)) => {
            Err(mixed_awareness(name, target, source))
        }
        (ColumnKind::Temporal(aware), ColumnKind::Other)
            if all_text(target.profile(target_idx)) =>
        {
            match (aware, text_awareness(name, target, target_idx)?) {
                (Awareness::Aware, Awareness::Naive) => {
                    Err(mixed_awareness(name, source, target))
                }
                (Awareness::Naive, Awareness::Aware) => {
                    Err(mixed_awareness(name, target, source))
                }
                _ => Ok(Coercion::TargetToTemporal),
            }
        }
        (ColumnKind::Other, ColumnKind::Temporal(aware))
            if all_text(source.profile(source_idx)) =>
        {
            match (text_awareness(name, source, source_idx)?, aware) {
                (Awareness::Aware, Awareness::Naive) => {
                    Err(mixed_awareness(name, source, target))
                }
                (Awareness::Naive, Awareness::Aware) => {
                    Err(mixed_awareness(name, target, source))
                }
                _ => Ok(Coercion::SourceToTemporal),
            }
        }
        (ColumnKind::Boolean, ColumnKind::Boolean) => Ok(Coercion::None),
        (ColumnKind::Boolean, _) => Ok(Coercion::TargetToBool),
        (_, ColumnKind::Boolean) => Ok(Coercion::SourceToBool),
        _ => Ok(Coercion::None),
    }
}

/// Plan the comparison of `source` against `target`.
///
/// Value columns are the caller's include list when given, otherwise the
/// source columns in order; key columns, excluded columns and the recency
/// flag never take part. Columns present on only one side are skipped with
/// a warning.
pub fn plan_columns(
    source: &NormalizedRowSet,
    target: &NormalizedRowSet,
    key_columns: &[String],
    selection: &ColumnSelection,
) -> Result<ComparePlan> {
    let mut keys = Vec::with_capacity(key_columns.len());
    for name in key_columns {
        let source_idx = source.column_index(name);
        let target_idx = target.column_index(name);
        let coercion = match (source_idx, target_idx) {
            (Some(s), Some(t)) => reconcile_kinds(name, source, s, target, t)?,
            _ => Coercion::None,
        };
        keys.push(KeyColumn {
            name: name.clone(),
            source_idx,
            target_idx,
            coercion,
        });
    }

    let skip: HashSet<&str> = key_columns
        .iter()
        .chain(selection.exclude.iter())
        .map(String::as_str)
        .chain(std::iter::once(RECENT_FLAG_COLUMN))
        .collect();

    let candidates: Vec<&String> = if selection.include.is_empty() {
        source.columns().iter().collect()
    } else {
        selection.include.iter().collect()
    };

    let warn_missing = !source.is_blank() && !target.is_blank();
    let mut values = Vec::new();
    for name in candidates {
        if skip.contains(name.as_str()) {
            continue;
        }
        match (source.column_index(name), target.column_index(name)) {
            (Some(s), Some(t)) => {
                let coercion = reconcile_kinds(name, source, s, target, t)?;
                values.push(ColumnPlan {
                    name: name.clone(),
                    source_idx: s,
                    target_idx: t,
                    coercion,
                });
            }
            _ if warn_missing => {
                warn!("Column '{}' is not present on both sides; not compared", name);
            }
            _ => {}
        }
    }

    if warn_missing && selection.include.is_empty() {
        for name in target.columns() {
            if !skip.contains(name.as_str()) && source.column_index(name).is_none() {
                warn!("Column '{}' is not present on both sides; not compared", name);
            }
        }
    }

    Ok(ComparePlan { keys, values })
}
