//! Canonical value normalizer.
//!
//! Turns a fetched [`RowSet`] into a [`NormalizedRowSet`]: every cell is
//! passed through the side's [`Dialect`] with the hint derived from the
//! column's declared type. A value that cannot be interpreted is a hard
//! error carrying the dialect, column, raw value and row.

pub mod harmonize;
pub mod numeric;
pub mod temporal;

use tracing::debug;

use crate::core::schema::RowSet;
use crate::core::traits::Dialect;
use crate::core::value::RawValue;
use crate::dialect::canonical::{CanonicalValue, NormalizeResult, TypeHint};
use crate::error::{ReconError, Result, Side};

pub use harmonize::{plan_columns, ColumnPlan, ColumnSelection, ComparePlan, KeyColumn};

/// Normalization switches that apply to both sides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Fold whitespace-only text to the null sentinel.
    pub treat_blank_as_null: bool,
}

/// Per-column tally of canonical value kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnProfile {
    pub nulls: usize,
    pub bools: usize,
    pub numbers: usize,
    pub texts: usize,
    pub instants: usize,
    pub naives: usize,
    pub times: usize,
}

impl ColumnProfile {
    fn record(&mut self, value: &CanonicalValue) {
        match value {
            CanonicalValue::Null => self.nulls += 1,
            CanonicalValue::Bool(_) => self.bools += 1,
            CanonicalValue::Number(_) => self.numbers += 1,
            CanonicalValue::Text(_) => self.texts += 1,
            CanonicalValue::Instant(_) => self.instants += 1,
            CanonicalValue::Naive(_) => self.naives += 1,
            CanonicalValue::Time(_) => self.times += 1,
        }
    }

    pub fn non_null(&self) -> usize {
        self.bools + self.numbers + self.texts + self.instants + self.naives + self.times
    }
}

/// Rows of one side after normalization.
#[derive(Debug, Clone)]
pub struct NormalizedRowSet {
    side: Side,
    dialect: String,
    columns: Vec<String>,
    hints: Vec<TypeHint>,
    profiles: Vec<ColumnProfile>,
    rows: Vec<Vec<CanonicalValue>>,
}

impl NormalizedRowSet {
    /// Assemble a normalized row set; column names are expected lower-case.
    pub fn new(
        side: Side,
        dialect: impl Into<String>,
        columns: Vec<String>,
        hints: Vec<TypeHint>,
        rows: Vec<Vec<CanonicalValue>>,
    ) -> Self {
        let mut hints = hints;
        hints.resize(columns.len(), TypeHint::Unknown);
        let profiles = profile_rows(columns.len(), &rows);
        Self {
            side,
            dialect: dialect.into(),
            columns,
            hints,
            profiles,
            rows,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn dialect(&self) -> &str {
        &self.dialect
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn hint(&self, idx: usize) -> &TypeHint {
        &self.hints[idx]
    }

    pub fn profile(&self, idx: usize) -> &ColumnProfile {
        &self.profiles[idx]
    }

    pub fn rows(&self) -> &[Vec<CanonicalValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when the side produced neither rows nor column metadata.
    pub fn is_blank(&self) -> bool {
        self.rows.is_empty() && self.columns.is_empty()
    }

    /// Remove a column, returning its values in row order.
    pub fn remove_column(&mut self, name: &str) -> Option<Vec<CanonicalValue>> {
        let idx = self.column_index(name)?;
        self.columns.remove(idx);
        self.hints.remove(idx);
        self.profiles.remove(idx);
        Some(self.rows.iter_mut().map(|row| row.remove(idx)).collect())
    }

    /// Keep only the rows for which `keep(row_index)` returns true.
    pub fn retain_rows<F: FnMut(usize) -> bool>(&mut self, mut keep: F) {
        let mut i = 0;
        self.rows.retain(|_| {
            let k = keep(i);
            i += 1;
            k
        });
        self.profiles = profile_rows(self.columns.len(), &self.rows);
    }
}

fn profile_rows(width: usize, rows: &[Vec<CanonicalValue>]) -> Vec<ColumnProfile> {
    let mut profiles = vec![ColumnProfile::default(); width];
    for row in rows {
        for (profile, value) in profiles.iter_mut().zip(row) {
            profile.record(value);
        }
    }
    profiles
}

/// Normalizes one side's row set through its dialect.
pub struct Normalizer<'a> {
    side: Side,
    dialect: &'a dyn Dialect,
    options: NormalizeOptions,
}

impl<'a> Normalizer<'a> {
    pub fn new(side: Side, dialect: &'a dyn Dialect, options: NormalizeOptions) -> Self {
        Self {
            side,
            dialect,
            options,
        }
    }

    /// Hints for each column of `rows`, from declared types.
    pub fn hints_for(&self, rows: &RowSet) -> Vec<TypeHint> {
        rows.columns()
            .iter()
            .map(|c| match c.declared_type.as_deref() {
                Some(declared) => self.dialect.type_hint(declared),
                None => TypeHint::Unknown,
            })
            .collect()
    }

    /// Normalize every cell. `key_columns` only serve to describe the
    /// offending row in errors.
    pub fn normalize(&self, rows: &RowSet, key_columns: &[String]) -> Result<NormalizedRowSet> {
        let hints = self.hints_for(rows);
        let key_idx: Vec<usize> = key_columns
            .iter()
            .filter_map(|k| rows.column_index(k))
            .collect();
        let describe_by_key = !key_idx.is_empty() && key_idx.len() == key_columns.len();

        let mut out = Vec::with_capacity(rows.len());
        for (ordinal, row) in rows.rows().iter().enumerate() {
            let mut values = Vec::with_capacity(row.len());
            for (col, raw) in row.iter().enumerate() {
                let value = self.normalize_cell(raw, &hints[col]).map_err(|reason| {
                    ReconError::Normalization {
                        side: self.side,
                        dialect: self.dialect.name().to_string(),
                        column: rows.columns()[col].name.clone(),
                        value: raw.render(),
                        row: if describe_by_key {
                            describe_key(rows, row, &key_idx)
                        } else {
                            format!("#{}", ordinal + 1)
                        },
                        reason,
                    }
                })?;
                values.push(value);
            }
            out.push(values);
        }

        debug!(
            "Normalized {} {} rows x {} columns ({})",
            out.len(),
            self.side,
            rows.columns().len(),
            self.dialect.name()
        );

        Ok(NormalizedRowSet::new(
            self.side,
            self.dialect.name(),
            rows.column_names(),
            hints,
            out,
        ))
    }

    fn normalize_cell(&self, raw: &RawValue, hint: &TypeHint) -> NormalizeResult {
        if self.options.treat_blank_as_null {
            if let RawValue::Text(s) = raw {
                if s.trim().is_empty() {
                    return Ok(CanonicalValue::Null);
                }
            }
        }
        self.dialect.normalize(raw, hint)
    }
}

fn describe_key(rows: &RowSet, row: &[RawValue], key_idx: &[usize]) -> String {
    key_idx
        .iter()
        .map(|&i| format!("{}={}", rows.columns()[i].name, row[i]))
        .collect::<Vec<_>>()
        .join(", ")
}
