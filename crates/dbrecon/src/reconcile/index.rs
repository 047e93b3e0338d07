//! Key index over one side's rows.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

use crate::dialect::canonical::CanonicalValue;

/// Canonical key of a row; compound keys are ordered tuples.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key(pub Vec<CanonicalValue>);

impl Key {
    pub fn values(&self) -> &[CanonicalValue] {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        KeyDisplay(&self.0).fmt(f)
    }
}

/// Key parts rendered for reports: `1` or `(1, A)`.
#[derive(Debug, Clone, Copy)]
pub struct KeyDisplay<'a>(pub &'a [CanonicalValue]);

impl fmt::Display for KeyDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            [single] => write!(f, "{}", single),
            parts => {
                write!(f, "(")?;
                for (i, p) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// All rows sharing one key. Only the first row is compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyGroup {
    pub key: Key,
    pub first_row: usize,
    pub size: usize,
}

/// Key groups in first-occurrence order with constant-time lookup.
#[derive(Debug, Default)]
pub struct RowIndex {
    lookup: HashMap<Key, usize>,
    groups: Vec<KeyGroup>,
    total_rows: usize,
}

impl RowIndex {
    pub fn build<F>(rows: &[Vec<CanonicalValue>], key_of: F) -> Self
    where
        F: Fn(&[CanonicalValue]) -> Key,
    {
        let mut lookup: HashMap<Key, usize> = HashMap::with_capacity(rows.len());
        let mut groups: Vec<KeyGroup> = Vec::new();

        for (i, row) in rows.iter().enumerate() {
            match lookup.entry(key_of(row)) {
                Entry::Occupied(e) => groups[*e.get()].size += 1,
                Entry::Vacant(v) => {
                    groups.push(KeyGroup {
                        key: v.key().clone(),
                        first_row: i,
                        size: 1,
                    });
                    v.insert(groups.len() - 1);
                }
            }
        }

        Self {
            lookup,
            groups,
            total_rows: rows.len(),
        }
    }

    pub fn get(&self, key: &Key) -> Option<&KeyGroup> {
        self.lookup.get(key).map(|&i| &self.groups[i])
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.lookup.contains_key(key)
    }

    pub fn groups(&self) -> &[KeyGroup] {
        &self.groups
    }

    pub fn distinct_key_count(&self) -> usize {
        self.groups.len()
    }

    pub fn total_row_count(&self) -> usize {
        self.total_rows
    }

    /// Rows beyond the first occurrence of their key.
    pub fn duplicate_row_count(&self) -> usize {
        self.total_rows - self.groups.len()
    }
}
