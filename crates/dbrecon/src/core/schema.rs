//! Table references and result-set shapes.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::identifier::normalize_column_name;
use crate::core::value::RawValue;
use crate::error::{ReconError, Result, Side};

/// A table (or view) addressed by name and schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    /// Table or view name.
    pub name: String,
    /// Schema (Oracle owner, PostgreSQL schema, ClickHouse database).
    pub schema: String,
}

impl TableRef {
    pub fn new(name: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
        }
    }

    /// `schema.name` for log lines and reports.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// Column metadata of a fetched result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    /// Column name (lower-cased once the column enters a [`RowSet`]).
    pub name: String,
    /// Declared database type as reported by the driver, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_type: Option<String>,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: None,
        }
    }

    pub fn typed(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: Some(declared_type.into()),
        }
    }
}

/// Rows fetched from one side, aligned to an ordered column list.
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    columns: Vec<ColumnMeta>,
    rows: Vec<Vec<RawValue>>,
}

impl RowSet {
    /// Build a row set, lower-casing column names.
    ///
    /// Rows shorter than the column list are padded with NULL; longer rows
    /// are rejected as a configuration error.
    pub fn new(side: Side, columns: Vec<ColumnMeta>, rows: Vec<Vec<RawValue>>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(columns.len());
        let mut normalized = Vec::with_capacity(columns.len());
        for mut col in columns {
            col.name = normalize_column_name(&col.name);
            if !seen.insert(col.name.clone()) {
                return Err(ReconError::DuplicateColumn {
                    side,
                    column: col.name,
                });
            }
            normalized.push(col);
        }

        let width = normalized.len();
        let mut rows = rows;
        for (i, row) in rows.iter_mut().enumerate() {
            if row.len() > width {
                return Err(ReconError::Config(format!(
                    "{} row {} has {} values but only {} columns",
                    side,
                    i,
                    row.len(),
                    width
                )));
            }
            row.resize(width, RawValue::Null);
        }

        Ok(Self {
            columns: normalized,
            rows,
        })
    }

    /// Empty row set with no schema.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn rows(&self) -> &[Vec<RawValue>] {
        &self.rows
    }

    pub fn into_parts(self) -> (Vec<ColumnMeta>, Vec<Vec<RawValue>>) {
        (self.columns, self.rows)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Override the declared type of a column (config-supplied hints).
    pub fn set_declared_type(&mut self, column: &str, declared_type: impl Into<String>) -> bool {
        let column = normalize_column_name(column);
        match self.columns.iter_mut().find(|c| c.name == column) {
            Some(col) => {
                col.declared_type = Some(declared_type.into());
                true
            }
            None => false,
        }
    }

    /// Build a row set from JSON objects (one object per row).
    ///
    /// Column order follows first appearance across the objects; keys missing
    /// from a later object become NULL.
    pub fn from_json_objects(side: Side, objects: &[serde_json::Value]) -> Result<Self> {
        let mut names: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for obj in objects {
            let map = obj.as_object().ok_or_else(|| {
                ReconError::Config(format!("{} rows must be JSON objects, got {}", side, obj))
            })?;
            for key in map.keys() {
                if seen.insert(key.clone()) {
                    names.push(key.clone());
                }
            }
        }

        let rows = objects
            .iter()
            .filter_map(|obj| obj.as_object())
            .map(|map| {
                names
                    .iter()
                    .map(|n| map.get(n).map_or(RawValue::Null, RawValue::from))
                    .collect()
            })
            .collect();

        Self::new(side, names.into_iter().map(ColumnMeta::new).collect(), rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_set_lowercases_columns() {
        let rs = RowSet::new(
            Side::Source,
            vec![ColumnMeta::new("ID"), ColumnMeta::typed("Created_At", "DATE")],
            vec![vec![RawValue::Int(1), RawValue::Null]],
        )
        .unwrap();
        assert_eq!(rs.column_names(), vec!["id", "created_at"]);
        assert_eq!(rs.column_index("created_at"), Some(1));
    }

    #[test]
    fn test_row_set_rejects_case_duplicates() {
        let err = RowSet::new(
            Side::Target,
            vec![ColumnMeta::new("Name"), ColumnMeta::new("NAME")],
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, ReconError::DuplicateColumn { side: Side::Target, .. }));
    }

    #[test]
    fn test_row_set_pads_short_rows() {
        let rs = RowSet::new(
            Side::Source,
            vec![ColumnMeta::new("a"), ColumnMeta::new("b")],
            vec![vec![RawValue::Int(1)]],
        )
        .unwrap();
        assert_eq!(rs.rows()[0], vec![RawValue::Int(1), RawValue::Null]);
    }

    #[test]
    fn test_from_json_objects_unions_keys() {
        let rows = vec![json!({"id": 1, "name": "a"}), json!({"id": 2, "extra": true})];
        let rs = RowSet::from_json_objects(Side::Source, &rows).unwrap();
        assert_eq!(rs.column_names(), vec!["id", "name", "extra"]);
        assert_eq!(rs.rows()[1][1], RawValue::Null);
        assert_eq!(rs.rows()[1][2], RawValue::Bool(true));
    }

    #[test]
    fn test_set_declared_type_is_case_insensitive() {
        let mut rs = RowSet::new(Side::Source, vec![ColumnMeta::new("TS")], vec![]).unwrap();
        assert!(rs.set_declared_type("Ts", "timestamptz"));
        assert_eq!(rs.columns()[0].declared_type.as_deref(), Some("timestamptz"));
        assert!(!rs.set_declared_type("missing", "text"));
    }

    #[test]
    fn test_table_ref_full_name() {
        assert_eq!(TableRef::new("orders", "sales").full_name(), "sales.orders");
    }
}
