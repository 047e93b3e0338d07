//! Dialect catalog for explicit dependency injection.
//!
//! The [`DialectCatalog`] maps dialect names from configuration to
//! implementations. It is constructed explicitly and handed to the
//! comparator, so tests can register their own dialects.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ReconError, Result};

use super::traits::Dialect;

/// Registry of database dialects by name.
#[derive(Default, Clone)]
pub struct DialectCatalog {
    dialects: HashMap<String, Arc<dyn Dialect>>,
}

impl DialectCatalog {
    /// Create a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog with the built-in dialects registered.
    ///
    /// `postgresql` is accepted as an alias of `postgres`.
    pub fn with_builtins() -> Self {
        use crate::drivers::{ClickHouseDialect, OracleDialect, PostgresDialect};

        let mut catalog = Self::new();
        catalog.register_dialect("oracle", OracleDialect::new());
        catalog.register_dialect("clickhouse", ClickHouseDialect::new());

        let postgres: Arc<dyn Dialect> = Arc::new(PostgresDialect::new());
        catalog.register_dialect_arc("postgres", postgres.clone());
        catalog.register_dialect_arc("postgresql", postgres);

        catalog
    }

    /// Register a dialect by name (case-insensitive).
    pub fn register_dialect(&mut self, name: impl Into<String>, dialect: impl Dialect + 'static) {
        self.register_dialect_arc(name, Arc::new(dialect));
    }

    /// Register a dialect as an Arc (for sharing).
    pub fn register_dialect_arc(&mut self, name: impl Into<String>, dialect: Arc<dyn Dialect>) {
        self.dialects.insert(name.into().to_lowercase(), dialect);
    }

    /// Get a dialect by name.
    pub fn get_dialect(&self, name: &str) -> Option<Arc<dyn Dialect>> {
        self.dialects.get(&name.trim().to_lowercase()).cloned()
    }

    /// Get a dialect by name, returning an error if not found.
    pub fn require_dialect(&self, name: &str) -> Result<Arc<dyn Dialect>> {
        self.get_dialect(name).ok_or_else(|| {
            ReconError::Config(format!(
                "Unknown database dialect: {} (known: {})",
                name,
                self.dialect_names().join(", ")
            ))
        })
    }

    /// Check if a dialect is registered.
    pub fn has_dialect(&self, name: &str) -> bool {
        self.get_dialect(name).is_some()
    }

    /// Registered names, sorted.
    pub fn dialect_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.dialects.keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for DialectCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialectCatalog")
            .field("dialects", &self.dialect_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::PostgresDialect;

    #[test]
    fn test_builtins_registered() {
        let catalog = DialectCatalog::with_builtins();
        assert!(catalog.has_dialect("oracle"));
        assert!(catalog.has_dialect("clickhouse"));
        assert_eq!(catalog.require_dialect("PostgreSQL").unwrap().name(), "postgres");
    }

    #[test]
    fn test_unknown_dialect_lists_known() {
        let catalog = DialectCatalog::with_builtins();
        let err = catalog.require_dialect("mssql").err().unwrap();
        let msg = err.to_string();
        assert!(msg.contains("Unknown database dialect: mssql"));
        assert!(msg.contains("clickhouse, oracle, postgres, postgresql"));
    }

    #[test]
    fn test_register_custom_name() {
        let mut catalog = DialectCatalog::new();
        catalog.register_dialect("Greenplum", PostgresDialect::new());
        assert!(catalog.has_dialect("greenplum"));
    }
}
