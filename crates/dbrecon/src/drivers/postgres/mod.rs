//! PostgreSQL driver.
//!
//! - [`PostgresDialect`]: SQL fragments and type hints for PostgreSQL

mod dialect;

pub use dialect::PostgresDialect;
