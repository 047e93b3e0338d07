//! Oracle driver.
//!
//! - [`OracleDialect`]: SQL fragments and type hints for Oracle Database

mod dialect;

pub use dialect::OracleDialect;
