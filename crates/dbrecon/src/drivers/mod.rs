//! Database dialect implementations.
//!
//! - [`oracle`]: Oracle Database
//! - [`postgres`]: PostgreSQL
//! - [`clickhouse`]: ClickHouse
//!
//! # Adding New Databases
//!
//! 1. Create a new module under `drivers/` (e.g., `drivers/mysql/`)
//! 2. Implement the [`Dialect`](crate::core::Dialect) trait, overriding
//!    `type_hint` / `normalize` where the engine's type system differs
//! 3. Register it in [`DialectCatalog::with_builtins()`](crate::core::DialectCatalog::with_builtins)

pub mod clickhouse;
pub mod oracle;
pub mod postgres;

pub use clickhouse::ClickHouseDialect;
pub use oracle::OracleDialect;
pub use postgres::PostgresDialect;
