//! ClickHouse driver.
//!
//! - [`ClickHouseDialect`]: SQL fragments and type hints for ClickHouse

mod dialect;

pub use dialect::ClickHouseDialect;
