//! Canonical values and normalization hints.
//!
//! Dialects translate declared column types into a [`TypeHint`] and raw
//! cells into a [`CanonicalValue`]; everything downstream compares only
//! canonical values.

pub mod canonical;

pub use canonical::{
    generic_type_hint, normalize_with_hint, parse_bool_flag, CanonicalValue, NormalizeResult,
    TypeHint, NULL_MARKER,
};
