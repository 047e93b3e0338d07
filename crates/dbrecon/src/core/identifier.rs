//! Identifier validation, quoting and case normalization.
//!
//! Identifiers (schema, table and column names) cannot be bound as query
//! parameters, so every dialect quotes them through the helpers here. Names
//! coming from configuration are checked with [`validate_identifier`] before
//! any query is built.

use crate::error::{ReconError, Result};

/// Maximum identifier length (conservative limit across databases).
/// - Oracle: 128 bytes (12.2+)
/// - PostgreSQL: 63 bytes
/// - ClickHouse: no hard limit
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate an identifier.
///
/// Rejects empty identifiers, identifiers containing null bytes and
/// identifiers longer than [`MAX_IDENTIFIER_LENGTH`].
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ReconError::Config("Identifier cannot be empty".to_string()));
    }

    if name.contains('\0') {
        return Err(ReconError::Config(format!(
            "Identifier contains null byte: {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ReconError::Config(format!(
            "Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Quote with ANSI double quotes (Oracle, PostgreSQL).
pub fn quote_double(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote with backticks (ClickHouse).
pub fn quote_backtick(name: &str) -> String {
    format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
}

/// Oracle stores unquoted identifiers upper-cased; quoting a lower-case name
/// would make it case-sensitive, so simple names are upper-cased first.
pub fn quote_oracle(name: &str) -> String {
    if is_simple_identifier(name) {
        quote_double(&name.to_uppercase())
    } else {
        quote_double(name)
    }
}

/// `[A-Za-z_][A-Za-z0-9_$#]*`
pub fn is_simple_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '#'))
}

/// Case-normalize a column name the way result sets and key specs store it.
pub fn normalize_column_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Escape a string literal for inline SQL (single quotes doubled).
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
