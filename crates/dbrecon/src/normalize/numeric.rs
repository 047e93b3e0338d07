//! Numeric representation rules.
//!
//! All numbers end up as an exact [`Decimal`] so that `10.50`, `10.5` and
//! the float `10.5` compare equal. There is no epsilon.

use std::str::FromStr;

use rust_decimal::Decimal;

/// Parse numeric text (plain or scientific notation).
pub fn parse_decimal(s: &str) -> Result<Decimal, String> {
    let trimmed = s.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| format!("{:?} is not a number", s))
}

/// Convert a float through its shortest round-trip rendering.
///
/// Returns `None` for non-finite values and for magnitudes a `Decimal`
/// cannot hold exactly; callers fall back to the textual rendering.
pub fn decimal_from_f64(f: f64) -> Option<Decimal> {
    if !f.is_finite() {
        return None;
    }
    let rendered = f.to_string();
    let d = Decimal::from_str(&rendered)
        .ok()
        .or_else(|| Decimal::from_scientific(&format!("{:e}", f)).ok())?;
    // Underflowed to zero: keep the textual form instead of claiming 0.
    if d.is_zero() && f != 0.0 {
        return None;
    }
    Some(d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal_plain_and_scientific() {
        assert_eq!(parse_decimal(" 1.2300 ").unwrap().normalize().to_string(), "1.23");
        assert_eq!(parse_decimal("1.5e3").unwrap().normalize().to_string(), "1500");
        assert!(parse_decimal("abc").is_err());
    }

    #[test]
    fn test_float_shortest_rendering() {
        assert_eq!(decimal_from_f64(0.1).unwrap().to_string(), "0.1");
        assert_eq!(decimal_from_f64(-2.5).unwrap().to_string(), "-2.5");
        assert_eq!(decimal_from_f64(0.0).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_float_out_of_range() {
        assert!(decimal_from_f64(f64::NAN).is_none());
        assert!(decimal_from_f64(f64::INFINITY).is_none());
        assert!(decimal_from_f64(1e300).is_none());
    }
}
