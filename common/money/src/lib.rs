use bigdecimal::BigDecimal;
use bigdecimal::ToPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minor units per major currency unit (paise per rupee).
pub const MINOR_UNITS_PER_MAJOR: i64 = 100;

/// Normalize a monetary value to 2 decimal places (banker's rounding not applied; BigDecimal uses plain truncation when reducing scale)
pub fn normalize_scale(value: &BigDecimal) -> BigDecimal {
    // Set scale to 2 using with_scale, which truncates/extends with zeros.
    value.with_scale(2)
}

/// Compare two monetary values allowing a tolerance (in minor units) after normalization.
pub fn nearly_equal(a: &BigDecimal, b: &BigDecimal, minor_units_tolerance: i64) -> bool {
    let na = normalize_scale(a);
    let nb = normalize_scale(b);
    // Convert difference to an integer minor-unit count to avoid floating comparison.
    let diff = (na - nb).with_scale(2);
    let minor = diff.to_f64().unwrap_or(0.0) * MINOR_UNITS_PER_MAJOR as f64;
    minor.abs() <= minor_units_tolerance as f64
}

/// Convert a major-unit amount to gateway minor units (x100).
///
/// Sub-minor-unit precision is truncated during normalization, matching the
/// gateway's integer-paise convention.
pub fn to_minor_units(value: &BigDecimal) -> Option<i64> {
    (normalize_scale(value) * BigDecimal::from(MINOR_UNITS_PER_MAJOR))
        .with_scale(0)
        .to_i64()
}

pub fn is_negative(value: &BigDecimal) -> bool {
    value < &BigDecimal::from(0)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BreakdownError {
    #[error("monetary field '{0}' must be non-negative")]
    Negative(&'static str),
    #[error("grand total does not match the itemized breakdown (expected {expected})")]
    TotalMismatch { expected: String },
}

/// Price breakdown captured at checkout. Validated once at order creation
/// and never recomputed afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceBreakdown {
    pub items_total: BigDecimal,
    pub tax_total: BigDecimal,
    pub shipping_total: BigDecimal,
    pub discount_total: BigDecimal,
    pub grand_total: BigDecimal,
}

impl PriceBreakdown {
    /// Enforce `grand_total == items_total + tax_total + shipping_total - discount_total`
    /// within one minor unit, and non-negativity of every field.
    pub fn validate(&self) -> Result<(), BreakdownError> {
        for (name, value) in [
            ("items_total", &self.items_total),
            ("tax_total", &self.tax_total),
            ("shipping_total", &self.shipping_total),
            ("discount_total", &self.discount_total),
            ("grand_total", &self.grand_total),
        ] {
            if is_negative(value) {
                return Err(BreakdownError::Negative(name));
            }
        }

        let expected = &self.items_total + &self.tax_total + &self.shipping_total
            - &self.discount_total;
        if !nearly_equal(&self.grand_total, &expected, 1) {
            return Err(BreakdownError::TotalMismatch {
                expected: normalize_scale(&expected).to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::parse_bytes(s.as_bytes(), 10).unwrap()
    }

    #[test]
    fn test_normalize() {
        let v = dec("12.3456");
        assert_eq!(normalize_scale(&v).to_string(), "12.34");
    }

    #[test]
    fn test_nearly_equal() {
        let a = dec("10.001");
        let b = dec("10.009");
        assert!(nearly_equal(&a, &b, 1)); // 1 minor unit tolerance
        assert!(!nearly_equal(&dec("10.00"), &dec("10.05"), 1));
    }

    #[test]
    fn minor_units_for_whole_and_fractional_amounts() {
        assert_eq!(to_minor_units(&dec("499.00")), Some(49900));
        assert_eq!(to_minor_units(&dec("499")), Some(49900));
        assert_eq!(to_minor_units(&dec("0.50")), Some(50));
        assert_eq!(to_minor_units(&dec("1")), Some(100));
    }

    fn breakdown(items: &str, tax: &str, shipping: &str, discount: &str, grand: &str) -> PriceBreakdown {
        PriceBreakdown {
            items_total: dec(items),
            tax_total: dec(tax),
            shipping_total: dec(shipping),
            discount_total: dec(discount),
            grand_total: dec(grand),
        }
    }

    #[test]
    fn breakdown_accepts_consistent_totals() {
        let b = breakdown("100.00", "18.00", "40.00", "10.00", "148.00");
        assert_eq!(b.validate(), Ok(()));
    }

    #[test]
    fn breakdown_tolerates_one_minor_unit_of_rounding() {
        let b = breakdown("100.00", "18.00", "40.00", "10.00", "148.01");
        assert_eq!(b.validate(), Ok(()));
    }

    #[test]
    fn breakdown_rejects_mismatched_grand_total() {
        let b = breakdown("100.00", "18.00", "40.00", "10.00", "150.00");
        assert!(matches!(b.validate(), Err(BreakdownError::TotalMismatch { .. })));
    }

    #[test]
    fn breakdown_rejects_negative_fields() {
        let b = breakdown("100.00", "-1.00", "0.00", "0.00", "99.00");
        assert_eq!(b.validate(), Err(BreakdownError::Negative("tax_total")));
    }
}
