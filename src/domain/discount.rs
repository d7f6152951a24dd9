//! Discount domain entity.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::shared::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscountKind {
    /// Percentage of the subtotal, 0..=100
    Percentage,
    /// Flat amount subtracted from the subtotal
    Fixed,
}

impl std::fmt::Display for DiscountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Percentage => write!(f, "Percentage"),
            Self::Fixed => write!(f, "Fixed"),
        }
    }
}

/// Company-scoped discount applied to a session subtotal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discount {
    pub id: i64,
    pub company_id: i64,
    /// Unique within the company
    pub name: String,
    pub enabled: bool,
    pub kind: DiscountKind,
    pub value: Decimal,
    /// Inclusive validity range; an open side means unbounded
    pub valid_from: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Discount {
    /// Active on a given date: enabled and inside the inclusive range.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        if !self.enabled {
            return false;
        }
        if let Some(from) = self.valid_from {
            if date < from {
                return false;
            }
        }
        if let Some(until) = self.valid_until {
            if date > until {
                return false;
            }
        }
        true
    }

    /// Apply to a subtotal; the result is floored at zero.
    pub fn apply(&self, subtotal: Decimal) -> Decimal {
        let discounted = match self.kind {
            DiscountKind::Percentage => {
                subtotal - subtotal * self.value / Decimal::from(100)
            }
            DiscountKind::Fixed => subtotal - self.value,
        };
        discounted.max(Decimal::ZERO)
    }

    pub fn check_range(&self) -> CoreResult<()> {
        if let (Some(from), Some(until)) = (self.valid_from, self.valid_until) {
            if until < from {
                return Err(CoreError::InvariantViolation(format!(
                    "discount '{}': valid_until precedes valid_from",
                    self.name
                )));
            }
        }
        if self.value < Decimal::ZERO {
            return Err(CoreError::InvariantViolation(format!(
                "discount '{}': negative value",
                self.name
            )));
        }
        if self.kind == DiscountKind::Percentage && self.value > Decimal::from(100) {
            return Err(CoreError::InvariantViolation(format!(
                "discount '{}': percentage above 100",
                self.name
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct NewDiscount {
    pub company_id: i64,
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub kind: DiscountKind,
    pub value: Decimal,
    pub valid_from: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn discount(kind: DiscountKind, value: &str) -> Discount {
        Discount {
            id: 1,
            company_id: 1,
            name: "Promo".into(),
            enabled: true,
            kind,
            value: dec(value),
            valid_from: None,
            valid_until: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn percentage_multiplies_subtotal() {
        let d = discount(DiscountKind::Percentage, "10");
        assert_eq!(d.apply(dec("20.00")), dec("18.00"));
    }

    #[test]
    fn fixed_subtracts_flat_amount() {
        let d = discount(DiscountKind::Fixed, "3.50");
        assert_eq!(d.apply(dec("20.00")), dec("16.50"));
    }

    #[test]
    fn fixed_floors_at_zero() {
        let d = discount(DiscountKind::Fixed, "25.00");
        assert_eq!(d.apply(dec("20.00")), Decimal::ZERO);
    }

    #[test]
    fn validity_range_is_inclusive() {
        let mut d = discount(DiscountKind::Percentage, "5");
        d.valid_from = NaiveDate::from_ymd_opt(2026, 1, 1);
        d.valid_until = NaiveDate::from_ymd_opt(2026, 1, 31);
        assert!(d.is_active_on(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()));
        assert!(d.is_active_on(NaiveDate::from_ymd_opt(2026, 1, 31).unwrap()));
        assert!(!d.is_active_on(NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()));
        assert!(!d.is_active_on(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()));
    }

    #[test]
    fn disabled_discount_is_inactive() {
        let mut d = discount(DiscountKind::Percentage, "5");
        d.enabled = false;
        assert!(!d.is_active_on(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()));
    }

    #[test]
    fn inverted_range_rejected() {
        let mut d = discount(DiscountKind::Percentage, "5");
        d.valid_from = NaiveDate::from_ymd_opt(2026, 2, 1);
        d.valid_until = NaiveDate::from_ymd_opt(2026, 1, 1);
        assert!(d.check_range().is_err());
    }

    #[test]
    fn percentage_above_hundred_rejected() {
        let d = discount(DiscountKind::Percentage, "120");
        assert!(d.check_range().is_err());
    }
}
