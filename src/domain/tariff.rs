//! Tariff domain entity and day/night rate windows.

use chrono::{DateTime, NaiveTime, Timelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::shared::{CoreError, CoreResult};

pub const MINUTES_PER_DAY: u32 = 1440;

/// Wall-clock minute-of-day range, half-open `[from, to)`.
/// `from > to` means the window wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TariffWindow {
    pub from: NaiveTime,
    pub to: NaiveTime,
}

impl TariffWindow {
    pub fn new(from: NaiveTime, to: NaiveTime) -> Self {
        Self { from, to }
    }

    fn from_minute(&self) -> u32 {
        self.from.hour() * 60 + self.from.minute()
    }

    fn to_minute(&self) -> u32 {
        self.to.hour() * 60 + self.to.minute()
    }

    /// Whether the given minute-of-day falls inside the window.
    pub fn contains_minute(&self, minute_of_day: u32) -> bool {
        let m = minute_of_day % MINUTES_PER_DAY;
        let from = self.from_minute();
        let to = self.to_minute();
        if from <= to {
            from <= m && m < to
        } else {
            m >= from || m < to
        }
    }

    /// True when any wall-clock minute belongs to both windows.
    pub fn overlaps(&self, other: &TariffWindow) -> bool {
        (0..MINUTES_PER_DAY).any(|m| self.contains_minute(m) && other.contains_minute(m))
    }
}

/// Pricing band tag for a single session minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateBand {
    Day,
    Night,
}

/// Day/night tariff with per-session fees, scoped to a company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tariff {
    pub id: i64,
    pub company_id: i64,
    /// Unique within the company
    pub name: String,
    pub enabled: bool,
    /// Price per kWh during the daytime band, and the flat rate when no
    /// night band is configured
    pub rate_daytime: Decimal,
    pub rate_nighttime: Option<Decimal>,
    pub daytime: Option<TariffWindow>,
    pub nighttime: Option<TariffWindow>,
    /// Added once per session
    pub fixed_start_fee: Option<Decimal>,
    /// Flat per-session fee, applied when duration exceeds the threshold
    pub idle_fee: Option<Decimal>,
    pub idle_apply_after_min: Option<i64>,
    /// Company fallback used for drivers without a group
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tariff {
    /// Classify a wall-clock minute-of-day. Minutes covered by neither
    /// declared window default to the day band so uncharted time is never
    /// billed at the (usually cheaper) night rate.
    pub fn band_for_minute(&self, minute_of_day: u32) -> RateBand {
        match (&self.nighttime, self.rate_nighttime) {
            (Some(night), Some(_)) if night.contains_minute(minute_of_day) => RateBand::Night,
            _ => RateBand::Day,
        }
    }

    /// Rate for a band; a missing night rate falls back to the day rate.
    pub fn rate_for(&self, band: RateBand) -> Decimal {
        match band {
            RateBand::Day => self.rate_daytime,
            RateBand::Night => self.rate_nighttime.unwrap_or(self.rate_daytime),
        }
    }

    /// Day and night windows must not share a wall-clock minute.
    pub fn check_windows(&self) -> CoreResult<()> {
        if let (Some(day), Some(night)) = (&self.daytime, &self.nighttime) {
            if day.overlaps(night) {
                return Err(CoreError::InvariantViolation(format!(
                    "tariff '{}': daytime and nighttime windows overlap",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// Per-session cost breakdown produced by the billing engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub day_minutes: i64,
    pub night_minutes: i64,
    pub energy_cost: Decimal,
    pub start_fee: Decimal,
    pub idle_fee: Decimal,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    /// Rounded to two decimals, never negative
    pub total: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct NewTariff {
    pub company_id: i64,
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub rate_daytime: Decimal,
    pub rate_nighttime: Option<Decimal>,
    pub daytime: Option<TariffWindow>,
    pub nighttime: Option<TariffWindow>,
    pub fixed_start_fee: Option<Decimal>,
    pub idle_fee: Option<Decimal>,
    pub idle_apply_after_min: Option<i64>,
    pub is_default: bool,
}

impl NewTariff {
    pub fn flat(company_id: i64, name: impl Into<String>, rate: Decimal) -> Self {
        Self {
            company_id,
            name: name.into(),
            rate_daytime: rate,
            rate_nighttime: None,
            daytime: None,
            nighttime: None,
            fixed_start_fee: None,
            idle_fee: None,
            idle_apply_after_min: None,
            is_default: false,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn day_night_tariff() -> Tariff {
        Tariff {
            id: 1,
            company_id: 1,
            name: "Standard".into(),
            enabled: true,
            rate_daytime: dec("0.40"),
            rate_nighttime: Some(dec("0.25")),
            daytime: Some(TariffWindow::new(t(6, 0), t(22, 0))),
            nighttime: Some(TariffWindow::new(t(22, 0), t(6, 0))),
            fixed_start_fee: Some(dec("1.00")),
            idle_fee: Some(dec("5.00")),
            idle_apply_after_min: Some(240),
            is_default: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn window_contains_half_open() {
        let w = TariffWindow::new(t(6, 0), t(22, 0));
        assert!(w.contains_minute(6 * 60));
        assert!(w.contains_minute(21 * 60 + 59));
        assert!(!w.contains_minute(22 * 60));
        assert!(!w.contains_minute(5 * 60 + 59));
    }

    #[test]
    fn window_wraps_past_midnight() {
        let w = TariffWindow::new(t(22, 0), t(6, 0));
        assert!(w.contains_minute(22 * 60));
        assert!(w.contains_minute(0));
        assert!(w.contains_minute(5 * 60 + 59));
        assert!(!w.contains_minute(6 * 60));
        assert!(!w.contains_minute(12 * 60));
    }

    #[test]
    fn complementary_windows_do_not_overlap() {
        let t1 = day_night_tariff();
        assert!(t1.check_windows().is_ok());
    }

    #[test]
    fn overlapping_windows_rejected() {
        let mut t1 = day_night_tariff();
        t1.nighttime = Some(TariffWindow::new(t(21, 0), t(6, 0)));
        assert!(matches!(
            t1.check_windows(),
            Err(CoreError::InvariantViolation(_))
        ));
    }

    #[test]
    fn band_classification() {
        let t1 = day_night_tariff();
        assert_eq!(t1.band_for_minute(12 * 60), RateBand::Day);
        assert_eq!(t1.band_for_minute(23 * 60), RateBand::Night);
        assert_eq!(t1.band_for_minute(2 * 60), RateBand::Night);
    }

    #[test]
    fn uncovered_minute_defaults_to_day() {
        let mut t1 = day_night_tariff();
        // leave a 22:00-23:00 hole between the two windows
        t1.nighttime = Some(TariffWindow::new(t(23, 0), t(6, 0)));
        assert_eq!(t1.band_for_minute(22 * 60 + 30), RateBand::Day);
    }

    #[test]
    fn flat_tariff_is_all_day() {
        let t1 = Tariff {
            rate_nighttime: None,
            nighttime: None,
            ..day_night_tariff()
        };
        assert_eq!(t1.band_for_minute(3 * 60), RateBand::Day);
        assert_eq!(t1.rate_for(RateBand::Night), t1.rate_daytime);
    }
}
