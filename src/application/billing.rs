//! Billing engine.
//!
//! Prices an ended session by classifying each elapsed minute into the day
//! or night band of the resolved tariff, pro-rating the energy across the
//! bands, then layering fees and the driver's discount on top. The final
//! write goes through [`Storage::record_billing`], which persists the billed
//! session and its payment transaction atomically, so a session is never
//! billed twice.

use std::sync::Arc;

use chrono::{DateTime, Duration, Timelike, Utc};
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::domain::tariff::MINUTES_PER_DAY;
use crate::domain::{
    ChargeSession, CostBreakdown, Discount, Driver, PaymentStatus, PaymentTransaction, RateBand,
    SessionInitiator, Tariff, TransactionStatus,
};
use crate::shared::{CoreError, CoreResult};
use crate::storage::Storage;

/// Splits a session's wall-clock minutes across tariff bands and prices the
/// energy pro-rata, in the company's local time. A zero-length session bills
/// all energy at the day rate.
pub fn compute_session_cost(
    tariff: &Tariff,
    discount: Option<&Discount>,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    energy_kwh: Decimal,
    utc_offset_minutes: i32,
    currency: &str,
) -> CostBreakdown {
    let local_start = started_at + Duration::minutes(utc_offset_minutes as i64);
    let local_end = ended_at + Duration::minutes(utc_offset_minutes as i64);
    let total_minutes = (ended_at - started_at).num_minutes();

    let start_minute = (local_start.hour() * 60 + local_start.minute()) as i64;
    let mut day_minutes = 0i64;
    let mut night_minutes = 0i64;
    for m in 0..total_minutes {
        let minute_of_day = ((start_minute + m) % MINUTES_PER_DAY as i64) as u32;
        match tariff.band_for_minute(minute_of_day) {
            RateBand::Day => day_minutes += 1,
            RateBand::Night => night_minutes += 1,
        }
    }

    let day_rate = tariff.rate_for(RateBand::Day);
    let night_rate = tariff.rate_for(RateBand::Night);
    let energy_cost = if total_minutes == 0 {
        energy_kwh * day_rate
    } else {
        let weighted = Decimal::from(day_minutes) * day_rate
            + Decimal::from(night_minutes) * night_rate;
        energy_kwh * weighted / Decimal::from(total_minutes)
    };

    let start_fee = tariff.fixed_start_fee.unwrap_or(Decimal::ZERO);
    let idle_fee = match (tariff.idle_fee, tariff.idle_apply_after_min) {
        (Some(fee), Some(after)) if total_minutes > after => fee,
        _ => Decimal::ZERO,
    };
    let subtotal = energy_cost + start_fee + idle_fee;

    let discount_amount = discount
        .filter(|d| d.is_active_on(local_end.date_naive()))
        .map(|d| subtotal - d.apply(subtotal))
        .unwrap_or(Decimal::ZERO);

    let total = (subtotal - discount_amount).max(Decimal::ZERO).round_dp(2);
    CostBreakdown {
        day_minutes,
        night_minutes,
        energy_cost,
        start_fee,
        idle_fee,
        subtotal,
        discount_amount,
        total,
        currency: currency.to_string(),
    }
}

pub struct BillingEngine {
    storage: Arc<dyn Storage>,
    currency: String,
}

impl BillingEngine {
    pub fn new(storage: Arc<dyn Storage>, currency: impl Into<String>) -> Self {
        Self {
            storage,
            currency: currency.into(),
        }
    }

    /// Bills an Ended session: resolves the tariff and discount through the
    /// driver's group with the company default as fallback, computes the
    /// cost, and atomically records the Billed session with its pending
    /// payment transaction.
    pub async fn bill_session(
        &self,
        session_id: i64,
    ) -> CoreResult<(ChargeSession, PaymentTransaction, CostBreakdown)> {
        let mut session = self
            .storage
            .get_session(session_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "ChargeSession",
                field: "id",
                value: session_id.to_string(),
            })?;
        let started_at = session.started_at.ok_or_else(|| {
            CoreError::InvariantViolation(format!("session {} has no start time", session_id))
        })?;
        let ended_at = session.ended_at.ok_or_else(|| {
            CoreError::InvariantViolation(format!("session {} has no end time", session_id))
        })?;
        let energy_kwh = session.energy_kwh.unwrap_or(Decimal::ZERO);

        let company = self
            .storage
            .get_company(session.chain.company_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Company",
                field: "id",
                value: session.chain.company_id.to_string(),
            })?;
        let charger = self.storage.get_charger(session.chain.charger()).await?;

        let driver = self.session_driver(&session).await?;
        let (tariff, discount) = self.resolve_pricing(&session, driver.as_ref()).await?;

        let breakdown = compute_session_cost(
            &tariff,
            discount.as_ref(),
            started_at,
            ended_at,
            energy_kwh,
            company.utc_offset_minutes,
            &self.currency,
        );
        let discount_id = discount
            .as_ref()
            .filter(|d| d.is_active_on(
                (ended_at + Duration::minutes(company.utc_offset_minutes as i64)).date_naive(),
            ))
            .map(|d| d.id);

        session.mark_billed(tariff.id, discount_id, breakdown.total, 0)?;
        let now = Utc::now();
        let transaction = PaymentTransaction {
            id: 0,
            method_id: charger.and_then(|c| c.payment_method_id),
            driver_id: driver.map(|d| d.id),
            company_id: session.chain.company_id,
            site_id: session.chain.site_id,
            charger_id: session.chain.charger_id,
            session_id: Some(session.id),
            amount: breakdown.total,
            intent_id: format!("pi_{}", Uuid::new_v4().simple()),
            status: TransactionStatus::Pending,
            payment_status: PaymentStatus::Pending,
            occurred_at: ended_at,
            created_at: now,
            updated_at: now,
        };
        let transaction = self
            .storage
            .record_billing(session.clone(), transaction)
            .await?;
        session.payment_id = Some(transaction.id);
        info!(
            session_id,
            tariff_id = tariff.id,
            total = %breakdown.total,
            intent_id = %transaction.intent_id,
            "session billed"
        );
        Ok((session, transaction, breakdown))
    }

    async fn session_driver(&self, session: &ChargeSession) -> CoreResult<Option<Driver>> {
        match session.initiator() {
            SessionInitiator::Driver(driver_id) => Ok(self.storage.get_driver(driver_id).await?),
            SessionInitiator::RfidCard(card_id) => {
                let card = self.storage.get_rfid_card(&card_id).await?;
                match card.and_then(|c| c.driver_id) {
                    Some(driver_id) => Ok(self.storage.get_driver(driver_id).await?),
                    None => Ok(None),
                }
            }
        }
    }

    /// Group tariff and discount when the driver belongs to a group, the
    /// company default tariff otherwise. No tariff at all is a billing error.
    async fn resolve_pricing(
        &self,
        session: &ChargeSession,
        driver: Option<&Driver>,
    ) -> CoreResult<(Tariff, Option<Discount>)> {
        if let Some(group_id) = driver.and_then(|d| d.group_id) {
            if let Some(group) = self.storage.get_driver_group(group_id).await? {
                if let Some(tariff) = self.storage.get_tariff(group.tariff_id).await? {
                    let discount = match group.discount_id {
                        Some(id) => self.storage.get_discount(id).await?,
                        None => None,
                    };
                    return Ok((tariff, discount));
                }
            }
        }
        let tariff = self
            .storage
            .find_default_tariff(session.chain.company_id)
            .await?
            .ok_or(CoreError::MissingTariff(session.id))?;
        Ok((tariff, None))
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DiscountKind, TariffWindow};
    use chrono::{NaiveTime, TimeZone};

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    fn standard_tariff() -> Tariff {
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
    fn all_day_session_with_idle_fee() {
        // 08:00-13:00, 20 kWh: 20 x 0.40 + 1.00 start + 5.00 idle (300 > 240)
        let b = compute_session_cost(
            &standard_tariff(),
            None,
            at(8, 0),
            at(13, 0),
            dec("20"),
            0,
            "EUR",
        );
        assert_eq!(b.day_minutes, 300);
        assert_eq!(b.night_minutes, 0);
        assert_eq!(b.energy_cost, dec("8.00"));
        assert_eq!(b.idle_fee, dec("5.00"));
        assert_eq!(b.total, dec("14.00"));
    }

    #[test]
    fn band_straddling_session_prorates_energy() {
        // 21:00-23:30, 10 kWh: 60 day + 90 night minutes
        // (60x0.40 + 90x0.25)/150 x 10 + 1.00 = 4.10
        let b = compute_session_cost(
            &standard_tariff(),
            None,
            at(21, 0),
            at(23, 30),
            dec("10"),
            0,
            "EUR",
        );
        assert_eq!(b.day_minutes, 60);
        assert_eq!(b.night_minutes, 90);
        assert_eq!(b.idle_fee, Decimal::ZERO);
        assert_eq!(b.total, dec("4.10"));
    }

    #[test]
    fn zero_length_session_bills_energy_at_day_rate() {
        let b = compute_session_cost(
            &standard_tariff(),
            None,
            at(23, 0),
            at(23, 0),
            dec("2"),
            0,
            "EUR",
        );
        assert_eq!(b.energy_cost, dec("0.80"));
        assert_eq!(b.total, dec("1.80"));
    }

    #[test]
    fn utc_offset_shifts_band_classification() {
        // 20:00-22:00 UTC is 22:00-00:00 at +120, entirely night
        let b = compute_session_cost(
            &standard_tariff(),
            None,
            at(20, 0),
            at(22, 0),
            dec("10"),
            120,
            "EUR",
        );
        assert_eq!(b.day_minutes, 0);
        assert_eq!(b.night_minutes, 120);
        assert_eq!(b.total, dec("3.50"));
    }

    #[test]
    fn percentage_discount_applies_to_subtotal() {
        let discount = Discount {
            id: 1,
            company_id: 1,
            name: "Fleet".into(),
            enabled: true,
            kind: DiscountKind::Percentage,
            value: dec("50"),
            valid_from: None,
            valid_until: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let b = compute_session_cost(
            &standard_tariff(),
            Some(&discount),
            at(8, 0),
            at(13, 0),
            dec("20"),
            0,
            "EUR",
        );
        assert_eq!(b.discount_amount, dec("7.00"));
        assert_eq!(b.total, dec("7.00"));
    }

    #[test]
    fn expired_discount_is_ignored() {
        let discount = Discount {
            id: 1,
            company_id: 1,
            name: "January".into(),
            enabled: true,
            kind: DiscountKind::Percentage,
            value: dec("50"),
            valid_from: None,
            valid_until: chrono::NaiveDate::from_ymd_opt(2026, 1, 31),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let b = compute_session_cost(
            &standard_tariff(),
            Some(&discount),
            at(8, 0),
            at(13, 0),
            dec("20"),
            0,
            "EUR",
        );
        assert_eq!(b.discount_amount, Decimal::ZERO);
        assert_eq!(b.total, dec("14.00"));
    }

    #[test]
    fn oversized_fixed_discount_floors_total_at_zero() {
        let discount = Discount {
            id: 1,
            company_id: 1,
            name: "Comp".into(),
            enabled: true,
            kind: DiscountKind::Fixed,
            value: dec("100.00"),
            valid_from: None,
            valid_until: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let b = compute_session_cost(
            &standard_tariff(),
            Some(&discount),
            at(8, 0),
            at(13, 0),
            dec("20"),
            0,
            "EUR",
        );
        assert_eq!(b.total, Decimal::ZERO);
    }

    #[test]
    fn rounding_is_banker_style() {
        // 0.125 rounds to 0.12, 0.135 rounds to 0.14
        assert_eq!(dec("0.125").round_dp(2), dec("0.12"));
        assert_eq!(dec("0.135").round_dp(2), dec("0.14"));
    }

    #[test]
    fn flat_tariff_prices_every_minute_at_day_rate() {
        let tariff = Tariff {
            rate_nighttime: None,
            nighttime: None,
            daytime: None,
            fixed_start_fee: None,
            idle_fee: None,
            idle_apply_after_min: None,
            ..standard_tariff()
        };
        let b = compute_session_cost(&tariff, None, at(23, 0), at(23, 30), dec("5"), 0, "EUR");
        assert_eq!(b.day_minutes, 30);
        assert_eq!(b.total, dec("2.00"));
    }
}
