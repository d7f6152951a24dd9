//! RFID card entity.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Physical card presented at a charger. The card id is globally unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RfidCard {
    pub card_id: String,
    pub company_id: i64,
    /// Optional binding to one driver
    pub driver_id: Option<i64>,
    pub enabled: bool,
    pub name_on: Option<String>,
    pub number_on: Option<String>,
    pub expiration: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RfidCard {
    pub fn is_expired_on(&self, date: NaiveDate) -> bool {
        self.expiration.map(|exp| date > exp).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct NewRfidCard {
    #[validate(length(min = 1, max = 64))]
    pub card_id: String,
    pub company_id: i64,
    pub driver_id: Option<i64>,
    pub name_on: Option<String>,
    pub number_on: Option<String>,
    pub expiration: Option<NaiveDate>,
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiration_is_inclusive() {
        let card = RfidCard {
            card_id: "CARD-1".into(),
            company_id: 1,
            driver_id: None,
            enabled: true,
            name_on: None,
            number_on: None,
            expiration: NaiveDate::from_ymd_opt(2026, 6, 30),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(!card.is_expired_on(NaiveDate::from_ymd_opt(2026, 6, 30).unwrap()));
        assert!(card.is_expired_on(NaiveDate::from_ymd_opt(2026, 7, 1).unwrap()));
    }
}
