//! Charger and connector entities.
//!
//! A charger is identified by `(company, site, charger)`; its numeric id is
//! only unique within the owning site and is supplied by the caller, not
//! allocated. Connectors nest one level further down.

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::chain::{ChargerChain, ConnectorChain};

/// One day's open/close window. `None` on a weekday means closed that day
/// (unless the charger is flagged 24x7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

/// Weekly open/close schedule, one optional window per weekday.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeeklySchedule {
    pub mon: Option<DayWindow>,
    pub tue: Option<DayWindow>,
    pub wed: Option<DayWindow>,
    pub thu: Option<DayWindow>,
    pub fri: Option<DayWindow>,
    pub sat: Option<DayWindow>,
    pub sun: Option<DayWindow>,
}

impl WeeklySchedule {
    pub fn window_for(&self, weekday: Weekday) -> Option<&DayWindow> {
        match weekday {
            Weekday::Mon => self.mon.as_ref(),
            Weekday::Tue => self.tue.as_ref(),
            Weekday::Wed => self.wed.as_ref(),
            Weekday::Thu => self.thu.as_ref(),
            Weekday::Fri => self.fri.as_ref(),
            Weekday::Sat => self.sat.as_ref(),
            Weekday::Sun => self.sun.as_ref(),
        }
    }
}

/// A physical charging station.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Charger {
    /// Unique only within `(company, site)`
    pub charger_id: i64,
    pub company_id: i64,
    pub site_id: i64,
    /// Unique within `(company, site)`
    pub name: String,
    pub enabled: bool,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub charger_type: Option<String>,
    /// Globally unique when present
    pub serial: Option<String>,
    pub access_type: Option<String>,
    pub active_24x7: bool,
    pub schedule: WeeklySchedule,
    pub geo_coord: Option<String>,
    /// Payment method used for sessions on this charger
    pub payment_method_id: Option<i64>,
    /// Mutated only through the telemetry path
    pub is_online: bool,
    /// Mutated only through the telemetry path
    pub availability: Option<String>,
    pub last_connected_at: Option<DateTime<Utc>>,
    pub last_heartbeat_at: Option<DateTime<Utc>>,
    pub firmware_version: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Charger {
    pub fn chain(&self) -> ChargerChain {
        ChargerChain::new(self.company_id, self.site_id, self.charger_id)
    }

    /// Whether the weekly schedule admits charging at the given local time.
    pub fn is_open_at(&self, weekday: Weekday, time: NaiveTime) -> bool {
        if self.active_24x7 {
            return true;
        }
        match self.schedule.window_for(weekday) {
            Some(w) => {
                if w.open <= w.close {
                    w.open <= time && time < w.close
                } else {
                    // window wraps past midnight
                    time >= w.open || time < w.close
                }
            }
            None => false,
        }
    }
}

/// A socket on a charger. At most one session may be in a connector-holding
/// state per connector at any instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connector {
    /// Unique only within its charger
    pub connector_id: i64,
    pub company_id: i64,
    pub site_id: i64,
    pub charger_id: i64,
    pub connector_type: Option<String>,
    pub enabled: bool,
    pub status: Option<String>,
    pub max_volt: Option<Decimal>,
    pub max_amp: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Connector {
    pub fn chain(&self) -> ConnectorChain {
        ConnectorChain::new(
            self.company_id,
            self.site_id,
            self.charger_id,
            self.connector_id,
        )
    }
}

#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct NewCharger {
    pub chain: ChargerChain,
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub charger_type: Option<String>,
    pub serial: Option<String>,
    pub access_type: Option<String>,
    pub active_24x7: bool,
    pub schedule: WeeklySchedule,
    pub geo_coord: Option<String>,
    pub payment_method_id: Option<i64>,
    pub firmware_version: Option<String>,
}

impl NewCharger {
    pub fn named(chain: ChargerChain, name: impl Into<String>) -> Self {
        Self {
            chain,
            name: name.into(),
            brand: None,
            model: None,
            charger_type: None,
            serial: None,
            access_type: None,
            active_24x7: true,
            schedule: WeeklySchedule::default(),
            geo_coord: None,
            payment_method_id: None,
            firmware_version: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewConnector {
    pub chain: ConnectorChain,
    pub connector_type: Option<String>,
    pub max_volt: Option<Decimal>,
    pub max_amp: Option<Decimal>,
}

impl NewConnector {
    pub fn at(chain: ConnectorChain) -> Self {
        Self {
            chain,
            connector_type: None,
            max_volt: None,
            max_amp: None,
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

    fn charger_with_mon_window(open: NaiveTime, close: NaiveTime) -> Charger {
        Charger {
            charger_id: 1,
            company_id: 1,
            site_id: 1,
            name: "CP-1".into(),
            enabled: true,
            brand: None,
            model: None,
            charger_type: None,
            serial: None,
            access_type: None,
            active_24x7: false,
            schedule: WeeklySchedule {
                mon: Some(DayWindow { open, close }),
                ..WeeklySchedule::default()
            },
            geo_coord: None,
            payment_method_id: None,
            is_online: false,
            availability: None,
            last_connected_at: None,
            last_heartbeat_at: None,
            firmware_version: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn open_within_window() {
        let c = charger_with_mon_window(t(8, 0), t(20, 0));
        assert!(c.is_open_at(Weekday::Mon, t(12, 0)));
        assert!(!c.is_open_at(Weekday::Mon, t(20, 0)));
        assert!(!c.is_open_at(Weekday::Tue, t(12, 0)));
    }

    #[test]
    fn window_wrapping_midnight() {
        let c = charger_with_mon_window(t(22, 0), t(6, 0));
        assert!(c.is_open_at(Weekday::Mon, t(23, 30)));
        assert!(c.is_open_at(Weekday::Mon, t(1, 0)));
        assert!(!c.is_open_at(Weekday::Mon, t(12, 0)));
    }

    #[test]
    fn always_open_ignores_schedule() {
        let mut c = charger_with_mon_window(t(8, 0), t(9, 0));
        c.active_24x7 = true;
        assert!(c.is_open_at(Weekday::Sun, t(3, 0)));
    }
}
