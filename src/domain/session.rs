//! Charge sessions, the session state machine, and telemetry events.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::chain::{ChargerChain, ConnectorChain};
use super::payment::SessionPaymentStatus;
use crate::shared::{CoreError, CoreResult};

/// Session lifecycle.
///
/// `Requested → Active → Ended → Billed → Reconciled`, with terminal
/// `Rejected` out of `Requested` and `Faulted` out of the pre-billing states.
/// A faulted session that has a start timestamp may still be ended and
/// billed for the energy it delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Requested,
    Active,
    Ended,
    Billed,
    Reconciled,
    Rejected,
    Faulted,
}

impl SessionStatus {
    /// States that keep the connector claimed.
    pub fn holds_connector(&self) -> bool {
        matches!(self, Self::Requested | Self::Active)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Requested => "Requested",
            Self::Active => "Active",
            Self::Ended => "Ended",
            Self::Billed => "Billed",
            Self::Reconciled => "Reconciled",
            Self::Rejected => "Rejected",
            Self::Faulted => "Faulted",
        };
        write!(f, "{}", s)
    }
}

/// Exactly one of driver or RFID card starts a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionInitiator {
    Driver(i64),
    RfidCard(String),
}

/// A charging session, carrying its full connector chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeSession {
    pub id: i64,
    pub chain: ConnectorChain,
    pub driver_id: Option<i64>,
    pub rfid_card: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Whole minutes between start and end
    pub duration_min: Option<i64>,
    pub energy_kwh: Option<Decimal>,
    pub status: SessionStatus,
    /// Stop or fault cause ("terminated", "PowerLoss", ...)
    pub reason: Option<String>,
    pub tariff_id: Option<i64>,
    pub discount_id: Option<i64>,
    pub cost: Option<Decimal>,
    pub payment_id: Option<i64>,
    pub payment_amount: Option<Decimal>,
    pub payment_status: Option<SessionPaymentStatus>,
    pub created_at: DateTime<Utc>,
}

impl ChargeSession {
    pub fn new(
        id: i64,
        chain: ConnectorChain,
        initiator: SessionInitiator,
        requested_at: DateTime<Utc>,
    ) -> Self {
        let (driver_id, rfid_card) = match initiator {
            SessionInitiator::Driver(d) => (Some(d), None),
            SessionInitiator::RfidCard(c) => (None, Some(c)),
        };
        Self {
            id,
            chain,
            driver_id,
            rfid_card,
            requested_at,
            started_at: None,
            ended_at: None,
            duration_min: None,
            energy_kwh: None,
            status: SessionStatus::Requested,
            reason: None,
            tariff_id: None,
            discount_id: None,
            cost: None,
            payment_id: None,
            payment_amount: None,
            payment_status: None,
            created_at: Utc::now(),
        }
    }

    fn wrong_state(&self, expected: &str) -> CoreError {
        CoreError::InvariantViolation(format!(
            "session {} is {}, expected {}",
            self.id, self.status, expected
        ))
    }

    /// `Requested → Active`: record the start timestamp.
    pub fn activate(&mut self, started_at: DateTime<Utc>) -> CoreResult<()> {
        if self.status != SessionStatus::Requested {
            return Err(self.wrong_state("Requested"));
        }
        self.started_at = Some(started_at);
        self.status = SessionStatus::Active;
        Ok(())
    }

    /// `Requested → Rejected`.
    pub fn reject(&mut self, reason: impl Into<String>) -> CoreResult<()> {
        if self.status != SessionStatus::Requested {
            return Err(self.wrong_state("Requested"));
        }
        self.reason = Some(reason.into());
        self.status = SessionStatus::Rejected;
        Ok(())
    }

    /// `Active → Ended` (also `Faulted → Ended` when an end timestamp was
    /// never recorded, so partial energy can be billed). Validates the
    /// interval and computes the whole-minute duration. A fault cause
    /// already on the record wins over the supplied reason.
    pub fn finish(
        &mut self,
        ended_at: DateTime<Utc>,
        energy_kwh: Decimal,
        reason: Option<String>,
    ) -> CoreResult<()> {
        let was_faulted = self.status == SessionStatus::Faulted;
        if self.status != SessionStatus::Active && !(was_faulted && self.ended_at.is_none()) {
            return Err(self.wrong_state("Active"));
        }
        let started_at = self
            .started_at
            .ok_or_else(|| self.wrong_state("a started session"))?;
        if ended_at < started_at {
            return Err(CoreError::InvalidInterval(format!(
                "session {}: end {} precedes start {}",
                self.id, ended_at, started_at
            )));
        }
        if energy_kwh < Decimal::ZERO {
            return Err(CoreError::InvalidInterval(format!(
                "session {}: negative energy {}",
                self.id, energy_kwh
            )));
        }
        self.ended_at = Some(ended_at);
        self.duration_min = Some((ended_at - started_at).num_minutes());
        self.energy_kwh = Some(energy_kwh);
        if !was_faulted {
            self.reason = reason;
        }
        self.status = SessionStatus::Ended;
        Ok(())
    }

    /// Any pre-billing state `→ Faulted` on an unrecoverable telemetry error.
    pub fn fault(&mut self, reason: impl Into<String>) -> CoreResult<()> {
        match self.status {
            SessionStatus::Requested | SessionStatus::Active | SessionStatus::Ended => {
                self.reason = Some(reason.into());
                self.status = SessionStatus::Faulted;
                Ok(())
            }
            _ => Err(self.wrong_state("a pre-billing state")),
        }
    }

    /// `Ended → Billed`: attach the billing outcome.
    pub fn mark_billed(
        &mut self,
        tariff_id: i64,
        discount_id: Option<i64>,
        cost: Decimal,
        payment_id: i64,
    ) -> CoreResult<()> {
        if self.status != SessionStatus::Ended {
            return Err(self.wrong_state("Ended"));
        }
        self.tariff_id = Some(tariff_id);
        self.discount_id = discount_id;
        self.cost = Some(cost);
        self.payment_id = Some(payment_id);
        self.payment_amount = Some(cost);
        self.payment_status = Some(SessionPaymentStatus::Pending);
        self.status = SessionStatus::Billed;
        Ok(())
    }

    /// `Billed → Reconciled` once the processor confirms funds.
    pub fn mark_reconciled(&mut self) -> CoreResult<()> {
        if self.status != SessionStatus::Billed {
            return Err(self.wrong_state("Billed"));
        }
        self.payment_status = Some(SessionPaymentStatus::Paid);
        self.status = SessionStatus::Reconciled;
        Ok(())
    }

    pub fn initiator(&self) -> SessionInitiator {
        match (&self.driver_id, &self.rfid_card) {
            (Some(d), _) => SessionInitiator::Driver(*d),
            (None, Some(c)) => SessionInitiator::RfidCard(c.clone()),
            (None, None) => unreachable!("session without an initiator"),
        }
    }
}

/// Measurement columns attached to a telemetry event.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Measurements {
    pub temperature: Option<f64>,
    pub current: Option<f64>,
    pub voltage: Option<f64>,
    pub meter_value: Option<f64>,
}

/// Append-only telemetry/audit row. Never updated after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventData {
    pub id: i64,
    pub company_id: i64,
    pub site_id: i64,
    pub charger_id: i64,
    pub connector_id: Option<i64>,
    pub session_id: Option<i64>,
    pub recorded_at: DateTime<Utc>,
    pub event_type: String,
    pub trigger_reason: Option<String>,
    /// "ChargePoint" unless stated otherwise by the collaborator
    pub origin: String,
    pub payload: serde_json::Value,
    pub measurements: Measurements,
    pub created_at: DateTime<Utc>,
}

impl EventData {
    pub fn charger_chain(&self) -> ChargerChain {
        ChargerChain::new(self.company_id, self.site_id, self.charger_id)
    }
}

// ── Tests ──────────────────────────────────────────────────────
