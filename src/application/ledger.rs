//! Session ledger: admission, state transitions and telemetry ingestion.
//!
//! Admission is the concurrency-critical path. The connector claim is taken
//! before anything is persisted, so a busy connector leaves no trace; every
//! other admission failure is recorded as a Rejected session so the refusal
//! stays queryable.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Utc};
use tracing::{info, warn};

use crate::application::hierarchy::{HierarchyRegistry, ResolvedConnector};
use crate::domain::{
    ChargeSession, Charger, ChargerChain, ConnectorChain, EventData, Measurements,
    SessionInitiator, SessionStatus,
};
use crate::shared::{CoreError, CoreResult};
use crate::storage::Storage;

/// Telemetry row as delivered by the charge-point collaborator.
#[derive(Debug, Clone)]
pub struct TelemetryEvent {
    pub chain: ChargerChain,
    pub connector_id: Option<i64>,
    pub session_id: Option<i64>,
    pub recorded_at: DateTime<Utc>,
    pub event_type: String,
    pub trigger_reason: Option<String>,
    /// Defaults to "ChargePoint"
    pub origin: Option<String>,
    pub payload: serde_json::Value,
    pub measurements: Measurements,
}

pub struct SessionLedger {
    storage: Arc<dyn Storage>,
    registry: HierarchyRegistry,
}

impl SessionLedger {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        let registry = HierarchyRegistry::new(storage.clone());
        Self { storage, registry }
    }

    /// Admits a charging request on a connector.
    ///
    /// A busy connector fails with [`CoreError::ConnectorBusy`] and persists
    /// nothing. Any other admission failure (disabled ancestor, closed
    /// schedule, bad initiator) produces a persisted Rejected session whose
    /// reason names the check that failed. Success produces a Requested
    /// session holding the connector claim.
    pub async fn admit_session(
        &self,
        chain: ConnectorChain,
        initiator: SessionInitiator,
        requested_at: DateTime<Utc>,
    ) -> CoreResult<ChargeSession> {
        let resolved = self.resolve(chain).await?;
        let session_id = self.storage.next_session_id().await;
        self.storage.claim_connector(chain, session_id).await?;

        let verdict = self
            .admission_failure(&resolved, &initiator, requested_at)
            .await;
        let verdict = match verdict {
            Ok(v) => v,
            Err(e) => {
                self.storage.release_connector(chain, session_id).await?;
                return Err(e);
            }
        };

        let mut session = ChargeSession::new(session_id, chain, initiator, requested_at);
        match verdict {
            Some(reason) => {
                session.reject(reason.clone())?;
                self.storage.insert_session(session.clone()).await?;
                self.storage.release_connector(chain, session_id).await?;
                warn!(session_id, %chain, %reason, "session rejected");
            }
            None => {
                self.storage.insert_session(session.clone()).await?;
                info!(session_id, %chain, "session admitted");
            }
        }
        Ok(session)
    }

    /// `Requested → Active` once the charge point confirms power delivery.
    pub async fn start_session(
        &self,
        session_id: i64,
        started_at: DateTime<Utc>,
    ) -> CoreResult<ChargeSession> {
        let mut session = self.require_session(session_id).await?;
        session.activate(started_at)?;
        self.storage
            .update_session_if_status(session.clone(), SessionStatus::Requested)
            .await?;
        info!(session_id, "session started");
        Ok(session)
    }

    /// Operator-initiated `Requested → Rejected`. Releases the claim.
    pub async fn reject_session(
        &self,
        session_id: i64,
        reason: impl Into<String>,
    ) -> CoreResult<ChargeSession> {
        let mut session = self.require_session(session_id).await?;
        session.reject(reason)?;
        self.storage
            .update_session_if_status(session.clone(), SessionStatus::Requested)
            .await?;
        self.storage
            .release_connector(session.chain, session_id)
            .await?;
        Ok(session)
    }

    /// Ends a session with its meter totals, releasing the connector. Also
    /// accepts a faulted session that never recorded an end, so partial
    /// energy can still be billed.
    pub async fn end_session(
        &self,
        session_id: i64,
        ended_at: DateTime<Utc>,
        energy_kwh: rust_decimal::Decimal,
        reason: Option<String>,
    ) -> CoreResult<ChargeSession> {
        let mut session = self.require_session(session_id).await?;
        let prior = session.status;
        session.finish(ended_at, energy_kwh, reason)?;
        self.storage
            .update_session_if_status(session.clone(), prior)
            .await?;
        self.storage
            .release_connector(session.chain, session_id)
            .await?;
        info!(
            session_id,
            duration_min = session.duration_min,
            energy_kwh = %energy_kwh,
            "session ended"
        );
        Ok(session)
    }

    /// Marks a session Faulted on an unrecoverable error, releasing the
    /// connector so the hardware is not wedged by a dead session.
    pub async fn fault_session(
        &self,
        session_id: i64,
        reason: impl Into<String>,
    ) -> CoreResult<ChargeSession> {
        let mut session = self.require_session(session_id).await?;
        let prior = session.status;
        session.fault(reason)?;
        self.storage
            .update_session_if_status(session.clone(), prior)
            .await?;
        self.storage
            .release_connector(session.chain, session_id)
            .await?;
        warn!(session_id, reason = session.reason.as_deref(), "session faulted");
        Ok(session)
    }

    /// Appends one telemetry row. The charger must exist; a referenced
    /// session must sit on that charger.
    pub async fn record_telemetry(&self, event: TelemetryEvent) -> CoreResult<EventData> {
        self.require_charger(event.chain).await?;
        if let Some(session_id) = event.session_id {
            let session = self.require_session(session_id).await?;
            if session.chain.charger() != event.chain {
                return Err(CoreError::CrossTenantViolation(format!(
                    "session {} sits on charger {}, not {}",
                    session_id,
                    session.chain.charger(),
                    event.chain
                )));
            }
        }
        self.storage
            .append_event(EventData {
                id: 0,
                company_id: event.chain.company_id,
                site_id: event.chain.site_id,
                charger_id: event.chain.charger_id,
                connector_id: event.connector_id,
                session_id: event.session_id,
                recorded_at: event.recorded_at,
                event_type: event.event_type,
                trigger_reason: event.trigger_reason,
                origin: event.origin.unwrap_or_else(|| "ChargePoint".to_string()),
                payload: event.payload,
                measurements: event.measurements,
                created_at: Utc::now(),
            })
            .await
    }

    /// Telemetry-driven charger liveness. The only write path for the
    /// `is_online`/`availability` fields.
    pub async fn update_charger_status(
        &self,
        chain: ChargerChain,
        is_online: bool,
        availability: Option<String>,
        at: DateTime<Utc>,
    ) -> CoreResult<Charger> {
        let mut charger = self.require_charger(chain).await?;
        if is_online && !charger.is_online {
            charger.last_connected_at = Some(at);
        }
        charger.is_online = is_online;
        if availability.is_some() {
            charger.availability = availability;
        }
        charger.last_heartbeat_at = Some(at);
        charger.updated_at = Utc::now();
        self.storage.update_charger(charger.clone()).await?;
        Ok(charger)
    }

    pub async fn get_session(&self, session_id: i64) -> CoreResult<ChargeSession> {
        self.require_session(session_id).await
    }

    pub async fn session_events(&self, session_id: i64) -> CoreResult<Vec<EventData>> {
        self.storage.list_events_for_session(session_id).await
    }

    /// Returns the rejection reason when the request must not become a live
    /// session, `None` when admission passes.
    async fn admission_failure(
        &self,
        resolved: &ResolvedConnector,
        initiator: &SessionInitiator,
        requested_at: DateTime<Utc>,
    ) -> CoreResult<Option<String>> {
        if let Some(level) = resolved.disabled_level() {
            return Ok(Some(format!("{} disabled", level)));
        }

        let local = requested_at + Duration::minutes(resolved.company.utc_offset_minutes as i64);
        if !resolved.charger.is_open_at(local.weekday(), local.time()) {
            return Ok(Some("charger closed by schedule".to_string()));
        }

        match initiator {
            SessionInitiator::Driver(driver_id) => {
                let driver = match self.storage.get_driver(*driver_id).await? {
                    Some(d) => d,
                    None => return Ok(Some("unknown driver".to_string())),
                };
                if driver.company_id != Some(resolved.company.id) {
                    return Ok(Some("driver from another company".to_string()));
                }
                if !driver.enabled {
                    return Ok(Some("driver disabled".to_string()));
                }
            }
            SessionInitiator::RfidCard(card_id) => {
                let card = match self.storage.get_rfid_card(card_id).await? {
                    Some(c) => c,
                    None => return Ok(Some("unknown RFID card".to_string())),
                };
                if card.company_id != resolved.company.id {
                    return Ok(Some("RFID card from another company".to_string()));
                }
                if !card.enabled {
                    return Ok(Some("RFID card disabled".to_string()));
                }
                if card.is_expired_on(local.date_naive()) {
                    return Ok(Some("RFID card expired".to_string()));
                }
                if let Some(driver_id) = card.driver_id {
                    let bound = self.storage.get_driver(driver_id).await?;
                    if !bound.map(|d| d.enabled).unwrap_or(false) {
                        return Ok(Some("driver disabled".to_string()));
                    }
                }
            }
        }
        Ok(None)
    }

    // chain traversal, including the site-vs-company cross-tenant check,
    // lives in one place
    async fn resolve(&self, chain: ConnectorChain) -> CoreResult<ResolvedConnector> {
        self.registry.resolve_connector(chain).await
    }

    async fn require_session(&self, session_id: i64) -> CoreResult<ChargeSession> {
        self.storage
            .get_session(session_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "ChargeSession",
                field: "id",
                value: session_id.to_string(),
            })
    }

    async fn require_charger(&self, chain: ChargerChain) -> CoreResult<Charger> {
        self.storage
            .get_charger(chain)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Charger",
                field: "chain",
                value: chain.to_string(),
            })
    }
}

// ── Tests ──────────────────────────────────────────────────────
