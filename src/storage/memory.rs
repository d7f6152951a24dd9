//! In-memory storage implementation.
//!
//! Reference backend for development and testing. Map-entry locks provide the
//! per-row atomicity the trait requires; the connector-claims map is the
//! uniqueness constraint behind session admission.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::Storage;
use crate::domain::{
    ChargeSession, Charger, ChargerChain, Company, Connector, ConnectorChain, Discount, Driver,
    DriverGroup, EventData, PaymentMethod, PaymentTransaction, RfidCard, SessionStatus, Site,
    SiteChain, SiteGroup, Tariff, User,
};
use crate::shared::{CoreError, CoreResult};

/// In-memory storage backed by concurrent maps.
#[derive(Default)]
pub struct InMemoryStorage {
    companies: DashMap<i64, Company>,
    site_groups: DashMap<i64, SiteGroup>,
    sites: DashMap<i64, Site>,
    chargers: DashMap<ChargerChain, Charger>,
    connectors: DashMap<ConnectorChain, Connector>,
    tariffs: DashMap<i64, Tariff>,
    discounts: DashMap<i64, Discount>,
    driver_groups: DashMap<i64, DriverGroup>,
    users: DashMap<i64, User>,
    drivers: DashMap<i64, Driver>,
    user_driver_index: DashMap<i64, i64>,
    rfid_cards: DashMap<String, RfidCard>,
    payment_methods: DashMap<i64, PaymentMethod>,
    sessions: DashMap<i64, ChargeSession>,
    connector_claims: DashMap<ConnectorChain, i64>,
    events: DashMap<i64, EventData>,
    transactions: DashMap<i64, PaymentTransaction>,
    intent_index: DashMap<String, i64>,

    company_counter: AtomicI64,
    site_group_counter: AtomicI64,
    site_counter: AtomicI64,
    tariff_counter: AtomicI64,
    discount_counter: AtomicI64,
    driver_group_counter: AtomicI64,
    user_counter: AtomicI64,
    driver_counter: AtomicI64,
    session_counter: AtomicI64,
    event_counter: AtomicI64,
    transaction_counter: AtomicI64,
    payment_method_counter: AtomicI64,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(counter: &AtomicI64) -> i64 {
        counter.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn insert_company(&self, mut company: Company) -> CoreResult<Company> {
        company.id = Self::next(&self.company_counter);
        self.companies.insert(company.id, company.clone());
        Ok(company)
    }

    async fn get_company(&self, id: i64) -> CoreResult<Option<Company>> {
        Ok(self.companies.get(&id).map(|c| c.clone()))
    }

    async fn find_company_by_name(&self, name: &str) -> CoreResult<Option<Company>> {
        Ok(self
            .companies
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.clone()))
    }

    async fn update_company(&self, company: Company) -> CoreResult<()> {
        match self.companies.get_mut(&company.id) {
            Some(mut entry) => {
                *entry = company;
                Ok(())
            }
            None => Err(CoreError::NotFound {
                entity: "Company",
                field: "id",
                value: company.id.to_string(),
            }),
        }
    }

    async fn list_companies(&self) -> CoreResult<Vec<Company>> {
        Ok(self.companies.iter().map(|c| c.clone()).collect())
    }

    async fn insert_site_group(&self, mut group: SiteGroup) -> CoreResult<SiteGroup> {
        group.id = Self::next(&self.site_group_counter);
        self.site_groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn get_site_group(&self, id: i64) -> CoreResult<Option<SiteGroup>> {
        Ok(self.site_groups.get(&id).map(|g| g.clone()))
    }

    async fn list_site_groups(&self, company_id: i64) -> CoreResult<Vec<SiteGroup>> {
        Ok(self
            .site_groups
            .iter()
            .filter(|g| g.company_id == company_id)
            .map(|g| g.clone())
            .collect())
    }

    async fn insert_site(&self, mut site: Site) -> CoreResult<Site> {
        site.id = Self::next(&self.site_counter);
        self.sites.insert(site.id, site.clone());
        Ok(site)
    }

    async fn get_site(&self, id: i64) -> CoreResult<Option<Site>> {
        Ok(self.sites.get(&id).map(|s| s.clone()))
    }

    async fn list_sites(&self, company_id: i64) -> CoreResult<Vec<Site>> {
        Ok(self
            .sites
            .iter()
            .filter(|s| s.company_id == company_id)
            .map(|s| s.clone())
            .collect())
    }

    async fn insert_charger(&self, charger: Charger) -> CoreResult<Charger> {
        match self.chargers.entry(charger.chain()) {
            Entry::Occupied(_) => Err(CoreError::InvariantViolation(format!(
                "charger {} already exists",
                charger.chain()
            ))),
            Entry::Vacant(v) => {
                v.insert(charger.clone());
                Ok(charger)
            }
        }
    }

    async fn get_charger(&self, chain: ChargerChain) -> CoreResult<Option<Charger>> {
        Ok(self.chargers.get(&chain).map(|c| c.clone()))
    }

    async fn list_chargers(&self, site: SiteChain) -> CoreResult<Vec<Charger>> {
        Ok(self
            .chargers
            .iter()
            .filter(|c| c.company_id == site.company_id && c.site_id == site.site_id)
            .map(|c| c.clone())
            .collect())
    }

    async fn find_charger_by_serial(&self, serial: &str) -> CoreResult<Option<Charger>> {
        Ok(self
            .chargers
            .iter()
            .find(|c| c.serial.as_deref() == Some(serial))
            .map(|c| c.clone()))
    }

    async fn update_charger(&self, charger: Charger) -> CoreResult<()> {
        match self.chargers.get_mut(&charger.chain()) {
            Some(mut entry) => {
                *entry = charger;
                Ok(())
            }
            None => Err(CoreError::NotFound {
                entity: "Charger",
                field: "chain",
                value: charger.chain().to_string(),
            }),
        }
    }

    async fn insert_connector(&self, connector: Connector) -> CoreResult<Connector> {
        match self.connectors.entry(connector.chain()) {
            Entry::Occupied(_) => Err(CoreError::InvariantViolation(format!(
                "connector {} already exists",
                connector.chain()
            ))),
            Entry::Vacant(v) => {
                v.insert(connector.clone());
                Ok(connector)
            }
        }
    }

    async fn get_connector(&self, chain: ConnectorChain) -> CoreResult<Option<Connector>> {
        Ok(self.connectors.get(&chain).map(|c| c.clone()))
    }

    async fn list_connectors(&self, charger: ChargerChain) -> CoreResult<Vec<Connector>> {
        Ok(self
            .connectors
            .iter()
            .filter(|c| {
                c.company_id == charger.company_id
                    && c.site_id == charger.site_id
                    && c.charger_id == charger.charger_id
            })
            .map(|c| c.clone())
            .collect())
    }

    async fn insert_tariff(&self, mut tariff: Tariff) -> CoreResult<Tariff> {
        tariff.id = Self::next(&self.tariff_counter);
        self.tariffs.insert(tariff.id, tariff.clone());
        Ok(tariff)
    }

    async fn get_tariff(&self, id: i64) -> CoreResult<Option<Tariff>> {
        Ok(self.tariffs.get(&id).map(|t| t.clone()))
    }

    async fn list_tariffs(&self, company_id: i64) -> CoreResult<Vec<Tariff>> {
        Ok(self
            .tariffs
            .iter()
            .filter(|t| t.company_id == company_id)
            .map(|t| t.clone())
            .collect())
    }

    async fn find_default_tariff(&self, company_id: i64) -> CoreResult<Option<Tariff>> {
        Ok(self
            .tariffs
            .iter()
            .find(|t| t.company_id == company_id && t.is_default && t.enabled)
            .map(|t| t.clone()))
    }

    async fn insert_discount(&self, mut discount: Discount) -> CoreResult<Discount> {
        discount.id = Self::next(&self.discount_counter);
        self.discounts.insert(discount.id, discount.clone());
        Ok(discount)
    }

    async fn get_discount(&self, id: i64) -> CoreResult<Option<Discount>> {
        Ok(self.discounts.get(&id).map(|d| d.clone()))
    }

    async fn list_discounts(&self, company_id: i64) -> CoreResult<Vec<Discount>> {
        Ok(self
            .discounts
            .iter()
            .filter(|d| d.company_id == company_id)
            .map(|d| d.clone())
            .collect())
    }

    async fn insert_driver_group(&self, mut group: DriverGroup) -> CoreResult<DriverGroup> {
        group.id = Self::next(&self.driver_group_counter);
        self.driver_groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn get_driver_group(&self, id: i64) -> CoreResult<Option<DriverGroup>> {
        Ok(self.driver_groups.get(&id).map(|g| g.clone()))
    }

    async fn list_driver_groups(&self, company_id: i64) -> CoreResult<Vec<DriverGroup>> {
        Ok(self
            .driver_groups
            .iter()
            .filter(|g| g.company_id == company_id)
            .map(|g| g.clone())
            .collect())
    }

    async fn insert_user(&self, mut user: User) -> CoreResult<User> {
        user.id = Self::next(&self.user_counter);
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: i64) -> CoreResult<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> CoreResult<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .map(|u| u.clone()))
    }

    async fn update_user(&self, user: User) -> CoreResult<()> {
        match self.users.get_mut(&user.id) {
            Some(mut entry) => {
                *entry = user;
                Ok(())
            }
            None => Err(CoreError::NotFound {
                entity: "User",
                field: "id",
                value: user.id.to_string(),
            }),
        }
    }

    async fn insert_driver(&self, mut driver: Driver) -> CoreResult<Driver> {
        driver.id = Self::next(&self.driver_counter);
        self.drivers.insert(driver.id, driver.clone());
        Ok(driver)
    }

    async fn insert_driver_for_user(&self, mut driver: Driver) -> CoreResult<Driver> {
        let user_id = driver.user_id.ok_or_else(|| {
            CoreError::InvariantViolation("driver carries no user binding".to_string())
        })?;
        // the index entry is the reservation; the loser of a race reads the
        // winner's record back
        match self.user_driver_index.entry(user_id) {
            Entry::Occupied(existing) => {
                let driver_id = *existing.get();
                self.drivers
                    .get(&driver_id)
                    .map(|d| d.clone())
                    .ok_or(CoreError::NotFound {
                        entity: "Driver",
                        field: "id",
                        value: driver_id.to_string(),
                    })
            }
            Entry::Vacant(slot) => {
                driver.id = Self::next(&self.driver_counter);
                self.drivers.insert(driver.id, driver.clone());
                slot.insert(driver.id);
                Ok(driver)
            }
        }
    }

    async fn get_driver(&self, id: i64) -> CoreResult<Option<Driver>> {
        Ok(self.drivers.get(&id).map(|d| d.clone()))
    }

    async fn find_driver_by_user(&self, user_id: i64) -> CoreResult<Option<Driver>> {
        Ok(self
            .drivers
            .iter()
            .find(|d| d.user_id == Some(user_id))
            .map(|d| d.clone()))
    }

    async fn find_driver_by_email(
        &self,
        company_id: i64,
        email: &str,
    ) -> CoreResult<Option<Driver>> {
        Ok(self
            .drivers
            .iter()
            .find(|d| {
                d.company_id == Some(company_id)
                    && d.email
                        .as_deref()
                        .map(|e| e.eq_ignore_ascii_case(email))
                        .unwrap_or(false)
            })
            .map(|d| d.clone()))
    }

    async fn update_driver(&self, driver: Driver) -> CoreResult<()> {
        match self.drivers.get_mut(&driver.id) {
            Some(mut entry) => {
                *entry = driver;
                Ok(())
            }
            None => Err(CoreError::NotFound {
                entity: "Driver",
                field: "id",
                value: driver.id.to_string(),
            }),
        }
    }

    async fn list_drivers(&self, company_id: i64) -> CoreResult<Vec<Driver>> {
        Ok(self
            .drivers
            .iter()
            .filter(|d| d.company_id == Some(company_id))
            .map(|d| d.clone())
            .collect())
    }

    async fn insert_rfid_card(&self, card: RfidCard) -> CoreResult<RfidCard> {
        match self.rfid_cards.entry(card.card_id.clone()) {
            Entry::Occupied(_) => Err(CoreError::InvariantViolation(format!(
                "RFID card '{}' already exists",
                card.card_id
            ))),
            Entry::Vacant(v) => {
                v.insert(card.clone());
                Ok(card)
            }
        }
    }

    async fn get_rfid_card(&self, card_id: &str) -> CoreResult<Option<RfidCard>> {
        Ok(self.rfid_cards.get(card_id).map(|c| c.clone()))
    }

    async fn update_rfid_card(&self, card: RfidCard) -> CoreResult<()> {
        match self.rfid_cards.get_mut(&card.card_id) {
            Some(mut entry) => {
                *entry = card;
                Ok(())
            }
            None => Err(CoreError::NotFound {
                entity: "RfidCard",
                field: "card_id",
                value: card.card_id.clone(),
            }),
        }
    }

    async fn insert_payment_method(&self, mut method: PaymentMethod) -> CoreResult<PaymentMethod> {
        method.id = Self::next(&self.payment_method_counter);
        self.payment_methods.insert(method.id, method.clone());
        Ok(method)
    }

    async fn get_payment_method(&self, id: i64) -> CoreResult<Option<PaymentMethod>> {
        Ok(self.payment_methods.get(&id).map(|m| m.clone()))
    }

    async fn list_payment_methods(&self, company_id: i64) -> CoreResult<Vec<PaymentMethod>> {
        Ok(self
            .payment_methods
            .iter()
            .filter(|m| m.company_id == company_id)
            .map(|m| m.clone())
            .collect())
    }

    async fn next_session_id(&self) -> i64 {
        Self::next(&self.session_counter)
    }

    async fn insert_session(&self, session: ChargeSession) -> CoreResult<ChargeSession> {
        self.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_session(&self, id: i64) -> CoreResult<Option<ChargeSession>> {
        Ok(self.sessions.get(&id).map(|s| s.clone()))
    }

    async fn update_session_if_status(
        &self,
        session: ChargeSession,
        expected: SessionStatus,
    ) -> CoreResult<()> {
        match self.sessions.get_mut(&session.id) {
            Some(mut entry) => {
                if entry.status != expected {
                    return Err(CoreError::InvariantViolation(format!(
                        "session {} is {}, expected {}",
                        session.id, entry.status, expected
                    )));
                }
                *entry = session;
                Ok(())
            }
            None => Err(CoreError::NotFound {
                entity: "ChargeSession",
                field: "id",
                value: session.id.to_string(),
            }),
        }
    }

    async fn list_sessions_for_company(&self, company_id: i64) -> CoreResult<Vec<ChargeSession>> {
        Ok(self
            .sessions
            .iter()
            .filter(|s| s.chain.company_id == company_id)
            .map(|s| s.clone())
            .collect())
    }

    async fn claim_connector(&self, chain: ConnectorChain, session_id: i64) -> CoreResult<()> {
        match self.connector_claims.entry(chain) {
            Entry::Occupied(_) => Err(CoreError::ConnectorBusy {
                charger_id: chain.charger_id,
                connector_id: chain.connector_id,
            }),
            Entry::Vacant(v) => {
                v.insert(session_id);
                Ok(())
            }
        }
    }

    async fn release_connector(&self, chain: ConnectorChain, session_id: i64) -> CoreResult<()> {
        // releasing a claim another session holds is a no-op
        self.connector_claims
            .remove_if(&chain, |_, holder| *holder == session_id);
        Ok(())
    }

    async fn record_billing(
        &self,
        session: ChargeSession,
        mut transaction: PaymentTransaction,
    ) -> CoreResult<PaymentTransaction> {
        // reserve the intent id first so duplicates never reach the table
        match self.intent_index.entry(transaction.intent_id.clone()) {
            Entry::Occupied(_) => {
                return Err(CoreError::InvariantViolation(format!(
                    "payment intent '{}' already recorded",
                    transaction.intent_id
                )))
            }
            Entry::Vacant(v) => v.insert(0),
        };

        let mut entry = match self.sessions.get_mut(&session.id) {
            Some(entry) => entry,
            None => {
                self.intent_index.remove(&transaction.intent_id);
                return Err(CoreError::NotFound {
                    entity: "ChargeSession",
                    field: "id",
                    value: session.id.to_string(),
                });
            }
        };
        if entry.status != SessionStatus::Ended {
            let status = entry.status;
            drop(entry);
            self.intent_index.remove(&transaction.intent_id);
            return Err(CoreError::InvariantViolation(format!(
                "session {} is {}, expected Ended",
                session.id, status
            )));
        }

        transaction.id = Self::next(&self.transaction_counter);
        let mut session = session;
        session.payment_id = Some(transaction.id);
        self.intent_index
            .insert(transaction.intent_id.clone(), transaction.id);
        self.transactions.insert(transaction.id, transaction.clone());
        *entry = session;
        Ok(transaction)
    }

    async fn append_event(&self, mut event: EventData) -> CoreResult<EventData> {
        event.id = Self::next(&self.event_counter);
        self.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn list_events_for_session(&self, session_id: i64) -> CoreResult<Vec<EventData>> {
        let mut events: Vec<EventData> = self
            .events
            .iter()
            .filter(|e| e.session_id == Some(session_id))
            .map(|e| e.clone())
            .collect();
        events.sort_by_key(|e| e.id);
        Ok(events)
    }

    async fn list_events_for_charger(&self, chain: ChargerChain) -> CoreResult<Vec<EventData>> {
        let mut events: Vec<EventData> = self
            .events
            .iter()
            .filter(|e| e.charger_chain() == chain)
            .map(|e| e.clone())
            .collect();
        events.sort_by_key(|e| e.id);
        Ok(events)
    }

    async fn get_payment_transaction(&self, id: i64) -> CoreResult<Option<PaymentTransaction>> {
        Ok(self.transactions.get(&id).map(|t| t.clone()))
    }

    async fn find_transaction_by_intent(
        &self,
        intent_id: &str,
    ) -> CoreResult<Option<PaymentTransaction>> {
        let id = match self.intent_index.get(intent_id) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.transactions.get(&id).map(|t| t.clone()))
    }

    async fn update_payment_transaction(&self, transaction: PaymentTransaction) -> CoreResult<()> {
        match self.transactions.get_mut(&transaction.id) {
            Some(mut entry) => {
                *entry = transaction;
                Ok(())
            }
            None => Err(CoreError::NotFound {
                entity: "PaymentTransaction",
                field: "id",
                value: transaction.id.to_string(),
            }),
        }
    }

    async fn list_transactions_for_company(
        &self,
        company_id: i64,
    ) -> CoreResult<Vec<PaymentTransaction>> {
        Ok(self
            .transactions
            .iter()
            .filter(|t| t.company_id == company_id)
            .map(|t| t.clone())
            .collect())
    }
}

// ── Tests ──────────────────────────────────────────────────────
