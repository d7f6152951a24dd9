//! Storage trait definitions.
//!
//! Each method is an atomicity boundary: implementations must apply it fully
//! or not at all. The connector-claim and guarded-update methods carry the
//! serialization requirements of session admission and billing.

pub mod memory;

use async_trait::async_trait;

use crate::domain::{
    ChargeSession, Charger, ChargerChain, Company, Connector, ConnectorChain, Discount, Driver,
    DriverGroup, EventData, PaymentMethod, PaymentTransaction, RfidCard, SessionStatus, Site,
    SiteChain, SiteGroup, Tariff, User,
};
use crate::shared::CoreResult;

pub use memory::InMemoryStorage;

/// Persistence seam for all core components.
#[async_trait]
pub trait Storage: Send + Sync {
    // Company operations
    async fn insert_company(&self, company: Company) -> CoreResult<Company>;
    async fn get_company(&self, id: i64) -> CoreResult<Option<Company>>;
    async fn find_company_by_name(&self, name: &str) -> CoreResult<Option<Company>>;
    async fn update_company(&self, company: Company) -> CoreResult<()>;
    async fn list_companies(&self) -> CoreResult<Vec<Company>>;

    // Site group operations
    async fn insert_site_group(&self, group: SiteGroup) -> CoreResult<SiteGroup>;
    async fn get_site_group(&self, id: i64) -> CoreResult<Option<SiteGroup>>;
    async fn list_site_groups(&self, company_id: i64) -> CoreResult<Vec<SiteGroup>>;

    // Site operations
    async fn insert_site(&self, site: Site) -> CoreResult<Site>;
    async fn get_site(&self, id: i64) -> CoreResult<Option<Site>>;
    async fn list_sites(&self, company_id: i64) -> CoreResult<Vec<Site>>;

    // Charger operations (composite natural key)
    async fn insert_charger(&self, charger: Charger) -> CoreResult<Charger>;
    async fn get_charger(&self, chain: ChargerChain) -> CoreResult<Option<Charger>>;
    async fn list_chargers(&self, site: SiteChain) -> CoreResult<Vec<Charger>>;
    async fn find_charger_by_serial(&self, serial: &str) -> CoreResult<Option<Charger>>;
    async fn update_charger(&self, charger: Charger) -> CoreResult<()>;

    // Connector operations
    async fn insert_connector(&self, connector: Connector) -> CoreResult<Connector>;
    async fn get_connector(&self, chain: ConnectorChain) -> CoreResult<Option<Connector>>;
    async fn list_connectors(&self, charger: ChargerChain) -> CoreResult<Vec<Connector>>;

    // Tariff operations
    async fn insert_tariff(&self, tariff: Tariff) -> CoreResult<Tariff>;
    async fn get_tariff(&self, id: i64) -> CoreResult<Option<Tariff>>;
    async fn list_tariffs(&self, company_id: i64) -> CoreResult<Vec<Tariff>>;
    async fn find_default_tariff(&self, company_id: i64) -> CoreResult<Option<Tariff>>;

    // Discount operations
    async fn insert_discount(&self, discount: Discount) -> CoreResult<Discount>;
    async fn get_discount(&self, id: i64) -> CoreResult<Option<Discount>>;
    async fn list_discounts(&self, company_id: i64) -> CoreResult<Vec<Discount>>;

    // Driver group operations
    async fn insert_driver_group(&self, group: DriverGroup) -> CoreResult<DriverGroup>;
    async fn get_driver_group(&self, id: i64) -> CoreResult<Option<DriverGroup>>;
    async fn list_driver_groups(&self, company_id: i64) -> CoreResult<Vec<DriverGroup>>;

    // User operations
    async fn insert_user(&self, user: User) -> CoreResult<User>;
    async fn get_user(&self, id: i64) -> CoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> CoreResult<Option<User>>;
    async fn update_user(&self, user: User) -> CoreResult<()>;

    // Driver operations
    async fn insert_driver(&self, driver: Driver) -> CoreResult<Driver>;
    /// Atomic insert of a user-bound driver: when the user already has a
    /// driver, the existing record is returned and nothing is written.
    /// Concurrent provisioning races through here.
    async fn insert_driver_for_user(&self, driver: Driver) -> CoreResult<Driver>;
    async fn get_driver(&self, id: i64) -> CoreResult<Option<Driver>>;
    /// Provisioning idempotency lookup: at most one driver per user.
    async fn find_driver_by_user(&self, user_id: i64) -> CoreResult<Option<Driver>>;
    async fn find_driver_by_email(&self, company_id: i64, email: &str)
        -> CoreResult<Option<Driver>>;
    async fn update_driver(&self, driver: Driver) -> CoreResult<()>;
    async fn list_drivers(&self, company_id: i64) -> CoreResult<Vec<Driver>>;

    // RFID card operations
    async fn insert_rfid_card(&self, card: RfidCard) -> CoreResult<RfidCard>;
    async fn get_rfid_card(&self, card_id: &str) -> CoreResult<Option<RfidCard>>;
    async fn update_rfid_card(&self, card: RfidCard) -> CoreResult<()>;

    // Payment method operations
    async fn insert_payment_method(&self, method: PaymentMethod) -> CoreResult<PaymentMethod>;
    async fn get_payment_method(&self, id: i64) -> CoreResult<Option<PaymentMethod>>;
    async fn list_payment_methods(&self, company_id: i64) -> CoreResult<Vec<PaymentMethod>>;

    // Session operations
    async fn next_session_id(&self) -> i64;
    async fn insert_session(&self, session: ChargeSession) -> CoreResult<ChargeSession>;
    async fn get_session(&self, id: i64) -> CoreResult<Option<ChargeSession>>;
    /// Compare-and-swap update: fails with `InvariantViolation` unless the
    /// stored session still has `expected` status. State transitions race
    /// through here.
    async fn update_session_if_status(
        &self,
        session: ChargeSession,
        expected: SessionStatus,
    ) -> CoreResult<()>;
    async fn list_sessions_for_company(&self, company_id: i64) -> CoreResult<Vec<ChargeSession>>;

    // Connector claims: the uniqueness constraint behind the one-active-
    // session-per-connector invariant. Claiming an already-claimed connector
    // is `ConnectorBusy`.
    async fn claim_connector(&self, chain: ConnectorChain, session_id: i64) -> CoreResult<()>;
    async fn release_connector(&self, chain: ConnectorChain, session_id: i64) -> CoreResult<()>;

    /// Atomic `Ended → Billed`: persists the billed session and its payment
    /// transaction together, verifying the stored session is still `Ended`.
    /// This is the exactly-once billing boundary.
    async fn record_billing(
        &self,
        session: ChargeSession,
        transaction: PaymentTransaction,
    ) -> CoreResult<PaymentTransaction>;

    // Event operations (append-only)
    async fn append_event(&self, event: EventData) -> CoreResult<EventData>;
    async fn list_events_for_session(&self, session_id: i64) -> CoreResult<Vec<EventData>>;
    async fn list_events_for_charger(&self, chain: ChargerChain) -> CoreResult<Vec<EventData>>;

    // Payment transaction operations
    async fn get_payment_transaction(&self, id: i64) -> CoreResult<Option<PaymentTransaction>>;
    async fn find_transaction_by_intent(
        &self,
        intent_id: &str,
    ) -> CoreResult<Option<PaymentTransaction>>;
    async fn update_payment_transaction(&self, transaction: PaymentTransaction) -> CoreResult<()>;
    async fn list_transactions_for_company(
        &self,
        company_id: i64,
    ) -> CoreResult<Vec<PaymentTransaction>>;
}
