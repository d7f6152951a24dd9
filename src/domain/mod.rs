//! Core business entities and value objects.

pub mod chain;
pub mod charger;
pub mod company;
pub mod discount;
pub mod driver;
pub mod payment;
pub mod rfid;
pub mod session;
pub mod site;
pub mod tariff;

pub use chain::{ChargerChain, ConnectorChain, SiteChain};
pub use charger::{Charger, Connector, DayWindow, NewCharger, NewConnector, WeeklySchedule};
pub use company::{Company, NewCompany};
pub use discount::{Discount, DiscountKind, NewDiscount};
pub use driver::{Driver, DriverGroup, NewDriver, NewDriverGroup, NewUser, User, UserRole};
pub use payment::{
    NewPaymentMethod, PaymentMethod, PaymentStatus, PaymentTransaction, ProcessorOutcome,
    SessionPaymentStatus, TransactionStatus,
};
pub use rfid::{NewRfidCard, RfidCard};
pub use session::{
    ChargeSession, EventData, Measurements, SessionInitiator, SessionStatus,
};
pub use site::{NewSite, NewSiteGroup, Site, SiteGroup};
pub use tariff::{CostBreakdown, NewTariff, RateBand, Tariff, TariffWindow};
