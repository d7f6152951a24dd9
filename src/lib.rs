//! Control-plane core for a multi-tenant EV charging network.
//!
//! Models the tenant hierarchy (Company → Site → Charger → Connector) with
//! composite ancestor-chain identities, runs the charging-session state
//! machine, and bills ended sessions against day/night tariffs with group
//! discounts. Payment transactions are reconciled asynchronously against an
//! external processor by intent id.
//!
//! Everything is driven through [`application::CoreServices`] over the
//! [`storage::Storage`] seam; [`storage::InMemoryStorage`] is the reference
//! backend.
//!
//! ```no_run
//! use chargenet_core::application::CoreServices;
//! use chargenet_core::domain::NewCompany;
//!
//! # async fn demo() -> chargenet_core::shared::CoreResult<()> {
//! let services = CoreServices::in_memory();
//! let company = services
//!     .hierarchy
//!     .create_company(NewCompany::named("Volt Co"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod shared;
pub mod storage;

pub use application::CoreServices;
pub use config::{init_tracing, AppConfig};
pub use shared::{CoreError, CoreResult};
