//! Application services built on the [`Storage`](crate::storage::Storage)
//! seam.

pub mod billing;
pub mod hierarchy;
pub mod identity;
pub mod ledger;
pub mod ratebook;
pub mod reconcile;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

pub use billing::{compute_session_cost, BillingEngine};
pub use hierarchy::{HierarchyRegistry, ResolvedConnector};
pub use identity::IdentityBridge;
pub use ledger::{SessionLedger, TelemetryEvent};
pub use ratebook::RateBook;
pub use reconcile::PaymentReconciler;

use crate::config::AppConfig;
use crate::domain::{ChargeSession, CostBreakdown, PaymentTransaction};
use crate::shared::CoreResult;
use crate::storage::{InMemoryStorage, Storage};

/// All application services wired over one storage backend.
pub struct CoreServices {
    pub hierarchy: HierarchyRegistry,
    pub identity: IdentityBridge,
    pub ratebook: RateBook,
    pub ledger: SessionLedger,
    pub billing: BillingEngine,
    pub reconciler: PaymentReconciler,
}

impl CoreServices {
    pub fn new(storage: Arc<dyn Storage>, config: &AppConfig) -> Self {
        Self {
            hierarchy: HierarchyRegistry::with_default_offset(
                storage.clone(),
                config.billing.default_utc_offset_minutes,
            ),
            identity: IdentityBridge::new(storage.clone()),
            ratebook: RateBook::new(storage.clone()),
            ledger: SessionLedger::new(storage.clone()),
            billing: BillingEngine::new(storage.clone(), config.billing.currency.clone()),
            reconciler: PaymentReconciler::new(storage),
        }
    }

    /// In-memory backend with default configuration.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStorage::new()), &AppConfig::default())
    }

    /// Ends a session and bills it in one call, the normal stop path.
    pub async fn end_and_bill(
        &self,
        session_id: i64,
        ended_at: DateTime<Utc>,
        energy_kwh: Decimal,
        reason: Option<String>,
    ) -> CoreResult<(ChargeSession, PaymentTransaction, CostBreakdown)> {
        self.ledger
            .end_session(session_id, ended_at, energy_kwh, reason)
            .await?;
        self.billing.bill_session(session_id).await
    }
}
