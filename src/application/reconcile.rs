//! Payment reconciliation against the external processor.
//!
//! Processor events arrive keyed by intent id and may be delivered more than
//! once. Applying an event is idempotent: a transaction already carrying the
//! target status is returned unchanged. The owning session mirrors the
//! outcome, moving to Reconciled on success and staying Billed with a failed
//! payment status otherwise, so failed charges can be retried out of band.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::domain::{
    PaymentStatus, PaymentTransaction, ProcessorOutcome, SessionStatus, TransactionStatus,
};
use crate::shared::{CoreError, CoreResult};
use crate::storage::Storage;

pub struct PaymentReconciler {
    storage: Arc<dyn Storage>,
}

impl PaymentReconciler {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Applies one processor event to the transaction recorded under its
    /// intent id. Unknown intents are an error: money moved for a charge we
    /// never recorded.
    pub async fn apply_processor_event(
        &self,
        intent_id: &str,
        outcome: ProcessorOutcome,
        occurred_at: DateTime<Utc>,
    ) -> CoreResult<PaymentTransaction> {
        let mut transaction = match self.storage.find_transaction_by_intent(intent_id).await? {
            Some(t) => t,
            None => {
                warn!(intent_id, "processor event for unknown transaction");
                return Err(CoreError::UnknownTransaction(intent_id.to_string()));
            }
        };

        let target = outcome.payment_status();
        if transaction.payment_status == target {
            // duplicate delivery
            return Ok(transaction);
        }

        transaction.payment_status = target;
        if target == PaymentStatus::Succeeded {
            transaction.status = TransactionStatus::Completed;
        }
        transaction.occurred_at = occurred_at;
        transaction.updated_at = Utc::now();
        self.storage
            .update_payment_transaction(transaction.clone())
            .await?;

        if let Some(session_id) = transaction.session_id {
            self.mirror_to_session(session_id, target).await?;
        }
        info!(
            intent_id,
            transaction_id = transaction.id,
            payment_status = %target,
            "processor event applied"
        );
        Ok(transaction)
    }

    async fn mirror_to_session(&self, session_id: i64, status: PaymentStatus) -> CoreResult<()> {
        let mut session = match self.storage.get_session(session_id).await? {
            Some(s) => s,
            None => {
                warn!(session_id, "billed transaction references a missing session");
                return Ok(());
            }
        };
        if session.status != SessionStatus::Billed {
            // already reconciled, or the event raced a manual correction
            return Ok(());
        }
        match status {
            PaymentStatus::Succeeded => session.mark_reconciled()?,
            _ => session.payment_status = Some(status.session_status()),
        }
        self.storage
            .update_session_if_status(session, SessionStatus::Billed)
            .await
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;

    #[tokio::test]
    async fn unknown_intent_is_an_error() {
        let reconciler = PaymentReconciler::new(Arc::new(InMemoryStorage::new()));
        let err = reconciler
            .apply_processor_event("pi_missing", ProcessorOutcome::Succeeded, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::UnknownTransaction(_)));
    }
}
