//! Payment methods and payment transactions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Record-level status of a payment transaction. Kept separate from
/// [`PaymentStatus`]: a transaction is recorded here before the external
/// processor confirms funds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    Pending,
    Completed,
    Canceled,
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
            Self::Canceled => write!(f, "canceled"),
        }
    }
}

/// Processor-side outcome status of the funds movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Failed,
    Canceled,
    Refunded,
}

impl PaymentStatus {
    /// How the owning session mirrors this status.
    pub fn session_status(&self) -> SessionPaymentStatus {
        match self {
            Self::Pending => SessionPaymentStatus::Pending,
            Self::Succeeded => SessionPaymentStatus::Paid,
            Self::Failed => SessionPaymentStatus::Failed,
            Self::Canceled => SessionPaymentStatus::Canceled,
            Self::Refunded => SessionPaymentStatus::Refunded,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Canceled => write!(f, "canceled"),
            Self::Refunded => write!(f, "refunded"),
        }
    }
}

/// Payment status as mirrored on the charge session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPaymentStatus {
    Pending,
    Paid,
    Failed,
    Canceled,
    Refunded,
}

impl std::fmt::Display for SessionPaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Paid => write!(f, "paid"),
            Self::Failed => write!(f, "failed"),
            Self::Canceled => write!(f, "canceled"),
            Self::Refunded => write!(f, "refunded"),
        }
    }
}

/// External processor outcome delivered through the webhook collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessorOutcome {
    Succeeded,
    Failed,
}

impl ProcessorOutcome {
    pub fn payment_status(&self) -> PaymentStatus {
        match self {
            Self::Succeeded => PaymentStatus::Succeeded,
            Self::Failed => PaymentStatus::Failed,
        }
    }
}

/// Company-scoped payment method reference data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: i64,
    pub company_id: i64,
    /// Unique within the company
    pub name: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct NewPaymentMethod {
    pub company_id: i64,
    #[validate(length(min = 1, max = 120))]
    pub name: String,
}

/// A recorded charge against a payment method, reconciled asynchronously
/// against the external processor's intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: i64,
    pub method_id: Option<i64>,
    pub driver_id: Option<i64>,
    pub company_id: i64,
    pub site_id: i64,
    pub charger_id: i64,
    pub session_id: Option<i64>,
    pub amount: Decimal,
    /// External processor intent id, globally unique. Reconciliation key.
    pub intent_id: String,
    pub status: TransactionStatus,
    pub payment_status: PaymentStatus,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ── Tests ──────────────────────────────────────────────────────
