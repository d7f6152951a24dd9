//! Core error taxonomy shared by every component.

use thiserror::Error;

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    /// A name-uniqueness check failed inside its scope (company, site, ...).
    /// Distinct from structural violations: the caller picked a taken name.
    #[error("Duplicate name: {entity} '{name}' already exists in {scope}")]
    DuplicateName {
        entity: &'static str,
        name: String,
        scope: String,
    },

    /// A row's ancestor-scoping columns disagree with its parent's.
    #[error("Cross-tenant violation: {0}")]
    CrossTenantViolation(String),

    /// Another session already holds the connector.
    #[error("Connector {connector_id} on charger {charger_id} is busy")]
    ConnectorBusy { charger_id: i64, connector_id: i64 },

    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    /// Neither the driver's group nor the company provides a tariff.
    #[error("No tariff available to bill session {0}")]
    MissingTariff(i64),

    /// A processor event referenced an intent id we never recorded.
    #[error("Unknown payment transaction for intent '{0}'")]
    UnknownTransaction(String),

    /// Catch-all for constraint breaches not otherwise classified.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl CoreError {
    /// Whether the error indicates caller error that must not be retried
    /// automatically, as opposed to a transient condition.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            CoreError::DuplicateName { .. }
                | CoreError::CrossTenantViolation(_)
                | CoreError::InvalidInterval(_)
                | CoreError::NotFound { .. }
        )
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = CoreError::NotFound {
            entity: "Company",
            field: "id",
            value: "42".to_string(),
        };
        assert_eq!(err.to_string(), "Not found: Company with id=42");
    }

    #[test]
    fn duplicate_name_display() {
        let err = CoreError::DuplicateName {
            entity: "Site",
            name: "Depot".to_string(),
            scope: "company 1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Duplicate name: Site 'Depot' already exists in company 1"
        );
    }

    #[test]
    fn caller_errors_are_not_retryable() {
        assert!(CoreError::CrossTenantViolation("x".into()).is_caller_error());
        assert!(!CoreError::ConnectorBusy {
            charger_id: 1,
            connector_id: 1
        }
        .is_caller_error());
    }
}
