//! Tariff, discount and payment-method administration.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use validator::Validate;

use crate::domain::{
    Discount, NewDiscount, NewPaymentMethod, NewTariff, PaymentMethod, Tariff,
};
use crate::shared::{CoreError, CoreResult};
use crate::storage::Storage;

pub struct RateBook {
    storage: Arc<dyn Storage>,
}

impl RateBook {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Creates a tariff. The day and night windows must not overlap and a
    /// company holds at most one enabled default tariff.
    pub async fn create_tariff(&self, input: NewTariff) -> CoreResult<Tariff> {
        input
            .validate()
            .map_err(|e| CoreError::InvariantViolation(e.to_string()))?;
        self.require_enabled_company(input.company_id).await?;
        let taken = self
            .storage
            .list_tariffs(input.company_id)
            .await?
            .iter()
            .any(|t| t.name == input.name);
        if taken {
            return Err(CoreError::DuplicateName {
                entity: "Tariff",
                name: input.name,
                scope: format!("company {}", input.company_id),
            });
        }
        if input.is_default {
            if let Some(existing) = self.storage.find_default_tariff(input.company_id).await? {
                return Err(CoreError::InvariantViolation(format!(
                    "company {} already has default tariff '{}'",
                    input.company_id, existing.name
                )));
            }
        }
        let now = Utc::now();
        let tariff = Tariff {
            id: 0,
            company_id: input.company_id,
            name: input.name,
            enabled: true,
            rate_daytime: input.rate_daytime,
            rate_nighttime: input.rate_nighttime,
            daytime: input.daytime,
            nighttime: input.nighttime,
            fixed_start_fee: input.fixed_start_fee,
            idle_fee: input.idle_fee,
            idle_apply_after_min: input.idle_apply_after_min,
            is_default: input.is_default,
            created_at: now,
            updated_at: now,
        };
        tariff.check_windows()?;
        let tariff = self.storage.insert_tariff(tariff).await?;
        info!(
            company_id = tariff.company_id,
            tariff_id = tariff.id,
            name = %tariff.name,
            is_default = tariff.is_default,
            "tariff created"
        );
        Ok(tariff)
    }

    pub async fn create_discount(&self, input: NewDiscount) -> CoreResult<Discount> {
        input
            .validate()
            .map_err(|e| CoreError::InvariantViolation(e.to_string()))?;
        self.require_enabled_company(input.company_id).await?;
        let taken = self
            .storage
            .list_discounts(input.company_id)
            .await?
            .iter()
            .any(|d| d.name == input.name);
        if taken {
            return Err(CoreError::DuplicateName {
                entity: "Discount",
                name: input.name,
                scope: format!("company {}", input.company_id),
            });
        }
        let now = Utc::now();
        let discount = Discount {
            id: 0,
            company_id: input.company_id,
            name: input.name,
            enabled: true,
            kind: input.kind,
            value: input.value,
            valid_from: input.valid_from,
            valid_until: input.valid_until,
            created_at: now,
            updated_at: now,
        };
        discount.check_range()?;
        self.storage.insert_discount(discount).await
    }

    pub async fn create_payment_method(
        &self,
        input: NewPaymentMethod,
    ) -> CoreResult<PaymentMethod> {
        input
            .validate()
            .map_err(|e| CoreError::InvariantViolation(e.to_string()))?;
        self.require_enabled_company(input.company_id).await?;
        let taken = self
            .storage
            .list_payment_methods(input.company_id)
            .await?
            .iter()
            .any(|m| m.name == input.name);
        if taken {
            return Err(CoreError::DuplicateName {
                entity: "PaymentMethod",
                name: input.name,
                scope: format!("company {}", input.company_id),
            });
        }
        let now = Utc::now();
        self.storage
            .insert_payment_method(PaymentMethod {
                id: 0,
                company_id: input.company_id,
                name: input.name,
                enabled: true,
                created_at: now,
                updated_at: now,
            })
            .await
    }

    pub async fn list_tariffs(&self, company_id: i64) -> CoreResult<Vec<Tariff>> {
        self.storage.list_tariffs(company_id).await
    }

    pub async fn list_discounts(&self, company_id: i64) -> CoreResult<Vec<Discount>> {
        self.storage.list_discounts(company_id).await
    }

    async fn require_enabled_company(&self, id: i64) -> CoreResult<()> {
        let company = self
            .storage
            .get_company(id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Company",
                field: "id",
                value: id.to_string(),
            })?;
        if !company.enabled {
            return Err(CoreError::InvariantViolation(format!(
                "company {} is disabled",
                id
            )));
        }
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::hierarchy::HierarchyRegistry;
    use crate::domain::{NewCompany, TariffWindow};
    use chrono::NaiveTime;
    use rust_decimal::Decimal;
    use crate::storage::InMemoryStorage;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    async fn setup() -> (RateBook, i64) {
        let storage = Arc::new(InMemoryStorage::new());
        let registry = HierarchyRegistry::new(storage.clone());
        let company = registry
            .create_company(NewCompany::named("Volt Co"))
            .await
            .unwrap();
        (RateBook::new(storage), company.id)
    }

    #[tokio::test]
    async fn second_default_tariff_rejected() {
        let (book, company_id) = setup().await;
        let mut first = NewTariff::flat(company_id, "Standard", dec("0.40"));
        first.is_default = true;
        book.create_tariff(first).await.unwrap();

        let mut second = NewTariff::flat(company_id, "Premium", dec("0.50"));
        second.is_default = true;
        let err = book.create_tariff(second).await.unwrap_err();
        assert!(matches!(err, CoreError::InvariantViolation(_)));
    }

    #[tokio::test]
    async fn overlapping_windows_rejected_at_creation() {
        let (book, company_id) = setup().await;
        let mut input = NewTariff::flat(company_id, "Bad", dec("0.40"));
        input.rate_nighttime = Some(dec("0.25"));
        input.daytime = Some(TariffWindow::new(t(6, 0), t(22, 0)));
        input.nighttime = Some(TariffWindow::new(t(21, 0), t(6, 0)));
        assert!(book.create_tariff(input).await.is_err());
    }

    #[tokio::test]
    async fn tariff_names_unique_per_company() {
        let (book, company_id) = setup().await;
        book.create_tariff(NewTariff::flat(company_id, "Standard", dec("0.40")))
            .await
            .unwrap();
        let err = book
            .create_tariff(NewTariff::flat(company_id, "Standard", dec("0.50")))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateName { .. }));
    }
}
