//! Users, drivers, driver groups and RFID cards.
//!
//! Bridges the authentication identity (User) to the charging identity
//! (Driver). Creating a user with the Driver role auto-provisions a shell
//! driver exactly once per user; administrators later enrich the shell with
//! a company and group.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use validator::Validate;

use crate::domain::{
    Driver, DriverGroup, NewDriver, NewDriverGroup, NewRfidCard, NewUser, RfidCard, User, UserRole,
};
use crate::shared::{CoreError, CoreResult};
use crate::storage::Storage;

pub struct IdentityBridge {
    storage: Arc<dyn Storage>,
}

impl IdentityBridge {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Creates an authentication user. Driver-role users get a shell driver
    /// record in the same call; the shell is returned alongside.
    pub async fn create_user(&self, input: NewUser) -> CoreResult<(User, Option<Driver>)> {
        input
            .validate()
            .map_err(|e| CoreError::InvariantViolation(e.to_string()))?;
        if self.storage.find_user_by_email(&input.email).await?.is_some() {
            return Err(CoreError::DuplicateName {
                entity: "User",
                name: input.email,
                scope: "global".to_string(),
            });
        }
        let now = Utc::now();
        let user = self
            .storage
            .insert_user(User {
                id: 0,
                email: input.email,
                first_name: input.first_name,
                last_name: input.last_name,
                phone: input.phone,
                role: input.role,
                company_id: input.company_id,
                enabled: true,
                created_at: now,
                updated_at: now,
            })
            .await?;
        info!(user_id = user.id, role = %user.role, "user created");

        let driver = if user.role == UserRole::Driver {
            Some(self.provision_driver_for_user(user.id).await?)
        } else {
            None
        };
        Ok((user, driver))
    }

    /// Idempotent: returns the existing driver when the user already has one,
    /// otherwise creates a disabled shell carrying only name and phone. The
    /// insert reserves the user id in storage, so concurrent invocations for
    /// one user still produce a single driver.
    pub async fn provision_driver_for_user(&self, user_id: i64) -> CoreResult<Driver> {
        if let Some(existing) = self.storage.find_driver_by_user(user_id).await? {
            return Ok(existing);
        }
        let user = self
            .storage
            .get_user(user_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "User",
                field: "id",
                value: user_id.to_string(),
            })?;
        let now = Utc::now();
        let driver = self
            .storage
            .insert_driver_for_user(Driver {
                id: 0,
                company_id: None,
                full_name: format!("{} {}", user.first_name, user.last_name),
                enabled: false,
                // only name and phone carry over; contact details stay on the user
                email: None,
                phone: user.phone.clone(),
                group_id: None,
                user_id: Some(user.id),
                notif_actions: false,
                notif_payments: false,
                notif_system: false,
                created_at: now,
                updated_at: now,
            })
            .await?;
        info!(user_id, driver_id = driver.id, "shell driver provisioned");
        Ok(driver)
    }

    pub async fn create_driver(&self, input: NewDriver) -> CoreResult<Driver> {
        input
            .validate()
            .map_err(|e| CoreError::InvariantViolation(e.to_string()))?;
        self.require_enabled_company(input.company_id).await?;
        if let Some(group_id) = input.group_id {
            let group = self.require_driver_group(group_id).await?;
            if group.company_id != input.company_id {
                return Err(CoreError::CrossTenantViolation(format!(
                    "driver group {} belongs to company {}, not {}",
                    group_id, group.company_id, input.company_id
                )));
            }
        }
        if let Some(email) = input.email.as_deref() {
            if self
                .storage
                .find_driver_by_email(input.company_id, email)
                .await?
                .is_some()
            {
                return Err(CoreError::DuplicateName {
                    entity: "Driver",
                    name: email.to_string(),
                    scope: format!("company {}", input.company_id),
                });
            }
        }
        let now = Utc::now();
        self.storage
            .insert_driver(Driver {
                id: 0,
                company_id: Some(input.company_id),
                full_name: input.full_name,
                enabled: input.enabled,
                email: input.email,
                phone: input.phone,
                group_id: input.group_id,
                user_id: None,
                notif_actions: true,
                notif_payments: true,
                notif_system: true,
                created_at: now,
                updated_at: now,
            })
            .await
    }

    /// Attaches a shell driver to a company and group, enabling it.
    pub async fn enrich_driver(
        &self,
        driver_id: i64,
        company_id: i64,
        group_id: Option<i64>,
    ) -> CoreResult<Driver> {
        let mut driver = self
            .storage
            .get_driver(driver_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Driver",
                field: "id",
                value: driver_id.to_string(),
            })?;
        self.require_enabled_company(company_id).await?;
        if let Some(group_id) = group_id {
            let group = self.require_driver_group(group_id).await?;
            if group.company_id != company_id {
                return Err(CoreError::CrossTenantViolation(format!(
                    "driver group {} belongs to company {}, not {}",
                    group_id, group.company_id, company_id
                )));
            }
        }
        if let Some(email) = driver.email.as_deref() {
            let owner = self.storage.find_driver_by_email(company_id, email).await?;
            if owner.map(|d| d.id != driver.id).unwrap_or(false) {
                return Err(CoreError::DuplicateName {
                    entity: "Driver",
                    name: email.to_string(),
                    scope: format!("company {}", company_id),
                });
            }
        }
        driver.company_id = Some(company_id);
        driver.group_id = group_id;
        driver.enabled = true;
        driver.updated_at = Utc::now();
        self.storage.update_driver(driver.clone()).await?;
        info!(driver_id, company_id, "driver enriched");
        Ok(driver)
    }

    pub async fn create_driver_group(&self, input: NewDriverGroup) -> CoreResult<DriverGroup> {
        input
            .validate()
            .map_err(|e| CoreError::InvariantViolation(e.to_string()))?;
        self.require_enabled_company(input.company_id).await?;
        let tariff = self
            .storage
            .get_tariff(input.tariff_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Tariff",
                field: "id",
                value: input.tariff_id.to_string(),
            })?;
        if tariff.company_id != input.company_id {
            return Err(CoreError::CrossTenantViolation(format!(
                "tariff {} belongs to company {}, not {}",
                tariff.id, tariff.company_id, input.company_id
            )));
        }
        if let Some(discount_id) = input.discount_id {
            let discount =
                self.storage
                    .get_discount(discount_id)
                    .await?
                    .ok_or(CoreError::NotFound {
                        entity: "Discount",
                        field: "id",
                        value: discount_id.to_string(),
                    })?;
            if discount.company_id != input.company_id {
                return Err(CoreError::CrossTenantViolation(format!(
                    "discount {} belongs to company {}, not {}",
                    discount.id, discount.company_id, input.company_id
                )));
            }
        }
        let taken = self
            .storage
            .list_driver_groups(input.company_id)
            .await?
            .iter()
            .any(|g| g.name == input.name);
        if taken {
            return Err(CoreError::DuplicateName {
                entity: "DriverGroup",
                name: input.name,
                scope: format!("company {}", input.company_id),
            });
        }
        let now = Utc::now();
        self.storage
            .insert_driver_group(DriverGroup {
                id: 0,
                company_id: input.company_id,
                name: input.name,
                enabled: true,
                tariff_id: input.tariff_id,
                discount_id: input.discount_id,
                created_at: now,
                updated_at: now,
            })
            .await
    }

    pub async fn register_rfid_card(&self, input: NewRfidCard) -> CoreResult<RfidCard> {
        input
            .validate()
            .map_err(|e| CoreError::InvariantViolation(e.to_string()))?;
        self.require_enabled_company(input.company_id).await?;
        if self.storage.get_rfid_card(&input.card_id).await?.is_some() {
            return Err(CoreError::DuplicateName {
                entity: "RfidCard",
                name: input.card_id,
                scope: "global".to_string(),
            });
        }
        if let Some(driver_id) = input.driver_id {
            let driver =
                self.storage
                    .get_driver(driver_id)
                    .await?
                    .ok_or(CoreError::NotFound {
                        entity: "Driver",
                        field: "id",
                        value: driver_id.to_string(),
                    })?;
            if driver.company_id != Some(input.company_id) {
                return Err(CoreError::CrossTenantViolation(format!(
                    "driver {} does not belong to company {}",
                    driver_id, input.company_id
                )));
            }
        }
        let now = Utc::now();
        self.storage
            .insert_rfid_card(RfidCard {
                card_id: input.card_id,
                company_id: input.company_id,
                driver_id: input.driver_id,
                enabled: true,
                name_on: input.name_on,
                number_on: input.number_on,
                expiration: input.expiration,
                created_at: now,
                updated_at: now,
            })
            .await
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

    async fn require_driver_group(&self, id: i64) -> CoreResult<DriverGroup> {
        self.storage
            .get_driver_group(id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "DriverGroup",
                field: "id",
                value: id.to_string(),
            })
    }
}

// ── Tests ──────────────────────────────────────────────────────
