//! Tenant hierarchy management.
//!
//! Owns creation and resolution of the Company → SiteGroup/Site → Charger →
//! Connector tree. Every scoped reference (site group, payment method) is
//! checked against the owning company before a row is written; a disagreement
//! is a cross-tenant violation, not a not-found.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use validator::Validate;

use crate::domain::{
    Charger, ChargerChain, Company, Connector, ConnectorChain, NewCharger, NewCompany,
    NewConnector, NewSite, NewSiteGroup, Site, SiteChain, SiteGroup,
};
use crate::shared::{CoreError, CoreResult};
use crate::storage::Storage;

/// Fully resolved connector with its complete ancestor chain.
#[derive(Debug, Clone)]
pub struct ResolvedConnector {
    pub company: Company,
    pub site: Site,
    pub charger: Charger,
    pub connector: Connector,
}

impl ResolvedConnector {
    /// First disabled level in the chain, top down.
    pub fn disabled_level(&self) -> Option<&'static str> {
        if !self.company.enabled {
            Some("company")
        } else if !self.site.enabled {
            Some("site")
        } else if !self.charger.enabled {
            Some("charger")
        } else if !self.connector.enabled {
            Some("connector")
        } else {
            None
        }
    }
}

/// Service for building and traversing the tenant tree.
pub struct HierarchyRegistry {
    storage: Arc<dyn Storage>,
    default_utc_offset_minutes: i32,
}

impl HierarchyRegistry {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_default_offset(storage, 0)
    }

    /// Companies created without an explicit offset inherit this one.
    pub fn with_default_offset(storage: Arc<dyn Storage>, default_utc_offset_minutes: i32) -> Self {
        Self {
            storage,
            default_utc_offset_minutes,
        }
    }

    pub async fn create_company(&self, input: NewCompany) -> CoreResult<Company> {
        input
            .validate()
            .map_err(|e| CoreError::InvariantViolation(e.to_string()))?;
        if self.storage.find_company_by_name(&input.name).await?.is_some() {
            return Err(CoreError::DuplicateName {
                entity: "Company",
                name: input.name,
                scope: "global".to_string(),
            });
        }
        let now = Utc::now();
        let company = self
            .storage
            .insert_company(Company {
                id: 0,
                name: input.name,
                enabled: true,
                home_photo: input.home_photo,
                brand_colour: input.brand_colour,
                brand_logo: input.brand_logo,
                brand_favicon: input.brand_favicon,
                utc_offset_minutes: input
                    .utc_offset_minutes
                    .unwrap_or(self.default_utc_offset_minutes),
                created_at: now,
                updated_at: now,
            })
            .await?;
        info!(company_id = company.id, name = %company.name, "company created");
        Ok(company)
    }

    /// Flips the tenant-wide enabled flag. Disabling never deletes anything:
    /// descendants become read-only through admission checks while history
    /// stays queryable.
    pub async fn set_company_enabled(&self, id: i64, enabled: bool) -> CoreResult<Company> {
        let mut company = self.require_company(id).await?;
        company.enabled = enabled;
        company.updated_at = Utc::now();
        self.storage.update_company(company.clone()).await?;
        info!(company_id = id, enabled, "company enabled flag changed");
        Ok(company)
    }

    pub async fn create_site_group(&self, input: NewSiteGroup) -> CoreResult<SiteGroup> {
        input
            .validate()
            .map_err(|e| CoreError::InvariantViolation(e.to_string()))?;
        let company = self.require_enabled_company(input.company_id).await?;
        let taken = self
            .storage
            .list_site_groups(company.id)
            .await?
            .iter()
            .any(|g| g.name == input.name);
        if taken {
            return Err(CoreError::DuplicateName {
                entity: "SiteGroup",
                name: input.name,
                scope: format!("company {}", company.id),
            });
        }
        let now = Utc::now();
        self.storage
            .insert_site_group(SiteGroup {
                id: 0,
                company_id: company.id,
                name: input.name,
                enabled: true,
                created_at: now,
                updated_at: now,
            })
            .await
    }

    pub async fn create_site(&self, input: NewSite) -> CoreResult<Site> {
        input
            .validate()
            .map_err(|e| CoreError::InvariantViolation(e.to_string()))?;
        let company = self.require_enabled_company(input.company_id).await?;
        if let Some(group_id) = input.site_group_id {
            let group =
                self.storage
                    .get_site_group(group_id)
                    .await?
                    .ok_or(CoreError::NotFound {
                        entity: "SiteGroup",
                        field: "id",
                        value: group_id.to_string(),
                    })?;
            if group.company_id != company.id {
                return Err(CoreError::CrossTenantViolation(format!(
                    "site group {} belongs to company {}, not {}",
                    group_id, group.company_id, company.id
                )));
            }
        }
        let taken = self
            .storage
            .list_sites(company.id)
            .await?
            .iter()
            .any(|s| s.name == input.name);
        if taken {
            return Err(CoreError::DuplicateName {
                entity: "Site",
                name: input.name,
                scope: format!("company {}", company.id),
            });
        }
        let now = Utc::now();
        let site = self
            .storage
            .insert_site(Site {
                id: 0,
                company_id: company.id,
                name: input.name,
                enabled: true,
                site_group_id: input.site_group_id,
                address: input.address,
                city: input.city,
                region: input.region,
                country: input.country,
                zip_code: input.zip_code,
                geo_coord: input.geo_coord,
                tax_rate: input.tax_rate,
                contact_name: input.contact_name,
                contact_phone: input.contact_phone,
                contact_email: input.contact_email,
                created_at: now,
                updated_at: now,
            })
            .await?;
        info!(company_id = company.id, site_id = site.id, name = %site.name, "site created");
        Ok(site)
    }

    pub async fn create_charger(&self, input: NewCharger) -> CoreResult<Charger> {
        input
            .validate()
            .map_err(|e| CoreError::InvariantViolation(e.to_string()))?;
        let chain = input.chain;
        let company = self.require_enabled_company(chain.company_id).await?;
        let site = self.require_site(chain.site_id).await?;
        if site.company_id != company.id {
            return Err(CoreError::CrossTenantViolation(format!(
                "site {} belongs to company {}, not {}",
                site.id, site.company_id, company.id
            )));
        }
        if !site.enabled {
            return Err(CoreError::InvariantViolation(format!(
                "site {} is disabled",
                site.id
            )));
        }
        let name_taken = self
            .storage
            .list_chargers(chain.site())
            .await?
            .iter()
            .any(|c| c.name == input.name);
        if name_taken {
            return Err(CoreError::DuplicateName {
                entity: "Charger",
                name: input.name,
                scope: format!("site {}", chain.site()),
            });
        }
        if let Some(serial) = input.serial.as_deref() {
            if self.storage.find_charger_by_serial(serial).await?.is_some() {
                return Err(CoreError::DuplicateName {
                    entity: "Charger",
                    name: serial.to_string(),
                    scope: "serial numbers".to_string(),
                });
            }
        }
        if let Some(method_id) = input.payment_method_id {
            let method =
                self.storage
                    .get_payment_method(method_id)
                    .await?
                    .ok_or(CoreError::NotFound {
                        entity: "PaymentMethod",
                        field: "id",
                        value: method_id.to_string(),
                    })?;
            if method.company_id != company.id {
                return Err(CoreError::CrossTenantViolation(format!(
                    "payment method {} belongs to company {}, not {}",
                    method_id, method.company_id, company.id
                )));
            }
        }
        let now = Utc::now();
        let charger = self
            .storage
            .insert_charger(Charger {
                charger_id: chain.charger_id,
                company_id: chain.company_id,
                site_id: chain.site_id,
                name: input.name,
                enabled: true,
                brand: input.brand,
                model: input.model,
                charger_type: input.charger_type,
                serial: input.serial,
                access_type: input.access_type,
                active_24x7: input.active_24x7,
                schedule: input.schedule,
                geo_coord: input.geo_coord,
                payment_method_id: input.payment_method_id,
                is_online: false,
                availability: None,
                last_connected_at: None,
                last_heartbeat_at: None,
                firmware_version: input.firmware_version,
                created_at: now,
                updated_at: now,
            })
            .await?;
        info!(chain = %chain, name = %charger.name, "charger created");
        Ok(charger)
    }

    pub async fn create_connector(&self, input: NewConnector) -> CoreResult<Connector> {
        let chain = input.chain;
        let company = self.require_enabled_company(chain.company_id).await?;
        let site = self.require_site(chain.site_id).await?;
        if site.company_id != company.id {
            return Err(CoreError::CrossTenantViolation(format!(
                "site {} belongs to company {}, not {}",
                site.id, site.company_id, company.id
            )));
        }
        if !site.enabled {
            return Err(CoreError::InvariantViolation(format!(
                "site {} is disabled",
                site.id
            )));
        }
        let charger = self.require_charger(chain.charger()).await?;
        if !charger.enabled {
            return Err(CoreError::InvariantViolation(format!(
                "charger {} is disabled",
                charger.chain()
            )));
        }
        let now = Utc::now();
        self.storage
            .insert_connector(Connector {
                connector_id: chain.connector_id,
                company_id: chain.company_id,
                site_id: chain.site_id,
                charger_id: chain.charger_id,
                connector_type: input.connector_type,
                enabled: true,
                status: None,
                max_volt: input.max_volt,
                max_amp: input.max_amp,
                created_at: now,
                updated_at: now,
            })
            .await
    }

    /// Loads every level of a connector's ancestor chain.
    pub async fn resolve_connector(&self, chain: ConnectorChain) -> CoreResult<ResolvedConnector> {
        let company = self.require_company(chain.company_id).await?;
        let site = self.require_site(chain.site_id).await?;
        if site.company_id != company.id {
            return Err(CoreError::CrossTenantViolation(format!(
                "site {} belongs to company {}, not {}",
                site.id, site.company_id, company.id
            )));
        }
        let charger = self.require_charger(chain.charger()).await?;
        let connector =
            self.storage
                .get_connector(chain)
                .await?
                .ok_or(CoreError::NotFound {
                    entity: "Connector",
                    field: "chain",
                    value: chain.to_string(),
                })?;
        Ok(ResolvedConnector {
            company,
            site,
            charger,
            connector,
        })
    }

    pub async fn list_chargers(&self, site: SiteChain) -> CoreResult<Vec<Charger>> {
        self.storage.list_chargers(site).await
    }

    pub async fn list_connectors(&self, charger: ChargerChain) -> CoreResult<Vec<Connector>> {
        self.storage.list_connectors(charger).await
    }

    async fn require_company(&self, id: i64) -> CoreResult<Company> {
        self.storage
            .get_company(id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Company",
                field: "id",
                value: id.to_string(),
            })
    }

    async fn require_enabled_company(&self, id: i64) -> CoreResult<Company> {
        let company = self.require_company(id).await?;
        if !company.enabled {
            return Err(CoreError::InvariantViolation(format!(
                "company {} is disabled",
                id
            )));
        }
        Ok(company)
    }

    async fn require_site(&self, id: i64) -> CoreResult<Site> {
        self.storage.get_site(id).await?.ok_or(CoreError::NotFound {
            entity: "Site",
            field: "id",
            value: id.to_string(),
        })
    }

    async fn require_charger(&self, chain: ChargerChain) -> CoreResult<Charger> {
        self.storage
            .get_charger(chain)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Charger",
                field: "chain",
                value: chain.to_string(),
            })
    }
}

// ── Tests ──────────────────────────────────────────────────────
