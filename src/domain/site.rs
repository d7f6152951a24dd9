//! Site and site-group entities, scoped to a company.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Optional grouping of sites within one company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteGroup {
    pub id: i64,
    pub company_id: i64,
    /// Unique within the company
    pub name: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A physical location hosting chargers. Name unique within the company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub id: i64,
    pub company_id: i64,
    pub name: String,
    pub enabled: bool,
    /// Must belong to the same company when set
    pub site_group_id: Option<i64>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub zip_code: Option<String>,
    pub geo_coord: Option<String>,
    pub tax_rate: Option<Decimal>,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct NewSiteGroup {
    pub company_id: i64,
    #[validate(length(min = 1, max = 120))]
    pub name: String,
}

#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct NewSite {
    pub company_id: i64,
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub site_group_id: Option<i64>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub zip_code: Option<String>,
    pub geo_coord: Option<String>,
    pub tax_rate: Option<Decimal>,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    #[validate(email)]
    pub contact_email: Option<String>,
}

impl NewSite {
    pub fn named(company_id: i64, name: impl Into<String>) -> Self {
        Self {
            company_id,
            name: name.into(),
            site_group_id: None,
            address: None,
            city: None,
            region: None,
            country: None,
            zip_code: None,
            geo_coord: None,
            tax_rate: None,
            contact_name: None,
            contact_phone: None,
            contact_email: None,
        }
    }
}
