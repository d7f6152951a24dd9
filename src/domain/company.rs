//! Company domain entity, the tenant root.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Tenant root. Never hard-deleted: disabling cascades a read-only state to
/// every descendant while history stays queryable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    /// Globally unique
    pub name: String,
    pub enabled: bool,
    pub home_photo: Option<String>,
    pub brand_colour: Option<String>,
    pub brand_logo: Option<String>,
    pub brand_favicon: Option<String>,
    /// Timezone context inherited by all descendant timestamps. The billing
    /// engine shifts session timestamps by this offset before classifying
    /// wall-clock minutes.
    pub utc_offset_minutes: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a company.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct NewCompany {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub home_photo: Option<String>,
    pub brand_colour: Option<String>,
    pub brand_logo: Option<String>,
    pub brand_favicon: Option<String>,
    pub utc_offset_minutes: Option<i32>,
}

impl NewCompany {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            home_photo: None,
            brand_colour: None,
            brand_logo: None,
            brand_favicon: None,
            utc_offset_minutes: None,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_fails_validation() {
        assert!(NewCompany::named("").validate().is_err());
        assert!(NewCompany::named("Volt Co").validate().is_ok());
    }
}
