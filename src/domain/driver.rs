//! Authentication users, driver groups and drivers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Authentication role. The numeric level feeds the authorization layer
/// outside this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    SuperAdmin,
    Admin,
    Driver,
}

impl UserRole {
    pub fn level(&self) -> u8 {
        match self {
            Self::SuperAdmin => 100,
            Self::Admin => 50,
            Self::Driver => 10,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "SuperAdmin",
            Self::Admin => "Admin",
            Self::Driver => "Driver",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Authentication identity. Credential storage (password hashes, tokens)
/// lives in the authentication subsystem, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// Globally unique
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub company_id: Option<i64>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct NewUser {
    #[validate(email)]
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub company_id: Option<i64>,
}

/// Groups drivers of one company under a required tariff and an optional
/// discount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverGroup {
    pub id: i64,
    pub company_id: i64,
    /// Unique within the company
    pub name: String,
    pub enabled: bool,
    pub tariff_id: i64,
    pub discount_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct NewDriverGroup {
    pub company_id: i64,
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub tariff_id: i64,
    pub discount_id: Option<i64>,
}

/// A person who charges vehicles. Auto-created drivers start as shells:
/// disabled, no company, no group, only name and phone copied from the user.
/// An administrator later provisions them with a company and a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: i64,
    /// `None` only while the record is a shell
    pub company_id: Option<i64>,
    pub full_name: String,
    /// Gates session admission
    pub enabled: bool,
    /// Unique within the company when present
    pub email: Option<String>,
    pub phone: Option<String>,
    pub group_id: Option<i64>,
    /// At most one driver per user; the provisioning idempotency key
    pub user_id: Option<i64>,
    pub notif_actions: bool,
    pub notif_payments: bool,
    pub notif_system: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Driver {
    /// Auto-created, awaiting administrative enrichment.
    pub fn is_shell(&self) -> bool {
        self.company_id.is_none() && self.group_id.is_none() && !self.enabled
    }
}

#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct NewDriver {
    pub company_id: i64,
    #[validate(length(min = 1, max = 160))]
    pub full_name: String,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub group_id: Option<i64>,
    pub enabled: bool,
}

// ── Tests ──────────────────────────────────────────────────────
