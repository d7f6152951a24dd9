//! Ancestor-chain value objects.
//!
//! Chargers and connectors are not globally unique: a charger is identified
//! by `(company, site, charger)` and a connector by the full four-part chain.
//! Every row below Company carries its complete ancestor chain, so a single
//! row can be tenant-checked without joins. These value objects are the typed
//! form of that chain and double as map keys in storage.

use std::fmt;

use serde::{Deserialize, Serialize};

/// `(company, site)` scope of a site-level row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiteChain {
    pub company_id: i64,
    pub site_id: i64,
}

/// `(company, site, charger)` identity of a charger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChargerChain {
    pub company_id: i64,
    pub site_id: i64,
    pub charger_id: i64,
}

/// `(company, site, charger, connector)` identity of a connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectorChain {
    pub company_id: i64,
    pub site_id: i64,
    pub charger_id: i64,
    pub connector_id: i64,
}

impl SiteChain {
    pub fn new(company_id: i64, site_id: i64) -> Self {
        Self {
            company_id,
            site_id,
        }
    }
}

impl ChargerChain {
    pub fn new(company_id: i64, site_id: i64, charger_id: i64) -> Self {
        Self {
            company_id,
            site_id,
            charger_id,
        }
    }

    pub fn site(&self) -> SiteChain {
        SiteChain::new(self.company_id, self.site_id)
    }
}

impl ConnectorChain {
    pub fn new(company_id: i64, site_id: i64, charger_id: i64, connector_id: i64) -> Self {
        Self {
            company_id,
            site_id,
            charger_id,
            connector_id,
        }
    }

    pub fn charger(&self) -> ChargerChain {
        ChargerChain::new(self.company_id, self.site_id, self.charger_id)
    }

    pub fn site(&self) -> SiteChain {
        SiteChain::new(self.company_id, self.site_id)
    }
}

impl fmt::Display for SiteChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.company_id, self.site_id)
    }
}

impl fmt::Display for ChargerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.company_id, self.site_id, self.charger_id)
    }
}

impl fmt::Display for ConnectorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.company_id, self.site_id, self.charger_id, self.connector_id
        )
    }
}

// ── Tests ──────────────────────────────────────────────────────
