//! Platform-wide catalog counters shown alongside the order statistics.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogProduct {
    pub id: String,
    #[serde(default)]
    pub is_active: bool,
}

/// Raw counters as exported from the backend: user and store row counts
/// plus the product list with its activity flag.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub users: Option<u64>,
    #[serde(default)]
    pub stores: Option<u64>,
    #[serde(default)]
    pub products: Vec<CatalogProduct>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogCounts {
    pub total_users: u64,
    pub total_stores: u64,
    pub total_products: u64,
    pub active_products: u64,
}

impl CatalogCounts {
    pub fn from_snapshot(snapshot: &CatalogSnapshot) -> Self {
        CatalogCounts {
            total_users: snapshot.users.unwrap_or(0),
            total_stores: snapshot.stores.unwrap_or(0),
            total_products: snapshot.products.len() as u64,
            active_products: snapshot.products.iter().filter(|p| p.is_active).count() as u64,
        }
    }

    pub fn inactive_products(&self) -> u64 {
        self.total_products.saturating_sub(self.active_products)
    }
}
