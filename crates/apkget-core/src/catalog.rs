//! Cross-store search results.
//!
//! Each store returns its own hit list; the catalog folds them into one row
//! per package with the version code each store lists.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use apkget_schema::{PackageId, SearchHit, Store, StorePreference};

use crate::reporter::Reporter;
use crate::store::StoreClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub package_id: PackageId,
    pub display_name: String,
    pub myket_version: Option<u64>,
    pub bazaar_version: Option<u64>,
    /// Stores carrying the package, in the order they reported it.
    pub stores: Vec<Store>,
}

impl CatalogEntry {
    pub fn version_on(&self, store: Store) -> Option<u64> {
        match store {
            Store::Myket => self.myket_version,
            Store::CafeBazaar => self.bazaar_version,
        }
    }

    pub fn on_both(&self) -> bool {
        self.stores.len() > 1
    }

    /// Store listing the strictly higher version code, when both list one.
    pub fn newer_store(&self) -> Option<Store> {
        match (self.myket_version, self.bazaar_version) {
            (Some(m), Some(b)) if m > b => Some(Store::Myket),
            (Some(m), Some(b)) if b > m => Some(Store::CafeBazaar),
            _ => None,
        }
    }

    /// `Myket`, `Bazaar` or `Both`.
    pub fn availability(&self) -> &'static str {
        match self.stores.as_slice() {
            [Store::Myket] => "Myket",
            [Store::CafeBazaar] => "Bazaar",
            _ => "Both",
        }
    }
}

/// Fold hits into one entry per package, first-seen order preserved.
pub fn aggregate(hits: impl IntoIterator<Item = SearchHit>) -> Vec<CatalogEntry> {
    let mut entries: Vec<CatalogEntry> = Vec::new();
    let mut index: HashMap<PackageId, usize> = HashMap::new();

    for hit in hits {
        let i = *index.entry(hit.package_id.clone()).or_insert_with(|| {
            entries.push(CatalogEntry {
                package_id: hit.package_id.clone(),
                display_name: hit.display_name.clone(),
                myket_version: None,
                bazaar_version: None,
                stores: Vec::new(),
            });
            entries.len() - 1
        });

        let entry = &mut entries[i];
        if !entry.stores.contains(&hit.store) {
            entry.stores.push(hit.store);
        }
        let slot = match hit.store {
            Store::Myket => &mut entry.myket_version,
            Store::CafeBazaar => &mut entry.bazaar_version,
        };
        if slot.is_none() {
            *slot = hit.version_code;
        }
    }
    entries
}

/// Search every store `preference` allows. A failing store is reported and
/// skipped so the other store's hits still come through.
pub async fn search(
    clients: &[Arc<dyn StoreClient>],
    preference: StorePreference,
    query: &str,
    reporter: &dyn Reporter,
) -> Vec<CatalogEntry> {
    let mut hits = Vec::new();
    // Myket first so its listing name wins, matching how results were always shown.
    let order = [Store::Myket, Store::CafeBazaar];
    for store in order.iter().filter(|s| preference.stores().contains(*s)) {
        let Some(client) = clients.iter().find(|c| c.store() == *store) else {
            continue;
        };
        match client.search(query).await {
            Ok(found) => hits.extend(found),
            Err(e) => {
                warn!(%store, error = %e, "search failed");
                reporter.warning(&format!("{store} search failed: {e}"));
            }
        }
    }
    aggregate(hits)
}
