//! Search both stores, pick a result, download it.

use std::time::Instant;

use anyhow::Result;

use apkget_core::Reporter;
use apkget_core::catalog::{self, CatalogEntry};
use apkget_schema::{Store, StorePreference};

use super::Context;
use super::download::download_from;
use crate::Cli;
use crate::ui::menu::{self, MenuItem};

/// No query on the command line: ask for one.
pub async fn prompt_and_search(ctx: &Context, cli: &Cli) -> Result<()> {
    ctx.reporter.sync();
    let query = menu::prompt("Search")?;
    if query.is_empty() {
        return Ok(());
    }
    search_and_download(ctx, &query, cli).await
}

pub async fn search_and_download(ctx: &Context, query: &str, cli: &Cli) -> Result<()> {
    let start = Instant::now();
    ctx.reporter.section(&format!("Searching for '{query}'"));

    let entries = catalog::search(&ctx.clients(), ctx.store, query, ctx.reporter.as_ref()).await;
    if entries.is_empty() {
        ctx.reporter.info("No results found");
        return Ok(());
    }

    if !ctx.interactive {
        for entry in &entries {
            ctx.reporter.info(&format!(
                "{}  {}  {}",
                entry.package_id,
                entry.display_name,
                version_info(entry)
            ));
        }
        ctx.reporter
            .summary(entries.len(), "search", start.elapsed().as_secs_f64());
        return Ok(());
    }

    let items: Vec<MenuItem> = entries
        .iter()
        .map(|entry| {
            MenuItem::new(entry.display_name.as_str())
                .detail(format!("{} - {}", entry.package_id, version_info(entry)))
        })
        .collect();

    ctx.reporter.sync();
    let Some(choice) = menu::select("Search results", &items)? else {
        return Ok(());
    };
    let entry = &entries[choice];

    let store = if entry.on_both() {
        match choose_store(entry)? {
            Some(store) => StorePreference::from(store),
            None => return Ok(()),
        }
    } else {
        entry
            .stores
            .first()
            .map_or(ctx.store, |store| StorePreference::from(*store))
    };

    download_from(ctx, entry.package_id.clone(), store, cli).await
}

/// `Myket: 1200 ★ | Bazaar: 1100`, starring the newer listing.
fn version_info(entry: &CatalogEntry) -> String {
    let newer = entry.newer_store();
    let part = |store: Store, label: &str| {
        entry.version_on(store).map(|v| {
            if newer == Some(store) {
                format!("{label}: {v} ★")
            } else {
                format!("{label}: {v}")
            }
        })
    };
    [part(Store::Myket, "Myket"), part(Store::CafeBazaar, "Bazaar")]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" | ")
}

fn store_items(entry: &CatalogEntry) -> Vec<MenuItem> {
    let newer = entry.newer_store();
    [Store::Myket, Store::CafeBazaar]
        .into_iter()
        .map(|store| {
            let version = entry
                .version_on(store)
                .map_or_else(|| "unknown".to_string(), |v| v.to_string());
            let mut label = format!("{} (version: {version})", store.display_name());
            if newer == Some(store) {
                label.push_str(" ★ newer");
            }
            MenuItem::new(label)
        })
        .collect()
}

fn choose_store(entry: &CatalogEntry) -> Result<Option<Store>> {
    let choice = menu::select("Choose store", &store_items(entry))?;
    Ok(choice.map(|i| [Store::Myket, Store::CafeBazaar][i]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use apkget_schema::PackageId;

    fn entry(myket: Option<u64>, bazaar: Option<u64>) -> CatalogEntry {
        let mut stores = Vec::new();
        if myket.is_some() {
            stores.push(Store::Myket);
        }
        if bazaar.is_some() {
            stores.push(Store::CafeBazaar);
        }
        CatalogEntry {
            package_id: PackageId::parse("org.telegram.messenger").unwrap(),
            display_name: "Telegram".into(),
            myket_version: myket,
            bazaar_version: bazaar,
            stores,
        }
    }

    #[test]
    fn test_version_info_stars_newer_store() {
        assert_eq!(
            version_info(&entry(Some(1200), Some(1100))),
            "Myket: 1200 ★ | Bazaar: 1100"
        );
        assert_eq!(
            version_info(&entry(Some(1000), Some(1100))),
            "Myket: 1000 | Bazaar: 1100 ★"
        );
        assert_eq!(
            version_info(&entry(Some(1000), Some(1000))),
            "Myket: 1000 | Bazaar: 1000"
        );
    }

    #[test]
    fn test_version_info_single_store() {
        assert_eq!(version_info(&entry(None, Some(42))), "Bazaar: 42");
        assert_eq!(version_info(&entry(Some(7), None)), "Myket: 7");
    }

    #[test]
    fn test_store_items_mark_newer() {
        let items = store_items(&entry(Some(5), Some(9)));
        assert_eq!(items[0].label, "Myket (version: 5)");
        assert_eq!(items[1].label, "Cafe Bazaar (version: 9) ★ newer");
    }
}
