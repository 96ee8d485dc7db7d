//! Store backends.
//!
//! Myket and Cafe Bazaar speak different JSON dialects with different auth
//! models. Both are normalized here into [`ArtifactManifest`] and
//! [`SearchHit`], so nothing past this module sees a backend-specific field.

pub mod bazaar;
pub mod myket;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use apkget_schema::{Arch, ArtifactManifest, PackageId, PackageRequest, SearchHit, Store};

use crate::error::{Error, Result};
use crate::resolver::{SelectionPlan, select_splits};

pub use bazaar::BazaarClient;
pub use myket::MyketClient;

/// One store backend.
#[async_trait]
pub trait StoreClient: Send + Sync {
    fn store(&self) -> Store;

    /// Fetch download metadata for `package` as seen by a device of class `arch`.
    ///
    /// A package the store does not carry, has delisted, or restricts by
    /// region comes back as [`Error::PackageNotFound`].
    async fn resolve(&self, package: &PackageId, arch: Arch) -> Result<ArtifactManifest>;

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;
}

#[async_trait]
impl<T: StoreClient + ?Sized> StoreClient for Arc<T> {
    fn store(&self) -> Store {
        (**self).store()
    }

    async fn resolve(&self, package: &PackageId, arch: Arch) -> Result<ArtifactManifest> {
        (**self).resolve(package, arch).await
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        (**self).search(query).await
    }
}

/// A manifest from a named store, already narrowed to one architecture.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub store: Store,
    pub manifest: ArtifactManifest,
    pub plan: SelectionPlan,
}

/// Resolve `request` against the stores its preference allows, in order.
///
/// The first store whose manifest yields a usable selection wins. Absence on
/// one store moves on to the next. When nothing succeeds the most useful
/// error is reported: an incompatible architecture on a store that does carry
/// the package, then the first hard failure, then `PackageNotFound`.
pub async fn resolve_preferred(
    clients: &[Arc<dyn StoreClient>],
    request: &PackageRequest,
) -> Result<Resolved> {
    let stores = request.store.stores();
    let mut unsupported: Option<Error> = None;
    let mut failure: Option<Error> = None;

    for store in stores {
        let Some(client) = clients.iter().find(|c| c.store() == *store) else {
            debug!(%store, "no client configured, skipping");
            continue;
        };

        let outcome = match client.resolve(&request.package_id, request.architecture).await {
            Ok(manifest) => select_splits(&manifest, request.architecture).map(|plan| Resolved {
                store: *store,
                manifest,
                plan,
            }),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(resolved) => {
                debug!(%store, package = %request.package_id, "resolved");
                return Ok(resolved);
            }
            Err(e) if e.is_absence() => {
                debug!(%store, package = %request.package_id, "package absent");
            }
            Err(e @ Error::UnsupportedArchitecture { .. }) => {
                debug!(%store, error = %e, "no compatible split");
                unsupported.get_or_insert(e);
            }
            Err(e) => {
                warn!(%store, error = %e, "store lookup failed");
                failure.get_or_insert(e);
            }
        }
    }

    Err(unsupported.or(failure).unwrap_or_else(|| Error::PackageNotFound {
        package: request.package_id.clone(),
        stores: stores
            .iter()
            .map(Store::display_name)
            .collect::<Vec<_>>()
            .join(" or "),
    }))
}

pub(crate) fn not_found(package: &PackageId, store: Store) -> Error {
    Error::PackageNotFound {
        package: package.clone(),
        stores: store.display_name().to_string(),
    }
}
