//! Request Flow Typestate Pattern
//!
//! Models one download as a series of explicit state transitions:
//!
//! ```text
//! RequestedPackage --[resolve()]--> ResolvedPackage --[fetch()]--> StagedPackage --[merge()]
//! ```
//!
//! A merge can only be started on splits that were fully downloaded and
//! size-checked, and a download only on a plan already narrowed to one
//! architecture. `StagedPackage::merge` borrows the staged set, so a failed
//! method can be followed by another one against the same files.

use std::path::PathBuf;
use std::sync::Arc;

use apkget_core::io::{Fetcher, ReqwestTransport, StagedSplitSet, StagingArea};
use apkget_core::merge::{MergeJob, MergeOutcome, Orchestrator};
use apkget_core::resolver::SelectionPlan;
use apkget_core::store::{Resolved, resolve_preferred};
use apkget_core::{Reporter, Result, staging_root};
use apkget_schema::{PackageRequest, Store};

use super::Context;

/// State 1: what the user asked for.
#[derive(Debug)]
pub struct RequestedPackage {
    request: PackageRequest,
}

impl RequestedPackage {
    pub fn new(request: PackageRequest) -> Self {
        Self { request }
    }

    /// Ask the preferred stores for the package and narrow the first usable
    /// manifest to the requested architecture.
    pub async fn resolve(self, ctx: &Context) -> Result<ResolvedPackage> {
        let request = &self.request;
        ctx.reporter.section(&format!(
            "Resolving {} for {} ({})",
            request.package_id,
            request.architecture,
            request.architecture.tag()
        ));
        for store in request.store.stores() {
            ctx.reporter.info(&format!("Trying {store}..."));
        }

        let resolved = resolve_preferred(&ctx.clients(), request).await?;
        ctx.reporter.success(&format!(
            "Found {} {} on {} ({} file{})",
            resolved.plan.package_id,
            resolved.plan.display_version,
            resolved.store,
            resolved.plan.splits.len(),
            if resolved.plan.splits.len() == 1 { "" } else { "s" }
        ));
        Ok(ResolvedPackage { resolved })
    }
}

/// State 2: a concrete split selection on one store.
#[derive(Debug)]
pub struct ResolvedPackage {
    resolved: Resolved,
}

impl ResolvedPackage {
    pub fn store(&self) -> Store {
        self.resolved.store
    }

    pub fn plan(&self) -> &SelectionPlan {
        &self.resolved.plan
    }

    /// Download every selected split into a fresh staging directory.
    pub async fn fetch(self, ctx: &Context) -> Result<StagedPackage> {
        let plan = &self.resolved.plan;
        let staging = StagingArea::create(&staging_root(), &plan.package_id)?;
        let transport = ReqwestTransport::new(ctx.client.clone());

        let set = Fetcher::new(&transport, ctx.reporter.as_ref())
            .with_cancellation(ctx.cancel.clone())
            .fetch(plan, staging)
            .await?;

        Ok(StagedPackage {
            store: self.resolved.store,
            set,
        })
    }
}

/// State 3: every split on disk, ready for any merge method.
#[derive(Debug)]
pub struct StagedPackage {
    store: Store,
    set: StagedSplitSet,
}

impl StagedPackage {
    pub fn store(&self) -> Store {
        self.store
    }

    pub fn set(&self) -> &StagedSplitSet {
        &self.set
    }

    pub async fn merge(&self, ctx: &Context, job: &mut MergeJob) -> Result<MergeOutcome> {
        let orchestrator = Orchestrator::new(Arc::new(ctx.gateway()))
            .with_reporter(ctx.reporter())
            .with_signing_key(ctx.settings.signing_key());
        orchestrator.merge(&self.set, job).await
    }

    /// Keep the raw splits on disk instead of removing them on drop.
    pub fn retain(self) -> PathBuf {
        self.set.retain()
    }
}
