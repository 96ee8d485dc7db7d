//! Download one package and turn its splits into something installable.

use std::time::Instant;

use anyhow::Result;

use apkget_core::Reporter;
use apkget_core::merge::{MergeJob, MergeOutcome};
use apkget_core::tools::capability;
use apkget_schema::{MergeMethod, PackageId, PackageRequest, StorePreference};

use super::Context;
use super::flow::{RequestedPackage, StagedPackage};
use crate::Cli;
use crate::ui::menu::{self, MenuItem};

/// `--download PACKAGE` with the store preference from the context.
pub async fn download(ctx: &Context, package: &str, cli: &Cli) -> Result<()> {
    let package_id = PackageId::parse(package.trim())?;
    download_from(ctx, package_id, ctx.store, cli).await
}

/// Resolve, fetch and merge `package_id` using only the stores `store` allows.
pub async fn download_from(
    ctx: &Context,
    package_id: PackageId,
    store: StorePreference,
    cli: &Cli,
) -> Result<()> {
    let start = Instant::now();
    let request = PackageRequest::new(package_id, store, ctx.arch);

    let resolved = RequestedPackage::new(request).resolve(ctx).await;
    // A token minted during a failed lookup is still worth keeping.
    if let Err(e) = ctx.persist_token().await {
        tracing::warn!(error = %e, "could not save myket token");
    }
    let staged = resolved?.fetch(ctx).await?;
    let package = staged.set().package_id.clone();

    let merged = merge_staged(ctx, &staged, cli).await;
    let backed_out = matches!(merged, Ok(None));
    if cli.keep_splits || backed_out {
        let dir = staged.retain();
        ctx.reporter.info(&format!("Splits kept in {}", dir.display()));
    }

    match merged? {
        Some(MergeOutcome::Artifact(path)) => {
            ctx.reporter.success(&format!("Saved {}", path.display()));
        }
        Some(MergeOutcome::Installed { device }) => {
            ctx.reporter.success(&format!("Installed {package} on {device}"));
        }
        None => {
            ctx.reporter.warning("No merge method chosen");
            return Ok(());
        }
    }
    ctx.reporter.summary(1, "download", start.elapsed().as_secs_f64());
    Ok(())
}

/// Run the chosen method. In interactive mode a failed method offers the
/// remaining ones against the same staged files. `None` when the user backs
/// out of the menu.
async fn merge_staged(
    ctx: &Context,
    staged: &StagedPackage,
    cli: &Cli,
) -> Result<Option<MergeOutcome>> {
    let set = staged.set();
    let package = set.package_id.to_string();

    let mut method = match cli.method {
        Some(method) => method,
        // Nothing to merge; the bundle path just exports the base.
        None if set.is_monolithic() => MergeMethod::XapkBundle,
        None if ctx.interactive => match choose_method(ctx, &package, &[]).await? {
            Some(method) => method,
            None => return Ok(None),
        },
        None => MergeMethod::XapkBundle,
    };

    let mut failed = Vec::new();
    loop {
        let mut job = MergeJob::new(method, cli.output.clone());
        match staged.merge(ctx, &mut job).await {
            Ok(outcome) => return Ok(Some(outcome)),
            Err(e) if ctx.interactive && !matches!(e, apkget_core::Error::Cancelled) => {
                ctx.reporter.error(&format!("{method} failed: {e}"));
                failed.push(method);
                match choose_method(ctx, &package, &failed).await? {
                    Some(next) => method = next,
                    None => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Merge-method menu. Methods whose tools are missing, and methods that
/// already failed for this package, are shown but cannot be picked.
async fn choose_method(
    ctx: &Context,
    package: &str,
    failed: &[MergeMethod],
) -> Result<Option<MergeMethod>> {
    let gateway = ctx.gateway();
    let capabilities = tokio::task::spawn_blocking(move || capability::probe(&gateway)).await?;

    let items: Vec<MenuItem> = capabilities
        .iter()
        .map(|cap| {
            let tried = failed.contains(&cap.method);
            let status = if tried { "Failed" } else { cap.status.as_str() };
            MenuItem::new(format!("{}. {}", cap.method.index(), cap.method.name()))
                .detail(format!("{} ({status})", cap.method.description()))
                .enabled(cap.available && !tried)
        })
        .collect();

    ctx.reporter.sync();
    let choice = menu::select(&format!("Select merge method for {package}"), &items)?;
    Ok(choice.map(|i| capabilities[i].method))
}
