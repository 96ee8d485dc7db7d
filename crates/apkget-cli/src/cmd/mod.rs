//! One-shot commands that run without a store request.

pub mod check;
pub mod config;
pub mod setup;

use anyhow::{Context as _, Result};

use apkget_core::Settings;
use apkget_core::tools::{ProcessGateway, ToolLocator};

/// Gateway over the configured tools directory.
async fn local_gateway() -> Result<(Settings, ProcessGateway)> {
    let settings = Settings::load_default()
        .await
        .context("Failed to load settings")?;
    let gateway = ProcessGateway::new(ToolLocator::new(settings.tools_dir()));
    Ok((settings, gateway))
}
