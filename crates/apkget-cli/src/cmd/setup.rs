//! `--setup`: download the external tools that are missing.

use std::time::{Duration, Instant};

use anyhow::{Context as _, Result, bail};

use apkget_core::tools::setup::ToolInstaller;
use apkget_core::tools::{Tool, ToolGateway};
use apkget_core::{Reporter, USER_AGENT};

use crate::Cli;
use crate::ui::Output;
use crate::ui::menu;

pub async fn setup(cli: &Cli) -> Result<()> {
    let start = Instant::now();
    let (settings, gateway) = super::local_gateway().await?;
    let tools_dir = settings.tools_dir();
    let output = Output::new();

    output.section(&format!("Tool setup ({})", tools_dir.display()));

    if gateway.locate(Tool::Java).is_err() {
        output.warning(
            "Java not found. APKEditor and uber-apk-signer need a JDK or JRE 11+ \
             from your package manager",
        );
    }

    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(15))
        .build()
        .context("Failed to build HTTP client")?;
    let installer = ToolInstaller::new(client, &tools_dir);

    let mut installed = 0;
    let mut failed = Vec::new();
    for tool in ToolInstaller::installable() {
        if let Ok(path) = gateway.locate(tool) {
            output.info(&format!("{tool} already installed at {}", path.display()));
            continue;
        }
        if cli.interactive() {
            output.sync();
            if !menu::confirm(&format!("Install {tool}?"), true)? {
                continue;
            }
        }

        output.info(&format!("Installing {tool}"));
        match installer.install(tool, &output).await {
            Ok(path) => {
                output.success(&format!("{tool} installed at {}", path.display()));
                installed += 1;
            }
            Err(e) => {
                output.error(&format!("{tool}: {e}"));
                failed.push(tool);
            }
        }
    }

    if !failed.is_empty() {
        output.sync();
        let names: Vec<&str> = failed.iter().map(Tool::display_name).collect();
        bail!("could not install {}", names.join(", "));
    }
    output.summary(installed, "setup", start.elapsed().as_secs_f64());
    Ok(())
}
