//! apkget - split-APK fetcher CLI

use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use apkget_cli::{Cli, cmd, exit_code, ops};

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so they never tear the progress table on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    match run(cli, cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            let code = exit_code(&e);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli, cancel: CancellationToken) -> anyhow::Result<()> {
    if cli.config_dir {
        return cmd::config::print_config_dir();
    }
    if cli.check {
        return cmd::check::check(&cli).await;
    }
    if cli.setup {
        return cmd::setup::setup(&cli).await;
    }

    let ctx = ops::Context::from_cli(&cli, cancel).await?;
    if let Some(package) = &cli.download {
        ops::download::download(&ctx, package, &cli).await
    } else if let Some(query) = &cli.query {
        ops::search::search_and_download(&ctx, query, &cli).await
    } else if cli.interactive() {
        ops::search::prompt_and_search(&ctx, &cli).await
    } else {
        anyhow::bail!("nothing to do: pass a search term or --download PACKAGE (see --help)")
    }
}
