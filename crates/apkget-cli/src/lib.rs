//! apkget - split-APK fetcher for Myket and Cafe Bazaar
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_panics_doc)]
//!
//! Finds an Android app on Myket or Cafe Bazaar, downloads the splits a
//! device of the chosen architecture needs, and turns them into something
//! installable: an XAPK or APKS container, a merged APK, a signed APK, or a
//! direct `adb install-multiple`.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.config/apkget/        ($APKGET_HOME overrides)
//! ├── config.toml          # Myket token, tools dir, signing key
//! ├── tools/               # APKEditor.jar, uber-apk-signer.jar, platform-tools/
//! └── staging/             # One temporary directory per download
//! ```

pub mod cmd;
pub mod ops;
pub mod ui;

pub use apkget_core::USER_AGENT;

use std::path::PathBuf;

use clap::Parser;

use apkget_schema::{Arch, MergeMethod, StorePreference};

#[derive(Debug, Parser)]
#[command(name = "apkget")]
#[command(
    author,
    version,
    about = "Download split APKs from Myket and Cafe Bazaar and merge them",
    after_help = "Examples:\n  apkget telegram\n  apkget -d org.telegram.messenger -m 1\n  apkget -d com.example.app -a x86_64 -s bazaar -m 3 --no-interactive"
)]
pub struct Cli {
    /// Search term (interactive search and download)
    pub query: Option<String>,

    /// Download a package by its id
    #[arg(short, long, value_name = "PACKAGE")]
    pub download: Option<String>,

    /// Merge method: 1=XAPK 2=APKS 3=APKEditor 4=ADB install 5=merge+sign
    #[arg(short, long, value_parser = parse_method)]
    pub method: Option<MergeMethod>,

    /// Target architecture (arm64, arm32, x86, x86_64)
    #[arg(short, long, env = "APKGET_ARCH")]
    pub arch: Option<Arch>,

    /// Store to use (both, myket, bazaar)
    #[arg(short, long, env = "APKGET_STORE")]
    pub store: Option<StorePreference>,

    /// Output path for the produced artifact
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Keep the raw split files after merging
    #[arg(long)]
    pub keep_splits: bool,

    /// Show which merge methods are available
    #[arg(short, long)]
    pub check: bool,

    /// Download missing external tools
    #[arg(long)]
    pub setup: bool,

    /// Never prompt; use defaults for anything not given on the command line
    #[arg(long)]
    pub no_interactive: bool,

    /// Print the configuration directory
    #[arg(long)]
    pub config_dir: bool,
}

impl Cli {
    pub fn interactive(&self) -> bool {
        !self.no_interactive
    }
}

fn parse_method(s: &str) -> Result<MergeMethod, String> {
    s.parse::<MergeMethod>()
        .map_err(|_| format!("'{s}' is not a merge method (expected 1-5)"))
}

/// Process exit code for a failed run.
///
/// Walks the error chain for a core error so each failure kind keeps its own
/// code; anything else is a generic failure.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<apkget_core::Error>())
        .map_or(1, apkget_core::Error::exit_code)
}
