//! Downloads missing external tools into the tools directory.
//!
//! The jars come from the latest GitHub release of their projects, matched
//! by asset name. ADB comes from Google's platform-tools zip for the host OS.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use regex::Regex;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::reporter::{Phase, ProgressEvent, ProgressThrottle, Reporter};
use crate::tools::Tool;

const GITHUB_API: &str = "https://api.github.com";
const PLATFORM_TOOLS_BASE: &str = "https://dl.google.com/android/repository";

const APKEDITOR_REPO: &str = "REAndroid/APKEditor";
const APKEDITOR_ASSET: &str = r"APKEditor-.*\.jar$";
const SIGNER_REPO: &str = "patrickfav/uber-apk-signer";
const SIGNER_ASSET: &str = r"uber-apk-signer-.*\.jar$";

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    assets: Vec<Asset>,
}

#[derive(Debug, Deserialize)]
struct Asset {
    name: String,
    browser_download_url: String,
}

#[derive(Debug, Clone)]
pub struct ToolInstaller {
    client: reqwest::Client,
    tools_dir: PathBuf,
    github_api: String,
    platform_tools_base: String,
}

impl ToolInstaller {
    pub fn new(client: reqwest::Client, tools_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            tools_dir: tools_dir.into(),
            github_api: GITHUB_API.to_string(),
            platform_tools_base: PLATFORM_TOOLS_BASE.to_string(),
        }
    }

    /// Point the installer at other hosts (mirrors, test servers).
    pub fn with_endpoints(mut self, github_api: &str, platform_tools_base: &str) -> Self {
        self.github_api = github_api.trim_end_matches('/').to_string();
        self.platform_tools_base = platform_tools_base.trim_end_matches('/').to_string();
        self
    }

    /// Tools this installer can fetch. Java has to come from the system.
    pub fn installable() -> [Tool; 3] {
        [Tool::ApkEditor, Tool::ApkSigner, Tool::Adb]
    }

    /// Install `tool` and return its final path.
    pub async fn install(&self, tool: Tool, reporter: &dyn Reporter) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.tools_dir).await?;
        match tool {
            Tool::ApkEditor => {
                self.install_jar(APKEDITOR_REPO, APKEDITOR_ASSET, tool, reporter)
                    .await
            }
            Tool::ApkSigner => self.install_jar(SIGNER_REPO, SIGNER_ASSET, tool, reporter).await,
            Tool::Adb => self.install_platform_tools(reporter).await,
            Tool::Java => Err(Error::Setup(
                "Java cannot be installed automatically; install a JDK or JRE (11+) \
                 with your package manager"
                    .into(),
            )),
        }
    }

    async fn install_jar(
        &self,
        repo: &str,
        pattern: &str,
        tool: Tool,
        reporter: &dyn Reporter,
    ) -> Result<PathBuf> {
        let (tag, url) = self.latest_asset(repo, pattern).await?;
        reporter.info(&format!("{tool} {tag}"));

        let dest = self.tools_dir.join(tool.file_name());
        self.download(&url, &dest, tool, reporter).await?;
        info!(%tool, %tag, path = %dest.display(), "installed tool");
        Ok(dest)
    }

    async fn latest_asset(&self, repo: &str, pattern: &str) -> Result<(String, String)> {
        let url = format!("{}/repos/{repo}/releases/latest", self.github_api);
        debug!(%url, "querying latest release");

        let release: Release = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let re = Regex::new(pattern).map_err(|e| Error::Setup(e.to_string()))?;
        release
            .assets
            .into_iter()
            .find(|a| re.is_match(&a.name))
            .map(|a| (release.tag_name, a.browser_download_url))
            .ok_or_else(|| Error::Setup(format!("no asset matching {pattern} in {repo} latest release")))
    }

    /// Stream `url` to `dest` through a `.part` file.
    async fn download(
        &self,
        url: &str,
        dest: &Path,
        tool: Tool,
        reporter: &dyn Reporter,
    ) -> Result<u64> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .send()
            .await?
            .error_for_status()?;

        let total = response.content_length();
        let part = dest.with_extension("part");
        let mut file = tokio::fs::File::create(&part).await?;
        let mut stream = response.bytes_stream();
        let mut throttle = ProgressThrottle::new();
        let mut written: u64 = 0;
        let label = tool.display_name().to_string();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            if let Some(rate) = throttle.tick(written) {
                reporter.progress(&ProgressEvent {
                    split: label.clone(),
                    bytes_transferred: written,
                    total_bytes: total,
                    rate_bytes_per_sec: rate,
                    phase: Phase::Downloading,
                });
            }
        }
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&part, dest).await?;
        reporter.split_done(&label, written);
        Ok(written)
    }

    async fn install_platform_tools(&self, reporter: &dyn Reporter) -> Result<PathBuf> {
        let adb = self.tools_dir.join("platform-tools").join(Tool::Adb.file_name());
        if adb.is_file() {
            reporter.info(&format!("adb already installed at {}", adb.display()));
            return Ok(adb);
        }

        let os = platform_tools_os().ok_or_else(|| {
            Error::Setup(format!(
                "no platform-tools build for {}",
                std::env::consts::OS
            ))
        })?;
        let url = format!(
            "{}/platform-tools-latest-{os}.zip",
            self.platform_tools_base
        );

        let archive = self.tools_dir.join("platform-tools.zip");
        self.download(&url, &archive, Tool::Adb, reporter).await?;

        let dest = self.tools_dir.clone();
        let archive_for_task = archive.clone();
        tokio::task::spawn_blocking(move || extract_zip(&archive_for_task, &dest))
            .await
            .map_err(std::io::Error::other)??;
        let _ = tokio::fs::remove_file(&archive).await;

        if !adb.is_file() {
            return Err(Error::Setup(
                "adb executable not found after extracting platform-tools".into(),
            ));
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&adb, std::fs::Permissions::from_mode(0o755)).await?;
        }

        info!(path = %adb.display(), "installed platform-tools");
        Ok(adb)
    }
}

fn platform_tools_os() -> Option<&'static str> {
    match std::env::consts::OS {
        "linux" => Some("linux"),
        "macos" => Some("darwin"),
        "windows" => Some("windows"),
        _ => None,
    }
}

fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    let file = std::fs::File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            continue;
        };
        let out = dest_dir.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&out)?;
            continue;
        }
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut outfile = std::fs::File::create(&out)?;
        std::io::copy(&mut entry, &mut outfile)?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&out, std::fs::Permissions::from_mode(mode))?;
        }
    }
    Ok(())
}
