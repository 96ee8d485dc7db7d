//! Persisted settings (`config.toml`).
//!
//! The file is a flat table of string keys to string values. It is read once
//! per request and handed around explicitly; nothing in the core caches it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{Error, Result};

/// User settings read from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Myket device token from a previous authorisation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub myket_token: Option<String>,

    /// Where external tools are installed and looked up first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools_dir: Option<PathBuf>,

    /// Keystore used by the signing tool instead of its debug key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_keystore: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_alias: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_keystore_pass: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_key_pass: Option<String>,

    /// Keys this version does not know about, preserved on save.
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

/// Keystore parameters forwarded to the signing tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningKey {
    pub keystore: PathBuf,
    pub alias: Option<String>,
    pub keystore_pass: Option<String>,
    pub key_pass: Option<String>,
}

impl Settings {
    /// Load settings from `path`. A missing file yields the defaults.
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).await?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Load from the default location under the config directory.
    pub async fn load_default() -> Result<Self> {
        Self::load(&crate::config_path()).await
    }

    /// Write settings atomically (temp file, then rename).
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let temp_path = path.with_extension("toml.tmp");
        fs::write(&temp_path, &content).await?;
        fs::rename(&temp_path, path).await?;
        Ok(())
    }

    /// Effective tools directory.
    pub fn tools_dir(&self) -> PathBuf {
        self.tools_dir
            .clone()
            .unwrap_or_else(crate::default_tools_dir)
    }

    /// Signing key, if a keystore is configured.
    pub fn signing_key(&self) -> Option<SigningKey> {
        self.signing_keystore.as_ref().map(|keystore| SigningKey {
            keystore: keystore.clone(),
            alias: self.signing_alias.clone(),
            keystore_pass: self.signing_keystore_pass.clone(),
            key_pass: self.signing_key_pass.clone(),
        })
    }
}
