//! Failure taxonomy for the fetch-and-merge pipeline.
//!
//! Every variant a user can hit carries the context needed to act on it
//! (package, store, architecture, split, tool) so the CLI never has to fall
//! back to a generic "something failed".

use std::path::PathBuf;

use apkget_schema::{Abi, Arch, PackageId, SchemaError, Store};
use thiserror::Error;

use crate::tools::Tool;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{package} was not found on {stores}")]
    PackageNotFound { package: PackageId, stores: String },

    #[error("{store} rejected the session token and a new one could not be issued: {reason}")]
    AuthenticationRequired { store: Store, reason: String },

    #[error(
        "{package} has no native split for {arch} (offered: {})",
        format_abis(offered)
    )]
    UnsupportedArchitecture {
        package: PackageId,
        arch: Arch,
        offered: Vec<Abi>,
    },

    #[error("Download of split '{split}' for {package} failed after {attempts} attempts: {last_error}")]
    PartialDownloadFailure {
        package: PackageId,
        split: String,
        attempts: u32,
        last_error: String,
    },

    #[error("{tool} is not installed (expected at {})", expected.display())]
    ToolNotInstalled { tool: Tool, expected: PathBuf },

    #[error("{tool} exited with {}: {}", format_exit(*exit_code), stderr.trim())]
    MergeToolFailed {
        tool: Tool,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("No device connected to adb (check `adb devices` and USB debugging)")]
    NoDeviceConnected,

    #[error("Device rejected the install: {message}")]
    InstallRejected { message: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Unexpected response from {store}: {message}")]
    Protocol { store: Store, message: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Tool setup failed: {0}")]
    Setup(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Process exit code for this failure kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::PackageNotFound { .. } => 2,
            Self::AuthenticationRequired { .. } => 3,
            Self::UnsupportedArchitecture { .. } => 4,
            Self::PartialDownloadFailure { .. } => 5,
            Self::ToolNotInstalled { .. } => 6,
            Self::MergeToolFailed { .. } => 7,
            Self::NoDeviceConnected => 8,
            Self::InstallRejected { .. } => 9,
            Self::Cancelled => 130,
            _ => 1,
        }
    }

    /// Whether a backend answered but simply does not carry the package.
    pub fn is_absence(&self) -> bool {
        matches!(self, Self::PackageNotFound { .. })
    }

    pub(crate) fn protocol(store: Store, message: impl std::fmt::Display) -> Self {
        Self::Protocol {
            store,
            message: message.to_string(),
        }
    }
}

fn format_abis(abis: &[Abi]) -> String {
    if abis.is_empty() {
        "none".to_string()
    } else {
        abis.iter()
            .map(Abi::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn format_exit(code: Option<i32>) -> String {
    code.map_or_else(|| "no exit code (killed)".to_string(), |c| format!("exit code {c}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_per_kind() {
        let pkg = PackageId::parse("com.example.app").unwrap();
        let errors = [
            Error::PackageNotFound {
                package: pkg.clone(),
                stores: "Myket".into(),
            },
            Error::AuthenticationRequired {
                store: Store::Myket,
                reason: "401".into(),
            },
            Error::UnsupportedArchitecture {
                package: pkg.clone(),
                arch: Arch::Arm64,
                offered: vec![Abi::X86],
            },
            Error::PartialDownloadFailure {
                package: pkg,
                split: "base".into(),
                attempts: 3,
                last_error: "reset".into(),
            },
            Error::ToolNotInstalled {
                tool: Tool::ApkEditor,
                expected: PathBuf::from("/tools/APKEditor.jar"),
            },
            Error::MergeToolFailed {
                tool: Tool::ApkSigner,
                exit_code: Some(1),
                stderr: String::new(),
            },
            Error::NoDeviceConnected,
            Error::InstallRejected {
                message: "INSTALL_FAILED_OLDER_SDK".into(),
            },
        ];

        let mut codes: Vec<i32> = errors.iter().map(Error::exit_code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
        assert!(codes.iter().all(|c| *c > 1));
    }

    #[test]
    fn test_messages_carry_context() {
        let err = Error::UnsupportedArchitecture {
            package: PackageId::parse("com.example.app").unwrap(),
            arch: Arch::Arm64,
            offered: vec![Abi::X86],
        };
        let msg = err.to_string();
        assert!(msg.contains("com.example.app"));
        assert!(msg.contains("arm64"));
        assert!(msg.contains("x86"));

        let err = Error::ToolNotInstalled {
            tool: Tool::Adb,
            expected: PathBuf::from("/opt/tools/platform-tools/adb"),
        };
        assert!(err.to_string().contains("/opt/tools/platform-tools/adb"));
    }
}
