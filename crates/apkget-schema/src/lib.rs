//! Shared domain types for apkget.
//!
//! These types describe what a store reports about a package and what the
//! rest of the pipeline works on. They carry no I/O so both the core library
//! and the CLI can depend on them freely.

pub mod arch;
pub mod method;
pub mod types;

pub use arch::*;
pub use method::MergeMethod;
pub use types::*;

/// Errors raised while parsing or validating domain values.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The string is not a reverse-domain package identifier.
    #[error("Invalid package id '{0}': expected reverse-domain form like com.example.app")]
    InvalidPackageId(String),

    /// Unknown architecture class.
    #[error("Unknown architecture: {0} (expected arm64, arm32, x86 or x86_64)")]
    UnknownArch(String),

    /// Unknown ABI tag.
    #[error("Unknown ABI: {0}")]
    UnknownAbi(String),

    /// Unknown store preference.
    #[error("Unknown store: {0} (expected both, myket or bazaar)")]
    UnknownStore(String),

    /// Unknown merge method.
    #[error("Unknown merge method: {0} (expected 1-5)")]
    UnknownMethod(String),

    /// A manifest without exactly one base split.
    #[error("Manifest for {package} has {count} base splits, expected exactly one")]
    BaseCount {
        /// Package the manifest describes.
        package: String,
        /// Number of base splits found.
        count: usize,
    },
}
