//! External tool gateway.
//!
//! Merging, signing and device installs are delegated to external programs
//! (APKEditor, uber-apk-signer, adb). Everything in the core talks to them
//! through [`ToolGateway`] so tests can substitute a fake that never spawns
//! a process.

pub mod capability;
pub mod locator;
pub mod process;
pub mod setup;

use std::ffi::OsString;
use std::path::PathBuf;

use crate::error::Result;

pub use locator::ToolLocator;
pub use process::ProcessGateway;

/// An external program the pipeline may invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    /// `APKEditor.jar`, the split merger.
    ApkEditor,
    /// `uber-apk-signer.jar`.
    ApkSigner,
    /// Android Debug Bridge.
    Adb,
    /// The JVM running the two jars.
    Java,
}

impl Tool {
    pub const ALL: [Self; 4] = [Self::Java, Self::ApkEditor, Self::ApkSigner, Self::Adb];

    /// File name looked for on disk.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::ApkEditor => "APKEditor.jar",
            Self::ApkSigner => "uber-apk-signer.jar",
            Self::Adb if cfg!(windows) => "adb.exe",
            Self::Adb => "adb",
            Self::Java if cfg!(windows) => "java.exe",
            Self::Java => "java",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ApkEditor => "APKEditor",
            Self::ApkSigner => "uber-apk-signer",
            Self::Adb => "adb",
            Self::Java => "Java",
        }
    }

    /// Whether the tool is a jar run through `java -jar`.
    pub fn is_jar(&self) -> bool {
        matches!(self, Self::ApkEditor | Self::ApkSigner)
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Captured result of one tool run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Capability interface over the external tools.
///
/// `run` blocks until the tool exits; async callers wrap it in
/// `spawn_blocking`.
pub trait ToolGateway: Send + Sync {
    /// Resolve the tool's path, or [`crate::Error::ToolNotInstalled`] naming
    /// where it was expected.
    fn locate(&self, tool: Tool) -> Result<PathBuf>;

    /// Run `tool` with `args`. Jar tools are started with `java -jar`.
    fn run(&self, tool: Tool, args: &[OsString]) -> Result<ToolOutput>;
}

impl<T: ToolGateway + ?Sized> ToolGateway for std::sync::Arc<T> {
    fn locate(&self, tool: Tool) -> Result<PathBuf> {
        (**self).locate(tool)
    }

    fn run(&self, tool: Tool, args: &[OsString]) -> Result<ToolOutput> {
        (**self).run(tool, args)
    }
}
