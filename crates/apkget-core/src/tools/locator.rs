//! Finds external tools on disk.
//!
//! The configured tools directory always wins. After it come the places
//! people tend to drop the jars by hand (working directory, `./tools`, home,
//! `/usr/local/bin`) and, for executables, `PATH`.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::tools::Tool;

#[derive(Debug, Clone)]
pub struct ToolLocator {
    tools_dir: PathBuf,
    fallbacks: bool,
}

impl ToolLocator {
    pub fn new(tools_dir: impl Into<PathBuf>) -> Self {
        Self {
            tools_dir: tools_dir.into(),
            fallbacks: true,
        }
    }

    /// Only look inside the tools directory. Used by tests so a developer's
    /// own installation cannot leak in.
    pub fn isolated(tools_dir: impl Into<PathBuf>) -> Self {
        Self {
            tools_dir: tools_dir.into(),
            fallbacks: false,
        }
    }

    pub fn tools_dir(&self) -> &Path {
        &self.tools_dir
    }

    /// Where the installer puts `tool`, and where users are told to put it.
    pub fn expected_path(&self, tool: Tool) -> PathBuf {
        match tool {
            Tool::Adb => self.tools_dir.join("platform-tools").join(tool.file_name()),
            Tool::Java => PathBuf::from(tool.file_name()),
            _ => self.tools_dir.join(tool.file_name()),
        }
    }

    /// Candidate paths in search order.
    pub fn candidates(&self, tool: Tool) -> Vec<PathBuf> {
        let mut out = Vec::new();

        match tool {
            Tool::ApkEditor | Tool::ApkSigner => {
                out.push(self.expected_path(tool));
                if self.fallbacks {
                    let name = tool.file_name();
                    out.push(PathBuf::from(name));
                    out.push(PathBuf::from(name.to_lowercase()));
                    out.push(Path::new("tools").join(name));
                    if let Some(home) = dirs::home_dir() {
                        out.push(home.join(name));
                    }
                    out.push(Path::new("/usr/local/bin").join(name));
                }
            }
            Tool::Adb => {
                if self.fallbacks {
                    out.extend(which::which("adb").ok());
                }
                out.push(self.expected_path(tool));
            }
            Tool::Java => {
                if self.fallbacks {
                    out.extend(which::which("java").ok());
                    out.extend(
                        std::env::var_os("JAVA_HOME")
                            .map(|home| PathBuf::from(home).join("bin").join(tool.file_name())),
                    );
                }
                out.push(self.tools_dir.join("jre").join("bin").join(tool.file_name()));
            }
        }

        out.dedup();
        out
    }

    /// First existing candidate, or `ToolNotInstalled` with the expected path.
    pub fn locate(&self, tool: Tool) -> Result<PathBuf> {
        let found = self.candidates(tool).into_iter().find(|p| p.is_file());
        match found {
            Some(path) => {
                tracing::debug!(%tool, path = %path.display(), "located tool");
                Ok(path)
            }
            None => Err(Error::ToolNotInstalled {
                tool,
                expected: self.expected_path(tool),
            }),
        }
    }
}
