//! Which merge methods can run on this machine right now.

use std::path::PathBuf;

use apkget_schema::MergeMethod;

use crate::error::Error;
use crate::merge::adb;
use crate::tools::{Tool, ToolGateway};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCapability {
    pub method: MergeMethod,
    pub available: bool,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolStatus {
    pub tool: Tool,
    /// Resolved path, or the path where the tool was expected.
    pub path: PathBuf,
    pub installed: bool,
}

/// Where each tool was found, or where it should go.
pub fn tool_report(gateway: &dyn ToolGateway) -> Vec<ToolStatus> {
    Tool::ALL
        .into_iter()
        .map(|tool| match gateway.locate(tool) {
            Ok(path) => ToolStatus {
                tool,
                path,
                installed: true,
            },
            Err(Error::ToolNotInstalled { expected, .. }) => ToolStatus {
                tool,
                path: expected,
                installed: false,
            },
            Err(_) => ToolStatus {
                tool,
                path: PathBuf::new(),
                installed: false,
            },
        })
        .collect()
}

/// Probe every merge method.
///
/// Blocking: the AdbInstall probe asks adb for attached devices.
pub fn probe(gateway: &dyn ToolGateway) -> Vec<MethodCapability> {
    let has = |tool| gateway.locate(tool).is_ok();
    let java = has(Tool::Java);
    let editor = has(Tool::ApkEditor);
    let signer = has(Tool::ApkSigner);

    MergeMethod::ALL
        .into_iter()
        .map(|method| {
            let (available, status) = match method {
                MergeMethod::XapkBundle | MergeMethod::ApksBundle => {
                    (true, "Always available".to_string())
                }
                MergeMethod::ApkEditorMerge => {
                    let missing = missing(&[(java, Tool::Java), (editor, Tool::ApkEditor)]);
                    (missing.is_empty(), status_line("Ready", &missing))
                }
                MergeMethod::FullMergeAndSign => {
                    let missing = missing(&[
                        (java, Tool::Java),
                        (editor, Tool::ApkEditor),
                        (signer, Tool::ApkSigner),
                    ]);
                    (missing.is_empty(), status_line("Ready", &missing))
                }
                MergeMethod::AdbInstall => adb_status(gateway),
            };
            MethodCapability {
                method,
                available,
                status,
            }
        })
        .collect()
}

fn adb_status(gateway: &dyn ToolGateway) -> (bool, String) {
    if gateway.locate(Tool::Adb).is_err() {
        return (false, "Missing: adb".to_string());
    }
    match adb::ready_devices(gateway) {
        Ok(devices) if devices.is_empty() => (false, "No device connected".to_string()),
        Ok(devices) => (
            true,
            format!("Ready ({} device{})", devices.len(), plural(devices.len())),
        ),
        Err(e) => (false, format!("adb failed: {e}")),
    }
}

fn missing(requirements: &[(bool, Tool)]) -> Vec<Tool> {
    requirements
        .iter()
        .filter(|(present, _)| !present)
        .map(|(_, tool)| *tool)
        .collect()
}

fn status_line(ready: &str, missing: &[Tool]) -> String {
    if missing.is_empty() {
        ready.to_string()
    } else {
        let names: Vec<&str> = missing.iter().map(Tool::display_name).collect();
        format!("Missing: {}", names.join(", "))
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}
