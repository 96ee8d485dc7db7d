//! Device installs through `adb install-multiple`.

use std::ffi::OsString;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::tools::{Tool, ToolGateway};

/// One line of `adb devices`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub serial: String,
    pub state: String,
}

impl Device {
    /// Authorised and online (not `offline` or `unauthorized`).
    pub fn is_ready(&self) -> bool {
        self.state == "device"
    }
}

pub fn parse_devices(stdout: &str) -> Vec<Device> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("List of devices") && !l.starts_with('*'))
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let serial = parts.next()?;
            let state = parts.next()?;
            Some(Device {
                serial: serial.to_string(),
                state: state.to_string(),
            })
        })
        .collect()
}

/// Devices that can take an install right now. Blocking.
pub fn ready_devices(gateway: &dyn ToolGateway) -> Result<Vec<Device>> {
    let output = gateway.run(Tool::Adb, &[OsString::from("devices")])?;
    if !output.success() {
        return Err(Error::MergeToolFailed {
            tool: Tool::Adb,
            exit_code: output.exit_code,
            stderr: output.stderr,
        });
    }
    Ok(parse_devices(&output.stdout)
        .into_iter()
        .filter(Device::is_ready)
        .collect())
}

/// Install `apks` as one multi-split package on the first ready device.
/// Returns the device serial.
pub(crate) fn install(gateway: &dyn ToolGateway, apks: &[PathBuf]) -> Result<String> {
    gateway.locate(Tool::Adb)?;

    let devices = ready_devices(gateway)?;
    let Some(device) = devices.into_iter().next() else {
        return Err(Error::NoDeviceConnected);
    };

    let args = install_args(&device.serial, apks);
    tracing::info!(serial = %device.serial, splits = apks.len(), "installing on device");
    let output = gateway.run(Tool::Adb, &args)?;

    if let Some(message) = rejection(&output.stdout, &output.stderr) {
        return Err(Error::InstallRejected { message });
    }
    if !output.success() {
        let message = first_non_empty(&output.stderr, &output.stdout)
            .unwrap_or_else(|| format!("adb exited with {:?}", output.exit_code));
        return Err(Error::InstallRejected { message });
    }
    Ok(device.serial)
}

/// `-r` lets the install replace an app that is already on the device.
fn install_args(serial: &str, apks: &[PathBuf]) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-s".into(),
        serial.into(),
        "install-multiple".into(),
        "-r".into(),
    ];
    args.extend(apks.iter().map(|p| p.clone().into_os_string()));
    args
}

/// The `Failure [INSTALL_...]` line adb prints when the package manager refuses.
fn rejection(stdout: &str, stderr: &str) -> Option<String> {
    stdout
        .lines()
        .chain(stderr.lines())
        .map(str::trim)
        .find(|l| l.starts_with("Failure") || l.contains("INSTALL_FAILED") || l.contains("INSTALL_PARSE_FAILED"))
        .map(String::from)
}

fn first_non_empty(a: &str, b: &str) -> Option<String> {
    [a, b]
        .into_iter()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(String::from)
}
