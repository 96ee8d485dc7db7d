//! Signing with uber-apk-signer.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::SigningKey;
use crate::error::{Error, Result};
use crate::merge::editor::tool_failure;
use crate::tools::{Tool, ToolGateway};

fn signer_args(unsigned: &Path, out_dir: &Path, key: Option<&SigningKey>) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "--allowResign".into(),
        "-a".into(),
        unsigned.as_os_str().to_owned(),
        "-o".into(),
        out_dir.as_os_str().to_owned(),
    ];

    if let Some(key) = key {
        args.push("--ks".into());
        args.push(key.keystore.as_os_str().to_owned());
        let optional = [
            ("--ksAlias", &key.alias),
            ("--ksPass", &key.keystore_pass),
            ("--ksKeyPass", &key.key_pass),
        ];
        for (flag, value) in optional {
            if let Some(value) = value {
                args.push(flag.into());
                args.push(value.into());
            }
        }
    }
    args
}

/// Sign `unsigned` into `out_dir` and return the produced APK.
pub(crate) fn sign(
    gateway: &dyn ToolGateway,
    unsigned: &Path,
    out_dir: &Path,
    key: Option<&SigningKey>,
) -> Result<PathBuf> {
    let output = gateway.run(Tool::ApkSigner, &signer_args(unsigned, out_dir, key))?;
    if !output.success() {
        return Err(tool_failure(Tool::ApkSigner, output));
    }

    signed_output(out_dir)?.ok_or_else(|| Error::MergeToolFailed {
        tool: Tool::ApkSigner,
        exit_code: output.exit_code,
        stderr: format!("no signed APK found in {}", out_dir.display()),
    })
}

/// The signer names its output `<stem>-aligned-debugSigned.apk` or
/// `<stem>-aligned-signed.apk`. Take the aligned one if several exist.
fn signed_output(out_dir: &Path) -> Result<Option<PathBuf>> {
    let mut apks: Vec<PathBuf> = std::fs::read_dir(out_dir)?
        .filter_map(std::result::Result::ok)
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e == "apk"))
        .collect();
    apks.sort_by_key(|p| !p.to_string_lossy().contains("-aligned"));
    Ok(apks.into_iter().next())
}
