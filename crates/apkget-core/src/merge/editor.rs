//! Binary merge with APKEditor (`java -jar APKEditor.jar m -i <dir> -o <apk>`).

use std::ffi::OsString;
use std::path::Path;

use crate::error::{Error, Result};
use crate::tools::{Tool, ToolGateway, ToolOutput};

/// Merge every APK in `input_dir` into `output`.
pub(crate) fn merge_dir(gateway: &dyn ToolGateway, input_dir: &Path, output: &Path) -> Result<()> {
    let args: Vec<OsString> = vec![
        "m".into(),
        "-i".into(),
        input_dir.as_os_str().to_owned(),
        "-o".into(),
        output.as_os_str().to_owned(),
    ];

    let result = gateway.run(Tool::ApkEditor, &args)?;
    if !result.success() {
        return Err(tool_failure(Tool::ApkEditor, result));
    }
    if !output.is_file() {
        return Err(Error::MergeToolFailed {
            tool: Tool::ApkEditor,
            exit_code: result.exit_code,
            stderr: format!("no merged APK written to {}", output.display()),
        });
    }
    Ok(())
}

/// `MergeToolFailed` from a non-zero run. APKEditor reports most errors on
/// stdout, so fall back to it when stderr is empty.
pub(crate) fn tool_failure(tool: Tool, output: ToolOutput) -> Error {
    let stderr = if output.stderr.trim().is_empty() {
        output.stdout
    } else {
        output.stderr
    };
    Error::MergeToolFailed {
        tool,
        exit_code: output.exit_code,
        stderr,
    }
}
