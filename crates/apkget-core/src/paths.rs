use dirs::config_dir;
use std::path::PathBuf;

/// Returns the configuration directory, or None if no config location can be resolved.
pub fn try_apkget_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("APKGET_HOME") {
        return Some(PathBuf::from(val));
    }
    config_dir().map(|c| c.join("apkget"))
}

/// Returns the configuration directory (`<config_dir>/apkget`).
///
/// Falls back to `./.apkget` when the platform reports no config directory,
/// so a headless environment without `$HOME` still works.
pub fn apkget_home() -> PathBuf {
    try_apkget_home().unwrap_or_else(|| PathBuf::from(".apkget"))
}

/// Settings file: <home>/config.toml
pub fn config_path() -> PathBuf {
    apkget_home().join("config.toml")
}

/// Default tools directory: <home>/tools
pub fn default_tools_dir() -> PathBuf {
    apkget_home().join("tools")
}

/// Root for per-request staging directories: <home>/staging
pub fn staging_root() -> PathBuf {
    apkget_home().join("staging")
}

/// Extract the filename from a URL, ignoring any query string.
pub fn filename_from_url(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.split('/').next_back().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_from_url() {
        assert_eq!(
            filename_from_url("https://example.com/a/b/APKEditor-1.4.1.jar"),
            "APKEditor-1.4.1.jar"
        );
        assert_eq!(
            filename_from_url("https://cdn.example.com/x/base.apk?token=abc"),
            "base.apk"
        );
        assert_eq!(filename_from_url("https://example.com/"), "");
    }
}
