//! Merge methods offered for staged splits.

use serde::{Deserialize, Serialize};

use crate::SchemaError;

/// How staged splits are turned into something installable.
///
/// The numeric index (1 to 5) is the value accepted by `--method`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMethod {
    /// Repackage all splits into an `.xapk` container.
    XapkBundle,
    /// Repackage all splits into an `.apks` container.
    ApksBundle,
    /// Binary-merge all splits into one APK with APKEditor.
    ApkEditorMerge,
    /// Install the splits on a connected device with `adb install-multiple`.
    AdbInstall,
    /// Merge with APKEditor, then sign the result.
    FullMergeAndSign,
}

impl MergeMethod {
    /// All methods in menu order.
    pub const ALL: [Self; 5] = [
        Self::XapkBundle,
        Self::ApksBundle,
        Self::ApkEditorMerge,
        Self::AdbInstall,
        Self::FullMergeAndSign,
    ];

    /// One-based index used on the command line.
    pub fn index(&self) -> u8 {
        match self {
            Self::XapkBundle => 1,
            Self::ApksBundle => 2,
            Self::ApkEditorMerge => 3,
            Self::AdbInstall => 4,
            Self::FullMergeAndSign => 5,
        }
    }

    /// Looks a method up by its one-based index.
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.index() == index)
    }

    /// Menu label.
    pub fn name(&self) -> &'static str {
        match self {
            Self::XapkBundle => "XAPK bundle",
            Self::ApksBundle => "APKS bundle",
            Self::ApkEditorMerge => "APKEditor merge",
            Self::AdbInstall => "Install via ADB",
            Self::FullMergeAndSign => "Full merge + sign",
        }
    }

    /// One-line description.
    pub fn description(&self) -> &'static str {
        match self {
            Self::XapkBundle => "Create an XAPK file (recommended)",
            Self::ApksBundle => "Create an APKS file for split installers",
            Self::ApkEditorMerge => "Merge splits into a single APK",
            Self::AdbInstall => "Install directly on a connected device",
            Self::FullMergeAndSign => "Merge splits and sign the result",
        }
    }

    /// Whether the method writes a local artifact.
    pub fn produces_artifact(&self) -> bool {
        !matches!(self, Self::AdbInstall)
    }
}

impl std::fmt::Display for MergeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for MergeMethod {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(index) = s.parse::<u8>() {
            return Self::from_index(index).ok_or_else(|| SchemaError::UnknownMethod(s.to_string()));
        }
        match s.to_lowercase().replace('-', "_").as_str() {
            "xapk" | "xapk_bundle" => Ok(Self::XapkBundle),
            "apks" | "apks_bundle" => Ok(Self::ApksBundle),
            "apkeditor" | "apk_editor_merge" | "merge" => Ok(Self::ApkEditorMerge),
            "adb" | "adb_install" => Ok(Self::AdbInstall),
            "full" | "full_merge_and_sign" | "sign" => Ok(Self::FullMergeAndSign),
            _ => Err(SchemaError::UnknownMethod(s.to_string())),
        }
    }
}
