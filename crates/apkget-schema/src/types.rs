//! Package, store and split descriptors shared by every crate.

use serde::{Deserialize, Serialize};

use crate::{Abi, Arch, SchemaError};

/// A reverse-domain Android package identifier (e.g. `com.example.app`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageId(String);

impl PackageId {
    /// Validates and wraps a package identifier.
    ///
    /// A valid identifier has at least two dot-separated segments, each
    /// starting with an ASCII letter and containing only letters, digits and
    /// underscores.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidPackageId`] when the identifier does not
    /// have that shape.
    pub fn parse(s: &str) -> Result<Self, SchemaError> {
        let s = s.trim();
        let segments: Vec<&str> = s.split('.').collect();
        let valid = segments.len() >= 2
            && segments.iter().all(|seg| {
                seg.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
                    && seg.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            });

        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(SchemaError::InvalidPackageId(s.to_string()))
        }
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PackageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for PackageId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for PackageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for PackageId {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A concrete store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Store {
    /// Myket (token-authenticated).
    Myket,
    /// Cafe Bazaar (anonymous).
    #[serde(rename = "bazaar")]
    CafeBazaar,
}

impl Store {
    /// Short identifier used on the command line and in config keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Myket => "myket",
            Self::CafeBazaar => "bazaar",
        }
    }

    /// Display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Myket => "Myket",
            Self::CafeBazaar => "Cafe Bazaar",
        }
    }
}

impl std::fmt::Display for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Which backend(s) a request may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorePreference {
    /// Try both backends in preference order.
    #[default]
    Auto,
    /// Myket only.
    Myket,
    /// Cafe Bazaar only.
    #[serde(rename = "bazaar")]
    CafeBazaar,
}

impl StorePreference {
    /// All preferences in menu order.
    pub const ALL: [Self; 3] = [Self::Auto, Self::Myket, Self::CafeBazaar];

    /// Backends to query, in the order they are tried.
    pub fn stores(&self) -> &'static [Store] {
        match self {
            Self::Auto => &[Store::CafeBazaar, Store::Myket],
            Self::Myket => &[Store::Myket],
            Self::CafeBazaar => &[Store::CafeBazaar],
        }
    }

    /// Short identifier used on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "both",
            Self::Myket => "myket",
            Self::CafeBazaar => "bazaar",
        }
    }

    /// Menu label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Auto => "Both (Myket + Bazaar)",
            Self::Myket => "Myket only",
            Self::CafeBazaar => "Bazaar only",
        }
    }
}

impl From<Store> for StorePreference {
    fn from(store: Store) -> Self {
        match store {
            Store::Myket => Self::Myket,
            Store::CafeBazaar => Self::CafeBazaar,
        }
    }
}

impl std::fmt::Display for StorePreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StorePreference {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "both" | "auto" => Ok(Self::Auto),
            "myket" => Ok(Self::Myket),
            "bazaar" | "cafebazaar" => Ok(Self::CafeBazaar),
            _ => Err(SchemaError::UnknownStore(s.to_string())),
        }
    }
}

/// Role of one split inside a split-APK package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitKind {
    /// The mandatory base APK.
    Base,
    /// Native code for a single ABI.
    AbiConfig,
    /// Resources for a screen density bucket.
    DensityConfig,
    /// Resources for a locale.
    LanguageConfig,
    /// A dynamic feature module.
    Feature,
}

impl SplitKind {
    /// Whether the split is needed regardless of the target architecture.
    pub fn is_arch_independent(&self) -> bool {
        matches!(
            self,
            Self::DensityConfig | Self::LanguageConfig | Self::Feature
        )
    }
}

const DENSITIES: [&str; 9] = [
    "ldpi", "mdpi", "tvdpi", "hdpi", "xhdpi", "xxhdpi", "xxxhdpi", "nodpi", "anydpi",
];

/// One downloadable split as reported by a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitDescriptor {
    /// Split name as the store reports it (`base`, `config.arm64_v8a`, ...).
    pub name: String,
    /// Role of the split.
    pub kind: SplitKind,
    /// ABI tag, present exactly for [`SplitKind::AbiConfig`].
    pub abi: Option<Abi>,
    /// Mirror URLs, tried in rotation.
    pub urls: Vec<String>,
    /// Declared size in bytes, when the store reports one.
    pub size_bytes: Option<u64>,
}

impl SplitDescriptor {
    /// Describes the base split.
    pub fn base(urls: Vec<String>, size_bytes: Option<u64>) -> Self {
        Self {
            name: "base".to_string(),
            kind: SplitKind::Base,
            abi: None,
            urls,
            size_bytes,
        }
    }

    /// Describes a non-base split, classifying it from its name.
    pub fn config(name: &str, urls: Vec<String>, size_bytes: Option<u64>) -> Self {
        let name = name.trim_end_matches(".apk").to_string();
        let (kind, abi) = classify(&name);
        Self {
            name,
            kind,
            abi,
            urls,
            size_bytes,
        }
    }

    /// Qualifier of a config split (`arm64_v8a`, `xxhdpi`, `fa`), or `base`.
    pub fn tag(&self) -> &str {
        match self.kind {
            SplitKind::Base => "base",
            _ => config_tag(&self.name).unwrap_or(&self.name),
        }
    }

    /// Identifier used in container manifests (`base`, `config.arm64_v8a`).
    pub fn id(&self) -> String {
        match self.kind {
            SplitKind::Base => "base".to_string(),
            SplitKind::Feature => self.name.clone(),
            _ => format!("config.{}", self.tag()),
        }
    }

    /// Staging file name for this split.
    pub fn file_name(&self) -> String {
        format!("{}.apk", self.id())
    }
}

/// Stores name config splits either `config.<tag>` or `split_config.<tag>`.
fn config_tag(name: &str) -> Option<&str> {
    name.strip_prefix("config.")
        .or_else(|| name.strip_prefix("split_config."))
}

/// Classifies a split name into its kind and optional ABI.
///
/// ```
/// use apkget_schema::{classify, Abi, SplitKind};
///
/// assert_eq!(classify("config.arm64_v8a"), (SplitKind::AbiConfig, Some(Abi::Arm64V8a)));
/// assert_eq!(classify("config.xxhdpi"), (SplitKind::DensityConfig, None));
/// assert_eq!(classify("config.fa"), (SplitKind::LanguageConfig, None));
/// assert_eq!(classify("feature_camera"), (SplitKind::Feature, None));
/// ```
pub fn classify(name: &str) -> (SplitKind, Option<Abi>) {
    let name = name.trim_end_matches(".apk");
    if name == "base" {
        return (SplitKind::Base, None);
    }

    let Some(tag) = config_tag(name) else {
        return (SplitKind::Feature, None);
    };

    if let Some(abi) = Abi::from_tag(tag) {
        (SplitKind::AbiConfig, Some(abi))
    } else if DENSITIES.contains(&tag.to_lowercase().as_str()) {
        (SplitKind::DensityConfig, None)
    } else {
        (SplitKind::LanguageConfig, None)
    }
}

/// Store metadata for one package, normalized across backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    /// Package the splits belong to.
    pub package_id: PackageId,
    /// Human version string.
    pub display_version: String,
    /// Monotonic Android version code.
    pub version_code: u64,
    /// Splits in store order.
    pub splits: Vec<SplitDescriptor>,
}

impl ArtifactManifest {
    /// Checks the exactly-one-base invariant.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::BaseCount`] if the manifest has zero or several
    /// base splits.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let bases = self
            .splits
            .iter()
            .filter(|s| s.kind == SplitKind::Base)
            .count();
        if bases == 1 {
            Ok(())
        } else {
            Err(SchemaError::BaseCount {
                package: self.package_id.to_string(),
                count: bases,
            })
        }
    }

    /// The base split, if present.
    pub fn base(&self) -> Option<&SplitDescriptor> {
        self.splits.iter().find(|s| s.kind == SplitKind::Base)
    }

    /// Native-code splits in store order.
    pub fn abi_splits(&self) -> impl Iterator<Item = &SplitDescriptor> {
        self.splits.iter().filter(|s| s.kind == SplitKind::AbiConfig)
    }

    /// ABIs offered by this manifest, in store order.
    pub fn offered_abis(&self) -> Vec<Abi> {
        self.abi_splits().filter_map(|s| s.abi).collect()
    }

    /// Whether the package ships as a single APK.
    pub fn is_monolithic(&self) -> bool {
        self.splits.iter().all(|s| s.kind == SplitKind::Base)
    }
}

/// A user's request for one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRequest {
    /// Package to fetch.
    pub package_id: PackageId,
    /// Backend preference.
    pub store: StorePreference,
    /// Target device class.
    pub architecture: Arch,
}

impl PackageRequest {
    /// Creates a request.
    pub fn new(package_id: PackageId, store: StorePreference, architecture: Arch) -> Self {
        Self {
            package_id,
            store,
            architecture,
        }
    }
}

/// One search candidate returned by a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Package identifier.
    pub package_id: PackageId,
    /// Display name in the store listing.
    pub display_name: String,
    /// Version code listed by the store, if any.
    pub version_code: Option<u64>,
    /// Store that returned the hit.
    pub store: Store,
}
