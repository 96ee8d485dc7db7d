//! Device architecture classes and the binary ABIs they accept.
//!
//! Every [`Arch`] carries a static preference list of [`Abi`] tags, most
//! specific first. The list is what the split resolver walks when it picks
//! the native-code split for a device.
//!
//! # Example
//!
//! ```
//! use apkget_schema::{Abi, Arch};
//!
//! assert_eq!(Arch::Arm64.abis()[0], Abi::Arm64V8a);
//! assert_eq!(Arch::X86_64.cpu_list(), "x86_64,x86");
//! ```

use crate::SchemaError;

/// Architecture class of the target device or emulator.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Arch {
    /// 64-bit ARM (modern phones).
    #[default]
    Arm64,
    /// 32-bit ARM (older or budget phones).
    Arm32,
    /// 32-bit Intel (emulators).
    X86,
    /// 64-bit Intel (emulators).
    #[serde(rename = "x86_64")]
    X86_64,
}

impl Arch {
    /// All architecture classes in menu order.
    pub const ALL: [Self; 4] = [Self::Arm64, Self::Arm32, Self::X86, Self::X86_64];

    /// Short identifier used on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arm64 => "arm64",
            Self::Arm32 => "arm32",
            Self::X86 => "x86",
            Self::X86_64 => "x86_64",
        }
    }

    /// Human hint describing which devices fall in this class.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Arm64 => "modern phones",
            Self::Arm32 => "older or budget phones",
            Self::X86 | Self::X86_64 => "emulator",
        }
    }

    /// ABI preference list, most specific first. Never empty.
    pub fn abis(&self) -> &'static [Abi] {
        match self {
            Self::Arm64 => &[Abi::Arm64V8a, Abi::ArmeabiV7a, Abi::Armeabi],
            Self::Arm32 => &[Abi::ArmeabiV7a, Abi::Armeabi],
            Self::X86 => &[Abi::X86],
            Self::X86_64 => &[Abi::X86_64, Abi::X86],
        }
    }

    /// Comma-joined ABI list, the form store backends expect in device info.
    pub fn cpu_list(&self) -> String {
        self.abis()
            .iter()
            .map(Abi::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Position of `abi` in this class's preference list, if accepted at all.
    pub fn rank(&self, abi: Abi) -> Option<usize> {
        self.abis().iter().position(|a| *a == abi)
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Arch {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arm64" | "aarch64" | "arm64-v8a" => Ok(Self::Arm64),
            "arm32" | "arm" | "armv7" | "armeabi-v7a" => Ok(Self::Arm32),
            "x86" | "i686" => Ok(Self::X86),
            "x86_64" | "x64" | "amd64" => Ok(Self::X86_64),
            _ => Err(SchemaError::UnknownArch(s.to_string())),
        }
    }
}

/// Android binary interface tag carried by native-code config splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Abi {
    /// `arm64-v8a`
    #[serde(rename = "arm64-v8a")]
    Arm64V8a,
    /// `armeabi-v7a`
    #[serde(rename = "armeabi-v7a")]
    ArmeabiV7a,
    /// `armeabi`
    #[serde(rename = "armeabi")]
    Armeabi,
    /// `x86`
    #[serde(rename = "x86")]
    X86,
    /// `x86_64`
    #[serde(rename = "x86_64")]
    X86_64,
}

impl Abi {
    /// Canonical Android spelling (`arm64-v8a`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arm64V8a => "arm64-v8a",
            Self::ArmeabiV7a => "armeabi-v7a",
            Self::Armeabi => "armeabi",
            Self::X86 => "x86",
            Self::X86_64 => "x86_64",
        }
    }

    /// Spelling used inside split names (`config.arm64_v8a`).
    pub fn split_tag(&self) -> &'static str {
        match self {
            Self::Arm64V8a => "arm64_v8a",
            Self::ArmeabiV7a => "armeabi_v7a",
            Self::Armeabi => "armeabi",
            Self::X86 => "x86",
            Self::X86_64 => "x86_64",
        }
    }

    /// Parses either spelling. Returns `None` for anything that is not an ABI.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_lowercase().as_str() {
            "arm64-v8a" | "arm64_v8a" => Some(Self::Arm64V8a),
            "armeabi-v7a" | "armeabi_v7a" => Some(Self::ArmeabiV7a),
            "armeabi" => Some(Self::Armeabi),
            "x86" => Some(Self::X86),
            "x86_64" | "x86-64" => Some(Self::X86_64),
            _ => None,
        }
    }
}

impl std::fmt::Display for Abi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Abi {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| SchemaError::UnknownAbi(s.to_string()))
    }
}
