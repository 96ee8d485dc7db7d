//! Per-request staging directories and the staged split set.
//!
//! Every request gets its own uniquely named directory under the staging
//! root, so concurrent requests never share paths. The directory is removed
//! when the owning [`StagedSplitSet`] (or a bare [`StagingArea`]) is dropped,
//! unless the caller asks to retain it.

use std::path::{Path, PathBuf};

use apkget_schema::{Abi, Arch, PackageId, SplitDescriptor};
use tempfile::TempDir;

use crate::error::Result;

/// A unique, self-cleaning directory for one request's downloads.
#[derive(Debug)]
pub struct StagingArea {
    dir: TempDir,
}

impl StagingArea {
    /// Create a fresh directory under `root` (created if missing).
    pub fn create(root: &Path, package: &PackageId) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("{package}-"))
            .tempdir_in(root)?;
        tracing::debug!(path = %dir.path().display(), "created staging directory");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where `split` is written inside this area.
    pub fn file_for(&self, split: &SplitDescriptor) -> PathBuf {
        self.dir.path().join(split.file_name())
    }

    /// Stop cleanup and hand back the directory path.
    pub fn keep(self) -> PathBuf {
        self.dir.keep()
    }
}

/// One split on disk, size-validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedSplit {
    pub descriptor: SplitDescriptor,
    pub path: PathBuf,
    pub bytes: u64,
}

/// All splits of one request, fully downloaded.
///
/// Merge methods only read from this set; none of them moves or rewrites the
/// staged files, so a failed merge can be retried with another method.
#[derive(Debug)]
pub struct StagedSplitSet {
    pub package_id: PackageId,
    pub display_version: String,
    pub version_code: u64,
    pub architecture: Arch,
    pub base: StagedSplit,
    pub configs: Vec<StagedSplit>,
    staging: StagingArea,
}

impl StagedSplitSet {
    pub(crate) fn new(
        package_id: PackageId,
        display_version: String,
        version_code: u64,
        architecture: Arch,
        base: StagedSplit,
        configs: Vec<StagedSplit>,
        staging: StagingArea,
    ) -> Self {
        Self {
            package_id,
            display_version,
            version_code,
            architecture,
            base,
            configs,
            staging,
        }
    }

    /// Directory holding the staged files.
    pub fn dir(&self) -> &Path {
        self.staging.path()
    }

    /// Base first, then configs.
    pub fn all(&self) -> impl Iterator<Item = &StagedSplit> {
        std::iter::once(&self.base).chain(self.configs.iter())
    }

    pub fn len(&self) -> usize {
        1 + self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn is_monolithic(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn abi(&self) -> Option<Abi> {
        self.configs.iter().find_map(|s| s.descriptor.abi)
    }

    pub fn total_bytes(&self) -> u64 {
        self.all().map(|s| s.bytes).sum()
    }

    /// Keep the raw splits on disk and return their directory.
    pub fn retain(self) -> PathBuf {
        self.staging.keep()
    }
}
