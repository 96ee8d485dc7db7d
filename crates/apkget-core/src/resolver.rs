//! Architecture resolver.
//!
//! Narrows the splits a store offers down to the minimal set a device of the
//! requested architecture class needs. Pure computation: no I/O, no hidden
//! state, so the same `(manifest, arch)` pair always yields the same plan.

use apkget_schema::{Abi, ArtifactManifest, Arch, PackageId, SplitDescriptor, SplitKind};

use crate::error::{Error, Result};

/// Splits chosen for download, base first, then configs in store order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionPlan {
    pub package_id: PackageId,
    pub display_version: String,
    pub version_code: u64,
    pub architecture: Arch,
    pub splits: Vec<SplitDescriptor>,
}

impl SelectionPlan {
    pub fn base(&self) -> &SplitDescriptor {
        &self.splits[0]
    }

    pub fn configs(&self) -> &[SplitDescriptor] {
        &self.splits[1..]
    }

    /// ABI of the chosen native split, if the package ships one.
    pub fn abi(&self) -> Option<Abi> {
        self.splits
            .iter()
            .find(|s| s.kind == SplitKind::AbiConfig)
            .and_then(|s| s.abi)
    }

    /// Sum of declared sizes, when every split declares one.
    pub fn total_declared_bytes(&self) -> Option<u64> {
        self.splits.iter().map(|s| s.size_bytes).sum()
    }

    pub fn is_monolithic(&self) -> bool {
        self.splits.len() == 1
    }
}

/// Pick the splits `arch` needs from `manifest`.
///
/// The base split is always selected, as are all density, language and
/// feature splits. Exactly one native split is selected: the first one whose
/// ABI appears earliest in the architecture's preference list. A manifest
/// with no native splits at all is architecture-neutral and selects none.
///
/// # Errors
///
/// [`Error::UnsupportedArchitecture`] when the manifest carries native splits
/// but none is compatible with `arch`; [`Error::Schema`] when the manifest
/// does not have exactly one base split.
pub fn select_splits(manifest: &ArtifactManifest, arch: Arch) -> Result<SelectionPlan> {
    let offered = manifest.offered_abis();

    let native = if offered.is_empty() {
        None
    } else {
        let chosen = arch.abis().iter().find_map(|wanted| {
            manifest
                .abi_splits()
                .find(|split| split.abi == Some(*wanted))
        });
        match chosen {
            Some(split) => Some(split),
            None => {
                return Err(Error::UnsupportedArchitecture {
                    package: manifest.package_id.clone(),
                    arch,
                    offered,
                });
            }
        }
    };

    manifest.validate()?;
    let mut splits = Vec::with_capacity(manifest.splits.len());
    splits.extend(manifest.base().cloned());
    for split in &manifest.splits {
        let keep = match split.kind {
            SplitKind::Base => false,
            SplitKind::AbiConfig => native.is_some_and(|n| std::ptr::eq(n, split)),
            _ => split.kind.is_arch_independent(),
        };
        if keep {
            splits.push(split.clone());
        }
    }

    tracing::debug!(
        package = %manifest.package_id,
        %arch,
        abi = ?native.and_then(|n| n.abi),
        selected = splits.len(),
        offered = manifest.splits.len(),
        "resolved split selection"
    );

    Ok(SelectionPlan {
        package_id: manifest.package_id.clone(),
        display_version: manifest.display_version.clone(),
        version_code: manifest.version_code,
        architecture: arch,
        splits,
    })
}
