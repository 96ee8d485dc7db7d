//! XAPK and APKS containers.
//!
//! Both are plain zip files holding the split APKs untouched. XAPK adds a
//! `manifest.json` enumerating the splits; APKS relies on the
//! `base-master.apk` / `base-<tag>.apk` naming convention that split
//! installers such as SAI expect.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use apkget_schema::SplitKind;

use crate::error::{Error, Result};
use crate::merge::MergeInputs;

pub const XAPK_MANIFEST: &str = "manifest.json";

/// `manifest.json` inside an XAPK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XapkManifest {
    pub xapk_version: u32,
    pub package_name: String,
    pub name: String,
    pub version_code: String,
    pub version_name: String,
    #[serde(default)]
    pub split_configs: Vec<String>,
    #[serde(default)]
    pub split_apks: Vec<XapkSplit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XapkSplit {
    pub file: String,
    pub id: String,
}

fn stored() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
}

fn add_file<W: Write + std::io::Seek>(zip: &mut ZipWriter<W>, name: &str, src: &Path) -> Result<()> {
    zip.start_file(name, stored())?;
    let mut file = File::open(src)?;
    std::io::copy(&mut file, zip)?;
    Ok(())
}

pub(crate) fn write_xapk(inputs: &MergeInputs, dest: &Path) -> Result<()> {
    let mut zip = ZipWriter::new(File::create(dest)?);
    let mut manifest = XapkManifest {
        xapk_version: 2,
        package_name: inputs.package_id.to_string(),
        name: inputs.package_id.to_string(),
        version_code: inputs.version_code.to_string(),
        version_name: inputs.display_version.clone(),
        split_configs: Vec::new(),
        split_apks: Vec::new(),
    };

    for split in &inputs.splits {
        let file = split.descriptor.file_name();
        add_file(&mut zip, &file, &split.path)?;

        let id = split.descriptor.id();
        if split.descriptor.kind != SplitKind::Base {
            manifest.split_configs.push(id.clone());
        }
        manifest.split_apks.push(XapkSplit { file, id });
    }

    let json = serde_json::to_vec_pretty(&manifest)
        .map_err(|e| Error::Io(std::io::Error::other(e)))?;
    zip.start_file(XAPK_MANIFEST, SimpleFileOptions::default())?;
    zip.write_all(&json)?;
    zip.finish()?;
    Ok(())
}

pub(crate) fn write_apks(inputs: &MergeInputs, dest: &Path) -> Result<()> {
    let mut zip = ZipWriter::new(File::create(dest)?);
    for split in &inputs.splits {
        add_file(&mut zip, &apks_entry_name(&split.descriptor), &split.path)?;
    }
    zip.finish()?;
    Ok(())
}

/// Entry name a split gets inside an APKS container.
pub fn apks_entry_name(split: &apkget_schema::SplitDescriptor) -> String {
    match split.kind {
        SplitKind::Base => "base-master.apk".to_string(),
        _ => format!("base-{}.apk", split.tag()),
    }
}

/// Read the manifest back out of an XAPK.
pub fn read_xapk_manifest(path: &Path) -> Result<XapkManifest> {
    let mut archive = ZipArchive::new(File::open(path)?)?;
    let mut entry = archive.by_name(XAPK_MANIFEST)?;
    let mut json = String::new();
    entry.read_to_string(&mut json)?;
    serde_json::from_str(&json).map_err(|e| {
        Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::StagedSplit;
    use apkget_schema::{PackageId, SplitDescriptor};
    use tempfile::tempdir;

    fn inputs(dir: &Path) -> MergeInputs {
        let descriptors = vec![
            SplitDescriptor::base(vec![], None),
            SplitDescriptor::config("config.arm64_v8a", vec![], None),
            SplitDescriptor::config("config.xxhdpi", vec![], None),
            SplitDescriptor::config("config.fa", vec![], None),
        ];
        let splits = descriptors
            .into_iter()
            .map(|d| {
                let path = dir.join(d.file_name());
                std::fs::write(&path, d.name.as_bytes()).unwrap();
                StagedSplit {
                    bytes: d.name.len() as u64,
                    descriptor: d,
                    path,
                }
            })
            .collect();
        MergeInputs {
            package_id: PackageId::parse("com.example.app").unwrap(),
            display_version: "2.1".into(),
            version_code: 210,
            splits,
            dir: dir.to_path_buf(),
        }
    }

    fn entry_names(path: &Path) -> Vec<String> {
        let archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut names: Vec<String> = archive.file_names().map(String::from).collect();
        names.sort();
        names
    }

    #[test]
    fn test_xapk_enumerates_every_split_once() {
        let dir = tempdir().unwrap();
        let inputs = inputs(dir.path());
        let dest = dir.path().join("out.xapk");
        write_xapk(&inputs, &dest).unwrap();

        assert_eq!(
            entry_names(&dest),
            vec![
                "base.apk",
                "config.arm64_v8a.apk",
                "config.fa.apk",
                "config.xxhdpi.apk",
                "manifest.json"
            ]
        );

        let manifest = read_xapk_manifest(&dest).unwrap();
        assert_eq!(manifest.xapk_version, 2);
        assert_eq!(manifest.package_name, "com.example.app");
        assert_eq!(manifest.version_code, "210");
        assert_eq!(manifest.split_apks.len(), inputs.splits.len());
        assert_eq!(
            manifest.split_configs,
            vec!["config.arm64_v8a", "config.xxhdpi", "config.fa"]
        );
    }

    #[test]
    fn test_xapk_entries_are_byte_identical() {
        let dir = tempdir().unwrap();
        let inputs = inputs(dir.path());
        let dest = dir.path().join("out.xapk");
        write_xapk(&inputs, &dest).unwrap();

        let mut archive = ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        for split in &inputs.splits {
            let mut entry = archive.by_name(&split.descriptor.file_name()).unwrap();
            let mut data = Vec::new();
            entry.read_to_end(&mut data).unwrap();
            assert_eq!(data, std::fs::read(&split.path).unwrap());
        }
    }

    #[test]
    fn test_apks_naming() {
        let dir = tempdir().unwrap();
        let inputs = inputs(dir.path());
        let dest = dir.path().join("out.apks");
        write_apks(&inputs, &dest).unwrap();

        assert_eq!(
            entry_names(&dest),
            vec![
                "base-arm64_v8a.apk",
                "base-fa.apk",
                "base-master.apk",
                "base-xxhdpi.apk"
            ]
        );
    }

    #[test]
    fn test_apks_entry_drops_split_config_prefix() {
        let split = SplitDescriptor::config("split_config.xxhdpi", vec![], None);
        assert_eq!(apks_entry_name(&split), "base-xxhdpi.apk");
    }
}
