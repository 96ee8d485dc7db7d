//! Merge orchestrator.
//!
//! Turns a [`StagedSplitSet`] into something installable with one of the five
//! [`MergeMethod`]s. Staged files are only ever read. Artifacts are written
//! into a scratch directory next to the destination and renamed into place
//! once complete, so a failed or cancelled merge never leaves a truncated
//! file at the output path.

pub mod adb;
pub mod bundle;
mod editor;
mod sign;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tracing::{info, warn};

use apkget_schema::{MergeMethod, PackageId};

use crate::config::SigningKey;
use crate::error::{Error, Result};
use crate::io::{StagedSplit, StagedSplitSet};
use crate::reporter::{NullReporter, Phase, ProgressEvent, Reporter};
use crate::tools::{Tool, ToolGateway};

pub use bundle::{XapkManifest, XapkSplit, read_xapk_manifest};

/// Result of a successful merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// A file was written.
    Artifact(PathBuf),
    /// Splits went straight to a device.
    Installed { device: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeState {
    Pending,
    Running,
    Succeeded(MergeOutcome),
    Failed(String),
}

/// One merge request against a staged set.
#[derive(Debug, Clone)]
pub struct MergeJob {
    pub method: MergeMethod,
    pub output: Option<PathBuf>,
    state: MergeState,
}

impl MergeJob {
    pub fn new(method: MergeMethod, output: Option<PathBuf>) -> Self {
        Self {
            method,
            output,
            state: MergeState::Pending,
        }
    }

    pub fn state(&self) -> &MergeState {
        &self.state
    }
}

/// Owned copy of what a merge reads, so blocking work can move off the runtime.
#[derive(Debug, Clone)]
pub(crate) struct MergeInputs {
    pub(crate) package_id: PackageId,
    pub(crate) display_version: String,
    pub(crate) version_code: u64,
    pub(crate) splits: Vec<StagedSplit>,
    pub(crate) dir: PathBuf,
}

impl MergeInputs {
    fn from_set(set: &StagedSplitSet) -> Self {
        Self {
            package_id: set.package_id.clone(),
            display_version: set.display_version.clone(),
            version_code: set.version_code,
            splits: set.all().cloned().collect(),
            dir: set.dir().to_path_buf(),
        }
    }

    fn paths(&self) -> Vec<PathBuf> {
        self.splits.iter().map(|s| s.path.clone()).collect()
    }
}

/// Scratch directory beside the destination. Dropping it discards the
/// partial artifact; `commit` renames it over the destination.
struct OutputSlot {
    dir: TempDir,
    dest: PathBuf,
}

impl OutputSlot {
    fn new(dest: &Path) -> Result<Self> {
        let parent = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;
        let dir = tempfile::Builder::new()
            .prefix(".apkget-")
            .tempdir_in(&parent)?;
        Ok(Self {
            dir,
            dest: dest.to_path_buf(),
        })
    }

    fn scratch(&self) -> PathBuf {
        let name = self
            .dest
            .file_name()
            .map_or_else(|| "artifact".into(), std::ffi::OsStr::to_os_string);
        self.dir.path().join(name)
    }

    fn dir(&self) -> &Path {
        self.dir.path()
    }

    fn commit_from(self, produced: &Path) -> Result<PathBuf> {
        std::fs::rename(produced, &self.dest)?;
        Ok(self.dest)
    }

    fn commit(self) -> Result<PathBuf> {
        let produced = self.scratch();
        self.commit_from(&produced)
    }
}

/// Default artifact name in the current directory.
pub fn default_output(method: MergeMethod, package: &PackageId, monolithic: bool) -> PathBuf {
    if monolithic {
        return PathBuf::from(format!("{package}.apk"));
    }
    PathBuf::from(match method {
        MergeMethod::XapkBundle => format!("{package}.xapk"),
        MergeMethod::ApksBundle => format!("{package}.apks"),
        MergeMethod::ApkEditorMerge | MergeMethod::AdbInstall => format!("{package}_merged.apk"),
        MergeMethod::FullMergeAndSign => format!("{package}_signed.apk"),
    })
}

/// Tools a method needs before it touches any file.
pub fn required_tools(method: MergeMethod) -> &'static [Tool] {
    match method {
        MergeMethod::XapkBundle | MergeMethod::ApksBundle => &[],
        MergeMethod::ApkEditorMerge => &[Tool::Java, Tool::ApkEditor],
        MergeMethod::AdbInstall => &[Tool::Adb],
        MergeMethod::FullMergeAndSign => &[Tool::Java, Tool::ApkEditor, Tool::ApkSigner],
    }
}

pub struct Orchestrator {
    gateway: Arc<dyn ToolGateway>,
    reporter: Arc<dyn Reporter>,
    signing_key: Option<SigningKey>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("signing_key", &self.signing_key.as_ref().map(|k| &k.keystore))
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(gateway: Arc<dyn ToolGateway>) -> Self {
        Self {
            gateway,
            reporter: Arc::new(NullReporter),
            signing_key: None,
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_signing_key(mut self, key: Option<SigningKey>) -> Self {
        self.signing_key = key;
        self
    }

    /// Run `job` against `set`, driving the job's state machine.
    ///
    /// The set is left untouched either way; on failure the caller may build a
    /// new job with another method against the same set.
    pub async fn merge(&self, set: &StagedSplitSet, job: &mut MergeJob) -> Result<MergeOutcome> {
        job.state = MergeState::Running;
        info!(package = %set.package_id, method = %job.method, "merging");

        let result = self.dispatch(set, job.method, job.output.clone()).await;
        job.state = match &result {
            Ok(outcome) => MergeState::Succeeded(outcome.clone()),
            Err(e) => MergeState::Failed(e.to_string()),
        };
        result
    }

    async fn dispatch(
        &self,
        set: &StagedSplitSet,
        method: MergeMethod,
        output: Option<PathBuf>,
    ) -> Result<MergeOutcome> {
        let inputs = MergeInputs::from_set(set);
        let monolithic = set.is_monolithic() && method.produces_artifact();
        let dest = output.unwrap_or_else(|| default_output(method, &set.package_id, monolithic));

        if !monolithic {
            for tool in required_tools(method) {
                self.gateway.locate(*tool)?;
            }
        }

        let label = set.package_id.to_string();
        if monolithic {
            self.phase(&label, Phase::Merging);
            let path = blocking(move || export_base(&inputs, &dest)).await?;
            return Ok(MergeOutcome::Artifact(path));
        }

        match method {
            MergeMethod::XapkBundle => {
                self.phase(&label, Phase::Merging);
                let path = blocking(move || {
                    let slot = OutputSlot::new(&dest)?;
                    bundle::write_xapk(&inputs, &slot.scratch())?;
                    slot.commit()
                })
                .await?;
                Ok(MergeOutcome::Artifact(path))
            }
            MergeMethod::ApksBundle => {
                self.phase(&label, Phase::Merging);
                let path = blocking(move || {
                    let slot = OutputSlot::new(&dest)?;
                    bundle::write_apks(&inputs, &slot.scratch())?;
                    slot.commit()
                })
                .await?;
                Ok(MergeOutcome::Artifact(path))
            }
            MergeMethod::ApkEditorMerge => {
                self.phase(&label, Phase::Merging);
                let gateway = Arc::clone(&self.gateway);
                let path = blocking(move || {
                    let slot = OutputSlot::new(&dest)?;
                    editor::merge_dir(gateway.as_ref(), &inputs.dir, &slot.scratch())?;
                    slot.commit()
                })
                .await?;
                Ok(MergeOutcome::Artifact(path))
            }
            MergeMethod::AdbInstall => {
                self.phase(&label, Phase::Installing);
                let gateway = Arc::clone(&self.gateway);
                let device = blocking(move || adb::install(gateway.as_ref(), &inputs.paths())).await?;
                Ok(MergeOutcome::Installed { device })
            }
            MergeMethod::FullMergeAndSign => self.merge_and_sign(inputs, dest, &label).await,
        }
    }

    /// Merge with APKEditor, then sign. The unsigned APK lives in the
    /// destination's scratch slot and only lands beside the destination
    /// when signing fails.
    async fn merge_and_sign(
        &self,
        inputs: MergeInputs,
        dest: PathBuf,
        label: &str,
    ) -> Result<MergeOutcome> {
        let keep = unsigned_keep_path(&dest, &inputs.package_id);

        self.phase(label, Phase::Merging);
        let gateway = Arc::clone(&self.gateway);
        let (slot, unsigned) = blocking(move || {
            let slot = OutputSlot::new(&dest)?;
            let unsigned = slot.dir().join(format!("{}_merged.apk", inputs.package_id));
            editor::merge_dir(gateway.as_ref(), &inputs.dir, &unsigned)?;
            Ok((slot, unsigned))
        })
        .await?;

        self.phase(label, Phase::Signing);
        let gateway = Arc::clone(&self.gateway);
        let key = self.signing_key.clone();
        let signing = blocking(move || {
            let signed_dir = slot.dir().join("signed");
            std::fs::create_dir(&signed_dir)?;
            match sign::sign(gateway.as_ref(), &unsigned, &signed_dir, key.as_ref()) {
                Ok(produced) => slot.commit_from(&produced).map(Signing::Signed),
                Err(error) => {
                    let kept = match std::fs::rename(&unsigned, &keep) {
                        Ok(()) => Some(keep),
                        Err(e) => {
                            warn!(path = %keep.display(), error = %e, "could not keep unsigned APK");
                            None
                        }
                    };
                    Ok(Signing::Failed { error, kept })
                }
            }
        })
        .await?;

        match signing {
            Signing::Signed(path) => Ok(MergeOutcome::Artifact(path)),
            Signing::Failed { error, kept } => {
                if let Some(kept) = kept {
                    self.reporter.warning(&format!(
                        "Signing failed; unsigned APK kept at {}",
                        kept.display()
                    ));
                }
                Err(error)
            }
        }
    }

    fn phase(&self, label: &str, phase: Phase) {
        self.reporter.progress(&ProgressEvent {
            split: label.to_string(),
            bytes_transferred: 0,
            total_bytes: None,
            rate_bytes_per_sec: 0.0,
            phase,
        });
    }
}

enum Signing {
    Signed(PathBuf),
    Failed { error: Error, kept: Option<PathBuf> },
}

/// Where an unsigned APK is kept after a failed sign: `<pkg>_merged.apk`,
/// unless that is the destination itself.
fn unsigned_keep_path(dest: &Path, package: &PackageId) -> PathBuf {
    let merged = dest.with_file_name(format!("{package}_merged.apk"));
    if merged == dest {
        dest.with_file_name(format!("{package}_unsigned.apk"))
    } else {
        merged
    }
}

fn export_base(inputs: &MergeInputs, dest: &Path) -> Result<PathBuf> {
    let Some(base) = inputs.splits.first() else {
        return Err(Error::Config("staged set has no base split".into()));
    };
    let slot = OutputSlot::new(dest)?;
    std::fs::copy(&base.path, slot.scratch())?;
    slot.commit()
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(std::io::Error::other)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{StagingArea, StagedSplitSet};
    use crate::tools::ToolOutput;
    use apkget_schema::{Arch, SplitDescriptor};
    use std::collections::HashSet;
    use std::ffi::OsString;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Scripted gateway: records calls, simulates tool outputs.
    #[derive(Default)]
    struct FakeGateway {
        installed: HashSet<Tool>,
        fail: HashSet<Tool>,
        devices: String,
        install_stdout: String,
        calls: Mutex<Vec<(Tool, Vec<String>)>>,
    }

    impl FakeGateway {
        fn with(tools: &[Tool]) -> Self {
            Self {
                installed: tools.iter().copied().collect(),
                ..Self::default()
            }
        }

        fn calls_to(&self, tool: Tool) -> Vec<Vec<String>> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(t, _)| *t == tool)
                .map(|(_, a)| a.clone())
                .collect()
        }
    }

    fn arg_after(args: &[String], flag: &str) -> PathBuf {
        let idx = args.iter().position(|a| a == flag).unwrap();
        PathBuf::from(&args[idx + 1])
    }

    impl ToolGateway for FakeGateway {
        fn locate(&self, tool: Tool) -> Result<PathBuf> {
            if self.installed.contains(&tool) {
                Ok(PathBuf::from("/fake").join(tool.file_name()))
            } else {
                Err(Error::ToolNotInstalled {
                    tool,
                    expected: PathBuf::from("/fake/tools").join(tool.file_name()),
                })
            }
        }

        fn run(&self, tool: Tool, args: &[OsString]) -> Result<ToolOutput> {
            self.locate(tool)?;
            let args: Vec<String> = args
                .iter()
                .map(|a| a.to_string_lossy().into_owned())
                .collect();
            self.calls.lock().unwrap().push((tool, args.clone()));

            if self.fail.contains(&tool) {
                return Ok(ToolOutput {
                    exit_code: Some(1),
                    stdout: String::new(),
                    stderr: format!("{tool} exploded"),
                });
            }

            let stdout = match tool {
                Tool::ApkEditor => {
                    std::fs::write(arg_after(&args, "-o"), b"merged").unwrap();
                    String::new()
                }
                Tool::ApkSigner => {
                    let out = arg_after(&args, "-o");
                    std::fs::write(out.join("app_merged-aligned-debugSigned.apk"), b"signed")
                        .unwrap();
                    String::new()
                }
                Tool::Adb if args.first().map(String::as_str) == Some("devices") => {
                    self.devices.clone()
                }
                _ => self.install_stdout.clone(),
            };
            Ok(ToolOutput {
                exit_code: Some(0),
                stdout,
                stderr: String::new(),
            })
        }
    }

    fn staged(root: &Path, configs: &[&str]) -> StagedSplitSet {
        let package = PackageId::parse("com.example.app").unwrap();
        let area = StagingArea::create(root, &package).unwrap();

        let make = |d: SplitDescriptor| {
            let path = area.file_for(&d);
            std::fs::write(&path, d.name.as_bytes()).unwrap();
            StagedSplit {
                bytes: d.name.len() as u64,
                descriptor: d,
                path,
            }
        };
        let base = make(SplitDescriptor::base(vec![], None));
        let configs = configs
            .iter()
            .map(|n| make(SplitDescriptor::config(n, vec![], None)))
            .collect();

        StagedSplitSet::new(package, "1.0".into(), 100, Arch::Arm64, base, configs, area)
    }

    fn orchestrator(gateway: FakeGateway) -> (Orchestrator, Arc<FakeGateway>) {
        let gateway = Arc::new(gateway);
        (Orchestrator::new(gateway.clone()), gateway)
    }

    fn snapshot_dir(dir: &Path) -> Vec<(String, Vec<u8>)> {
        let mut out: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| {
                let e = e.unwrap();
                (
                    e.file_name().to_string_lossy().into_owned(),
                    std::fs::read(e.path()).unwrap(),
                )
            })
            .collect();
        out.sort();
        out
    }

    #[tokio::test]
    async fn test_xapk_round_trip_matches_staged_set() {
        let root = tempdir().unwrap();
        let out = tempdir().unwrap();
        let set = staged(root.path(), &["config.arm64_v8a", "config.xxhdpi", "config.en"]);
        let (orch, _) = orchestrator(FakeGateway::default());

        let dest = out.path().join("app.xapk");
        let mut job = MergeJob::new(MergeMethod::XapkBundle, Some(dest.clone()));
        let outcome = orch.merge(&set, &mut job).await.unwrap();
        assert_eq!(outcome, MergeOutcome::Artifact(dest.clone()));
        assert_eq!(job.state(), &MergeState::Succeeded(outcome));

        let manifest = read_xapk_manifest(&dest).unwrap();
        let mut listed: Vec<String> = manifest.split_apks.iter().map(|s| s.id.clone()).collect();
        let mut staged_ids: Vec<String> = set.all().map(|s| s.descriptor.id()).collect();
        listed.sort();
        staged_ids.sort();
        assert_eq!(listed, staged_ids);

        // No scratch directories left beside the artifact.
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_staged_files_are_not_mutated() {
        let root = tempdir().unwrap();
        let out = tempdir().unwrap();
        let set = staged(root.path(), &["config.arm64_v8a"]);
        let before = snapshot_dir(set.dir());
        let (orch, _) = orchestrator(FakeGateway::with(&[Tool::Java, Tool::ApkEditor]));

        for method in [
            MergeMethod::XapkBundle,
            MergeMethod::ApksBundle,
            MergeMethod::ApkEditorMerge,
        ] {
            let mut job = MergeJob::new(method, Some(out.path().join(format!("{}.out", method.index()))));
            orch.merge(&set, &mut job).await.unwrap();
            assert_eq!(snapshot_dir(set.dir()), before);
        }
    }

    #[tokio::test]
    async fn test_apkeditor_missing_leaves_output_untouched() {
        let root = tempdir().unwrap();
        let out = tempdir().unwrap();
        let set = staged(root.path(), &["config.arm64_v8a"]);
        let (orch, gateway) = orchestrator(FakeGateway::with(&[Tool::Java]));

        let dest = out.path().join("sub").join("app_merged.apk");
        let mut job = MergeJob::new(MergeMethod::ApkEditorMerge, Some(dest.clone()));
        let err = orch.merge(&set, &mut job).await.unwrap_err();

        match err {
            Error::ToolNotInstalled { tool, expected } => {
                assert_eq!(tool, Tool::ApkEditor);
                assert_eq!(expected, PathBuf::from("/fake/tools/APKEditor.jar"));
            }
            other => panic!("expected ToolNotInstalled, got {other:?}"),
        }
        assert!(matches!(job.state(), MergeState::Failed(_)));
        assert!(!dest.exists());
        assert!(!dest.parent().unwrap().exists());
        assert!(gateway.calls_to(Tool::ApkEditor).is_empty());
    }

    #[tokio::test]
    async fn test_apkeditor_failure_is_attributed() {
        let root = tempdir().unwrap();
        let out = tempdir().unwrap();
        let set = staged(root.path(), &["config.arm64_v8a"]);
        let mut gateway = FakeGateway::with(&[Tool::Java, Tool::ApkEditor]);
        gateway.fail.insert(Tool::ApkEditor);
        let (orch, _) = orchestrator(gateway);

        let dest = out.path().join("app_merged.apk");
        let mut job = MergeJob::new(MergeMethod::ApkEditorMerge, Some(dest.clone()));
        match orch.merge(&set, &mut job).await.unwrap_err() {
            Error::MergeToolFailed {
                tool,
                exit_code,
                stderr,
            } => {
                assert_eq!(tool, Tool::ApkEditor);
                assert_eq!(exit_code, Some(1));
                assert!(stderr.contains("exploded"));
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(!dest.exists());
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_signing_failure_keeps_unsigned_intermediate() {
        let root = tempdir().unwrap();
        let out = tempdir().unwrap();
        let set = staged(root.path(), &["config.arm64_v8a"]);
        let mut gateway = FakeGateway::with(&[Tool::Java, Tool::ApkEditor, Tool::ApkSigner]);
        gateway.fail.insert(Tool::ApkSigner);
        let (orch, _) = orchestrator(gateway);

        let dest = out.path().join("com.example.app_signed.apk");
        let mut job = MergeJob::new(MergeMethod::FullMergeAndSign, Some(dest.clone()));
        match orch.merge(&set, &mut job).await.unwrap_err() {
            Error::MergeToolFailed { tool, .. } => assert_eq!(tool, Tool::ApkSigner),
            other => panic!("unexpected: {other:?}"),
        }

        let intermediate = out.path().join("com.example.app_merged.apk");
        assert_eq!(std::fs::read(&intermediate).unwrap(), b"merged");
        assert!(!dest.exists());
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 1);
    }

    fn signing_gateway() -> FakeGateway {
        FakeGateway::with(&[Tool::Java, Tool::ApkEditor, Tool::ApkSigner])
    }

    #[tokio::test]
    async fn test_signed_output_may_use_the_merged_name() {
        let root = tempdir().unwrap();
        let out = tempdir().unwrap();
        let set = staged(root.path(), &["config.arm64_v8a"]);
        let (orch, _) = orchestrator(signing_gateway());

        let dest = out.path().join("com.example.app_merged.apk");
        let mut job = MergeJob::new(MergeMethod::FullMergeAndSign, Some(dest.clone()));
        let outcome = orch.merge(&set, &mut job).await.unwrap();

        assert_eq!(outcome, MergeOutcome::Artifact(dest.clone()));
        assert_eq!(std::fs::read(&dest).unwrap(), b"signed");
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_signing_leaves_existing_merged_apk_alone() {
        let root = tempdir().unwrap();
        let out = tempdir().unwrap();
        let set = staged(root.path(), &["config.arm64_v8a"]);
        let earlier = out.path().join("com.example.app_merged.apk");
        std::fs::write(&earlier, b"earlier merge").unwrap();
        let (orch, _) = orchestrator(signing_gateway());

        let dest = out.path().join("com.example.app_signed.apk");
        let mut job = MergeJob::new(MergeMethod::FullMergeAndSign, Some(dest.clone()));
        orch.merge(&set, &mut job).await.unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"signed");
        assert_eq!(std::fs::read(&earlier).unwrap(), b"earlier merge");
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_signing_failure_does_not_claim_the_destination() {
        let root = tempdir().unwrap();
        let out = tempdir().unwrap();
        let set = staged(root.path(), &["config.arm64_v8a"]);
        let mut gateway = signing_gateway();
        gateway.fail.insert(Tool::ApkSigner);
        let (orch, _) = orchestrator(gateway);

        let dest = out.path().join("com.example.app_merged.apk");
        let mut job = MergeJob::new(MergeMethod::FullMergeAndSign, Some(dest.clone()));
        assert!(orch.merge(&set, &mut job).await.is_err());

        assert!(!dest.exists());
        let kept = out.path().join("com.example.app_unsigned.apk");
        assert_eq!(std::fs::read(&kept).unwrap(), b"merged");
    }

    #[tokio::test]
    async fn test_full_merge_and_sign() {
        let root = tempdir().unwrap();
        let out = tempdir().unwrap();
        let set = staged(root.path(), &["config.arm64_v8a"]);
        let (orch, gateway) = orchestrator(FakeGateway::with(&[
            Tool::Java,
            Tool::ApkEditor,
            Tool::ApkSigner,
        ]));

        let dest = out.path().join("com.example.app_signed.apk");
        let mut job = MergeJob::new(MergeMethod::FullMergeAndSign, Some(dest.clone()));
        orch.merge(&set, &mut job).await.unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"signed");
        assert!(!out.path().join("com.example.app_merged.apk").exists());
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 1);

        let sign_args = &gateway.calls_to(Tool::ApkSigner)[0];
        assert!(sign_args.contains(&"--allowResign".to_string()));
    }

    #[tokio::test]
    async fn test_signer_missing_is_checked_before_merging() {
        let root = tempdir().unwrap();
        let out = tempdir().unwrap();
        let set = staged(root.path(), &["config.arm64_v8a"]);
        let (orch, gateway) = orchestrator(FakeGateway::with(&[Tool::Java, Tool::ApkEditor]));

        let mut job = MergeJob::new(
            MergeMethod::FullMergeAndSign,
            Some(out.path().join("signed.apk")),
        );
        assert!(matches!(
            orch.merge(&set, &mut job).await,
            Err(Error::ToolNotInstalled {
                tool: Tool::ApkSigner,
                ..
            })
        ));
        assert!(gateway.calls_to(Tool::ApkEditor).is_empty());
    }

    #[tokio::test]
    async fn test_adb_without_device() {
        let root = tempdir().unwrap();
        let set = staged(root.path(), &["config.arm64_v8a"]);
        let mut gateway = FakeGateway::with(&[Tool::Adb]);
        gateway.devices = "List of devices attached\n\n".into();
        let (orch, _) = orchestrator(gateway);

        let mut job = MergeJob::new(MergeMethod::AdbInstall, None);
        assert!(matches!(
            orch.merge(&set, &mut job).await,
            Err(Error::NoDeviceConnected)
        ));
    }

    #[tokio::test]
    async fn test_adb_install_and_rejection() {
        let root = tempdir().unwrap();
        let set = staged(root.path(), &["config.arm64_v8a", "config.xhdpi"]);

        let mut gateway = FakeGateway::with(&[Tool::Adb]);
        gateway.devices = "List of devices attached\nemulator-5554\tdevice\n".into();
        gateway.install_stdout = "Success\n".into();
        let (orch, fake) = orchestrator(gateway);

        let mut job = MergeJob::new(MergeMethod::AdbInstall, None);
        let outcome = orch.merge(&set, &mut job).await.unwrap();
        assert_eq!(
            outcome,
            MergeOutcome::Installed {
                device: "emulator-5554".into()
            }
        );
        let install = fake
            .calls_to(Tool::Adb)
            .into_iter()
            .find(|a| a.contains(&"install-multiple".to_string()))
            .unwrap();
        assert_eq!(install.iter().filter(|a| a.ends_with(".apk")).count(), 3);

        let mut gateway = FakeGateway::with(&[Tool::Adb]);
        gateway.devices = "List of devices attached\nemulator-5554\tdevice\n".into();
        gateway.install_stdout = "Failure [INSTALL_FAILED_OLDER_SDK]\n".into();
        let (orch, _) = orchestrator(gateway);
        let mut job = MergeJob::new(MergeMethod::AdbInstall, None);
        match orch.merge(&set, &mut job).await.unwrap_err() {
            Error::InstallRejected { message } => assert!(message.contains("INSTALL_FAILED_OLDER_SDK")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_single_apk_is_exported_as_is() {
        let root = tempdir().unwrap();
        let out = tempdir().unwrap();
        let set = staged(root.path(), &[]);
        let (orch, gateway) = orchestrator(FakeGateway::default());

        let dest = out.path().join("com.example.app.apk");
        let mut job = MergeJob::new(MergeMethod::ApkEditorMerge, Some(dest.clone()));
        orch.merge(&set, &mut job).await.unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"base");
        assert!(gateway.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_default_output_names() {
        let pkg = PackageId::parse("com.example.app").unwrap();
        assert_eq!(
            default_output(MergeMethod::XapkBundle, &pkg, false),
            PathBuf::from("com.example.app.xapk")
        );
        assert_eq!(
            default_output(MergeMethod::FullMergeAndSign, &pkg, false),
            PathBuf::from("com.example.app_signed.apk")
        );
        assert_eq!(
            default_output(MergeMethod::ApksBundle, &pkg, true),
            PathBuf::from("com.example.app.apk")
        );
    }
}
