//! Terminal implementation of the core [`Reporter`].

use std::sync::mpsc;

use apkget_core::reporter::{Phase, ProgressEvent, Reporter};
use apkget_schema::{PackageId, SplitDescriptor};

use super::actor::{UiActor, UiEvent};
use super::table::SplitState;

/// Sends every report to the UI actor. Cheap to share behind an `Arc`.
#[derive(Debug)]
pub struct Output {
    sender: mpsc::Sender<UiEvent>,
    // Keeps the actor thread alive as long as any Output exists.
    _actor: Option<std::sync::Arc<UiActor>>,
}

impl Output {
    pub fn new() -> Self {
        let actor = UiActor::spawn();
        Self {
            sender: actor.sender(),
            _actor: Some(std::sync::Arc::new(actor)),
        }
    }

    /// Reporter feeding an existing channel (tests).
    pub fn with_sender(sender: mpsc::Sender<UiEvent>) -> Self {
        Self {
            sender,
            _actor: None,
        }
    }

    fn send(&self, event: UiEvent) {
        let _ = self.sender.send(event);
    }

    /// Block until everything sent so far has been drawn. Call before
    /// reading from the terminal.
    pub fn sync(&self) {
        let (tx, rx) = mpsc::channel();
        self.send(UiEvent::Sync(tx));
        let _ = rx.recv();
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for Output {
    fn section(&self, title: &str) {
        self.send(UiEvent::Section(title.to_string()));
    }

    fn prepare_splits(&self, package: &PackageId, splits: &[SplitDescriptor]) {
        self.send(UiEvent::PrepareSplits {
            title: format!("Downloading {package} ({} files)", splits.len()),
            splits: splits
                .iter()
                .map(|s| (s.name.clone(), s.size_bytes))
                .collect(),
        });
    }

    fn progress(&self, event: &ProgressEvent) {
        let state = match event.phase {
            Phase::Downloading => SplitState::Transferring {
                current: event.bytes_transferred,
                total: event.total_bytes,
                rate: event.rate_bytes_per_sec,
            },
            Phase::Verifying => SplitState::Verifying,
            Phase::Resolving | Phase::Merging | Phase::Signing | Phase::Installing => {
                self.send(UiEvent::Info(format!("{} {}", capitalize(event.phase.label()), event.split)));
                return;
            }
        };
        self.send(UiEvent::Split {
            name: event.split.clone(),
            state,
        });
    }

    fn split_done(&self, split: &str, bytes: u64) {
        self.send(UiEvent::Split {
            name: split.to_string(),
            state: SplitState::Done { bytes },
        });
    }

    fn split_failed(&self, split: &str, reason: &str) {
        self.send(UiEvent::Split {
            name: split.to_string(),
            state: SplitState::Failed {
                reason: reason.to_string(),
            },
        });
    }

    fn retrying(&self, split: &str, attempt: u32, reason: &str) {
        self.send(UiEvent::Split {
            name: split.to_string(),
            state: SplitState::Retrying {
                attempt,
                reason: reason.to_string(),
            },
        });
    }

    fn info(&self, msg: &str) {
        self.send(UiEvent::Info(msg.to_string()));
    }

    fn success(&self, msg: &str) {
        self.send(UiEvent::Success(msg.to_string()));
    }

    fn warning(&self, msg: &str) {
        self.send(UiEvent::Warning(msg.to_string()));
    }

    fn error(&self, msg: &str) {
        self.send(UiEvent::Error(msg.to_string()));
    }

    fn summary(&self, count: usize, action: &str, elapsed_secs: f64) {
        self.send(UiEvent::Summary {
            count,
            action: action.to_string(),
            elapsed_secs,
        });
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars
        .next()
        .map(|c| c.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_maps_to_split_rows() {
        let (tx, rx) = mpsc::channel();
        let output = Output::with_sender(tx);

        output.progress(&ProgressEvent {
            split: "config.arm64_v8a".into(),
            bytes_transferred: 10,
            total_bytes: Some(20),
            rate_bytes_per_sec: 5.0,
            phase: Phase::Downloading,
        });
        output.progress(&ProgressEvent {
            split: "com.example.app".into(),
            bytes_transferred: 0,
            total_bytes: None,
            rate_bytes_per_sec: 0.0,
            phase: Phase::Merging,
        });

        match rx.recv().unwrap() {
            UiEvent::Split { name, state } => {
                assert_eq!(name, "config.arm64_v8a");
                assert!(matches!(state, SplitState::Transferring { current: 10, .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
        match rx.recv().unwrap() {
            UiEvent::Info(msg) => assert_eq!(msg, "Merging com.example.app"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
