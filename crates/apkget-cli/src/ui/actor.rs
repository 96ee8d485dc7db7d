//! UI Actor - Single-threaded event processing
//!
//! Split downloads run concurrently but stdout is strictly serial. Every
//! task sends [`UiEvent`]s over a channel; one thread owns the
//! [`TableRenderer`] and applies them in order, so two writers never
//! interleave on the terminal and the table needs no lock.

use super::table::{Severity, SplitState, TableRenderer};
use super::theme::Theme;
use crossterm::style::Stylize;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

#[derive(Debug)]
pub enum UiEvent {
    /// Reserve one table row per split.
    PrepareSplits {
        title: String,
        splits: Vec<(String, Option<u64>)>,
    },
    Section(String),
    Split {
        name: String,
        state: SplitState,
    },
    Info(String),
    Success(String),
    Warning(String),
    Error(String),
    Summary {
        count: usize,
        action: String,
        elapsed_secs: f64,
    },
    /// Acknowledged once every earlier event has been rendered.
    Sync(mpsc::Sender<()>),
    Shutdown,
}

#[derive(Debug)]
pub struct UiActor {
    sender: mpsc::Sender<UiEvent>,
    handle: Option<thread::JoinHandle<()>>,
}

impl UiActor {
    pub fn spawn() -> Self {
        let (sender, receiver) = mpsc::channel();
        let handle = thread::spawn(move || run_event_loop(&receiver));
        Self {
            sender,
            handle: Some(handle),
        }
    }

    pub fn sender(&self) -> mpsc::Sender<UiEvent> {
        self.sender.clone()
    }
}

impl Drop for UiActor {
    fn drop(&mut self) {
        let _ = self.sender.send(UiEvent::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run_event_loop(receiver: &mpsc::Receiver<UiEvent>) {
    let theme = Theme::default();
    let mut table = TableRenderer::new(theme.clone());

    loop {
        // 100 ms timeout drives the blinking icons.
        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(UiEvent::PrepareSplits { title, splits }) => {
                println!();
                println!("{}", title.bold());
                table.prepare(&splits);
            }
            Ok(UiEvent::Section(title)) => {
                table.close();
                println!();
                println!("{}", title.bold());
            }
            Ok(UiEvent::Split { name, state }) => table.update(&name, state),
            Ok(UiEvent::Info(msg)) => {
                table.close();
                println!("  {} {}", theme.icons.info.blue(), msg);
            }
            Ok(UiEvent::Success(msg)) => table.print_footer(&msg, Severity::Success),
            Ok(UiEvent::Warning(msg)) => table.print_footer(&msg, Severity::Warning),
            Ok(UiEvent::Error(msg)) => table.print_footer(&msg, Severity::Error),
            Ok(UiEvent::Summary {
                count,
                action,
                elapsed_secs,
            }) => {
                let msg = format!(
                    "{} COMPLETE {count}, elapsed {elapsed_secs:.1}s",
                    action.to_uppercase()
                );
                table.print_footer(&msg, Severity::Success);

                // Machine-readable line for scripts.
                let result = serde_json::json!({
                    "operation": action,
                    "status": "success",
                    "count": count,
                    "elapsed": elapsed_secs,
                });
                println!("\nRESULT {result}");
            }
            Ok(UiEvent::Sync(tx)) => {
                let _ = tx.send(());
            }
            Ok(UiEvent::Shutdown) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
            Err(mpsc::RecvTimeoutError::Timeout) => table.render_active(),
        }
    }
    table.close();
}
