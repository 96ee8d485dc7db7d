//! Split table - one live row per split being downloaded.

use super::engine::SplitFrame;
use super::progress::{ProgressIndicator, format_transfer};
use super::theme::{Theme, format_size};
use crossterm::style::Stylize;
use std::io::Write;

#[derive(Clone, Debug, PartialEq)]
pub enum SplitState {
    Pending,
    Transferring {
        current: u64,
        total: Option<u64>,
        rate: f64,
    },
    Verifying,
    Retrying {
        attempt: u32,
        reason: String,
    },
    Done {
        bytes: u64,
    },
    Failed {
        reason: String,
    },
}

impl SplitState {
    fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Transferring { .. } | Self::Verifying | Self::Retrying { .. }
        )
    }
}

#[derive(Clone, Debug)]
struct SplitRow {
    name: String,
    declared: Option<u64>,
    state: SplitState,
}

#[derive(Debug)]
pub struct TableRenderer {
    rows: Vec<SplitRow>,
    theme: Theme,
    progress: ProgressIndicator,
    frame: Option<SplitFrame>,
}

/// Message severity for footer lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Success,
    Warning,
    Error,
}

impl TableRenderer {
    pub fn new(theme: Theme) -> Self {
        Self {
            rows: Vec::new(),
            theme,
            progress: ProgressIndicator::default(),
            frame: None,
        }
    }

    /// Reserve one row per split and draw them as pending.
    pub fn prepare(&mut self, splits: &[(String, Option<u64>)]) {
        self.close();
        self.rows = splits
            .iter()
            .map(|(name, declared)| SplitRow {
                name: name.clone(),
                declared: *declared,
                state: SplitState::Pending,
            })
            .collect();

        println!();
        let mut frame = SplitFrame::stdout();
        for row in &self.rows {
            let _ = frame.push(&row.name);
        }
        self.frame = Some(frame);
        self.render_all();
    }

    pub fn is_active(&self) -> bool {
        self.frame.is_some()
    }

    /// Record a split's new state and redraw its row. A split that was not
    /// announced up front gets a row appended while the frame is open.
    pub fn update(&mut self, name: &str, state: SplitState) {
        let idx = match self.rows.iter().position(|r| r.name == name) {
            Some(idx) => idx,
            None if self.frame.is_some() => {
                self.rows.push(SplitRow {
                    name: name.to_string(),
                    declared: None,
                    state: SplitState::Pending,
                });
                self.rows.len() - 1
            }
            None => return,
        };
        self.rows[idx].state = state;
        self.render_row(idx);
        if let Some(frame) = self.frame.as_mut() {
            let _ = frame.flush();
        }
    }

    /// Redraw rows whose icon blinks.
    pub fn render_active(&mut self) {
        let active: Vec<usize> = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.state.is_active())
            .map(|(i, _)| i)
            .collect();
        if active.is_empty() {
            return;
        }
        for idx in active {
            self.render_row(idx);
        }
        if let Some(frame) = self.frame.as_mut() {
            let _ = frame.flush();
        }
    }

    pub fn render_all(&mut self) {
        for idx in 0..self.rows.len() {
            self.render_row(idx);
        }
        if let Some(frame) = self.frame.as_mut() {
            let _ = frame.flush();
        }
    }

    fn render_row(&mut self, idx: usize) {
        let Some(frame) = self.frame.as_mut() else {
            return;
        };
        let row = &self.rows[idx];
        let theme = &self.theme;

        let (icon, color) = match &row.state {
            SplitState::Pending => (theme.icons.pending, theme.colors.secondary),
            SplitState::Transferring { .. } | SplitState::Verifying => {
                (self.progress.current_icon(), theme.colors.active)
            }
            SplitState::Retrying { .. } => (self.progress.current_icon(), theme.colors.warning),
            SplitState::Done { .. } => (theme.icons.success, theme.colors.success),
            SplitState::Failed { .. } => (theme.icons.error, theme.colors.error),
        };

        let status = match &row.state {
            SplitState::Pending => "queued".to_string(),
            SplitState::Transferring {
                current,
                total,
                rate,
            } => format_transfer(*current, total.or(row.declared), *rate),
            SplitState::Verifying => "verifying".to_string(),
            SplitState::Retrying { attempt, reason } => {
                format!("retrying after attempt {attempt}: {reason}")
            }
            SplitState::Done { .. } => "done".to_string(),
            SplitState::Failed { reason } => format!("FAILED: {reason}"),
        };

        let size = match (&row.state, row.declared) {
            (SplitState::Done { bytes }, _) => format_size(*bytes),
            (_, Some(declared)) => format_size(declared),
            _ => "-".to_string(),
        };

        let name = format!("  {icon} {}", row.name);
        let line = format!(
            "{} {} {}",
            format!("{name:<width$}", width = theme.layout.name_width).with(theme.colors.package_name),
            format!("{size:>width$}", width = theme.layout.size_width).with(theme.colors.version),
            status.with(color)
        );

        let _ = frame.draw(&row.name, |stdout| write!(stdout, "{line}"));
    }

    /// Finish the frame so normal lines print below it.
    pub fn close(&mut self) {
        if let Some(mut frame) = self.frame.take() {
            let _ = frame.finish();
        }
    }

    pub fn print_footer(&mut self, message: &str, severity: Severity) {
        self.close();
        match severity {
            Severity::Success => {
                println!("{} {}", self.theme.icons.success.green(), message.green());
            }
            Severity::Warning => {
                println!("{} {}", self.theme.icons.warning.yellow(), message.yellow());
            }
            Severity::Error => println!("{} {}", self.theme.icons.error.red(), message.red()),
        }
    }
}

impl Default for TableRenderer {
    fn default() -> Self {
        Self::new(Theme::default())
    }
}

impl Drop for TableRenderer {
    fn drop(&mut self) {
        self.close();
    }
}
