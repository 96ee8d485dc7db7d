//! Progress Indicators
//!
//! Blinking activity icon and the status text for a transfer in flight.

use super::theme::{Icons, format_size};
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct ProgressIndicator {
    start_time: Instant,
    icons: Icons,
}

impl ProgressIndicator {
    pub fn new(icons: Icons) -> Self {
        Self {
            start_time: Instant::now(),
            icons,
        }
    }

    /// Current animation frame. Wall-clock based, so it does not depend on
    /// how often rows are redrawn.
    pub fn current_icon(&self) -> &'static str {
        if self.frame() % 2 == 0 {
            self.icons.active
        } else {
            self.icons.pending
        }
    }

    /// 200 ms per frame.
    pub fn frame(&self) -> usize {
        self.start_time.elapsed().as_millis() as usize / 200
    }
}

impl Default for ProgressIndicator {
    fn default() -> Self {
        Self::new(Icons::default())
    }
}

/// `42%  1.2 MB / 2.9 MB  850.0 KB/s`, or without the percentage when the
/// total is unknown.
pub fn format_transfer(current: u64, total: Option<u64>, rate: f64) -> String {
    let rate = if rate > 0.0 {
        format!("  {}/s", format_size(rate as u64))
    } else {
        String::new()
    };

    match total.filter(|&t| t > 0) {
        Some(t) => {
            let pct = (current.min(t) * 100) / t;
            format!(
                "{pct:>3}%  {} / {}{rate}",
                format_size(current),
                format_size(t)
            )
        }
        None => format!("{}{rate}", format_size(current)),
    }
}
