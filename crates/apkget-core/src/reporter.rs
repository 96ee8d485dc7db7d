//! Reporter trait for dependency injection
//!
//! Core logic reports progress and status through this trait without being
//! coupled to a terminal UI. The CLI renders it as a live table; tests and
//! scripts use [`NullReporter`].

use std::time::{Duration, Instant};

use apkget_schema::{PackageId, SplitDescriptor};

/// Stage of the pipeline a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Resolving,
    Downloading,
    Verifying,
    Merging,
    Signing,
    Installing,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Resolving => "resolving",
            Self::Downloading => "downloading",
            Self::Verifying => "verifying",
            Self::Merging => "merging",
            Self::Signing => "signing",
            Self::Installing => "installing",
        }
    }
}

/// One progress sample for a split (or for the whole job when `split` names the package).
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub split: String,
    pub bytes_transferred: u64,
    pub total_bytes: Option<u64>,
    pub rate_bytes_per_sec: f64,
    pub phase: Phase,
}

pub trait Reporter: Send + Sync {
    /// Indicates a new section or phase has started (e.g. "Resolving", "Merging").
    fn section(&self, title: &str);

    /// Reserve one display row per split about to be fetched.
    fn prepare_splits(&self, package: &PackageId, splits: &[SplitDescriptor]);

    /// Throttled transfer or phase progress.
    fn progress(&self, event: &ProgressEvent);

    /// A split finished and passed size validation.
    fn split_done(&self, split: &str, bytes: u64);

    /// A split exhausted its attempts.
    fn split_failed(&self, split: &str, reason: &str);

    /// A split attempt failed and another one is scheduled.
    fn retrying(&self, split: &str, attempt: u32, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a success message.
    fn success(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);

    /// Display a final summary.
    fn summary(&self, count: usize, action: &str, elapsed_secs: f64);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title);
    }
    fn prepare_splits(&self, package: &PackageId, splits: &[SplitDescriptor]) {
        (**self).prepare_splits(package, splits);
    }
    fn progress(&self, event: &ProgressEvent) {
        (**self).progress(event);
    }
    fn split_done(&self, split: &str, bytes: u64) {
        (**self).split_done(split, bytes);
    }
    fn split_failed(&self, split: &str, reason: &str) {
        (**self).split_failed(split, reason);
    }
    fn retrying(&self, split: &str, attempt: u32, reason: &str) {
        (**self).retrying(split, attempt, reason);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn success(&self, msg: &str) {
        (**self).success(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
    fn error(&self, msg: &str) {
        (**self).error(msg);
    }
    fn summary(&self, count: usize, action: &str, elapsed_secs: f64) {
        (**self).summary(count, action, elapsed_secs);
    }
}

/// A no-op reporter for silent operations (scripts, tests).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn prepare_splits(&self, _: &PackageId, _: &[SplitDescriptor]) {}
    fn progress(&self, _: &ProgressEvent) {}
    fn split_done(&self, _: &str, _: u64) {}
    fn split_failed(&self, _: &str, _: &str) {}
    fn retrying(&self, _: &str, _: u32, _: &str) {}
    fn info(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
    fn summary(&self, _: usize, _: &str, _: f64) {}
}

/// Minimum spacing between two progress events of the same transfer.
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Rate limiter for progress events.
///
/// `tick` returns the instantaneous rate when an event is due, `None` when
/// the caller should stay quiet. `finish` always yields a rate so the last
/// sample of a transfer is never dropped.
#[derive(Debug)]
pub struct ProgressThrottle {
    interval: Duration,
    last_emit: Instant,
    last_bytes: u64,
    started: Instant,
}

impl ProgressThrottle {
    pub fn new() -> Self {
        Self::with_interval(PROGRESS_INTERVAL, Instant::now())
    }

    pub fn with_interval(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last_emit: now,
            last_bytes: 0,
            started: now,
        }
    }

    pub fn tick(&mut self, transferred: u64) -> Option<f64> {
        self.tick_at(Instant::now(), transferred)
    }

    pub fn tick_at(&mut self, now: Instant, transferred: u64) -> Option<f64> {
        let elapsed = now.saturating_duration_since(self.last_emit);
        if elapsed < self.interval {
            return None;
        }
        let rate = transferred.saturating_sub(self.last_bytes) as f64 / elapsed.as_secs_f64();
        self.last_emit = now;
        self.last_bytes = transferred;
        Some(rate)
    }

    /// Average rate over the whole transfer.
    pub fn finish(&mut self, transferred: u64) -> f64 {
        self.finish_at(Instant::now(), transferred)
    }

    pub fn finish_at(&mut self, now: Instant, transferred: u64) -> f64 {
        let elapsed = now.saturating_duration_since(self.started).as_secs_f64();
        self.last_emit = now;
        self.last_bytes = transferred;
        if elapsed > 0.0 {
            transferred as f64 / elapsed
        } else {
            0.0
        }
    }
}

impl Default for ProgressThrottle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttle_suppresses_bursts() {
        let start = Instant::now();
        let mut throttle = ProgressThrottle::with_interval(PROGRESS_INTERVAL, start);

        let mut emitted = 0;
        // 50 chunks, 10 ms apart: 500 ms of transfer.
        for i in 1..=50u64 {
            let now = start + Duration::from_millis(i * 10);
            if throttle.tick_at(now, i * 1024).is_some() {
                emitted += 1;
            }
        }
        assert!(emitted <= 5, "emitted {emitted} events in 500ms");
        assert!(emitted >= 4);
    }

    #[test]
    fn test_rate_is_bytes_per_second_since_last_event() {
        let start = Instant::now();
        let mut throttle = ProgressThrottle::with_interval(PROGRESS_INTERVAL, start);

        let rate = throttle
            .tick_at(start + Duration::from_millis(500), 1000)
            .unwrap();
        assert!((rate - 2000.0).abs() < 1.0);

        let rate = throttle
            .tick_at(start + Duration::from_millis(1000), 1500)
            .unwrap();
        assert!((rate - 1000.0).abs() < 1.0);
    }

    #[test]
    fn test_finish_always_reports() {
        let start = Instant::now();
        let mut throttle = ProgressThrottle::with_interval(PROGRESS_INTERVAL, start);
        assert!(throttle.tick_at(start + Duration::from_millis(5), 10).is_none());

        let rate = throttle.finish_at(start + Duration::from_secs(2), 4096);
        assert!((rate - 2048.0).abs() < 1.0);
    }
}
