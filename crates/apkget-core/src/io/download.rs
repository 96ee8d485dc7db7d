//! Artifact fetcher: streams selected splits into a staging area.
//!
//! Splits download concurrently through a small bounded pool. Each split is
//! retried on its own (rotating mirrors) and the whole fetch only succeeds
//! once every split is on disk with the expected size. The first split that
//! exhausts its attempts aborts the remaining transfers.

use std::path::Path;
use std::time::Duration;

use futures::{StreamExt, TryStreamExt, stream};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use apkget_schema::SplitDescriptor;

use crate::error::{Error, Result};
use crate::io::staging::{StagedSplit, StagedSplitSet, StagingArea};
use crate::io::transport::{Transport, TransportError};
use crate::reporter::{Phase, ProgressEvent, ProgressThrottle, Reporter};
use crate::resolver::SelectionPlan;

/// Failure of a single transfer attempt. Never escapes the fetcher.
#[derive(Error, Debug)]
enum AttemptError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },
}

/// Retry and concurrency knobs.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub max_attempts: u32,
    /// Delay before attempt `n + 1` is `backoff * n`.
    pub backoff: Duration,
    pub concurrency: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(1),
            concurrency: 3,
        }
    }
}

pub struct Fetcher<'a> {
    transport: &'a dyn Transport,
    reporter: &'a dyn Reporter,
    options: FetchOptions,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Fetcher<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<'a> Fetcher<'a> {
    pub fn new(transport: &'a dyn Transport, reporter: &'a dyn Reporter) -> Self {
        Self {
            transport,
            reporter,
            options: FetchOptions::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Download every split of `plan` into `staging`.
    ///
    /// On any failure (or cancellation) the staging area is dropped, which
    /// removes whatever was partially written.
    pub async fn fetch(&self, plan: &SelectionPlan, staging: StagingArea) -> Result<StagedSplitSet> {
        self.reporter.prepare_splits(&plan.package_id, &plan.splits);
        info!(
            package = %plan.package_id,
            splits = plan.splits.len(),
            "fetching splits"
        );

        let dir = staging.path();
        let jobs = plan
            .splits
            .iter()
            .enumerate()
            .map(move |(idx, split)| async move {
                let staged = self.fetch_split(plan, split, dir).await?;
                Ok::<_, Error>((idx, staged))
            });

        let transfers = stream::iter(jobs)
            .buffer_unordered(self.options.concurrency.max(1))
            .try_collect::<Vec<_>>();

        let mut staged = tokio::select! {
            res = transfers => res?,
            () = self.cancel.cancelled() => {
                warn!(package = %plan.package_id, "fetch cancelled, discarding staged files");
                return Err(Error::Cancelled);
            }
        };

        staged.sort_by_key(|(idx, _)| *idx);
        let mut splits = staged.into_iter().map(|(_, s)| s);
        let Some(base) = splits.next() else {
            return Err(Error::Config("selection plan has no splits".into()));
        };

        Ok(StagedSplitSet::new(
            plan.package_id.clone(),
            plan.display_version.clone(),
            plan.version_code,
            plan.architecture,
            base,
            splits.collect(),
            staging,
        ))
    }

    async fn fetch_split(
        &self,
        plan: &SelectionPlan,
        split: &SplitDescriptor,
        dir: &Path,
    ) -> Result<StagedSplit> {
        let dest = dir.join(split.file_name());
        let max_attempts = self.options.max_attempts.max(1);

        if split.urls.is_empty() {
            self.reporter.split_failed(&split.name, "no download URL");
            return Err(Error::PartialDownloadFailure {
                package: plan.package_id.clone(),
                split: split.name.clone(),
                attempts: 0,
                last_error: "store returned no download URL".into(),
            });
        }

        let mut last_error = String::new();
        for attempt in 1..=max_attempts {
            let url = &split.urls[(attempt as usize - 1) % split.urls.len()];
            debug!(split = %split.name, attempt, url, "transfer attempt");

            match self.attempt(split, url, &dest).await {
                Ok(bytes) => {
                    self.reporter.split_done(&split.name, bytes);
                    return Ok(StagedSplit {
                        descriptor: split.clone(),
                        path: dest,
                        bytes,
                    });
                }
                Err(e) => {
                    last_error = e.to_string();
                    let _ = tokio::fs::remove_file(&dest).await;

                    if attempt < max_attempts {
                        warn!(split = %split.name, attempt, error = %e, "transfer failed, retrying");
                        self.reporter.retrying(&split.name, attempt, &last_error);
                        tokio::time::sleep(self.options.backoff * attempt).await;
                    }
                }
            }
        }

        self.reporter.split_failed(&split.name, &last_error);
        Err(Error::PartialDownloadFailure {
            package: plan.package_id.clone(),
            split: split.name.clone(),
            attempts: max_attempts,
            last_error,
        })
    }

    async fn attempt(
        &self,
        split: &SplitDescriptor,
        url: &str,
        dest: &Path,
    ) -> Result<u64, AttemptError> {
        let response = self.transport.get(url).await?;
        let expected = split.size_bytes.or(response.content_length);

        let mut file = File::create(dest).await?;
        let mut body = response.body;
        let mut throttle = ProgressThrottle::new();
        let mut transferred: u64 = 0;

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            transferred += chunk.len() as u64;

            if let Some(rate) = throttle.tick(transferred) {
                self.emit(split, transferred, expected, rate, Phase::Downloading);
            }
        }
        file.flush().await?;
        drop(file);

        let rate = throttle.finish(transferred);
        self.emit(split, transferred, expected, rate, Phase::Verifying);

        let on_disk = tokio::fs::metadata(dest).await?.len();
        match expected {
            Some(expected) if expected != on_disk => Err(AttemptError::SizeMismatch {
                expected,
                actual: on_disk,
            }),
            Some(_) => Ok(on_disk),
            None => {
                warn!(split = %split.name, bytes = on_disk, "no declared size, accepting as-is");
                Ok(on_disk)
            }
        }
    }

    fn emit(
        &self,
        split: &SplitDescriptor,
        transferred: u64,
        total: Option<u64>,
        rate: f64,
        phase: Phase,
    ) {
        self.reporter.progress(&ProgressEvent {
            split: split.name.clone(),
            bytes_transferred: transferred,
            total_bytes: total,
            rate_bytes_per_sec: rate,
            phase,
        });
    }
}
