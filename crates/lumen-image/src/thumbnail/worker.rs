//! Background thumbnail worker: one thread per outstanding request.
//!
//! The worker owns everything it touches (path, codec registry, cache
//! handle) and reports back through a one-shot channel. It never touches
//! GPU state or the requesting image.

use super::cache::ThumbnailCache;
use super::key::ThumbnailKey;
use super::{fit_to_box, ThumbnailRecord, THUMBNAIL_HEIGHT, THUMBNAIL_WIDTH};
use crossbeam_channel::{Receiver, TryRecvError};
use lumen_core::{LumenError, Result};
use lumen_media::{CodecRegistry, Decoded, FileIdentity, LoadParams};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, warn};

/// Decode attempts before a request is given up.
pub const DECODE_ATTEMPTS: u32 = 5;

/// Base delay between decode attempts; attempt `n` waits `n` times this.
pub const RETRY_BACKOFF: Duration = Duration::from_millis(25);

/// Everything a worker needs, moved onto its thread.
#[derive(Debug, Clone)]
pub struct ThumbnailJob {
    pub path: PathBuf,
    pub codecs: CodecRegistry,
    pub cache: Arc<ThumbnailCache>,
    pub params: LoadParams,
}

/// What a finished worker hands back. `record` is `None` on failure.
#[derive(Debug)]
pub(crate) struct WorkerOutcome {
    pub key: Option<ThumbnailKey>,
    pub record: Option<ThumbnailRecord>,
}

impl WorkerOutcome {
    fn failed() -> Self {
        Self {
            key: None,
            record: None,
        }
    }
}

/// A running worker and the receiving end of its result.
///
/// Dropping the task blocks until the thread has exited.
#[derive(Debug)]
pub(crate) struct WorkerTask {
    handle: Option<JoinHandle<()>>,
    result: Receiver<WorkerOutcome>,
}

impl WorkerTask {
    /// Start a worker thread for `job`.
    pub fn spawn(job: ThumbnailJob) -> Result<Self> {
        let (sender, result) = crossbeam_channel::bounded(1);
        let handle = std::thread::Builder::new()
            .name("lumen-thumbnail".to_string())
            .spawn(move || {
                let outcome = run(&job);
                // The receiver only goes away after joining this thread.
                let _ = sender.send(outcome);
            })
            .map_err(|e| LumenError::Internal(format!("Failed to spawn thumbnail worker: {}", e)))?;

        Ok(Self {
            handle: Some(handle),
            result,
        })
    }

    /// Non-blocking check for completion. On completion the thread is
    /// joined and its outcome returned; a worker that died without
    /// reporting counts as a failure.
    pub fn try_finish(&mut self) -> Option<WorkerOutcome> {
        let outcome = match self.result.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => WorkerOutcome::failed(),
        };
        self.join();
        Some(outcome)
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Thumbnail worker panicked");
            }
        }
    }
}

impl Drop for WorkerTask {
    fn drop(&mut self) {
        self.join();
    }
}

// ── Worker body ─────────────────────────────────────────────────

fn run(job: &ThumbnailJob) -> WorkerOutcome {
    let identity = match FileIdentity::probe(&job.path) {
        Ok(identity) => identity,
        Err(e) => {
            warn!(path = %job.path.display(), error = %e, "Thumbnail source unavailable");
            return WorkerOutcome::failed();
        }
    };
    let key = ThumbnailKey::compute(&identity);

    if let Some(record) = job.cache.load(&key) {
        return WorkerOutcome {
            key: Some(key),
            record: Some(record),
        };
    }

    let Some(decoded) = decode_with_retry(job) else {
        return WorkerOutcome::failed();
    };
    let Some(primary) = decoded.primary() else {
        return WorkerOutcome::failed();
    };

    let record = ThumbnailRecord {
        raster: fit_to_box(&primary.raster, THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT),
        primary_width: primary.width(),
        primary_height: primary.height(),
        primary_area: primary.raster.area(),
        metadata: decoded.metadata,
    };

    if let Err(e) = job.cache.store(&key, &record) {
        warn!(key = %key, error = %e, "Failed to persist thumbnail");
    }
    debug!(path = %job.path.display(), key = %key, "Generated thumbnail");

    WorkerOutcome {
        key: Some(key),
        record: Some(record),
    }
}

fn decode_with_retry(job: &ThumbnailJob) -> Option<Decoded> {
    for attempt in 1..=DECODE_ATTEMPTS {
        match job.codecs.load(&job.path, &job.params) {
            Ok(decoded) => return Some(decoded),
            Err(e @ LumenError::UnsupportedFormat(_)) => {
                warn!(path = %job.path.display(), error = %e, "No codec for thumbnail source");
                return None;
            }
            Err(e) => {
                warn!(
                    path = %job.path.display(),
                    attempt,
                    error = %e,
                    "Thumbnail decode failed"
                );
                if attempt < DECODE_ATTEMPTS {
                    std::thread::sleep(RETRY_BACKOFF * attempt);
                }
            }
        }
    }
    None
}

// ── Tests ───────────────────────────────────────────────────────
