//! Thumbnail pipeline.
//!
//! Each [`Image`](crate::Image) owns one [`Thumbnail`] that moves through
//! `Unrequested → Running → Ready | Failed`. Requests spawn a worker
//! thread (see [`worker`]) bounded by a shared [`ThumbnailScheduler`]; the
//! owner polls for completion once per frame via `bind`, which never
//! blocks on a running worker.

pub mod cache;
pub mod key;
pub mod scheduler;
pub mod worker;

pub use cache::{CacheFormatError, ThumbnailCache};
pub use key::{ThumbnailKey, CACHE_FORMAT_VERSION};
pub use scheduler::{worker_cap, ThumbnailScheduler, WorkerPermit};
pub use worker::ThumbnailJob;

use crate::edit::resample;
use crate::residency::{GpuBinding, TextureSlot};
use image::imageops::FilterType;
use lumen_core::{Metadata, Raster};
use std::sync::Arc;
use tracing::{debug, warn};
use worker::WorkerTask;

/// Fixed thumbnail width in pixels.
pub const THUMBNAIL_WIDTH: u32 = 192;
/// Fixed thumbnail height in pixels.
pub const THUMBNAIL_HEIGHT: u32 = 192;

/// A generated thumbnail plus what it summarizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailRecord {
    /// Always exactly `THUMBNAIL_WIDTH` × `THUMBNAIL_HEIGHT`.
    pub raster: Raster,
    pub primary_width: u32,
    pub primary_height: u32,
    pub primary_area: u64,
    pub metadata: Metadata,
}

/// Observable state of an image's thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailStatus {
    Unrequested,
    Running,
    Ready,
    Failed,
}

enum State {
    Unrequested,
    Running {
        // Field order matters: the task joins before the slot is freed.
        task: WorkerTask,
        _permit: WorkerPermit,
    },
    Ready {
        record: ThumbnailRecord,
        key: Option<ThumbnailKey>,
    },
    Failed,
}

/// Per-image thumbnail state machine. Owner-thread only.
pub struct Thumbnail {
    state: State,
    invalidate_requested: bool,
    /// Set when invalidation arrived while the worker was still running;
    /// the result it writes to the cache is stale and gets removed.
    discard_cached: bool,
    texture: TextureSlot,
}

impl std::fmt::Debug for Thumbnail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Thumbnail")
            .field("status", &self.status())
            .field("invalidate_requested", &self.invalidate_requested)
            .field("texture", &self.texture.raw())
            .finish()
    }
}

impl Default for Thumbnail {
    fn default() -> Self {
        Self::new()
    }
}

impl Thumbnail {
    pub fn new() -> Self {
        Self {
            state: State::Unrequested,
            invalidate_requested: false,
            discard_cached: false,
            texture: TextureSlot::new(),
        }
    }

    pub fn status(&self) -> ThumbnailStatus {
        match self.state {
            State::Unrequested => ThumbnailStatus::Unrequested,
            State::Running { .. } => ThumbnailStatus::Running,
            State::Ready { .. } => ThumbnailStatus::Ready,
            State::Failed => ThumbnailStatus::Failed,
        }
    }

    /// The finished record, if ready.
    pub fn record(&self) -> Option<&ThumbnailRecord> {
        match &self.state {
            State::Ready { record, .. } => Some(record),
            _ => None,
        }
    }

    pub fn is_invalidation_pending(&self) -> bool {
        self.invalidate_requested
    }

    /// Start a worker for `job` unless one was already requested or the
    /// scheduler is full. Returns whether a worker was started.
    pub fn request(&mut self, scheduler: &Arc<ThumbnailScheduler>, job: ThumbnailJob) -> bool {
        if !matches!(self.state, State::Unrequested) {
            return false;
        }
        let Some(permit) = scheduler.try_acquire() else {
            debug!(
                running = scheduler.running(),
                capacity = scheduler.capacity(),
                "Thumbnail workers saturated, deferring request"
            );
            return false;
        };

        let path = job.path.clone();
        match WorkerTask::spawn(job) {
            Ok(task) => {
                debug!(path = %path.display(), "Requested thumbnail");
                self.state = State::Running {
                    task,
                    _permit: permit,
                };
                self.invalidate_requested = false;
                self.discard_cached = false;
                true
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to start thumbnail worker");
                false
            }
        }
    }

    /// Ask for the current result to be thrown away at the next poll.
    /// Ignored when nothing has been requested. The cache file is only
    /// removed when the request arrives while the worker is running.
    pub fn request_invalidate(&mut self) {
        match self.state {
            State::Unrequested => {}
            State::Running { .. } => {
                self.invalidate_requested = true;
                self.discard_cached = true;
            }
            State::Ready { .. } | State::Failed => self.invalidate_requested = true,
        }
    }

    /// Collect a finished worker and apply any pending invalidation.
    /// Never blocks.
    pub fn poll(&mut self, cache: &ThumbnailCache) {
        if let State::Running { task, .. } = &mut self.state {
            let Some(outcome) = task.try_finish() else {
                return;
            };
            self.state = match outcome.record {
                Some(record) => State::Ready {
                    record,
                    key: outcome.key,
                },
                None => State::Failed,
            };
        }

        if self.invalidate_requested {
            match &self.state {
                State::Ready { key: Some(key), .. } if self.discard_cached => {
                    if let Err(e) = cache.remove(key) {
                        warn!(key = %key, error = %e, "Failed to remove invalidated thumbnail");
                    }
                }
                _ => {}
            }
            self.texture.release();
            self.state = State::Unrequested;
            self.invalidate_requested = false;
            self.discard_cached = false;
            debug!("Discarded invalidated thumbnail");
        }
    }

    /// Poll, then return the thumbnail texture, creating it on first use.
    /// Returns 0 while running, after failure, or if the texture cannot be
    /// created.
    pub fn bind(&mut self, gpu: &GpuBinding, cache: &ThumbnailCache) -> u64 {
        self.poll(cache);
        let Self { state, texture, .. } = self;
        match state {
            State::Ready { record, .. } => texture.ensure(gpu, &record.raster, "thumbnail"),
            _ => 0,
        }
    }

    /// Release the thumbnail texture, keeping the record.
    pub fn unbind(&mut self) {
        self.texture.release();
    }

    /// Block until any running worker exits, discarding its result.
    pub fn shutdown(&mut self) {
        self.texture.release();
        if matches!(self.state, State::Running { .. }) {
            self.state = State::Unrequested;
            self.invalidate_requested = false;
            self.discard_cached = false;
        }
    }
}

/// Scale `src` to fit inside a `box_width` × `box_height` box preserving
/// aspect ratio, with one side matching the box exactly, then centre it on
/// a transparent canvas of exactly the box size.
pub fn fit_to_box(src: &Raster, box_width: u32, box_height: u32) -> Raster {
    let mut out = Raster::new(box_width, box_height);
    if src.is_empty() || box_width == 0 || box_height == 0 {
        return out;
    }

    let (w, h) = (u64::from(src.width()), u64::from(src.height()));
    let (bw, bh) = (u64::from(box_width), u64::from(box_height));
    let (fit_w, fit_h) = if w * bh >= h * bw {
        (bw, ((h * bw + w / 2) / w).clamp(1, bh))
    } else {
        (((w * bh + h / 2) / h).clamp(1, bw), bh)
    };
    let (fit_w, fit_h) = (fit_w as u32, fit_h as u32);

    let scaled = resample(src, fit_w, fit_h, FilterType::Triangle);
    out.blit(&scaled, (box_width - fit_w) / 2, (box_height - fit_h) / 2);
    out
}

// ── Tests ───────────────────────────────────────────────────────
