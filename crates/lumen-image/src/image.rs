//! The per-image aggregate.

use crate::edit::Edit;
use crate::services::ImageServices;
use crate::store::FrameStore;
use crate::thumbnail::{Thumbnail, ThumbnailRecord, ThumbnailStatus};
use crate::undo::{UndoEntry, UndoStack};
use lumen_core::Result;
use lumen_media::{probe::absolute_path, FileType};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info};
use uuid::Uuid;

/// One image file known to the viewer: its frames (when loaded), undo
/// history and thumbnail.
///
/// All methods are owner-thread only. Dropping an image releases its
/// textures and waits for its thumbnail worker, if any, to finish.
pub struct Image {
    id: Uuid,
    path: PathBuf,
    file_type: FileType,
    file_size: u64,
    modified: Option<SystemTime>,
    loaded_time: Option<SystemTime>,
    shuffle_value: u64,
    store: FrameStore,
    undo: UndoStack,
    thumbnail: Thumbnail,
    services: Arc<ImageServices>,
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("file_type", &self.file_type)
            .field("loaded", &self.store.is_loaded())
            .field("dirty", &self.store.is_dirty())
            .field("thumbnail", &self.thumbnail.status())
            .finish_non_exhaustive()
    }
}

impl Image {
    /// Track the file at `path`. Nothing is decoded until [`Image::load`].
    pub fn new(path: impl AsRef<Path>, services: Arc<ImageServices>) -> Self {
        let path = absolute_path(path.as_ref());
        let (file_size, modified) = stat(&path);
        Self {
            id: Uuid::new_v4(),
            file_type: FileType::from_path(&path),
            path,
            file_size,
            modified,
            loaded_time: None,
            shuffle_value: Uuid::new_v4().as_u128() as u64,
            store: FrameStore::new(),
            undo: UndoStack::new(services.config().max_undo_steps),
            thumbnail: Thumbnail::new(),
            services,
        }
    }

    // ── Attributes ──────────────────────────────────────────────

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    /// File size in bytes as of the last load or refresh.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    /// When the frames were last decoded, if loaded.
    pub fn loaded_time(&self) -> Option<SystemTime> {
        self.loaded_time
    }

    /// Random tiebreaker for shuffled ordering, fixed for this image.
    pub fn shuffle_value(&self) -> u64 {
        self.shuffle_value
    }

    pub fn is_loaded(&self) -> bool {
        self.store.is_loaded()
    }

    pub fn is_dirty(&self) -> bool {
        self.store.is_dirty()
    }

    pub fn store(&self) -> &FrameStore {
        &self.store
    }

    /// Mutable store access for navigation and alternate view toggling.
    /// Pixel edits should go through [`Image::apply_edit`] to be undoable.
    pub fn store_mut(&mut self) -> &mut FrameStore {
        &mut self.store
    }

    pub fn undo_stack(&self) -> &UndoStack {
        &self.undo
    }

    /// Bytes held by frames and undo snapshots.
    pub fn memory_size(&self) -> usize {
        self.store.memory_size() + self.undo.memory_size()
    }

    // ── Lifecycle ───────────────────────────────────────────────

    /// Decode the file, replacing any loaded frames and undo history.
    /// Refuses when there are unsaved edits and `force` is not set. On error
    /// the previous state, undo history included, is kept.
    pub fn load(&mut self, force: bool) -> Result<()> {
        let params = self.services.load_params();
        self.store
            .load(self.services.codecs(), &self.path, &params, force)?;
        self.undo.clear();
        self.loaded_time = Some(SystemTime::now());
        self.refresh_file_info();
        Ok(())
    }

    /// Drop frames and textures. Refuses when there are unsaved edits and
    /// `force` is not set.
    pub fn unload(&mut self, force: bool) -> bool {
        if !self.store.unload(force) {
            return false;
        }
        self.undo.clear();
        self.loaded_time = None;
        debug!(path = %self.path.display(), "Unloaded image");
        true
    }

    /// Re-read size and modification time. If either changed, the
    /// thumbnail is invalidated. Returns whether the file changed.
    pub fn refresh_file_info(&mut self) -> bool {
        let (size, modified) = stat(&self.path);
        if (size, modified) == (self.file_size, self.modified) {
            return false;
        }
        self.file_size = size;
        self.modified = modified;
        self.thumbnail.request_invalidate();
        info!(path = %self.path.display(), size, "Image changed on disk");
        true
    }

    /// Record that the frames were written out.
    pub fn mark_saved(&mut self) {
        self.store.mark_clean();
    }

    // ── GPU ─────────────────────────────────────────────────────

    /// See [`FrameStore::bind`].
    pub fn bind(&mut self) -> u64 {
        self.store.bind(self.services.gpu())
    }

    pub fn unbind(&mut self) {
        self.store.unbind();
    }

    // ── Editing ─────────────────────────────────────────────────

    /// Apply `edit`, recording undo state first. Edits that would change
    /// nothing are skipped entirely. Returns whether anything changed.
    pub fn apply_edit(&mut self, edit: &Edit) -> bool {
        if !self.store.would_change(edit) {
            return false;
        }
        self.undo.push(self.store.snapshot(), edit.description());
        self.store.apply_edit(edit)
    }

    /// Revert the most recent edit. Returns `false` if there is none.
    pub fn undo(&mut self) -> bool {
        let Some(entry) = self.undo.pop() else {
            return false;
        };
        self.undo.push_redo(UndoEntry {
            description: entry.description.clone(),
            snapshot: self.store.snapshot(),
        });
        debug!(edit = %entry.description, "Undo");
        self.store.restore(entry.snapshot);
        true
    }

    /// Reapply the most recently undone edit.
    pub fn redo(&mut self) -> bool {
        let Some(entry) = self.undo.pop_redo() else {
            return false;
        };
        self.undo.push_undone(UndoEntry {
            description: entry.description.clone(),
            snapshot: self.store.snapshot(),
        });
        debug!(edit = %entry.description, "Redo");
        self.store.restore(entry.snapshot);
        true
    }

    // ── Thumbnail ───────────────────────────────────────────────

    /// Start generating the thumbnail in the background. No-op if already
    /// requested or if the worker pool is saturated; returns whether a
    /// worker was started.
    pub fn request_thumbnail(&mut self) -> bool {
        if self.thumbnail.status() != ThumbnailStatus::Unrequested {
            return false;
        }
        let job = self.services.thumbnail_job(&self.path);
        self.thumbnail.request(self.services.scheduler(), job)
    }

    /// Poll the thumbnail and return its texture, or 0 if not available
    /// yet. Never blocks.
    pub fn bind_thumbnail(&mut self) -> u64 {
        self.thumbnail
            .bind(self.services.gpu(), self.services.cache())
    }

    /// Throw away the pending or finished thumbnail at the next poll.
    pub fn request_invalidate_thumbnail(&mut self) {
        self.thumbnail.request_invalidate();
    }

    pub fn thumbnail_status(&self) -> ThumbnailStatus {
        self.thumbnail.status()
    }

    pub fn thumbnail_record(&self) -> Option<&ThumbnailRecord> {
        self.thumbnail.record()
    }

    pub fn thumbnail(&self) -> &Thumbnail {
        &self.thumbnail
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        self.store.unbind();
        self.thumbnail.shutdown();
    }
}

fn stat(path: &Path) -> (u64, Option<SystemTime>) {
    match std::fs::metadata(path) {
        Ok(metadata) => (metadata.len(), metadata.modified().ok()),
        Err(_) => (0, None),
    }
}

// ── Tests ───────────────────────────────────────────────────────
