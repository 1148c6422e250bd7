//! Decoded frames of one image and everything derived from them.

use crate::alternate::AlternateView;
use crate::edit::{Edit, EditScope};
use crate::residency::TextureSlot;
use crate::undo::StoreSnapshot;
use lumen_core::{Frame, LumenError, Metadata, Raster, Result, SourceInfo};
use lumen_media::{CodecRegistry, Decoded, LoadParams, SurfaceLayout};
use rayon::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// A frame and its optional texture.
#[derive(Debug)]
pub(crate) struct StoredFrame {
    pub(crate) frame: Frame,
    pub(crate) texture: TextureSlot,
}

impl StoredFrame {
    fn new(frame: Frame) -> Self {
        Self {
            frame,
            texture: TextureSlot::new(),
        }
    }
}

/// Owns the decoded frames of one image, the alternate view composed from
/// them, and their GPU textures (see [`FrameStore::bind`]).
///
/// Textures are always released before the pixels they were made from.
#[derive(Debug, Default)]
pub struct FrameStore {
    pub(crate) frames: Vec<StoredFrame>,
    pub(crate) current: usize,
    layout: SurfaceLayout,
    source: Option<SourceInfo>,
    metadata: Metadata,
    pub(crate) alternate: Option<AlternateView>,
    pub(crate) alternate_enabled: bool,
    dirty: bool,
}

impl FrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clean store holding `decoded`.
    pub fn from_decoded(decoded: Decoded) -> Self {
        let mut store = Self {
            frames: decoded.frames.into_iter().map(StoredFrame::new).collect(),
            current: 0,
            layout: decoded.layout,
            source: Some(decoded.source),
            metadata: decoded.metadata,
            alternate: None,
            alternate_enabled: false,
            dirty: false,
        };
        store.recompose_alternate();
        store
    }

    // ── Lifecycle ───────────────────────────────────────────────

    /// Decode `path` and replace the current contents with it. Refuses when
    /// there are unsaved edits and `force` is not set. On error the store is
    /// left exactly as it was.
    pub fn load(
        &mut self,
        codecs: &CodecRegistry,
        path: &Path,
        params: &LoadParams,
        force: bool,
    ) -> Result<()> {
        if self.dirty && !force {
            debug!(path = %path.display(), "Refusing to reload modified image");
            return Err(LumenError::InvalidParameter(format!(
                "{} has unsaved edits",
                path.display()
            )));
        }
        let decoded = codecs.load(path, params)?;
        let next = Self::from_decoded(decoded);

        self.unbind();
        *self = next;
        info!(
            path = %path.display(),
            frames = self.frames.len(),
            layout = ?self.layout,
            "Loaded image"
        );
        Ok(())
    }

    /// Release textures and pixels. Refuses (returning `false`) when there
    /// are unsaved edits and `force` is not set.
    pub fn unload(&mut self, force: bool) -> bool {
        if self.dirty && !force {
            debug!(frames = self.frames.len(), "Refusing to unload modified image");
            return false;
        }
        self.unbind();
        *self = Self::default();
        true
    }

    pub fn is_loaded(&self) -> bool {
        !self.frames.is_empty()
    }

    /// Whether there are edits not yet saved.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Forget about unsaved edits, e.g. after the image was written out.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    // ── Frames ──────────────────────────────────────────────────

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index).map(|slot| &slot.frame)
    }

    pub fn frames(&self) -> impl Iterator<Item = &Frame> + '_ {
        self.frames.iter().map(|slot| &slot.frame)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.frame(self.current)
    }

    /// Select frame `index`. Returns `false` if out of range.
    pub fn set_current(&mut self, index: usize) -> bool {
        if index >= self.frames.len() {
            return false;
        }
        self.current = index;
        true
    }

    /// Advance to the next frame, wrapping. Returns the new index.
    pub fn next_frame(&mut self) -> usize {
        if !self.frames.is_empty() {
            self.current = (self.current + 1) % self.frames.len();
        }
        self.current
    }

    /// Step back to the previous frame, wrapping. Returns the new index.
    pub fn prev_frame(&mut self) -> usize {
        if !self.frames.is_empty() {
            self.current = self
                .current
                .checked_sub(1)
                .unwrap_or(self.frames.len() - 1);
        }
        self.current
    }

    /// Width and height of the first frame.
    pub fn primary_size(&self) -> Option<(u32, u32)> {
        self.frame(0).map(|f| (f.width(), f.height()))
    }

    pub fn layout(&self) -> SurfaceLayout {
        self.layout
    }

    pub fn source(&self) -> Option<&SourceInfo> {
        self.source.as_ref()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Bytes of pixel data held, alternate view included.
    pub fn memory_size(&self) -> usize {
        let frames: usize = self.frames.iter().map(|s| s.frame.memory_size()).sum();
        frames + self.alternate.as_ref().map_or(0, |a| a.raster.memory_size())
    }

    // ── Alternate view ──────────────────────────────────────────

    pub fn alternate(&self) -> Option<&AlternateView> {
        self.alternate.as_ref()
    }

    pub fn is_alternate_enabled(&self) -> bool {
        self.alternate_enabled
    }

    /// Show the alternate view instead of the current frame. Has no effect
    /// when there is no alternate view. Returns the effective setting.
    pub fn set_alternate_enabled(&mut self, enabled: bool) -> bool {
        self.alternate_enabled = enabled && self.alternate.is_some();
        self.alternate_enabled
    }

    fn recompose_alternate(&mut self) {
        let alternate = {
            let surfaces: Vec<&Raster> = self.frames.iter().map(|s| &s.frame.raster).collect();
            AlternateView::compose(self.layout, &surfaces)
        };
        self.alternate = alternate;
        if self.alternate.is_none() {
            self.alternate_enabled = false;
        }
    }

    // ── Snapshots ───────────────────────────────────────────────

    /// Copy of the frame state, for undo.
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            frames: self.frames().cloned().collect(),
            current: self.current,
            dirty: self.dirty,
        }
    }

    /// Replace the frames with `snapshot`, including its dirty flag.
    pub fn restore(&mut self, snapshot: StoreSnapshot) {
        self.unbind();
        self.frames = snapshot.frames.into_iter().map(StoredFrame::new).collect();
        self.current = snapshot.current.min(self.frames.len().saturating_sub(1));
        self.dirty = snapshot.dirty;
        self.recompose_alternate();
    }

    // ── Edits ───────────────────────────────────────────────────

    /// Whether `edit` would change any frame it applies to.
    pub fn would_change(&self, edit: &Edit) -> bool {
        match edit.scope() {
            EditScope::AllFrames => self.frames().any(|f| !edit.is_noop_for(f)),
            EditScope::CurrentFrame => self
                .current_frame()
                .is_some_and(|f| !edit.is_noop_for(f)),
        }
    }

    /// Apply `edit` without recording undo state. Returns `false`, touching
    /// nothing, if the edit would change nothing.
    pub fn apply_edit(&mut self, edit: &Edit) -> bool {
        if !self.would_change(edit) {
            return false;
        }

        match edit.scope() {
            EditScope::AllFrames => {
                for slot in &mut self.frames {
                    if !edit.is_noop_for(&slot.frame) {
                        slot.texture.release();
                    }
                }
                self.frames.par_iter_mut().for_each(|slot| {
                    if !edit.is_noop_for(&slot.frame) {
                        edit.apply_to(&mut slot.frame);
                    }
                });
            }
            EditScope::CurrentFrame => {
                let slot = &mut self.frames[self.current];
                slot.texture.release();
                edit.apply_to(&mut slot.frame);
            }
        }

        if self.layout.is_multi_surface() {
            self.recompose_alternate();
        }
        self.dirty = true;
        debug!(edit = %edit.description(), "Applied edit");
        true
    }
}

// ── Tests ───────────────────────────────────────────────────────
