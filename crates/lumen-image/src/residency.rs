//! GPU residency of a [`FrameStore`].
//!
//! Every frame and the alternate view carry a [`TextureSlot`]. A slot is
//! either empty or holds a handle to a texture with the *current* pixels;
//! anything that changes pixels empties the slot first.

use crate::store::FrameStore;
use lumen_core::Raster;
use lumen_gpu::{MipmapSettings, TextureBackend, TextureHandle, TextureUpload, NOT_RESIDENT};
use std::sync::Arc;
use tracing::{debug, warn};

/// The texture backend plus how textures should be built.
#[derive(Clone)]
pub struct GpuBinding {
    pub backend: Arc<dyn TextureBackend>,
    pub mipmaps: MipmapSettings,
}

impl std::fmt::Debug for GpuBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuBinding")
            .field("mipmaps", &self.mipmaps)
            .finish_non_exhaustive()
    }
}

impl GpuBinding {
    pub fn new(backend: Arc<dyn TextureBackend>, mipmaps: MipmapSettings) -> Self {
        Self { backend, mipmaps }
    }
}

/// Optional texture for one raster.
#[derive(Default)]
pub struct TextureSlot {
    handle: Option<TextureHandle>,
}

impl TextureSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw handle, or [`NOT_RESIDENT`].
    pub fn raw(&self) -> u64 {
        self.handle.as_ref().map_or(NOT_RESIDENT, TextureHandle::raw)
    }

    pub fn is_resident(&self) -> bool {
        self.handle.is_some()
    }

    /// Destroy the texture, if any.
    pub fn release(&mut self) {
        self.handle = None;
    }

    /// Upload `raster` unless already resident. Returns the handle, or
    /// [`NOT_RESIDENT`] if the backend refused.
    pub fn ensure(&mut self, gpu: &GpuBinding, raster: &Raster, label: &str) -> u64 {
        if let Some(handle) = &self.handle {
            return handle.raw();
        }
        let upload = TextureUpload {
            width: raster.width(),
            height: raster.height(),
            pixels: raster.pixels(),
            mipmaps: gpu.mipmaps,
            label,
        };
        match TextureHandle::create(&gpu.backend, &upload) {
            Ok(handle) => {
                let raw = handle.raw();
                self.handle = Some(handle);
                raw
            }
            Err(e) => {
                warn!(label, error = %e, "Texture creation failed");
                NOT_RESIDENT
            }
        }
    }
}

impl std::fmt::Debug for TextureSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TextureSlot({})", self.raw())
    }
}

impl FrameStore {
    /// Make the store drawable and return the handle to draw.
    ///
    /// With the alternate view enabled, only the alternate view is made
    /// resident. Otherwise every frame is, uploading from the last frame
    /// to the first, and the current frame's handle is returned. If the
    /// current frame could not get a texture, the other frames' textures are
    /// released and the current one is tried again. Returns [`NOT_RESIDENT`]
    /// if even that fails; callers retry on a later frame.
    pub fn bind(&mut self, gpu: &GpuBinding) -> u64 {
        if self.alternate_enabled {
            if let Some(alternate) = self.alternate.as_mut() {
                return alternate
                    .texture
                    .ensure(gpu, &alternate.raster, alternate.kind.label());
            }
        }

        let mut uploaded = 0usize;
        for (index, slot) in self.frames.iter_mut().enumerate().rev() {
            if slot.texture.is_resident() {
                continue;
            }
            let label = format!("frame {}", index);
            if slot.texture.ensure(gpu, &slot.frame.raster, &label) != NOT_RESIDENT {
                uploaded += 1;
            }
        }
        if uploaded > 0 {
            debug!(uploaded, frames = self.frames.len(), "Uploaded frames");
        }

        let current = self.current;
        let Some(raw) = self.frames.get(current).map(|slot| slot.texture.raw()) else {
            return NOT_RESIDENT;
        };
        if raw != NOT_RESIDENT {
            return raw;
        }

        // Out of textures: the displayed frame takes precedence over the rest.
        let mut evicted = 0usize;
        for (index, slot) in self.frames.iter_mut().enumerate() {
            if index != current && slot.texture.is_resident() {
                slot.texture.release();
                evicted += 1;
            }
        }
        if evicted > 0 {
            debug!(evicted, current, "Released other frames for the current frame");
        }
        let slot = &mut self.frames[current];
        let label = format!("frame {}", current);
        slot.texture.ensure(gpu, &slot.frame.raster, &label)
    }

    /// Release every frame texture and the alternate view texture.
    pub fn unbind(&mut self) {
        for slot in &mut self.frames {
            slot.texture.release();
        }
        if let Some(alternate) = self.alternate.as_mut() {
            alternate.texture.release();
        }
    }

    /// Whether every frame has a texture.
    pub fn is_resident(&self) -> bool {
        !self.frames.is_empty() && self.frames.iter().all(|slot| slot.texture.is_resident())
    }

    /// Raw handle of frame `index`, or [`NOT_RESIDENT`].
    pub fn frame_handle(&self, index: usize) -> u64 {
        self.frames
            .get(index)
            .map_or(NOT_RESIDENT, |slot| slot.texture.raw())
    }

    /// Raw handle of the alternate view, or [`NOT_RESIDENT`].
    pub fn alternate_handle(&self) -> u64 {
        self.alternate
            .as_ref()
            .map_or(NOT_RESIDENT, |alternate| alternate.texture.raw())
    }
}

// ── Tests ───────────────────────────────────────────────────────
