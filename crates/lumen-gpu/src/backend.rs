//! The texture capability and its scoped handle type.

use lumen_core::{MipmapFilter, Result, ViewerConfig};
use std::num::NonZeroU64;
use std::sync::Arc;

/// Raw handle value meaning "not resident".
pub const NOT_RESIDENT: u64 = 0;

/// How a backend builds the mip chain of an uploaded texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MipmapSettings {
    pub filter: MipmapFilter,
    /// Filter each level from the previous one instead of from the base.
    pub chained: bool,
}

impl MipmapSettings {
    pub const NONE: Self = Self {
        filter: MipmapFilter::None,
        chained: false,
    };

    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            filter: config.mipmap_filter,
            chained: config.mipmap_chaining,
        }
    }
}

/// Pixels to upload as a new texture. Always tightly packed RGBA8.
#[derive(Debug, Clone, Copy)]
pub struct TextureUpload<'a> {
    pub width: u32,
    pub height: u32,
    pub pixels: &'a [u8],
    pub mipmaps: MipmapSettings,
    pub label: &'a str,
}

/// Creates and destroys native textures.
///
/// Implementations must be callable from the owner thread only in
/// practice, but are `Send + Sync` so handles can live inside shared
/// image state.
pub trait TextureBackend: Send + Sync {
    /// Create a texture holding `upload`. An error means the texture could
    /// not be created right now (for example the device is out of memory).
    fn create_texture(&self, upload: &TextureUpload<'_>) -> Result<NonZeroU64>;

    /// Destroy a texture previously returned by `create_texture`.
    fn destroy_texture(&self, id: NonZeroU64);
}

/// A resident texture. Dropping the handle destroys the texture.
pub struct TextureHandle {
    id: NonZeroU64,
    backend: Arc<dyn TextureBackend>,
}

impl TextureHandle {
    /// Upload `upload` through `backend`.
    pub fn create(backend: &Arc<dyn TextureBackend>, upload: &TextureUpload<'_>) -> Result<Self> {
        let id = backend.create_texture(upload)?;
        Ok(Self {
            id,
            backend: Arc::clone(backend),
        })
    }

    /// The backend's id for this texture. Never [`NOT_RESIDENT`].
    #[inline]
    pub fn raw(&self) -> u64 {
        self.id.get()
    }
}

impl Drop for TextureHandle {
    fn drop(&mut self) {
        self.backend.destroy_texture(self.id);
    }
}

impl std::fmt::Debug for TextureHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TextureHandle").field(&self.id).finish()
    }
}
