//! Codec dispatch.
//!
//! Format decoders are external collaborators: each one implements
//! [`Codec`] and returns every decoded surface as an RGBA8 [`Frame`].
//! [`CodecRegistry`] picks the codec for a path and validates what it
//! returns before ownership moves to the caller.

use crate::image_codec::ImageCodec;
use crate::probe::FileType;
use lumen_core::limits::MAX_DIMENSION;
use lumen_core::{Frame, LumenError, Metadata, Result, SourceInfo, ViewerConfig};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Number of faces in a cubemap.
pub const CUBE_FACE_COUNT: usize = 6;

/// Format-specific load parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadParams {
    /// Display gamma applied when float sources are reduced to 8 bits.
    pub gamma: f32,
    /// Exposure multiplier applied to float sources before gamma.
    pub exposure: f32,
}

impl Default for LoadParams {
    fn default() -> Self {
        Self {
            gamma: 2.2,
            exposure: 1.0,
        }
    }
}

impl LoadParams {
    /// Parameters derived from the viewer configuration.
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            gamma: config.monitor_gamma,
            ..Default::default()
        }
    }
}

/// How the decoded frames relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SurfaceLayout {
    /// A still (one frame) or an animation (frames in playback order).
    #[default]
    Flat,
    /// Mip levels, largest first.
    Mipmaps,
    /// Six faces in storage order +X, −X, +Y, −Y, +Z, −Z.
    Cubemap,
}

impl SurfaceLayout {
    pub fn is_multi_surface(self) -> bool {
        !matches!(self, Self::Flat)
    }
}

/// Everything a codec produced for one file.
#[derive(Debug, Clone)]
pub struct Decoded {
    /// Frames in order. Never empty once validated.
    pub frames: Vec<Frame>,
    pub layout: SurfaceLayout,
    pub source: SourceInfo,
    pub metadata: Metadata,
}

impl Decoded {
    /// A single still frame.
    pub fn still(frame: Frame, source: SourceInfo) -> Self {
        Self {
            frames: vec![frame],
            layout: SurfaceLayout::Flat,
            source,
            metadata: Metadata::new(),
        }
    }

    /// The first frame, which thumbnails and size queries use.
    pub fn primary(&self) -> Option<&Frame> {
        self.frames.first()
    }

    /// Check the invariants every consumer relies on.
    pub fn validate(&self) -> Result<()> {
        if self.frames.is_empty() {
            return Err(LumenError::Decode("Codec returned no frames".to_string()));
        }
        for (i, frame) in self.frames.iter().enumerate() {
            if frame.raster.is_empty() {
                return Err(LumenError::Decode(format!("Frame {} is empty", i)));
            }
            if frame.width() > MAX_DIMENSION || frame.height() > MAX_DIMENSION {
                return Err(LumenError::Decode(format!(
                    "Frame {} is {}x{}, larger than {}",
                    i,
                    frame.width(),
                    frame.height(),
                    MAX_DIMENSION
                )));
            }
        }
        if self.layout == SurfaceLayout::Cubemap {
            if self.frames.len() != CUBE_FACE_COUNT {
                return Err(LumenError::Decode(format!(
                    "Cubemap has {} faces, expected {}",
                    self.frames.len(),
                    CUBE_FACE_COUNT
                )));
            }
            let (w, h) = (self.frames[0].width(), self.frames[0].height());
            if self.frames.iter().any(|f| f.width() != w || f.height() != h) {
                return Err(LumenError::Decode(
                    "Cubemap faces differ in size".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// A format decoder.
pub trait Codec: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Whether this codec decodes `file_type`.
    fn handles(&self, file_type: FileType) -> bool;

    /// Decode every surface of the file at `path`.
    fn load(&self, path: &Path, params: &LoadParams) -> Result<Decoded>;
}

/// Routes a path to the codec registered for its file type.
///
/// Codecs registered later take precedence over earlier ones, so an
/// application can override the built-in codec for specific formats.
#[derive(Clone, Default)]
pub struct CodecRegistry {
    codecs: Vec<Arc<dyn Codec>>,
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.codecs.iter().map(|c| c.name()))
            .finish()
    }
}

impl CodecRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in [`ImageCodec`].
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ImageCodec::new()));
        registry
    }

    pub fn register(&mut self, codec: Arc<dyn Codec>) {
        self.codecs.push(codec);
    }

    /// The codec that would decode `file_type`.
    pub fn codec_for(&self, file_type: FileType) -> Option<&Arc<dyn Codec>> {
        self.codecs.iter().rev().find(|c| c.handles(file_type))
    }

    pub fn supports(&self, path: &Path) -> bool {
        self.codec_for(FileType::from_path(path)).is_some()
    }

    /// Decode `path`. The returned frames are owned by the caller.
    pub fn load(&self, path: &Path, params: &LoadParams) -> Result<Decoded> {
        let file_type = FileType::from_path(path);
        let codec = self.codec_for(file_type).ok_or_else(|| {
            LumenError::UnsupportedFormat(format!("No codec for {}", path.display()))
        })?;

        debug!(path = %path.display(), codec = codec.name(), "Decoding");
        let decoded = codec.load(path, params)?;
        decoded.validate()?;
        Ok(decoded)
    }
}
