//! Source pixel-format metadata reported by codecs.
//!
//! Decoded rasters are always RGBA8; these types describe what the file
//! held before conversion.

use serde::{Deserialize, Serialize};

/// Colour profile the source pixels were authored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ColourProfile {
    #[default]
    Unspecified,
    /// Gamma-encoded sRGB.
    Srgb,
    /// Linear light, typically HDR sources.
    Linear,
    /// An embedded ICC profile was present.
    Embedded,
}

/// How the source stores alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AlphaMode {
    /// No alpha channel.
    #[default]
    None,
    /// Straight (unassociated) alpha.
    Normal,
    /// Colour already multiplied by alpha.
    Premultiplied,
}

/// Numeric type of each source channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChannelType {
    #[default]
    Unorm8,
    Unorm16,
    Float16,
    Float32,
}

impl ChannelType {
    pub fn is_float(self) -> bool {
        matches!(self, Self::Float16 | Self::Float32)
    }

    /// Bits per channel.
    pub fn bits(self) -> u32 {
        match self {
            Self::Unorm8 => 8,
            Self::Unorm16 | Self::Float16 => 16,
            Self::Float32 => 32,
        }
    }
}

/// Everything a codec reports about the source encoding.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Codec-specific pixel format name, e.g. `"RGBA8"` or `"BC7"`.
    pub pixel_format: String,
    pub colour_profile: ColourProfile,
    pub alpha_mode: AlphaMode,
    pub channel_type: ChannelType,
}

impl SourceInfo {
    pub fn new(pixel_format: impl Into<String>) -> Self {
        Self {
            pixel_format: pixel_format.into(),
            ..Default::default()
        }
    }

    pub fn has_alpha(&self) -> bool {
        self.alpha_mode != AlphaMode::None
    }
}
