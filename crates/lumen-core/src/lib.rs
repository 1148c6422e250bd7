//! Lumen Core - Foundation types for the image viewer
//!
//! This crate provides the fundamental types used throughout Lumen:
//! - RGBA rasters and timed frames
//! - Source pixel-format metadata reported by codecs
//! - Viewer configuration consumed by the resource subsystem
//! - The shared error type

pub mod config;
pub mod error;
pub mod frame;
pub mod source;

pub use config::{MipmapFilter, ViewerConfig};
pub use error::{LumenError, Result};
pub use frame::{Frame, Metadata, PixelRect, Raster};
pub use source::{AlphaMode, ChannelType, ColourProfile, SourceInfo};

/// Fixed limits shared by the resource subsystem.
pub mod limits {
    /// Largest raster dimension accepted from a codec.
    pub const MAX_DIMENSION: u32 = 32_768;

    /// Bytes per pixel of every in-memory raster (RGBA8).
    pub const BYTES_PER_PIXEL: usize = 4;
}
