//! Raster and frame types held in CPU memory.
//!
//! Every raster is tightly packed RGBA8 (four bytes per pixel, no row
//! padding), which is also the layout uploaded to the GPU and written to
//! the thumbnail cache.

use crate::error::{LumenError, Result};
use crate::limits::{BYTES_PER_PIXEL, MAX_DIMENSION};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Descriptive tag → value pairs extracted from a source file.
pub type Metadata = BTreeMap<String, String>;

/// An axis-aligned rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle covering a whole `width` × `height` raster.
    pub const fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Clip this rectangle against a `width` × `height` raster.
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        let x = self.x.min(width);
        let y = self.y.min(height);
        let right = self.x.saturating_add(self.width).min(width);
        let bottom = self.y.saturating_add(self.height).min(height);
        Self::new(x, y, right - x, bottom - y)
    }
}

/// A tightly packed RGBA8 pixel buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl std::fmt::Debug for Raster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Raster")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl Raster {
    /// Create a fully transparent raster.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0u8; byte_len(width, height)],
        }
    }

    /// Create a raster filled with a single colour.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut raster = Self::new(width, height);
        raster.fill(rgba);
        raster
    }

    /// Wrap an existing RGBA8 buffer, validating its length.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(LumenError::InvalidParameter(format!(
                "Raster {}x{} exceeds the {} pixel limit",
                width, height, MAX_DIMENSION
            )));
        }
        let expected = byte_len(width, height);
        if pixels.len() != expected {
            return Err(LumenError::InvalidParameter(format!(
                "Raster {}x{} needs {} bytes, got {}",
                width,
                height,
                expected,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel count.
    #[inline]
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Memory used by the pixel buffer in bytes.
    pub fn memory_size(&self) -> usize {
        self.pixels.len()
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL
    }

    /// Read one pixel. Panics when out of bounds.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    /// Write one pixel. Panics when out of bounds.
    #[inline]
    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let i = self.offset(x, y);
        self.pixels[i..i + 4].copy_from_slice(&rgba);
    }

    pub fn fill(&mut self, rgba: [u8; 4]) {
        for px in self.pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
            px.copy_from_slice(&rgba);
        }
    }

    /// Get a row of pixel data.
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        let start = self.offset(0, y);
        &self.pixels[start..start + self.width as usize * BYTES_PER_PIXEL]
    }

    /// Copy `src` into this raster with its top-left corner at (`x`, `y`).
    /// Parts falling outside this raster are clipped.
    pub fn blit(&mut self, src: &Raster, x: u32, y: u32) {
        let visible = PixelRect::new(x, y, src.width, src.height).clamp_to(self.width, self.height);
        if visible.is_empty() {
            return;
        }
        let row_bytes = visible.width as usize * BYTES_PER_PIXEL;
        for row in 0..visible.height {
            let s = src.offset(0, row);
            let d = self.offset(visible.x, visible.y + row);
            self.pixels[d..d + row_bytes].copy_from_slice(&src.pixels[s..s + row_bytes]);
        }
    }

    /// Copy out a sub-rectangle. The rectangle is clipped to the raster.
    pub fn cropped(&self, rect: PixelRect) -> Raster {
        let rect = rect.clamp_to(self.width, self.height);
        let mut out = Raster::new(rect.width, rect.height);
        let row_bytes = rect.width as usize * BYTES_PER_PIXEL;
        for row in 0..rect.height {
            let s = self.offset(rect.x, rect.y + row);
            let d = out.offset(0, row);
            out.pixels[d..d + row_bytes].copy_from_slice(&self.pixels[s..s + row_bytes]);
        }
        out
    }

    /// Whether every pixel is fully opaque.
    pub fn is_opaque(&self) -> bool {
        self.pixels
            .chunks_exact(BYTES_PER_PIXEL)
            .all(|px| px[3] == u8::MAX)
    }
}

#[inline]
fn byte_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * BYTES_PER_PIXEL
}

/// One decoded raster plus its display duration.
///
/// Stills and mip/cube surfaces use a zero duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub raster: Raster,
    pub duration: Duration,
}

impl Frame {
    pub fn new(raster: Raster, duration: Duration) -> Self {
        Self { raster, duration }
    }

    /// A frame with no display duration.
    pub fn still(raster: Raster) -> Self {
        Self::new(raster, Duration::ZERO)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.raster.height()
    }

    pub fn memory_size(&self) -> usize {
        self.raster.memory_size()
    }
}
