//! Pixel edits applied to a [`FrameStore`](crate::FrameStore).
//!
//! Each edit knows whether it touches every frame or only the current one,
//! and whether it would change anything at all. The store pushes undo
//! state and applies the edit; this module only transforms frames.

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgba, RgbaImage};
use lumen_core::limits::MAX_DIMENSION;
use lumen_core::{Frame, PixelRect, Raster};
use std::time::Duration;

/// Which frames an edit touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditScope {
    AllFrames,
    CurrentFrame,
}

/// Resampling kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResampleFilter {
    Nearest,
    Bilinear,
    Bicubic,
    #[default]
    Lanczos3,
}

impl ResampleFilter {
    fn filter_type(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Bilinear => FilterType::Triangle,
            Self::Bicubic => FilterType::CatmullRom,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Brightness, contrast and saturation in display space. Alpha is left
/// untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColourAdjust {
    /// Added to every channel, -1.0..=1.0.
    pub brightness: f32,
    /// Scale around mid grey; 1.0 is unchanged.
    pub contrast: f32,
    /// Scale away from luma; 0.0 is greyscale, 1.0 is unchanged.
    pub saturation: f32,
}

impl ColourAdjust {
    pub const IDENTITY: Self = Self {
        brightness: 0.0,
        contrast: 1.0,
        saturation: 1.0,
    };

    pub fn is_identity(&self) -> bool {
        const EPS: f32 = 1e-6;
        self.brightness.abs() < EPS
            && (self.contrast - 1.0).abs() < EPS
            && (self.saturation - 1.0).abs() < EPS
    }

    fn apply(&self, pixels: &mut [u8]) {
        for px in pixels.chunks_exact_mut(4) {
            let [r, g, b] = [px[0], px[1], px[2]].map(|c| f32::from(c) / 255.0);
            let luma = 0.2126 * r + 0.7152 * g + 0.0722 * b;
            for (out, c) in px.iter_mut().zip([r, g, b]) {
                let c = luma + (c - luma) * self.saturation;
                let c = (c - 0.5) * self.contrast + 0.5 + self.brightness;
                *out = (c.clamp(0.0, 1.0) * 255.0).round() as u8;
            }
        }
    }
}

impl Default for ColourAdjust {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Largest palette the quantize edit will build; asking for more is a
/// no-op.
pub const MAX_QUANTIZE_COLOURS: usize = 256;

/// A pixel or timing edit.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    /// Rotate by a quarter turn. All frames.
    Rotate90 { clockwise: bool },
    /// Mirror. All frames.
    Flip { horizontal: bool },
    /// Keep only `rect`, clipped to each frame. All frames.
    Crop(PixelRect),
    /// Scale to exactly `width` × `height`. All frames.
    Resample {
        width: u32,
        height: u32,
        filter: ResampleFilter,
    },
    /// Colour adjustment. All frames.
    Adjust(ColourAdjust),
    /// Reduce to at most `colours` colours. All frames.
    Quantize { colours: usize },
    /// Copy `raster` in at (`x`, `y`), clipped. Current frame only.
    Paste { raster: Raster, x: u32, y: u32 },
    /// Change the display duration. Current frame only.
    SetDuration(Duration),
}

impl Edit {
    pub fn scope(&self) -> EditScope {
        match self {
            Self::Paste { .. } | Self::SetDuration(_) => EditScope::CurrentFrame,
            _ => EditScope::AllFrames,
        }
    }

    /// Short label for undo history.
    pub fn description(&self) -> String {
        match self {
            Self::Rotate90 { clockwise: true } => "Rotate clockwise".to_string(),
            Self::Rotate90 { clockwise: false } => "Rotate counter-clockwise".to_string(),
            Self::Flip { horizontal: true } => "Flip horizontal".to_string(),
            Self::Flip { horizontal: false } => "Flip vertical".to_string(),
            Self::Crop(rect) => format!("Crop to {}x{}", rect.width, rect.height),
            Self::Resample { width, height, .. } => format!("Resample to {}x{}", width, height),
            Self::Adjust(_) => "Adjust colours".to_string(),
            Self::Quantize { colours } => format!("Quantize to {} colours", colours),
            Self::Paste { .. } => "Paste".to_string(),
            Self::SetDuration(d) => format!("Set frame duration to {} ms", d.as_millis()),
        }
    }

    /// Whether applying this edit to `frame` would leave it unchanged.
    pub fn is_noop_for(&self, frame: &Frame) -> bool {
        let (w, h) = (frame.width(), frame.height());
        match self {
            Self::Rotate90 { .. } | Self::Flip { .. } => false,
            Self::Crop(rect) => {
                let clipped = rect.clamp_to(w, h);
                clipped.is_empty() || clipped == PixelRect::full(w, h)
            }
            Self::Resample { width, height, .. } => {
                (*width, *height) == (w, h)
                    || *width == 0
                    || *height == 0
                    || *width > MAX_DIMENSION
                    || *height > MAX_DIMENSION
            }
            Self::Adjust(adjust) => adjust.is_identity(),
            Self::Quantize { colours } => *colours >= MAX_QUANTIZE_COLOURS,
            Self::Paste { raster, x, y } => raster.is_empty() || *x >= w || *y >= h,
            Self::SetDuration(d) => frame.duration == *d,
        }
    }

    /// Transform one frame in place.
    pub fn apply_to(&self, frame: &mut Frame) {
        match self {
            Self::Rotate90 { clockwise } => map_image(frame, |img| {
                if *clockwise {
                    imageops::rotate90(&img)
                } else {
                    imageops::rotate270(&img)
                }
            }),
            Self::Flip { horizontal } => map_image(frame, |mut img| {
                if *horizontal {
                    imageops::flip_horizontal_in_place(&mut img);
                } else {
                    imageops::flip_vertical_in_place(&mut img);
                }
                img
            }),
            Self::Crop(rect) => frame.raster = frame.raster.cropped(*rect),
            Self::Resample {
                width,
                height,
                filter,
            } => frame.raster = resample(&frame.raster, *width, *height, filter.filter_type()),
            Self::Adjust(adjust) => adjust.apply(frame.raster.pixels_mut()),
            Self::Quantize { colours } => quantize(frame.raster.pixels_mut(), *colours),
            Self::Paste { raster, x, y } => frame.raster.blit(raster, *x, *y),
            Self::SetDuration(d) => frame.duration = *d,
        }
    }
}

// ── Pixel helpers ───────────────────────────────────────────────

/// Resample `src` to exactly `width` × `height`.
pub(crate) fn resample(src: &Raster, width: u32, height: u32, filter: FilterType) -> Raster {
    if (width, height) == (src.width(), src.height()) {
        return src.clone();
    }
    match ImageBuffer::<Rgba<u8>, &[u8]>::from_raw(src.width(), src.height(), src.pixels()) {
        Some(view) => from_rgba_image(imageops::resize(&view, width, height, filter)),
        None => Raster::new(width, height),
    }
}

fn map_image(frame: &mut Frame, f: impl FnOnce(RgbaImage) -> RgbaImage) {
    let raster = std::mem::replace(&mut frame.raster, Raster::new(0, 0));
    let (w, h) = (raster.width(), raster.height());
    let image = RgbaImage::from_raw(w, h, raster.into_pixels()).unwrap_or_else(|| RgbaImage::new(w, h));
    frame.raster = from_rgba_image(f(image));
}

fn from_rgba_image(image: RgbaImage) -> Raster {
    let (w, h) = image.dimensions();
    // Dimensions derive from an existing raster or a checked resample.
    Raster::from_pixels(w, h, image.into_raw()).unwrap_or_else(|_| Raster::new(w, h))
}

fn quantize(pixels: &mut [u8], colours: usize) {
    if pixels.is_empty() {
        return;
    }
    let colours = colours.clamp(2, MAX_QUANTIZE_COLOURS - 1);
    let quantizer = color_quant::NeuQuant::new(10, colours, pixels);
    let palette = quantizer.color_map_rgba();
    for px in pixels.chunks_exact_mut(4) {
        let index = quantizer.index_of(px) * 4;
        px.copy_from_slice(&palette[index..index + 4]);
    }
}

// ── Tests ───────────────────────────────────────────────────────
