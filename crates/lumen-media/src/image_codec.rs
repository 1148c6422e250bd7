//! Built-in codec backed by the `image` crate.

use crate::decoder::{Codec, Decoded, LoadParams, SurfaceLayout};
use crate::probe::FileType;
use image::codecs::gif::GifDecoder;
use image::codecs::png::PngDecoder;
use image::{AnimationDecoder, ColorType, DynamicImage, ImageReader};
use lumen_core::{
    AlphaMode, ChannelType, ColourProfile, Frame, LumenError, Metadata, Raster, Result,
    SourceInfo,
};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Decodes the common raster formats, including animated GIF and APNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCodec;

impl ImageCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Codec for ImageCodec {
    fn name(&self) -> &'static str {
        "image"
    }

    fn handles(&self, file_type: FileType) -> bool {
        matches!(
            file_type,
            FileType::Png
                | FileType::Jpeg
                | FileType::Gif
                | FileType::Bmp
                | FileType::Tga
                | FileType::Tiff
                | FileType::Webp
                | FileType::Ico
                | FileType::Hdr
                | FileType::Exr
                | FileType::Qoi
                | FileType::Pnm
        )
    }

    fn load(&self, path: &Path, params: &LoadParams) -> Result<Decoded> {
        let file_type = FileType::from_path(path);
        let mut decoded = match file_type {
            FileType::Gif => load_gif(path)?,
            FileType::Png => match load_apng(path)? {
                Some(decoded) => decoded,
                None => load_still(path, params)?,
            },
            _ => load_still(path, params)?,
        };

        let primary = decoded.frames.first().map(|f| (f.width(), f.height()));
        decoded
            .metadata
            .insert("Format".to_string(), file_type.name().to_string());
        if let Some((w, h)) = primary {
            decoded
                .metadata
                .insert("Dimensions".to_string(), format!("{}x{}", w, h));
        }
        decoded
            .metadata
            .insert("Frames".to_string(), decoded.frames.len().to_string());
        Ok(decoded)
    }
}

fn decode_err(e: image::ImageError) -> LumenError {
    LumenError::Decode(e.to_string())
}

fn open(path: &Path) -> Result<BufReader<File>> {
    Ok(BufReader::new(File::open(path)?))
}

fn load_still(path: &Path, params: &LoadParams) -> Result<Decoded> {
    let img = ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(decode_err)?;

    let color = img.color();
    let source = source_info(color);
    let raster = if source.channel_type.is_float() {
        tonemap(&img, params)?
    } else {
        let rgba = img.to_rgba8();
        let (w, h) = rgba.dimensions();
        Raster::from_pixels(w, h, rgba.into_raw())?
    };

    let mut decoded = Decoded::still(Frame::still(raster), source);
    decoded
        .metadata
        .insert("Colour type".to_string(), format!("{:?}", color));
    Ok(decoded)
}

fn load_gif(path: &Path) -> Result<Decoded> {
    let decoder = GifDecoder::new(open(path)?).map_err(decode_err)?;
    let frames = collect_animation(decoder)?;
    debug!(path = %path.display(), frames = frames.len(), "Decoded GIF");
    Ok(animation(frames, "P8", AlphaMode::Normal))
}

/// Animated PNGs only; `None` for ordinary PNGs.
fn load_apng(path: &Path) -> Result<Option<Decoded>> {
    let decoder = PngDecoder::new(open(path)?).map_err(decode_err)?;
    if !decoder.is_apng().map_err(decode_err)? {
        return Ok(None);
    }
    let frames = collect_animation(decoder.apng().map_err(decode_err)?)?;
    debug!(path = %path.display(), frames = frames.len(), "Decoded APNG");
    Ok(Some(animation(frames, "RGBA8", AlphaMode::Normal)))
}

fn collect_animation<'a>(decoder: impl AnimationDecoder<'a>) -> Result<Vec<Frame>> {
    decoder
        .into_frames()
        .map(|frame| {
            let frame = frame.map_err(decode_err)?;
            let (numer, denom) = frame.delay().numer_denom_ms();
            let millis = if denom == 0 {
                0.0
            } else {
                numer as f64 / denom as f64
            };
            let buffer = frame.into_buffer();
            let (w, h) = buffer.dimensions();
            let raster = Raster::from_pixels(w, h, buffer.into_raw())?;
            Ok(Frame::new(raster, Duration::from_secs_f64(millis / 1000.0)))
        })
        .collect()
}

fn animation(frames: Vec<Frame>, pixel_format: &str, alpha_mode: AlphaMode) -> Decoded {
    Decoded {
        frames,
        layout: SurfaceLayout::Flat,
        source: SourceInfo {
            pixel_format: pixel_format.to_string(),
            colour_profile: ColourProfile::Srgb,
            alpha_mode,
            channel_type: ChannelType::Unorm8,
        },
        metadata: Metadata::new(),
    }
}

fn source_info(color: ColorType) -> SourceInfo {
    let channel_type = match color {
        ColorType::L16 | ColorType::La16 | ColorType::Rgb16 | ColorType::Rgba16 => {
            ChannelType::Unorm16
        }
        ColorType::Rgb32F | ColorType::Rgba32F => ChannelType::Float32,
        _ => ChannelType::Unorm8,
    };
    SourceInfo {
        pixel_format: format!("{:?}", color).to_uppercase(),
        colour_profile: if channel_type.is_float() {
            ColourProfile::Linear
        } else {
            ColourProfile::Srgb
        },
        alpha_mode: if color.has_alpha() {
            AlphaMode::Normal
        } else {
            AlphaMode::None
        },
        channel_type,
    }
}

/// Reduce a linear float image to 8 bits with exposure and display gamma.
fn tonemap(img: &DynamicImage, params: &LoadParams) -> Result<Raster> {
    let linear = img.to_rgba32f();
    let (w, h) = linear.dimensions();
    let inv_gamma = 1.0 / params.gamma.max(f32::EPSILON);
    let pixels = linear
        .into_raw()
        .chunks_exact(4)
        .flat_map(|px| {
            let encode = |v: f32| {
                let v = (v * params.exposure).max(0.0).powf(inv_gamma).min(1.0);
                (v * 255.0 + 0.5) as u8
            };
            [
                encode(px[0]),
                encode(px[1]),
                encode(px[2]),
                (px[3].clamp(0.0, 1.0) * 255.0 + 0.5) as u8,
            ]
        })
        .collect();
    Raster::from_pixels(w, h, pixels)
}
