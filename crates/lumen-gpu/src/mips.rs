//! CPU mip chain generation for uploaded textures.

use crate::backend::MipmapSettings;
use lumen_core::MipmapFilter;

/// One generated mip level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Number of levels in a full chain down to 1×1, base included.
pub fn full_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Levels the backend should allocate for `settings`.
pub fn level_count(width: u32, height: u32, settings: MipmapSettings) -> u32 {
    match settings.filter {
        MipmapFilter::None => 1,
        _ => full_level_count(width, height),
    }
}

/// Generate every level below the base. The base itself is not included.
pub fn generate(width: u32, height: u32, base: &[u8], settings: MipmapSettings) -> Vec<MipLevel> {
    let count = level_count(width, height, settings);
    let mut levels: Vec<MipLevel> = Vec::with_capacity(count.saturating_sub(1) as usize);

    for level in 1..count {
        let dw = (width >> level).max(1);
        let dh = (height >> level).max(1);
        let pixels = match (settings.chained, levels.last()) {
            (true, Some(prev)) => {
                downsample(&prev.pixels, prev.width, prev.height, dw, dh, settings.filter)
            }
            _ => downsample(base, width, height, dw, dh, settings.filter),
        };
        levels.push(MipLevel {
            width: dw,
            height: dh,
            pixels,
        });
    }
    levels
}

/// Reduce an RGBA8 image from `sw`×`sh` to `dw`×`dh`.
///
/// Each destination pixel covers the source block
/// `[x*sw/dw, (x+1)*sw/dw)` (at least one pixel); `Box` averages the
/// block and `Nearest` takes its top-left sample.
fn downsample(src: &[u8], sw: u32, sh: u32, dw: u32, dh: u32, filter: MipmapFilter) -> Vec<u8> {
    let src_px: &[[u8; 4]] = bytemuck::cast_slice(src);
    let mut out: Vec<[u8; 4]> = Vec::with_capacity(dw as usize * dh as usize);

    let span = |d: u32, dn: u32, sn: u32| {
        let start = (d as u64 * sn as u64 / dn as u64) as u32;
        let end = (((d as u64 + 1) * sn as u64) / dn as u64) as u32;
        (start, end.max(start + 1).min(sn))
    };

    for y in 0..dh {
        let (y0, y1) = span(y, dh, sh);
        for x in 0..dw {
            let (x0, x1) = span(x, dw, sw);
            if filter == MipmapFilter::Nearest {
                out.push(src_px[(y0 * sw + x0) as usize]);
                continue;
            }
            let mut sum = [0u32; 4];
            for sy in y0..y1 {
                for sx in x0..x1 {
                    let px = src_px[(sy * sw + sx) as usize];
                    for c in 0..4 {
                        sum[c] += px[c] as u32;
                    }
                }
            }
            let n = (y1 - y0) * (x1 - x0);
            out.push(sum.map(|s| ((s + n / 2) / n) as u8));
        }
    }
    out.concat()
}
