//! Alternate view: all mip levels or all cube faces in one raster.

use crate::residency::TextureSlot;
use lumen_core::Raster;
use lumen_media::{SurfaceLayout, CUBE_FACE_COUNT};

/// What the alternate view shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlternateKind {
    /// Every mip level side by side, top aligned.
    MipmapStrip,
    /// The six cube faces unfolded as a horizontal cross.
    CubeCross,
}

impl AlternateKind {
    /// The alternate view a layout gets, if any.
    pub fn for_layout(layout: SurfaceLayout) -> Option<Self> {
        match layout {
            SurfaceLayout::Flat => None,
            SurfaceLayout::Mipmaps => Some(Self::MipmapStrip),
            SurfaceLayout::Cubemap => Some(Self::CubeCross),
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::MipmapStrip => "mipmap strip",
            Self::CubeCross => "cube cross",
        }
    }
}

/// Named cube face in display terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CubeFace {
    Front,
    Back,
    PositiveX,
    NegativeX,
    Top,
    Bottom,
}

/// Where one face comes from and where it goes in the cross.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CubeFacePlacement {
    pub face: CubeFace,
    /// Index in codec storage order (+X, −X, +Y, −Y, +Z, −Z).
    pub storage_index: usize,
    /// (column, row) in the 4×3 cross grid.
    pub cell: (u32, u32),
}

/// Cube faces in display order.
pub const CUBE_DISPLAY_ORDER: [CubeFacePlacement; CUBE_FACE_COUNT] = [
    CubeFacePlacement { face: CubeFace::Front, storage_index: 4, cell: (1, 1) },
    CubeFacePlacement { face: CubeFace::Back, storage_index: 5, cell: (3, 1) },
    CubeFacePlacement { face: CubeFace::PositiveX, storage_index: 0, cell: (2, 1) },
    CubeFacePlacement { face: CubeFace::NegativeX, storage_index: 1, cell: (0, 1) },
    CubeFacePlacement { face: CubeFace::Top, storage_index: 2, cell: (1, 0) },
    CubeFacePlacement { face: CubeFace::Bottom, storage_index: 3, cell: (1, 2) },
];

const CROSS_COLUMNS: u32 = 4;
const CROSS_ROWS: u32 = 3;

/// The composed raster with its own texture.
#[derive(Debug)]
pub struct AlternateView {
    pub(crate) kind: AlternateKind,
    pub(crate) raster: Raster,
    pub(crate) texture: TextureSlot,
}

impl AlternateView {
    /// Compose the alternate view for `layout` from `surfaces`. `None` for
    /// flat layouts or surfaces that do not fit the layout.
    pub fn compose(layout: SurfaceLayout, surfaces: &[&Raster]) -> Option<Self> {
        let kind = AlternateKind::for_layout(layout)?;
        let raster = match kind {
            AlternateKind::MipmapStrip => compose_mip_strip(surfaces)?,
            AlternateKind::CubeCross => compose_cube_cross(surfaces)?,
        };
        Some(Self {
            kind,
            raster,
            texture: TextureSlot::new(),
        })
    }

    pub fn kind(&self) -> AlternateKind {
        self.kind
    }

    pub fn raster(&self) -> &Raster {
        &self.raster
    }
}

/// Lay levels out left to right, top aligned, on a transparent canvas.
pub fn compose_mip_strip(levels: &[&Raster]) -> Option<Raster> {
    if levels.is_empty() {
        return None;
    }
    let width = levels.iter().map(|l| l.width()).sum();
    let height = levels.iter().map(|l| l.height()).max().unwrap_or(0);

    let mut out = Raster::new(width, height);
    let mut x = 0;
    for level in levels {
        out.blit(level, x, 0);
        x += level.width();
    }
    Some(out)
}

/// Unfold six equally sized faces (storage order) into a 4×3 cross.
pub fn compose_cube_cross(faces: &[&Raster]) -> Option<Raster> {
    if faces.len() != CUBE_FACE_COUNT {
        return None;
    }
    let (size_w, size_h) = (faces[0].width(), faces[0].height());
    if faces.iter().any(|f| f.width() != size_w || f.height() != size_h) {
        return None;
    }

    let mut out = Raster::new(size_w * CROSS_COLUMNS, size_h * CROSS_ROWS);
    for placement in &CUBE_DISPLAY_ORDER {
        let (column, row) = placement.cell;
        out.blit(faces[placement.storage_index], column * size_w, row * size_h);
    }
    Some(out)
}

// ── Tests ───────────────────────────────────────────────────────
