//! Lumen Image - per-image resource lifecycle
//!
//! Owns everything the viewer keeps per image:
//! - [`FrameStore`]: decoded frames plus the composed alternate view
//! - GPU residency of those frames ([`FrameStore::bind`])
//! - [`UndoStack`]: bounded history of frame snapshots
//! - [`Thumbnail`]: background thumbnail generation over a disk cache
//! - [`Image`]: the aggregate tying them together
//! - [`WorkingSet`]: LRU unloading under a memory budget

pub mod alternate;
pub mod edit;
pub mod image;
pub mod residency;
pub mod services;
pub mod store;
pub mod thumbnail;
pub mod undo;
pub mod working_set;

#[cfg(test)]
mod testing;

pub use alternate::{AlternateKind, AlternateView, CubeFace, CUBE_DISPLAY_ORDER};
pub use edit::{ColourAdjust, Edit, EditScope, ResampleFilter};
pub use crate::image::Image;
pub use residency::{GpuBinding, TextureSlot};
pub use services::ImageServices;
pub use store::FrameStore;
pub use thumbnail::{
    ThumbnailCache, ThumbnailKey, ThumbnailRecord, ThumbnailScheduler, ThumbnailStatus,
    Thumbnail, THUMBNAIL_HEIGHT, THUMBNAIL_WIDTH,
};
pub use undo::{StoreSnapshot, UndoEntry, UndoStack};
pub use working_set::WorkingSet;
