//! Edits and undo history through the public `Image` API.

use crate::support::{write_gif, write_png, Harness};
use lumen_core::{PixelRect, Raster, ViewerConfig};
use lumen_image::{ColourAdjust, Edit, ResampleFilter};
use lumen_media::CodecRegistry;
use std::time::Duration;

fn harness_with_depth(depth: usize) -> Harness {
    let config = ViewerConfig {
        max_undo_steps: depth,
        ..Default::default()
    };
    Harness::new(CodecRegistry::with_defaults(), config, 2)
}

#[test]
fn undo_history_is_bounded() {
    let depth = 4;
    let harness = harness_with_depth(depth);
    let path = harness.path("photo.png");
    write_png(&path, 64, 64, [128, 128, 128, 255]);
    let mut image = harness.image(&path);
    image.load(false).unwrap();

    // depth + 1 edits: 64 → 60 → 56 → 52 → 48 → 44.
    for step in 1..=depth as u32 + 1 {
        let size = 64 - 4 * step;
        assert!(image.apply_edit(&Edit::Crop(PixelRect::new(0, 0, size, size))));
    }
    assert_eq!(image.store().primary_size(), Some((44, 44)));

    for _ in 0..depth {
        assert!(image.undo());
    }
    assert!(!image.undo(), "oldest entry was dropped");
    assert_eq!(image.store().primary_size(), Some((60, 60)));
    assert!(image.is_dirty(), "the first edit can no longer be undone");
}

#[test]
fn undo_to_loaded_state_clears_dirty() {
    let harness = harness_with_depth(8);
    let path = harness.path("photo.png");
    write_png(&path, 8, 8, [10, 20, 30, 255]);
    let mut image = harness.image(&path);
    image.load(false).unwrap();

    image.apply_edit(&Edit::Adjust(ColourAdjust {
        brightness: 0.5,
        ..ColourAdjust::IDENTITY
    }));
    image.apply_edit(&Edit::Resample {
        width: 4,
        height: 4,
        filter: ResampleFilter::Bilinear,
    });
    assert!(image.is_dirty());

    assert!(image.undo());
    assert!(image.undo());
    assert!(!image.is_dirty());
    assert_eq!(
        image.store().current_frame().unwrap().raster.pixel(0, 0),
        [10, 20, 30, 255]
    );

    assert!(image.redo());
    assert!(image.is_dirty());
    assert_eq!(image.undo_stack().redo_description(), Some("Resample to 4x4"));
}

#[test]
fn noop_edits_leave_no_trace() {
    let harness = harness_with_depth(8);
    let path = harness.path("photo.png");
    write_png(&path, 8, 8, [10, 20, 30, 255]);
    let mut image = harness.image(&path);
    image.load(false).unwrap();

    let noops = [
        Edit::Crop(PixelRect::full(8, 8)),
        Edit::Resample {
            width: 8,
            height: 8,
            filter: ResampleFilter::Lanczos3,
        },
        Edit::Adjust(ColourAdjust::IDENTITY),
        Edit::Quantize { colours: 256 },
        Edit::Paste {
            raster: Raster::filled(2, 2, [0, 0, 0, 255]),
            x: 8,
            y: 0,
        },
    ];
    for edit in &noops {
        assert!(!image.apply_edit(edit), "{} should be a no-op", edit.description());
    }
    assert!(!image.is_dirty());
    assert!(!image.undo_stack().can_undo());
}

#[test]
fn per_frame_edits_touch_only_current_frame() {
    let harness = harness_with_depth(8);
    let path = harness.path("anim.gif");
    write_gif(&path, 4, 4, &[[255, 0, 0, 255], [0, 0, 255, 255]]);
    let mut image = harness.image(&path);
    image.load(false).unwrap();

    image.store_mut().set_current(1);
    assert!(image.apply_edit(&Edit::SetDuration(Duration::from_millis(250))));
    let store = image.store();
    assert_eq!(store.frame(0).unwrap().duration, Duration::from_millis(100));
    assert_eq!(store.frame(1).unwrap().duration, Duration::from_millis(250));

    assert!(image.apply_edit(&Edit::Flip { horizontal: true }));
    assert!(image.undo());
    assert!(image.undo());
    assert_eq!(
        image.store().frame(1).unwrap().duration,
        Duration::from_millis(100)
    );
    assert_eq!(image.store().current_index(), 1);
}

#[test]
fn reload_keeps_unsaved_edits_unless_forced() {
    let harness = harness_with_depth(8);
    let path = harness.path("photo.png");
    write_png(&path, 4, 4, [50, 60, 70, 255]);
    let mut image = harness.image(&path);
    image.load(false).unwrap();

    assert!(image.apply_edit(&Edit::Crop(PixelRect::new(0, 0, 2, 2))));
    assert!(image.is_dirty());

    assert!(image.load(false).is_err());
    assert!(image.is_dirty());
    assert_eq!(image.store().primary_size(), Some((2, 2)));
    assert!(image.undo_stack().can_undo());

    image.load(true).unwrap();
    assert!(!image.is_dirty());
    assert_eq!(image.store().primary_size(), Some((4, 4)));
    assert!(!image.undo_stack().can_undo());
}

#[test]
fn reload_after_save_is_allowed() {
    let harness = harness_with_depth(8);
    let path = harness.path("photo.png");
    write_png(&path, 4, 4, [50, 60, 70, 255]);
    let mut image = harness.image(&path);
    image.load(false).unwrap();

    image.apply_edit(&Edit::Rotate90 { clockwise: true });
    image.mark_saved();
    image.load(false).unwrap();
    assert!(!image.is_dirty());
}
