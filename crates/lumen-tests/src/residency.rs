//! Loading and GPU residency through the public `Image` API.

use crate::support::{registry, write_gif, write_png, FixedCodec, Harness};
use lumen_core::{Frame, Raster, SourceInfo, ViewerConfig};
use lumen_gpu::{BackendEvent, NOT_RESIDENT};
use lumen_image::{AlternateKind, Edit};
use lumen_media::{Decoded, FileType, SurfaceLayout};
use std::sync::Arc;
use std::time::Duration;

const COLOURS: [[u8; 4]; 4] = [
    [255, 0, 0, 255],
    [0, 255, 0, 255],
    [0, 0, 255, 255],
    [255, 255, 255, 255],
];

#[test]
fn animated_gif_uploads_last_frame_first() {
    let harness = Harness::with_defaults();
    let path = harness.path("anim.gif");
    write_gif(&path, 8, 8, &COLOURS);

    let mut image = harness.image(&path);
    image.load(false).expect("load gif");
    assert_eq!(image.store().frame_count(), 4);
    assert_eq!(
        image.store().frame(0).unwrap().duration,
        Duration::from_millis(100)
    );

    let handle = image.bind();
    assert_ne!(handle, NOT_RESIDENT);
    assert_eq!(
        harness.backend.created_labels(),
        vec!["frame 3", "frame 2", "frame 1", "frame 0"]
    );
    assert_eq!(handle, image.store().frame_handle(0));

    // Second bind is free.
    assert_eq!(image.bind(), handle);
    assert_eq!(harness.backend.create_count(), 4);
}

#[test]
fn bind_returns_zero_on_exhaustion_and_recovers() {
    let harness = Harness::with_defaults();
    let path = harness.path("anim.gif");
    write_gif(&path, 4, 4, &COLOURS);
    let mut image = harness.image(&path);
    image.load(false).unwrap();

    harness.backend.set_capacity(Some(0));
    assert_eq!(image.bind(), NOT_RESIDENT);

    harness.backend.set_capacity(None);
    assert_ne!(image.bind(), NOT_RESIDENT);
    assert_eq!(harness.backend.live_count(), 4);
}

#[test]
fn current_frame_wins_when_textures_run_short() {
    let harness = Harness::with_defaults();
    let path = harness.path("anim.gif");
    write_gif(&path, 4, 4, &COLOURS);
    let mut image = harness.image(&path);
    image.load(false).unwrap();

    harness.backend.set_capacity(Some(1));
    let handle = image.bind();
    assert_ne!(handle, NOT_RESIDENT);
    assert_eq!(handle, image.store().frame_handle(0));
    assert_eq!(harness.backend.live_count(), 1);

    // Stable on later binds: the current texture is kept.
    for _ in 0..4 {
        assert_eq!(image.bind(), handle);
    }

    image.store_mut().set_current(2);
    let next = image.bind();
    assert_ne!(next, NOT_RESIDENT);
    assert_eq!(next, image.store().frame_handle(2));
    assert!(!harness.backend.is_live(handle));
    assert_eq!(harness.backend.live_count(), 1);
}

#[test]
fn failed_reload_keeps_previous_frames() {
    let harness = Harness::with_defaults();
    let path = harness.path("photo.png");
    write_png(&path, 6, 4, [1, 2, 3, 255]);
    let mut image = harness.image(&path);
    image.load(false).unwrap();
    let handle = image.bind();

    std::fs::write(&path, b"no longer a png").unwrap();
    assert!(image.load(false).is_err());
    assert!(image.is_loaded());
    assert_eq!(image.store().primary_size(), Some((6, 4)));
    assert_eq!(image.bind(), handle, "textures survive a failed reload");
}

#[test]
fn unload_refuses_dirty_image_until_forced() {
    let harness = Harness::with_defaults();
    let path = harness.path("photo.png");
    write_png(&path, 4, 4, [9, 9, 9, 255]);
    let mut image = harness.image(&path);
    image.load(false).unwrap();
    image.bind();

    assert!(image.apply_edit(&Edit::Rotate90 { clockwise: true }));
    assert!(!image.unload(false));
    assert!(image.is_loaded());

    assert!(image.unload(true));
    assert!(!image.is_loaded());
    assert_eq!(harness.backend.live_count(), 0);
}

#[test]
fn edit_releases_stale_texture() {
    let harness = Harness::with_defaults();
    let path = harness.path("photo.png");
    write_png(&path, 4, 2, [9, 9, 9, 255]);
    let mut image = harness.image(&path);
    image.load(false).unwrap();
    let before = image.bind();

    image.apply_edit(&Edit::Rotate90 { clockwise: false });
    assert!(!harness.backend.is_live(before));

    let after = image.bind();
    assert_ne!(after, before);
    let created = harness.backend.events().into_iter().rev().find_map(|e| match e {
        BackendEvent::Create { width, height, .. } => Some((width, height)),
        BackendEvent::Destroy { .. } => None,
    });
    assert_eq!(created, Some((2, 4)));
}

#[test]
fn cubemap_alternate_view_is_a_cross() {
    let faces = (0..6)
        .map(|i| Frame::still(Raster::filled(4, 4, [10 * (i + 1), 0, 0, 255])))
        .collect();
    let codec = Arc::new(FixedCodec {
        file_type: FileType::Dds,
        decoded: Decoded {
            frames: faces,
            layout: SurfaceLayout::Cubemap,
            source: SourceInfo::new("BC1"),
            metadata: Default::default(),
        },
    });
    let harness = Harness::new(registry(codec), ViewerConfig::default(), 2);
    let path = harness.touch("sky.dds");

    let mut image = harness.image(&path);
    image.load(false).unwrap();
    assert!(image.store_mut().set_alternate_enabled(true));

    let handle = image.bind();
    assert_eq!(handle, image.store().alternate_handle());
    assert_eq!(harness.backend.created_labels(), vec!["cube cross"]);

    let alternate = image.store().alternate().unwrap();
    assert_eq!(alternate.kind(), AlternateKind::CubeCross);
    let cross = alternate.raster();
    assert_eq!((cross.width(), cross.height()), (16, 12));
    // Row 1: -X, front (+Z), +X, back (-Z).
    let row: Vec<u8> = (0..4).map(|col| cross.pixel(col * 4, 4)[0]).collect();
    assert_eq!(row, vec![20, 50, 10, 60]);
    assert_eq!(cross.pixel(4, 0)[0], 30, "top is +Y");
    assert_eq!(cross.pixel(4, 8)[0], 40, "bottom is -Y");

    // Per-face frames are still there.
    image.store_mut().set_alternate_enabled(false);
    assert_eq!(image.store().frame_count(), 6);
}
