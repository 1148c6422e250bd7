//! Thumbnail pipeline: cache keys, persistence, concurrency and
//! invalidation.

use crate::support::{registry, wait_until, write_png, GatedCodec, Harness};
use lumen_core::ViewerConfig;
use lumen_gpu::NOT_RESIDENT;
use lumen_image::{
    Image, ThumbnailKey, ThumbnailStatus, THUMBNAIL_HEIGHT, THUMBNAIL_WIDTH,
};
use lumen_media::{CodecRegistry, FileIdentity};
use std::time::{Duration, SystemTime};

/// Poll until the worker has been collected; returns the last handle.
fn finish(image: &mut Image) -> u64 {
    let mut handle = NOT_RESIDENT;
    wait_until(|| {
        handle = image.bind_thumbnail();
        image.thumbnail_status() != ThumbnailStatus::Running
    });
    handle
}

#[test]
fn thumbnail_round_trips_through_cache() {
    let harness = Harness::with_defaults();
    let path = harness.path("wide.png");
    write_png(&path, 300, 100, [200, 50, 50, 255]);

    let mut first = harness.image(&path);
    assert!(first.request_thumbnail());
    assert_ne!(finish(&mut first), NOT_RESIDENT);
    let record = first.thumbnail_record().expect("ready").clone();
    assert_eq!((record.primary_width, record.primary_height), (300, 100));
    assert_eq!(record.primary_area, 30_000);
    assert_eq!(
        (record.raster.width(), record.raster.height()),
        (THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT)
    );
    assert_eq!(record.metadata.get("Format").map(String::as_str), Some("PNG"));
    assert_eq!(harness.cache_files(), 1);

    // A viewer with no codecs at all can still show the cached thumbnail.
    let no_codecs = harness.services_with(CodecRegistry::new());
    let mut second = Image::new(&path, no_codecs);
    assert!(second.request_thumbnail());
    finish(&mut second);
    assert_eq!(second.thumbnail_status(), ThumbnailStatus::Ready);
    assert_eq!(second.thumbnail_record(), Some(&record));
}

#[test]
fn corrupt_cache_entry_is_regenerated() {
    let harness = Harness::with_defaults();
    let path = harness.path("photo.png");
    write_png(&path, 20, 20, [0, 0, 0, 255]);

    let key = ThumbnailKey::compute(&FileIdentity::probe(&path).unwrap());
    let entry = harness.services.cache().path_for(&key);
    std::fs::write(&entry, b"LUMT\x01\x00\x00\x00PROP").unwrap();

    let mut image = harness.image(&path);
    image.request_thumbnail();
    finish(&mut image);
    assert_eq!(image.thumbnail_status(), ThumbnailStatus::Ready);
    assert!(harness.services.cache().load(&key).is_some());
}

#[test]
fn identical_bytes_at_different_paths_get_different_keys() {
    let harness = Harness::with_defaults();
    let a = harness.path("a.png");
    let b = harness.path("b.png");
    write_png(&a, 4, 4, [1, 1, 1, 255]);
    std::fs::copy(&a, &b).unwrap();

    let key_a = ThumbnailKey::compute(&FileIdentity::probe(&a).unwrap());
    let key_b = ThumbnailKey::compute(&FileIdentity::probe(&b).unwrap());
    assert_ne!(key_a, key_b);
}

#[test]
fn key_depends_only_on_file_identity() {
    let harness = Harness::with_defaults();
    let path = harness.path("a.png");
    write_png(&path, 4, 4, [1, 1, 1, 255]);

    let identity = FileIdentity::probe(&path).unwrap();
    assert_eq!(ThumbnailKey::compute(&identity), ThumbnailKey::compute(&identity));
    assert_eq!(
        ThumbnailKey::compute(&identity),
        ThumbnailKey::compute(&FileIdentity::probe(&path).unwrap())
    );

    let file = std::fs::File::options().write(true).open(&path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(60))
        .unwrap();
    let touched = FileIdentity::probe(&path).unwrap();
    assert_ne!(ThumbnailKey::compute(&identity), ThumbnailKey::compute(&touched));
}

#[test]
fn repeated_request_is_idempotent() {
    let (codec, release) = GatedCodec::new();
    let harness = Harness::new(registry(codec.clone()), ViewerConfig::default(), 4);
    let path = harness.touch("one.png");

    let mut image = harness.image(&path);
    assert!(image.request_thumbnail());
    assert!(!image.request_thumbnail());
    assert_eq!(harness.scheduler.running(), 1);

    release.send(()).unwrap();
    finish(&mut image);
    assert!(!image.request_thumbnail(), "ready thumbnails are not re-requested");
    assert_eq!(codec.calls(), 1);
    assert_eq!(harness.scheduler.running(), 0);
}

#[test]
fn workers_are_capped_by_scheduler() {
    let (codec, release) = GatedCodec::new();
    let harness = Harness::new(registry(codec.clone()), ViewerConfig::default(), 2);
    let mut images: Vec<Image> = (0..5)
        .map(|i| {
            let path = harness.touch(&format!("{}.png", i));
            harness.image(&path)
        })
        .collect();

    let started: Vec<bool> = images.iter_mut().map(|i| i.request_thumbnail()).collect();
    assert_eq!(started, vec![true, true, false, false, false]);
    assert_eq!(harness.scheduler.running(), 2);
    wait_until(|| codec.in_flight() == 2);

    // Drain everything, re-requesting deferred images as slots free up.
    let mut released = 0;
    wait_until(|| {
        if released < 5 && codec.in_flight() > 0 {
            release.send(()).unwrap();
            released += 1;
        }
        for image in images.iter_mut() {
            image.bind_thumbnail();
            image.request_thumbnail();
        }
        images
            .iter()
            .all(|i| i.thumbnail_status() == ThumbnailStatus::Ready)
    });

    assert_eq!(codec.calls(), 5);
    assert!(codec.peak() <= 2);
    assert!(harness.scheduler.peak() <= 2);
    assert_eq!(harness.scheduler.running(), 0);
}

#[test]
fn invalidation_mid_flight_discards_result() {
    let (codec, release) = GatedCodec::new();
    let harness = Harness::new(registry(codec.clone()), ViewerConfig::default(), 2);
    let path = harness.touch("changing.png");

    let mut image = harness.image(&path);
    assert!(image.request_thumbnail());
    wait_until(|| codec.in_flight() == 1);

    image.request_invalidate_thumbnail();
    assert_eq!(image.bind_thumbnail(), NOT_RESIDENT);
    assert_eq!(image.thumbnail_status(), ThumbnailStatus::Running);

    release.send(()).unwrap();
    wait_until(|| {
        assert_eq!(image.bind_thumbnail(), NOT_RESIDENT);
        image.thumbnail_status() != ThumbnailStatus::Running
    });
    assert_eq!(image.thumbnail_status(), ThumbnailStatus::Unrequested);
    assert!(image.thumbnail_record().is_none());
    assert_eq!(harness.cache_files(), 0, "discarded result leaves no cache file");
    assert_eq!(harness.scheduler.running(), 0);

    // A fresh request starts over.
    assert!(image.request_thumbnail());
    release.send(()).unwrap();
    assert_ne!(finish(&mut image), NOT_RESIDENT);
}

#[test]
fn unsupported_source_fails_without_cache_entry() {
    let harness = Harness::with_defaults();
    let path = harness.touch("notes.txt");

    let mut image = harness.image(&path);
    assert!(image.request_thumbnail());
    assert_eq!(finish(&mut image), NOT_RESIDENT);
    assert_eq!(image.thumbnail_status(), ThumbnailStatus::Failed);
    assert!(!image.request_thumbnail(), "failures are not retried");
    assert_eq!(harness.cache_files(), 0);

    image.request_invalidate_thumbnail();
    image.bind_thumbnail();
    assert_eq!(image.thumbnail_status(), ThumbnailStatus::Unrequested);
}

#[test]
fn dropping_image_waits_for_its_worker() {
    let (codec, release) = GatedCodec::new();
    let harness = Harness::new(registry(codec.clone()), ViewerConfig::default(), 2);
    let path = harness.touch("slow.png");

    let mut image = harness.image(&path);
    image.request_thumbnail();
    wait_until(|| codec.in_flight() == 1);
    release.send(()).unwrap();
    drop(image);

    assert_eq!(codec.in_flight(), 0);
    assert_eq!(harness.scheduler.running(), 0);
}

#[test]
fn cache_maintenance_prunes_to_limit() {
    let harness = Harness::with_defaults();
    let mut images = Vec::new();
    for i in 0..3 {
        let path = harness.path(&format!("{}.png", i));
        write_png(&path, 8, 8, [i as u8, 0, 0, 255]);
        let mut image = harness.image(&path);
        image.request_thumbnail();
        finish(&mut image);
        images.push(image);
    }
    assert_eq!(harness.cache_files(), 3);
    assert_eq!(harness.services.cache().prune(1).unwrap(), 2);
    assert_eq!(harness.cache_files(), 1);
    assert_eq!(harness.services.maintain_cache().unwrap(), 0);
}
