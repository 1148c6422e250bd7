//! Configuration flowing into services.

use crate::support::init_tracing;
use lumen_core::{MipmapFilter, ViewerConfig};
use lumen_gpu::HeadlessBackend;
use lumen_image::{ImageServices, UndoStack, WorkingSet};
use lumen_media::CodecRegistry;
use std::sync::Arc;

#[test]
fn saved_config_drives_services() {
    init_tracing();
    let dir = tempfile::tempdir().expect("failed to create tempdir");
    let config_path = dir.path().join("lumen").join("config.json");

    let config = ViewerConfig {
        max_image_memory_mb: 128,
        max_cache_files: 10,
        max_undo_steps: 3,
        mipmap_filter: MipmapFilter::Nearest,
        mipmap_chaining: false,
        monitor_gamma: 9.0,
        thumbnail_cache_dir: Some(dir.path().join("thumbs")),
    };
    config.save_to_file(&config_path).expect("save");
    let loaded = ViewerConfig::load_from_file(&config_path).expect("load");

    let services = ImageServices::new(
        loaded,
        CodecRegistry::with_defaults(),
        Arc::new(HeadlessBackend::new()),
    )
    .expect("services");
    let config = services.config();
    assert_eq!(config.max_cache_files, 200);
    assert_eq!(config.monitor_gamma, 4.0);
    assert_eq!(config.max_undo_steps, 3);
    assert!(!services.gpu().mipmaps.chained);
    assert!(dir.path().join("thumbs").is_dir());

    assert_eq!(UndoStack::new(config.max_undo_steps).max_depth(), 3);
    assert_eq!(WorkingSet::from_config(config).budget(), 128 * 1024 * 1024);
}
