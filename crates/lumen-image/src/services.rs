//! Shared services every [`Image`](crate::Image) draws on.

use crate::residency::GpuBinding;
use crate::thumbnail::{ThumbnailCache, ThumbnailJob, ThumbnailScheduler};
use lumen_core::{Result, ViewerConfig};
use lumen_gpu::{MipmapSettings, TextureBackend};
use lumen_media::{CodecRegistry, LoadParams};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Codecs, texture backend, thumbnail cache and worker scheduler, plus the
/// configuration they were built from. One instance per viewer, shared by
/// `Arc`.
#[derive(Debug)]
pub struct ImageServices {
    config: ViewerConfig,
    codecs: CodecRegistry,
    gpu: GpuBinding,
    cache: Arc<ThumbnailCache>,
    scheduler: Arc<ThumbnailScheduler>,
}

impl ImageServices {
    /// Build services from `config`, opening the configured thumbnail
    /// cache directory and sizing the scheduler for this machine.
    pub fn new(
        mut config: ViewerConfig,
        codecs: CodecRegistry,
        backend: Arc<dyn TextureBackend>,
    ) -> Result<Arc<Self>> {
        config.sanitize();
        let cache = Arc::new(ThumbnailCache::new(config.thumbnail_dir())?);
        let scheduler = Arc::new(ThumbnailScheduler::new());
        info!(
            cache = %cache.dir().display(),
            workers = scheduler.capacity(),
            "Image services ready"
        );
        Ok(Self::from_parts(config, codecs, backend, cache, scheduler))
    }

    /// Assemble services from existing parts.
    pub fn from_parts(
        mut config: ViewerConfig,
        codecs: CodecRegistry,
        backend: Arc<dyn TextureBackend>,
        cache: Arc<ThumbnailCache>,
        scheduler: Arc<ThumbnailScheduler>,
    ) -> Arc<Self> {
        config.sanitize();
        let gpu = GpuBinding::new(backend, MipmapSettings::from_config(&config));
        Arc::new(Self {
            config,
            codecs,
            gpu,
            cache,
            scheduler,
        })
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    pub fn gpu(&self) -> &GpuBinding {
        &self.gpu
    }

    pub fn cache(&self) -> &Arc<ThumbnailCache> {
        &self.cache
    }

    pub fn scheduler(&self) -> &Arc<ThumbnailScheduler> {
        &self.scheduler
    }

    pub fn load_params(&self) -> LoadParams {
        LoadParams::from_config(&self.config)
    }

    /// Work description for a thumbnail of `path`.
    pub fn thumbnail_job(&self, path: &Path) -> ThumbnailJob {
        ThumbnailJob {
            path: path.to_path_buf(),
            codecs: self.codecs.clone(),
            cache: Arc::clone(&self.cache),
            params: self.load_params(),
        }
    }

    /// Trim the thumbnail cache to the configured file count.
    pub fn maintain_cache(&self) -> Result<usize> {
        self.cache.prune(self.config.max_cache_files)
    }
}

// ── Tests ───────────────────────────────────────────────────────
