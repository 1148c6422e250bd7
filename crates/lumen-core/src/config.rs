//! Viewer configuration consumed by the resource subsystem.
//!
//! The settings UI owns editing these values; this module owns their
//! defaults, their valid ranges and their JSON persistence.

use crate::error::{LumenError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Minimum accepted value for `max_cache_files`.
pub const MIN_CACHE_FILES: usize = 200;

/// Valid range for `max_undo_steps`.
pub const UNDO_STEPS_RANGE: std::ops::RangeInclusive<usize> = 1..=16;

/// Minimum accepted value for `max_image_memory_mb`.
pub const MIN_IMAGE_MEMORY_MB: usize = 64;

/// Valid range for `monitor_gamma`.
pub const GAMMA_RANGE: std::ops::RangeInclusive<f32> = 0.5..=4.0;

/// Filter used when generating GPU mip levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MipmapFilter {
    /// Upload the base level only.
    None,
    /// Point sampling.
    Nearest,
    /// 2×2 box average.
    #[default]
    Box,
}

/// Settings that affect image loading, GPU residency and thumbnails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Upper bound on decoded image memory kept resident, in megabytes.
    pub max_image_memory_mb: usize,
    /// Upper bound on the number of files in the thumbnail cache.
    pub max_cache_files: usize,
    /// Maximum undo depth per image.
    pub max_undo_steps: usize,
    /// Filter for generated mip levels.
    pub mipmap_filter: MipmapFilter,
    /// When true each mip level is generated from the previous one,
    /// otherwise every level is filtered from the base level.
    pub mipmap_chaining: bool,
    /// Display gamma threaded through to HDR / float decoders.
    pub monitor_gamma: f32,
    /// Thumbnail cache directory. `None` selects the platform cache dir.
    pub thumbnail_cache_dir: Option<PathBuf>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            max_image_memory_mb: 1024,
            max_cache_files: 4096,
            max_undo_steps: 8,
            mipmap_filter: MipmapFilter::Box,
            mipmap_chaining: true,
            monitor_gamma: 2.2,
            thumbnail_cache_dir: None,
        }
    }
}

impl ViewerConfig {
    /// Clamp every value into its valid range.
    pub fn sanitize(&mut self) {
        self.max_image_memory_mb = self.max_image_memory_mb.max(MIN_IMAGE_MEMORY_MB);
        self.max_cache_files = self.max_cache_files.max(MIN_CACHE_FILES);
        self.max_undo_steps = self
            .max_undo_steps
            .clamp(*UNDO_STEPS_RANGE.start(), *UNDO_STEPS_RANGE.end());
        if !self.monitor_gamma.is_finite() {
            self.monitor_gamma = Self::default().monitor_gamma;
        }
        self.monitor_gamma = self
            .monitor_gamma
            .clamp(*GAMMA_RANGE.start(), *GAMMA_RANGE.end());
    }

    /// Resident image memory budget in bytes.
    pub fn image_memory_budget(&self) -> usize {
        self.max_image_memory_mb.saturating_mul(1024 * 1024)
    }

    /// Resolved thumbnail cache directory.
    pub fn thumbnail_dir(&self) -> PathBuf {
        self.thumbnail_cache_dir
            .clone()
            .unwrap_or_else(default_thumbnail_dir)
    }

    /// Serialize to JSON bytes.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| LumenError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Deserialize from JSON bytes. Missing fields take their defaults and
    /// out-of-range values are clamped.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let mut config: Self = serde_json::from_slice(data)
            .map_err(|e| LumenError::Config(format!("Invalid config: {}", e)))?;
        config.sanitize();
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        debug!(path = %path.display(), "Saved viewer config");
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }

    /// Load from the default location, falling back to defaults when the
    /// file is missing or unreadable.
    pub fn load_or_default() -> Self {
        let Some(path) = default_config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable config");
                Self::default()
            }
        }
    }
}

/// `<config dir>/lumen/config.json`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("lumen").join("config.json"))
}

/// `<cache dir>/lumen/thumbnails`, falling back to the temp dir.
pub fn default_thumbnail_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("lumen")
        .join("thumbnails")
}
