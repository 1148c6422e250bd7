//! File probing to get identity and type without a full decode.

use lumen_core::{LumenError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// File type detected from the path extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tga,
    Tiff,
    Webp,
    Ico,
    Hdr,
    Exr,
    Qoi,
    Pnm,
    Dds,
    Ktx,
    Unknown,
}

impl FileType {
    /// Detect from the extension, case-insensitively.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("png" | "apng") => Self::Png,
            Some("jpg" | "jpeg" | "jpe" | "jfif") => Self::Jpeg,
            Some("gif") => Self::Gif,
            Some("bmp") => Self::Bmp,
            Some("tga") => Self::Tga,
            Some("tif" | "tiff") => Self::Tiff,
            Some("webp") => Self::Webp,
            Some("ico") => Self::Ico,
            Some("hdr" | "rgbe") => Self::Hdr,
            Some("exr") => Self::Exr,
            Some("qoi") => Self::Qoi,
            Some("pbm" | "pgm" | "ppm" | "pnm" | "pam") => Self::Pnm,
            Some("dds") => Self::Dds,
            Some("ktx" | "ktx2") => Self::Ktx,
            _ => Self::Unknown,
        }
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Png => "PNG",
            Self::Jpeg => "JPEG",
            Self::Gif => "GIF",
            Self::Bmp => "BMP",
            Self::Tga => "TGA",
            Self::Tiff => "TIFF",
            Self::Webp => "WebP",
            Self::Ico => "ICO",
            Self::Hdr => "Radiance HDR",
            Self::Exr => "OpenEXR",
            Self::Qoi => "QOI",
            Self::Pnm => "PNM",
            Self::Dds => "DDS",
            Self::Ktx => "KTX",
            Self::Unknown => "Unknown",
        }
    }
}

/// Identity of a file on disk: everything the thumbnail cache key is
/// derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileIdentity {
    /// Absolute path.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Creation time, when the platform reports one.
    pub created: Option<SystemTime>,
    /// Last modification time, when the platform reports one.
    pub modified: Option<SystemTime>,
    pub file_type: FileType,
}

impl FileIdentity {
    /// Probe a file.
    pub fn probe<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                LumenError::NotFound(format!("File not found: {}", path.display()))
            }
            _ => LumenError::Io(e),
        })?;

        if !metadata.is_file() {
            return Err(LumenError::InvalidParameter(format!(
                "Not a regular file: {}",
                path.display()
            )));
        }

        Ok(Self {
            path: absolute_path(path),
            size: metadata.len(),
            created: metadata.created().ok(),
            modified: metadata.modified().ok(),
            file_type: FileType::from_path(path),
        })
    }
}

/// Absolute form of `path`, resolving symlinks where possible.
pub fn absolute_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = std::fs::canonicalize(path) {
        return canonical;
    }
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
