//! On-disk thumbnail cache.
//!
//! One file per [`ThumbnailKey`] in a flat directory:
//! ```text
//! thumbnails/
//!   {blake3-hex}.lthumb    # LUMT chunked file
//!   .lthumb-XXXXXX.tmp     # in-flight write, renamed into place
//! ```
//!
//! File layout (little endian):
//! ```text
//! "LUMT" | u32 version | chunk*
//! chunk = tag[4] | u32 length | payload
//!   PROP  i32 width, i32 height, i32 area, i32 reserved
//!   META  u32 count, (u32 len, key, u32 len, value)*
//!   RAST  u32 width, u32 height, RGBA bytes
//! ```
//! Chunks may come in any order; unknown tags are skipped. Entries are
//! written once and never modified in place.

use super::key::{ThumbnailKey, CACHE_FORMAT_VERSION};
use super::ThumbnailRecord;
use lumen_core::limits::{BYTES_PER_PIXEL, MAX_DIMENSION};
use lumen_core::{LumenError, Metadata, Raster, Result};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, info, warn};

const MAGIC: &[u8; 4] = b"LUMT";
const TAG_PROP: [u8; 4] = *b"PROP";
const TAG_META: [u8; 4] = *b"META";
const TAG_RAST: [u8; 4] = *b"RAST";

/// Extension of published cache entries.
pub const CACHE_FILE_EXTENSION: &str = "lthumb";
const TEMP_PREFIX: &str = ".lthumb-";

/// Why a cache file could not be parsed. Every variant is treated as a
/// cache miss by [`ThumbnailCache::load`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheFormatError {
    #[error("not a thumbnail cache file")]
    BadMagic,

    #[error("unsupported cache format version {0}")]
    UnsupportedVersion(u32),

    #[error("file truncated inside {0}")]
    Truncated(&'static str),

    #[error("missing {0} chunk")]
    MissingChunk(&'static str),

    #[error("duplicate {0} chunk")]
    DuplicateChunk(&'static str),

    #[error("invalid {chunk} chunk: {reason}")]
    InvalidChunk { chunk: &'static str, reason: String },
}

type FormatResult<T> = std::result::Result<T, CacheFormatError>;

// ── Encoding ────────────────────────────────────────────────────

/// Serialize a record into the chunked cache format.
pub fn encode_record(record: &ThumbnailRecord) -> Vec<u8> {
    let raster = &record.raster;
    let mut out = Vec::with_capacity(64 + raster.memory_size());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&CACHE_FORMAT_VERSION.to_le_bytes());

    let mut prop = Vec::with_capacity(16);
    prop.extend_from_slice(&saturating_i32(u64::from(record.primary_width)).to_le_bytes());
    prop.extend_from_slice(&saturating_i32(u64::from(record.primary_height)).to_le_bytes());
    prop.extend_from_slice(&saturating_i32(record.primary_area).to_le_bytes());
    prop.extend_from_slice(&0i32.to_le_bytes());
    write_chunk(&mut out, TAG_PROP, &prop);

    let mut meta = Vec::new();
    meta.extend_from_slice(&(record.metadata.len() as u32).to_le_bytes());
    for (key, value) in &record.metadata {
        write_string(&mut meta, key);
        write_string(&mut meta, value);
    }
    write_chunk(&mut out, TAG_META, &meta);

    // RAST goes last so a file cut short never parses as complete.
    let mut rast = Vec::with_capacity(8 + raster.memory_size());
    rast.extend_from_slice(&raster.width().to_le_bytes());
    rast.extend_from_slice(&raster.height().to_le_bytes());
    rast.extend_from_slice(raster.pixels());
    write_chunk(&mut out, TAG_RAST, &rast);

    out
}

fn write_chunk(out: &mut Vec<u8>, tag: [u8; 4], payload: &[u8]) {
    out.extend_from_slice(&tag);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
}

fn write_string(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u32).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

fn saturating_i32(value: u64) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

// ── Decoding ────────────────────────────────────────────────────

struct Reader<'a> {
    data: &'a [u8],
    context: &'static str,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8], context: &'static str) -> Self {
        Self { data, context }
    }

    fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn take(&mut self, n: usize) -> FormatResult<&'a [u8]> {
        if self.data.len() < n {
            return Err(CacheFormatError::Truncated(self.context));
        }
        let (head, rest) = self.data.split_at(n);
        self.data = rest;
        Ok(head)
    }

    fn array<const N: usize>(&mut self) -> FormatResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u32(&mut self) -> FormatResult<u32> {
        self.array().map(u32::from_le_bytes)
    }

    fn i32(&mut self) -> FormatResult<i32> {
        self.array().map(i32::from_le_bytes)
    }

    fn string(&mut self) -> FormatResult<String> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CacheFormatError::InvalidChunk {
            chunk: self.context,
            reason: "string is not UTF-8".to_string(),
        })
    }
}

struct Properties {
    width: u32,
    height: u32,
    area: u64,
}

/// Parse a cache file, validating every chunk.
pub fn decode_record(bytes: &[u8]) -> FormatResult<ThumbnailRecord> {
    let mut reader = Reader::new(bytes, "header");
    if reader.take(4).map_err(|_| CacheFormatError::BadMagic)? != MAGIC {
        return Err(CacheFormatError::BadMagic);
    }
    let version = reader.u32()?;
    if version != CACHE_FORMAT_VERSION {
        return Err(CacheFormatError::UnsupportedVersion(version));
    }

    let mut properties = None;
    let mut metadata = None;
    let mut raster = None;

    while !reader.is_empty() {
        reader.context = "chunk header";
        let tag = reader.array::<4>()?;
        let len = reader.u32()? as usize;
        reader.context = "chunk payload";
        let payload = reader.take(len)?;

        match tag {
            TAG_PROP => set_once(&mut properties, "PROP", decode_properties(payload)?)?,
            TAG_META => set_once(&mut metadata, "META", decode_metadata(payload)?)?,
            TAG_RAST => set_once(&mut raster, "RAST", decode_raster(payload)?)?,
            _ => {}
        }
    }

    let properties = properties.ok_or(CacheFormatError::MissingChunk("PROP"))?;
    let raster = raster.ok_or(CacheFormatError::MissingChunk("RAST"))?;

    Ok(ThumbnailRecord {
        raster,
        primary_width: properties.width,
        primary_height: properties.height,
        primary_area: properties.area,
        metadata: metadata.unwrap_or_default(),
    })
}

fn set_once<T>(slot: &mut Option<T>, name: &'static str, value: T) -> FormatResult<()> {
    if slot.is_some() {
        return Err(CacheFormatError::DuplicateChunk(name));
    }
    *slot = Some(value);
    Ok(())
}

fn decode_properties(payload: &[u8]) -> FormatResult<Properties> {
    let mut reader = Reader::new(payload, "PROP");
    let width = reader.i32()?;
    let height = reader.i32()?;
    let area = reader.i32()?;
    let _reserved = reader.i32()?;

    let invalid = |reason: &str| CacheFormatError::InvalidChunk {
        chunk: "PROP",
        reason: reason.to_string(),
    };
    if !reader.is_empty() {
        return Err(invalid("trailing bytes"));
    }
    if width <= 0 || height <= 0 || area < 0 {
        return Err(invalid("non-positive dimensions"));
    }
    Ok(Properties {
        width: width as u32,
        height: height as u32,
        area: area as u64,
    })
}

fn decode_metadata(payload: &[u8]) -> FormatResult<Metadata> {
    let mut reader = Reader::new(payload, "META");
    let count = reader.u32()?;
    let mut metadata = Metadata::new();
    for _ in 0..count {
        let key = reader.string()?;
        let value = reader.string()?;
        metadata.insert(key, value);
    }
    if !reader.is_empty() {
        return Err(CacheFormatError::InvalidChunk {
            chunk: "META",
            reason: "trailing bytes".to_string(),
        });
    }
    Ok(metadata)
}

fn decode_raster(payload: &[u8]) -> FormatResult<Raster> {
    let mut reader = Reader::new(payload, "RAST");
    let width = reader.u32()?;
    let height = reader.u32()?;
    if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(CacheFormatError::InvalidChunk {
            chunk: "RAST",
            reason: format!("bad dimensions {}x{}", width, height),
        });
    }
    let expected = width as usize * height as usize * BYTES_PER_PIXEL;
    let pixels = reader.take(expected)?;
    if !reader.is_empty() {
        return Err(CacheFormatError::InvalidChunk {
            chunk: "RAST",
            reason: "trailing bytes".to_string(),
        });
    }
    Raster::from_pixels(width, height, pixels.to_vec()).map_err(|e| {
        CacheFormatError::InvalidChunk {
            chunk: "RAST",
            reason: e.to_string(),
        }
    })
}

// ── Cache directory ─────────────────────────────────────────────

/// Directory of published thumbnail records, shared by every worker.
#[derive(Debug)]
pub struct ThumbnailCache {
    dir: PathBuf,
}

impl ThumbnailCache {
    /// Open (creating if needed) a cache rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            LumenError::Cache(format!(
                "Failed to create thumbnail cache {}: {}",
                dir.display(),
                e
            ))
        })?;
        debug!(dir = %dir.display(), "Opened thumbnail cache");
        Ok(Self { dir })
    }

    /// The cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the entry for `key`, whether or not it exists.
    pub fn path_for(&self, key: &ThumbnailKey) -> PathBuf {
        self.dir
            .join(format!("{}.{}", key.to_hex(), CACHE_FILE_EXTENSION))
    }

    /// Whether an entry for `key` has been published.
    pub fn contains(&self, key: &ThumbnailKey) -> bool {
        self.path_for(key).is_file()
    }

    /// Read the entry for `key`. Missing, unreadable and malformed files
    /// are all misses.
    pub fn load(&self, key: &ThumbnailKey) -> Option<ThumbnailRecord> {
        let path = self.path_for(key);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read thumbnail cache entry");
                return None;
            }
        };

        match decode_record(&bytes) {
            Ok(record) => {
                debug!(key = %key, "Thumbnail cache hit");
                Some(record)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Malformed thumbnail cache entry, treating as miss");
                None
            }
        }
    }

    /// Publish `record` under `key`. The file appears atomically: readers
    /// see either nothing or the complete entry.
    pub fn store(&self, key: &ThumbnailKey, record: &ThumbnailRecord) -> Result<()> {
        let bytes = encode_record(record);
        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(".tmp")
            .tempfile_in(&self.dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_data()?;
        tmp.persist(self.path_for(key)).map_err(|e| LumenError::Io(e.error))?;
        debug!(key = %key, bytes = bytes.len(), "Stored thumbnail");
        Ok(())
    }

    /// Delete the entry for `key`. Returns whether a file was removed.
    pub fn remove(&self, key: &ThumbnailKey) -> Result<bool> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Number of published entries.
    pub fn file_count(&self) -> Result<usize> {
        Ok(self.entries()?.len())
    }

    /// Delete the oldest entries (by modification time) until at most
    /// `max_files` remain. Returns how many were deleted.
    pub fn prune(&self, max_files: usize) -> Result<usize> {
        let mut entries = self.entries()?;
        if entries.len() <= max_files {
            return Ok(0);
        }
        entries.sort_by_key(|(modified, _)| *modified);

        let excess = entries.len() - max_files;
        let mut removed = 0;
        for (_, path) in entries.into_iter().take(excess) {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to prune cache entry"),
            }
        }
        info!(removed, kept = max_files, "Pruned thumbnail cache");
        Ok(removed)
    }

    /// Delete every entry, plus temp files left by interrupted writes.
    pub fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if is_cache_file(&path) || name.starts_with(TEMP_PREFIX) {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }
        info!(removed, "Cleared thumbnail cache");
        Ok(removed)
    }

    fn entries(&self) -> Result<Vec<(SystemTime, PathBuf)>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if !is_cache_file(&path) {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            entries.push((modified, path));
        }
        Ok(entries)
    }
}

fn is_cache_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(CACHE_FILE_EXTENSION)
}

// ── Tests ───────────────────────────────────────────────────────
