//! Content key for thumbnail cache entries.

use super::{THUMBNAIL_HEIGHT, THUMBNAIL_WIDTH};
use lumen_media::FileIdentity;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Bumped whenever the cache file layout or thumbnail generation changes.
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// BLAKE3 digest of everything that determines a thumbnail's content.
///
/// Two files with identical bytes at different paths get different keys;
/// touching a file (new modification time) gets a new key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThumbnailKey([u8; 32]);

impl ThumbnailKey {
    /// Derive the key for a probed file.
    pub fn compute(identity: &FileIdentity) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&CACHE_FORMAT_VERSION.to_le_bytes());

        let path = identity.path.to_string_lossy();
        hasher.update(&(path.len() as u64).to_le_bytes());
        hasher.update(path.as_bytes());

        hasher.update(&identity.size.to_le_bytes());
        hasher.update(&timestamp_nanos(identity.created).to_le_bytes());
        hasher.update(&timestamp_nanos(identity.modified).to_le_bytes());
        hasher.update(&THUMBNAIL_WIDTH.to_le_bytes());
        hasher.update(&THUMBNAIL_HEIGHT.to_le_bytes());

        Self(*hasher.finalize().as_bytes())
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex form, used as the cache file stem.
    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }
}

impl fmt::Display for ThumbnailKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ThumbnailKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ThumbnailKey({})", &self.to_hex()[..16])
    }
}

/// Nanoseconds since the epoch; missing or pre-epoch times hash as 0.
fn timestamp_nanos(time: Option<SystemTime>) -> u128 {
    time.and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_nanos())
}

// ── Tests ───────────────────────────────────────────────────────
