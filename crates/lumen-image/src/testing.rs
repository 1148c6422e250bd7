//! Fixtures shared by unit tests.

use lumen_core::{Frame, LumenError, Raster, Result, SourceInfo};
use lumen_media::{Codec, CodecRegistry, Decoded, FileType, LoadParams, SurfaceLayout};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

/// Returns a fixed decode result for one file type, or an error once
/// `fail` is set.
pub(crate) struct StubCodec {
    pub file_type: FileType,
    pub decoded: Mutex<Decoded>,
    pub fail: Mutex<bool>,
}

impl StubCodec {
    pub fn new(file_type: FileType, decoded: Decoded) -> Arc<Self> {
        Arc::new(Self {
            file_type,
            decoded: Mutex::new(decoded),
            fail: Mutex::new(false),
        })
    }
}

impl Codec for StubCodec {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn handles(&self, file_type: FileType) -> bool {
        file_type == self.file_type
    }

    fn load(&self, _path: &Path, _params: &LoadParams) -> Result<Decoded> {
        if *self.fail.lock() {
            return Err(LumenError::Decode("stub failure".to_string()));
        }
        Ok(self.decoded.lock().clone())
    }
}

pub(crate) fn registry(codec: Arc<StubCodec>) -> CodecRegistry {
    let mut codecs = CodecRegistry::new();
    codecs.register(codec);
    codecs
}

/// Frame `i` is `w`×`h` filled with red = `i + 1`.
pub(crate) fn numbered_frames(count: usize, w: u32, h: u32) -> Vec<Frame> {
    (0..count)
        .map(|i| Frame::still(Raster::filled(w, h, [i as u8 + 1, 0, 0, 255])))
        .collect()
}

pub(crate) fn decoded(frames: Vec<Frame>, layout: SurfaceLayout) -> Decoded {
    Decoded {
        frames,
        layout,
        source: SourceInfo::new("RGBA8"),
        metadata: Default::default(),
    }
}

/// Mip chain of `levels` levels starting at `size`×`size`.
pub(crate) fn mip_chain(size: u32, levels: u32) -> Vec<Frame> {
    (0..levels)
        .map(|i| {
            let s = (size >> i).max(1);
            Frame::still(Raster::filled(s, s, [i as u8 + 1, 0, 0, 255]))
        })
        .collect()
}
