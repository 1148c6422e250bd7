//! Shared fixtures for integration tests.

use crossbeam_channel::{Receiver, Sender};
use lumen_core::{Frame, LumenError, Raster, Result, SourceInfo, ViewerConfig};
use lumen_gpu::HeadlessBackend;
use lumen_image::{Image, ImageServices, ThumbnailCache, ThumbnailScheduler};
use lumen_media::{Codec, CodecRegistry, Decoded, FileType, LoadParams};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Route `tracing` output through the test harness. Set `RUST_LOG` to see it.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Services over a headless backend and a temporary cache directory.
pub struct Harness {
    pub dir: tempfile::TempDir,
    pub backend: Arc<HeadlessBackend>,
    pub scheduler: Arc<ThumbnailScheduler>,
    pub services: Arc<ImageServices>,
}

impl Harness {
    pub fn new(codecs: CodecRegistry, config: ViewerConfig, workers: usize) -> Self {
        init_tracing();
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let backend = Arc::new(HeadlessBackend::new());
        let scheduler = Arc::new(ThumbnailScheduler::with_capacity(workers));
        let cache = Arc::new(ThumbnailCache::new(dir.path().join("thumbnails")).expect("cache"));
        let services = ImageServices::from_parts(
            config,
            codecs,
            backend.clone(),
            cache,
            Arc::clone(&scheduler),
        );
        Self {
            dir,
            backend,
            scheduler,
            services,
        }
    }

    /// Harness with the built-in codecs and default settings.
    pub fn with_defaults() -> Self {
        Self::new(CodecRegistry::with_defaults(), ViewerConfig::default(), 2)
    }

    /// Services sharing this harness' cache and backend but using `codecs`.
    pub fn services_with(&self, codecs: CodecRegistry) -> Arc<ImageServices> {
        ImageServices::from_parts(
            self.services.config().clone(),
            codecs,
            self.backend.clone(),
            Arc::clone(self.services.cache()),
            Arc::clone(&self.scheduler),
        )
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write a placeholder file so the path can be probed.
    pub fn touch(&self, name: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, name.as_bytes()).expect("write placeholder");
        path
    }

    pub fn image(&self, path: &Path) -> Image {
        Image::new(path, self.services.clone())
    }

    pub fn cache_files(&self) -> usize {
        self.services.cache().file_count().expect("count cache files")
    }
}

/// Poll `done` until it returns true, failing after ten seconds.
pub fn wait_until(mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting");
        std::thread::sleep(Duration::from_millis(5));
    }
}

pub fn write_png(path: &Path, width: u32, height: u32, rgba: [u8; 4]) {
    image::RgbaImage::from_pixel(width, height, image::Rgba(rgba))
        .save(path)
        .expect("write png");
}

/// Animated GIF with one solid frame per colour, 100 ms each.
pub fn write_gif(path: &Path, width: u32, height: u32, colours: &[[u8; 4]]) {
    use image::codecs::gif::GifEncoder;
    use image::{Delay, Frame as GifFrame};

    let file = std::fs::File::create(path).expect("create gif");
    let mut encoder = GifEncoder::new(file);
    let frames = colours.iter().map(|&rgba| {
        GifFrame::from_parts(
            image::RgbaImage::from_pixel(width, height, image::Rgba(rgba)),
            0,
            0,
            Delay::from_numer_denom_ms(100, 1),
        )
    });
    encoder.encode_frames(frames).expect("encode gif");
}

pub fn registry(codec: Arc<dyn Codec>) -> CodecRegistry {
    let mut codecs = CodecRegistry::new();
    codecs.register(codec);
    codecs
}

// ── Codecs ──────────────────────────────────────────────────────

/// Returns fixed frames for one file type.
pub struct FixedCodec {
    pub file_type: FileType,
    pub decoded: Decoded,
}

impl Codec for FixedCodec {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn handles(&self, file_type: FileType) -> bool {
        file_type == self.file_type
    }

    fn load(&self, _path: &Path, _params: &LoadParams) -> Result<Decoded> {
        Ok(self.decoded.clone())
    }
}

/// PNG codec whose decodes block until released through the gate.
/// Tracks how many decodes run at once.
pub struct GatedCodec {
    gate: Receiver<()>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl GatedCodec {
    pub fn new() -> (Arc<Self>, Sender<()>) {
        let (release, gate) = crossbeam_channel::unbounded();
        let codec = Arc::new(Self {
            gate,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        });
        (codec, release)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Codec for GatedCodec {
    fn name(&self) -> &'static str {
        "gated"
    }

    fn handles(&self, file_type: FileType) -> bool {
        file_type == FileType::Png
    }

    fn load(&self, _path: &Path, _params: &LoadParams) -> Result<Decoded> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let released = self.gate.recv_timeout(Duration::from_secs(10));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        released.map_err(|_| LumenError::Decode("gate never opened".to_string()))?;
        Ok(Decoded::still(
            Frame::still(Raster::filled(32, 16, [0, 200, 0, 255])),
            SourceInfo::new("RGBA8"),
        ))
    }
}
