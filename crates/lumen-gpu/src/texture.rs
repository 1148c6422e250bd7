//! wgpu texture storage and the wgpu [`TextureBackend`].

use crate::backend::{TextureBackend, TextureUpload};
use crate::context::GpuContext;
use crate::mips;
use lumen_core::{LumenError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// A GPU texture holding one image surface and its mip chain.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
    pub mip_level_count: u32,
}

impl GpuTexture {
    /// Allocate an sRGB RGBA8 texture with `mip_level_count` levels.
    pub fn new(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        mip_level_count: u32,
        label: Option<&str>,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            width,
            height,
            mip_level_count,
        }
    }

    /// Write tightly packed RGBA8 pixels into one mip level.
    pub fn write_level(&self, queue: &wgpu::Queue, level: u32, width: u32, height: u32, pixels: &[u8]) {
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: level,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Memory usage estimate in bytes, mip chain included.
    pub fn memory_size(&self) -> usize {
        (0..self.mip_level_count)
            .map(|l| {
                let w = (self.width >> l).max(1) as usize;
                let h = (self.height >> l).max(1) as usize;
                w * h * 4
            })
            .sum()
    }
}

/// Texture backend that uploads to a wgpu device.
pub struct WgpuBackend {
    context: GpuContext,
    textures: Mutex<HashMap<u64, GpuTexture>>,
    next_id: AtomicU64,
}

impl WgpuBackend {
    pub fn new(context: GpuContext) -> Self {
        Self {
            context,
            textures: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    /// Run `f` with the texture behind a raw handle, if it is resident.
    pub fn with_texture<R>(&self, id: u64, f: impl FnOnce(&GpuTexture) -> R) -> Option<R> {
        self.textures.lock().get(&id).map(f)
    }

    /// Total bytes of all resident textures.
    pub fn memory_usage(&self) -> usize {
        self.textures.lock().values().map(GpuTexture::memory_size).sum()
    }
}

impl TextureBackend for WgpuBackend {
    fn create_texture(&self, upload: &TextureUpload<'_>) -> Result<NonZeroU64> {
        let max = self.context.max_texture_dimension();
        if upload.width == 0 || upload.height == 0 || upload.width > max || upload.height > max {
            return Err(LumenError::Gpu(format!(
                "Texture {}x{} outside device limit {}",
                upload.width, upload.height, max
            )));
        }

        let chain = mips::generate(upload.width, upload.height, upload.pixels, upload.mipmaps);
        let texture = GpuTexture::new(
            &self.context.device,
            upload.width,
            upload.height,
            chain.len() as u32 + 1,
            Some(upload.label),
        );
        texture.write_level(&self.context.queue, 0, upload.width, upload.height, upload.pixels);
        for (i, level) in chain.iter().enumerate() {
            texture.write_level(
                &self.context.queue,
                i as u32 + 1,
                level.width,
                level.height,
                &level.pixels,
            );
        }

        let raw = self.next_id.fetch_add(1, Ordering::Relaxed);
        let id = NonZeroU64::new(raw)
            .ok_or_else(|| LumenError::Internal("Texture id overflow".to_string()))?;
        debug!(
            id = raw,
            label = upload.label,
            levels = texture.mip_level_count,
            "Uploaded texture"
        );
        self.textures.lock().insert(raw, texture);
        Ok(id)
    }

    fn destroy_texture(&self, id: NonZeroU64) {
        if let Some(texture) = self.textures.lock().remove(&id.get()) {
            texture.texture.destroy();
        } else {
            debug_assert!(false, "destroying unknown texture {}", id);
        }
    }
}
