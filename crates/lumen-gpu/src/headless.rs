//! A backend that keeps textures in CPU bookkeeping only.
//!
//! Used by headless tools and by tests that assert on upload order and
//! handle lifetimes.

use crate::backend::{TextureBackend, TextureUpload};
use crate::mips;
use lumen_core::{LumenError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    Create {
        id: u64,
        label: String,
        width: u32,
        height: u32,
        levels: u32,
    },
    Destroy {
        id: u64,
    },
}

#[derive(Default)]
struct State {
    live: HashMap<u64, usize>,
    events: Vec<BackendEvent>,
    capacity: Option<usize>,
}

/// Records texture lifetimes without touching a GPU.
pub struct HeadlessBackend {
    next_id: AtomicU64,
    state: Mutex<State>,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            state: Mutex::new(State::default()),
        }
    }

    /// Limit the number of live textures; creation beyond it fails.
    pub fn with_capacity(capacity: usize) -> Self {
        let backend = Self::new();
        backend.set_capacity(Some(capacity));
        backend
    }

    pub fn set_capacity(&self, capacity: Option<usize>) {
        self.state.lock().capacity = capacity;
    }

    /// Number of textures currently alive.
    pub fn live_count(&self) -> usize {
        self.state.lock().live.len()
    }

    /// Bytes held by live textures, mip levels included.
    pub fn live_bytes(&self) -> usize {
        self.state.lock().live.values().sum()
    }

    pub fn is_live(&self, id: u64) -> bool {
        self.state.lock().live.contains_key(&id)
    }

    /// Every call since creation or the last `clear_events`.
    pub fn events(&self) -> Vec<BackendEvent> {
        self.state.lock().events.clone()
    }

    /// Labels of created textures, in creation order.
    pub fn created_labels(&self) -> Vec<String> {
        self.state
            .lock()
            .events
            .iter()
            .filter_map(|e| match e {
                BackendEvent::Create { label, .. } => Some(label.clone()),
                BackendEvent::Destroy { .. } => None,
            })
            .collect()
    }

    pub fn create_count(&self) -> usize {
        self.created_labels().len()
    }

    pub fn clear_events(&self) {
        self.state.lock().events.clear();
    }
}

impl TextureBackend for HeadlessBackend {
    fn create_texture(&self, upload: &TextureUpload<'_>) -> Result<NonZeroU64> {
        let mut state = self.state.lock();
        if let Some(capacity) = state.capacity {
            if state.live.len() >= capacity {
                return Err(LumenError::Gpu(format!(
                    "Texture capacity of {} reached",
                    capacity
                )));
            }
        }

        let chain = mips::generate(upload.width, upload.height, upload.pixels, upload.mipmaps);
        let bytes = upload.pixels.len() + chain.iter().map(|l| l.pixels.len()).sum::<usize>();

        let raw = self.next_id.fetch_add(1, Ordering::Relaxed);
        let id = NonZeroU64::new(raw)
            .ok_or_else(|| LumenError::Internal("Texture id overflow".to_string()))?;
        state.live.insert(raw, bytes);
        state.events.push(BackendEvent::Create {
            id: raw,
            label: upload.label.to_string(),
            width: upload.width,
            height: upload.height,
            levels: chain.len() as u32 + 1,
        });
        trace!(id = raw, label = upload.label, "Created headless texture");
        Ok(id)
    }

    fn destroy_texture(&self, id: NonZeroU64) {
        let mut state = self.state.lock();
        let existed = state.live.remove(&id.get()).is_some();
        debug_assert!(existed, "destroying unknown texture {}", id);
        state.events.push(BackendEvent::Destroy { id: id.get() });
    }
}
