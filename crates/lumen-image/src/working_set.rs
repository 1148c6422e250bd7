//! The set of images the viewer currently knows about, with LRU unloading
//! under a memory budget.

use crate::image::Image;
use lumen_core::ViewerConfig;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

/// Images keyed by id, tracked in least-recently-used order.
///
/// Eviction only unloads frames; the image stays in the set (with its
/// thumbnail) and can be loaded again. Modified images are never unloaded.
#[derive(Debug)]
pub struct WorkingSet {
    images: HashMap<Uuid, Image>,
    /// Least recently used first.
    lru_order: Vec<Uuid>,
    /// Resident memory budget in bytes.
    budget: usize,
}

impl WorkingSet {
    /// Create a working set with the given memory budget in bytes.
    pub fn new(budget: usize) -> Self {
        Self {
            images: HashMap::new(),
            lru_order: Vec::new(),
            budget,
        }
    }

    pub fn from_config(config: &ViewerConfig) -> Self {
        Self::new(config.image_memory_budget())
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn set_budget(&mut self, budget: usize) {
        self.budget = budget;
    }

    /// Add an image as the most recently used. Returns its id.
    pub fn insert(&mut self, image: Image) -> Uuid {
        let id = image.id();
        self.images.insert(id, image);
        self.touch(id);
        id
    }

    /// Remove an image. Dropping it waits for its thumbnail worker.
    pub fn remove(&mut self, id: Uuid) -> Option<Image> {
        self.lru_order.retain(|&other| other != id);
        self.images.remove(&id)
    }

    pub fn get(&self, id: Uuid) -> Option<&Image> {
        self.images.get(&id)
    }

    /// Mutable access without changing recency.
    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut Image> {
        self.images.get_mut(&id)
    }

    /// Mark an image as most recently used.
    pub fn touch(&mut self, id: Uuid) -> bool {
        if !self.images.contains_key(&id) {
            return false;
        }
        self.lru_order.retain(|&other| other != id);
        self.lru_order.push(id);
        true
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.images.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Ids from least to most recently used.
    pub fn ids_by_recency(&self) -> &[Uuid] {
        &self.lru_order
    }

    /// Ids ordered by each image's shuffle value.
    pub fn shuffled_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<_> = self.lru_order.clone();
        ids.sort_by_key(|id| self.images.get(id).map_or(0, Image::shuffle_value));
        ids
    }

    /// Bytes held by every loaded image.
    pub fn resident_memory(&self) -> usize {
        self.images.values().map(Image::memory_size).sum()
    }

    /// Unload least recently used clean images until resident memory fits
    /// the budget. `protect` is never unloaded. Returns the ids unloaded.
    pub fn enforce_budget(&mut self, protect: Option<Uuid>) -> Vec<Uuid> {
        let mut resident = self.resident_memory();
        let mut unloaded = Vec::new();
        if resident <= self.budget {
            return unloaded;
        }

        for id in &self.lru_order {
            if resident <= self.budget {
                break;
            }
            if Some(*id) == protect {
                continue;
            }
            let Some(image) = self.images.get_mut(id) else {
                continue;
            };
            if !image.is_loaded() || image.is_dirty() {
                continue;
            }
            let size = image.memory_size();
            if image.unload(false) {
                resident = resident.saturating_sub(size);
                unloaded.push(*id);
                debug!(path = %image.path().display(), bytes = size, "Evicted image");
            }
        }

        if !unloaded.is_empty() {
            info!(
                evicted = unloaded.len(),
                resident,
                budget = self.budget,
                "Enforced image memory budget"
            );
        }
        unloaded
    }
}

// ── Tests ───────────────────────────────────────────────────────
