//! Bounded, time-limited cache of rasterized page surfaces

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::surface::{RenderSurface, Viewport};

/// Cache key for rendered surfaces
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Page number
    pub page_number: usize,
    /// Scale factor (stored as millionths for stable hashing)
    pub scale_millionths: u32,
}

impl CacheKey {
    /// Create a cache key for a page at a given scale
    #[must_use]
    pub fn new(page_number: usize, scale: f32) -> Self {
        Self {
            page_number,
            scale_millionths: (scale * 1_000_000.0) as u32,
        }
    }
}

struct CacheSlot<S> {
    surface: S,
    viewport: Viewport,
    inserted_at: Instant,
}

/// Read-only cache snapshot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries physically present, including expired-but-unswept ones
    pub entries: usize,
    /// Maximum entry count
    pub capacity: usize,
}

/// Bounded surface cache.
///
/// Eviction is by oldest insertion time, not access time: hits do not
/// refresh recency. Expired entries are discarded lazily when read, never
/// swept in the background. Every surface leaving the cache is released
/// exactly once.
pub struct SurfaceCache<S: RenderSurface> {
    slots: HashMap<CacheKey, CacheSlot<S>>,
    capacity: usize,
    ttl: Duration,
}

impl<S: RenderSurface> SurfaceCache<S> {
    /// Create a cache holding at most `capacity` surfaces for up to `ttl`
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            slots: HashMap::new(),
            capacity: capacity.max(1),
            ttl,
        }
    }

    /// Look up a surface, discarding it if its TTL has elapsed.
    pub fn get(&mut self, key: &CacheKey, now: Instant) -> Option<(&S, &Viewport)> {
        let expired = match self.slots.get(key) {
            Some(slot) => now.duration_since(slot.inserted_at) > self.ttl,
            None => return None,
        };

        if expired {
            if let Some(mut slot) = self.slots.remove(key) {
                log::trace!("cache: page {} expired", key.page_number);
                slot.surface.release();
            }
            return None;
        }

        self.slots
            .get(key)
            .map(|slot| (&slot.surface, &slot.viewport))
    }

    /// Insert a surface, evicting the oldest-inserted entry when full.
    ///
    /// Re-inserting an existing key replaces (and releases) the old surface
    /// without counting against capacity.
    pub fn insert(&mut self, key: CacheKey, surface: S, viewport: Viewport, now: Instant) {
        if let Some(mut replaced) = self.slots.remove(&key) {
            replaced.surface.release();
        } else if self.slots.len() >= self.capacity {
            self.evict_oldest();
        }

        self.slots.insert(
            key,
            CacheSlot {
                surface,
                viewport,
                inserted_at: now,
            },
        );
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .slots
            .iter()
            .min_by_key(|(_, slot)| slot.inserted_at)
            .map(|(key, _)| *key);

        if let Some(key) = oldest {
            if let Some(mut slot) = self.slots.remove(&key) {
                log::trace!("cache: evicting page {} at capacity", key.page_number);
                slot.surface.release();
            }
        }
    }

    /// Remove all cached versions of a page regardless of scale.
    pub fn evict_page(&mut self, page_number: usize) {
        let keys_to_remove: Vec<_> = self
            .slots
            .keys()
            .filter(|k| k.page_number == page_number)
            .copied()
            .collect();

        for key in keys_to_remove {
            if let Some(mut slot) = self.slots.remove(&key) {
                slot.surface.release();
            }
        }
    }

    /// Release every entry.
    pub fn clear(&mut self) {
        for (_, mut slot) in self.slots.drain() {
            slot.surface.release();
        }
    }

    /// Number of cached surfaces
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if cache is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Cache capacity
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entry time-to-live
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.slots.len(),
            capacity: self.capacity,
        }
    }
}

impl<S: RenderSurface> Drop for SurfaceCache<S> {
    fn drop(&mut self) {
        self.clear();
    }
}
