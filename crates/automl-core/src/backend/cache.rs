//! In-process cache of loaded artifacts.
//!
//! Entries are never evicted on their own; they leave only through
//! [`ArtifactCache::remove`]. Memory grows with the number of distinct models
//! loaded during the process lifetime.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::error::Result;

struct Entries<T> {
    map: HashMap<String, Arc<T>>,
    /// Bumped by every `remove`; a load that overlaps one is not cached.
    removals: u64,
}

/// Loaded artifacts keyed by model identifier.
pub struct ArtifactCache<T> {
    entries: RwLock<Entries<T>>,
}

impl<T> Default for ArtifactCache<T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(Entries {
                map: HashMap::new(),
                removals: 0,
            }),
        }
    }
}

impl<T> ArtifactCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries<T>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries<T>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get a cached artifact.
    pub fn get(&self, id: &str) -> Option<Arc<T>> {
        self.read().map.get(id).cloned()
    }

    /// Insert or replace an artifact.
    pub fn insert(&self, id: impl Into<String>, artifact: Arc<T>) {
        let id = id.into();
        debug!("Caching artifact {}", id);
        self.write().map.insert(id, artifact);
    }

    /// Get a cached artifact or load and cache it.
    ///
    /// The loader runs without holding the lock. If two callers race, the
    /// first inserted value wins and both receive it. If any artifact is
    /// removed while the loader runs, the loaded value is returned but not
    /// cached, so an eviction is never undone by a stale load.
    pub fn get_or_load(&self, id: &str, load: impl FnOnce() -> Result<T>) -> Result<Arc<T>> {
        let removals = {
            let entries = self.read();
            if let Some(hit) = entries.map.get(id) {
                return Ok(Arc::clone(hit));
            }
            entries.removals
        };

        let loaded = Arc::new(load()?);
        let mut entries = self.write();
        if entries.removals != removals {
            debug!("Artifact {} was evicted during load; not caching", id);
            return Ok(loaded);
        }
        let entry = entries.map.entry(id.to_string()).or_insert(loaded);
        debug!("Loaded artifact {} into cache", id);
        Ok(Arc::clone(entry))
    }

    /// Evict an artifact. Returns `true` if it was cached.
    pub fn remove(&self, id: &str) -> bool {
        let mut entries = self.write();
        entries.removals = entries.removals.wrapping_add(1);
        entries.map.remove(id).is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().map.contains_key(id)
    }

    /// Number of cached artifacts.
    pub fn len(&self) -> usize {
        self.read().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
