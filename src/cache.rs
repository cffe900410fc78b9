//! Memoization of single-container packing runs.
//!
//! The packer is deterministic, so a result can be reused whenever the same
//! container sees the same packages in the same order under the same config.
//! Keys are SHA-256 digests over the serialized inputs.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use sha2::{Digest, Sha256};

use crate::model::{Container, Package};
use crate::packer::{PackingConfig, PackingResult, pack_container_with_config};

/// Bounded FIFO cache of packing results, shareable between threads.
///
/// The lock is held only for lookup and insert; packing itself runs unlocked,
/// so concurrent misses on the same key may both pack. A capacity of zero
/// disables caching.
#[derive(Debug)]
pub struct PackingCache {
    capacity: usize,
    state: Mutex<CacheState>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, PackingResult>,
    order: VecDeque<String>,
    hits: u64,
    misses: u64,
}

impl PackingCache {
    pub const DEFAULT_CAPACITY: usize = 64;

    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(CacheState {
                entries: HashMap::with_capacity(capacity),
                order: VecDeque::with_capacity(capacity),
                ..CacheState::default()
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// (hits, misses) since creation.
    pub fn stats(&self) -> (u64, u64) {
        let state = self.lock();
        (state.hits, state.misses)
    }

    /// Returns the cached result for these inputs or packs and stores it.
    pub fn get_or_pack(
        &self,
        packages: Vec<Package>,
        container: &Container,
        config: &PackingConfig,
    ) -> PackingResult {
        if self.capacity == 0 {
            return pack_container_with_config(packages, container, config);
        }

        let Some(key) = cache_key(&packages, container, config) else {
            tracing::warn!(container = %container.id, "could not derive cache key, packing uncached");
            return pack_container_with_config(packages, container, config);
        };

        {
            let mut state = self.lock();
            if let Some(hit) = state.entries.get(&key).cloned() {
                state.hits += 1;
                tracing::debug!(container = %container.id, "packing cache hit");
                return hit;
            }
            state.misses += 1;
        }

        let result = pack_container_with_config(packages, container, config);
        self.insert(key, result.clone());
        result
    }

    fn insert(&self, key: String, result: PackingResult) {
        let mut state = self.lock();
        if state.entries.contains_key(&key) {
            return;
        }
        while state.entries.len() >= self.capacity {
            match state.order.pop_front() {
                Some(oldest) => {
                    state.entries.remove(&oldest);
                }
                None => break,
            }
        }
        state.order.push_back(key.clone());
        state.entries.insert(key, result);
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // A poisoned lock still holds a usable cache.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for PackingCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

/// Hex-encoded SHA-256 over container, packages and config.
///
/// Package order is part of the key since it decides ties in the shelf sort.
fn cache_key(packages: &[Package], container: &Container, config: &PackingConfig) -> Option<String> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(container).ok()?);
    hasher.update(serde_json::to_vec(packages).ok()?);
    hasher.update([u8::from(config.enforce_weight_limit)]);
    hasher.update(config.general_epsilon.to_le_bytes());

    let digest = hasher.finalize();
    Some(digest.iter().map(|b| format!("{:02x}", b)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClientId, ItemId, PackageId};
    use crate::types::Dimensions;

    fn van() -> Container {
        Container::new("van", "Van", Dimensions::new(240.0, 140.0, 140.0), 800.0).unwrap()
    }

    fn cube(id: &str, edge: f64) -> Package {
        Package {
            id: PackageId::from(id),
            item_id: ItemId::from(id),
            client_id: ClientId::from("#1"),
            box_id: None,
            dimensions: Dimensions::cube(edge),
            weight_kg: 1.0,
            color: "#fff".to_string(),
        }
    }

    #[test]
    fn repeated_runs_hit_the_cache() {
        let cache = PackingCache::new(4);
        let packages = vec![cube("a", 50.0), cube("b", 40.0)];

        let first = cache.get_or_pack(packages.clone(), &van(), &PackingConfig::default());
        let second = cache.get_or_pack(packages, &van(), &PackingConfig::default());

        assert_eq!(first, second);
        assert_eq!(cache.stats(), (1, 1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn config_and_order_change_the_key() {
        let packages = vec![cube("a", 50.0), cube("b", 50.0)];
        let reversed: Vec<_> = packages.iter().rev().cloned().collect();
        let advisory = PackingConfig::builder().enforce_weight_limit(false).build();

        let base = cache_key(&packages, &van(), &PackingConfig::default()).unwrap();
        assert_eq!(base.len(), 64);
        assert_ne!(base, cache_key(&reversed, &van(), &PackingConfig::default()).unwrap());
        assert_ne!(base, cache_key(&packages, &van(), &advisory).unwrap());
    }

    #[test]
    fn oldest_entry_is_evicted_first() {
        let cache = PackingCache::new(2);
        let config = PackingConfig::default();
        for edge in [10.0, 20.0, 30.0] {
            cache.get_or_pack(vec![cube("a", edge)], &van(), &config);
        }
        assert_eq!(cache.len(), 2);

        cache.get_or_pack(vec![cube("a", 30.0)], &van(), &config);
        assert_eq!(cache.stats(), (1, 3));
        cache.get_or_pack(vec![cube("a", 10.0)], &van(), &config);
        assert_eq!(cache.stats(), (1, 4));
    }

    #[test]
    fn zero_capacity_disables_caching() {
        let cache = PackingCache::new(0);
        let result = cache.get_or_pack(vec![cube("a", 10.0)], &van(), &PackingConfig::default());
        assert_eq!(result.packed.len(), 1);
        assert!(cache.is_empty());
        assert_eq!(cache.stats(), (0, 0));
    }

    #[test]
    fn threads_share_one_cache() {
        let cache = PackingCache::new(4);
        let config = PackingConfig::default();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    let result = cache.get_or_pack(vec![cube("a", 50.0)], &van(), &config);
                    assert_eq!(result.packed.len(), 1);
                });
            }
        });

        let (hits, misses) = cache.stats();
        assert_eq!(hits + misses, 4);
        assert!(misses >= 1);
        assert_eq!(cache.len(), 1);
    }
}
