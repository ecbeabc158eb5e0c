// Cluster registry - bounded id-to-cluster store with LRU eviction
//
// Candidate scoring resolves through `peek` so that mere candidacy never
// counts as a use; only confirmed hits and inserts touch the LRU order.

use crate::cluster::LogCluster;
use lru::LruCache;
use std::num::NonZeroUsize;

/// Bounded associative store from cluster id to cluster record
#[derive(Debug)]
pub(crate) struct ClusterRegistry {
    cache: LruCache<u64, LogCluster>,
}

impl ClusterRegistry {
    pub(crate) fn new(capacity: NonZeroUsize) -> Self {
        Self {
            cache: LruCache::new(capacity),
        }
    }

    /// Resolve without touching the LRU order
    pub(crate) fn peek(&self, cluster_id: u64) -> Option<&LogCluster> {
        self.cache.peek(&cluster_id)
    }

    /// Resolve and mark as most recently used
    pub(crate) fn touch(&mut self, cluster_id: u64) -> Option<&LogCluster> {
        self.cache.get(&cluster_id)
    }

    /// Mutable resolve; marks as most recently used
    pub(crate) fn get_mut(&mut self, cluster_id: u64) -> Option<&mut LogCluster> {
        self.cache.get_mut(&cluster_id)
    }

    /// Insert a cluster, evicting the least recently used one when full
    pub(crate) fn insert(&mut self, cluster_id: u64, cluster: LogCluster) {
        self.cache.put(cluster_id, cluster);
    }

    pub(crate) fn contains(&self, cluster_id: u64) -> bool {
        self.cache.contains(&cluster_id)
    }

    pub(crate) fn len(&self) -> usize {
        self.cache.len()
    }

    /// Iterate clusters from least to most recently used.
    ///
    /// This is the snapshot order: restoring by re-inserting in iteration
    /// order reproduces the LRU ordering exactly.
    pub(crate) fn iter_lru_first(&self) -> impl Iterator<Item = &LogCluster> + '_ {
        self.cache.iter().rev().map(|(_, cluster)| cluster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(cluster_id: u64) -> LogCluster {
        LogCluster::new(cluster_id, vec![format!("token-{cluster_id}")])
    }

    fn registry(capacity: usize) -> ClusterRegistry {
        ClusterRegistry::new(NonZeroUsize::new(capacity).unwrap())
    }

    #[test]
    fn test_insert_evicts_least_recently_used() {
        let mut registry = registry(2);
        registry.insert(1, cluster(1));
        registry.insert(2, cluster(2));
        registry.insert(3, cluster(3));

        assert_eq!(registry.len(), 2);
        assert!(!registry.contains(1));
        assert!(registry.contains(2));
        assert!(registry.contains(3));
    }

    #[test]
    fn test_peek_does_not_touch() {
        let mut registry = registry(2);
        registry.insert(1, cluster(1));
        registry.insert(2, cluster(2));

        // peeking 1 must not promote it; the next insert still evicts it
        assert!(registry.peek(1).is_some());
        registry.insert(3, cluster(3));
        assert!(!registry.contains(1));
        assert!(registry.contains(2));
    }

    #[test]
    fn test_touch_promotes() {
        let mut registry = registry(2);
        registry.insert(1, cluster(1));
        registry.insert(2, cluster(2));

        assert!(registry.touch(1).is_some());
        registry.insert(3, cluster(3));
        assert!(registry.contains(1));
        assert!(!registry.contains(2));
    }

    #[test]
    fn test_iter_lru_first_order() {
        let mut registry = registry(3);
        registry.insert(1, cluster(1));
        registry.insert(2, cluster(2));
        registry.insert(3, cluster(3));
        registry.touch(1);

        let ids: Vec<u64> = registry.iter_lru_first().map(|c| c.cluster_id()).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }
}
