// Prefix-tree node
//
// The root's children are keyed by the decimal string form of the token
// count; below that, edges are token literals or the wildcard marker.
// Cluster ids live only at leaves and are weak references: they resolve
// through the registry and may point at evicted clusters until lazily
// purged during grafting.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// One node of the fixed-depth prefix tree
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Node {
    pub(crate) children: AHashMap<String, Node>,
    pub(crate) cluster_ids: Vec<u64>,
}
