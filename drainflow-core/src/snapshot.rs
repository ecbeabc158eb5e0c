// Snapshot codec - whole-state serialization
//
// Encodes configuration, counter, tree, and live clusters as one JSON
// document for the persistence collaborator. Field names are the stable
// schema; clusters serialize least recently used first so that restoring
// by re-insertion reproduces the LRU ordering exactly.

use crate::cluster::LogCluster;
use crate::drain::{Drain, DrainConfig};
use crate::tree::Node;
use crate::{DrainError, DrainResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
struct DrainSnapshot {
    log_cluster_depth: usize,
    max_node_depth: usize,
    sim_th: f64,
    max_children: usize,
    max_clusters: usize,
    extra_delimiters: Vec<String>,
    param_str: String,
    parametrize_numeric_tokens: bool,
    clusters_counter: u64,
    root_node: Node,
    clusters: Vec<LogCluster>,
}

impl Drain {
    /// Serialize the full engine state as an opaque byte sequence
    pub fn snapshot(&self) -> DrainResult<Vec<u8>> {
        let snapshot = DrainSnapshot {
            log_cluster_depth: self.config.log_cluster_depth,
            max_node_depth: self.max_node_depth,
            sim_th: self.config.sim_th,
            max_children: self.config.max_children,
            max_clusters: self.config.max_clusters,
            extra_delimiters: self.config.extra_delimiters.clone(),
            param_str: self.config.param_str.clone(),
            parametrize_numeric_tokens: self.config.parametrize_numeric_tokens,
            clusters_counter: self.clusters_counter,
            root_node: self.root.clone(),
            clusters: self.registry.iter_lru_first().cloned().collect(),
        };

        serde_json::to_vec(&snapshot)
            .map_err(|e| DrainError::Config(format!("failed to encode snapshot: {e}")))
    }

    /// Rebuild an engine from bytes produced by [`Drain::snapshot`].
    ///
    /// The configuration is re-validated; malformed input is rejected as
    /// a configuration error.
    pub fn restore(bytes: &[u8]) -> DrainResult<Self> {
        let snapshot: DrainSnapshot = serde_json::from_slice(bytes)
            .map_err(|e| DrainError::Config(format!("malformed snapshot: {e}")))?;

        let config = DrainConfig {
            log_cluster_depth: snapshot.log_cluster_depth,
            sim_th: snapshot.sim_th,
            max_children: snapshot.max_children,
            max_clusters: snapshot.max_clusters,
            extra_delimiters: snapshot.extra_delimiters,
            param_str: snapshot.param_str,
            parametrize_numeric_tokens: snapshot.parametrize_numeric_tokens,
        };

        let mut drain = Drain::new(config)?;
        drain.root = snapshot.root_node;
        drain.clusters_counter = snapshot.clusters_counter;
        for cluster in snapshot.clusters {
            drain.registry.insert(cluster.cluster_id(), cluster);
        }

        debug!(
            clusters = drain.registry.len(),
            clusters_counter = drain.clusters_counter,
            "engine restored from snapshot"
        );
        Ok(drain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restore_rejects_garbage() {
        let err = Drain::restore(b"not a snapshot").unwrap_err();
        assert!(matches!(err, DrainError::Config(_)));
    }

    #[test]
    fn test_restore_revalidates_configuration() {
        let mut drain = Drain::new(DrainConfig::default()).unwrap();
        drain.add_log_message("a b c").unwrap();
        let bytes = drain.snapshot().unwrap();

        let mut doc: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        doc["log_cluster_depth"] = serde_json::json!(2);
        let tampered = serde_json::to_vec(&doc).unwrap();

        let err = Drain::restore(&tampered).unwrap_err();
        assert!(matches!(err, DrainError::Config(_)));
    }

    #[test]
    fn test_snapshot_schema_fields() {
        let mut drain = Drain::new(DrainConfig::default()).unwrap();
        drain.add_log_message("session opened for user root").unwrap();
        let bytes = drain.snapshot().unwrap();

        let doc: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        for field in [
            "log_cluster_depth",
            "max_node_depth",
            "sim_th",
            "max_children",
            "max_clusters",
            "extra_delimiters",
            "param_str",
            "parametrize_numeric_tokens",
            "clusters_counter",
            "root_node",
            "clusters",
        ] {
            assert!(doc.get(field).is_some(), "missing field {field}");
        }

        let cluster = &doc["clusters"][0];
        assert_eq!(cluster["cluster_id"], 1);
        assert_eq!(cluster["size"], 1);
        assert!(cluster["template"].is_array());
        assert!(doc["root_node"]["children"]["5"].is_object());
    }
}
