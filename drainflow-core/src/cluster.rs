// Cluster record - a learned template and its occurrence count

use serde::{Deserialize, Serialize};
use std::fmt;

/// A log cluster: one learned template plus bookkeeping.
///
/// `cluster_id` and the template length are fixed at creation. Individual
/// template positions may transition from a concrete token to the wildcard
/// marker; the wildcard is absorbing and never reverts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogCluster {
    pub(crate) cluster_id: u64,
    pub(crate) template: Vec<String>,
    pub(crate) size: u64,
}

impl LogCluster {
    pub(crate) fn new(cluster_id: u64, template: Vec<String>) -> Self {
        Self {
            cluster_id,
            template,
            size: 1,
        }
    }

    /// Unique, monotonically assigned identifier
    pub fn cluster_id(&self) -> u64 {
        self.cluster_id
    }

    /// Number of messages this cluster has absorbed
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Template tokens, wildcard positions included
    pub fn template_tokens(&self) -> &[String] {
        &self.template
    }

    /// Template as a single space-joined string
    pub fn template(&self) -> String {
        self.template.join(" ")
    }
}

impl fmt::Display for LogCluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ID={:<5} : size={:<10}: {}",
            self.cluster_id,
            self.size,
            self.template()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_new_cluster_starts_at_size_one() {
        let cluster = LogCluster::new(7, tokens(&["connected", "to", "<*>"]));
        assert_eq!(cluster.cluster_id(), 7);
        assert_eq!(cluster.size(), 1);
        assert_eq!(cluster.template(), "connected to <*>");
    }

    #[test]
    fn test_display_format() {
        let cluster = LogCluster::new(3, tokens(&["a", "<*>"]));
        let rendered = cluster.to_string();
        assert!(rendered.starts_with("ID=3"));
        assert!(rendered.contains("size=1"));
        assert!(rendered.ends_with("a <*>"));
    }
}
