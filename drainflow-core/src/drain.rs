// Drain engine - fixed-depth prefix tree over the cluster registry
//
// The engine owns the tree root, the registry, configuration, and the
// monotonic cluster counter. It implements:
// - Learning (tree descent, candidate scoring, create-or-merge)
// - Read-only matching with configurable fallback to a full bucket scan
// - Template merging and similarity scoring
// - Parameter extraction and a tree dump for diagnostics

use crate::cluster::LogCluster;
use crate::registry::ClusterRegistry;
use crate::tokenize::tokenize;
use crate::tree::Node;
use crate::{DrainError, DrainResult};
use std::fmt::{self, Write as _};
use std::num::NonZeroUsize;
use tracing::{debug, trace};

/// Configuration for the Drain engine
#[derive(Debug, Clone)]
pub struct DrainConfig {
    /// Total tree depth accounting; must be at least 3
    pub log_cluster_depth: usize,

    /// Similarity threshold for learn-time matching
    pub sim_th: f64,

    /// Maximum children per tree node; the last slot is always reserved
    /// for the wildcard child so a full node stays open to novel tokens
    pub max_children: usize,

    /// Cluster registry capacity; least recently used clusters are
    /// evicted beyond it
    pub max_clusters: usize,

    /// Substrings rewritten to spaces before token splitting
    pub extra_delimiters: Vec<String>,

    /// Wildcard marker token; must not arise from normal tokenization
    pub param_str: String,

    /// Route digit-bearing tokens through the wildcard edge
    pub parametrize_numeric_tokens: bool,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            log_cluster_depth: 4,
            sim_th: 0.4,
            max_children: 100,
            max_clusters: 1000,
            extra_delimiters: Vec::new(),
            param_str: "<*>".to_string(),
            parametrize_numeric_tokens: true,
        }
    }
}

/// Outcome of feeding one message to [`Drain::add_log_message`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterUpdate {
    /// Matched an existing cluster without changing its template
    None,

    /// A new cluster was created for the message
    Created,

    /// The matched cluster's template was generalized in place
    TemplateChanged,
}

/// When [`Drain::match_log_message`] scans all clusters of a token count
/// instead of (or after) descending the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStrategy {
    /// Tree search only; fastest, may produce false negatives on
    /// saturated branches
    Never,

    /// Tree search first, full bucket scan on a miss
    Fallback,

    /// Full bucket scan only; always selects the best cluster
    Always,
}

/// Online Drain template mining engine
#[derive(Debug)]
pub struct Drain {
    pub(crate) config: DrainConfig,

    /// Depth of the tree below a token-count bucket: `log_cluster_depth - 2`
    pub(crate) max_node_depth: usize,

    pub(crate) root: Node,

    pub(crate) registry: ClusterRegistry,

    /// Monotonic id source; never decremented, even across evictions
    pub(crate) clusters_counter: u64,
}

impl Drain {
    /// Create an engine, validating the configuration
    pub fn new(config: DrainConfig) -> DrainResult<Self> {
        if config.log_cluster_depth < 3 {
            return Err(DrainError::Config(format!(
                "log_cluster_depth must be at least 3, got {}",
                config.log_cluster_depth
            )));
        }

        let capacity = NonZeroUsize::new(config.max_clusters)
            .ok_or_else(|| DrainError::Config("max_clusters must be greater than zero".to_string()))?;

        Ok(Self {
            max_node_depth: config.log_cluster_depth - 2,
            root: Node::default(),
            registry: ClusterRegistry::new(capacity),
            clusters_counter: 0,
            config,
        })
    }

    pub fn config(&self) -> &DrainConfig {
        &self.config
    }

    /// Learn from one log message.
    ///
    /// Returns the cluster the message was absorbed into (or seeded) and
    /// what changed about it.
    pub fn add_log_message(&mut self, content: &str) -> DrainResult<(LogCluster, ClusterUpdate)> {
        let tokens = tokenize(content, &self.config.extra_delimiters);

        let matched = match self.tree_search(&tokens, self.config.sim_th, false)? {
            Some(cluster) => Some((
                cluster.cluster_id,
                merge_template(&tokens, &cluster.template, &self.config.param_str)?,
            )),
            None => None,
        };

        match matched {
            None => {
                self.clusters_counter += 1;
                let cluster_id = self.clusters_counter;
                let cluster = LogCluster::new(cluster_id, tokens);
                debug!(cluster_id, template = %cluster.template(), "created cluster");
                self.registry.insert(cluster_id, cluster.clone());
                self.add_seq_to_prefix_tree(cluster_id, &cluster.template);
                Ok((cluster, ClusterUpdate::Created))
            }
            Some((cluster_id, merged)) => {
                let Some(cluster) = self.registry.get_mut(cluster_id) else {
                    // tree_search resolved this id under the same borrow;
                    // it cannot have been evicted in between
                    return Err(DrainError::Config(format!(
                        "cluster {cluster_id} disappeared from the registry"
                    )));
                };

                let changed = merged != cluster.template;
                if changed {
                    cluster.template = merged;
                }
                cluster.size += 1;

                let update = if changed {
                    debug!(cluster_id, template = %cluster.template(), "template generalized");
                    ClusterUpdate::TemplateChanged
                } else {
                    trace!(cluster_id, size = cluster.size, "message absorbed");
                    ClusterUpdate::None
                };
                Ok((cluster.clone(), update))
            }
        }
    }

    /// Match a message against existing clusters without learning.
    ///
    /// The match must be perfect: required similarity is 1.0 and wildcard
    /// positions count toward it. Never creates clusters or modifies
    /// templates; the resolved cluster is LRU-touched.
    pub fn match_log_message(
        &mut self,
        content: &str,
        strategy: SearchStrategy,
    ) -> DrainResult<Option<LogCluster>> {
        const REQUIRED_SIM_TH: f64 = 1.0;
        let tokens = tokenize(content, &self.config.extra_delimiters);

        let resolved = match strategy {
            SearchStrategy::Always => self.full_search(&tokens, REQUIRED_SIM_TH)?,
            SearchStrategy::Never | SearchStrategy::Fallback => {
                let found = self
                    .tree_search(&tokens, REQUIRED_SIM_TH, true)?
                    .map(|cluster| cluster.cluster_id);
                match (found, strategy) {
                    (Some(cluster_id), _) => Some(cluster_id),
                    (None, SearchStrategy::Fallback) => {
                        self.full_search(&tokens, REQUIRED_SIM_TH)?
                    }
                    (None, _) => None,
                }
            }
        };

        Ok(resolved.and_then(|cluster_id| self.registry.touch(cluster_id).cloned()))
    }

    /// Snapshot list of all live clusters, least recently used first
    pub fn clusters(&self) -> Vec<&LogCluster> {
        self.registry.iter_lru_first().collect()
    }

    /// Token values that fall onto the template's wildcard positions.
    ///
    /// Both strings are split with the engine's tokenizer. Returns `None`
    /// when the token counts differ (the template cannot have produced
    /// the message), and an empty list for a template without wildcards.
    pub fn extract_parameters(&self, template: &str, content: &str) -> Option<Vec<String>> {
        let template_tokens = tokenize(template, &self.config.extra_delimiters);
        let content_tokens = tokenize(content, &self.config.extra_delimiters);
        if template_tokens.len() != content_tokens.len() {
            return None;
        }

        Some(
            template_tokens
                .into_iter()
                .zip(content_tokens)
                .filter(|(template_token, _)| *template_token == self.config.param_str)
                .map(|(_, token)| token)
                .collect(),
        )
    }

    /// Dump the prefix tree to stdout (diagnostic)
    pub fn print_tree(&self, max_clusters_per_leaf: usize) {
        print!("{}", self.tree_to_string(max_clusters_per_leaf));
    }

    /// Render the prefix tree, with up to `max_clusters_per_leaf`
    /// resolved clusters shown under each leaf
    pub fn tree_to_string(&self, max_clusters_per_leaf: usize) -> String {
        let mut out = String::new();
        // formatting into a String cannot fail
        let _ = self.write_node(&mut out, "root", &self.root, 0, max_clusters_per_leaf);
        out
    }

    /// Find the best-matching cluster by descending the tree and scoring
    /// the candidate list at the reached leaf
    fn tree_search(
        &self,
        tokens: &[String],
        sim_th: f64,
        include_params: bool,
    ) -> DrainResult<Option<&LogCluster>> {
        let token_count = tokens.len();

        // at the first level, children are grouped by token count
        let Some(mut node) = self.root.children.get(token_count.to_string().as_str()) else {
            return Ok(None);
        };

        // empty log string: the bucket holds at most one cluster
        if token_count == 0 {
            return Ok(node
                .cluster_ids
                .first()
                .and_then(|cluster_id| self.registry.peek(*cluster_id)));
        }

        let mut depth = 1usize;
        for token in tokens {
            if depth >= self.max_node_depth || depth == token_count {
                break;
            }
            node = match node
                .children
                .get(token.as_str())
                .or_else(|| node.children.get(self.config.param_str.as_str()))
            {
                Some(child) => child,
                None => return Ok(None),
            };
            depth += 1;
        }

        self.fast_match(&node.cluster_ids, tokens, sim_th, include_params)
    }

    /// Score candidate clusters against the message tokens.
    ///
    /// Candidates resolve through `peek`: mere candidacy is not a use, so
    /// a frequently-failing candidate list cannot keep clusters alive.
    /// Stale ids of evicted clusters are skipped.
    fn fast_match(
        &self,
        cluster_ids: &[u64],
        tokens: &[String],
        sim_th: f64,
        include_params: bool,
    ) -> DrainResult<Option<&LogCluster>> {
        let mut best: Option<&LogCluster> = None;
        let mut best_sim = -1.0_f64;
        let mut best_param_count = -1_i64;

        for &cluster_id in cluster_ids {
            let Some(cluster) = self.registry.peek(cluster_id) else {
                continue;
            };

            let (sim, param_count) =
                seq_distance(&cluster.template, tokens, include_params, &self.config.param_str)?;

            // ties go to the template with more wildcards (more general)
            if sim > best_sim || (sim == best_sim && param_count as i64 > best_param_count) {
                best_sim = sim;
                best_param_count = param_count as i64;
                best = Some(cluster);
            }
        }

        Ok(if best_sim >= sim_th { best } else { None })
    }

    /// Scan every cluster reachable from the token-count bucket
    fn full_search(&self, tokens: &[String], sim_th: f64) -> DrainResult<Option<u64>> {
        let cluster_ids = self.cluster_ids_for_token_count(tokens.len());
        Ok(self
            .fast_match(&cluster_ids, tokens, sim_th, true)?
            .map(|cluster| cluster.cluster_id))
    }

    /// Depth-first collection of all cluster ids under a bucket, the
    /// bucket node included
    fn cluster_ids_for_token_count(&self, token_count: usize) -> Vec<u64> {
        fn collect(node: &Node, cluster_ids: &mut Vec<u64>) {
            cluster_ids.extend_from_slice(&node.cluster_ids);
            for child in node.children.values() {
                collect(child, cluster_ids);
            }
        }

        let mut cluster_ids = Vec::new();
        if let Some(bucket) = self.root.children.get(token_count.to_string().as_str()) {
            collect(bucket, &mut cluster_ids);
        }
        cluster_ids
    }

    /// Graft a freshly created cluster into the tree: ensure a path
    /// consistent with its template exists and record the id at the leaf
    fn add_seq_to_prefix_tree(&mut self, cluster_id: u64, template: &[String]) {
        let token_count = template.len();
        let max_node_depth = self.max_node_depth;
        let max_children = self.config.max_children;
        let parametrize_numeric = self.config.parametrize_numeric_tokens;
        let param_str = self.config.param_str.clone();

        let registry = &self.registry;
        let mut node = self
            .root
            .children
            .entry(token_count.to_string())
            .or_default();

        if token_count == 0 {
            node.cluster_ids = vec![cluster_id];
            return;
        }

        let mut depth = 1usize;
        loop {
            // at max depth, or the template is exhausted: this is the leaf
            if depth >= max_node_depth || depth >= token_count {
                node.cluster_ids.retain(|id| registry.contains(*id));
                node.cluster_ids.push(cluster_id);
                return;
            }

            let token = template[depth - 1].as_str();
            let edge = if node.children.contains_key(token) {
                token
            } else if parametrize_numeric && has_numbers(token) {
                param_str.as_str()
            } else if node.children.contains_key(param_str.as_str()) {
                if node.children.len() < max_children {
                    token
                } else {
                    param_str.as_str()
                }
            } else if node.children.len() + 1 < max_children {
                token
            } else {
                // children + 1 == max_children opens the wildcard child;
                // the last slot of a node always belongs to the wildcard
                param_str.as_str()
            };

            node = node.children.entry(edge.to_string()).or_default();
            depth += 1;
        }
    }

    fn write_node(
        &self,
        out: &mut String,
        token: &str,
        node: &Node,
        depth: usize,
        max_clusters_per_leaf: usize,
    ) -> fmt::Result {
        for _ in 0..depth {
            out.push('\t');
        }
        match depth {
            0 => write!(out, "<{token}>")?,
            1 => write!(out, "<L={token}>")?,
            _ => write!(out, "\"{token}\"")?,
        }
        if !node.cluster_ids.is_empty() {
            write!(out, " (cluster_count={})", node.cluster_ids.len())?;
        }
        out.push('\n');

        for (child_token, child) in &node.children {
            self.write_node(out, child_token, child, depth + 1, max_clusters_per_leaf)?;
        }

        for cluster_id in node.cluster_ids.iter().take(max_clusters_per_leaf) {
            if let Some(cluster) = self.registry.peek(*cluster_id) {
                for _ in 0..=depth {
                    out.push('\t');
                }
                writeln!(out, "{cluster}")?;
            }
        }
        Ok(())
    }
}

/// Similarity between a template and a message of equal token count.
///
/// Wildcard positions in the template count as parameters, not hits,
/// unless `include_params` is set. Empty sequences are a full match.
/// Returns the similarity ratio and the parameter count.
fn seq_distance(
    template: &[String],
    tokens: &[String],
    include_params: bool,
    param_str: &str,
) -> DrainResult<(f64, usize)> {
    if template.len() != tokens.len() {
        return Err(DrainError::LengthMismatch {
            template_len: template.len(),
            tokens_len: tokens.len(),
        });
    }
    if template.is_empty() {
        return Ok((1.0, 0));
    }

    let mut sim_tokens = 0usize;
    let mut param_count = 0usize;
    for (template_token, token) in template.iter().zip(tokens) {
        if template_token == param_str {
            param_count += 1;
            continue;
        }
        if template_token == token {
            sim_tokens += 1;
        }
    }
    if include_params {
        sim_tokens += param_count;
    }

    Ok((sim_tokens as f64 / template.len() as f64, param_count))
}

/// Merge a message into a template: keep positions where they agree,
/// generalize the rest. Wildcards already in the template are absorbing.
fn merge_template(
    tokens: &[String],
    template: &[String],
    param_str: &str,
) -> DrainResult<Vec<String>> {
    if tokens.len() != template.len() {
        return Err(DrainError::LengthMismatch {
            template_len: template.len(),
            tokens_len: tokens.len(),
        });
    }

    Ok(template
        .iter()
        .zip(tokens)
        .map(|(template_token, token)| {
            if template_token == token {
                template_token.clone()
            } else {
                param_str.to_string()
            }
        })
        .collect())
}

/// A token containing any decimal digit is treated as numeric, which
/// covers mixed tokens like `4339285360.log.deleted`
fn has_numbers(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_digit())
}
