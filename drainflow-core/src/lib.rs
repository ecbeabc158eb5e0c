// Drainflow Core - Online log template mining engine
//
// This crate implements the Drain algorithm: a fixed-depth prefix tree
// keyed by token count and token literals (with a wildcard edge), layered
// over a bounded cluster registry with LRU eviction. It handles:
// - Incremental template learning with in-place generalization
// - Read-only matching (tree search, full-scan fallback)
// - Parameter extraction against learned templates
// - Whole-state snapshot encode/restore for persistence collaborators

mod cluster;
mod drain;
mod registry;
mod snapshot;
mod tokenize;
mod tree;

pub use cluster::LogCluster;
pub use drain::{ClusterUpdate, Drain, DrainConfig, SearchStrategy};
pub use tokenize::tokenize;

use thiserror::Error;

/// Errors that can occur in the Drain engine
#[derive(Debug, Error)]
pub enum DrainError {
    /// Rejected configuration, or malformed snapshot input on restore
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Similarity or merge over sequences of unequal length.
    /// Internal invariant failure; the current operation is aborted
    /// without mutating engine state.
    #[error("template length {template_len} does not match token count {tokens_len}")]
    LengthMismatch {
        template_len: usize,
        tokens_len: usize,
    },
}

/// Result type for Drain operations
pub type DrainResult<T> = Result<T, DrainError>;
