// Drainflow Persistence - snapshot back-ends
//
// The engine serializes its whole state as an opaque byte sequence; a
// persistence handler stores and retrieves those bytes. Handlers never
// interpret the bytes and impose no snapshot schedule.

mod file;
mod memory;

pub use file::FilePersistence;
pub use memory::MemoryPersistence;

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by persistence back-ends
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Underlying storage I/O failure
    #[error("persistence i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Back-end specific failure
    #[error("persistence backend error: {0}")]
    Backend(String),
}

/// Result type for persistence operations
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Stores and retrieves opaque engine snapshots
#[async_trait]
pub trait PersistenceHandler: Send + Sync {
    /// Persist a snapshot, replacing any previous one
    async fn save(&self, state: &[u8]) -> PersistenceResult<()>;

    /// Load the last saved snapshot, or `None` when nothing was saved yet
    async fn load(&self) -> PersistenceResult<Option<Vec<u8>>>;
}
