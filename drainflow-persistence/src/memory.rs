// In-memory persistence

use crate::{PersistenceHandler, PersistenceResult};
use async_trait::async_trait;
use parking_lot::Mutex;

/// Keeps the last saved snapshot in memory.
///
/// Useful for tests and for embedders that schedule storage themselves.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    state: Mutex<Option<Vec<u8>>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistenceHandler for MemoryPersistence {
    async fn save(&self, state: &[u8]) -> PersistenceResult<()> {
        *self.state.lock() = Some(state.to_vec());
        Ok(())
    }

    async fn load(&self) -> PersistenceResult<Option<Vec<u8>>> {
        Ok(self.state.lock().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_before_save_is_empty() {
        let persistence = MemoryPersistence::new();
        assert!(persistence.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_replaces_previous_state() {
        let persistence = MemoryPersistence::new();
        persistence.save(b"first").await.unwrap();
        persistence.save(b"second").await.unwrap();

        assert_eq!(persistence.load().await.unwrap().as_deref(), Some(&b"second"[..]));
    }
}
