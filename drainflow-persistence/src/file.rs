// Single-file persistence

use crate::{PersistenceHandler, PersistenceResult};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Persists the snapshot to one file; each save overwrites it
#[derive(Debug, Clone)]
pub struct FilePersistence {
    path: PathBuf,
}

impl FilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PersistenceHandler for FilePersistence {
    async fn save(&self, state: &[u8]) -> PersistenceResult<()> {
        fs::write(&self.path, state).await?;
        debug!(path = %self.path.display(), bytes = state.len(), "snapshot saved");
        Ok(())
    }

    async fn load(&self) -> PersistenceResult<Option<Vec<u8>>> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = FilePersistence::new(dir.path().join("missing.json"));

        assert!(persistence.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = FilePersistence::new(dir.path().join("state.json"));

        persistence.save(b"{\"clusters\":[]}").await.unwrap();
        let loaded = persistence.load().await.unwrap().unwrap();
        assert_eq!(loaded, b"{\"clusters\":[]}");
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = FilePersistence::new(dir.path().join("state.json"));

        persistence.save(b"old").await.unwrap();
        persistence.save(b"new").await.unwrap();
        assert_eq!(persistence.load().await.unwrap().unwrap(), b"new");
    }
}
