// Drainflow Miner - mining facade with snapshot autosave
//
// Wires a Drain engine to an optional persistence handler: restores
// engine state on startup, mines lines, and saves a snapshot every
// `snapshot_interval` messages. The engine itself stays synchronous;
// only the persistence boundary is async.

use drainflow_core::{ClusterUpdate, Drain, DrainConfig, DrainError, LogCluster, SearchStrategy};
use drainflow_persistence::{PersistenceError, PersistenceHandler};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur while mining
#[derive(Debug, Error)]
pub enum MinerError {
    #[error(transparent)]
    Drain(#[from] DrainError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Result type for miner operations
pub type MinerResult<T> = Result<T, MinerError>;

/// Configuration for the template miner
#[derive(Debug, Clone)]
pub struct MinerConfig {
    /// Engine configuration
    pub drain: DrainConfig,

    /// Autosave a snapshot every this many mined messages; 0 disables
    /// autosave (explicit `save_state` still works)
    pub snapshot_interval: u64,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            drain: DrainConfig::default(),
            snapshot_interval: 10,
        }
    }
}

/// Result of mining a single log line
#[derive(Debug, Clone)]
pub struct MinedLine {
    pub cluster_id: u64,
    pub template: String,
    pub update: ClusterUpdate,
    pub size: u64,
}

/// Template mining facade over a [`Drain`] engine
pub struct TemplateMiner {
    drain: Drain,
    persistence: Option<Arc<dyn PersistenceHandler>>,
    snapshot_interval: u64,
    messages_since_save: u64,
}

impl TemplateMiner {
    /// Create a miner without persistence
    pub fn new(config: MinerConfig) -> MinerResult<Self> {
        Ok(Self {
            drain: Drain::new(config.drain)?,
            persistence: None,
            snapshot_interval: config.snapshot_interval,
            messages_since_save: 0,
        })
    }

    /// Create a miner that saves snapshots through the given handler
    pub fn with_persistence(
        config: MinerConfig,
        handler: Arc<dyn PersistenceHandler>,
    ) -> MinerResult<Self> {
        Ok(Self {
            drain: Drain::new(config.drain)?,
            persistence: Some(handler),
            snapshot_interval: config.snapshot_interval,
            messages_since_save: 0,
        })
    }

    /// Restore engine state from the persistence handler.
    ///
    /// Returns `false` when no handler is configured or no snapshot has
    /// been saved yet; the miner then keeps its freshly created engine.
    pub async fn load_state(&mut self) -> MinerResult<bool> {
        let Some(handler) = &self.persistence else {
            return Ok(false);
        };
        let Some(bytes) = handler.load().await? else {
            debug!("no snapshot to restore");
            return Ok(false);
        };

        self.drain = Drain::restore(&bytes)?;
        info!(clusters = self.drain.clusters().len(), "engine state restored");
        Ok(true)
    }

    /// Snapshot the engine through the persistence handler, if any
    pub async fn save_state(&mut self) -> MinerResult<()> {
        let Some(handler) = &self.persistence else {
            return Ok(());
        };

        let bytes = self.drain.snapshot()?;
        handler.save(&bytes).await?;
        self.messages_since_save = 0;
        debug!(bytes = bytes.len(), "snapshot saved");
        Ok(())
    }

    /// Mine one log line, autosaving when the interval elapses
    pub async fn add_log_message(&mut self, content: &str) -> MinerResult<MinedLine> {
        let (cluster, update) = self.drain.add_log_message(content)?;
        self.messages_since_save += 1;

        if self.persistence.is_some()
            && self.snapshot_interval > 0
            && self.messages_since_save >= self.snapshot_interval
        {
            self.save_state().await?;
        }

        Ok(MinedLine {
            cluster_id: cluster.cluster_id(),
            template: cluster.template(),
            update,
            size: cluster.size(),
        })
    }

    /// Match a line against learned templates without learning from it
    pub fn match_log_message(
        &mut self,
        content: &str,
        strategy: SearchStrategy,
    ) -> MinerResult<Option<LogCluster>> {
        Ok(self.drain.match_log_message(content, strategy)?)
    }

    /// Token values on the template's wildcard positions
    pub fn extract_parameters(&self, template: &str, content: &str) -> Option<Vec<String>> {
        self.drain.extract_parameters(template, content)
    }

    /// Snapshot list of all live clusters
    pub fn clusters(&self) -> Vec<&LogCluster> {
        self.drain.clusters()
    }

    /// The wrapped engine, for diagnostics such as
    /// [`Drain::print_tree`]
    pub fn drain(&self) -> &Drain {
        &self.drain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drainflow_persistence::MemoryPersistence;

    fn miner_with(handler: Arc<dyn PersistenceHandler>, snapshot_interval: u64) -> TemplateMiner {
        TemplateMiner::with_persistence(
            MinerConfig {
                snapshot_interval,
                ..MinerConfig::default()
            },
            handler,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_mined_line_reports_template_and_update() {
        let mut miner = TemplateMiner::new(MinerConfig::default()).unwrap();

        let mined = miner.add_log_message("job 12 finished").await.unwrap();
        assert_eq!(mined.update, ClusterUpdate::Created);
        assert_eq!(mined.template, "job 12 finished");

        let mined = miner.add_log_message("job 57 finished").await.unwrap();
        assert_eq!(mined.update, ClusterUpdate::TemplateChanged);
        assert_eq!(mined.template, "job <*> finished");
        assert_eq!(mined.size, 2);

        let params = miner
            .extract_parameters(&mined.template, "job 57 finished")
            .unwrap();
        assert_eq!(params, vec!["57"]);
    }

    #[tokio::test]
    async fn test_autosave_honors_interval() {
        let handler = Arc::new(MemoryPersistence::new());
        let mut miner = miner_with(handler.clone(), 3);

        miner.add_log_message("first event").await.unwrap();
        miner.add_log_message("second event").await.unwrap();
        assert!(handler.load().await.unwrap().is_none());

        miner.add_log_message("third event").await.unwrap();
        assert!(handler.load().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_zero_interval_disables_autosave() {
        let handler = Arc::new(MemoryPersistence::new());
        let mut miner = miner_with(handler.clone(), 0);

        for i in 0..20 {
            miner.add_log_message(&format!("event number {i}")).await.unwrap();
        }
        assert!(handler.load().await.unwrap().is_none());

        miner.save_state().await.unwrap();
        assert!(handler.load().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_state_round_trips_through_persistence() {
        let handler = Arc::new(MemoryPersistence::new());

        let mut miner = miner_with(handler.clone(), 0);
        miner.add_log_message("worker 3 spawned").await.unwrap();
        miner.add_log_message("worker 9 spawned").await.unwrap();
        miner.save_state().await.unwrap();

        let mut revived = miner_with(handler, 0);
        assert!(revived.load_state().await.unwrap());

        let clusters = revived.clusters();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].template(), "worker <*> spawned");
        assert_eq!(clusters[0].size(), 2);

        let matched = revived
            .match_log_message("worker 4 spawned", SearchStrategy::Never)
            .unwrap();
        assert!(matched.is_some());
    }

    #[tokio::test]
    async fn test_load_state_without_handler_is_a_no_op() {
        let mut miner = TemplateMiner::new(MinerConfig::default()).unwrap();
        assert!(!miner.load_state().await.unwrap());

        // saving without a handler is also fine
        miner.save_state().await.unwrap();
    }
}
