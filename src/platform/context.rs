//! Shared service context
//!
//! Everything the relay components need (config, cache, collaborators, and
//! the worker pool) lives in one explicitly constructed context passed by
//! reference, so tests build a fresh context instead of sharing process-wide
//! state.

use std::sync::{Arc, Mutex, PoisonError};

use crate::config::{RelayConfig, Settings};
use crate::core::recent_ids::RecentIdCache;
use crate::core::worker_pool::SharedWorkerPool;
use crate::error::Result;

use super::traits::{ChatSender, ConfigStore, PollCreator, PronounDirectory, Transport};

pub struct BotContext {
    pub config: Arc<RelayConfig>,
    pub recent_ids: Arc<RecentIdCache>,
    pub sender: Arc<dyn ChatSender>,
    pub transport: Arc<dyn Transport>,
    pub polls: Arc<dyn PollCreator>,
    pub pronouns: Arc<dyn PronounDirectory>,
    pub config_store: Arc<dyn ConfigStore>,
    pub pool: SharedWorkerPool,
    /// Last-loaded persisted image; mutable flags are merged in on save.
    settings: Mutex<Settings>,
}

impl BotContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: Settings,
        recent_ids: Arc<RecentIdCache>,
        sender: Arc<dyn ChatSender>,
        transport: Arc<dyn Transport>,
        polls: Arc<dyn PollCreator>,
        pronouns: Arc<dyn PronounDirectory>,
        config_store: Arc<dyn ConfigStore>,
        pool: SharedWorkerPool,
    ) -> Self {
        Self {
            config: Arc::new(RelayConfig::from_settings(&settings)),
            recent_ids,
            sender,
            transport,
            polls,
            pronouns,
            config_store,
            pool,
            settings: Mutex::new(settings),
        }
    }

    /// Merge the current runtime config into the persisted image and write it
    /// through the config store.
    pub async fn save_config(&self) -> Result<()> {
        let snapshot = {
            let mut settings = self
                .settings
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            self.config.apply_to(&mut settings);
            settings.clone()
        };
        self.config_store.persist(&snapshot).await
    }
}
