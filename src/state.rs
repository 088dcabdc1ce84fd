use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::engine::QueryEngine;
use crate::repo::Repositories;

/// Shared handles for every request handler
#[derive(Clone)]
pub struct AppState {
    pub cfg: Config,
    pub engine: Arc<QueryEngine>,
    pub repos: Arc<Repositories>,
}

impl AppState {
    pub async fn new(cfg: Config) -> Result<Self> {
        let repos = Repositories::new(&cfg).await?;
        info!(backend = ?cfg.store.backend, "store ready");
        Ok(Self::with_repositories(cfg, repos))
    }

    /// Wire the engine over already-built stores.
    pub fn with_repositories(cfg: Config, repos: Repositories) -> Self {
        Self {
            cfg,
            engine: Arc::new(QueryEngine::new(repos.clone())),
            repos: Arc::new(repos),
        }
    }
}
