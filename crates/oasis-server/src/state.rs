//! Shared server state

use crate::config::{Config, StorageConfig};
use crate::error::Result;
use crate::rate_limit::{RateLimitConfig, RateLimiter};
use crate::router::Router;
use oasis_core::{Catalog, CityEngine, Clock, MemoryRepository, Repository, SystemClock};
use oasis_db::Store;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// The engine as the server runs it: any repository, any clock
pub type Engine = CityEngine<Box<dyn Repository>, Arc<dyn Clock>>;

/// State shared by every connection
pub struct AppState {
    pub engine: Arc<Engine>,
    pub router: Router,
    pub limiter: Option<RateLimiter>,
}

impl AppState {
    pub fn new(engine: Engine, rate_limit: Option<RateLimitConfig>) -> Result<Self> {
        Ok(Self {
            engine: Arc::new(engine),
            router: Router::new()?,
            limiter: rate_limit.map(RateLimiter::new),
        })
    }

    /// Open storage, load the catalog and build the engine
    pub fn from_config(config: &Config) -> Result<Self> {
        let repo: Box<dyn Repository> = match &config.storage {
            StorageConfig::Memory => {
                info!("using in-memory storage");
                Box::new(MemoryRepository::new())
            }
            StorageConfig::File(path) => Box::new(Store::open(path)?),
        };
        let catalog = match &config.catalog {
            Some(path) => {
                let catalog = Catalog::load(path)?;
                info!(path = %path.display(), entries = catalog.len(), "catalog loaded");
                catalog
            }
            None => Catalog::default(),
        };
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let engine = CityEngine::with_config(repo, clock, catalog, config.engine.clone())?;
        Self::new(engine, config.rate_limit)
    }

    /// Periodically drop idle profile locks and rate-limit buckets
    pub fn start_maintenance(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let state = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let locks = state.engine.locks().prune();
                let buckets = match &state.limiter {
                    Some(limiter) => limiter.cleanup().await,
                    None => 0,
                };
                debug!(locks, buckets, "maintenance pass");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_with_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            storage: StorageConfig::File(dir.path().join("oasis.db")),
            rate_limit: Some(RateLimitConfig {
                requests: 5,
                per_secs: 1,
            }),
            ..Config::default()
        };
        let state = AppState::from_config(&config).unwrap();
        assert!(state.limiter.is_some());
        assert_eq!(state.engine.catalog().len(), Catalog::builtin().len());
        assert!(dir.path().join("oasis.db").exists());
    }

    #[test]
    fn test_from_config_rejects_bad_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.ron");
        std::fs::write(&path, "(buildings: [oops])").unwrap();
        let config = Config {
            catalog: Some(path),
            ..Config::default()
        };
        assert!(AppState::from_config(&config).is_err());
    }
}
