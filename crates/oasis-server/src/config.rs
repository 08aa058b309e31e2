//! RON configuration for the server

use crate::error::{Result, ServerError};
use crate::rate_limit::RateLimitConfig;
use oasis_core::EngineConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Listen address (e.g. "127.0.0.1:5000")
    pub listen: String,
    pub storage: StorageConfig,
    /// RON catalog replacing the built-in building data
    pub catalog: Option<PathBuf>,
    /// New-player seeding and city layout
    pub engine: EngineConfig,
    /// Per-IP request limit; unlimited when absent
    pub rate_limit: Option<RateLimitConfig>,
    /// Default log filter; `RUST_LOG` takes precedence
    pub log_level: String,
    /// Runtime worker threads; one per CPU when absent
    pub workers: Option<usize>,
    /// Seconds between pruning idle profile locks and rate-limit buckets
    pub maintenance_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:5000".to_string(),
            storage: StorageConfig::default(),
            catalog: None,
            engine: EngineConfig::default(),
            rate_limit: None,
            log_level: "info".to_string(),
            workers: None,
            maintenance_interval_secs: 60,
        }
    }
}

/// Where profiles and buildings live
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub enum StorageConfig {
    /// Lost on restart
    #[default]
    Memory,
    /// native_db file at the given path
    File(PathBuf),
}

impl Config {
    /// Load and validate configuration from a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_ron_str(&content)
    }

    pub fn from_ron_str(content: &str) -> Result<Self> {
        let config: Config =
            ron::from_str(content).map_err(|e| ServerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen
            .parse()
            .map_err(|e| ServerError::Config(format!("listen address {:?}: {}", self.listen, e)))
    }

    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        self.engine
            .validate()
            .map_err(|e| ServerError::Config(e.to_string()))?;
        if let Some(rl) = &self.rate_limit {
            if rl.requests == 0 || rl.per_secs == 0 {
                return Err(ServerError::Config(
                    "rate_limit requests and per_secs must be positive".to_string(),
                ));
            }
        }
        if self.workers == Some(0) {
            return Err(ServerError::Config("workers must be at least 1".to_string()));
        }
        if self.maintenance_interval_secs == 0 {
            return Err(ServerError::Config(
                "maintenance_interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_ron_str("()").unwrap();
        assert_eq!(config.listen, "127.0.0.1:5000");
        assert_eq!(config.storage, StorageConfig::Memory);
        assert_eq!(config.engine, EngineConfig::default());
        assert!(config.rate_limit.is_none());
        assert!(config.catalog.is_none());
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_ron_str(
            r#"(
                listen: "0.0.0.0:8080",
                storage: File("data/oasis.db"),
                engine: (storage_capacity: 5000, map_seed: Some(7)),
                rate_limit: Some((requests: 20, per_secs: 1)),
                workers: Some(2),
            )"#,
        )
        .unwrap();
        assert_eq!(config.listen_addr().unwrap().port(), 8080);
        assert_eq!(config.storage, StorageConfig::File("data/oasis.db".into()));
        assert_eq!(config.engine.storage_capacity, 5000);
        assert_eq!(config.engine.city_slots, EngineConfig::default().city_slots);
        assert_eq!(config.rate_limit.unwrap().requests, 20);
        assert_eq!(config.workers, Some(2));
    }

    #[test]
    fn test_invalid_configs_rejected() {
        for doc in [
            r#"(listen: "nowhere")"#,
            "(engine: (storage_capacity: 0))",
            "(rate_limit: Some((requests: 0, per_secs: 1)))",
            "(workers: Some(0))",
            "(maintenance_interval_secs: 0)",
            "(listen: 5000)",
        ] {
            assert!(
                matches!(Config::from_ron_str(doc), Err(ServerError::Config(_))),
                "{doc}"
            );
        }
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load("/nonexistent/server.ron").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/server.ron"));
    }
}
