use crate::advisor::policy::AdvisorPolicy;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub db_path: String,
    pub log_level: String,
    /// Samples older than this are removed by `prune`.
    pub retention_days: i64,
    /// Look-back used when listing a route's recent history.
    pub history_days: i64,
    pub policy: AdvisorPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: "prices.db".to_string(),
            log_level: "info".to_string(),
            retention_days: 90,
            history_days: 30,
            policy: AdvisorPolicy::default(),
        }
    }
}

pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&content)?;
    Ok(config)
}
