pub mod loader;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::LgtmError;
use crate::model::policy::{DEFAULT_APPROVALS, DEFAULT_PATTERN};
use crate::model::Policy;

pub use loader::ConfigResolver;

/// Default configuration file, read when present.
pub const DEFAULT_CONFIG_FILE: &str = "lgtm.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    pub database_url: String,
    pub github_api_url: String,
    pub github_webhook_secret: String,
    pub cache_ttl_secs: u64,
    pub default_approvals: u32,
    pub default_pattern: String,
}

impl AppConfig {
    /// Defaults, then the config file, then `LGTM_*` environment variables.
    ///
    /// An explicitly given file must exist; the default one is optional.
    pub fn load(path: Option<&str>) -> Result<Self, LgtmError> {
        let file = match path {
            Some(path) => File::with_name(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        Config::builder()
            .set_default("server_host", "0.0.0.0")
            .and_then(|b| b.set_default("server_port", 8000))
            .and_then(|b| b.set_default("database_url", "sqlite://lgtm.db?mode=rwc"))
            .and_then(|b| b.set_default("github_api_url", "https://api.github.com"))
            .and_then(|b| b.set_default("github_webhook_secret", ""))
            .and_then(|b| b.set_default("cache_ttl_secs", 900))
            .and_then(|b| b.set_default("default_approvals", DEFAULT_APPROVALS))
            .and_then(|b| b.set_default("default_pattern", DEFAULT_PATTERN))
            .map_err(|e| LgtmError::ConfigError(e.to_string()))?
            .add_source(file)
            .add_source(Environment::with_prefix("LGTM").try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| LgtmError::ConfigError(e.to_string()))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// The policy used when a repository carries no `.lgtm` file.
    pub fn default_policy(&self) -> Policy {
        Policy::with_defaults(self.default_approvals, &self.default_pattern)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 8000,
            database_url: "sqlite://lgtm.db?mode=rwc".to_string(),
            github_api_url: "https://api.github.com".to_string(),
            github_webhook_secret: String::new(),
            cache_ttl_secs: 900,
            default_approvals: DEFAULT_APPROVALS,
            default_pattern: DEFAULT_PATTERN.to_string(),
        }
    }
}
