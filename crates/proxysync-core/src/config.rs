//! proxysync configuration.
//!
//! Provides [`ProxySyncConfig`]. Values are loaded from environment variables
//! via [`ProxySyncConfig::from_env`]; only the storage credentials are
//! required.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::ConfigError;
use crate::validation::retain_valid_names;

/// Runtime configuration.
///
/// # Examples
///
/// ```
/// use proxysync_core::config::ProxySyncConfig;
///
/// let config = ProxySyncConfig::builder()
///     .access_key("AKID".to_owned())
///     .secret_key("secret".to_owned())
///     .build();
/// assert_eq!(config.tracked_config_key, "traefik.yaml");
/// assert_eq!(config.staging_dir.to_str(), Some("/srun"));
/// ```
#[derive(Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct ProxySyncConfig {
    /// Object store access key.
    pub access_key: String,

    /// Object store secret key.
    #[serde(skip_serializing)]
    pub secret_key: String,

    /// Notification channel written by the watcher.
    #[builder(default = PathBuf::from("/srun/watcher.fifo"))]
    pub watcher_path: PathBuf,

    /// Destination of the rendered configuration.
    #[builder(default = PathBuf::from("/srun/dynamic.yaml"))]
    pub output_path: PathBuf,

    /// Raw whitespace-separated extra store bucket list.
    #[builder(default)]
    pub extra_store_buckets: String,

    /// Shared directory for published artifacts.
    #[builder(default = PathBuf::from("/srun"))]
    pub staging_dir: PathBuf,

    /// Synced file whose content is tracked.
    #[builder(default = String::from("traefik.yaml"))]
    pub tracked_config_key: String,

    /// Default artifact installed at startup; `None` uses the embedded default.
    #[builder(default)]
    pub default_config_path: Option<PathBuf>,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl std::fmt::Debug for ProxySyncConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxySyncConfig")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("watcher_path", &self.watcher_path)
            .field("output_path", &self.output_path)
            .field("extra_store_buckets", &self.extra_store_buckets)
            .field("staging_dir", &self.staging_dir)
            .field("tracked_config_key", &self.tracked_config_key)
            .field("default_config_path", &self.default_config_path)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl ProxySyncConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `MINIO_ACCESS_KEY` | *(required)* |
    /// | `MINIO_SECRET_KEY` | *(required)* |
    /// | `FIFO_WATCHER` | `/srun/watcher.fifo` |
    /// | `FIFO_OUTPUT_DYNAMIC_CONFIG` | `/srun/dynamic.yaml` |
    /// | `BUCKET_EXTRA_STORE_LIST` | *(empty)* |
    /// | `STAGING_DIR` | `/srun` |
    /// | `TRACKED_CONFIG_KEY` | `traefik.yaml` |
    /// | `DEFAULT_CONFIG_PATH` | *(embedded default)* |
    /// | `LOG_LEVEL` | `info` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| match lookup(name) {
            None => Err(ConfigError::Missing(name)),
            Some(v) if v.is_empty() => Err(ConfigError::Empty(name)),
            Some(v) => Ok(v),
        };

        let mut config = Self::builder()
            .access_key(required("MINIO_ACCESS_KEY")?)
            .secret_key(required("MINIO_SECRET_KEY")?)
            .build();

        if let Some(v) = lookup("FIFO_WATCHER") {
            config.watcher_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("FIFO_OUTPUT_DYNAMIC_CONFIG") {
            config.output_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("BUCKET_EXTRA_STORE_LIST") {
            config.extra_store_buckets = v;
        }
        if let Some(v) = lookup("STAGING_DIR") {
            config.staging_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("TRACKED_CONFIG_KEY") {
            config.tracked_config_key = v;
        }
        if let Some(v) = lookup("DEFAULT_CONFIG_PATH").filter(|v| !v.is_empty()) {
            config.default_config_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }

        Ok(config)
    }

    /// The extra store buckets that pass name validation.
    #[must_use]
    pub fn valid_extra_store_buckets(&self) -> Vec<String> {
        retain_valid_names(
            self.extra_store_buckets.split_whitespace(),
            "BUCKET_EXTRA_STORE_LIST",
        )
    }
}
