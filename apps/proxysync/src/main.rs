//! proxysync - keeps a reverse proxy's dynamic configuration in sync with
//! object storage.
//!
//! A watcher process writes notification batches to a channel (usually a
//! FIFO). proxysync folds each batch into its configuration state, fetches the
//! tracked configuration file with signed requests when a new version is
//! synced, and renders the state to the proxy's dynamic configuration file.
//!
//! # Usage
//!
//! ```text
//! MINIO_ACCESS_KEY=... MINIO_SECRET_KEY=... proxysync
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `MINIO_ACCESS_KEY` | *(required)* | Object store access key |
//! | `MINIO_SECRET_KEY` | *(required)* | Object store secret key |
//! | `FIFO_WATCHER` | `/srun/watcher.fifo` | Notification channel |
//! | `FIFO_OUTPUT_DYNAMIC_CONFIG` | `/srun/dynamic.yaml` | Rendered configuration |
//! | `BUCKET_EXTRA_STORE_LIST` | *(empty)* | Whitespace-separated extra store buckets |
//! | `STAGING_DIR` | `/srun` | Directory for published artifacts |
//! | `TRACKED_CONFIG_KEY` | `traefik.yaml` | Synced file whose content is tracked |
//! | `DEFAULT_CONFIG_PATH` | *(embedded)* | Artifact installed at startup |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

mod poller;

use std::sync::Arc;

use anyhow::{Context, Result};
use proxysync_auth::Credentials;
use proxysync_core::{
    AtomicPublisher, ConfigState, JsonRenderer, ProxySyncConfig, Reconciler, SignedFetcher,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::poller::Poller;

/// Version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Artifact installed when `DEFAULT_CONFIG_PATH` is unset.
const EMBEDDED_DEFAULT: &[u8] = include_bytes!("../assets/traefik.default.yaml");

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` takes precedence over the provided `log_level` when set.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Contents of the startup artifact.
fn default_artifact(config: &ProxySyncConfig) -> Result<Vec<u8>> {
    match &config.default_config_path {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("failed to read default config {}", path.display())),
        None => Ok(EMBEDDED_DEFAULT.to_vec()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ProxySyncConfig::from_env().context("failed to load configuration")?;
    init_tracing(&config.log_level)?;

    let extra_buckets = config.valid_extra_store_buckets();
    let publisher = AtomicPublisher::new(&config.staging_dir);

    let seeded = publisher
        .publish(&default_artifact(&config)?, ".yaml", None)
        .with_context(|| {
            format!(
                "failed to install default artifact in {}",
                config.staging_dir.display()
            )
        })?;
    let state = ConfigState::new(seeded, &extra_buckets);

    let credentials = Credentials::new(config.access_key.clone(), config.secret_key.clone());
    let fetcher = SignedFetcher::new(credentials).context("failed to build object store client")?;

    info!(
        staging_dir = %config.staging_dir.display(),
        tracked = %config.tracked_config_key,
        extra_buckets = ?extra_buckets,
        version = VERSION,
        "starting proxysync",
    );

    let reconciler = Reconciler::new(
        Arc::new(fetcher),
        publisher,
        extra_buckets,
        config.tracked_config_key.clone(),
    );
    let poller = Poller::new(
        config.watcher_path.clone(),
        config.output_path.clone(),
        reconciler,
        Box::new(JsonRenderer),
    );

    poller.run(state).await;
    Ok(())
}
