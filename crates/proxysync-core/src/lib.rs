//! Notification-driven configuration reconciliation for proxysync.
//!
//! This crate owns everything between the watcher's notification channel and
//! the artifact the reverse proxy reads: it decodes notification batches,
//! folds them into a [`ConfigState`], fetches synced files with signed
//! requests, and publishes artifacts without ever exposing a half-written file.
//!
//! # Architecture
//!
//! ```text
//! notification channel
//!        |
//!        v
//!   read_batch (event)  ->  Reconciler (reconcile)  ->  Render
//!                              |            |
//!                              v            v
//!                     SignedFetcher    AtomicPublisher
//!                      (fetch, auth)      (publish)
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod fetch;
pub mod publish;
pub mod reconcile;
pub mod render;
pub mod state;
pub mod validation;

pub use config::ProxySyncConfig;
pub use error::{ConfigError, FetchError, PublishError, ReadError, RenderError};
pub use event::{Event, EventTag, NotificationBatch, read_batch};
pub use fetch::{ObjectFetcher, SignedFetcher};
pub use publish::AtomicPublisher;
pub use reconcile::Reconciler;
pub use render::{JsonRenderer, Render};
pub use state::{ConfigState, StoreConfig};
pub use validation::is_valid_name;
