//! Event-driven state reconciliation.
//!
//! [`Reconciler::reconcile`] applies one notification batch to the
//! [`ConfigState`] and reports whether the state changed (the dirty flag):
//!
//! - `bucket` rebuilds the remote map from the listing and, when the set of
//!   remotes differs from the current one, replaces the remotes and rebuilds
//!   the store map.
//! - `synced_config` fetches the tracked file whenever a successful sync
//!   record carries a new version marker, publishes it atomically and records
//!   the new version. A failed fetch or publish leaves the tracked file as is.
//! - Any other tag is ignored.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::event::{BucketRecord, Event, NotificationBatch, SyncRecord};
use crate::fetch::ObjectFetcher;
use crate::publish::AtomicPublisher;
use crate::state::{ConfigState, build_remote_map};

/// Applies notification batches to the configuration state.
#[derive(Debug)]
pub struct Reconciler {
    fetcher: Arc<dyn ObjectFetcher>,
    publisher: AtomicPublisher,
    extra_buckets: Vec<String>,
    tracked_key: String,
}

impl Reconciler {
    /// Create a reconciler.
    ///
    /// `extra_buckets` must already be validated; `tracked_key` is the synced
    /// file name whose content is tracked.
    pub fn new(
        fetcher: Arc<dyn ObjectFetcher>,
        publisher: AtomicPublisher,
        extra_buckets: Vec<String>,
        tracked_key: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            publisher,
            extra_buckets,
            tracked_key: tracked_key.into(),
        }
    }

    /// Apply `batch` to `state` and return the dirty flag.
    pub async fn reconcile(&self, state: &mut ConfigState, batch: &NotificationBatch) -> bool {
        match Event::decode(batch) {
            Event::Bucket(records) => self.apply_buckets(state, &records),
            Event::SyncedConfig(records) => self.apply_synced_config(state, &records).await,
            Event::Ignored(tag) => {
                debug!(tag, records = batch.records.len(), "ignoring batch");
                false
            }
        }
    }

    fn apply_buckets(&self, state: &mut ConfigState, records: &[BucketRecord]) -> bool {
        let remotes = build_remote_map(records);
        let changed = state.apply_remotes(&remotes, &self.extra_buckets);
        if changed {
            info!(remotes = ?state.remotes, stores = state.stores.len(), "remote set changed");
        } else {
            debug!(remotes = remotes.len(), "remote set unchanged");
        }
        changed
    }

    async fn apply_synced_config(&self, state: &mut ConfigState, records: &[SyncRecord]) -> bool {
        let mut dirty = false;

        for record in records {
            if !record.is_synced_file() || record.key != self.tracked_key {
                continue;
            }
            if state.tracked_file_version.as_deref() == Some(record.last_modified.as_str()) {
                debug!(key = %record.key, version = %record.last_modified, "tracked file unchanged");
                continue;
            }

            let url = record.object_url();
            let body = match self.fetcher.fetch(&url).await {
                Ok(body) => body,
                Err(e) => {
                    warn!(url, error = %e, "failed to fetch tracked file, keeping current copy");
                    continue;
                }
            };

            let suffix = artifact_suffix(&record.key);
            match self
                .publisher
                .publish(&body, &suffix, Some(state.tracked_file_path.as_path()))
            {
                Ok(path) => {
                    info!(
                        key = %record.key,
                        version = %record.last_modified,
                        path = %path.display(),
                        "tracked file updated"
                    );
                    state.tracked_file_path = path;
                    state.tracked_file_version = Some(record.last_modified.clone());
                    dirty = true;
                }
                Err(e) => {
                    warn!(url, error = %e, "failed to publish tracked file, keeping current copy");
                }
            }
        }

        dirty
    }
}

/// File extension of `key` including the dot, or empty.
fn artifact_suffix(key: &str) -> String {
    Path::new(key)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}
