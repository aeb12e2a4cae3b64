//! The reconciler's configuration state.
//!
//! [`ConfigState`] is the single mutable aggregate of the process. It is built
//! once at startup, mutated in place by the reconciler for every batch, and
//! handed read-only to the renderer.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::event::BucketRecord;
use crate::validation::is_valid_name;

/// Store-key prefix for stores derived from remotes.
pub const REMOTE_STORE_PREFIX: &str = "remote-";

/// Store-key prefix for stores derived from the extra bucket list.
pub const EXTRA_STORE_PREFIX: &str = "extra-";

/// Folder prefix marking a remote in the bucket listing.
pub const REMOTE_FOLDER_PREFIX: &str = "thanos-";

/// `thanos-<bucket>/<remote>/` or the legacy `thanos-<name>/`.
static REMOTE_FOLDER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^thanos-([^/]+)/(?:([^/]+)/)?$").expect("remote folder pattern is valid")
});

/// Mapping remote identifier -> bucket identifier.
pub type RemoteMap = BTreeMap<String, String>;

/// Mapping namespaced store key -> store settings.
pub type StoreMap = BTreeMap<String, StoreConfig>;

/// Settings of one object store exposed to the proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreConfig {
    /// Backing bucket.
    pub bucket: String,
}

/// A remote folder extracted from a bucket listing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFolder {
    /// Remote identifier.
    pub remote: String,
    /// Bucket backing the remote.
    pub bucket: String,
}

/// Extract the remote and bucket named by a folder key.
///
/// `thanos-mybucket/prod/` maps remote `prod` to bucket `mybucket`. The
/// single-segment form `thanos-prod/` maps remote `prod` to the folder's own
/// bucket `thanos-prod`. Both identifiers must pass
/// [`is_valid_name`](crate::validation::is_valid_name).
///
/// # Examples
///
/// ```
/// use proxysync_core::state::parse_remote_folder;
///
/// let folder = parse_remote_folder("thanos-mybucket/prod/").unwrap();
/// assert_eq!(folder.remote, "prod");
/// assert_eq!(folder.bucket, "mybucket");
/// assert!(parse_remote_folder("thanos-mybucket/../").is_none());
/// ```
#[must_use]
pub fn parse_remote_folder(key: &str) -> Option<RemoteFolder> {
    let captures = REMOTE_FOLDER_PATTERN.captures(key)?;
    let first = captures.get(1)?.as_str();

    let (remote, bucket) = match captures.get(2) {
        Some(remote) => (remote.as_str().to_owned(), first.to_owned()),
        None => (first.to_owned(), format!("{REMOTE_FOLDER_PREFIX}{first}")),
    };

    if !is_valid_name(&bucket) || !is_valid_name(&remote) {
        debug!(key, "skipping folder with invalid identifiers");
        return None;
    }

    Some(RemoteFolder { remote, bucket })
}

/// Build the remote map from a bucket listing.
///
/// Only `folder` records whose key names a valid remote count. A remote seen
/// more than once keeps the last bucket.
#[must_use]
pub fn build_remote_map(records: &[BucketRecord]) -> RemoteMap {
    records
        .iter()
        .filter(|record| record.kind == "folder")
        .filter_map(|record| parse_remote_folder(&record.key))
        .map(|folder| (folder.remote, folder.bucket))
        .collect()
}

/// Merge remote-derived and extra stores into one namespaced store map.
///
/// # Examples
///
/// ```
/// use proxysync_core::state::{RemoteMap, build_store_map};
///
/// let remotes = RemoteMap::from([("prod".to_owned(), "mybucket".to_owned())]);
/// let stores = build_store_map(&remotes, &["cache".to_owned()]);
/// assert_eq!(stores["remote-prod"].bucket, "mybucket");
/// assert_eq!(stores["extra-cache"].bucket, "cache");
/// ```
#[must_use]
pub fn build_store_map(remotes: &RemoteMap, extra_buckets: &[String]) -> StoreMap {
    let from_remotes = remotes.iter().map(|(remote, bucket)| {
        (
            format!("{REMOTE_STORE_PREFIX}{remote}"),
            StoreConfig {
                bucket: bucket.clone(),
            },
        )
    });
    let from_extras = extra_buckets.iter().map(|bucket| {
        (
            format!("{EXTRA_STORE_PREFIX}{bucket}"),
            StoreConfig {
                bucket: bucket.clone(),
            },
        )
    });
    from_remotes.chain(from_extras).collect()
}

/// The reconciled configuration.
///
/// `tracked_file_path` always names a fully written file: it is only ever
/// replaced with a path returned by the atomic publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigState {
    /// Known remotes, sorted.
    pub remotes: Vec<String>,
    /// Namespaced store map.
    pub stores: StoreMap,
    /// Path of the currently published tracked file.
    pub tracked_file_path: PathBuf,
    /// Version marker of the tracked file; `None` until a synced copy is fetched.
    pub tracked_file_version: Option<String>,
}

impl ConfigState {
    /// Create the startup state around an already published default artifact.
    ///
    /// There are no remotes yet, so the store map holds only the extra stores.
    #[must_use]
    pub fn new(tracked_file_path: PathBuf, extra_buckets: &[String]) -> Self {
        Self {
            remotes: Vec::new(),
            stores: build_store_map(&RemoteMap::new(), extra_buckets),
            tracked_file_path,
            tracked_file_version: None,
        }
    }

    /// Replace the remotes if the set differs from the current one.
    ///
    /// Returns whether anything changed.
    pub fn apply_remotes(&mut self, remotes: &RemoteMap, extra_buckets: &[String]) -> bool {
        let next: Vec<String> = remotes.keys().cloned().collect();
        if next == self.remotes {
            return false;
        }
        self.remotes = next;
        self.stores = build_store_map(remotes, extra_buckets);
        true
    }
}
