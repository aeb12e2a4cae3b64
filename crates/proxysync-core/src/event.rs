//! Notification batches.
//!
//! The watcher writes one batch at a time to the notification channel:
//!
//! ```text
//! <event tag>
//! {"type":"folder","key":"thanos-mybucket/prod/"}
//! {"type":"folder","key":"thanos-other/dev/"}
//! ```
//!
//! [`read_batch`] pulls the raw text apart into a [`NotificationBatch`];
//! [`Event::decode`] turns it into typed records, dropping records that are
//! not valid JSON or miss a required field without touching their siblings.

use std::path::Path;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{trace, warn};

use crate::error::ReadError;

/// Kind of a notification batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTag {
    /// The bucket listing changed.
    Bucket,
    /// The synced-file feed changed.
    SyncedConfig,
    /// Any other tag; valid input, ignored.
    Other(String),
}

impl EventTag {
    /// Parse a tag line.
    #[must_use]
    pub fn parse(tag: &str) -> Self {
        match tag {
            "bucket" => Self::Bucket,
            "synced_config" => Self::SyncedConfig,
            other => Self::Other(other.to_owned()),
        }
    }

    /// The tag as it appears on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Bucket => "bucket",
            Self::SyncedConfig => "synced_config",
            Self::Other(tag) => tag,
        }
    }
}

/// One unit of input from the notification channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationBatch {
    /// The event tag from the first line.
    pub tag: EventTag,
    /// One raw JSON document per remaining non-blank line, in order.
    pub records: Vec<String>,
}

impl NotificationBatch {
    /// Split raw channel text into a batch.
    ///
    /// # Examples
    ///
    /// ```
    /// use proxysync_core::event::{EventTag, NotificationBatch};
    ///
    /// let batch = NotificationBatch::parse("bucket\n{\"type\":\"folder\",\"key\":\"thanos-a/b/\"}\n");
    /// assert_eq!(batch.tag, EventTag::Bucket);
    /// assert_eq!(batch.records.len(), 1);
    /// ```
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut lines = text.trim().lines();
        let tag = EventTag::parse(lines.next().unwrap_or_default().trim());
        let records = lines
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToOwned::to_owned)
            .collect();
        Self { tag, records }
    }
}

/// Read the next batch from the notification channel at `path`.
///
/// Returns [`ReadError::Blocked`] when the channel has not been created yet,
/// so the caller can pause and retry instead of blocking forever. When the
/// channel is a FIFO the read waits for a writer and returns once it closes.
///
/// # Examples
///
/// ```
/// use proxysync_core::error::ReadError;
/// use proxysync_core::event::{EventTag, read_batch};
///
/// # tokio_test::block_on(async {
/// let dir = tempfile::tempdir().unwrap();
/// let path = dir.path().join("watcher.fifo");
/// assert!(matches!(read_batch(&path).await, Err(ReadError::Blocked { .. })));
///
/// std::fs::write(&path, "bucket\n{\"type\":\"folder\",\"key\":\"thanos-a/b/\"}\n").unwrap();
/// let batch = read_batch(&path).await.unwrap();
/// assert_eq!(batch.tag, EventTag::Bucket);
/// assert_eq!(batch.records.len(), 1);
/// # });
/// ```
pub async fn read_batch(path: &Path) -> Result<NotificationBatch, ReadError> {
    match tokio::fs::try_exists(path).await {
        Ok(true) => {}
        Ok(false) => {
            return Err(ReadError::Blocked {
                path: path.to_path_buf(),
            });
        }
        Err(source) => {
            return Err(ReadError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    }

    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => ReadError::Blocked {
                path: path.to_path_buf(),
            },
            _ => ReadError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;

    trace!(path = %path.display(), text, "read notification batch");
    Ok(NotificationBatch::parse(&text))
}

/// A folder entry of the bucket listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BucketRecord {
    /// Entry type; only `folder` is significant.
    #[serde(rename = "type")]
    pub kind: String,
    /// Entry key, e.g. `thanos-mybucket/prod/`.
    pub key: String,
}

/// An entry of the synced-file feed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRecord {
    /// Sync outcome; only `success` is eligible.
    pub status: String,
    /// Entry type; only `file` is eligible.
    #[serde(rename = "type")]
    pub kind: String,
    /// File name inside the synced prefix.
    pub key: String,
    /// Base URL the file can be fetched from; the key is appended to it.
    pub url: String,
    /// Opaque version marker.
    pub last_modified: String,
}

impl SyncRecord {
    /// Whether this record reports a successfully synced file.
    #[must_use]
    pub fn is_synced_file(&self) -> bool {
        self.status == "success" && self.kind == "file"
    }

    /// Full URL of the synced file.
    #[must_use]
    pub fn object_url(&self) -> String {
        format!("{}{}", self.url, self.key)
    }
}

/// A batch decoded according to its tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Bucket listing records.
    Bucket(Vec<BucketRecord>),
    /// Synced-file records.
    SyncedConfig(Vec<SyncRecord>),
    /// Unrecognized tag.
    Ignored(String),
}

impl Event {
    /// Decode every record of `batch`; malformed records are logged and skipped.
    #[must_use]
    pub fn decode(batch: &NotificationBatch) -> Self {
        match &batch.tag {
            EventTag::Bucket => Self::Bucket(decode_records(&batch.tag, &batch.records)),
            EventTag::SyncedConfig => {
                Self::SyncedConfig(decode_records(&batch.tag, &batch.records))
            }
            EventTag::Other(tag) => Self::Ignored(tag.clone()),
        }
    }
}

fn decode_records<T: DeserializeOwned>(tag: &EventTag, lines: &[String]) -> Vec<T> {
    lines
        .iter()
        .enumerate()
        .filter_map(|(index, line)| match serde_json::from_str(line) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(tag = tag.as_str(), index, error = %e, "dropping malformed record");
                None
            }
        })
        .collect()
}
