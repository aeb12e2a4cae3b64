//! Atomic artifact publishing.
//!
//! Every artifact the reconciler hands to the proxy lives in a shared staging
//! directory under a fresh, unique name. Content is first written to a private
//! hidden file in that directory, flushed, and only then moved to its final
//! name, so the final name never refers to a partially written file. The
//! previous artifact is removed only after its replacement exists.
//!
//! The swap assumes a single writer (this process). Readers must open the path
//! most recently returned by [`AtomicPublisher::publish`].

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::PublishError;

/// Prefix of published artifact names.
const ARTIFACT_PREFIX: &str = "config-";

/// Prefix of in-progress staging files.
const STAGING_PREFIX: &str = ".staging-";

/// Writes artifacts to fresh paths and retires the ones they replace.
#[derive(Debug, Clone)]
pub struct AtomicPublisher {
    staging_dir: PathBuf,
}

impl AtomicPublisher {
    /// Create a publisher writing into `staging_dir`.
    pub fn new(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
        }
    }

    /// Publish `contents` under a fresh name ending in `suffix`.
    ///
    /// When `previous` is given it is removed after the new artifact is fully
    /// written. On error nothing is removed and `previous` stays valid.
    pub fn publish(
        &self,
        contents: &[u8],
        suffix: &str,
        previous: Option<&Path>,
    ) -> Result<PathBuf, PublishError> {
        let mut staged = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempfile_in(&self.staging_dir)
            .map_err(|source| PublishError::Io {
                path: self.staging_dir.clone(),
                source,
            })?;

        staged
            .write_all(contents)
            .and_then(|()| staged.as_file().sync_all())
            .map_err(|source| PublishError::Io {
                path: staged.path().to_path_buf(),
                source,
            })?;

        let target = self.staging_dir.join(format!(
            "{ARTIFACT_PREFIX}{}{suffix}",
            Uuid::new_v4().simple()
        ));
        staged
            .persist_noclobber(&target)
            .map_err(|e| PublishError::Persist {
                path: target.clone(),
                source: e.error,
            })?;

        info!(path = %target.display(), size = contents.len(), "published artifact");

        if let Some(previous) = previous {
            retire(previous);
        }

        Ok(target)
    }
}

/// Remove a superseded artifact; a missing file is not an error.
fn retire(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed previous artifact"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "previous artifact already gone");
        }
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove previous artifact"),
    }
}
