//! The poll loop.
//!
//! One batch at a time: wait for the notification channel, reconcile, and
//! when the state changed render it to the output path. Waiting for the next
//! batch is the only suspension point; nothing here is fatal.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use proxysync_core::{ConfigState, NotificationBatch, ReadError, Reconciler, Render, read_batch};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Pause before retrying an unavailable notification channel.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Drives the reconciler from the notification channel.
pub struct Poller {
    watcher_path: PathBuf,
    output_path: PathBuf,
    reconciler: Reconciler,
    renderer: Box<dyn Render>,
}

impl Poller {
    pub fn new(
        watcher_path: PathBuf,
        output_path: PathBuf,
        reconciler: Reconciler,
        renderer: Box<dyn Render>,
    ) -> Self {
        Self {
            watcher_path,
            output_path,
            reconciler,
            renderer,
        }
    }

    /// Run until the process is terminated.
    pub async fn run(&self, mut state: ConfigState) {
        info!(
            watcher = %self.watcher_path.display(),
            output = %self.output_path.display(),
            "waiting for notifications",
        );

        loop {
            let batch = self.next_batch().await;
            self.process_batch(&mut state, &batch).await;
        }
    }

    /// Wait for the next batch, retrying every [`RETRY_INTERVAL`] while the
    /// channel is unavailable.
    pub async fn next_batch(&self) -> NotificationBatch {
        loop {
            match read_batch(&self.watcher_path).await {
                Ok(batch) => return batch,
                Err(e @ ReadError::Blocked { .. }) => {
                    warn!(error = %e, retry_in = ?RETRY_INTERVAL, "notification channel unavailable");
                }
                Err(e) => {
                    warn!(error = %e, retry_in = ?RETRY_INTERVAL, "failed to read notification batch");
                }
            }
            tokio::time::sleep(RETRY_INTERVAL).await;
        }
    }

    /// Reconcile one batch and render the state if it changed.
    ///
    /// Returns the dirty flag.
    pub async fn process_batch(&self, state: &mut ConfigState, batch: &NotificationBatch) -> bool {
        let dirty = self.reconciler.reconcile(state, batch).await;
        debug!(tag = batch.tag.as_str(), records = batch.records.len(), dirty, "processed batch");

        if dirty {
            if let Err(e) = self.write_output(state).await {
                warn!(path = %self.output_path.display(), error = %format!("{e:#}"), "failed to render configuration");
            }
        }
        dirty
    }

    async fn write_output(&self, state: &ConfigState) -> Result<()> {
        let rendered = self.renderer.render(state).context("render failed")?;

        // A pipe or other special file belongs to its reader: write into it.
        match tokio::fs::metadata(&self.output_path).await {
            Ok(meta) if !meta.is_file() => write_in_place(&self.output_path, &rendered).await?,
            _ => replace_file(&self.output_path, &rendered)?,
        }

        info!(path = %self.output_path.display(), size = rendered.len(), "wrote configuration");
        Ok(())
    }
}

/// Write `contents` into the existing `path`. Blocks until a pipe has a reader.
async fn write_in_place(path: &Path, contents: &[u8]) -> Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .open(path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;
    file.write_all(contents)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    file.flush()
        .await
        .with_context(|| format!("failed to flush {}", path.display()))?;
    Ok(())
}

/// Replace `path` with `contents` through a sibling temporary file.
fn replace_file(path: &Path, contents: &[u8]) -> Result<()> {
    use std::io::Write;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to stage output in {}", dir.display()))?;
    staged
        .write_all(contents)
        .and_then(|()| staged.as_file().sync_all())
        .with_context(|| format!("failed to write {}", staged.path().display()))?;
    staged
        .persist(path)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}
