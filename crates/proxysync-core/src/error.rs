//! Error types for proxysync.
//!
//! None of these are fatal to the poll loop: every variant is logged with
//! enough context (url, status, path) to diagnose and the loop moves on.

use std::path::PathBuf;

/// Errors produced while fetching an object from the store.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The URL could not be parsed or has no host.
    #[error("invalid url {url}: {reason}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A signed header could not be encoded as an HTTP header.
    #[error("invalid header {name} for {url}")]
    InvalidHeader {
        /// The URL being fetched.
        url: String,
        /// The header name.
        name: String,
    },

    /// The request failed before a status was received, or the body could not be read.
    #[error("transport error fetching {url}: {source}")]
    Transport {
        /// The URL being fetched.
        url: String,
        /// The underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The store answered with something other than `200 OK`.
    #[error("unexpected status {status} fetching {url}: {body}")]
    Status {
        /// The URL being fetched.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// The response body, kept for diagnostics.
        body: String,
    },
}

/// Errors produced while reading a notification batch.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// The notification channel does not exist yet; retry after a pause.
    #[error("notification channel {} not found", path.display())]
    Blocked {
        /// The channel path.
        path: PathBuf,
    },

    /// Reading the channel failed.
    #[error("failed to read notification channel {}: {source}", path.display())]
    Io {
        /// The channel path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors produced while publishing an artifact.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// Creating or writing the staged file failed.
    #[error("failed to stage artifact in {}: {source}", path.display())]
    Io {
        /// The path being written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Moving the staged file to its final name failed.
    #[error("failed to move staged artifact to {}: {source}", path.display())]
    Persist {
        /// The final path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors produced while rendering the configuration artifact.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The state could not be serialized.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    /// A variable is set but empty.
    #[error("environment variable {0} must not be empty")]
    Empty(&'static str),
}
