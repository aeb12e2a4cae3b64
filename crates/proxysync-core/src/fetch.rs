//! Signed object fetches.
//!
//! [`SignedFetcher`] issues a SigV4-signed `GET` for a URL and insists on
//! `200 OK`. Anything else surfaces as [`FetchError::Status`] with the
//! response body attached. There are no retries at this layer, and no timeout:
//! a hung store stalls the caller.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use proxysync_auth::{Credentials, SigningRequest, sign};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use crate::error::FetchError;

/// Fetches the body of an object by URL.
#[async_trait]
pub trait ObjectFetcher: Send + Sync + fmt::Debug {
    /// Fetch `url` and return its body.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] on transport failure or any non-200 status.
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

/// An [`ObjectFetcher`] that signs every request with SigV4.
#[derive(Debug, Clone)]
pub struct SignedFetcher {
    client: reqwest::Client,
    credentials: Credentials,
}

impl SignedFetcher {
    /// Create a fetcher with a low-latency client (`TCP_NODELAY`).
    pub fn new(credentials: Credentials) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .tcp_nodelay(true)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self::with_client(client, credentials))
    }

    /// Create a fetcher around an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, credentials: Credentials) -> Self {
        Self {
            client,
            credentials,
        }
    }

    /// Build the signed header map for `url`.
    fn signed_headers(&self, url: &reqwest::Url) -> Result<HeaderMap, FetchError> {
        let host = url.host_str().ok_or_else(|| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: "missing host".to_owned(),
        })?;
        let host = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_owned(),
        };

        let request = SigningRequest::get(host, url.path(), Utc::now());
        let signed = sign(&request, &self.credentials);

        let mut headers = HeaderMap::with_capacity(signed.len());
        for (name, value) in signed {
            let invalid = || FetchError::InvalidHeader {
                url: url.to_string(),
                name: name.clone(),
            };
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
            let header_value = HeaderValue::from_str(&value).map_err(|_| invalid())?;
            headers.insert(header_name, header_value);
        }
        Ok(headers)
    }
}

#[async_trait]
impl ObjectFetcher for SignedFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;
        let headers = self.signed_headers(&parsed)?;

        debug!(url, "fetching object");

        let transport = |source| FetchError::Transport {
            url: url.to_owned(),
            source,
        };
        let response = self
            .client
            .get(parsed)
            .headers(headers)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                url: url.to_owned(),
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await.map_err(transport)?;
        debug!(url, size = body.len(), "fetched object");
        Ok(body)
    }
}
