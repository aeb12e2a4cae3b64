//! AWS Signature Version 4 signing.
//!
//! The signing flow for one request:
//!
//! 1. Format the request timestamp as the long (`YYYYMMDDTHHMMSSZ`) and short
//!    (`YYYYMMDD`) dates.
//! 2. Start from the base header set `host` + `x-amz-date`.
//! 3. Build the canonical request from the canonicalized headers and the hash
//!    of the (always empty) payload.
//! 4. Derive the signing key with the HMAC-SHA256 chain scoped to
//!    date/region/service.
//! 5. Build the string to sign and compute the hex signature.
//! 6. Append the `authorization` header.
//!
//! The main entry point is [`sign`].

use chrono::{DateTime, Utc};
use hmac::{Hmac, KeyInit, Mac};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::canonical::{build_canonical_request, canonicalize_headers};
use crate::credentials::Credentials;

/// The only algorithm this crate signs with.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Region of the object store deployment.
pub const REGION: &str = "us-east-1";

/// Service name of the object store deployment.
pub const SERVICE: &str = "s3";

/// Terminator of every credential scope.
const SCOPE_TERMINATOR: &str = "aws4_request";

const LONG_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";
const SHORT_DATE_FORMAT: &str = "%Y%m%d";

type HmacSha256 = Hmac<Sha256>;

/// A request to be signed.
///
/// Built per fetch and dropped after signing; only `GET` with an empty
/// payload is ever produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningRequest {
    /// HTTP method.
    pub method: String,
    /// Value of the `host` header.
    pub host: String,
    /// Request path, already percent-encoded.
    pub path: String,
    /// Signing time.
    pub timestamp: DateTime<Utc>,
}

impl SigningRequest {
    /// Build a `GET` signing request.
    pub fn get(host: impl Into<String>, path: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            method: "GET".to_owned(),
            host: host.into(),
            path: path.into(),
            timestamp,
        }
    }
}

/// Region and service a signature is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningScope<'a> {
    /// Region component of the credential scope.
    pub region: &'a str,
    /// Service component of the credential scope.
    pub service: &'a str,
}

impl Default for SigningScope<'_> {
    fn default() -> Self {
        Self {
            region: REGION,
            service: SERVICE,
        }
    }
}

/// Headers produced by [`sign`], in insertion order.
///
/// The order is `host`, `x-amz-date`, `authorization`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignedHeaders(Vec<(String, String)>);

impl SignedHeaders {
    /// Look up a header value by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn push(&mut self, name: &str, value: String) {
        self.0.push((name.to_owned(), value));
    }
}

impl IntoIterator for SignedHeaders {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Sign a request for the deployment's fixed region and service.
///
/// Pure: the same request, credentials and timestamp always yield the same
/// headers.
#[must_use]
pub fn sign(request: &SigningRequest, credentials: &Credentials) -> SignedHeaders {
    sign_with_scope(request, credentials, SigningScope::default())
}

/// Sign a request for an explicit region and service.
#[must_use]
pub fn sign_with_scope(
    request: &SigningRequest,
    credentials: &Credentials,
    scope: SigningScope<'_>,
) -> SignedHeaders {
    let long_date = request.timestamp.format(LONG_DATE_FORMAT).to_string();
    let short_date = request.timestamp.format(SHORT_DATE_FORMAT).to_string();

    let mut headers = SignedHeaders::default();
    headers.push("host", request.host.clone());
    headers.push("x-amz-date", long_date.clone());

    let base: Vec<(&str, &str)> = headers.iter().collect();
    let canonical_headers = canonicalize_headers(&base);
    let canonical_request = build_canonical_request(
        &request.method,
        &request.path,
        &canonical_headers,
        &hash_payload(b""),
    );

    debug!(canonical_request, "Built canonical request");

    let credential_scope = build_credential_scope(&short_date, scope);
    let canonical_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));
    let string_to_sign = build_string_to_sign(&long_date, &credential_scope, &canonical_hash);

    debug!(string_to_sign, "Built string to sign");

    let signing_key = derive_signing_key(
        credentials.secret_key(),
        &short_date,
        scope.region,
        scope.service,
    );
    let signature = compute_signature(&signing_key, &string_to_sign);

    // SignedHeaders lists the base headers in insertion order, not canonical order.
    let signed_names = headers.iter().map(|(n, _)| n).collect::<Vec<_>>().join(";");
    let authorization = format!(
        "{ALGORITHM} Credential={}/{credential_scope}, SignedHeaders={signed_names}, Signature={signature}",
        credentials.access_key()
    );
    headers.push("authorization", authorization);

    headers
}

/// Build the credential scope: `date/region/service/aws4_request`.
///
/// # Examples
///
/// ```
/// use proxysync_auth::sigv4::{SigningScope, build_credential_scope};
///
/// assert_eq!(
///     build_credential_scope("20130524", SigningScope::default()),
///     "20130524/us-east-1/s3/aws4_request"
/// );
/// ```
#[must_use]
pub fn build_credential_scope(short_date: &str, scope: SigningScope<'_>) -> String {
    format!(
        "{short_date}/{}/{}/{SCOPE_TERMINATOR}",
        scope.region, scope.service
    )
}

/// Build the SigV4 string to sign.
///
/// Format:
/// ```text
/// AWS4-HMAC-SHA256\n
/// <ISO8601 timestamp>\n
/// <credential_scope>\n
/// <hex(SHA256(canonical_request))>
/// ```
///
/// # Examples
///
/// ```
/// use proxysync_auth::sigv4::build_string_to_sign;
///
/// let sts = build_string_to_sign(
///     "20130524T000000Z",
///     "20130524/us-east-1/s3/aws4_request",
///     "7344ae5b7ee6c3e7e6b0fe0640412a37625d1fbfff95c48bbb2dc43964946972",
/// );
/// assert!(sts.starts_with("AWS4-HMAC-SHA256\n20130524T000000Z\n"));
/// ```
#[must_use]
pub fn build_string_to_sign(
    timestamp: &str,
    credential_scope: &str,
    canonical_request_hash: &str,
) -> String {
    format!("{ALGORITHM}\n{timestamp}\n{credential_scope}\n{canonical_request_hash}")
}

/// Derive the SigV4 signing key using HMAC-SHA256 chain.
///
/// ```text
/// DateKey              = HMAC-SHA256("AWS4" + secret_key, date)
/// DateRegionKey        = HMAC-SHA256(DateKey, region)
/// DateRegionServiceKey = HMAC-SHA256(DateRegionKey, service)
/// SigningKey           = HMAC-SHA256(DateRegionServiceKey, "aws4_request")
/// ```
///
/// Recomputed for every request; nothing is cached.
#[must_use]
pub fn derive_signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let date_key = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
    let date_region_key = hmac_sha256(&date_key, region.as_bytes());
    let date_region_service_key = hmac_sha256(&date_region_key, service.as_bytes());
    hmac_sha256(&date_region_service_key, SCOPE_TERMINATOR.as_bytes())
}

/// Compute the hex-encoded HMAC-SHA256 signature of `data`.
#[must_use]
pub fn compute_signature(signing_key: &[u8], data: &str) -> String {
    hex::encode(hmac_sha256(signing_key, data.as_bytes()))
}

/// Compute the SHA-256 hash of the given payload and return it as a hex string.
///
/// # Examples
///
/// ```
/// use proxysync_auth::sigv4::hash_payload;
///
/// assert_eq!(
///     hash_payload(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn hash_payload(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

/// Compute HMAC-SHA256 and return the raw bytes.
fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = <HmacSha256 as KeyInit>::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
