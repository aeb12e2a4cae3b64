//! Canonical request construction for AWS Signature Version 4.
//!
//! The canonical request is the exact byte string whose hash is signed:
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n\n
//! SignedHeaders\n
//! HashedPayload
//! ```
//!
//! proxysync only issues `GET` requests without a query string, so the query
//! component is always empty and the path is taken verbatim from the URL
//! (which already carries its percent-encoding).

use std::collections::BTreeMap;

/// A header after canonicalization: lowercase name, trimmed value.
pub type CanonicalHeader = (String, String);

/// Canonicalize a header list.
///
/// Names are lowercased and values trimmed. Entries are then ordered by name
/// using plain byte-wise comparison, never a locale-aware collation. When two
/// entries collapse onto the same lowercase name the later one wins.
///
/// # Examples
///
/// ```
/// use proxysync_auth::canonical::canonicalize_headers;
///
/// let headers = canonicalize_headers(&[("X-Amz-Date", " 20130524T000000Z "), ("Host", "example.com")]);
/// assert_eq!(headers[0], ("host".to_owned(), "example.com".to_owned()));
/// assert_eq!(headers[1], ("x-amz-date".to_owned(), "20130524T000000Z".to_owned()));
/// ```
#[must_use]
pub fn canonicalize_headers(headers: &[(&str, &str)]) -> Vec<CanonicalHeader> {
    let sorted: BTreeMap<String, String> = headers
        .iter()
        .map(|(name, value)| (name.to_lowercase(), value.trim().to_owned()))
        .collect();
    sorted.into_iter().collect()
}

/// Build the canonical URI. Empty paths are normalized to `/`.
///
/// # Examples
///
/// ```
/// use proxysync_auth::canonical::build_canonical_uri;
///
/// assert_eq!(build_canonical_uri("/bucket/traefik.yaml"), "/bucket/traefik.yaml");
/// assert_eq!(build_canonical_uri(""), "/");
/// ```
#[must_use]
pub fn build_canonical_uri(path: &str) -> &str {
    if path.is_empty() { "/" } else { path }
}

/// Build the full canonical request string.
///
/// `headers` must already be canonical (see [`canonicalize_headers`]); they
/// are emitted in the order given, one `name:value` line each, followed by a
/// blank line and the semicolon-joined header names.
///
/// # Examples
///
/// ```
/// use proxysync_auth::canonical::{build_canonical_request, canonicalize_headers};
///
/// let headers = canonicalize_headers(&[("host", "example.com"), ("x-amz-date", "20150830T123600Z")]);
/// let canonical = build_canonical_request(
///     "GET",
///     "/",
///     &headers,
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
/// );
/// assert!(canonical.starts_with("GET\n/\n\nhost:example.com\n"));
/// ```
#[must_use]
pub fn build_canonical_request(
    method: &str,
    path: &str,
    headers: &[CanonicalHeader],
    payload_hash: &str,
) -> String {
    let canonical_uri = build_canonical_uri(path);
    let canonical_headers = headers
        .iter()
        .map(|(name, value)| format!("{name}:{value}"))
        .collect::<Vec<_>>()
        .join("\n");
    let names: Vec<&str> = headers.iter().map(|(name, _)| name.as_str()).collect();
    let signed_headers = build_signed_headers_string(&names);

    format!("{method}\n{canonical_uri}\n\n{canonical_headers}\n\n{signed_headers}\n{payload_hash}")
}

/// Join header names with `;`, preserving the order given.
///
/// # Examples
///
/// ```
/// use proxysync_auth::canonical::build_signed_headers_string;
///
/// assert_eq!(build_signed_headers_string(&["host", "x-amz-date"]), "host;x-amz-date");
/// ```
#[must_use]
pub fn build_signed_headers_string(names: &[&str]) -> String {
    names.join(";")
}
