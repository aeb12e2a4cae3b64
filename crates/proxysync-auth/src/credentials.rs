//! Storage credentials used to sign requests.

use std::fmt;

/// An access key / secret key pair for the object store.
///
/// The secret is never printed: the [`Debug`] implementation redacts it so
/// credentials can travel through structured logging safely.
///
/// # Examples
///
/// ```
/// use proxysync_auth::Credentials;
///
/// let credentials = Credentials::new("AKID", "s3cr3t-value");
/// assert_eq!(credentials.access_key(), "AKID");
/// assert!(!format!("{credentials:?}").contains("s3cr3t-value"));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_key: String,
    secret_key: String,
}

impl Credentials {
    /// Create a credential pair.
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// The access key ID, sent in clear inside the `Credential=` component.
    #[must_use]
    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    /// The secret key, only ever fed into the signing-key derivation.
    #[must_use]
    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}
