//! Identifier whitelisting.
//!
//! Bucket and remote names arrive from the notification feed and the
//! environment, and end up inside file paths, map keys and store identifiers
//! of the rendered configuration. Every such name must pass [`is_valid_name`]
//! first; anything else is dropped.

use tracing::warn;

/// Maximum identifier length in characters.
const MAX_NAME_LEN: usize = 30;

/// Check whether `name` is a safe identifier.
///
/// Rules:
/// - 1-30 characters long
/// - Only lowercase letters, digits and hyphens
/// - Must not start or end with a hyphen
/// - Must not contain two consecutive hyphens
///
/// # Examples
///
/// ```
/// use proxysync_core::validation::is_valid_name;
///
/// assert!(is_valid_name("prod-eu-1"));
/// assert!(!is_valid_name("-prod"));
/// assert!(!is_valid_name("prod--eu"));
/// assert!(!is_valid_name("../etc"));
/// ```
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    let len = name.len();
    if !(1..=MAX_NAME_LEN).contains(&len) {
        return false;
    }

    if !name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        return false;
    }

    !name.starts_with('-') && !name.ends_with('-') && !name.contains("--")
}

/// Keep only the valid names, warning about each rejected one.
///
/// `origin` names where the identifiers came from, for the log line.
pub fn retain_valid_names<'a>(
    names: impl IntoIterator<Item = &'a str>,
    origin: &str,
) -> Vec<String> {
    names
        .into_iter()
        .filter(|name| {
            let valid = is_valid_name(name);
            if !valid {
                warn!(name, origin, "rejected invalid identifier");
            }
            valid
        })
        .map(ToOwned::to_owned)
        .collect()
}
