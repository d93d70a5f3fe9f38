//! Key normalizers
//!
//! Normalizers map user-supplied strings to the canonical form stored in an
//! index, so that lookups and searches compare like with like. Every
//! normalizer is idempotent: applying it to its own output is a no-op.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::countries;

/// Normalization applied to index keys and query terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Normalizer {
    /// Trim whitespace and lowercase
    Fold,
    /// Resolve to an ISO 3166-1 alpha-2 code, or fold if unknown
    Country,
    /// Reduce to the host name, or "" if the input is not a URL
    Url,
}

impl Normalizer {
    /// Apply the normalizer
    pub fn apply(&self, s: &str) -> String {
        match self {
            Normalizer::Fold => normalize(s),
            Normalizer::Country => normalize_country(s),
            Normalizer::Url => normalize_url(s),
        }
    }
}

/// Apply an optional normalizer, passing the key through unchanged if absent
pub fn apply(norm: Option<Normalizer>, s: &str) -> String {
    match norm {
        Some(n) => n.apply(s),
        None => s.to_string(),
    }
}

/// Trim surrounding whitespace and lowercase.
pub fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Alpha-2 code of the country named by `s`, or `normalize(s)` if unknown.
pub fn normalize_country(s: &str) -> String {
    let folded = normalize(s);
    match countries::find(&folded) {
        Some(alpha2) => alpha2.to_string(),
        None => folded,
    }
}

/// Host name of the URL in `s`, or "" if `s` is not a URL.
///
/// Input without a scheme is read as `http://`, so a bare host name such as
/// `example.com` normalizes to itself. Input containing whitespace is never
/// a URL.
pub fn normalize_url(s: &str) -> String {
    let folded = normalize(s);
    if folded.is_empty() || folded.chars().any(char::is_whitespace) {
        return String::new();
    }

    let parsed = if folded.contains("://") {
        Url::parse(&folded)
    } else {
        Url::parse(&format!("http://{}", folded))
    };

    match parsed {
        Ok(u) => u.host_str().map(str::to_string).unwrap_or_default(),
        Err(_) => String::new(),
    }
}
