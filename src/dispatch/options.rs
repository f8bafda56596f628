//! Per-request options.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Query parameters and header overrides for one logical request.
///
/// Both maps are ordered so the serialized form, and therefore the cache
/// key, does not depend on insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOptions {
    #[serde(default)]
    pub query: BTreeMap<String, String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add or override a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Deterministic serialization used in cache keys.
    pub fn fingerprint(&self) -> String {
        if self.query.is_empty() && self.headers.is_empty() {
            return String::new();
        }
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_fingerprint() {
        assert_eq!(RequestOptions::new().fingerprint(), "");
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = RequestOptions::new().header("X-Lang", "en").query("page", "2");
        let b = RequestOptions::new().query("page", "2").header("x-lang", "en");
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(
            a.fingerprint(),
            r#"{"query":{"page":"2"},"headers":{"x-lang":"en"}}"#
        );
    }
}
