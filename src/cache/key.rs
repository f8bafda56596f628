//! Cache key derivation.

use std::fmt;

use crate::dispatch::RequestOptions;
use crate::registry::Capability;

/// Logical request identity: capability, path and serialized options.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(capability: &Capability, path: &str, options: &RequestOptions) -> Self {
        Self(format!("{}|{}|{}", capability, path, options.fingerprint()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
