//! Content-addressed cache keys

use sha2::{Digest, Sha256};
use std::fmt;

/// Key for cache entries, derived from the query text.
///
/// The digest covers the raw bytes of the query with no normalization:
/// queries that differ by whitespace, case or comments are distinct
/// entries. `derive(q1) == derive(q2)` iff `q1 == q2` (collisions over a
/// 256-bit digest are treated as impossible).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    digest: [u8; 32],
}

impl CacheKey {
    /// Derive the key for a query string. Pure and deterministic, no I/O.
    pub fn derive(query: &str) -> Self {
        Self {
            digest: Sha256::digest(query.as_bytes()).into(),
        }
    }

    /// Parse a key back from its hex rendering (e.g. a cache file stem).
    pub fn from_hex(hex_str: &str) -> Option<Self> {
        let bytes = hex::decode(hex_str).ok()?;
        let digest: [u8; 32] = bytes.try_into().ok()?;
        Some(Self { digest })
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.digest))
    }
}
