//! Participant addresses.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Opaque participant address.
///
/// String-backed, equality-comparable, hashable. Carries no mutable
/// state — every component keys its own state by `IdentityKey` and
/// owns that state exclusively.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IdentityKey(String);

impl IdentityKey {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Derive an address from public key material.
    ///
    /// `MRT-` followed by the first 20 hex chars of SHA-256(key).
    pub fn derive(public_key: &[u8]) -> Self {
        let digest = Sha256::digest(public_key);
        let hex = hex::encode_upper(digest);
        Self(format!("MRT-{}", &hex[..20]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IdentityKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for IdentityKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}
