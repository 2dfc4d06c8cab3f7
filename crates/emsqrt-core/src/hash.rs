//! Deterministic hashing of plan/config values for `RunManifest` provenance.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A 32-byte blake3 digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Hash a serializable value via its canonical JSON encoding. JSON (rather
/// than a bincode-style binary format) keeps the hash stable across minor
/// struct field reordering as long as `serde_json`'s map ordering is stable,
/// which it is for our `BTreeMap`-backed plan types.
pub fn hash_serde<T: Serialize>(value: &T) -> Result<Hash256, Error> {
    let bytes = serde_json::to_vec(value)?;
    Ok(Hash256(*blake3::hash(&bytes).as_bytes()))
}
