//! Content commitments over identity and alert payloads.
//!
//! A commitment is `keccak256(canonical_json(payload))`, the same digest the
//! ledger uses natively. See [`canonical`] for the byte encoding.

pub mod canonical;

use std::fmt;
use std::str::FromStr;

use alloy::primitives::{hex, keccak256, B256};
use serde::{Serialize, Serializer};
use serde_json::Value;

pub use canonical::to_canonical_string;

/// A 32-byte Keccak-256 digest binding a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Commitment(B256);

impl Commitment {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(B256::from(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }

    pub fn as_b256(&self) -> B256 {
        self.0
    }

    /// Compare against the string form a ledger record stores.
    pub fn matches(&self, stored: &str) -> bool {
        stored
            .parse::<Commitment>()
            .is_ok_and(|other| other == *self)
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_prefixed(self.0))
    }
}

impl FromStr for Commitment {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<B256>().map(Commitment)
    }
}

impl Serialize for Commitment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Commit to a structured payload.
pub fn commit(payload: &Value) -> Commitment {
    Commitment(keccak256(to_canonical_string(payload).as_bytes()))
}
