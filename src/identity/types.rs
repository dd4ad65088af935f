//! Identity and alert domain types.

use alloy::primitives::TxHash;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::blockchain::types::TokenId;
use crate::commitment::Commitment;
use crate::identity::error::IdentityError;

/// Attributes of a new identity record.
///
/// Held only for the duration of one call; the ledger stores the commitment,
/// never these values.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationRequest {
    pub subject_id: String,
    /// Digest of the primary identity document.
    pub secondary_id_hash: String,
    /// Digest of the secondary identity document.
    pub tertiary_id_hash: String,
    /// Unix seconds after which the identity lapses.
    pub valid_until: u64,
}

impl CreationRequest {
    /// The structured value the commitment is computed over.
    ///
    /// `created_at_ms` salts the commitment so repeated creations for the
    /// same subject cannot be linked.
    pub fn commitment_payload(&self, created_at_ms: u64) -> Value {
        json!({
            "subjectId": self.subject_id,
            "secondaryIdHash": self.secondary_id_hash,
            "tertiaryIdHash": self.tertiary_id_hash,
            "timestamp": created_at_ms,
        })
    }
}

// Attribute values stay out of logs even via `{:?}`.
impl std::fmt::Debug for CreationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreationRequest")
            .field("subject_id", &"<redacted>")
            .field("valid_until", &self.valid_until)
            .finish_non_exhaustive()
    }
}

/// WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

/// A safety alert to anchor on the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEntry {
    pub subject_id: String,
    pub alert_type: String,
    pub location: GeoPoint,
    /// Unix milliseconds when the alert was raised.
    pub timestamp_ms: u64,
}

impl AlertEntry {
    pub fn commitment_payload(&self) -> Value {
        json!({
            "subjectId": self.subject_id,
            "alertType": self.alert_type,
            "location": {
                "lat": self.location.lat,
                "lng": self.location.lng,
            },
            "timestamp": self.timestamp_ms,
        })
    }
}

/// Result of a confirmed identity creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedIdentity {
    pub token_id: TokenId,
    pub transaction_ref: TxHash,
    pub commitment: Commitment,
}

/// A fresh read of an identity record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    /// Commitment string as stored on the ledger.
    pub commitment: String,
    /// Unix seconds.
    pub valid_until: u64,
    pub is_active: bool,
}

impl VerificationResult {
    /// True when the record is active and `now_secs` is before its expiry.
    pub fn is_valid_at(&self, now_secs: u64) -> bool {
        self.is_active && now_secs < self.valid_until
    }
}

/// Lifecycle state of an identity as observed on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityState {
    NonExistent,
    Active,
    Deactivated,
}

/// Outcome of a best-effort alert anchor.
#[derive(Debug)]
pub enum AnchorReport {
    Anchored(TxHash),
    Failed(IdentityError),
}

impl AnchorReport {
    pub fn transaction_ref(&self) -> Option<TxHash> {
        match self {
            AnchorReport::Anchored(hash) => Some(*hash),
            AnchorReport::Failed(_) => None,
        }
    }

    pub fn is_anchored(&self) -> bool {
        matches!(self, AnchorReport::Anchored(_))
    }
}
