//! Tourist identity facade over the ledger.
//!
//! # Data Flow
//! ```text
//! CreationRequest / AlertEntry
//!     → commitment (canonical JSON, keccak256)
//!     → blockchain::transaction (submit, confirm)
//!     → blockchain::events (token id, creation only)
//!     → CreatedIdentity / TxHash / IdentityError
//! ```

pub mod client;
pub mod error;
pub mod types;

pub use client::IdentityLedgerClient;
pub use error::{FailureKind, IdentityError, IdentityResult, LedgerFailure};
pub use types::{
    AlertEntry, AnchorReport, CreatedIdentity, CreationRequest, GeoPoint, IdentityState,
    VerificationResult,
};
