//! Facade error taxonomy.

use thiserror::Error;

use crate::blockchain::events::ExtractionError;
use crate::blockchain::types::{BlockchainError, TokenId};

/// The underlying reason a facade operation failed.
#[derive(Debug, Error)]
pub enum LedgerFailure {
    #[error(transparent)]
    Blockchain(#[from] BlockchainError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// The ledger holds no record for this token id.
    #[error("no identity record for token {token_id}")]
    UnknownToken { token_id: TokenId },

    /// The request was rejected before reaching the ledger.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Stable classification of a failure cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    GatewayUnavailable,
    SigningFailure,
    ConfirmationTimeout,
    TransactionReverted,
    UnknownOutcome,
    /// Cancellation was requested before submission; nothing was sent.
    Cancelled,
    ExtractionNotFound,
    UnknownToken,
    InvalidRequest,
    Other,
}

impl LedgerFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            LedgerFailure::Blockchain(e) => match e {
                BlockchainError::Unavailable(_) | BlockchainError::Timeout(_) => {
                    FailureKind::GatewayUnavailable
                }
                BlockchainError::Signing(_) | BlockchainError::Wallet(_) => {
                    FailureKind::SigningFailure
                }
                BlockchainError::ConfirmationTimeout { .. } => FailureKind::ConfirmationTimeout,
                BlockchainError::Reverted { .. } => FailureKind::TransactionReverted,
                BlockchainError::UnknownOutcome { .. } => FailureKind::UnknownOutcome,
                BlockchainError::Cancelled { .. } => FailureKind::Cancelled,
                _ => FailureKind::Other,
            },
            LedgerFailure::Extraction(ExtractionError::NotFound { .. }) => {
                FailureKind::ExtractionNotFound
            }
            LedgerFailure::Extraction(_) => FailureKind::Other,
            LedgerFailure::UnknownToken { .. } => FailureKind::UnknownToken,
            LedgerFailure::InvalidRequest(_) => FailureKind::InvalidRequest,
        }
    }
}

/// Error returned by [`IdentityLedgerClient`](crate::identity::IdentityLedgerClient),
/// one variant per operation family.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("failed to create identity on ledger")]
    Create(#[source] LedgerFailure),

    #[error("failed to read identity from ledger")]
    Read(#[source] LedgerFailure),

    #[error("failed to write identity state to ledger")]
    Write(#[source] LedgerFailure),

    #[error("failed to anchor alert on ledger")]
    Log(#[source] LedgerFailure),
}

impl IdentityError {
    pub fn cause(&self) -> &LedgerFailure {
        match self {
            IdentityError::Create(c)
            | IdentityError::Read(c)
            | IdentityError::Write(c)
            | IdentityError::Log(c) => c,
        }
    }

    pub fn kind(&self) -> FailureKind {
        self.cause().kind()
    }

    /// True when the ledger may still apply the transaction; reconcile with
    /// a later read before retrying.
    pub fn is_indeterminate(&self) -> bool {
        matches!(self.cause(), LedgerFailure::Blockchain(e) if e.is_indeterminate())
    }
}

/// Result type for facade operations.
pub type IdentityResult<T> = Result<T, IdentityError>;

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::TxHash;
    use std::error::Error as _;

    #[test]
    fn test_cause_is_source() {
        let err = IdentityError::Write(LedgerFailure::from(BlockchainError::Reverted {
            tx_hash: None,
            reason: "already inactive".into(),
        }));
        assert_eq!(err.kind(), FailureKind::TransactionReverted);
        let source = err.source().unwrap().to_string();
        assert!(source.contains("already inactive"));
    }

    #[test]
    fn test_kind_mapping() {
        let cases = [
            (
                LedgerFailure::from(BlockchainError::Unavailable("down".into())),
                FailureKind::GatewayUnavailable,
            ),
            (
                LedgerFailure::from(BlockchainError::Signing("bad".into())),
                FailureKind::SigningFailure,
            ),
            (
                LedgerFailure::from(BlockchainError::UnknownOutcome {
                    tx_hash: TxHash::ZERO,
                }),
                FailureKind::UnknownOutcome,
            ),
            (
                LedgerFailure::from(BlockchainError::Cancelled {
                    operation: "createTouristID",
                }),
                FailureKind::Cancelled,
            ),
            (
                LedgerFailure::UnknownToken {
                    token_id: TokenId::from(9),
                },
                FailureKind::UnknownToken,
            ),
            (
                LedgerFailure::from(BlockchainError::Decode("x".into())),
                FailureKind::Other,
            ),
        ];
        for (failure, kind) in cases {
            assert_eq!(failure.kind(), kind, "{failure}");
        }
    }

    #[test]
    fn test_indeterminate() {
        let timeout = IdentityError::Create(LedgerFailure::from(
            BlockchainError::ConfirmationTimeout {
                tx_hash: TxHash::ZERO,
                waited_ms: 120_000,
            },
        ));
        assert!(timeout.is_indeterminate());
        assert!(!IdentityError::Read(LedgerFailure::InvalidRequest("x".into())).is_indeterminate());
    }
}
