//! Chain-specific types and error definitions.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, Bytes, Log, TxHash, U256};
use serde::{Serialize, Serializer};
use thiserror::Error;

// Re-export BlockchainConfig from config module to avoid duplication
pub use crate::config::schema::BlockchainConfig;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Identifier the ledger assigns to a newly created identity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(pub U256);

impl TokenId {
    pub fn as_u256(&self) -> U256 {
        self.0
    }
}

impl From<u64> for TokenId {
    fn from(id: u64) -> Self {
        Self(U256::from(id))
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // U256's Display is decimal
        write!(f, "{}", self.0)
    }
}

/// Error returned when a token id string is not a decimal integer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid token id '{0}': expected a decimal integer")]
pub struct ParseTokenIdError(pub String);

impl FromStr for TokenId {
    type Err = ParseTokenIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseTokenIdError(s.to_string()));
        }
        U256::from_str_radix(trimmed, 10)
            .map(TokenId)
            .map_err(|_| ParseTokenIdError(s.to_string()))
    }
}

impl Serialize for TokenId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// No configured endpoint could be reached.
    #[error("Gateway unavailable: {0}")]
    Unavailable(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// The node answered but refused the request.
    #[error("Ledger rejected request: {0}")]
    Rejected(String),

    /// Transaction was not confirmed within the configured budget.
    #[error("Transaction {tx_hash} not confirmed within {waited_ms} ms")]
    ConfirmationTimeout { tx_hash: TxHash, waited_ms: u64 },

    /// The ledger's validation rejected the state change.
    #[error("Transaction reverted{}: {reason}", tx_hash.map(|h| format!(" ({h})")).unwrap_or_default())]
    Reverted {
        tx_hash: Option<TxHash>,
        reason: String,
    },

    /// The wait was cancelled before the ledger reported finality; the
    /// transaction may still confirm.
    #[error("Outcome of transaction {tx_hash} unknown: wait cancelled before finality")]
    UnknownOutcome { tx_hash: TxHash },

    /// Cancellation was already requested; nothing was broadcast.
    #[error("{operation} not submitted: cancellation already requested")]
    Cancelled { operation: &'static str },

    /// Invalid private key format or missing signing identity.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// The transaction could not be signed.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Gas price exceeded maximum allowed.
    #[error("Gas price {current_gwei} gwei exceeds maximum {max_gwei} gwei")]
    GasPriceTooHigh { current_gwei: u64, max_gwei: u64 },

    /// Submission ordering was superseded by another transaction.
    #[error("Nonce error: {0}")]
    Nonce(String),

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// Contract return data could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Gateway construction received an unusable setting.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl BlockchainError {
    /// True when the ledger may still apply the submitted transaction.
    pub fn is_indeterminate(&self) -> bool {
        matches!(
            self,
            BlockchainError::ConfirmationTimeout { .. } | BlockchainError::UnknownOutcome { .. }
        )
    }
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// Transaction confirmation status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationStatus {
    /// Transaction is pending in mempool.
    Pending,
    /// Transaction has been mined but not enough confirmations.
    Confirming { current: u64, required: u64 },
    /// Transaction is confirmed with required block depth.
    Confirmed { block_number: u64 },
    /// Transaction failed or was dropped.
    Failed(String),
}

impl ConfirmationStatus {
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            ConfirmationStatus::Confirmed { .. } | ConfirmationStatus::Failed(_)
        )
    }
}

/// Where a state-changing call is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallTarget {
    /// The configured identity contract.
    Contract,
    /// The signer's own address; used for anchoring opaque data.
    SelfAnchor,
}

/// An encoded ledger operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerCall {
    /// Operation name for logs and metrics.
    pub operation: &'static str,
    pub target: CallTarget,
    pub input: Bytes,
}

/// Reference to a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionHandle {
    pub hash: TxHash,
    pub operation: &'static str,
    pub status: ConfirmationStatus,
}

impl TransactionHandle {
    pub fn pending(hash: TxHash, operation: &'static str) -> Self {
        Self {
            hash,
            operation,
            status: ConfirmationStatus::Pending,
        }
    }
}

/// A mined transaction as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    /// False when execution reverted.
    pub success: bool,
    pub logs: Vec<Log>,
}

/// A receipt that reached the configured confirmation depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub confirmations: u64,
    pub logs: Vec<Log>,
}

impl ConfirmedReceipt {
    /// Logs emitted by `address`.
    pub fn logs_from(&self, address: Address) -> impl Iterator<Item = &Log> {
        self.logs.iter().filter(move |log| log.address == address)
    }
}
