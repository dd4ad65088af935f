//! Ledger integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment Variables (private key, RPC URL, contract address)
//!     → wallet.rs (key loading, nonce reservation, signing)
//!     → client.rs (lazy RPC connection with timeouts and failover)
//!     → contract.rs (call encoding, record decoding)
//!     → transaction.rs (submit once, poll for confirmation)
//!     → events.rs (token id from the creation receipt)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from configuration, normally environment variables
//! - Never log private keys or payload contents
//! - All RPC calls have configurable timeouts
//! - State-changing calls are never resubmitted automatically

pub mod client;
pub mod contract;
pub mod events;
pub mod gateway;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::RpcGateway;
pub use events::{extract_token_id, ExtractionError};
pub use gateway::LedgerGateway;
pub use transaction::{ConfirmationPolicy, TxSubmitter, UnresolvedTransaction};
pub use types::{
    BlockchainConfig, BlockchainError, BlockchainResult, ChainId, ConfirmationStatus,
    ConfirmedReceipt, TokenId, TransactionHandle,
};
pub use wallet::Wallet;
