//! Token id extraction from creation receipts.

use alloy::primitives::{Address, U256};
use alloy::sol_types::SolEvent;
use thiserror::Error;

use crate::blockchain::contract::TouristIDCreated;
use crate::blockchain::types::{ConfirmedReceipt, TokenId};

/// Why no token id could be read from a receipt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    /// The receipt carries no creation event from the identity contract.
    #[error("no TouristIDCreated event from {contract} in transaction {tx_hash}")]
    NotFound {
        contract: Address,
        tx_hash: alloy::primitives::TxHash,
    },

    /// A creation event was present but its token id topic was missing.
    #[error("malformed TouristIDCreated event: {0}")]
    Malformed(String),
}

/// Read the token id of the identity minted by `receipt`.
///
/// Only logs emitted by `contract` are considered. The first matching event
/// wins; a creation transaction mints exactly one identity.
pub fn extract_token_id(
    receipt: &ConfirmedReceipt,
    contract: Address,
) -> Result<TokenId, ExtractionError> {
    let event = receipt
        .logs_from(contract)
        .find(|log| log.topics().first() == Some(&TouristIDCreated::SIGNATURE_HASH))
        .ok_or(ExtractionError::NotFound {
            contract,
            tx_hash: receipt.tx_hash,
        })?;

    // topics: [signature, tokenId, tourist]
    let topic = event.topics().get(1).ok_or_else(|| {
        ExtractionError::Malformed(format!(
            "expected indexed tokenId, found {} topics",
            event.topics().len()
        ))
    })?;

    Ok(TokenId(U256::from_be_bytes(topic.0)))
}
