//! Wallet management and transaction signing.
//!
//! # Security
//! - Private keys come from configuration (normally the environment)
//! - Keys are never logged or serialized
//! - An ephemeral key is generated only in demo mode

use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::Address;
use alloy::consensus::TxEnvelope;
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::config::schema::SignerConfig;

/// Wallet for transaction signing with nonce management.
#[derive(Debug)]
pub struct Wallet {
    /// The underlying signer (private key).
    signer: PrivateKeySigner,
    /// Next nonce this process will use.
    nonce: Arc<AtomicU64>,
    /// Chain ID for EIP-155 replay protection.
    chain_id: u64,
    /// True when the key was generated at startup and is lost on restart.
    ephemeral: bool,
}

impl Wallet {
    /// Create a wallet from a hex-encoded private key string.
    ///
    /// # Arguments
    /// * `private_key_hex` - Hex string (with or without 0x prefix)
    /// * `chain_id` - Chain ID for transaction signing
    ///
    /// # Security
    /// The private key is parsed and stored securely. It is never logged.
    pub fn from_private_key(private_key_hex: &str, chain_id: u64) -> BlockchainResult<Self> {
        // Strip 0x prefix if present
        let key_hex = private_key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        // The parser's message never echoes the key.
        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| BlockchainError::Wallet(format!("Invalid private key format: {}", e)))?;
        let signer = signer.with_chain_id(Some(chain_id));

        tracing::info!(
            address = %signer.address(),
            chain_id = chain_id,
            "Wallet initialized"
        );

        Ok(Self {
            signer,
            nonce: Arc::new(AtomicU64::new(0)),
            chain_id,
            ephemeral: false,
        })
    }

    /// Generate a throwaway signing key.
    ///
    /// The identity cannot be recovered after the process exits.
    pub fn ephemeral(chain_id: u64) -> Self {
        let signer = PrivateKeySigner::random().with_chain_id(Some(chain_id));

        tracing::warn!(
            address = %signer.address(),
            chain_id = chain_id,
            "No signing key configured; generated an ephemeral key (demo mode)"
        );

        Self {
            signer,
            nonce: Arc::new(AtomicU64::new(0)),
            chain_id,
            ephemeral: true,
        }
    }

    /// Load the signing identity described by `config`.
    ///
    /// Falls back to [`Wallet::ephemeral`] only when demo mode is enabled.
    pub fn from_config(config: &SignerConfig, chain_id: u64) -> BlockchainResult<Self> {
        match config.private_key.as_ref().filter(|key| !key.is_empty()) {
            Some(key) => Self::from_private_key(key.expose(), chain_id),
            None if config.demo_mode => Ok(Self::ephemeral(chain_id)),
            None => Err(BlockchainError::Wallet(
                "No signing key configured and demo mode is disabled".to_string(),
            )),
        }
    }

    /// Get the wallet's address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Get the chain ID this wallet is configured for.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }

    /// Reserve the next nonce given the chain's pending transaction count.
    ///
    /// Concurrent callers receive distinct values; the local counter never
    /// falls behind the chain.
    pub fn reserve_nonce(&self, chain_pending: u64) -> u64 {
        let previous = self
            .nonce
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(current.max(chain_pending) + 1)
            })
            .unwrap_or(chain_pending);
        previous.max(chain_pending)
    }

    /// Set the nonce to a specific value (e.g., after a rejected submission).
    pub fn set_nonce(&self, nonce: u64) {
        self.nonce.store(nonce, Ordering::SeqCst);
    }

    /// Get current nonce without incrementing.
    pub fn current_nonce(&self) -> u64 {
        self.nonce.load(Ordering::SeqCst)
    }

    /// Sign a complete transaction request into a broadcastable envelope.
    pub async fn sign_transaction(&self, request: TransactionRequest) -> BlockchainResult<TxEnvelope> {
        let wallet = EthereumWallet::from(self.signer.clone());
        request
            .with_from(self.address())
            .build(&wallet)
            .await
            .map_err(|e| BlockchainError::Signing(e.to_string()))
    }
}

impl Clone for Wallet {
    fn clone(&self) -> Self {
        Self {
            signer: self.signer.clone(),
            nonce: self.nonce.clone(),
            chain_id: self.chain_id,
            ephemeral: self.ephemeral,
        }
    }
}
