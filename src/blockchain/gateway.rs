//! The capability set the identity client needs from a ledger endpoint.

use alloy::primitives::{Address, Bytes, TxHash};
use async_trait::async_trait;

use crate::blockchain::types::{BlockchainResult, LedgerCall, LedgerReceipt, TransactionHandle};

/// Connection to a ledger plus the signing identity used for writes.
///
/// Implementations initialize lazily and must tolerate concurrent
/// `ensure_ready` calls.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Connect and load the signing identity if not done yet. Idempotent.
    async fn ensure_ready(&self) -> BlockchainResult<()>;

    /// Sign and broadcast a state-changing call.
    async fn submit(&self, call: LedgerCall) -> BlockchainResult<TransactionHandle>;

    /// Execute a read-only call and return the raw return data.
    async fn read(&self, call: LedgerCall) -> BlockchainResult<Bytes>;

    /// Look up a receipt; `None` while the transaction is unmined.
    async fn receipt(&self, tx_hash: TxHash) -> BlockchainResult<Option<LedgerReceipt>>;

    /// Latest block number.
    async fn block_number(&self) -> BlockchainResult<u64>;

    /// Address of the signing identity.
    async fn signer_address(&self) -> BlockchainResult<Address>;

    /// Address of the identity contract.
    fn contract_address(&self) -> Address;

    /// True when the endpoint answers.
    async fn is_healthy(&self) -> bool {
        self.block_number().await.is_ok()
    }
}
