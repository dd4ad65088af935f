//! JSON-RPC ledger gateway with timeout, failover and local signing.
//!
//! # Responsibilities
//! - Connect to JSON-RPC endpoints lazily, exactly once
//! - Load the signing identity
//! - Build, sign and broadcast contract calls
//! - Query receipts, blocks and contract state
//! - Handle timeouts and network errors gracefully

use alloy::eips::eip2718::Encodable2718;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use alloy::transports::{RpcError, TransportResult};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::timeout;

use crate::blockchain::gateway::LedgerGateway;
use crate::blockchain::types::{
    BlockchainConfig, BlockchainError, BlockchainResult, CallTarget, ChainId, LedgerCall,
    LedgerReceipt, TransactionHandle,
};
use crate::blockchain::wallet::Wallet;
use crate::config::schema::SignerConfig;
use crate::observability::metrics;

type SharedProvider = Arc<dyn Provider + Send + Sync>;

/// Ledger gateway backed by one primary and optional failover endpoints.
pub struct RpcGateway {
    /// Endpoint configuration.
    config: BlockchainConfig,
    /// Signing identity configuration; consumed on first connect.
    signer_config: SignerConfig,
    /// Parsed identity contract address.
    contract_address: Address,
    /// Request timeout duration.
    timeout_duration: Duration,
    /// Established on first use.
    connection: OnceCell<Connection>,
}

struct Connection {
    /// List of providers (primary + failovers).
    providers: Vec<SharedProvider>,
    wallet: Wallet,
}

impl RpcGateway {
    /// Create a gateway. No network traffic happens until first use.
    ///
    /// # Arguments
    /// * `config` - Endpoint configuration
    /// * `signer` - Signing identity configuration
    pub fn new(config: BlockchainConfig, signer: SignerConfig) -> BlockchainResult<Self> {
        let contract_address: Address = config.contract_address.parse().map_err(|e| {
            BlockchainError::InvalidConfig(format!(
                "Invalid contract address '{}': {}",
                config.contract_address, e
            ))
        })?;
        config.rpc_url.parse::<url::Url>().map_err(|e| {
            BlockchainError::InvalidConfig(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;

        Ok(Self {
            timeout_duration: Duration::from_secs(config.rpc_timeout_secs),
            config,
            signer_config: signer,
            contract_address,
            connection: OnceCell::new(),
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &BlockchainConfig {
        &self.config
    }

    /// True once `ensure_ready` has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.connection.initialized()
    }

    async fn connection(&self) -> BlockchainResult<&Connection> {
        // Concurrent callers wait on the first initializer; a failed attempt
        // leaves the cell empty so the next call retries.
        self.connection.get_or_try_init(|| self.connect()).await
    }

    async fn connect(&self) -> BlockchainResult<Connection> {
        let mut providers = Vec::new();

        // 1. Add primary provider
        let primary_url: url::Url = self.config.rpc_url.parse().map_err(|e| {
            BlockchainError::InvalidConfig(format!("Invalid RPC URL '{}': {}", self.config.rpc_url, e))
        })?;
        providers.push(Arc::new(ProviderBuilder::new().connect_http(primary_url)) as SharedProvider);

        // 2. Add failover providers
        for url_str in &self.config.failover_urls {
            if let Ok(url) = url_str.parse::<url::Url>() {
                providers.push(Arc::new(ProviderBuilder::new().connect_http(url)) as SharedProvider);
            } else {
                tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL");
            }
        }

        // 3. Verify chain ID matches configuration
        let chain_id = ChainId(
            self.with_failover(&providers, "get chain id", |p| async move {
                p.get_chain_id().await
            })
            .await?,
        );
        if chain_id.0 != self.config.chain_id {
            return Err(BlockchainError::ChainMismatch {
                expected: self.config.chain_id,
                actual: chain_id.0,
            });
        }

        // 4. Load the signing identity
        let wallet = Wallet::from_config(&self.signer_config, chain_id.0)?;

        tracing::info!(
            rpc_url = %self.config.rpc_url,
            failovers = providers.len() - 1,
            chain_id = chain_id.0,
            contract = %self.contract_address,
            signer = %wallet.address(),
            ephemeral_signer = wallet.is_ephemeral(),
            "Ledger gateway initialized"
        );

        Ok(Connection { providers, wallet })
    }

    /// Run `f` against each provider in order until one answers.
    ///
    /// Transport failures, timeouts and throttling responses move on to the
    /// next provider. Any other JSON-RPC error response ends the attempt:
    /// execution reverts become `Reverted`, everything else `Rejected`.
    async fn with_failover<T, F, Fut>(
        &self,
        providers: &[SharedProvider],
        operation: &'static str,
        f: F,
    ) -> BlockchainResult<T>
    where
        F: Fn(SharedProvider) -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        for (i, provider) in providers.iter().enumerate() {
            match timeout(self.timeout_duration, f(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(RpcError::ErrorResp(payload))) => {
                    match classify_refusal(payload.code, &payload.message) {
                        Refusal::Revert => {
                            return Err(BlockchainError::Reverted {
                                tx_hash: None,
                                reason: payload.message.to_string(),
                            });
                        }
                        Refusal::Throttled => {
                            tracing::warn!(
                                provider_idx = i,
                                operation,
                                code = payload.code,
                                "RPC provider throttled, trying next provider"
                            );
                        }
                        Refusal::Other => {
                            return Err(BlockchainError::Rejected(payload.message.to_string()));
                        }
                    }
                }
                Ok(Err(e)) => {
                    tracing::warn!(provider_idx = i, operation, error = %e, "RPC error, trying next provider");
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, operation, "RPC timeout, trying next provider");
                }
            }
        }
        Err(BlockchainError::Unavailable(format!(
            "All RPC providers failed to {}",
            operation
        )))
    }

    fn resolve_target(&self, target: CallTarget, wallet: &Wallet) -> Address {
        match target {
            CallTarget::Contract => self.contract_address,
            CallTarget::SelfAnchor => wallet.address(),
        }
    }

    /// Get current gas price in wei, with the configured multiplier applied.
    async fn gas_price(&self, conn: &Connection) -> BlockchainResult<u128> {
        let gas_price = self
            .with_failover(&conn.providers, "get gas price", |p| async move {
                p.get_gas_price().await
            })
            .await?;
        let gas_price_gwei = gas_price / 1_000_000_000;

        // Check against max gas price
        if gas_price_gwei > self.config.max_gas_price_gwei as u128 {
            return Err(BlockchainError::GasPriceTooHigh {
                current_gwei: gas_price_gwei as u64,
                max_gwei: self.config.max_gas_price_gwei,
            });
        }

        // Apply multiplier for safety margin
        Ok((gas_price as f64 * self.config.gas_price_multiplier) as u128)
    }

    /// Send signed bytes; any endpoint may take them since the hash is fixed.
    async fn broadcast(&self, conn: &Connection, raw: Vec<u8>) -> BlockchainResult<()> {
        let result = self
            .with_failover(&conn.providers, "send raw transaction", |p| {
                let raw = raw.clone();
                async move { p.send_raw_transaction(&raw).await.map(|_| ()) }
            })
            .await;

        match result {
            Err(BlockchainError::Rejected(message)) => {
                let lowered = message.to_lowercase();
                if lowered.contains("already known") {
                    // A previous attempt reached the pool.
                    Ok(())
                } else if lowered.contains("nonce") {
                    Err(BlockchainError::Nonce(message))
                } else {
                    Err(BlockchainError::Rejected(message))
                }
            }
            other => other,
        }
    }
}

/// How a JSON-RPC error response is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Refusal {
    /// The EVM executed the call and it reverted.
    Revert,
    /// Rate limit or quota; another provider may answer.
    Throttled,
    Other,
}

/// JSON-RPC code for an execution revert (EIP-1474 / geth).
const CODE_EXECUTION_REVERTED: i64 = 3;
/// JSON-RPC code for "limit exceeded".
const CODE_LIMIT_EXCEEDED: i64 = -32005;

fn classify_refusal(code: i64, message: &str) -> Refusal {
    let lowered = message.to_lowercase();
    if code == CODE_EXECUTION_REVERTED || lowered.contains("execution reverted") {
        Refusal::Revert
    } else if code == CODE_LIMIT_EXCEEDED
        || lowered.contains("rate limit")
        || lowered.contains("too many requests")
    {
        Refusal::Throttled
    } else {
        Refusal::Other
    }
}

fn to_ledger_receipt(receipt: TransactionReceipt) -> Option<LedgerReceipt> {
    let block_number = receipt.block_number?;
    Some(LedgerReceipt {
        tx_hash: receipt.transaction_hash,
        block_number,
        success: receipt.status(),
        logs: receipt
            .inner
            .logs()
            .iter()
            .map(|log| log.inner.clone())
            .collect(),
    })
}

#[async_trait]
impl LedgerGateway for RpcGateway {
    async fn ensure_ready(&self) -> BlockchainResult<()> {
        self.connection().await.map(|_| ())
    }

    async fn submit(&self, call: LedgerCall) -> BlockchainResult<TransactionHandle> {
        let conn = self.connection().await?;
        let wallet = &conn.wallet;
        let from = wallet.address();
        let to = self.resolve_target(call.target, wallet);

        let chain_pending = self
            .with_failover(&conn.providers, "get transaction count", |p| async move {
                p.get_transaction_count(from).pending().await
            })
            .await?;
        let gas_price = self.gas_price(conn).await?;

        // Gas estimation executes the call; a revert here is the ledger's
        // own validation refusing the state change (`Reverted` from
        // `with_failover`). Other refusals stay `Rejected`.
        let estimate = TransactionRequest::default()
            .with_from(from)
            .with_to(to)
            .with_input(call.input.clone());
        let gas_limit = self
            .with_failover(&conn.providers, "estimate gas", |p| {
                let tx = estimate.clone();
                async move { p.estimate_gas(tx).await }
            })
            .await?;
        let gas_limit = gas_limit.saturating_add(gas_limit / 5);

        let nonce = wallet.reserve_nonce(chain_pending);
        let request = TransactionRequest::default()
            .with_to(to)
            .with_value(U256::ZERO)
            .with_input(call.input)
            .with_nonce(nonce)
            .with_gas_price(gas_price)
            .with_chain_id(wallet.chain_id())
            .with_gas_limit(gas_limit);

        let envelope = match wallet.sign_transaction(request).await {
            Ok(envelope) => envelope,
            Err(e) => {
                wallet.set_nonce(chain_pending);
                return Err(e);
            }
        };
        let tx_hash = *envelope.tx_hash();

        if let Err(e) = self.broadcast(conn, envelope.encoded_2718()).await {
            // Give the reserved nonce back so the next submission does not leave a gap.
            wallet.set_nonce(chain_pending);
            return Err(e);
        }

        tracing::info!(
            operation = call.operation,
            tx_hash = %tx_hash,
            nonce,
            gas_limit,
            "Transaction submitted"
        );
        Ok(TransactionHandle::pending(tx_hash, call.operation))
    }

    async fn read(&self, call: LedgerCall) -> BlockchainResult<Bytes> {
        let conn = self.connection().await?;
        let to = self.resolve_target(call.target, &conn.wallet);
        let request = TransactionRequest::default().with_to(to).with_input(call.input);

        self.with_failover(&conn.providers, "call contract", |p| {
            let tx = request.clone();
            async move { p.call(tx).await }
        })
        .await
    }

    async fn receipt(&self, tx_hash: TxHash) -> BlockchainResult<Option<LedgerReceipt>> {
        let conn = self.connection().await?;
        let receipt = self
            .with_failover(&conn.providers, "get receipt", |p| async move {
                p.get_transaction_receipt(tx_hash).await
            })
            .await?;
        Ok(receipt.and_then(to_ledger_receipt))
    }

    async fn block_number(&self) -> BlockchainResult<u64> {
        let conn = self.connection().await?;
        self.with_failover(&conn.providers, "get block number", |p| async move {
            p.get_block_number().await
        })
        .await
    }

    async fn signer_address(&self) -> BlockchainResult<Address> {
        Ok(self.connection().await?.wallet.address())
    }

    fn contract_address(&self) -> Address {
        self.contract_address
    }

    /// Check if the ledger is reachable and healthy.
    ///
    /// Returns true if we can query the block number.
    async fn is_healthy(&self) -> bool {
        let healthy = self.block_number().await.is_ok();
        // Record health metric
        metrics::record_backend_health("ledger_rpc", healthy);
        healthy
    }
}

impl std::fmt::Debug for RpcGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcGateway")
            .field("rpc_url", &self.config.rpc_url)
            .field("chain_id", &self.config.chain_id)
            .field("contract", &self.contract_address)
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
