//! Transaction submission and confirmation monitoring.
//!
//! # Responsibilities
//! - Submit a state-changing call through the gateway (exactly once)
//! - Poll for the receipt with backoff inside one overall budget
//! - Interpret finality: confirmed, reverted, timed out, or unknown
//! - Track handles whose outcome is still open
//!
//! Submissions are never retried here: resending a state-changing call
//! risks applying it twice.

use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy::primitives::TxHash;
use dashmap::DashMap;
use tokio::time::{sleep, timeout};

use crate::blockchain::gateway::LedgerGateway;
use crate::blockchain::types::{
    BlockchainError, BlockchainResult, ConfirmationStatus, ConfirmedReceipt, LedgerCall,
    TransactionHandle,
};
use crate::config::schema::{BlockchainConfig, ConfirmationConfig};
use crate::lifecycle::Cancellation;
use crate::observability::metrics;
use crate::resilience::backoff::PollSchedule;

/// How a confirmation wait behaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    /// Blocks required, counting the inclusion block.
    pub required_confirmations: u64,
    /// Overall budget for one wait.
    pub timeout: Duration,
    pub poll_base_ms: u64,
    pub poll_max_ms: u64,
}

impl ConfirmationPolicy {
    pub fn from_config(ledger: &BlockchainConfig, confirmation: &ConfirmationConfig) -> Self {
        Self {
            required_confirmations: ledger.confirmation_blocks.max(1),
            timeout: Duration::from_secs(confirmation.timeout_secs),
            poll_base_ms: confirmation.poll_base_ms,
            poll_max_ms: confirmation.poll_max_ms,
        }
    }
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self::from_config(&BlockchainConfig::default(), &ConfirmationConfig::default())
    }
}

/// A transaction whose outcome is not yet known to this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedTransaction {
    pub hash: TxHash,
    pub operation: &'static str,
    pub status: ConfirmationStatus,
}

/// Submits calls and waits for their finality.
#[derive(Clone)]
pub struct TxSubmitter {
    gateway: Arc<dyn LedgerGateway>,
    policy: ConfirmationPolicy,
    cancellation: Cancellation,
    /// Handles submitted but not yet confirmed or reverted.
    in_flight: Arc<DashMap<TxHash, UnresolvedTransaction>>,
}

impl TxSubmitter {
    /// Create a new submitter.
    pub fn new(gateway: Arc<dyn LedgerGateway>, policy: ConfirmationPolicy) -> Self {
        Self {
            gateway,
            policy,
            cancellation: Cancellation::new(),
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Use `cancellation` to interrupt confirmation waits.
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn policy(&self) -> &ConfirmationPolicy {
        &self.policy
    }

    pub fn cancellation(&self) -> &Cancellation {
        &self.cancellation
    }

    /// Submit `call` and wait for it to reach the required depth.
    pub async fn execute(&self, call: LedgerCall) -> BlockchainResult<ConfirmedReceipt> {
        let handle = self.submit(call).await?;
        self.await_confirmation(&handle).await
    }

    /// Submit `call` once and register the pending handle.
    ///
    /// Fails with `Cancelled`, without broadcasting, once cancellation has
    /// been requested.
    pub async fn submit(&self, call: LedgerCall) -> BlockchainResult<TransactionHandle> {
        let operation = call.operation;
        if self.cancellation.is_cancelled() {
            tracing::warn!(operation, "Cancellation requested; not submitting");
            return Err(BlockchainError::Cancelled { operation });
        }
        let handle = self.gateway.submit(call).await?;
        metrics::record_submission(operation);

        self.in_flight.insert(
            handle.hash,
            UnresolvedTransaction {
                hash: handle.hash,
                operation: handle.operation,
                status: ConfirmationStatus::Pending,
            },
        );
        Ok(handle)
    }

    /// Wait for `handle` to be confirmed.
    ///
    /// # Errors
    /// - `Reverted` when the mined transaction failed
    /// - `ConfirmationTimeout` when the budget runs out
    /// - `UnknownOutcome` when the wait is cancelled first
    pub async fn await_confirmation(
        &self,
        handle: &TransactionHandle,
    ) -> BlockchainResult<ConfirmedReceipt> {
        let started = Instant::now();

        let outcome = tokio::select! {
            waited = timeout(self.policy.timeout, self.poll_until_final(handle)) => match waited {
                Ok(result) => result,
                Err(_) => Err(BlockchainError::ConfirmationTimeout {
                    tx_hash: handle.hash,
                    waited_ms: u64::try_from(self.policy.timeout.as_millis()).unwrap_or(u64::MAX),
                }),
            },
            _ = self.cancellation.cancelled() => Err(BlockchainError::UnknownOutcome {
                tx_hash: handle.hash,
            }),
        };

        match &outcome {
            Ok(receipt) => {
                self.in_flight.remove(&handle.hash);
                metrics::record_confirmation_latency(handle.operation, started.elapsed());
                tracing::info!(
                    tx_hash = %handle.hash,
                    block_number = receipt.block_number,
                    confirmations = receipt.confirmations,
                    "Transaction confirmed"
                );
            }
            Err(BlockchainError::Reverted { .. }) => {
                self.in_flight.remove(&handle.hash);
                tracing::warn!(tx_hash = %handle.hash, operation = handle.operation, "Transaction reverted");
            }
            Err(e) => {
                tracing::warn!(
                    tx_hash = %handle.hash,
                    operation = handle.operation,
                    error = %e,
                    "Transaction outcome unresolved; it may still confirm"
                );
            }
        }
        metrics::record_unresolved(self.in_flight.len());
        outcome
    }

    async fn poll_until_final(&self, handle: &TransactionHandle) -> BlockchainResult<ConfirmedReceipt> {
        let required = self.policy.required_confirmations;
        let schedule = PollSchedule::new(self.policy.poll_base_ms, self.policy.poll_max_ms);

        let mut attempt: u32 = 0;

        loop {
            sleep(schedule.delay(attempt)).await;
            attempt = attempt.saturating_add(1);

            // Get the receipt
            let receipt = match self.gateway.receipt(handle.hash).await {
                Ok(Some(r)) => r,
                Ok(None) => {
                    tracing::debug!(tx_hash = %handle.hash, attempt, "Transaction pending");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(tx_hash = %handle.hash, error = %e, "Receipt poll failed; retrying");
                    continue;
                }
            };

            // Check if transaction succeeded
            if !receipt.success {
                self.set_status(handle.hash, ConfirmationStatus::Failed("reverted".to_string()));
                return Err(BlockchainError::Reverted {
                    tx_hash: Some(handle.hash),
                    reason: format!("{} transaction reverted in block {}", handle.operation, receipt.block_number),
                });
            }

            // Get current block number
            let current_block = match self.gateway.block_number().await {
                Ok(n) => n,
                Err(e) => {
                    tracing::warn!(tx_hash = %handle.hash, error = %e, "Block number poll failed; retrying");
                    continue;
                }
            };
            let confirmations = current_block.saturating_sub(receipt.block_number) + 1;

            if confirmations >= required {
                self.set_status(
                    handle.hash,
                    ConfirmationStatus::Confirmed {
                        block_number: receipt.block_number,
                    },
                );
                return Ok(ConfirmedReceipt {
                    tx_hash: receipt.tx_hash,
                    block_number: receipt.block_number,
                    confirmations,
                    logs: receipt.logs,
                });
            }

            self.set_status(
                handle.hash,
                ConfirmationStatus::Confirming {
                    current: confirmations,
                    required,
                },
            );
            tracing::debug!(
                tx_hash = %handle.hash,
                confirmations = confirmations,
                required = required,
                "Waiting for confirmations"
            );
        }
    }

    fn set_status(&self, hash: TxHash, status: ConfirmationStatus) {
        if let Some(mut entry) = self.in_flight.get_mut(&hash) {
            entry.status = status;
        }
    }

    /// Transactions submitted by this process whose outcome is still open.
    pub fn unresolved(&self) -> Vec<UnresolvedTransaction> {
        self.in_flight.iter().map(|r| r.value().clone()).collect()
    }

    /// Current status of a handle this process submitted, if still tracked.
    pub fn status(&self, hash: &TxHash) -> Option<ConfirmationStatus> {
        self.in_flight.get(hash).map(|r| r.value().status.clone())
    }

    /// Stop tracking `hash`, e.g. after reconciling it against the ledger.
    pub fn forget(&self, hash: &TxHash) -> bool {
        let removed = self.in_flight.remove(hash).is_some();
        metrics::record_unresolved(self.in_flight.len());
        removed
    }
}

impl std::fmt::Debug for TxSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxSubmitter")
            .field("policy", &self.policy)
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}
