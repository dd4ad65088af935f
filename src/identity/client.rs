//! Identity ledger facade.
//!
//! # Responsibilities
//! - Commit identity and alert payloads before they leave the process
//! - Drive creation, deactivation and alert anchoring to confirmation
//! - Read identity records fresh from the ledger
//! - Map every failure to the operation that produced it

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::{Address, TxHash};
use tracing::Instrument;
use uuid::Uuid;

use crate::blockchain::client::RpcGateway;
use crate::blockchain::contract::{self, OnChainRecord};
use crate::blockchain::events::extract_token_id;
use crate::blockchain::gateway::LedgerGateway;
use crate::blockchain::transaction::{ConfirmationPolicy, TxSubmitter, UnresolvedTransaction};
use crate::blockchain::types::{BlockchainResult, TokenId};
use crate::commitment::{commit, Commitment};
use crate::config::schema::LedgerConfig;
use crate::identity::error::{IdentityError, IdentityResult, LedgerFailure};
use crate::identity::types::{
    AlertEntry, AnchorReport, CreatedIdentity, CreationRequest, IdentityState,
    VerificationResult,
};
use crate::lifecycle::Cancellation;
use crate::observability::metrics;

/// Client for tourist identity records and alert anchors.
///
/// Cheap to clone; clones share the gateway connection and the in-flight
/// registry.
#[derive(Clone)]
pub struct IdentityLedgerClient {
    gateway: Arc<dyn LedgerGateway>,
    submitter: TxSubmitter,
}

impl IdentityLedgerClient {
    pub fn new(gateway: Arc<dyn LedgerGateway>, policy: ConfirmationPolicy) -> Self {
        let submitter = TxSubmitter::new(gateway.clone(), policy);
        Self { gateway, submitter }
    }

    /// Build a client over JSON-RPC from loaded configuration.
    ///
    /// No connection is made until the first operation.
    pub fn from_config(config: &LedgerConfig) -> BlockchainResult<Self> {
        let gateway = RpcGateway::new(config.ledger.clone(), config.signer.clone())?;
        let policy = ConfirmationPolicy::from_config(&config.ledger, &config.confirmation);
        Ok(Self::new(Arc::new(gateway), policy))
    }

    /// Interrupt confirmation waits when `cancellation` fires.
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.submitter = self.submitter.with_cancellation(cancellation);
        self
    }

    /// Create an identity record and wait for the ledger to assign its id.
    pub async fn create_identity(&self, request: CreationRequest) -> IdentityResult<CreatedIdentity> {
        let op_id = Uuid::new_v4();
        let result = self
            .create_inner(request)
            .instrument(tracing::info_span!("create_identity", %op_id))
            .await
            .map_err(IdentityError::Create);
        finish(contract::OP_CREATE, &result);
        result
    }

    async fn create_inner(&self, request: CreationRequest) -> Result<CreatedIdentity, LedgerFailure> {
        if request.subject_id.trim().is_empty() {
            return Err(LedgerFailure::InvalidRequest("subject id is empty".to_string()));
        }

        let commitment = commit(&request.commitment_payload(now_ms()));
        let receipt = self
            .submitter
            .execute(contract::create_call(&commitment, request.valid_until))
            .await?;
        let token_id = extract_token_id(&receipt, self.gateway.contract_address())?;

        tracing::info!(
            token_id = %token_id,
            tx_hash = %receipt.tx_hash,
            block_number = receipt.block_number,
            "Identity created"
        );
        Ok(CreatedIdentity {
            token_id,
            transaction_ref: receipt.tx_hash,
            commitment,
        })
    }

    /// Read an identity record.
    ///
    /// Always queries the ledger; nothing is cached.
    pub async fn verify_identity(&self, token_id: TokenId) -> IdentityResult<VerificationResult> {
        let op_id = Uuid::new_v4();
        let result = self
            .read_record(token_id)
            .instrument(tracing::info_span!("verify_identity", %op_id, %token_id))
            .await
            .and_then(|record| {
                if record.exists() {
                    Ok(VerificationResult {
                        commitment: record.commitment,
                        valid_until: record.valid_until,
                        is_active: record.active,
                    })
                } else {
                    Err(LedgerFailure::UnknownToken { token_id })
                }
            })
            .map_err(IdentityError::Read);
        finish(contract::OP_READ, &result);
        result
    }

    /// Observed lifecycle state of `token_id`.
    pub async fn identity_state(&self, token_id: TokenId) -> IdentityResult<IdentityState> {
        match self.verify_identity(token_id).await {
            Ok(result) if result.is_active => Ok(IdentityState::Active),
            Ok(_) => Ok(IdentityState::Deactivated),
            Err(IdentityError::Read(LedgerFailure::UnknownToken { .. })) => {
                Ok(IdentityState::NonExistent)
            }
            Err(e) => Err(e),
        }
    }

    async fn read_record(&self, token_id: TokenId) -> Result<OnChainRecord, LedgerFailure> {
        let data = self.gateway.read(contract::read_call(token_id)).await?;
        Ok(contract::decode_record(&data)?)
    }

    /// Deactivate an identity. Deactivation is permanent.
    ///
    /// The ledger enforces the transition; deactivating an unknown or
    /// already inactive identity fails with a reverted transaction.
    pub async fn deactivate_identity(&self, token_id: TokenId) -> IdentityResult<TxHash> {
        let op_id = Uuid::new_v4();
        let result = async {
            let receipt = self.submitter.execute(contract::deactivate_call(token_id)).await?;
            tracing::info!(tx_hash = %receipt.tx_hash, "Identity deactivated");
            Ok::<_, LedgerFailure>(receipt.tx_hash)
        }
        .instrument(tracing::info_span!("deactivate_identity", %op_id, %token_id))
        .await
        .map_err(IdentityError::Write);
        finish(contract::OP_DEACTIVATE, &result);
        result
    }

    /// Anchor an alert commitment on the ledger and wait for confirmation.
    pub async fn log_alert(&self, entry: AlertEntry) -> IdentityResult<TxHash> {
        let op_id = Uuid::new_v4();
        let result = self
            .anchor(entry)
            .instrument(tracing::info_span!("log_alert", %op_id))
            .await
            .map(|(hash, _)| hash)
            .map_err(IdentityError::Log);
        finish(contract::OP_ANCHOR, &result);
        result
    }

    /// Like [`log_alert`](Self::log_alert), but never fails.
    ///
    /// Failures are logged and returned as [`AnchorReport::Failed`] so the
    /// caller can carry on with its primary flow.
    pub async fn log_alert_best_effort(&self, entry: AlertEntry) -> AnchorReport {
        match self.log_alert(entry).await {
            Ok(hash) => AnchorReport::Anchored(hash),
            Err(e) => {
                tracing::warn!(error = %e, cause = %e.cause(), "Alert anchor failed; continuing");
                AnchorReport::Failed(e)
            }
        }
    }

    async fn anchor(&self, entry: AlertEntry) -> Result<(TxHash, Commitment), LedgerFailure> {
        if !entry.location.is_finite() {
            return Err(LedgerFailure::InvalidRequest(
                "alert location must be finite".to_string(),
            ));
        }
        let commitment = commit(&entry.commitment_payload());
        let receipt = self.submitter.execute(contract::anchor_call(&commitment)).await?;
        tracing::info!(
            tx_hash = %receipt.tx_hash,
            alert_type = %entry.alert_type,
            "Alert anchored"
        );
        Ok((receipt.tx_hash, commitment))
    }

    /// True when the ledger endpoint answers.
    pub async fn health(&self) -> bool {
        self.gateway.is_healthy().await
    }

    /// Address that signs this client's transactions.
    pub async fn signer_address(&self) -> IdentityResult<Address> {
        self.gateway
            .signer_address()
            .await
            .map_err(|e| IdentityError::Read(e.into()))
    }

    /// Transactions submitted by this client whose outcome is still open.
    pub fn unresolved_transactions(&self) -> Vec<UnresolvedTransaction> {
        self.submitter.unresolved()
    }

    /// Stop tracking a transaction after it has been reconciled.
    pub fn forget_transaction(&self, hash: &TxHash) -> bool {
        self.submitter.forget(hash)
    }

    pub fn confirmation_policy(&self) -> &ConfirmationPolicy {
        self.submitter.policy()
    }
}

impl std::fmt::Debug for IdentityLedgerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityLedgerClient")
            .field("contract", &self.gateway.contract_address())
            .field("submitter", &self.submitter)
            .finish()
    }
}

fn finish<T>(operation: &'static str, result: &IdentityResult<T>) {
    let outcome = match result {
        Ok(_) => "success",
        Err(e) if e.is_indeterminate() => "unresolved",
        Err(_) => "failure",
    };
    metrics::record_operation(operation, outcome);
    if let Err(e) = result {
        tracing::warn!(operation, outcome, error = %e, cause = %e.cause(), "Ledger operation failed");
    }
}

fn now_ms() -> u64 {
    millis_since_epoch(SystemTime::now())
}

/// Milliseconds since the Unix epoch, saturating at `u64::MAX`.
///
/// A clock set before the epoch yields 0.
fn millis_since_epoch(now: SystemTime) -> u64 {
    match now.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => u64::try_from(elapsed.as_millis()).unwrap_or_else(|_| {
            tracing::warn!("System clock beyond u64 milliseconds; saturating");
            u64::MAX
        }),
        Err(e) => {
            tracing::warn!(behind_ms = %e.duration().as_millis(), "System clock before Unix epoch; using 0");
            0
        }
    }
}
