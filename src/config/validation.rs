//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, multipliers sane)
//! - Refuse development fallbacks unless demo mode is explicit
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: LedgerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use alloy::primitives::Address;
use thiserror::Error;

use crate::config::schema::LedgerConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("invalid URL for {field}: {reason}")]
    InvalidUrl { field: &'static str, reason: String },

    #[error("invalid contract address '{0}'")]
    InvalidContractAddress(String),

    #[error("contract address is the zero address; set TOURIST_ID_CONTRACT_ADDRESS or enable demo mode")]
    ZeroContractAddress,

    #[error("no signing key configured; set BLOCKCHAIN_PRIVATE_KEY or enable demo mode")]
    MissingSigningKey,

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("gas_price_multiplier must be within [1.0, 10.0], got {0}")]
    GasMultiplierOutOfRange(f64),

    #[error("confirmation.poll_base_ms ({base}) exceeds confirmation.poll_max_ms ({max})")]
    PollRange { base: u64, max: u64 },

    #[error("invalid metrics address '{0}'")]
    InvalidMetricsAddress(String),
}

/// Validate a fully merged configuration.
pub fn validate_config(config: &LedgerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let ledger = &config.ledger;
    let demo = config.signer.demo_mode;

    if let Err(e) = url::Url::parse(&ledger.rpc_url) {
        errors.push(ValidationError::InvalidUrl {
            field: "ledger.rpc_url",
            reason: e.to_string(),
        });
    }
    for failover in &ledger.failover_urls {
        if let Err(e) = url::Url::parse(failover) {
            errors.push(ValidationError::InvalidUrl {
                field: "ledger.failover_urls",
                reason: e.to_string(),
            });
        }
    }

    match ledger.contract_address.parse::<Address>() {
        Ok(address) if address == Address::ZERO && !demo => {
            errors.push(ValidationError::ZeroContractAddress)
        }
        Ok(_) => {}
        Err(_) => errors.push(ValidationError::InvalidContractAddress(
            ledger.contract_address.clone(),
        )),
    }

    let has_key = config
        .signer
        .private_key
        .as_ref()
        .is_some_and(|key| !key.is_empty());
    if !has_key && !demo {
        errors.push(ValidationError::MissingSigningKey);
    }

    for (field, value) in [
        ("ledger.chain_id", ledger.chain_id),
        ("ledger.rpc_timeout_secs", ledger.rpc_timeout_secs),
        ("ledger.confirmation_blocks", ledger.confirmation_blocks),
        ("confirmation.timeout_secs", config.confirmation.timeout_secs),
        ("confirmation.poll_max_ms", config.confirmation.poll_max_ms),
    ] {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    if !(1.0..=10.0).contains(&ledger.gas_price_multiplier) {
        errors.push(ValidationError::GasMultiplierOutOfRange(
            ledger.gas_price_multiplier,
        ));
    }

    if config.confirmation.poll_base_ms > config.confirmation.poll_max_ms {
        errors.push(ValidationError::PollRange {
            base: config.confirmation.poll_base_ms,
            max: config.confirmation.poll_max_ms,
        });
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
