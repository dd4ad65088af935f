//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the ledger
//! client. All types derive Serde traits for deserialization from config files.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Root configuration for the identity ledger client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct LedgerConfig {
    /// Ledger endpoint and transaction settings.
    pub ledger: BlockchainConfig,

    /// Confirmation wait policy.
    pub confirmation: ConfirmationConfig,

    /// Signing identity settings.
    pub signer: SignerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Blockchain integration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BlockchainConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs (same chain).
    pub failover_urls: Vec<String>,

    /// Chain ID (e.g., 80001 for Polygon Mumbai, 31337 for local Anvil).
    pub chain_id: u64,

    /// Address of the deployed tourist identity contract.
    pub contract_address: String,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Number of blocks (including the inclusion block) required for finality.
    pub confirmation_blocks: u64,

    /// Gas price multiplier (1.0 = estimated, 1.2 = 20% buffer).
    pub gas_price_multiplier: f64,

    /// Maximum gas price in gwei (protection against spikes).
    pub max_gas_price_gwei: u64,
}

impl Default for BlockchainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://rpc-mumbai.maticvigil.com".to_string(),
            failover_urls: Vec::new(),
            chain_id: 80001,
            contract_address: "0x0000000000000000000000000000000000000000".to_string(),
            rpc_timeout_secs: 10,
            confirmation_blocks: 1,
            gas_price_multiplier: 1.2,
            max_gas_price_gwei: 500,
        }
    }
}

/// How long and how often to poll for transaction finality.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Overall budget for one confirmation wait, in seconds.
    pub timeout_secs: u64,

    /// First poll delay for exponential backoff in milliseconds.
    pub poll_base_ms: u64,

    /// Maximum poll delay in milliseconds.
    pub poll_max_ms: u64,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            poll_base_ms: 500,
            poll_max_ms: 5_000,
        }
    }
}

/// Signing identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SignerConfig {
    /// Hex-encoded private key. Prefer the environment over config files.
    pub private_key: Option<SecretKey>,

    /// Permit fallbacks (ephemeral key, zero contract address) that only make
    /// sense for local development.
    pub demo_mode: bool,
}

/// Private key material. Never printed and never serialized.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretKey(String);

impl SecretKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the raw key. Callers must not log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey([REDACTED])")
    }
}

impl Serialize for SecretKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> Deserialize<'de> for SecretKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(SecretKey)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
