//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use crate::config::schema::{LedgerConfig, SecretKey};
use crate::config::validation::{validate_config, ValidationError};

/// JSON-RPC endpoint URL.
pub const RPC_URL_ENV_VAR: &str = "POLYGON_RPC_URL";
/// Deployed identity contract address.
pub const CONTRACT_ADDRESS_ENV_VAR: &str = "TOURIST_ID_CONTRACT_ADDRESS";
/// Hex-encoded signing key.
pub const PRIVATE_KEY_ENV_VAR: &str = "BLOCKCHAIN_PRIVATE_KEY";
/// `1`/`true` enables development fallbacks.
pub const DEMO_MODE_ENV_VAR: &str = "LEDGER_DEMO_MODE";
pub const CHAIN_ID_ENV_VAR: &str = "LEDGER_CHAIN_ID";
pub const CONFIRMATION_TIMEOUT_ENV_VAR: &str = "LEDGER_CONFIRMATION_TIMEOUT_SECS";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { var: &'static str, reason: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { var, reason } => write!(f, "Environment error in {}: {}", var, reason),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration: defaults, then the optional TOML file, then the
/// process environment, then validation.
pub fn load_config(path: Option<&Path>) -> Result<LedgerConfig, ConfigError> {
    load_config_with(path, |name| std::env::var(name).ok())
}

/// Same as [`load_config`] with an injectable environment lookup.
pub fn load_config_with<F>(path: Option<&Path>, env: F) -> Result<LedgerConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        None => LedgerConfig::default(),
    };

    apply_env_overrides(&mut config, env)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    if config.signer.demo_mode {
        tracing::warn!("Demo mode enabled: development fallbacks are permitted");
    }

    Ok(config)
}

/// Overlay environment variables onto `config`. Empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut LedgerConfig, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| env(name).filter(|v| !v.trim().is_empty());

    if let Some(url) = get(RPC_URL_ENV_VAR) {
        config.ledger.rpc_url = url;
    }
    if let Some(address) = get(CONTRACT_ADDRESS_ENV_VAR) {
        config.ledger.contract_address = address;
    }
    if let Some(key) = get(PRIVATE_KEY_ENV_VAR) {
        config.signer.private_key = Some(SecretKey::new(key));
    }
    if let Some(flag) = get(DEMO_MODE_ENV_VAR) {
        config.signer.demo_mode = parse_flag(DEMO_MODE_ENV_VAR, &flag)?;
    }
    if let Some(chain_id) = get(CHAIN_ID_ENV_VAR) {
        config.ledger.chain_id = parse_u64(CHAIN_ID_ENV_VAR, &chain_id)?;
    }
    if let Some(secs) = get(CONFIRMATION_TIMEOUT_ENV_VAR) {
        config.confirmation.timeout_secs = parse_u64(CONFIRMATION_TIMEOUT_ENV_VAR, &secs)?;
    }
    Ok(())
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Env {
            var,
            reason: format!("expected a boolean, got '{}'", other),
        }),
    }
}

fn parse_u64(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|e| ConfigError::Env {
        var,
        reason: format!("{}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const TEST_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_env_only_configuration() {
        let env = env_from(&[
            (RPC_URL_ENV_VAR, "http://localhost:8545"),
            (CONTRACT_ADDRESS_ENV_VAR, "0x5FbDB2315678afecb367f032d93F642f64180aa3"),
            (PRIVATE_KEY_ENV_VAR, TEST_KEY),
            (CHAIN_ID_ENV_VAR, "31337"),
        ]);
        let config = load_config_with(None, env).unwrap();
        assert_eq!(config.ledger.rpc_url, "http://localhost:8545");
        assert_eq!(config.ledger.chain_id, 31337);
        assert_eq!(config.signer.private_key.unwrap().expose(), TEST_KEY);
        assert!(!config.signer.demo_mode);
    }

    #[test]
    fn test_missing_credentials_fail_fast() {
        let err = load_config_with(None, env_from(&[])).unwrap_err();
        match err {
            ConfigError::Validation(errors) => {
                assert!(errors.contains(&ValidationError::MissingSigningKey));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_demo_mode_flag_permits_fallbacks() {
        let config = load_config_with(None, env_from(&[(DEMO_MODE_ENV_VAR, "true")])).unwrap();
        assert!(config.signer.demo_mode);
        assert!(config.signer.private_key.is_none());
    }

    #[test]
    fn test_bad_env_values_are_reported() {
        let err = load_config_with(None, env_from(&[(DEMO_MODE_ENV_VAR, "maybe")])).unwrap_err();
        assert!(err.to_string().contains(DEMO_MODE_ENV_VAR));

        let err = load_config_with(
            None,
            env_from(&[(DEMO_MODE_ENV_VAR, "1"), (CHAIN_ID_ENV_VAR, "polygon")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: CHAIN_ID_ENV_VAR, .. }));
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let config = load_config_with(
            None,
            env_from(&[(DEMO_MODE_ENV_VAR, "1"), (RPC_URL_ENV_VAR, "  ")]),
        )
        .unwrap();
        assert_eq!(config.ledger.rpc_url, "https://rpc-mumbai.maticvigil.com");
    }

    #[test]
    fn test_file_then_env_precedence() {
        let path = std::env::temp_dir().join(format!("tourist-ledger-{}.toml", uuid::Uuid::new_v4()));
        fs::write(
            &path,
            r#"
            [ledger]
            rpc_url = "http://file-endpoint:8545"
            chain_id = 137

            [signer]
            demo_mode = true
            "#,
        )
        .unwrap();

        let config = load_config_with(
            Some(&path),
            env_from(&[(RPC_URL_ENV_VAR, "http://env-endpoint:8545")]),
        )
        .unwrap();
        assert_eq!(config.ledger.rpc_url, "http://env-endpoint:8545");
        assert_eq!(config.ledger.chain_id, 137);

        fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config_with(Some(Path::new("/nonexistent/ledger.toml")), env_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
