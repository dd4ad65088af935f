//! Tourist identity ledger CLI.
//!
//! # Architecture Overview
//!
//! ```text
//!     CLI command
//!         │
//!         ▼
//!   ┌──────────────────────┐     ┌────────────┐
//!   │ IdentityLedgerClient │────▶│ commitment │
//!   └──────────┬───────────┘     └────────────┘
//!              │
//!              ▼
//!   ┌──────────────────────┐     ┌────────────┐
//!   │     TxSubmitter      │────▶│   events   │
//!   └──────────┬───────────┘     └────────────┘
//!              │
//!              ▼
//!   ┌──────────────────────┐
//!   │      RpcGateway      │────▶ JSON-RPC endpoint(s)
//!   └──────────────────────┘
//! ```
//!
//! Results are printed as JSON on stdout; logs go to stderr.

use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use tourist_ledger::blockchain::TokenId;
use tourist_ledger::config::load_config;
use tourist_ledger::identity::{AlertEntry, AnchorReport, CreationRequest, GeoPoint};
use tourist_ledger::lifecycle::signals::cancel_on_ctrl_c;
use tourist_ledger::observability::{logging, metrics};
use tourist_ledger::{Cancellation, IdentityLedgerClient, LedgerConfig};

#[derive(Parser)]
#[command(name = "tourist-ledger")]
#[command(about = "Create, verify and deactivate digital tourist IDs on the ledger", long_about = None)]
struct Cli {
    /// TOML configuration file; environment variables override it.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an identity record and print its token id
    Create {
        #[arg(long)]
        subject_id: String,
        #[arg(long)]
        secondary_id_hash: String,
        #[arg(long)]
        tertiary_id_hash: String,
        /// Days from now until the identity lapses
        #[arg(long, default_value_t = 30)]
        valid_days: u64,
    },
    /// Read an identity record
    Verify { token_id: TokenId },
    /// Permanently deactivate an identity
    Deactivate { token_id: TokenId },
    /// Anchor a safety alert
    LogAlert {
        #[arg(long)]
        subject_id: String,
        #[arg(long)]
        alert_type: String,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        /// Report failures instead of exiting with an error
        #[arg(long)]
        best_effort: bool,
    },
    /// Check endpoint health and signer
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    logging::init_logging(&config.observability);

    tracing::info!(
        rpc_url = %config.ledger.rpc_url,
        chain_id = config.ledger.chain_id,
        contract = %config.ledger.contract_address,
        demo_mode = config.signer.demo_mode,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let cancellation = Cancellation::new();
    cancel_on_ctrl_c(cancellation.clone());
    let client = IdentityLedgerClient::from_config(&config)?.with_cancellation(cancellation);

    let output = run(&client, &config, cli.command).await;

    for tx in client.unresolved_transactions() {
        tracing::warn!(
            tx_hash = %tx.hash,
            operation = tx.operation,
            "Transaction outcome unknown; check the ledger before retrying"
        );
    }

    println!("{}", serde_json::to_string_pretty(&output?)?);
    Ok(())
}

async fn run(
    client: &IdentityLedgerClient,
    config: &LedgerConfig,
    command: Commands,
) -> Result<Value, Box<dyn std::error::Error>> {
    let output = match command {
        Commands::Create {
            subject_id,
            secondary_id_hash,
            tertiary_id_hash,
            valid_days,
        } => {
            let valid_until = unix_now()
                .saturating_add(Duration::from_secs(valid_days.saturating_mul(86_400)))
                .as_secs();
            let created = client
                .create_identity(CreationRequest {
                    subject_id,
                    secondary_id_hash,
                    tertiary_id_hash,
                    valid_until,
                })
                .await?;
            serde_json::to_value(created)?
        }
        Commands::Verify { token_id } => {
            serde_json::to_value(client.verify_identity(token_id).await?)?
        }
        Commands::Deactivate { token_id } => {
            let tx_hash = client.deactivate_identity(token_id).await?;
            json!({ "tokenId": token_id, "transactionRef": tx_hash })
        }
        Commands::LogAlert {
            subject_id,
            alert_type,
            lat,
            lng,
            best_effort,
        } => {
            let entry = AlertEntry {
                subject_id,
                alert_type,
                location: GeoPoint { lat, lng },
                timestamp_ms: unix_now().as_millis() as u64,
            };
            if best_effort {
                match client.log_alert_best_effort(entry).await {
                    AnchorReport::Anchored(tx_hash) => json!({ "anchored": true, "transactionRef": tx_hash }),
                    AnchorReport::Failed(e) => json!({
                        "anchored": false,
                        "error": e.to_string(),
                        "cause": e.cause().to_string(),
                    }),
                }
            } else {
                json!({ "transactionRef": client.log_alert(entry).await? })
            }
        }
        Commands::Status => {
            let healthy = client.health().await;
            let signer = client.signer_address().await.ok();
            json!({
                "healthy": healthy,
                "signer": signer,
                "chainId": config.ledger.chain_id,
                "contract": config.ledger.contract_address,
            })
        }
    };

    Ok(output)
}

fn unix_now() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}
