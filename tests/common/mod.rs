//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use alloy::primitives::{hex, keccak256, Address, Bytes, Log, TxHash, U256};
use alloy::sol_types::{SolCall, SolEvent, SolValue};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use tourist_ledger::blockchain::contract::{
    createTouristIDCall, deactivateTouristIDCall, getTouristIDCall, TouristIDCreated,
};
use tourist_ledger::blockchain::types::{
    BlockchainError, BlockchainResult, CallTarget, LedgerCall, LedgerReceipt, TransactionHandle,
};
use tourist_ledger::blockchain::{ConfirmationPolicy, LedgerGateway};
use tourist_ledger::identity::{AlertEntry, CreationRequest, GeoPoint};

pub const CONTRACT: Address = Address::repeat_byte(0xc0);
pub const SIGNER: Address = Address::repeat_byte(0x51);

#[derive(Debug, Clone)]
struct Record {
    commitment: String,
    valid_until: u64,
    active: bool,
}

/// In-memory ledger implementing the identity contract.
///
/// Submissions are validated immediately (as gas estimation would) and
/// mined immediately unless receipts are held.
#[derive(Default)]
pub struct InMemoryLedger {
    records: DashMap<U256, Record>,
    next_token: AtomicU64,
    head: AtomicU64,
    tx_counter: AtomicU64,
    receipts: DashMap<TxHash, LedgerReceipt>,
    held: Mutex<Vec<(TxHash, LedgerCall)>>,
    anchors: DashMap<TxHash, Bytes>,
    submissions: AtomicU64,
    submitted: Mutex<Vec<TxHash>>,

    hold_receipts: AtomicBool,
    unavailable: AtomicBool,
    suppress_events: AtomicBool,
}

impl InMemoryLedger {
    pub fn new() -> Arc<Self> {
        let ledger = Self::default();
        ledger.next_token.store(1, Ordering::SeqCst);
        ledger.head.store(1_000, Ordering::SeqCst);
        Arc::new(ledger)
    }

    /// Keep new transactions in the mempool until [`release`](Self::release).
    pub fn hold_receipts(&self, hold: bool) {
        self.hold_receipts.store(hold, Ordering::SeqCst);
    }

    /// Mine every held transaction.
    pub fn release(&self) {
        let held: Vec<_> = self.held.lock().unwrap().drain(..).collect();
        for (hash, call) in held {
            self.mine(hash, call);
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Mine creations without emitting the creation event.
    pub fn suppress_events(&self, suppress: bool) {
        self.suppress_events.store(suppress, Ordering::SeqCst);
    }

    pub fn submissions(&self) -> u64 {
        self.submissions.load(Ordering::SeqCst)
    }

    /// Hashes handed back from `submit`, in order.
    pub fn submitted_hashes(&self) -> Vec<TxHash> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn anchored_data(&self, hash: &TxHash) -> Option<Bytes> {
        self.anchors.get(hash).map(|r| r.value().clone())
    }

    fn check_available(&self) -> BlockchainResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BlockchainError::Unavailable(
                "All RPC providers failed to reach ledger".to_string(),
            ));
        }
        Ok(())
    }

    fn record(&self, token_id: U256) -> Option<Record> {
        self.records.get(&token_id).map(|r| r.value().clone())
    }

    /// Reject calls the contract would revert.
    fn validate(&self, call: &LedgerCall) -> BlockchainResult<()> {
        if call.target == CallTarget::SelfAnchor {
            return Ok(());
        }
        let selector = &call.input[..4.min(call.input.len())];
        if selector == &createTouristIDCall::SELECTOR[..] {
            createTouristIDCall::abi_decode(&call.input)
                .map(|_| ())
                .map_err(|e| BlockchainError::Rejected(e.to_string()))
        } else if selector == &deactivateTouristIDCall::SELECTOR[..] {
            let decoded = deactivateTouristIDCall::abi_decode(&call.input)
                .map_err(|e| BlockchainError::Rejected(e.to_string()))?;
            match self.record(decoded.tokenId) {
                Some(record) if record.active => Ok(()),
                Some(_) => Err(BlockchainError::Reverted {
                    tx_hash: None,
                    reason: "execution reverted: ID already inactive".to_string(),
                }),
                None => Err(BlockchainError::Reverted {
                    tx_hash: None,
                    reason: "execution reverted: ID does not exist".to_string(),
                }),
            }
        } else {
            Err(BlockchainError::Rejected("unknown selector".to_string()))
        }
    }

    fn mine(&self, hash: TxHash, call: LedgerCall) {
        let block_number = self.head.fetch_add(1, Ordering::SeqCst) + 1;
        let mut logs = Vec::new();
        let mut success = true;

        match call.target {
            CallTarget::SelfAnchor => {
                self.anchors.insert(hash, call.input.clone());
            }
            CallTarget::Contract => {
                if let Ok(create) = createTouristIDCall::abi_decode(&call.input) {
                    let token_id = U256::from(self.next_token.fetch_add(1, Ordering::SeqCst));
                    self.records.insert(
                        token_id,
                        Record {
                            commitment: create.idHash.clone(),
                            valid_until: create.validUntil.to::<u64>(),
                            active: true,
                        },
                    );
                    if !self.suppress_events.load(Ordering::SeqCst) {
                        let event = TouristIDCreated {
                            tokenId: token_id,
                            tourist: SIGNER,
                            idHash: create.idHash,
                        };
                        logs.push(Log {
                            address: CONTRACT,
                            data: event.encode_log_data(),
                        });
                    }
                } else if let Ok(deactivate) = deactivateTouristIDCall::abi_decode(&call.input) {
                    match self.records.get_mut(&deactivate.tokenId) {
                        Some(mut record) if record.active => record.active = false,
                        _ => success = false,
                    }
                } else {
                    success = false;
                }
            }
        }

        self.receipts.insert(
            hash,
            LedgerReceipt {
                tx_hash: hash,
                block_number,
                success,
                logs,
            },
        );
    }
}

#[async_trait]
impl LedgerGateway for InMemoryLedger {
    async fn ensure_ready(&self) -> BlockchainResult<()> {
        self.check_available()
    }

    async fn submit(&self, call: LedgerCall) -> BlockchainResult<TransactionHandle> {
        self.check_available()?;
        self.validate(&call)?;
        self.submissions.fetch_add(1, Ordering::SeqCst);

        let counter = self.tx_counter.fetch_add(1, Ordering::SeqCst);
        let mut preimage = counter.to_be_bytes().to_vec();
        preimage.extend_from_slice(&call.input);
        let hash = keccak256(&preimage);
        let operation = call.operation;
        self.submitted.lock().unwrap().push(hash);

        if self.hold_receipts.load(Ordering::SeqCst) {
            self.held.lock().unwrap().push((hash, call));
        } else {
            self.mine(hash, call);
        }
        Ok(TransactionHandle::pending(hash, operation))
    }

    async fn read(&self, call: LedgerCall) -> BlockchainResult<Bytes> {
        self.check_available()?;
        let decoded = getTouristIDCall::abi_decode(&call.input)
            .map_err(|e| BlockchainError::Rejected(e.to_string()))?;
        let encoded = match self.record(decoded.tokenId) {
            Some(r) => (r.commitment, U256::from(r.valid_until), r.active).abi_encode_params(),
            None => (String::new(), U256::ZERO, false).abi_encode_params(),
        };
        Ok(Bytes::from(encoded))
    }

    async fn receipt(&self, tx_hash: TxHash) -> BlockchainResult<Option<LedgerReceipt>> {
        self.check_available()?;
        Ok(self.receipts.get(&tx_hash).map(|r| r.value().clone()))
    }

    async fn block_number(&self) -> BlockchainResult<u64> {
        self.check_available()?;
        Ok(self.head.load(Ordering::SeqCst))
    }

    async fn signer_address(&self) -> BlockchainResult<Address> {
        self.check_available()?;
        Ok(SIGNER)
    }

    fn contract_address(&self) -> Address {
        CONTRACT
    }
}

/// Policy with millisecond polling for tests.
pub fn fast_policy(timeout: Duration) -> ConfirmationPolicy {
    ConfirmationPolicy {
        required_confirmations: 1,
        timeout,
        poll_base_ms: 5,
        poll_max_ms: 20,
    }
}

pub fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// The `T-001` creation request, valid for 30 days.
pub fn tourist_request() -> CreationRequest {
    CreationRequest {
        subject_id: "T-001".to_string(),
        secondary_id_hash: "9f86d081884c7d65".to_string(),
        tertiary_id_hash: "60303ae22b998861".to_string(),
        valid_until: unix_now_secs() + 30 * 24 * 60 * 60,
    }
}

pub fn panic_alert() -> AlertEntry {
    AlertEntry {
        subject_id: "T-001".to_string(),
        alert_type: "panic".to_string(),
        location: GeoPoint {
            lat: 26.1445,
            lng: 91.7362,
        },
        timestamp_ms: unix_now_secs() * 1_000,
    }
}

/// Canned answers for the mock JSON-RPC endpoint.
#[derive(Debug, Clone)]
pub struct MockRpc {
    pub chain_id: u64,
    pub block_number: u64,
    /// Hex return data for `eth_call`.
    pub call_result: String,
    /// JSON-RPC error `(code, message)` returned by `eth_estimateGas`.
    pub estimate_gas_error: Option<(i64, String)>,
}

impl Default for MockRpc {
    fn default() -> Self {
        Self {
            chain_id: 31337,
            block_number: 100,
            call_result: "0x".to_string(),
            estimate_gas_error: None,
        }
    }
}

/// Start a JSON-RPC server on an ephemeral port.
///
/// Receipts are never available, so every submission stays pending.
/// Returns the bound address and a log of received method names.
pub async fn start_mock_rpc(mock: MockRpc) -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let methods = Arc::new(Mutex::new(Vec::new()));
    let seen = methods.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let mock = mock.clone();
                    let seen = seen.clone();
                    tokio::spawn(async move {
                        let (reader, mut writer) = socket.into_split();
                        let mut reader = BufReader::new(reader);
                        // Serve requests until the client closes the connection.
                        while let Some(body) = read_http_body(&mut reader).await {
                            let request: Value = match serde_json::from_slice(&body) {
                                Ok(v) => v,
                                Err(_) => break,
                            };
                            let response = if let Some(batch) = request.as_array() {
                                Value::Array(batch.iter().map(|r| answer(&mock, r, &seen)).collect())
                            } else {
                                answer(&mock, &request, &seen)
                            };
                            let payload = response.to_string();
                            let http = format!(
                                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
                                payload.len(),
                                payload
                            );
                            if writer.write_all(http.as_bytes()).await.is_err() {
                                break;
                            }
                        }
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, methods)
}

async fn read_http_body<R>(reader: &mut BufReader<R>) -> Option<Vec<u8>>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut headers = HashMap::new();
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await.ok()? == 0 {
            return None;
        }
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            if headers.is_empty() {
                continue;
            }
            break;
        }
        let entry = match trimmed.split_once(':') {
            Some((name, value)) => (name.trim().to_ascii_lowercase(), value.trim().to_string()),
            // Request line
            None => ("request-line".to_string(), trimmed.to_string()),
        };
        headers.insert(entry.0, entry.1);
    }

    let length: usize = headers.get("content-length")?.parse().ok()?;
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).await.ok()?;
    Some(body)
}

fn answer(mock: &MockRpc, request: &Value, seen: &Mutex<Vec<String>>) -> Value {
    let id = request.get("id").cloned().unwrap_or(Value::Null);
    let method = request.get("method").and_then(Value::as_str).unwrap_or_default();
    seen.lock().unwrap().push(method.to_string());

    let result = match method {
        "eth_chainId" => json!(format!("0x{:x}", mock.chain_id)),
        "eth_blockNumber" => json!(format!("0x{:x}", mock.block_number)),
        "eth_gasPrice" => json!("0x3b9aca00"),
        "eth_getTransactionCount" => json!("0x0"),
        "eth_estimateGas" => match &mock.estimate_gas_error {
            Some((code, message)) => {
                return json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": { "code": code, "message": message },
                });
            }
            None => json!("0x186a0"),
        },
        "eth_call" => json!(mock.call_result),
        "eth_getTransactionReceipt" => Value::Null,
        "eth_sendRawTransaction" => {
            let raw = request["params"][0].as_str().unwrap_or_default();
            let bytes = hex::decode(raw).unwrap_or_default();
            json!(keccak256(&bytes))
        }
        _ => {
            return json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32601, "message": format!("method {method} not found") },
            });
        }
    };

    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}
