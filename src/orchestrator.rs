use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::normalizer::amount::UnitScale;
use crate::normalizer::types::WalletSnapshot;
use crate::normalizer::{NormalizeContext, Normalizer};
use crate::providers::{ProviderClient, ProviderError, ProviderKind};

/// Why one provider could not produce a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderFailure {
    pub provider: ProviderKind,
    pub reason: String,
}

/// The first snapshot any provider produced, plus the providers that
/// failed before it.
#[derive(Debug)]
pub struct Ingested {
    pub provider: ProviderKind,
    pub snapshot: WalletSnapshot,
    pub failures: Vec<ProviderFailure>,
}

#[derive(Debug, thiserror::Error)]
#[error("all {} providers failed", .failures.len())]
pub struct IngestionExhausted {
    pub failures: Vec<ProviderFailure>,
}

#[derive(Debug)]
enum AttemptState {
    Pending,
    Trying(usize),
    Succeeded(usize, WalletSnapshot),
    Exhausted,
}

/// Tries providers one at a time in priority order and returns the first
/// normalized snapshot. Results from different providers are never merged.
pub struct ProviderOrchestrator {
    clients: Vec<Arc<dyn ProviderClient>>,
    timeout: Duration,
    scale: UnitScale,
}

impl ProviderOrchestrator {
    pub fn new(clients: Vec<Arc<dyn ProviderClient>>, timeout: Duration, scale: UnitScale) -> Self {
        Self {
            clients,
            timeout,
            scale,
        }
    }

    pub fn providers(&self) -> Vec<ProviderKind> {
        self.clients.iter().map(|c| c.kind()).collect()
    }

    pub async fn ingest(&self, address: &str) -> Result<Ingested, IngestionExhausted> {
        let mut failures = Vec::new();
        let mut state = AttemptState::Pending;

        loop {
            tracing::debug!(address, state = ?StateLabel(&state), "Orchestrator state");
            state = match state {
                AttemptState::Pending if self.clients.is_empty() => AttemptState::Exhausted,
                AttemptState::Pending => AttemptState::Trying(0),
                AttemptState::Trying(i) => {
                    let client = &self.clients[i];
                    match self.attempt(client.as_ref(), address).await {
                        Ok(snapshot) => AttemptState::Succeeded(i, snapshot),
                        Err(reason) => {
                            tracing::warn!(
                                provider = %client.kind(),
                                address,
                                error = %reason,
                                "Provider failed, falling back"
                            );
                            failures.push(ProviderFailure {
                                provider: client.kind(),
                                reason,
                            });
                            if i + 1 < self.clients.len() {
                                AttemptState::Trying(i + 1)
                            } else {
                                AttemptState::Exhausted
                            }
                        }
                    }
                }
                AttemptState::Succeeded(i, snapshot) => {
                    let provider = self.clients[i].kind();
                    tracing::info!(
                        %provider,
                        address,
                        transactions = snapshot.transactions.len(),
                        failed_before = failures.len(),
                        "Snapshot ingested"
                    );
                    return Ok(Ingested {
                        provider,
                        snapshot,
                        failures,
                    });
                }
                AttemptState::Exhausted => {
                    tracing::error!(address, attempts = failures.len(), "All providers failed");
                    return Err(IngestionExhausted { failures });
                }
            };
        }
    }

    /// Fetch and normalize with one provider. Any failure is flattened to a
    /// reason string for diagnostics.
    async fn attempt(&self, client: &dyn ProviderClient, address: &str) -> Result<WalletSnapshot, String> {
        let raw = match tokio::time::timeout(self.timeout, client.fetch(address)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => return Err(e.to_string()),
            Err(_) => return Err(ProviderError::Timeout(self.timeout).to_string()),
        };

        let ctx = NormalizeContext {
            scale: self.scale,
            requested_at: Utc::now(),
        };
        raw.normalize(address, &ctx).map_err(|e| e.to_string())
    }
}

/// Debug view of a state without dumping the snapshot.
struct StateLabel<'a>(&'a AttemptState);

impl std::fmt::Debug for StateLabel<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            AttemptState::Pending => write!(f, "pending"),
            AttemptState::Trying(i) => write!(f, "trying({})", i),
            AttemptState::Succeeded(i, _) => write!(f, "succeeded({})", i),
            AttemptState::Exhausted => write!(f, "exhausted"),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::providers::{ProviderClient, ProviderError, ProviderKind, RawProviderPayload};

    pub enum Behavior {
        Respond(RawProviderPayload),
        Fail,
        Hang,
    }

    /// Scripted provider client that counts calls.
    pub struct StubClient {
        pub kind: ProviderKind,
        pub behavior: Behavior,
        pub calls: AtomicUsize,
    }

    impl StubClient {
        pub fn new(kind: ProviderKind, behavior: Behavior) -> Self {
            Self {
                kind,
                behavior,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProviderClient for StubClient {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        async fn fetch(&self, _address: &str) -> Result<RawProviderPayload, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                Behavior::Respond(payload) => Ok(payload.clone()),
                Behavior::Fail => Err(ProviderError::Transport("connection reset".to_string())),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Err(ProviderError::Transport("unreachable".to_string()))
                }
            }
        }
    }

    pub const ADDR: &str = "1ExampleAddressxxxxxxxxxxxxxxxxxx";

    /// The explorer A fixture: 2.5 BTC balance, two relevant txs.
    pub fn blockchain_info_body() -> Value {
        json!({
            "address": ADDR,
            "n_tx": 3,
            "total_received": 500000000u64,
            "total_sent": 250000000u64,
            "final_balance": 250000000u64,
            "txs": [
                {
                    "hash": "h1", "time": 1700000000, "block_height": 810000,
                    "inputs": [{ "prev_out": { "addr": "1Other", "value": 500000000u64 } }],
                    "out": [{ "addr": ADDR, "value": 500000000u64 }]
                },
                {
                    "hash": "h2", "time": 1700100000, "block_height": 810100,
                    "inputs": [{ "prev_out": { "addr": ADDR, "value": 250000000u64 } }],
                    "out": [{ "addr": "1Other", "value": 250000000u64 }]
                }
            ]
        })
    }

    pub fn esplora_payload() -> RawProviderPayload {
        RawProviderPayload::Esplora {
            stats: json!({
                "chain_stats": { "funded_txo_sum": 700, "spent_txo_sum": 200, "tx_count": 2 },
                "mempool_stats": { "funded_txo_sum": 0, "spent_txo_sum": 0, "tx_count": 0 }
            }),
            txs: json!([{
                "txid": "e1",
                "status": { "confirmed": true, "block_height": 5, "block_time": 1600000000 },
                "vin": [],
                "vout": [{ "scriptpubkey_address": ADDR, "value": 700 }]
            }]),
        }
    }
}
