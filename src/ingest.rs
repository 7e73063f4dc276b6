use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::db::gateway::{PersistReport, PersistenceGateway};
use crate::db::store::WalletStore;
use crate::normalizer::types::WalletSnapshot;
use crate::orchestrator::{IngestionExhausted, ProviderFailure, ProviderOrchestrator};
use crate::providers::{build_clients, ProviderKind};

/// Inbound ingestion request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    pub address: String,
    #[serde(default)]
    pub wallet_id: Option<String>,
}

/// What happened to the write-behind for a successful ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PersistenceStatus {
    Skipped,
    Stored(PersistReport),
    Failed { error: String },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub provider: ProviderKind,
    pub snapshot: WalletSnapshot,
    pub provider_failures: Vec<ProviderFailure>,
    pub persistence: PersistenceStatus,
}

#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("invalid wallet id: {0}")]
    InvalidWalletId(String),
    #[error(transparent)]
    Exhausted(#[from] IngestionExhausted),
}

impl IngestionError {
    pub fn provider_failures(&self) -> &[ProviderFailure] {
        match self {
            Self::Exhausted(e) => &e.failures,
            _ => &[],
        }
    }
}

/// Entry point of the pipeline: validate, fetch and normalize through the
/// orchestrator, then persist when a wallet id is given.
pub struct IngestionService {
    orchestrator: ProviderOrchestrator,
    gateway: PersistenceGateway,
}

impl IngestionService {
    pub fn new(orchestrator: ProviderOrchestrator, gateway: PersistenceGateway) -> Self {
        Self {
            orchestrator,
            gateway,
        }
    }

    /// Wire up HTTP provider clients from config against `store`.
    pub fn from_config(config: &Config, store: Arc<dyn WalletStore>) -> eyre::Result<Self> {
        let ingestion = &config.ingestion;
        let clients = build_clients(
            &ingestion.provider_priority_order,
            &config.providers,
            ingestion.per_provider_timeout(),
        )?;
        let orchestrator = ProviderOrchestrator::new(
            clients,
            ingestion.per_provider_timeout(),
            ingestion.unit_scale()?,
        );
        tracing::info!(providers = ?orchestrator.providers(), "Ingestion service ready");
        Ok(Self::new(orchestrator, PersistenceGateway::new(store)))
    }

    pub async fn ingest(&self, request: &IngestRequest) -> Result<IngestResponse, IngestionError> {
        let address = validate_address(&request.address)?;
        let wallet_id = match request.wallet_id.as_deref().map(str::trim) {
            Some("") => return Err(IngestionError::InvalidWalletId("empty".to_string())),
            other => other,
        };

        let ingested = self.orchestrator.ingest(&address).await?;

        let persistence = match wallet_id {
            None => PersistenceStatus::Skipped,
            Some(wallet_id) => match self
                .gateway
                .persist(wallet_id, &address, ingested.provider, &ingested.snapshot)
                .await
            {
                Ok(report) => PersistenceStatus::Stored(report),
                Err(e) => {
                    tracing::error!(wallet_id, %address, error = %e, "Failed to persist snapshot");
                    PersistenceStatus::Failed {
                        error: e.to_string(),
                    }
                }
            },
        };

        Ok(IngestResponse {
            provider: ingested.provider,
            snapshot: ingested.snapshot,
            provider_failures: ingested.failures,
            persistence,
        })
    }
}

/// Human-readable parts of the segwit address families. Bech32 is case
/// insensitive but explorers always report the lowercase form.
const BECH32_PREFIXES: [&str; 3] = ["bc1", "tb1", "bcrt1"];

/// Syntactic check only: base58 or bech32 character set and a plausible length.
/// Returns the canonical form that providers report, so bech32 addresses come
/// back lowercased and base58 addresses untouched.
pub fn validate_address(raw: &str) -> Result<String, IngestionError> {
    let address = raw.trim();
    if address.is_empty() {
        return Err(IngestionError::InvalidAddress("empty".to_string()));
    }
    if !(25..=90).contains(&address.len()) {
        return Err(IngestionError::InvalidAddress(format!(
            "unexpected length {}",
            address.len()
        )));
    }
    if !address.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(IngestionError::InvalidAddress(
            "contains non-alphanumeric characters".to_string(),
        ));
    }
    let lower = address.to_ascii_lowercase();
    if BECH32_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return Ok(lower);
    }
    Ok(address.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryWalletStore;
    use crate::normalizer::amount::UnitScale;
    use crate::orchestrator::testing::*;
    use crate::providers::{ProviderClient, RawProviderPayload};
    use bigdecimal::BigDecimal;
    use std::str::FromStr;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn service(
        clients: Vec<Arc<StubClient>>,
        store: Arc<MemoryWalletStore>,
    ) -> IngestionService {
        let clients = clients
            .into_iter()
            .map(|c| c as Arc<dyn ProviderClient>)
            .collect();
        let orchestrator =
            ProviderOrchestrator::new(clients, Duration::from_secs(1), UnitScale::BITCOIN);
        IngestionService::new(orchestrator, PersistenceGateway::new(store))
    }

    fn explorer_a() -> Arc<StubClient> {
        Arc::new(StubClient::new(
            ProviderKind::BlockchainInfo,
            Behavior::Respond(RawProviderPayload::BlockchainInfo(blockchain_info_body())),
        ))
    }

    fn request(wallet_id: Option<&str>) -> IngestRequest {
        IngestRequest {
            address: ADDR.to_string(),
            wallet_id: wallet_id.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_end_to_end_snapshot() {
        let store = Arc::new(MemoryWalletStore::default());
        let svc = service(vec![explorer_a()], store.clone());

        let response = svc.ingest(&request(Some("wallet-1"))).await.unwrap();
        let snap = &response.snapshot;
        assert_eq!(response.provider, ProviderKind::BlockchainInfo);
        assert_eq!(snap.balance, BigDecimal::from_str("2.5").unwrap());
        assert_eq!(snap.total_received, BigDecimal::from_str("5.0").unwrap());
        assert_eq!(snap.total_sent, BigDecimal::from_str("2.5").unwrap());
        assert_eq!(snap.transaction_count, 3);
        assert_eq!(snap.transactions.len(), 2);
        assert_eq!(
            response.persistence,
            PersistenceStatus::Stored(PersistReport {
                transactions_inserted: 2
            })
        );

        let wallet = store.wallet("wallet-1").await.unwrap();
        assert_eq!(wallet.address, ADDR);
        assert_eq!(wallet.transaction_count, 3);
    }

    #[tokio::test]
    async fn test_reingestion_is_idempotent() {
        let store = Arc::new(MemoryWalletStore::default());
        let svc = service(vec![explorer_a()], store.clone());

        let first = svc.ingest(&request(Some("wallet-1"))).await.unwrap();
        let aggregate_after_first = store.wallet("wallet-1").await.unwrap();
        let second = svc.ingest(&request(Some("wallet-1"))).await.unwrap();

        assert_eq!(
            second.persistence,
            PersistenceStatus::Stored(PersistReport {
                transactions_inserted: 0
            })
        );
        assert_eq!(store.transaction_count("wallet-1").await, 2);
        assert_eq!(store.wallet("wallet-1").await.unwrap(), aggregate_after_first);
        assert_eq!(first.snapshot.balance, second.snapshot.balance);
    }

    #[tokio::test]
    async fn test_exhausted_persists_nothing() {
        let store = Arc::new(MemoryWalletStore::default());
        let svc = service(
            vec![
                Arc::new(StubClient::new(ProviderKind::BlockchainInfo, Behavior::Fail)),
                Arc::new(StubClient::new(ProviderKind::BlockCypher, Behavior::Fail)),
                Arc::new(StubClient::new(ProviderKind::Esplora, Behavior::Fail)),
            ],
            store.clone(),
        );

        let err = svc.ingest(&request(Some("wallet-1"))).await.unwrap_err();
        assert!(matches!(err, IngestionError::Exhausted(_)));
        assert_eq!(err.provider_failures().len(), 3);
        assert!(store.wallets.lock().await.is_empty());
        assert!(store.transactions.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_still_returns_snapshot() {
        let store = Arc::new(MemoryWalletStore::default());
        store.fail_transactions.store(true, Ordering::SeqCst);
        let svc = service(vec![explorer_a()], store);

        let response = svc.ingest(&request(Some("wallet-1"))).await.unwrap();
        assert_eq!(response.snapshot.transactions.len(), 2);
        assert!(matches!(response.persistence, PersistenceStatus::Failed { .. }));
    }

    #[tokio::test]
    async fn test_without_wallet_id_skips_persistence() {
        let store = Arc::new(MemoryWalletStore::default());
        let svc = service(vec![explorer_a()], store.clone());

        let response = svc.ingest(&request(None)).await.unwrap();
        assert_eq!(response.persistence, PersistenceStatus::Skipped);
        assert!(store.wallets.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_providers() {
        let a = explorer_a();
        let svc = service(vec![a.clone()], Arc::new(MemoryWalletStore::default()));

        let bad_address = IngestRequest {
            address: "not an address!".to_string(),
            wallet_id: None,
        };
        assert!(matches!(
            svc.ingest(&bad_address).await,
            Err(IngestionError::InvalidAddress(_))
        ));
        assert!(matches!(
            svc.ingest(&request(Some("  "))).await,
            Err(IngestionError::InvalidWalletId(_))
        ));
        assert_eq!(a.calls(), 0);
    }

    #[test]
    fn test_validate_address() {
        assert_eq!(
            validate_address("  1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa ").unwrap(),
            "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa"
        );
        assert!(validate_address("bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq").is_ok());
        assert!(validate_address("").is_err());
        assert!(validate_address("1short").is_err());
        assert!(validate_address("1A1zP1eP5QGefi2DMPTfTL5SLmv7Div/../x").is_err());
    }

    #[test]
    fn test_bech32_address_is_lowercased() {
        assert_eq!(
            validate_address("BC1QAR0SRRR7XFKVY5L643LYDNW9RE59GTZZWF5MDQ").unwrap(),
            "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq"
        );
        assert_eq!(
            validate_address("TB1QW508D6QEJXTDG4Y5R3ZARVARY0C5XW7KXPJZSX").unwrap(),
            "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx"
        );
        // Base58 is case sensitive.
        assert_eq!(
            validate_address("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2").unwrap(),
            "1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2"
        );
    }

    #[tokio::test]
    async fn test_uppercase_bech32_matches_provider_outputs() {
        let lower = "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq";
        let stats = serde_json::json!({
            "chain_stats": { "funded_txo_sum": 1000, "spent_txo_sum": 0, "tx_count": 1 },
            "mempool_stats": { "funded_txo_sum": 0, "spent_txo_sum": 0, "tx_count": 0 }
        });
        let txs = serde_json::json!([{
            "txid": "deposit",
            "status": { "confirmed": true, "block_height": 800000, "block_time": 1690000000 },
            "vin": [{ "prevout": null }],
            "vout": [{ "scriptpubkey_address": lower, "value": 1000 }]
        }]);
        let esplora = Arc::new(StubClient::new(
            ProviderKind::Esplora,
            Behavior::Respond(RawProviderPayload::Esplora { stats, txs }),
        ));
        let store = Arc::new(MemoryWalletStore::default());
        let svc = service(vec![esplora], store.clone());

        let response = svc
            .ingest(&IngestRequest {
                address: lower.to_ascii_uppercase(),
                wallet_id: Some("wallet-1".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(response.snapshot.transaction_count, 1);
        assert_eq!(response.snapshot.transactions.len(), 1);
        assert_eq!(response.snapshot.transactions[0].hash, "deposit");
        assert_eq!(store.wallet("wallet-1").await.unwrap().address, lower);
    }

    #[test]
    fn test_request_accepts_null_wallet_id() {
        let req: IngestRequest =
            serde_json::from_str(r#"{"address": "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa", "walletId": null}"#)
                .unwrap();
        assert!(req.wallet_id.is_none());
    }

    #[test]
    fn test_persistence_status_json() {
        let stored = serde_json::to_value(PersistenceStatus::Stored(PersistReport {
            transactions_inserted: 4,
        }))
        .unwrap();
        assert_eq!(stored["status"], "stored");
        assert_eq!(stored["transactionsInserted"], 4);
        assert_eq!(
            serde_json::to_value(PersistenceStatus::Skipped).unwrap()["status"],
            "skipped"
        );
    }
}
