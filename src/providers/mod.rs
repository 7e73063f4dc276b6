pub mod blockchain_info;
pub mod blockcypher;
pub mod esplora;
pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ProvidersConfig;

/// The explorers the pipeline knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Address summary with inline transactions.
    BlockchainInfo,
    /// Address summary with a list of UTXO references.
    #[serde(rename = "blockcypher")]
    BlockCypher,
    /// Separate address stats and transaction list calls.
    Esplora,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BlockchainInfo => "blockchain_info",
            Self::BlockCypher => "blockcypher",
            Self::Esplora => "esplora",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw JSON exactly as a provider returned it, tagged by provider shape.
#[derive(Debug, Clone)]
pub enum RawProviderPayload {
    BlockchainInfo(serde_json::Value),
    BlockCypher(serde_json::Value),
    Esplora {
        stats: serde_json::Value,
        txs: serde_json::Value,
    },
}

impl RawProviderPayload {
    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::BlockchainInfo(_) => ProviderKind::BlockchainInfo,
            Self::BlockCypher(_) => ProviderKind::BlockCypher,
            Self::Esplora { .. } => ProviderKind::Esplora,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// One HTTP data provider. Implementations make no retries and keep no
/// state between calls.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn fetch(&self, address: &str) -> Result<RawProviderPayload, ProviderError>;
}

/// Build clients for `order`, skipping providers without an endpoint.
pub fn build_clients(
    order: &[ProviderKind],
    providers: &ProvidersConfig,
    timeout: Duration,
) -> eyre::Result<Vec<Arc<dyn ProviderClient>>> {
    let mut clients: Vec<Arc<dyn ProviderClient>> = Vec::with_capacity(order.len());
    for kind in order {
        let Some(endpoint) = providers.endpoint(*kind) else {
            tracing::warn!(provider = %kind, "No endpoint configured, provider disabled");
            continue;
        };
        let http = http::JsonHttp::new(*kind, timeout)?;
        let client: Arc<dyn ProviderClient> = match kind {
            ProviderKind::BlockchainInfo => {
                Arc::new(blockchain_info::BlockchainInfoClient::new(http, endpoint))
            }
            ProviderKind::BlockCypher => {
                Arc::new(blockcypher::BlockCypherClient::new(http, endpoint))
            }
            ProviderKind::Esplora => Arc::new(esplora::EsploraClient::new(http, endpoint)),
        };
        clients.push(client);
    }
    Ok(clients)
}
