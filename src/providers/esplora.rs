use async_trait::async_trait;

use crate::config::ProviderEndpoint;

use super::http::{join_url, JsonHttp};
use super::{ProviderClient, ProviderError, ProviderKind, RawProviderPayload};

/// Explorer with split address-stats and transaction-list endpoints.
/// Both calls must succeed for the fetch to succeed.
pub struct EsploraClient {
    http: JsonHttp,
    base_url: String,
}

impl EsploraClient {
    pub fn new(http: JsonHttp, endpoint: &ProviderEndpoint) -> Self {
        Self {
            http,
            base_url: endpoint.base_url.clone(),
        }
    }
}

#[async_trait]
impl ProviderClient for EsploraClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Esplora
    }

    async fn fetch(&self, address: &str) -> Result<RawProviderPayload, ProviderError> {
        let stats_url = join_url(&self.base_url, &format!("address/{}", address));
        let txs_url = join_url(&self.base_url, &format!("address/{}/txs", address));

        let stats = self.http.get_json(&stats_url, &[]).await?;
        let txs = self.http.get_json(&txs_url, &[]).await?;

        Ok(RawProviderPayload::Esplora { stats, txs })
    }
}
