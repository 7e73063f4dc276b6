use async_trait::async_trait;

use crate::config::ProviderEndpoint;

use super::http::{join_url, JsonHttp};
use super::{ProviderClient, ProviderError, ProviderKind, RawProviderPayload};

/// Explorer returning balance and transactions in a single call.
pub struct BlockchainInfoClient {
    http: JsonHttp,
    base_url: String,
}

impl BlockchainInfoClient {
    pub fn new(http: JsonHttp, endpoint: &ProviderEndpoint) -> Self {
        Self {
            http,
            base_url: endpoint.base_url.clone(),
        }
    }
}

#[async_trait]
impl ProviderClient for BlockchainInfoClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::BlockchainInfo
    }

    async fn fetch(&self, address: &str) -> Result<RawProviderPayload, ProviderError> {
        let url = join_url(&self.base_url, &format!("rawaddr/{}", address));
        let body = self.http.get_json(&url, &[]).await?;
        Ok(RawProviderPayload::BlockchainInfo(body))
    }
}
