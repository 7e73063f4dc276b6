use async_trait::async_trait;

use crate::config::ProviderEndpoint;

use super::http::{join_url, JsonHttp};
use super::{ProviderClient, ProviderError, ProviderKind, RawProviderPayload};

/// Explorer returning an address summary plus UTXO references.
pub struct BlockCypherClient {
    http: JsonHttp,
    base_url: String,
    api_key: Option<String>,
}

impl BlockCypherClient {
    pub fn new(http: JsonHttp, endpoint: &ProviderEndpoint) -> Self {
        Self {
            http,
            base_url: endpoint.base_url.clone(),
            api_key: endpoint.api_key.clone(),
        }
    }
}

#[async_trait]
impl ProviderClient for BlockCypherClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::BlockCypher
    }

    async fn fetch(&self, address: &str) -> Result<RawProviderPayload, ProviderError> {
        let url = join_url(&self.base_url, &format!("addrs/{}", address));
        let mut query = Vec::new();
        if let Some(token) = &self.api_key {
            query.push(("token", token.as_str()));
        }
        let body = self.http.get_json(&url, &query).await?;
        Ok(RawProviderPayload::BlockCypher(body))
    }
}
