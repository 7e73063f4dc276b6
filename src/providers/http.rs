use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use super::{ProviderError, ProviderKind};

/// Thin JSON-over-HTTP GET with a bounded timeout. Every failure mode is
/// folded into a [`ProviderError`]; nothing is retried here.
#[derive(Clone)]
pub struct JsonHttp {
    kind: ProviderKind,
    inner: Client,
    timeout: Duration,
}

impl JsonHttp {
    pub fn new(kind: ProviderKind, timeout: Duration) -> eyre::Result<Self> {
        let inner = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("wallet-ingest/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| eyre::eyre!("Failed to build HTTP client for {}: {}", kind, e))?;
        Ok(Self {
            kind,
            inner,
            timeout,
        })
    }

    pub async fn get_json(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, ProviderError> {
        tracing::debug!(provider = %self.kind, %url, "Fetching");

        let response = self
            .inner
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::HttpStatus(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;

        serde_json::from_slice(&body).map_err(|e| ProviderError::Malformed(e.to_string()))
    }

    fn transport_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(self.timeout)
        } else {
            ProviderError::Transport(e.to_string())
        }
    }
}

/// Join a configured base URL and a path without doubling slashes.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
