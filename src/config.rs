use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

use crate::normalizer::amount::UnitScale;
use crate::providers::ProviderKind;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

// ============================================================
// Ingestion Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct IngestionConfig {
    #[serde(default = "default_priority_order")]
    pub provider_priority_order: Vec<ProviderKind>,
    #[serde(default = "default_per_provider_timeout_ms")]
    pub per_provider_timeout_ms: u64,
    /// Base units per major unit, e.g. 100000000 satoshis per BTC.
    #[serde(default = "default_unit_scale")]
    pub unit_scale: u64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            provider_priority_order: default_priority_order(),
            per_provider_timeout_ms: default_per_provider_timeout_ms(),
            unit_scale: default_unit_scale(),
        }
    }
}

impl IngestionConfig {
    pub fn per_provider_timeout(&self) -> Duration {
        Duration::from_millis(self.per_provider_timeout_ms)
    }

    pub fn unit_scale(&self) -> eyre::Result<UnitScale> {
        UnitScale::from_factor(self.unit_scale)
            .ok_or_else(|| eyre::eyre!("unit_scale {} is not a power of ten", self.unit_scale))
    }
}

fn default_priority_order() -> Vec<ProviderKind> {
    vec![
        ProviderKind::BlockchainInfo,
        ProviderKind::BlockCypher,
        ProviderKind::Esplora,
    ]
}

fn default_per_provider_timeout_ms() -> u64 {
    10_000
}

fn default_unit_scale() -> u64 {
    100_000_000
}

// ============================================================
// Provider Endpoints
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct ProvidersConfig {
    pub blockchain_info: Option<ProviderEndpoint>,
    pub blockcypher: Option<ProviderEndpoint>,
    pub esplora: Option<ProviderEndpoint>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            blockchain_info: Some(ProviderEndpoint::new("https://blockchain.info")),
            blockcypher: Some(ProviderEndpoint::new(
                "https://api.blockcypher.com/v1/btc/main",
            )),
            esplora: Some(ProviderEndpoint::new("https://blockstream.info/api")),
        }
    }
}

impl ProvidersConfig {
    pub fn endpoint(&self, kind: ProviderKind) -> Option<&ProviderEndpoint> {
        match kind {
            ProviderKind::BlockchainInfo => self.blockchain_info.as_ref(),
            ProviderKind::BlockCypher => self.blockcypher.as_ref(),
            ProviderKind::Esplora => self.esplora.as_ref(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProviderEndpoint {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl ProviderEndpoint {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            api_key: None,
        }
    }
}

// ============================================================
// API Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_api_port")]
    pub port: u16,
    #[serde(default = "default_api_host")]
    pub host: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

fn default_api_port() -> u16 {
    3000
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

impl Config {
    pub fn load(path: &str) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("Failed to read config file '{}': {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| eyre::eyre!("Failed to parse config file '{}': {}", path, e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> eyre::Result<()> {
        let ingestion = &self.ingestion;
        if ingestion.provider_priority_order.is_empty() {
            return Err(eyre::eyre!("At least one provider must be listed in provider_priority_order"));
        }
        if ingestion.per_provider_timeout_ms == 0 {
            return Err(eyre::eyre!("per_provider_timeout_ms must be greater than zero"));
        }
        ingestion.unit_scale()?;

        let mut seen = HashSet::new();
        for kind in &ingestion.provider_priority_order {
            if !seen.insert(*kind) {
                return Err(eyre::eyre!("Provider '{}' is listed more than once", kind));
            }
            let endpoint = self
                .providers
                .endpoint(*kind)
                .ok_or_else(|| eyre::eyre!("Provider '{}' has no [providers.{}] section", kind, kind))?;
            if !endpoint.base_url.starts_with("http://") && !endpoint.base_url.starts_with("https://") {
                return Err(eyre::eyre!(
                    "Invalid base_url '{}' for provider '{}'",
                    endpoint.base_url,
                    kind
                ));
            }
        }
        Ok(())
    }
}
