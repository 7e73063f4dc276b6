pub mod accounting;
pub mod amount;
pub mod blockchain_info;
pub mod blockcypher;
pub mod esplora;
pub mod types;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::providers::{ProviderKind, RawProviderPayload};

use self::amount::UnitScale;
use self::types::WalletSnapshot;

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("malformed {provider} payload: {reason}")]
    Malformed {
        provider: ProviderKind,
        reason: String,
    },
}

/// Inputs shared by every normalizer for one ingestion call.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeContext {
    pub scale: UnitScale,
    /// Substituted for transactions that carry no block time.
    pub requested_at: DateTime<Utc>,
}

/// Reduces one provider's raw payload to the canonical snapshot for `address`.
///
/// Address-level aggregates come from the provider's summary fields, not
/// from the transaction list, which may be paginated.
pub trait Normalizer {
    fn normalize(
        &self,
        address: &str,
        ctx: &NormalizeContext,
    ) -> Result<WalletSnapshot, NormalizeError>;
}

impl Normalizer for RawProviderPayload {
    fn normalize(
        &self,
        address: &str,
        ctx: &NormalizeContext,
    ) -> Result<WalletSnapshot, NormalizeError> {
        match self {
            RawProviderPayload::BlockchainInfo(body) => {
                blockchain_info::normalize(body, address, ctx)
            }
            RawProviderPayload::BlockCypher(body) => blockcypher::normalize(body, address, ctx),
            RawProviderPayload::Esplora { stats, txs } => {
                esplora::normalize(stats, txs, address, ctx)
            }
        }
    }
}

/// Deserialize a payload section that must be well formed.
fn parse_required<T: DeserializeOwned>(
    provider: ProviderKind,
    value: &Value,
) -> Result<T, NormalizeError> {
    T::deserialize(value).map_err(|e| NormalizeError::Malformed {
        provider,
        reason: e.to_string(),
    })
}

/// Deserialize list entries one by one, skipping those that don't fit.
fn parse_entries<T: DeserializeOwned>(provider: ProviderKind, entries: &[Value]) -> Vec<T> {
    let mut parsed = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        match T::deserialize(entry) {
            Ok(item) => parsed.push(item),
            Err(e) => {
                tracing::warn!(
                    provider = %provider,
                    index,
                    error = %e,
                    "Skipping malformed transaction entry"
                );
            }
        }
    }
    parsed
}
