use async_trait::async_trait;
use bigdecimal::BigDecimal;

use crate::normalizer::types::{NormalizedTransaction, WalletSnapshot};
use crate::providers::ProviderKind;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Aggregate columns of a wallet row, written last-write-wins.
#[derive(Debug, Clone, PartialEq)]
pub struct WalletAggregate {
    pub address: String,
    pub balance: BigDecimal,
    pub total_received: BigDecimal,
    pub total_sent: BigDecimal,
    pub transaction_count: i64,
    pub unconfirmed_balance: BigDecimal,
    pub provider: ProviderKind,
}

impl WalletAggregate {
    pub fn from_snapshot(address: &str, provider: ProviderKind, snapshot: &WalletSnapshot) -> Self {
        Self {
            address: address.to_string(),
            balance: snapshot.balance.clone(),
            total_received: snapshot.total_received.clone(),
            total_sent: snapshot.total_sent.clone(),
            transaction_count: snapshot.transaction_count,
            unconfirmed_balance: snapshot.unconfirmed_balance.clone(),
            provider,
        }
    }
}

/// Row storage for wallets and their transactions.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Overwrite the aggregate fields of `wallet_id` and stamp `last_updated`.
    async fn upsert_wallet_aggregate(
        &self,
        wallet_id: &str,
        aggregate: &WalletAggregate,
    ) -> Result<(), StoreError>;

    /// Insert transactions keyed by `(wallet_id, hash)`, ignoring rows that
    /// already exist. Returns the number of rows actually inserted.
    async fn upsert_transactions(
        &self,
        wallet_id: &str,
        transactions: &[NormalizedTransaction],
    ) -> Result<u64, StoreError>;
}
