use serde::Serialize;
use std::sync::Arc;

use crate::normalizer::types::WalletSnapshot;
use crate::providers::ProviderKind;

use super::store::{StoreError, WalletAggregate, WalletStore};

/// Outcome of a fully successful persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistReport {
    pub transactions_inserted: u64,
}

/// The aggregate write and the transaction write are independent; a
/// failure in one does not undo the other.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("wallet aggregate write failed: {0}")]
    Aggregate(StoreError),
    #[error("transaction upsert failed: {0}")]
    Transactions(StoreError),
    #[error("wallet aggregate write failed: {aggregate}; transaction upsert failed: {transactions}")]
    Both {
        aggregate: StoreError,
        transactions: StoreError,
    },
}

/// Sole writer of wallet and transaction rows.
#[derive(Clone)]
pub struct PersistenceGateway {
    store: Arc<dyn WalletStore>,
}

impl PersistenceGateway {
    pub fn new(store: Arc<dyn WalletStore>) -> Self {
        Self { store }
    }

    pub async fn persist(
        &self,
        wallet_id: &str,
        address: &str,
        provider: ProviderKind,
        snapshot: &WalletSnapshot,
    ) -> Result<PersistReport, PersistenceError> {
        let aggregate = WalletAggregate::from_snapshot(address, provider, snapshot);

        let aggregate_result = self.store.upsert_wallet_aggregate(wallet_id, &aggregate).await;
        let transactions_result = self
            .store
            .upsert_transactions(wallet_id, &snapshot.transactions)
            .await;

        match (aggregate_result, transactions_result) {
            (Ok(()), Ok(transactions_inserted)) => {
                tracing::info!(
                    wallet_id,
                    transactions_inserted,
                    transactions_seen = snapshot.transactions.len(),
                    "Wallet persisted"
                );
                Ok(PersistReport {
                    transactions_inserted,
                })
            }
            (Err(aggregate), Ok(_)) => Err(PersistenceError::Aggregate(aggregate)),
            (Ok(()), Err(transactions)) => Err(PersistenceError::Transactions(transactions)),
            (Err(aggregate), Err(transactions)) => Err(PersistenceError::Both {
                aggregate,
                transactions,
            }),
        }
    }
}
