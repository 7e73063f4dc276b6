use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use crate::normalizer::types::NormalizedTransaction;

use super::store::{StoreError, WalletAggregate, WalletStore};

/// In-memory [`WalletStore`] with the same conflict semantics as the
/// PostgreSQL schema, plus switches to simulate write failures.
#[derive(Default)]
pub struct MemoryWalletStore {
    pub wallets: Mutex<HashMap<String, WalletAggregate>>,
    pub transactions: Mutex<HashMap<(String, String), NormalizedTransaction>>,
    pub fail_aggregate: AtomicBool,
    pub fail_transactions: AtomicBool,
}

impl MemoryWalletStore {
    pub async fn transaction_count(&self, wallet_id: &str) -> usize {
        self.transactions
            .lock()
            .await
            .keys()
            .filter(|(w, _)| w == wallet_id)
            .count()
    }

    pub async fn wallet(&self, wallet_id: &str) -> Option<WalletAggregate> {
        self.wallets.lock().await.get(wallet_id).cloned()
    }
}

#[async_trait]
impl WalletStore for MemoryWalletStore {
    async fn upsert_wallet_aggregate(
        &self,
        wallet_id: &str,
        aggregate: &WalletAggregate,
    ) -> Result<(), StoreError> {
        if self.fail_aggregate.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("wallets table locked".to_string()));
        }
        self.wallets
            .lock()
            .await
            .insert(wallet_id.to_string(), aggregate.clone());
        Ok(())
    }

    async fn upsert_transactions(
        &self,
        wallet_id: &str,
        transactions: &[NormalizedTransaction],
    ) -> Result<u64, StoreError> {
        if self.fail_transactions.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("wallet_transactions table locked".to_string()));
        }
        let mut rows = self.transactions.lock().await;
        let mut inserted = 0;
        for tx in transactions {
            let key = (wallet_id.to_string(), tx.hash.clone());
            if !rows.contains_key(&key) {
                rows.insert(key, tx.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}
