use async_trait::async_trait;
use sqlx::PgPool;

use crate::normalizer::types::NormalizedTransaction;

use super::store::{StoreError, WalletAggregate, WalletStore};

/// PostgreSQL-backed [`WalletStore`].
#[derive(Clone)]
pub struct PgWalletStore {
    pool: PgPool,
}

impl PgWalletStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WalletStore for PgWalletStore {
    async fn upsert_wallet_aggregate(
        &self,
        wallet_id: &str,
        aggregate: &WalletAggregate,
    ) -> Result<(), StoreError> {
        upsert_wallet_aggregate(&self.pool, wallet_id, aggregate).await
    }

    async fn upsert_transactions(
        &self,
        wallet_id: &str,
        transactions: &[NormalizedTransaction],
    ) -> Result<u64, StoreError> {
        insert_transactions_batch(&self.pool, wallet_id, transactions).await
    }
}

/// Upsert the wallet row with the latest aggregate fields (last write wins).
pub async fn upsert_wallet_aggregate(
    pool: &PgPool,
    wallet_id: &str,
    aggregate: &WalletAggregate,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO wallets (id, address, balance, total_received, total_sent,
                              transaction_count, unconfirmed_balance, last_provider, last_updated)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
         ON CONFLICT (id) DO UPDATE
         SET address = $2, balance = $3, total_received = $4, total_sent = $5,
             transaction_count = $6, unconfirmed_balance = $7, last_provider = $8,
             last_updated = NOW()",
    )
    .bind(wallet_id)
    .bind(&aggregate.address)
    .bind(&aggregate.balance)
    .bind(&aggregate.total_received)
    .bind(&aggregate.total_sent)
    .bind(aggregate.transaction_count)
    .bind(&aggregate.unconfirmed_balance)
    .bind(aggregate.provider.as_str())
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert a batch of transactions using multi-row INSERT with ON CONFLICT DO NOTHING.
/// Chunks into groups of 1000 to stay within PostgreSQL parameter limits.
pub async fn insert_transactions_batch(
    pool: &PgPool,
    wallet_id: &str,
    transactions: &[NormalizedTransaction],
) -> Result<u64, StoreError> {
    if transactions.is_empty() {
        return Ok(0);
    }

    let mut inserted = 0u64;
    for chunk in transactions.chunks(1000) {
        let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> = sqlx::QueryBuilder::new(
            "INSERT INTO wallet_transactions (wallet_id, hash, amount, direction, occurred_at, \
             occurred_at_estimated, fee, confirmations, block_height) ",
        );

        query_builder.push_values(chunk, |mut b, tx| {
            b.push_bind(wallet_id)
                .push_bind(&tx.hash)
                .push_bind(&tx.amount)
                .push_bind(tx.direction.as_str())
                .push_bind(tx.occurred_at)
                .push_bind(tx.occurred_at_estimated)
                .push_bind(&tx.fee)
                .push_bind(tx.confirmations)
                .push_bind(tx.block_height);
        });

        query_builder.push(" ON CONFLICT (wallet_id, hash) DO NOTHING");
        let result = query_builder.build().execute(pool).await?;
        inserted += result.rows_affected();
    }

    Ok(inserted)
}
