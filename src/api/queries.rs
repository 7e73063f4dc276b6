use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::types::*;

pub async fn get_health(pool: &PgPool) -> eyre::Result<HealthResponse> {
    let (total_wallets,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM wallets")
        .fetch_one(pool)
        .await?;

    let (total_transactions,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM wallet_transactions")
            .fetch_one(pool)
            .await?;

    Ok(HealthResponse {
        status: "ok".to_string(),
        total_wallets,
        total_transactions,
    })
}

type WalletRow = (
    String,
    String,
    BigDecimal,
    BigDecimal,
    BigDecimal,
    i64,
    BigDecimal,
    Option<String>,
    DateTime<Utc>,
);

pub async fn get_wallet(pool: &PgPool, wallet_id: &str) -> eyre::Result<Option<WalletResponse>> {
    let row: Option<WalletRow> = sqlx::query_as(
        "SELECT id, address, balance, total_received, total_sent, transaction_count,
                unconfirmed_balance, last_provider, last_updated
         FROM wallets WHERE id = $1",
    )
    .bind(wallet_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(
        |(id, address, balance, total_received, total_sent, transaction_count, unconfirmed_balance, last_provider, last_updated)| {
            WalletResponse {
                id,
                address,
                balance,
                total_received,
                total_sent,
                transaction_count,
                unconfirmed_balance,
                last_provider,
                last_updated,
            }
        },
    ))
}

type TransactionRow = (
    String,
    BigDecimal,
    String,
    DateTime<Utc>,
    bool,
    Option<BigDecimal>,
    Option<i64>,
    Option<i64>,
);

pub async fn get_wallet_transactions(
    pool: &PgPool,
    wallet_id: &str,
    limit: i64,
    offset: i64,
) -> eyre::Result<TransactionsResponse> {
    let (total,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM wallet_transactions WHERE wallet_id = $1")
            .bind(wallet_id)
            .fetch_one(pool)
            .await?;

    let rows: Vec<TransactionRow> = sqlx::query_as(
        "SELECT hash, amount, direction, occurred_at, occurred_at_estimated,
                fee, confirmations, block_height
         FROM wallet_transactions WHERE wallet_id = $1
         ORDER BY occurred_at DESC, id DESC
         LIMIT $2 OFFSET $3",
    )
    .bind(wallet_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(TransactionsResponse {
        transactions: rows
            .into_iter()
            .map(
                |(hash, amount, direction, occurred_at, occurred_at_estimated, fee, confirmations, block_height)| {
                    StoredTransaction {
                        hash,
                        amount,
                        direction,
                        occurred_at,
                        occurred_at_estimated,
                        fee,
                        confirmations,
                        block_height,
                    }
                },
            )
            .collect(),
        total,
        limit,
        offset,
    })
}
