use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Net effect of a transaction on the queried address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TxDirection {
    Incoming,
    Outgoing,
}

impl TxDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incoming => "incoming",
            Self::Outgoing => "outgoing",
        }
    }
}

/// One ledger event, seen from the queried address only.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedTransaction {
    pub hash: String,
    /// Non-negative magnitude in major units.
    pub amount: BigDecimal,
    #[serde(rename = "type")]
    pub direction: TxDirection,
    pub occurred_at: DateTime<Utc>,
    /// Set when the provider reported no block time and request time was used.
    pub occurred_at_estimated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<BigDecimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmations: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_height: Option<i64>,
}

/// Provider-agnostic state of one address at query time. Built fresh on
/// every ingestion, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSnapshot {
    pub balance: BigDecimal,
    pub total_received: BigDecimal,
    pub total_sent: BigDecimal,
    pub transaction_count: i64,
    pub unconfirmed_balance: BigDecimal,
    pub transactions: Vec<NormalizedTransaction>,
}
