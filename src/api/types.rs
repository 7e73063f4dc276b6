use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ingest::{IngestResponse, IngestionError};
use crate::orchestrator::ProviderFailure;

// ============================================================
// Query params
// ============================================================

#[derive(Debug, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// ============================================================
// Response types
// ============================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub total_wallets: i64,
    pub total_transactions: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletResponse {
    pub id: String,
    pub address: String,
    pub balance: BigDecimal,
    pub total_received: BigDecimal,
    pub total_sent: BigDecimal,
    pub transaction_count: i64,
    pub unconfirmed_balance: BigDecimal,
    pub last_provider: Option<String>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTransaction {
    pub hash: String,
    pub amount: BigDecimal,
    #[serde(rename = "type")]
    pub direction: String,
    pub occurred_at: DateTime<Utc>,
    pub occurred_at_estimated: bool,
    pub fee: Option<BigDecimal>,
    pub confirmations: Option<i64>,
    pub block_height: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub transactions: Vec<StoredTransaction>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct IngestSuccessResponse {
    pub success: bool,
    #[serde(flatten)]
    pub response: IngestResponse,
}

/// Failed ingestion as seen by the dashboard.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestFailureResponse {
    pub success: bool,
    pub error: String,
    pub provider_failures: Vec<ProviderFailure>,
}

impl IngestFailureResponse {
    /// Request rejected before it reached the pipeline.
    pub fn invalid_request(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            provider_failures: Vec::new(),
        }
    }
}

impl From<&IngestionError> for IngestFailureResponse {
    fn from(e: &IngestionError) -> Self {
        Self {
            success: false,
            error: e.to_string(),
            provider_failures: e.provider_failures().to_vec(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
