use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;

use crate::ingest::{IngestRequest, IngestionError};

use super::queries;
use super::types::*;
use super::AppState;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

fn api_error(status: StatusCode, msg: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: msg.into(),
        }),
    )
}

pub async fn health(State(state): State<Arc<AppState>>) -> ApiResult<HealthResponse> {
    queries::get_health(&state.pool)
        .await
        .map(Json)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

// ============================================================
// Ingestion
// ============================================================

pub async fn ingest_wallet(
    State(state): State<Arc<AppState>>,
    request: Result<Json<IngestRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match request {
        Ok(request) => request,
        Err(rejection) => return rejected_request(rejection),
    };
    match state.service.ingest(&request).await {
        Ok(response) => Json(IngestSuccessResponse {
            success: true,
            response,
        })
        .into_response(),
        Err(e) => {
            let status = ingestion_status(&e);
            (status, Json(IngestFailureResponse::from(&e))).into_response()
        }
    }
}

/// Body that could not be read as an ingestion request.
fn rejected_request(rejection: JsonRejection) -> Response {
    let body = IngestFailureResponse::invalid_request(rejection.body_text());
    (rejection.status(), Json(body)).into_response()
}

fn ingestion_status(e: &IngestionError) -> StatusCode {
    match e {
        IngestionError::InvalidAddress(_) | IngestionError::InvalidWalletId(_) => {
            StatusCode::BAD_REQUEST
        }
        IngestionError::Exhausted(_) => StatusCode::BAD_GATEWAY,
    }
}

// ============================================================
// Stored wallets
// ============================================================

pub async fn wallet_detail(
    State(state): State<Arc<AppState>>,
    Path(wallet_id): Path<String>,
) -> ApiResult<WalletResponse> {
    match queries::get_wallet(&state.pool, &wallet_id).await {
        Ok(Some(wallet)) => Ok(Json(wallet)),
        Ok(None) => Err(api_error(StatusCode::NOT_FOUND, "wallet not found")),
        Err(e) => Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

pub async fn wallet_transactions(
    State(state): State<Arc<AppState>>,
    Path(wallet_id): Path<String>,
    Query(params): Query<Pagination>,
) -> ApiResult<TransactionsResponse> {
    let limit = params.limit.unwrap_or(100).clamp(1, 1000);
    let offset = params.offset.unwrap_or(0).max(0);
    queries::get_wallet_transactions(&state.pool, &wallet_id, limit, offset)
        .await
        .map(Json)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}
