//! Log ingestion and catch-up query endpoints
//!
//! Both endpoints speak the `{success, data | error}` envelope. Ingestion
//! delegates to the shared gateway; the query path returns the most recent
//! records for an owner, newest first, capped at `MAX_QUERY_LIMIT`.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use crate::handlers::token_from_request;
use crate::ingest::{IngestError, Submission};
use crate::models::{
    ErrorResponse, IngestRequest, IngestResponse, LogsResponse, OwnerTokenQuery, MAX_QUERY_LIMIT,
};
use crate::AppState;

#[utoipa::path(
    post,
    path = "/api/v1/logs",
    request_body = IngestRequest,
    responses(
        (status = 201, description = "Record stored and broadcast", body = IngestResponse),
        (status = 400, description = "Missing or unknown identity token", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    tag = "logs"
)]
pub async fn create_log(
    State(state): State<AppState>,
    Json(req): Json<IngestRequest>,
) -> Response {
    let submission = Submission {
        level: req.level,
        message: req.message,
        service: req.service,
        meta: req.meta,
        occurred_at: req.occurred_at,
        owner_token: req.owner_token,
        alias_token: req.alias_token,
    };

    match state.ingest.ingest(submission).await {
        Ok(envelope) => (
            StatusCode::CREATED,
            Json(IngestResponse {
                success: true,
                data: envelope,
            }),
        )
            .into_response(),
        Err(e @ (IngestError::MissingIdentifier | IngestError::UnknownIdentifier)) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(e.to_string())),
        )
            .into_response(),
        Err(IngestError::Store(e)) => {
            error!(error = %e, "log ingestion failed at the store layer");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("failed to store record")),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/logs",
    params(OwnerTokenQuery),
    responses(
        (status = 200, description = "Most recent records, newest first", body = LogsResponse),
        (status = 400, description = "No owner token supplied", body = ErrorResponse),
        (status = 401, description = "Unknown owner token", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    tag = "logs"
)]
pub async fn get_logs(
    State(state): State<AppState>,
    Query(query): Query<OwnerTokenQuery>,
    headers: HeaderMap,
) -> Response {
    let Some(token) = token_from_request(query.owner_token.as_deref(), &headers) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("an owner token is required")),
        )
            .into_response();
    };

    let owner = match state.identities.find_by_token(&token).await {
        Ok(Some(owner)) => owner,
        Ok(None) => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new("no identity matches the supplied token")),
            )
                .into_response();
        }
        Err(e) => {
            error!(error = %e, "identity lookup failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("identity lookup failed")),
            )
                .into_response();
        }
    };

    match state.records.recent_for_owner(&owner.id, MAX_QUERY_LIMIT).await {
        Ok(records) => (
            StatusCode::OK,
            Json(LogsResponse {
                success: true,
                count: records.len(),
                data: records,
            }),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, owner = %owner.username, "record query failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("failed to query records")),
            )
                .into_response()
        }
    }
}
