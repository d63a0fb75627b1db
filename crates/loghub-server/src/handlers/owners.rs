//! Owner account endpoints
//!
//! Registration, profile lookup, and the two settings operations: the
//! custom alias token and the retention window. These are CRUD glue around
//! the identity store; the distribution subsystem only consumes the
//! resulting identities.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use crate::handlers::token_from_request;
use crate::models::{
    ErrorResponse, OwnerResponse, OwnerTokenQuery, RegisterOwnerRequest, UpdateAliasRequest,
    UpdateRetentionRequest,
};
use crate::store::StoreError;
use crate::AppState;

#[utoipa::path(
    post,
    path = "/api/v1/owners",
    request_body = RegisterOwnerRequest,
    responses(
        (status = 201, description = "Owner created", body = OwnerResponse),
        (status = 200, description = "Owner already existed", body = OwnerResponse),
        (status = 400, description = "Invalid username", body = ErrorResponse)
    ),
    tag = "owners"
)]
pub async fn register_owner(
    State(state): State<AppState>,
    Json(req): Json<RegisterOwnerRequest>,
) -> Response {
    let username = req.username.trim();
    if username.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("username is required")),
        )
            .into_response();
    }

    let existing = match state.identities.find_by_username(username).await {
        Ok(existing) => existing,
        Err(e) => return store_failure(e, "owner lookup failed"),
    };
    let status = if existing.is_some() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    match state.identities.create_owner(username).await {
        Ok(owner) => (
            status,
            Json(OwnerResponse {
                success: true,
                data: owner,
            }),
        )
            .into_response(),
        Err(e) => store_failure(e, "owner registration failed"),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/owners/me",
    params(OwnerTokenQuery),
    responses(
        (status = 200, description = "Owner profile", body = OwnerResponse),
        (status = 400, description = "No owner token supplied", body = ErrorResponse),
        (status = 401, description = "Unknown owner token", body = ErrorResponse)
    ),
    tag = "owners"
)]
pub async fn get_me(
    State(state): State<AppState>,
    Query(query): Query<OwnerTokenQuery>,
    headers: HeaderMap,
) -> Response {
    match resolve_owner(&state, query.owner_token.as_deref(), &headers).await {
        Ok(owner) => (
            StatusCode::OK,
            Json(OwnerResponse {
                success: true,
                data: owner,
            }),
        )
            .into_response(),
        Err(response) => response,
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/owners/alias",
    request_body = UpdateAliasRequest,
    responses(
        (status = 200, description = "Alias updated", body = OwnerResponse),
        (status = 401, description = "Unknown owner token", body = ErrorResponse),
        (status = 409, description = "Alias already in use", body = ErrorResponse)
    ),
    tag = "owners"
)]
pub async fn update_alias(
    State(state): State<AppState>,
    Json(req): Json<UpdateAliasRequest>,
) -> Response {
    let owner = match resolve_owner(&state, Some(&req.owner_token), &HeaderMap::new()).await {
        Ok(owner) => owner,
        Err(response) => return response,
    };

    match state.identities.set_alias(&owner.id, req.alias_token).await {
        Ok(owner) => (
            StatusCode::OK,
            Json(OwnerResponse {
                success: true,
                data: owner,
            }),
        )
            .into_response(),
        Err(StoreError::AliasTaken(alias)) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse::new(format!(
                "alias token already in use: {alias}"
            ))),
        )
            .into_response(),
        Err(e) => store_failure(e, "alias update failed"),
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/owners/retention",
    request_body = UpdateRetentionRequest,
    responses(
        (status = 200, description = "Retention window updated", body = OwnerResponse),
        (status = 401, description = "Unknown owner token", body = ErrorResponse)
    ),
    tag = "owners"
)]
pub async fn update_retention(
    State(state): State<AppState>,
    Json(req): Json<UpdateRetentionRequest>,
) -> Response {
    let owner = match resolve_owner(&state, Some(&req.owner_token), &HeaderMap::new()).await {
        Ok(owner) => owner,
        Err(response) => return response,
    };

    match state
        .identities
        .set_retention(&owner.id, Some(req.retention_days))
        .await
    {
        Ok(owner) => (
            StatusCode::OK,
            Json(OwnerResponse {
                success: true,
                data: owner,
            }),
        )
            .into_response(),
        Err(e) => store_failure(e, "retention update failed"),
    }
}

async fn resolve_owner(
    state: &AppState,
    query_token: Option<&str>,
    headers: &HeaderMap,
) -> Result<loghub_core::OwnerIdentity, Response> {
    let Some(token) = token_from_request(query_token, headers) else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("an owner token is required")),
        )
            .into_response());
    };

    match state.identities.find_by_token(&token).await {
        Ok(Some(owner)) => Ok(owner),
        Ok(None) => Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("no identity matches the supplied token")),
        )
            .into_response()),
        Err(e) => Err(store_failure(e, "identity lookup failed")),
    }
}

fn store_failure(e: StoreError, context: &str) -> Response {
    error!(error = %e, "{context}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(context)),
    )
        .into_response()
}
