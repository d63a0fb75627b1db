//! API models for REST endpoints

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use loghub_core::{LogLevel, LogRecord, OwnerIdentity, RecordEnvelope};

/// Maximum number of records returned by the catch-up query.
pub const MAX_QUERY_LIMIT: u32 = 100;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    #[schema(value_type = String)]
    pub level: LogLevel,
    pub message: String,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub meta: Option<serde_json::Value>,
    /// Producer-supplied ordering time, milliseconds since epoch
    #[serde(default)]
    pub occurred_at: Option<i64>,
    #[serde(default)]
    pub owner_token: Option<String>,
    #[serde(default)]
    pub alias_token: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IngestResponse {
    pub success: bool,
    #[schema(value_type = Object)]
    pub data: RecordEnvelope,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LogsResponse {
    pub success: bool,
    pub count: usize,
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<LogRecord>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterOwnerRequest {
    pub username: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OwnerResponse {
    pub success: bool,
    #[schema(value_type = Object)]
    pub data: OwnerIdentity,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAliasRequest {
    pub owner_token: String,
    /// New alias; omit or send an empty string to clear it
    #[serde(default)]
    pub alias_token: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRetentionRequest {
    pub owner_token: String,
    /// Retention window in days; zero means retain forever
    pub retention_days: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Owner token passed as a query parameter (the `x-owner-token` header is
/// accepted as a fallback).
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct OwnerTokenQuery {
    #[serde(default)]
    pub owner_token: Option<String>,
}
