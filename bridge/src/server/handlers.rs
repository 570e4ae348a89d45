//! HTTP request handlers

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;

use crate::alexa::envelope::DirectiveEnvelope;
use crate::server::state::ServerState;
use crate::utils::version_info;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "domobridge".to_string(),
        version: version.version,
    })
}

/// Version response
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    let version = version_info();
    Json(VersionResponse {
        version: version.version,
        git_hash: version.git_hash,
        build_time: version.build_time,
    })
}

/// Directive handler: one directive in, one response envelope out.
///
/// Always answers 200 with an envelope; handler failures come back as
/// structured `ErrorResponse` payloads, never as HTTP errors.
pub async fn directive_handler(
    State(state): State<Arc<ServerState>>,
    Json(envelope): Json<DirectiveEnvelope>,
) -> impl IntoResponse {
    let response = state.router.handle(envelope).await;
    Json(response)
}
