//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::DeployError;
use crate::models::deployment::{DeployOutcome, DeployRequest, DeploymentInfo, DeploymentSummary};
use crate::server::state::ServerState;
use crate::utils::version_info;

/// Error envelope returned by every failing endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// `DeployError` carried out of a handler, mapped onto a status code
pub struct ApiError(DeployError);

impl From<DeployError> for ApiError {
    fn from(err: DeployError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DeployError::NotFound(_) => StatusCode::NOT_FOUND,
            DeployError::Conflict(_) | DeployError::StateError(_) => StatusCode::CONFLICT,
            DeployError::ConfigError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DeployError::StorageError(_)
            | DeployError::CdnError(_)
            | DeployError::DnsError(_)
            | DeployError::PageApiError(_)
            | DeployError::HttpError(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

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
        service: "pagepilot-deploy".to_string(),
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

/// Deploy handler
pub async fn deploy_handler(
    State(state): State<Arc<ServerState>>,
    Path(page_id): Path<String>,
    Json(request): Json<DeployRequest>,
) -> Result<Json<DeployOutcome>, ApiError> {
    let outcome = state.engine.deploy(&page_id, request).await?;
    Ok(Json(outcome))
}

/// Deployment info handler
pub async fn info_handler(
    State(state): State<Arc<ServerState>>,
    Path(page_id): Path<String>,
) -> Result<Json<DeploymentInfo>, ApiError> {
    let info = state.engine.get_info(&page_id).await?;
    Ok(Json(info))
}

/// Deployments list response
#[derive(Debug, Serialize)]
pub struct DeploymentsResponse {
    pub deployments: Vec<DeploymentSummary>,
    pub total: usize,
}

/// Deployments list handler
pub async fn list_handler(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<DeploymentsResponse>, ApiError> {
    let deployments = state.engine.list().await?;
    let total = deployments.len();
    Ok(Json(DeploymentsResponse { deployments, total }))
}

/// Invalidation response
#[derive(Debug, Serialize)]
pub struct InvalidateResponse {
    pub invalidation_id: String,
    pub status: String,
}

/// Invalidation handler
pub async fn invalidate_handler(
    State(state): State<Arc<ServerState>>,
    Path(page_id): Path<String>,
) -> Result<Json<InvalidateResponse>, ApiError> {
    let invalidation = state.engine.invalidate(&page_id).await?;
    Ok(Json(InvalidateResponse {
        invalidation_id: invalidation.id,
        status: invalidation.status,
    }))
}

/// Deletion response
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

/// Deletion handler
pub async fn delete_handler(
    State(state): State<Arc<ServerState>>,
    Path(page_id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    state.engine.teardown(&page_id).await?;
    Ok(Json(DeleteResponse { deleted: true }))
}
