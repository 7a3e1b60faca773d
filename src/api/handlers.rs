use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Json as RequestJson,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::GenerationError;
use crate::generator::ProbeReport;
use crate::logic::{AnalyticsAggregator, GenerationOrchestrator, SessionLedger};
use crate::model::{
    ClientInfo, GlobalStats, MindMapResponse, MindMapSummary, Page, RowId, SessionId, SessionStats,
};
use crate::store::traits::Store;

/// Shared handler state: the store plus the orchestrator built on top of it
pub struct AppState<S: ?Sized> {
    pub store: Arc<S>,
    pub orchestrator: GenerationOrchestrator<S>,
}

impl<S: ?Sized> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            orchestrator: self.orchestrator.clone(),
        }
    }
}

impl<S: Store + ?Sized> AppState<S> {
    pub fn new(store: Arc<S>, orchestrator: GenerationOrchestrator<S>) -> Self {
        Self { store, orchestrator }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "mindmap-api".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateMindMapRequest {
    pub idea: String,
    pub session_id: Option<SessionId>,
}

/// Map a failure to its client-visible status. Internal details stay in the log.
pub fn error_response(err: GenerationError) -> ApiError {
    let status = match &err {
        GenerationError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        GenerationError::ExternalTimeout => StatusCode::REQUEST_TIMEOUT,
        GenerationError::ExternalUnreachable(_) => StatusCode::SERVICE_UNAVAILABLE,
        GenerationError::ExternalStatus { .. } | GenerationError::ExternalInvalidShape(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        GenerationError::NotFound(_) => StatusCode::NOT_FOUND,
        GenerationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let message = match &err {
        GenerationError::ExternalTimeout => {
            "Request to the generation webhook timed out. Please try again.".to_string()
        }
        GenerationError::Internal(e) => {
            log::error!("Internal error: {:#}", e);
            "Internal server error".to_string()
        }
        other => other.to_string(),
    };

    (status, Json(ErrorResponse::new(&message)))
}

fn internal_error(e: anyhow::Error) -> ApiError {
    error_response(GenerationError::Internal(e))
}

fn not_found(what: &str) -> ApiError {
    error_response(GenerationError::NotFound(what.to_string()))
}

pub async fn generate_mindmap<S: Store + 'static>(
    State(state): State<AppState<S>>,
    client: ClientInfo,
    RequestJson(request): RequestJson<GenerateMindMapRequest>,
) -> Result<Json<MindMapResponse>, ApiError> {
    state
        .orchestrator
        .generate(&request.idea, request.session_id, &client)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn get_mindmap<S: Store + 'static>(
    State(state): State<AppState<S>>,
    Path(mindmap_id): Path<RowId>,
) -> Result<Json<MindMapResponse>, ApiError> {
    match state.store.get_mindmap(mindmap_id).await {
        Ok(Some(record)) => Ok(Json(MindMapResponse::from_record(record))),
        Ok(None) => Err(not_found("Mind map")),
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn delete_mindmap<S: Store + 'static>(
    State(state): State<AppState<S>>,
    Path(mindmap_id): Path<RowId>,
) -> Result<StatusCode, ApiError> {
    match state.store.delete_mindmap(mindmap_id).await {
        Ok(true) => {
            log::info!("Deleted mind map {}", mindmap_id);
            Ok(StatusCode::NO_CONTENT)
        }
        Ok(false) => Err(not_found("Mind map")),
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn list_session_mindmaps<S: Store + 'static>(
    State(state): State<AppState<S>>,
    Path(session_id): Path<SessionId>,
    Query(page): Query<Page>,
) -> Result<Json<Vec<MindMapSummary>>, ApiError> {
    state
        .store
        .list_mindmaps_for_session(&session_id, page.normalized())
        .await
        .map(Json)
        .map_err(internal_error)
}

pub async fn list_recent_mindmaps<S: Store + 'static>(
    State(state): State<AppState<S>>,
    Query(page): Query<Page>,
) -> Result<Json<Vec<MindMapSummary>>, ApiError> {
    state
        .store
        .list_recent_mindmaps(page.normalized())
        .await
        .map(Json)
        .map_err(internal_error)
}

pub async fn get_session_stats<S: Store + 'static>(
    State(state): State<AppState<S>>,
    Path(session_id): Path<SessionId>,
) -> Result<Json<SessionStats>, ApiError> {
    match SessionLedger::stats(state.store.as_ref(), &session_id).await {
        Ok(Some(stats)) => Ok(Json(stats)),
        Ok(None) => Err(not_found("Session")),
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn get_analytics<S: Store + 'static>(
    State(state): State<AppState<S>>,
) -> Result<Json<GlobalStats>, ApiError> {
    AnalyticsAggregator::global_stats(state.store.as_ref())
        .await
        .map(Json)
        .map_err(internal_error)
}

pub async fn test_webhook<S: Store + 'static>(State(state): State<AppState<S>>) -> Json<ProbeReport> {
    Json(state.orchestrator.generator().probe().await)
}
