//! HTTP API Server
//!
//! REST API for creating, listing, inspecting and deleting clusters.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::types::{ClusterInfoResponse, ClusterListResponse, ErrorResponse, HealthResponse};
use crate::config::ApiConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::service::ClusterService;

/// Shared application state
pub struct AppState {
    /// Cluster operations
    pub service: Arc<ClusterService>,
}

/// HTTP API server
pub struct HttpServer {
    config: ApiConfig,
    state: Arc<AppState>,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(config: ApiConfig, service: Arc<ClusterService>) -> Self {
        Self {
            config,
            state: Arc::new(AppState { service }),
        }
    }

    /// Build the router served by this server
    pub fn router(&self) -> Router {
        let router = build_router(Arc::clone(&self.state));
        if self.config.cors_enabled {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }

    /// Start the HTTP server
    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            tracing::info!("HTTP API disabled");
            return Ok(());
        }

        let app = self.router();

        let listener = tokio::net::TcpListener::bind(&self.config.bind_address).await?;
        tracing::info!("HTTP API listening on {}", self.config.bind_address);

        axum::serve(listener, app)
            .await
            .map_err(|e| Error::Network(format!("HTTP server error: {}", e)))?;

        Ok(())
    }
}

/// Create the API router for `service`
pub fn create_router(service: Arc<ClusterService>) -> Router {
    build_router(Arc::new(AppState { service }))
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/clusters", get(handle_cluster_list).post(handle_cluster_create))
        .route(
            "/clusters/:id",
            get(handle_cluster_info).delete(handle_cluster_delete),
        )
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============ Error Translation ============

/// Error returned from a handler
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match self.0.kind() {
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ErrorKind::Conflict => (StatusCode::CONFLICT, "CONFLICT"),
            ErrorKind::ValidationFailure => (StatusCode::INTERNAL_SERVER_ERROR, "INVALID_REQUEST"),
            ErrorKind::StoreFailure => (StatusCode::INTERNAL_SERVER_ERROR, "STORE_FAILURE"),
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request failed: {}", self.0);
        }

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

// ============ Handlers ============

async fn handle_cluster_create(
    State(state): State<Arc<AppState>>,
) -> std::result::Result<(StatusCode, Json<ClusterInfoResponse>), ApiError> {
    let info = state.service.create().await?;
    Ok((StatusCode::CREATED, Json(info)))
}

async fn handle_cluster_list(
    State(state): State<Arc<AppState>>,
) -> std::result::Result<Json<ClusterListResponse>, ApiError> {
    Ok(Json(state.service.list().await?))
}

async fn handle_cluster_info(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> std::result::Result<Json<ClusterInfoResponse>, ApiError> {
    Ok(Json(state.service.info(&id).await?))
}

async fn handle_cluster_delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> std::result::Result<StatusCode, ApiError> {
    state.service.delete(&id).await?;
    Ok(StatusCode::OK)
}

async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse { healthy: true })
}
