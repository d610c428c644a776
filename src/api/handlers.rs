//! API Handlers
//!
//! HTTP request handlers for the cache monitoring and admin endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::{CacheService, CacheStats};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{ClearResponse, HealthResponse, InvalidateResponse};

/// Longest base key accepted for prefix invalidation.
pub const MAX_PREFIX_LENGTH: usize = 256;

/// Application state shared across all handlers.
///
/// Holds the injected cache service; the service itself is internally synchronized.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<CacheService>,
}

impl AppState {
    pub fn new(cache: Arc<CacheService>) -> Self {
        Self { cache }
    }

    /// Builds a (not yet connected) cache service from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(Arc::new(CacheService::from_config(config)?)))
    }
}

/// Handler for GET /api/cache/stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.cache.stats().await)
}

/// Handler for POST /api/cache/clear
///
/// Always succeeds; remote failures are logged by the cache service.
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.cache.clear_all().await;
    Json(ClearResponse::cleared())
}

/// Handler for DELETE /api/cache/prefix/:prefix
///
/// Removes a base key and all of its parameterized variants.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(prefix): Path<String>,
) -> Result<Json<InvalidateResponse>> {
    if prefix.trim().is_empty() {
        return Err(CacheError::InvalidRequest(
            "Prefix cannot be empty".to_string(),
        ));
    }
    if prefix.len() > MAX_PREFIX_LENGTH {
        return Err(CacheError::InvalidRequest(format!(
            "Prefix exceeds maximum length of {} bytes",
            MAX_PREFIX_LENGTH
        )));
    }

    let removed = state.cache.invalidate_prefix(&prefix).await;
    Ok(Json(InvalidateResponse::new(prefix, removed)))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(
        state.cache.is_remote_connected().await,
    ))
}
