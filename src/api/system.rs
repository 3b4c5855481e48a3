use axum::{Json, extract::State};
use std::sync::Arc;

use super::{AppState, HealthResponse};

/// Liveness plus a summary of which integrations are usable.
///
/// # Endpoint
/// `GET /api/health`
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        facebook_configured: state.ad_library().is_ok(),
        categorization_enabled: state.categorizer.is_some(),
    })
}
