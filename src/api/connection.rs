use axum::{Json, extract::State};
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::services::ConnectionStatus;

/// `GET /api/test-connection`
pub async fn test_connection(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ConnectionStatus>, ApiError> {
    let status = state.ad_library()?.test_connection().await?;
    Ok(Json(status))
}
