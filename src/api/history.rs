use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::validate_popular_limit;
use super::{ApiError, ApiResponse, AppState};
use crate::models::SearchHistory;

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    pub limit: Option<usize>,
}

pub async fn list_search_history(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<SearchHistory>>>, ApiError> {
    let history = state.history.get_search_history().await?;
    Ok(Json(ApiResponse::success(history)))
}

pub async fn popular_searches(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PopularQuery>,
) -> Result<Json<ApiResponse<Vec<String>>>, ApiError> {
    let limit = validate_popular_limit(query.limit)?;
    let terms = state.history.popular_search_terms(limit).await?;
    Ok(Json(ApiResponse::success(terms)))
}
