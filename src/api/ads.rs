use axum::{
    Json,
    extract::{Query, State},
};
use std::sync::Arc;
use tracing::{debug, warn};

use super::validation::AdsQuery;
use super::{ApiError, AppState};
use crate::models::{Ad, FacebookApiResponse, NewSearchHistory};
use crate::services::AdContent;
use crate::services::categorization::apply_categories;

/// Searches the Ad Library.
///
/// # Endpoint
/// `GET /api/ads`
///
/// Input is validated before the service is consulted, so a malformed
/// request is rejected even when Facebook is not configured.
pub async fn search_ads(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdsQuery>,
) -> Result<Json<FacebookApiResponse>, ApiError> {
    let request = query.into_request(
        state.config.facebook.page_size(),
        state.config.facebook.max_results_cap,
    )?;

    let service = state.ad_library()?;
    let mut response = service.search_ads(&request.params, request.limit).await?;

    if request.categorize {
        categorize(&state, &mut response.data).await;
    }

    if let Err(e) = state
        .history
        .create_search_history(NewSearchHistory {
            params: request.params,
            result_count: response.data.len(),
        })
        .await
    {
        warn!(error = %e, "Failed to record search history");
    }

    Ok(Json(response))
}

/// Labels `ads` in place. Failures leave the ads unlabelled.
async fn categorize(state: &AppState, ads: &mut [Ad]) {
    let Some(categorizer) = &state.categorizer else {
        debug!("Categorization requested but not configured");
        return;
    };

    let contents: Vec<AdContent> = ads.iter().map(AdContent::from).collect();
    match categorizer.categorize_ads(&contents).await {
        Ok(categories) => apply_categories(ads, &categories),
        Err(e) => warn!(error = %e, "Categorization failed, returning uncategorized ads"),
    }
}
