use axum::{
    body::Body,
    extract::{Query, State},
    http::{StatusCode, header},
    response::Response,
};
use serde::Deserialize;
use std::error::Error as _;
use std::sync::Arc;
use tracing::debug;

use super::validation::validate_preview_url;
use super::{ApiError, AppState, PreviewRedirectRefused};

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    pub url: Option<String>,
}

/// Relays an ad snapshot page so the UI can embed it.
///
/// # Endpoint
/// `GET /api/ad-preview?url=`
///
/// Only hosts in `server.preview_allowed_hosts` (and their subdomains) are
/// fetched, including every redirect hop. The upstream status, content type and body are passed through.
pub async fn ad_preview(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PreviewQuery>,
) -> Result<Response, ApiError> {
    let raw = query.url.as_deref().unwrap_or_default();
    if raw.trim().is_empty() {
        return Err(ApiError::validation("url is required"));
    }

    let url = validate_preview_url(raw, &state.config.server.preview_allowed_hosts)?;
    debug!(host = url.host_str().unwrap_or_default(), "Fetching ad preview");

    let upstream = state
        .preview_client
        .get(url)
        .send()
        .await
        .map_err(fetch_error)?;

    let status = StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();

    let mut builder = Response::builder().status(status);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }

    builder
        .body(Body::from_stream(upstream.bytes_stream()))
        .map_err(|e| ApiError::internal(format!("Failed to build preview response: {e}")))
}

fn fetch_error(err: reqwest::Error) -> ApiError {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(refused) = cause.downcast_ref::<PreviewRedirectRefused>() {
            return ApiError::validation(refused.to_string());
        }
        source = cause.source();
    }

    ApiError::ExternalApiError {
        service: "Ad preview".to_string(),
        message: format!("Failed to fetch preview: {}", err.without_url()),
    }
}
