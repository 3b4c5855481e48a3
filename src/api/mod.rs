use axum::{Router, http::HeaderValue, middleware, routing::get};
use reqwest::redirect;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::clients::{ApiLogSink, GeminiClient, open_api_log};
use crate::config::Config;
use crate::constants;
use crate::db::{MemStore, SearchHistoryStore};
use crate::services::{
    AdLibraryError, AdLibraryService, AdLibraryServiceFactory, CacheService,
    CategorizationService, MemoryCache,
};

mod ads;
mod connection;
mod error;
mod history;
pub mod observability;
mod preview;
mod system;
mod types;
pub mod validation;

pub use error::ApiError;
pub use types::*;

/// The Ad Library service, or the reason it could not be built. The server
/// still starts without valid Facebook credentials and answers 503 on the
/// routes that need them.
#[derive(Clone)]
pub enum AdLibraryHandle {
    Ready(Arc<dyn AdLibraryService>),
    Unavailable(String),
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    pub ad_library: AdLibraryHandle,

    pub categorizer: Option<Arc<CategorizationService>>,

    pub history: Arc<dyn SearchHistoryStore>,

    pub preview_client: reqwest::Client,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        config: Config,
        ad_library: AdLibraryHandle,
        categorizer: Option<Arc<CategorizationService>>,
        history: Arc<dyn SearchHistoryStore>,
        prometheus_handle: Option<PrometheusHandle>,
    ) -> anyhow::Result<Self> {
        let preview_client = reqwest::Client::builder()
            .user_agent(constants::USER_AGENT)
            .timeout(Duration::from_millis(constants::http::DEFAULT_TIMEOUT_MS))
            .redirect(preview_redirect_policy(
                config.server.preview_allowed_hosts.clone(),
            ))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build preview client: {e}"))?;

        Ok(Self {
            config: Arc::new(config),
            ad_library,
            categorizer,
            history,
            preview_client,
            start_time: std::time::Instant::now(),
            prometheus_handle,
        })
    }

    pub fn ad_library(&self) -> Result<&Arc<dyn AdLibraryService>, ApiError> {
        match &self.ad_library {
            AdLibraryHandle::Ready(service) => Ok(service),
            AdLibraryHandle::Unavailable(reason) => {
                Err(ApiError::ServiceUnavailable(reason.clone()))
            }
        }
    }
}

/// Follows a redirect only while the target stays inside the preview
/// allow-list.
fn preview_redirect_policy(allowed_hosts: Vec<String>) -> redirect::Policy {
    redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_PREVIEW_REDIRECTS {
            attempt.error("too many redirects")
        } else if validation::validate_preview_url(attempt.url().as_str(), &allowed_hosts).is_ok()
        {
            attempt.follow()
        } else {
            attempt.error(PreviewRedirectRefused)
        }
    })
}

const MAX_PREVIEW_REDIRECTS: usize = 10;

/// A preview redirect pointed outside the allow-list.
#[derive(Debug, thiserror::Error)]
#[error("Preview redirected to a host that is not allowed")]
pub struct PreviewRedirectRefused;

fn api_log(config: &Config, prefix: &str) -> Arc<dyn ApiLogSink> {
    open_api_log(
        config.general.api_log_enabled,
        &config.general.api_log_dir,
        prefix,
    )
}

fn build_ad_library(config: &Config, cache: Arc<dyn CacheService>) -> AdLibraryHandle {
    if !config.facebook.is_configured() {
        warn!("FB_ACCESS_TOKEN is not set; ad search is disabled");
        return AdLibraryHandle::Unavailable(AdLibraryError::NotConfigured.to_string());
    }

    match AdLibraryServiceFactory::create(
        &config.facebook,
        Some(cache),
        api_log(config, "facebook-api"),
    ) {
        Ok(service) => AdLibraryHandle::Ready(service),
        Err(e) => {
            warn!(error = %e, "Facebook API service could not be created");
            AdLibraryHandle::Unavailable(e.to_string())
        }
    }
}

fn build_categorizer(config: &Config) -> Option<Arc<CategorizationService>> {
    if !config.categorization.is_active() {
        info!("Ad categorization disabled");
        return None;
    }

    match GeminiClient::from_config(&config.categorization, api_log(config, "gemini-api")) {
        Ok(client) => Some(Arc::new(CategorizationService::new(Arc::new(client)))),
        Err(e) => {
            warn!(error = %e, "Categorization client could not be created");
            None
        }
    }
}

pub fn create_app_state(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let cache: Arc<dyn CacheService> = Arc::new(MemoryCache::new());
    let ad_library = build_ad_library(&config, cache);
    let categorizer = build_categorizer(&config);
    let history: Arc<dyn SearchHistoryStore> = Arc::new(MemStore::new());

    Ok(Arc::new(AppState::new(
        config,
        ad_library,
        categorizer,
        history,
        prometheus_handle,
    )?))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config.server.cors_allowed_origins.clone();

    let api_router = Router::new()
        .route("/ads", get(ads::search_ads))
        .route("/test-connection", get(connection::test_connection))
        .route("/search-history", get(history::list_search_history))
        .route("/search-history/popular", get(history::popular_searches))
        .route("/ad-preview", get(preview::ad_preview))
        .route("/health", get(system::health))
        .route("/metrics", get(observability::get_metrics))
        .layer(middleware::from_fn(observability::logging_middleware))
        .with_state(state);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}
