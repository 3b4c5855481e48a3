//! Validates Facebook settings and wires the Ad Library service together.

use regex::Regex;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use thiserror::Error;

use crate::clients::api_log::ApiLogSink;
use crate::clients::http::{HttpClient, HttpClientConfig, ReqwestTransport, Transport};
use crate::config::FacebookConfig;
use crate::constants;
use crate::logging::Logger;
use crate::services::ad_library_service::AdLibraryService;
use crate::services::ad_library_service_impl::{AdLibrarySettings, GraphAdLibraryService};
use crate::services::cache::CacheService;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid Facebook API configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),

    #[error("Failed to initialise HTTP transport: {0}")]
    Transport(String),
}

pub struct AdLibraryServiceFactory;

impl AdLibraryServiceFactory {
    /// Builds the production service over a reqwest transport.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] listing every violated constraint.
    pub fn create(
        config: &FacebookConfig,
        cache: Option<Arc<dyn CacheService>>,
        api_log: Arc<dyn ApiLogSink>,
    ) -> Result<Arc<dyn AdLibraryService>, ConfigError> {
        Self::validate(config)?;
        let transport =
            ReqwestTransport::new().map_err(|e| ConfigError::Transport(e.to_string()))?;
        Self::create_with_transport(config, cache, api_log, Arc::new(transport))
    }

    pub fn create_with_transport(
        config: &FacebookConfig,
        cache: Option<Arc<dyn CacheService>>,
        api_log: Arc<dyn ApiLogSink>,
        transport: Arc<dyn Transport>,
    ) -> Result<Arc<dyn AdLibraryService>, ConfigError> {
        Self::validate(config)?;

        let logger = Logger::new("FacebookAPI");
        let defaults = HttpClientConfig::default();
        let http_config = HttpClientConfig {
            timeout: config
                .request_timeout_ms
                .map_or(defaults.timeout, Duration::from_millis),
            max_attempts: config.max_retries.unwrap_or(defaults.max_attempts),
            min_request_interval: config
                .min_request_interval_ms
                .map_or(defaults.min_request_interval, Duration::from_millis),
            headers: defaults.headers,
        };

        let http = HttpClient::new(transport, api_log, logger.clone(), http_config);
        let settings = AdLibrarySettings {
            access_token: config.access_token.clone(),
            api_version: config.api_version.clone(),
            base_url: config.base_url.clone(),
            page_size: config.page_size(),
        };

        Ok(Arc::new(GraphAdLibraryService::new(
            http, logger, cache, settings,
        )))
    }

    /// Collects every problem with `config` rather than stopping at the first.
    pub fn validate(config: &FacebookConfig) -> Result<(), ConfigError> {
        static VERSION_RE: OnceLock<Regex> = OnceLock::new();
        let version_re =
            VERSION_RE.get_or_init(|| Regex::new(r"^v\d+\.\d+$").expect("Invalid regex"));

        let mut problems = Vec::new();

        if config.access_token.trim().is_empty() {
            problems.push("Access token is required".to_string());
        }

        if !version_re.is_match(&config.api_version) {
            problems.push(format!(
                "API version must be in format vX.Y (got '{}')",
                config.api_version
            ));
        }

        if url::Url::parse(&config.base_url).is_err() {
            problems.push(format!("Base URL '{}' is not a valid URL", config.base_url));
        }

        if config.request_timeout_ms == Some(0) {
            problems.push("request_timeout_ms must be positive".to_string());
        }

        if config.min_request_interval_ms == Some(0) {
            problems.push("min_request_interval_ms must be positive".to_string());
        }

        if config.max_retries == Some(0) {
            problems.push("max_retries must be positive".to_string());
        }

        if let Some(size) = config.default_page_size
            && !(1..=constants::facebook::MAX_PAGE_SIZE).contains(&size)
        {
            problems.push(format!(
                "default_page_size must be between 1 and {} (got {size})",
                constants::facebook::MAX_PAGE_SIZE
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::api_log::MemoryApiLog;
    use crate::clients::http::testing::{ScriptedTransport, json_response};
    use serde_json::json;

    fn valid_config() -> FacebookConfig {
        FacebookConfig {
            access_token: "token".to_string(),
            min_request_interval_ms: Some(1),
            ..FacebookConfig::default()
        }
    }

    #[test]
    fn accepts_defaults_with_token() {
        assert!(AdLibraryServiceFactory::validate(&valid_config()).is_ok());
    }

    #[test]
    fn reports_every_violation() {
        let config = FacebookConfig {
            access_token: String::new(),
            api_version: "18".to_string(),
            request_timeout_ms: Some(0),
            min_request_interval_ms: Some(0),
            max_retries: Some(0),
            default_page_size: Some(101),
            ..FacebookConfig::default()
        };

        match AdLibraryServiceFactory::validate(&config) {
            Err(ConfigError::Invalid(problems)) => assert_eq!(problems.len(), 6),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn api_version_format() {
        for (version, ok) in [("v18.0", true), ("v2.12", true), ("18.0", false), ("v18", false)] {
            let config = FacebookConfig {
                api_version: version.to_string(),
                ..valid_config()
            };
            assert_eq!(
                AdLibraryServiceFactory::validate(&config).is_ok(),
                ok,
                "{version}"
            );
        }
    }

    #[tokio::test]
    async fn wires_configured_page_size() {
        let transport = Arc::new(ScriptedTransport::new([json_response(
            200,
            &json!({"data": []}),
        )]));
        let config = FacebookConfig {
            default_page_size: Some(50),
            ..valid_config()
        };

        let service = AdLibraryServiceFactory::create_with_transport(
            &config,
            None,
            Arc::new(MemoryApiLog::new()),
            transport.clone(),
        )
        .unwrap();

        assert_eq!(service.default_page_size(), 50);
        assert_eq!(service.api_version(), "v18.0");

        service.test_connection().await.unwrap();
        let sent = &transport.requests()[0].url;
        assert!(sent.as_str().starts_with("https://graph.facebook.com/v18.0/ads_archive?"));
    }
}
