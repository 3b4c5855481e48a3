//! Generic JSON-over-HTTP client with per-attempt timeouts, bounded retries
//! with exponential backoff, a minimum spacing between requests, and an
//! append-only log of every attempt.
//!
//! The network call itself sits behind [`Transport`] so callers can be
//! exercised against scripted responses.

use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use governor::clock::Clock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use url::Url;

use super::api_log::{ApiLogEntry, ApiLogKind, ApiLogSink};
use crate::constants;
use crate::logging::{Logger, redact_raw_url, redact_url};
use crate::models::graph::GraphErrorBody;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-2xx response. `message` is the upstream message when the body
    /// carried one, otherwise `HTTP <status>`.
    #[error("{message}")]
    Api {
        status: u16,
        code: Option<i64>,
        error_type: Option<String>,
        message: String,
        fbtrace_id: Option<String>,
    },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Failed to encode request body: {0}")]
    Encode(String),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl HttpError {
    /// Network failures, timeouts, throttling and server errors are worth
    /// another attempt; structured client errors are not.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Transport(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Decode(_) | Self::Encode(_) | Self::InvalidUrl { .. } => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, HttpError>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .user_agent(constants::USER_AGENT)
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| HttpError::Transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(transport_error)?;

        Ok(HttpResponse { status, body })
    }
}

/// reqwest renders the request URL, query string included, into its errors.
/// The query carries credentials, so it is dropped.
fn transport_error(err: reqwest::Error) -> HttpError {
    HttpError::Transport(err.without_url().to_string())
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,

    /// Total attempts per call, including the first.
    pub max_attempts: u32,

    pub min_request_interval: Duration,

    pub headers: BTreeMap<String, String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        let headers = BTreeMap::from([
            ("Accept".to_string(), "application/json".to_string()),
            ("Content-Type".to_string(), "application/json".to_string()),
            ("User-Agent".to_string(), constants::USER_AGENT.to_string()),
        ]);

        Self {
            timeout: Duration::from_millis(constants::http::DEFAULT_TIMEOUT_MS),
            max_attempts: constants::http::DEFAULT_MAX_RETRIES,
            min_request_interval: Duration::from_millis(
                constants::http::DEFAULT_MIN_REQUEST_INTERVAL_MS,
            ),
            headers,
        }
    }
}

/// Per-call overrides.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Delay before the attempt after `attempt` (1-based):
/// `min(1000 * 2^(attempt-1), 10000)` ms.
#[must_use]
pub fn backoff_delay(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let millis = constants::http::BACKOFF_BASE_MS.saturating_mul(1_u64 << exponent);
    Duration::from_millis(millis.min(constants::http::BACKOFF_CAP_MS))
}

/// Governor clock driven by tokio time, so paused-clock tests see the
/// same spacing as production.
#[derive(Debug, Clone, Copy, Default)]
struct TokioClock;

impl Clock for TokioClock {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now().into_std()
    }
}

type RequestLimiter = RateLimiter<
    NotKeyed,
    InMemoryState,
    TokioClock,
    governor::middleware::NoOpMiddleware<std::time::Instant>,
>;

pub struct HttpClient {
    transport: Arc<dyn Transport>,
    api_log: Arc<dyn ApiLogSink>,
    logger: Logger,
    config: HttpClientConfig,
    limiter: Option<RequestLimiter>,
}

impl HttpClient {
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        api_log: Arc<dyn ApiLogSink>,
        logger: Logger,
        config: HttpClientConfig,
    ) -> Self {
        let limiter = Quota::with_period(config.min_request_interval)
            .map(|quota| RateLimiter::direct_with_clock(quota, TokioClock));

        Self {
            transport,
            api_log,
            logger,
            config,
            limiter,
        }
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<T, HttpError> {
        self.request(Method::GET, url, None, options).await
    }

    pub async fn post<T, B>(&self, url: &str, body: &B, options: RequestOptions) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        let body = serde_json::to_string(body).map_err(|e| HttpError::Encode(e.to_string()))?;
        self.request(Method::POST, url, Some(body), options).await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<String>,
        options: RequestOptions,
    ) -> Result<T, HttpError> {
        let url = Url::parse(url).map_err(|e| HttpError::InvalidUrl {
            url: redact_raw_url(url),
            reason: e.to_string(),
        })?;

        let mut headers = self.config.headers.clone();
        headers.extend(options.headers);

        let request = HttpRequest {
            method,
            url,
            headers,
            body,
        };

        let timeout = options.timeout.unwrap_or(self.config.timeout);
        let attempts = self.config.max_attempts.max(1);
        let host = request.url.host_str().unwrap_or("unknown").to_string();
        let logged_url = redact_url(&request.url);

        let mut last_error = HttpError::Transport("request was not attempted".to_string());

        for attempt in 1..=attempts {
            self.throttle().await;

            self.logger.debug(
                "Making request",
                &json!({"url": logged_url, "attempt": attempt}),
            );
            self.api_log.append(&ApiLogEntry::new(
                ApiLogKind::Request,
                &request.url,
                attempt,
                &request_payload(&request),
            ));
            metrics::counter!("adlib_upstream_requests_total", "host" => host.clone())
                .increment(1);

            let outcome = match tokio::time::timeout(timeout, self.transport.send(&request)).await
            {
                Ok(result) => result,
                Err(_) => Err(HttpError::Timeout(timeout)),
            };

            let result = match outcome {
                Ok(response) => {
                    self.api_log.append(&ApiLogEntry::new(
                        ApiLogKind::Response,
                        &request.url,
                        attempt,
                        &json!({"status": response.status, "body": parse_json_or_string(&response.body)}),
                    ));
                    decode::<T>(&response)
                }
                Err(e) => Err(e),
            };

            let err = match result {
                Ok(value) => {
                    self.logger
                        .debug("Request successful", &json!({"url": logged_url}));
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !matches!(err, HttpError::Api { .. }) {
                self.api_log.append(&ApiLogEntry::new(
                    ApiLogKind::Error,
                    &request.url,
                    attempt,
                    &json!({"message": err.to_string()}),
                ));
            }

            let meta = json!({"url": logged_url, "attempt": attempt, "max_attempts": attempts});
            if matches!(err, HttpError::Timeout(_)) {
                self.logger.warn("Request timeout", &meta);
            } else {
                self.logger.error("Request failed", &err, &meta);
            }

            if !err.is_retryable() || attempt == attempts {
                last_error = err;
                break;
            }

            metrics::counter!("adlib_upstream_retries_total", "host" => host.clone())
                .increment(1);
            tokio::time::sleep(backoff_delay(attempt)).await;
            last_error = err;
        }

        Err(last_error)
    }

    /// Holds back until `min_request_interval` has passed since the previous
    /// request through this client.
    async fn throttle(&self) {
        let Some(limiter) = &self.limiter else {
            return;
        };

        while let Err(not_until) = limiter.check() {
            tokio::time::sleep(not_until.wait_time_from(TokioClock.now())).await;
        }
    }
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, HttpError> {
    if response.is_success() {
        return serde_json::from_str(&response.body).map_err(|e| HttpError::Decode(e.to_string()));
    }

    let status = response.status;
    Err(match serde_json::from_str::<GraphErrorBody>(&response.body) {
        Ok(GraphErrorBody { error }) => HttpError::Api {
            status,
            code: error.code,
            error_type: error.error_type,
            message: if error.message.is_empty() {
                format!("HTTP {status}")
            } else {
                error.message
            },
            fbtrace_id: error.fbtrace_id,
        },
        Err(_) => HttpError::Api {
            status,
            code: None,
            error_type: None,
            message: format!("HTTP {status}"),
            fbtrace_id: None,
        },
    })
}

fn parse_json_or_string(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn query_params(url: &Url) -> Value {
    let params: Map<String, Value> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), parse_json_or_string(&v)))
        .collect();
    Value::Object(params)
}

fn request_payload(request: &HttpRequest) -> Value {
    json!({
        "method": request.method.as_str(),
        "headers": request.headers,
        "body": request.body.as_deref().map(parse_json_or_string),
        "queryParams": query_params(&request.url),
        "url": {
            "full": redact_url(&request.url),
            "pathname": request.url.path(),
        },
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use tokio::time::Instant;

    /// Replays canned results in order and records what it was sent.
    pub struct ScriptedTransport {
        responses: std::sync::Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
        requests: std::sync::Mutex<Vec<(Instant, HttpRequest)>>,
        delay: Option<Duration>,
    }

    impl ScriptedTransport {
        pub fn new(responses: impl IntoIterator<Item = Result<HttpResponse, HttpError>>) -> Self {
            Self {
                responses: std::sync::Mutex::new(responses.into_iter().collect()),
                requests: std::sync::Mutex::new(Vec::new()),
                delay: None,
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn requests(&self) -> Vec<HttpRequest> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|(_, r)| r.clone())
                .collect()
        }

        pub fn request_times(&self) -> Vec<Instant> {
            self.requests.lock().unwrap().iter().map(|(t, _)| *t).collect()
        }

        pub fn call_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, HttpError> {
            self.requests
                .lock()
                .unwrap()
                .push((Instant::now(), request.clone()));

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let next = self.responses.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Err(HttpError::Transport("script exhausted".to_string())))
        }
    }

    pub fn json_response(status: u16, body: &Value) -> Result<HttpResponse, HttpError> {
        Ok(HttpResponse {
            status,
            body: body.to_string(),
        })
    }

    pub fn test_config() -> HttpClientConfig {
        HttpClientConfig {
            min_request_interval: Duration::ZERO,
            ..HttpClientConfig::default()
        }
    }
}
