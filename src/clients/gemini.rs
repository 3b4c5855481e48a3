use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::api_log::ApiLogSink;
use super::http::{HttpClient, HttpClientConfig, HttpError, RequestOptions, ReqwestTransport};
use crate::config::CategorizationConfig;
use crate::logging::Logger;
use crate::services::categorization::{CategorizationError, TextGenerator};

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// Google Gemini `generateContent` backend for ad categorization.
pub struct GeminiClient {
    http: HttpClient,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    #[must_use]
    pub fn new(
        http: HttpClient,
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into(),
        }
    }

    pub fn from_config(
        config: &CategorizationConfig,
        api_log: Arc<dyn ApiLogSink>,
    ) -> Result<Self, HttpError> {
        let transport = Arc::new(ReqwestTransport::new()?);
        let http = HttpClient::new(
            transport,
            api_log,
            Logger::new("Gemini"),
            HttpClientConfig::default(),
        );

        Ok(Self::new(
            http,
            config.api_key.clone(),
            config.model.clone(),
            config.base_url.clone(),
        ))
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, CategorizationError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let options = RequestOptions::default().with_header("x-goog-api-key", &self.api_key);
        let response: GenerateContentResponse =
            self.http.post(&self.endpoint(), &request, options).await?;

        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or(CategorizationError::EmptyResponse)?;

        Ok(candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::api_log::MemoryApiLog;
    use crate::clients::http::testing::{ScriptedTransport, json_response, test_config};
    use serde_json::json;

    fn client(transport: &Arc<ScriptedTransport>, log: &Arc<MemoryApiLog>) -> GeminiClient {
        let http = HttpClient::new(
            transport.clone(),
            log.clone(),
            Logger::new("Gemini"),
            test_config(),
        );
        GeminiClient::new(http, "gem-key", "gemini-2.0-flash", "https://gemini.test/")
    }

    #[tokio::test]
    async fn joins_text_parts_of_first_candidate() {
        let transport = Arc::new(ScriptedTransport::new([json_response(
            200,
            &json!({
                "candidates": [
                    {"content": {"parts": [{"text": "#1: Health & Wellness\n"}, {"text": "#2: Others"}]}},
                    {"content": {"parts": [{"text": "ignored"}]}}
                ]
            }),
        )]));
        let log = Arc::new(MemoryApiLog::new());

        let text = client(&transport, &log).generate("prompt").await.unwrap();
        assert_eq!(text, "#1: Health & Wellness\n#2: Others");

        let sent = &transport.requests()[0];
        assert_eq!(
            sent.url.as_str(),
            "https://gemini.test/v1beta/models/gemini-2.0-flash:generateContent"
        );
        assert_eq!(sent.headers["x-goog-api-key"], "gem-key");

        let body: serde_json::Value =
            serde_json::from_str(sent.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "prompt");

        assert!(!log.contents().contains("gem-key"));
    }

    #[tokio::test]
    async fn empty_candidates_is_an_error() {
        let transport = Arc::new(ScriptedTransport::new([json_response(
            200,
            &json!({"candidates": []}),
        )]));
        let log = Arc::new(MemoryApiLog::new());

        let err = client(&transport, &log).generate("prompt").await.unwrap_err();
        assert!(matches!(err, CategorizationError::EmptyResponse));
    }
}
