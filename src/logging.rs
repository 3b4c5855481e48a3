//! Context-tagged logging with secret redaction.
//!
//! Services log through a [`Logger`] so every event carries the component
//! name and any JSON metadata is scrubbed of credentials before it reaches
//! a `tracing` subscriber or an API log file.

use serde_json::{Map, Value};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::Url;

pub const REDACTED: &str = "***REDACTED***";

const SENSITIVE_KEYS: &[&str] = &[
    "access_token",
    "password",
    "api_key",
    "key",
    "token",
    "authorization",
    "x-goog-api-key",
];

#[must_use]
pub fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_KEYS.contains(&key.as_str())
}

/// Returns a copy of `value` with every sensitive key replaced, at any depth.
#[must_use]
pub fn redact_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    if is_sensitive_key(k) {
                        (k.clone(), Value::String(REDACTED.to_string()))
                    } else {
                        (k.clone(), redact_value(v))
                    }
                })
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_value).collect()),
        other => other.clone(),
    }
}

/// Renders `url` with sensitive query parameter values replaced.
#[must_use]
pub fn redact_url(url: &Url) -> String {
    if url.query().is_none() {
        return url.to_string();
    }

    let pairs = redact_pairs(url.query_pairs());
    let mut redacted = url.clone();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}

/// [`redact_url`] for text that may not parse as a URL.
#[must_use]
pub fn redact_raw_url(raw: &str) -> String {
    if let Ok(url) = Url::parse(raw) {
        return redact_url(&url);
    }

    match raw.split_once('?') {
        Some((base, query)) => {
            let pairs = redact_pairs(url::form_urlencoded::parse(query.as_bytes()));
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs)
                .finish();
            format!("{base}?{query}")
        }
        None => raw.to_string(),
    }
}

fn redact_pairs<'a>(
    pairs: impl Iterator<Item = (Cow<'a, str>, Cow<'a, str>)>,
) -> Vec<(String, String)> {
    pairs
        .map(|(k, v)| {
            if is_sensitive_key(&k) {
                (k.into_owned(), REDACTED.to_string())
            } else {
                (k.into_owned(), v.into_owned())
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct Logger {
    context: Arc<str>,
}

impl Logger {
    pub fn new(context: impl Into<Arc<str>>) -> Self {
        Self {
            context: context.into(),
        }
    }

    #[must_use]
    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn debug(&self, message: &str, meta: &Value) {
        let meta = redact_value(meta);
        debug!(context = %self.context, meta = %meta, "{message}");
    }

    pub fn info(&self, message: &str, meta: &Value) {
        let meta = redact_value(meta);
        info!(context = %self.context, meta = %meta, "{message}");
    }

    pub fn warn(&self, message: &str, meta: &Value) {
        let meta = redact_value(meta);
        warn!(context = %self.context, meta = %meta, "{message}");
    }

    pub fn error(&self, message: &str, err: &dyn std::error::Error, meta: &Value) {
        let meta = redact_value(meta);
        error!(context = %self.context, error = %err, meta = %meta, "{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn capture<F: FnOnce()>(f: F) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, f);
        captured.text()
    }

    #[test]
    fn redacts_nested_keys() {
        let value = json!({
            "params": {"access_token": "abc", "search_terms": "shoes"},
            "headers": [{"Authorization": "Bearer xyz"}],
            "api_key": "k"
        });

        let redacted = redact_value(&value);
        assert_eq!(redacted["params"]["access_token"], REDACTED);
        assert_eq!(redacted["params"]["search_terms"], "shoes");
        assert_eq!(redacted["headers"][0]["Authorization"], REDACTED);
        assert_eq!(redacted["api_key"], REDACTED);
    }

    #[test]
    fn redacts_url_query() {
        let url =
            Url::parse("https://graph.facebook.com/v18.0/ads_archive?access_token=abc&limit=24")
                .unwrap();
        let rendered = redact_url(&url);
        assert!(!rendered.contains("abc"));
        assert!(rendered.contains("limit=24"));
        assert!(rendered.contains("access_token="));
    }

    #[test]
    fn redacts_unparseable_url_text() {
        let rendered = redact_raw_url("not a url/ads_archive?access_token=abc&limit=24");
        assert!(!rendered.contains("abc"));
        assert!(rendered.starts_with("not a url/ads_archive?"));
        assert!(rendered.contains("limit=24"));

        assert_eq!(redact_raw_url("plain text"), "plain text");
    }

    #[test]
    fn logger_never_writes_access_token() {
        let logger = Logger::new("FacebookAPI");
        let output = capture(|| {
            logger.info(
                "Searching for ads",
                &json!({"access_token": "abc", "search_terms": "coffee"}),
            );
            logger.debug("Page", &json!({"params": {"access_token": "abc"}}));
        });

        assert!(output.contains("Searching for ads"));
        assert!(output.contains("FacebookAPI"));
        assert!(output.contains("coffee"));
        assert!(!output.contains("abc"));
    }
}
