use serde::{Deserialize, Serialize};

use super::ad::Ad;

/// Marker placed in `paging.cursors.after` when a search filled its cap.
/// It is not a resumable upstream cursor.
pub const HAS_MORE_CURSOR: &str = "has_more";

/// One page of `ads_archive` results, also the shape `/api/ads` returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacebookApiResponse {
    #[serde(default)]
    pub data: Vec<Ad>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paging: Option<Paging>,
}

impl FacebookApiResponse {
    /// Cursor for the next page, if the upstream reported one.
    #[must_use]
    pub fn next_cursor(&self) -> Option<&str> {
        self.paging
            .as_ref()
            .and_then(|p| p.cursors.as_ref())
            .and_then(|c| c.after.as_deref())
            .filter(|after| !after.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursors: Option<Cursors>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

impl Paging {
    #[must_use]
    pub fn has_more() -> Self {
        Self {
            cursors: Some(Cursors {
                before: Some(String::new()),
                after: Some(HAS_MORE_CURSOR.to_string()),
            }),
            next: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursors {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

/// Error envelope the Graph API returns with non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphErrorBody {
    pub error: GraphErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphErrorDetail {
    #[serde(default)]
    pub message: String,

    #[serde(rename = "type", default)]
    pub error_type: Option<String>,

    #[serde(default)]
    pub code: Option<i64>,

    #[serde(default)]
    pub fbtrace_id: Option<String>,
}

/// Graph API error codes the browser reports specially.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacebookErrorCode {
    RateLimit,
    RateLimitExtended,
    InvalidToken,
    InvalidParameter,
}

impl FacebookErrorCode {
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            4 => Some(Self::RateLimit),
            17 => Some(Self::RateLimitExtended),
            190 => Some(Self::InvalidToken),
            100 => Some(Self::InvalidParameter),
            _ => None,
        }
    }

    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::RateLimit | Self::RateLimitExtended => {
                "Rate limit exceeded. Please try again later."
            }
            Self::InvalidToken => {
                "Invalid or expired access token. Please check your configuration."
            }
            Self::InvalidParameter => "Invalid parameter in request. Please check your inputs.",
        }
    }
}

/// Human-readable message for an upstream error, falling back to what the
/// API said when the code is not one we map.
#[must_use]
pub fn describe_upstream_error(code: Option<i64>, upstream_message: &str) -> String {
    match code.and_then(FacebookErrorCode::from_code) {
        Some(known) => known.user_message().to_string(),
        None if upstream_message.is_empty() => "An unknown error occurred".to_string(),
        None => upstream_message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_rate_limit_codes() {
        assert!(describe_upstream_error(Some(4), "x").contains("Rate limit"));
        assert!(describe_upstream_error(Some(17), "x").contains("Rate limit"));
    }

    #[test]
    fn maps_token_and_parameter_codes() {
        assert!(describe_upstream_error(Some(190), "x").contains("Invalid or expired access token"));
        assert!(describe_upstream_error(Some(100), "x").contains("Invalid parameter"));
    }

    #[test]
    fn falls_back_to_upstream_message() {
        assert_eq!(describe_upstream_error(Some(2), "Service down"), "Service down");
        assert_eq!(describe_upstream_error(None, ""), "An unknown error occurred");
    }

    #[test]
    fn next_cursor_ignores_empty_after() {
        let page: FacebookApiResponse = serde_json::from_value(json!({
            "data": [{"id": "1"}],
            "paging": {"cursors": {"before": "a", "after": ""}}
        }))
        .unwrap();
        assert_eq!(page.next_cursor(), None);

        let page: FacebookApiResponse = serde_json::from_value(json!({
            "data": [],
            "paging": {"cursors": {"after": "abc"}, "next": "https://..."}
        }))
        .unwrap();
        assert_eq!(page.next_cursor(), Some("abc"));
    }

    #[test]
    fn has_more_marker_serializes() {
        let response = FacebookApiResponse {
            data: vec![],
            paging: Some(Paging::has_more()),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["paging"]["cursors"]["after"], "has_more");
        assert_eq!(value["paging"]["cursors"]["before"], "");
    }
}
