//! Domain service for the Facebook Ad Library.
//!
//! Wraps the Graph API `ads_archive` endpoint: connectivity checks and
//! paginated, cached keyword searches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clients::http::HttpError;
use crate::models::graph::describe_upstream_error;
use crate::models::{FacebookApiResponse, SearchParams};

#[derive(Debug, Error)]
pub enum AdLibraryError {
    #[error("Facebook API access token not configured")]
    NotConfigured,

    #[error("Invalid search parameters: {}", .0.join("; "))]
    InvalidParams(Vec<String>),

    /// Structured error returned by the Graph API. `message` is already
    /// mapped to a user-facing text.
    #[error("{message}")]
    Upstream { code: Option<i64>, message: String },

    /// The request never produced a usable response (network, timeout,
    /// undecodable body).
    #[error("Facebook API request failed: {0}")]
    Request(HttpError),
}

impl From<HttpError> for AdLibraryError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Api { code, message, .. } => Self::Upstream {
                code,
                message: describe_upstream_error(code, &message),
            },
            other => Self::Request(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub status: String,
    pub api_version: String,
    pub response_data: ConnectionResponseData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionResponseData {
    pub data_count: usize,
    pub has_paging: bool,
    pub timestamp: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait AdLibraryService: Send + Sync {
    /// Runs a minimal query to prove the token and endpoint work.
    ///
    /// # Errors
    ///
    /// Returns [`AdLibraryError::Upstream`] with the mapped upstream message
    /// when the API rejects the request.
    async fn test_connection(&self) -> Result<ConnectionStatus, AdLibraryError>;

    /// Searches the archive, following cursors until `max_results` ads are
    /// collected or the upstream runs out.
    ///
    /// The result holds at most `max_results` ads. When it holds exactly
    /// that many, `paging.cursors.after` is the marker `"has_more"`; this is
    /// not a cursor that can be sent back upstream.
    ///
    /// # Errors
    ///
    /// Returns [`AdLibraryError::InvalidParams`] before any request when
    /// `params` fail validation.
    async fn search_ads(
        &self,
        params: &SearchParams,
        max_results: u32,
    ) -> Result<FacebookApiResponse, AdLibraryError>;

    /// Page size used when callers do not ask for a specific cap.
    fn default_page_size(&self) -> u32;

    fn api_version(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_are_mapped_to_user_messages() {
        let err: AdLibraryError = HttpError::Api {
            status: 400,
            code: Some(190),
            error_type: Some("OAuthException".to_string()),
            message: "Error validating access token".to_string(),
            fbtrace_id: None,
        }
        .into();

        assert_eq!(
            err.to_string(),
            "Invalid or expired access token. Please check your configuration."
        );
    }

    #[test]
    fn transport_errors_keep_their_cause() {
        let err: AdLibraryError = HttpError::Transport("connection refused".to_string()).into();
        assert!(matches!(err, AdLibraryError::Request(_)));
        assert!(err.to_string().contains("connection refused"));
    }
}
