use chrono::NaiveDate;
use serde::Deserialize;
use std::str::FromStr;
use url::Url;

use super::ApiError;
use crate::constants;
use crate::models::SearchParams;
use crate::models::search::is_country_code;

/// Raw `/api/ads` query string. Everything arrives as text so that bad
/// values are reported through the JSON error envelope.
#[derive(Debug, Default, Deserialize)]
pub struct AdsQuery {
    pub search_terms: Option<String>,
    pub search_type: Option<String>,
    pub ad_type: Option<String>,
    pub country: Option<String>,
    pub ad_active_status: Option<String>,
    pub media_type: Option<String>,
    pub ad_delivery_date_min: Option<String>,
    pub ad_delivery_date_max: Option<String>,
    pub limit: Option<String>,
    pub categorize: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdsRequest {
    pub params: SearchParams,
    pub limit: u32,
    pub categorize: bool,
}

impl AdsQuery {
    pub fn into_request(self, default_limit: u32, max_limit: u32) -> Result<AdsRequest, ApiError> {
        let search_terms = validate_search_terms(self.search_terms.as_deref().unwrap_or(""))?;
        let country = validate_countries(self.country.as_deref().unwrap_or(""))?;

        let params = SearchParams {
            search_terms: search_terms.to_string(),
            search_type: parse_choice(self.search_type.as_deref())?,
            ad_type: parse_choice(self.ad_type.as_deref())?,
            country,
            ad_active_status: parse_choice(self.ad_active_status.as_deref())?,
            media_type: parse_choice(self.media_type.as_deref())?,
            ad_delivery_date_min: validate_date(
                "ad_delivery_date_min",
                self.ad_delivery_date_min.as_deref(),
            )?,
            ad_delivery_date_max: validate_date(
                "ad_delivery_date_max",
                self.ad_delivery_date_max.as_deref(),
            )?,
        };

        params
            .validate()
            .map_err(|problems| ApiError::validation(problems.join("; ")))?;

        Ok(AdsRequest {
            params,
            limit: validate_limit(self.limit.as_deref(), default_limit, max_limit)?,
            categorize: parse_flag("categorize", self.categorize.as_deref())?,
        })
    }
}

pub fn validate_search_terms(terms: &str) -> Result<&str, ApiError> {
    let trimmed = terms.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("search_terms is required"));
    }
    Ok(trimmed)
}

/// Comma-separated ISO alpha-2 codes, normalised to upper case.
pub fn validate_countries(raw: &str) -> Result<Vec<String>, ApiError> {
    let codes: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_ascii_uppercase)
        .collect();

    if codes.is_empty() {
        return Err(ApiError::validation("At least one country code is required"));
    }

    if let Some(bad) = codes.iter().find(|code| !is_country_code(code)) {
        return Err(ApiError::validation(format!(
            "Invalid country code: '{}'. Expected two letters such as US or GB",
            bad
        )));
    }

    Ok(codes)
}

pub fn validate_date(field: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                ApiError::validation(format!(
                    "Invalid {}: '{}'. Expected YYYY-MM-DD",
                    field, value
                ))
            }),
    }
}

/// Parses an upstream enum value, falling back to its default when absent.
pub fn parse_choice<T>(raw: Option<&str>) -> Result<T, ApiError>
where
    T: FromStr<Err = String> + Default,
{
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(T::default()),
        Some(value) => value
            .parse()
            .map_err(ApiError::validation),
    }
}

pub fn validate_limit(raw: Option<&str>, default: u32, max: u32) -> Result<u32, ApiError> {
    let Some(value) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(default.min(max));
    };

    let limit: u32 = value.parse().map_err(|_| {
        ApiError::validation(format!(
            "Invalid limit: '{}'. Limit must be a positive integer",
            value
        ))
    })?;

    if !(1..=max).contains(&limit) {
        return Err(ApiError::validation(format!(
            "Invalid limit: {}. Limit must be between 1 and {}",
            limit, max
        )));
    }
    Ok(limit)
}

pub fn validate_popular_limit(limit: Option<usize>) -> Result<usize, ApiError> {
    let limit = limit.unwrap_or(constants::limits::DEFAULT_POPULAR_LIMIT);
    let max = constants::limits::MAX_POPULAR_LIMIT;

    if !(1..=max).contains(&limit) {
        return Err(ApiError::validation(format!(
            "Invalid limit: {}. Limit must be between 1 and {}",
            limit, max
        )));
    }
    Ok(limit)
}

pub fn parse_flag(field: &str, raw: Option<&str>) -> Result<bool, ApiError> {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        None | Some("" | "false" | "0" | "no") => Ok(false),
        Some("true" | "1" | "yes") => Ok(true),
        Some(other) => Err(ApiError::validation(format!(
            "Invalid {}: '{}'. Expected true or false",
            field, other
        ))),
    }
}

/// Accepts http(s) URLs whose host is one of `allowed_hosts` or a subdomain
/// of one.
pub fn validate_preview_url(raw: &str, allowed_hosts: &[String]) -> Result<Url, ApiError> {
    let url = Url::parse(raw.trim())
        .map_err(|_| ApiError::validation(format!("Invalid preview URL: '{}'", raw)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ApiError::validation("Preview URL must use http or https"));
    }

    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let allowed = allowed_hosts.iter().any(|allowed| {
        let allowed = allowed.trim().to_ascii_lowercase();
        !allowed.is_empty()
            && (host == allowed
                || host
                    .strip_suffix(allowed.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.')))
    });

    if !allowed {
        return Err(ApiError::validation(format!(
            "Preview host '{}' is not allowed",
            host
        )));
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActiveStatus, MediaType, SearchType};

    #[test]
    fn test_validate_countries() {
        assert_eq!(validate_countries("us, gb").unwrap(), vec!["US", "GB"]);
        assert_eq!(validate_countries("DE,").unwrap(), vec!["DE"]);
        assert!(validate_countries("").is_err());
        assert!(validate_countries("USA").is_err());
        assert!(validate_countries("U1").is_err());
    }

    #[test]
    fn test_validate_date() {
        assert_eq!(
            validate_date("d", Some("2024-02-29")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert_eq!(validate_date("d", None).unwrap(), None);
        assert_eq!(validate_date("d", Some("")).unwrap(), None);
        assert!(validate_date("d", Some("2023-02-29")).is_err());
        assert!(validate_date("d", Some("29/02/2024")).is_err());
    }

    #[test]
    fn test_validate_limit() {
        assert_eq!(validate_limit(None, 24, 500).unwrap(), 24);
        assert_eq!(validate_limit(Some("100"), 24, 500).unwrap(), 100);
        assert_eq!(validate_limit(None, 24, 10).unwrap(), 10);
        assert!(validate_limit(Some("0"), 24, 500).is_err());
        assert!(validate_limit(Some("501"), 24, 500).is_err());
        assert!(validate_limit(Some("-3"), 24, 500).is_err());
    }

    #[test]
    fn test_validate_popular_limit() {
        assert_eq!(validate_popular_limit(None).unwrap(), 5);
        assert!(validate_popular_limit(Some(0)).is_err());
        assert!(validate_popular_limit(Some(51)).is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("c", Some("true")).unwrap());
        assert!(parse_flag("c", Some("1")).unwrap());
        assert!(!parse_flag("c", None).unwrap());
        assert!(parse_flag("c", Some("maybe")).is_err());
    }

    #[test]
    fn test_ads_query_defaults() {
        let query = AdsQuery {
            search_terms: Some("  coffee ".to_string()),
            country: Some("us".to_string()),
            ..AdsQuery::default()
        };

        let request = query.into_request(24, 500).unwrap();
        assert_eq!(request.params.search_terms, "coffee");
        assert_eq!(request.params.country, vec!["US"]);
        assert_eq!(request.params.search_type, SearchType::KeywordUnordered);
        assert_eq!(request.params.ad_active_status, ActiveStatus::Active);
        assert_eq!(request.params.media_type, MediaType::All);
        assert_eq!(request.limit, 24);
        assert!(!request.categorize);
    }

    #[test]
    fn test_ads_query_rejects_inverted_dates() {
        let query = AdsQuery {
            search_terms: Some("coffee".to_string()),
            country: Some("US".to_string()),
            ad_delivery_date_min: Some("2024-05-01".to_string()),
            ad_delivery_date_max: Some("2024-04-01".to_string()),
            ..AdsQuery::default()
        };

        assert!(query.into_request(24, 500).is_err());
    }

    #[test]
    fn test_ads_query_rejects_unknown_media_type() {
        let query = AdsQuery {
            search_terms: Some("coffee".to_string()),
            country: Some("US".to_string()),
            media_type: Some("HOLOGRAM".to_string()),
            ..AdsQuery::default()
        };

        let err = query.into_request(24, 500).unwrap_err();
        assert!(err.to_string().contains("media_type"));
    }

    #[test]
    fn test_validate_preview_url() {
        let allowed = vec!["facebook.com".to_string(), "fbcdn.net".to_string()];

        assert!(validate_preview_url("https://www.facebook.com/ads/archive/render_ad/?id=1", &allowed).is_ok());
        assert!(validate_preview_url("https://facebook.com/x", &allowed).is_ok());
        assert!(validate_preview_url("https://scontent.xx.fbcdn.net/img.jpg", &allowed).is_ok());
        assert!(validate_preview_url("https://evilfacebook.com/x", &allowed).is_err());
        assert!(validate_preview_url("https://facebook.com.evil.org/x", &allowed).is_err());
        assert!(validate_preview_url("file:///etc/passwd", &allowed).is_err());
        assert!(validate_preview_url("not a url", &allowed).is_err());
    }
}
