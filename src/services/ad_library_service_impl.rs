//! Graph API implementation of the `AdLibraryService` trait.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::clients::http::{HttpClient, RequestOptions};
use crate::constants;
use crate::logging::Logger;
use crate::models::graph::Paging;
use crate::models::{Ad, FacebookApiResponse, SearchParams};
use crate::services::ad_library_service::{
    AdLibraryError, AdLibraryService, ConnectionResponseData, ConnectionStatus,
};
use crate::services::cache::CacheService;

pub const BASIC_FIELDS: &[&str] = &["id", "page_name", "ad_creative_bodies", "bylines"];

pub const FULL_FIELDS: &[&str] = &[
    "id",
    "page_name",
    "page_id",
    "ad_creative_bodies",
    "ad_creative_link_captions",
    "ad_creative_link_descriptions",
    "ad_creative_link_titles",
    "ad_creation_time",
    "ad_delivery_start_time",
    "ad_delivery_stop_time",
    "ad_snapshot_url",
    "currency",
    "impressions",
    "spend",
    "estimated_audience_size",
    "demographic_distribution",
    "delivery_by_region",
    "publisher_platforms",
    "target_ages",
    "target_gender",
    "target_locations",
    "bylines",
    "languages",
    "status",
    "effective_status",
];

/// Validated settings the service runs with.
#[derive(Debug, Clone)]
pub struct AdLibrarySettings {
    pub access_token: String,
    pub api_version: String,
    pub base_url: String,
    pub page_size: u32,
}

pub struct GraphAdLibraryService {
    http: HttpClient,
    logger: Logger,
    cache: Option<Arc<dyn CacheService>>,
    settings: AdLibrarySettings,
}

impl GraphAdLibraryService {
    #[must_use]
    pub fn new(
        http: HttpClient,
        logger: Logger,
        cache: Option<Arc<dyn CacheService>>,
        settings: AdLibrarySettings,
    ) -> Self {
        logger.info(
            "FacebookApiService initialized",
            &json!({
                "apiVersion": settings.api_version,
                "defaultPageSize": settings.page_size,
            }),
        );

        Self {
            http,
            logger,
            cache,
            settings,
        }
    }

    /// `<base>/<version>/ads_archive` with every present parameter. Absent
    /// optional values are left out rather than sent empty.
    #[must_use]
    pub fn build_search_url(
        &self,
        params: &SearchParams,
        fields: &[&str],
        after: Option<&str>,
    ) -> String {
        let countries = Value::from(params.country.clone()).to_string();
        let limit = self.settings.page_size.to_string();

        let mut query = url::form_urlencoded::Serializer::new(String::new());
        query
            .append_pair("access_token", &self.settings.access_token)
            .append_pair("search_terms", &params.search_terms)
            .append_pair("search_type", params.search_type.as_str())
            .append_pair("ad_type", params.ad_type.as_str())
            .append_pair("ad_reached_countries", &countries)
            .append_pair("limit", &limit)
            .append_pair("fields", &fields.join(","))
            .append_pair("ad_active_status", params.ad_active_status.as_str())
            .append_pair("media_type", params.media_type.as_str());

        if let Some(min) = params.ad_delivery_date_min {
            query.append_pair("ad_delivery_date_min", &min.format("%Y-%m-%d").to_string());
        }
        if let Some(max) = params.ad_delivery_date_max {
            query.append_pair("ad_delivery_date_max", &max.format("%Y-%m-%d").to_string());
        }
        if let Some(after) = after {
            query.append_pair("after", after);
        }

        format!(
            "{}/{}/ads_archive?{}",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.api_version,
            query.finish()
        )
    }

    /// `fb_ads:` followed by the JSON of the parameters plus `maxResults`.
    #[must_use]
    pub fn cache_key(params: &SearchParams, max_results: u32) -> String {
        let mut value = serde_json::to_value(params).unwrap_or_default();
        if let Value::Object(map) = &mut value {
            map.insert("maxResults".to_string(), Value::from(max_results));
        }
        format!("{}{}", constants::cache::SEARCH_KEY_PREFIX, value)
    }

    async fn cached(&self, key: &str) -> Option<FacebookApiResponse> {
        let cache = self.cache.as_ref()?;

        match cache.get(key).await {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(response) => Some(response),
                Err(e) => {
                    self.logger.warn(
                        "Discarding undecodable cache entry",
                        &json!({"error": e.to_string()}),
                    );
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                self.logger
                    .error("Cache lookup failed", &e, &json!({"cacheKey": key}));
                None
            }
        }
    }

    async fn store(&self, key: &str, response: &FacebookApiResponse) {
        let Some(cache) = &self.cache else {
            return;
        };

        let value = match serde_json::to_value(response) {
            Ok(value) => value,
            Err(e) => {
                self.logger
                    .warn("Failed to encode search result for cache", &json!({"error": e.to_string()}));
                return;
            }
        };

        if let Err(e) = cache
            .set(key, value, Some(constants::cache::SEARCH_TTL))
            .await
        {
            self.logger
                .error("Cache write failed", &e, &json!({"cacheKey": key}));
        }
    }

    async fn fetch_all_ads(
        &self,
        params: &SearchParams,
        max_results: u32,
    ) -> Result<Vec<Ad>, AdLibraryError> {
        let cap = max_results as usize;
        let mut ads: Vec<Ad> = Vec::new();
        let mut after: Option<String> = None;
        let mut page_count = 0_u32;

        loop {
            page_count += 1;
            self.logger.debug(
                "Fetching ads page",
                &json!({"pageCount": page_count, "currentCount": ads.len()}),
            );

            let url = self.build_search_url(params, FULL_FIELDS, after.as_deref());
            let page: FacebookApiResponse = self.http.get(&url, RequestOptions::default()).await?;

            let next = page.next_cursor().map(str::to_string);
            ads.extend(page.data);

            match next {
                Some(cursor) if ads.len() < cap => after = Some(cursor),
                _ => break,
            }
        }

        self.logger.debug(
            "Finished fetching ads",
            &json!({"totalPages": page_count, "totalAds": ads.len()}),
        );

        ads.truncate(cap);
        Ok(ads)
    }

    async fn search_uncached(
        &self,
        params: &SearchParams,
        max_results: u32,
    ) -> Result<FacebookApiResponse, AdLibraryError> {
        let mut problems = params.validate().err().unwrap_or_default();
        if params.search_terms.trim().is_empty() {
            problems.push("search_terms is required".to_string());
        }
        if max_results == 0 {
            problems.push("max_results must be at least 1".to_string());
        }
        if !problems.is_empty() {
            return Err(AdLibraryError::InvalidParams(problems));
        }

        let key = Self::cache_key(params, max_results);
        if let Some(cached) = self.cached(&key).await {
            metrics::counter!("adlib_cache_hits_total").increment(1);
            self.logger
                .debug("Returning cached results", &json!({"cacheKey": key}));
            return Ok(cached);
        }
        if self.cache.is_some() {
            metrics::counter!("adlib_cache_misses_total").increment(1);
        }

        let ads = self.fetch_all_ads(params, max_results).await?;
        let has_more = ads.len() == max_results as usize;

        let response = FacebookApiResponse {
            data: ads,
            paging: has_more.then(Paging::has_more),
        };

        self.store(&key, &response).await;

        self.logger.info(
            "Ad search completed",
            &json!({"resultsCount": response.data.len(), "hasMore": has_more}),
        );

        Ok(response)
    }
}

#[async_trait]
impl AdLibraryService for GraphAdLibraryService {
    async fn test_connection(&self) -> Result<ConnectionStatus, AdLibraryError> {
        self.logger
            .info("Testing Facebook API connection", &Value::Null);

        let params = SearchParams::keyword("test", ["US"]);
        let url = self.build_search_url(&params, BASIC_FIELDS, None);

        let response: FacebookApiResponse = match self.http.get(&url, RequestOptions::default()).await
        {
            Ok(response) => response,
            Err(e) => {
                let err = AdLibraryError::from(e);
                self.logger
                    .error("API connection test failed", &err, &Value::Null);
                return Err(err);
            }
        };

        let status = ConnectionStatus {
            status: "connected".to_string(),
            api_version: self.settings.api_version.clone(),
            response_data: ConnectionResponseData {
                data_count: response.data.len(),
                has_paging: response.paging.is_some(),
                timestamp: Utc::now(),
            },
        };

        self.logger.info(
            "API connection test successful",
            &serde_json::to_value(&status).unwrap_or_default(),
        );
        Ok(status)
    }

    async fn search_ads(
        &self,
        params: &SearchParams,
        max_results: u32,
    ) -> Result<FacebookApiResponse, AdLibraryError> {
        self.logger.info(
            "Searching for ads",
            &json!({"params": params, "maxResults": max_results}),
        );

        let result = self.search_uncached(params, max_results).await;
        if let Err(e) = &result {
            self.logger
                .error("Ad search failed", e, &json!({"params": params}));
        }
        result
    }

    fn default_page_size(&self) -> u32 {
        self.settings.page_size
    }

    fn api_version(&self) -> &str {
        &self.settings.api_version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::api_log::MemoryApiLog;
    use crate::clients::http::HttpError;
    use crate::clients::http::testing::{ScriptedTransport, json_response, test_config};
    use crate::models::graph::HAS_MORE_CURSOR;
    use crate::services::cache::MemoryCache;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn service(
        transport: &Arc<ScriptedTransport>,
        log: &Arc<MemoryApiLog>,
        cache: Option<Arc<dyn CacheService>>,
        page_size: u32,
    ) -> GraphAdLibraryService {
        let logger = Logger::new("FacebookAPI");
        let http = HttpClient::new(transport.clone(), log.clone(), logger.clone(), test_config());
        GraphAdLibraryService::new(
            http,
            logger,
            cache,
            AdLibrarySettings {
                access_token: "abc".to_string(),
                api_version: "v18.0".to_string(),
                base_url: "https://graph.test".to_string(),
                page_size,
            },
        )
    }

    fn page(ids: &[&str], after: Option<&str>) -> Result<crate::clients::http::HttpResponse, HttpError> {
        let data: Vec<Value> = ids.iter().map(|id| json!({"id": id, "page_name": "Page"})).collect();
        let body = match after {
            Some(cursor) => json!({"data": data, "paging": {"cursors": {"before": "b", "after": cursor}}}),
            None => json!({"data": data}),
        };
        json_response(200, &body)
    }

    fn query(url: &url::Url) -> HashMap<String, String> {
        url.query_pairs().into_owned().collect()
    }

    fn ids(response: &FacebookApiResponse) -> Vec<&str> {
        response.data.iter().map(|ad| ad.id.as_str()).collect()
    }

    #[tokio::test]
    async fn follows_cursors_until_exhausted() {
        let transport = Arc::new(ScriptedTransport::new([
            page(&["a", "b"], Some("c1")),
            page(&["c"], None),
        ]));
        let log = Arc::new(MemoryApiLog::new());
        let service = service(&transport, &log, None, 2);

        let response = service
            .search_ads(&SearchParams::keyword("shoes", ["US"]), 10)
            .await
            .unwrap();

        assert_eq!(ids(&response), vec!["a", "b", "c"]);
        assert!(response.paging.is_none());

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert!(!query(&requests[0].url).contains_key("after"));
        assert_eq!(query(&requests[1].url)["after"], "c1");
    }

    #[tokio::test]
    async fn stops_and_truncates_at_cap() {
        let transport = Arc::new(ScriptedTransport::new([
            page(&["a", "b"], Some("c1")),
            page(&["c", "d"], Some("c2")),
            page(&["e", "f"], None),
        ]));
        let log = Arc::new(MemoryApiLog::new());
        let service = service(&transport, &log, None, 2);

        let response = service
            .search_ads(&SearchParams::keyword("shoes", ["US"]), 3)
            .await
            .unwrap();

        assert_eq!(ids(&response), vec!["a", "b", "c"]);
        assert_eq!(transport.call_count(), 2);

        let cursors = response.paging.unwrap().cursors.unwrap();
        assert_eq!(cursors.after.as_deref(), Some(HAS_MORE_CURSOR));
        assert_eq!(cursors.before.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn identical_search_is_served_from_cache() {
        let transport = Arc::new(ScriptedTransport::new([page(&["a"], None)]));
        let log = Arc::new(MemoryApiLog::new());
        let cache: Arc<dyn CacheService> = Arc::new(MemoryCache::new());
        let service = service(&transport, &log, Some(cache.clone()), 24);
        let params = SearchParams::keyword("shoes", ["US"]);

        let first = service.search_ads(&params, 24).await.unwrap();
        let second = service.search_ads(&params, 24).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(transport.call_count(), 1);

        let key = GraphAdLibraryService::cache_key(&params, 24);
        assert!(key.starts_with("fb_ads:"));
        assert!(key.contains("\"maxResults\":24"));
        assert!(cache.get(&key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn different_cap_is_a_different_cache_entry() {
        let params = SearchParams::keyword("shoes", ["US"]);
        assert_ne!(
            GraphAdLibraryService::cache_key(&params, 24),
            GraphAdLibraryService::cache_key(&params, 48)
        );
    }

    #[tokio::test]
    async fn url_carries_present_parameters_only() {
        let transport = Arc::new(ScriptedTransport::new([page(&[], None)]));
        let log = Arc::new(MemoryApiLog::new());
        let service = service(&transport, &log, None, 24);

        let mut params = SearchParams::keyword("running shoes", ["US", "GB"]);
        params.ad_delivery_date_min = NaiveDate::from_ymd_opt(2024, 1, 1);

        service.search_ads(&params, 24).await.unwrap();

        let sent = &transport.requests()[0].url;
        assert_eq!(sent.path(), "/v18.0/ads_archive");

        let q = query(sent);
        assert_eq!(q["search_terms"], "running shoes");
        assert_eq!(q["ad_reached_countries"], r#"["US","GB"]"#);
        assert_eq!(q["limit"], "24");
        assert_eq!(q["search_type"], "KEYWORD_UNORDERED");
        assert_eq!(q["ad_active_status"], "ACTIVE");
        assert_eq!(q["media_type"], "ALL");
        assert_eq!(q["ad_delivery_date_min"], "2024-01-01");
        assert!(!q.contains_key("ad_delivery_date_max"));
        assert_eq!(q["fields"], FULL_FIELDS.join(","));
        assert!(q["fields"].ends_with(",languages,status,effective_status"));
    }

    #[tokio::test]
    async fn invalid_params_make_no_requests() {
        let transport = Arc::new(ScriptedTransport::new([]));
        let log = Arc::new(MemoryApiLog::new());
        let service = service(&transport, &log, None, 24);

        let err = service
            .search_ads(&SearchParams::keyword("  ", ["USA"]), 24)
            .await
            .unwrap_err();

        match err {
            AdLibraryError::InvalidParams(problems) => assert_eq!(problems.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn upstream_errors_are_mapped_and_token_stays_out_of_logs() {
        let transport = Arc::new(ScriptedTransport::new([json_response(
            400,
            &json!({"error": {"message": "Error validating access token", "type": "OAuthException", "code": 190}}),
        )]));
        let log = Arc::new(MemoryApiLog::new());
        let service = service(&transport, &log, None, 24);

        let err = service
            .search_ads(&SearchParams::keyword("shoes", ["US"]), 24)
            .await
            .unwrap_err();

        assert!(matches!(err, AdLibraryError::Upstream { code: Some(190), .. }));
        assert!(err.to_string().contains("Invalid or expired access token"));
        assert!(!log.contents().contains("abc"));
        assert!(log.contents().contains("shoes"));
    }

    #[tokio::test]
    async fn test_connection_reports_page_shape() {
        let transport = Arc::new(ScriptedTransport::new([json_response(
            200,
            &json!({"data": [{"id": "1"}]}),
        )]));
        let log = Arc::new(MemoryApiLog::new());
        let service = service(&transport, &log, None, 24);

        let status = service.test_connection().await.unwrap();

        assert_eq!(status.status, "connected");
        assert_eq!(status.api_version, "v18.0");
        assert_eq!(status.response_data.data_count, 1);
        assert!(!status.response_data.has_paging);

        let q = query(&transport.requests()[0].url);
        assert_eq!(q["search_terms"], "test");
        assert_eq!(q["ad_reached_countries"], r#"["US"]"#);
        assert_eq!(q["fields"], "id,page_name,ad_creative_bodies,bylines");
    }
}
