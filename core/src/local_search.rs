//! Local-search provider client.
//!
//! Every query is region-qualified (`"<region> <query>"`). Text fields come back
//! with `<b>` highlighting which is stripped before the record leaves this module.
//! The generic [`VenueLookup::search`] path fails closed to an empty list, while
//! [`VenueLookup::search_category`] reports a typed [`LocalSearchError`].

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::{LocalSearchConfig, DEFAULT_LOCAL_SEARCH_BASE_URL};
use crate::errors::{LocalSearchError, LocalSearchResult};

const USER_AGENT: &str = "ddugi-travel-concierge/0.1.0";

lazy_static! {
    static ref MARKUP_TAG: Regex = Regex::new(r"<[^>]*>").expect("markup pattern is valid");
}

/// Remove every `<...>` span and trim surrounding whitespace
pub fn strip_markup(text: &str) -> String {
    MARKUP_TAG.replace_all(text, "").trim().to_string()
}

/// Compose `"<region> <query>"`, with an optional trailing qualifier
pub fn build_query(region: &str, query: &str, qualifier: Option<&str>) -> String {
    let mut full = format!("{} {}", region.trim(), query.trim());
    if let Some(qualifier) = qualifier {
        full.push(' ');
        full.push_str(qualifier);
    }
    full
}

/// Canonical venue record returned by the local-search provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedVenue {
    pub title: String,
    pub category: String,
    pub description: String,
    pub phone: String,
    pub address: String,
    pub road_address: String,
    pub map_x: String,
    pub map_y: String,
    pub link: String,
}

/// Category-specific search shapes exposed over HTTP and as LLM tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchCategory {
    Restaurant,
    Accommodation,
    Local,
}

impl SearchCategory {
    /// Fixed words appended to the caller's query
    pub fn qualifier(self) -> Option<&'static str> {
        match self {
            SearchCategory::Restaurant => Some("맛집"),
            SearchCategory::Accommodation => Some("숙소 호텔"),
            SearchCategory::Local => None,
        }
    }

    pub fn default_display(self) -> u32 {
        match self {
            SearchCategory::Restaurant | SearchCategory::Accommodation => 10,
            SearchCategory::Local => 15,
        }
    }

    /// User-facing failure message
    pub fn failure_message(self) -> &'static str {
        match self {
            SearchCategory::Restaurant => "음식점 검색에 실패했습니다.",
            SearchCategory::Accommodation => "숙소 검색에 실패했습니다.",
            SearchCategory::Local => "지역 검색에 실패했습니다.",
        }
    }
}

/// Result of a category search together with the query actually sent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySearchResults {
    pub query: String,
    pub items: Vec<VerifiedVenue>,
}

/// Seam between the pipeline and the local-search provider
#[async_trait]
pub trait VenueLookup: Send + Sync {
    /// Query the provider for `"<region> <query>"`; every failure is reported
    async fn lookup(
        &self,
        query: &str,
        region: &str,
        max_results: u32,
    ) -> LocalSearchResult<Vec<VerifiedVenue>>;

    fn is_configured(&self) -> bool;

    fn default_region(&self) -> &str;

    /// Fail-closed search in the default region
    async fn search(&self, query: &str, max_results: u32) -> Vec<VerifiedVenue> {
        self.search_in_region(query, self.default_region(), max_results)
            .await
    }

    /// Fail-closed search; failures are logged and yield an empty list
    async fn search_in_region(
        &self,
        query: &str,
        region: &str,
        max_results: u32,
    ) -> Vec<VerifiedVenue> {
        if !self.is_configured() {
            warn!("Local search not configured, returning empty results");
            return Vec::new();
        }

        match self.lookup(query, region, max_results).await {
            Ok(venues) => venues,
            Err(e) => {
                log_lookup_failure(query, &e);
                Vec::new()
            }
        }
    }

    /// Category search that surfaces failures to the caller
    async fn search_category(
        &self,
        category: SearchCategory,
        query: &str,
        location: Option<&str>,
        display: Option<u32>,
    ) -> LocalSearchResult<CategorySearchResults> {
        if !self.is_configured() {
            return Err(LocalSearchError::NotConfigured);
        }

        let region = location
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| self.default_region())
            .to_string();
        let qualified = match category.qualifier() {
            Some(qualifier) => format!("{} {}", query.trim(), qualifier),
            None => query.trim().to_string(),
        };
        let display = display.unwrap_or_else(|| category.default_display());

        let items = self.lookup(&qualified, &region, display).await.map_err(|e| {
            log_lookup_failure(&qualified, &e);
            e
        })?;

        info!(
            category = ?category,
            count = items.len(),
            "Category search complete"
        );

        Ok(CategorySearchResults {
            query: build_query(&region, &qualified, None),
            items,
        })
    }
}

/// Log a lookup failure with enough detail to diagnose the cause
pub fn log_lookup_failure(query: &str, err: &LocalSearchError) {
    let class = err.classification();
    match err {
        LocalSearchError::Unauthorized(_) => error!(
            query,
            class,
            error = %err,
            "Local search authentication failed, check NAVER_CLIENT_ID and NAVER_CLIENT_SECRET"
        ),
        LocalSearchError::RateLimited(_) => error!(
            query,
            class,
            error = %err,
            "Local search rate limit exceeded, try again later"
        ),
        LocalSearchError::Network(_) | LocalSearchError::Timeout(_) => error!(
            query,
            class,
            error = %err,
            "Local search network error, no response received"
        ),
        LocalSearchError::Request(_) => {
            error!(query, class, error = %err, "Local search request setup error")
        }
        LocalSearchError::NotConfigured => {
            warn!(query, class, "Local search not configured")
        }
        LocalSearchError::Status { .. } | LocalSearchError::Decode(_) => {
            error!(query, class, error = %err, "Local search failed")
        }
    }
}

#[derive(Deserialize, Debug)]
struct LocalSearchResponse {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    items: Option<Vec<RawPlace>>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
struct RawPlace {
    title: Option<String>,
    link: Option<String>,
    category: Option<String>,
    description: Option<String>,
    telephone: Option<String>,
    address: Option<String>,
    road_address: Option<String>,
    mapx: Option<Value>,
    mapy: Option<Value>,
}

fn coordinate(value: Option<Value>) -> String {
    match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

impl From<RawPlace> for VerifiedVenue {
    fn from(raw: RawPlace) -> Self {
        let stripped = |v: Option<String>| v.as_deref().map(strip_markup).unwrap_or_default();
        Self {
            title: stripped(raw.title),
            category: stripped(raw.category),
            description: stripped(raw.description),
            phone: raw.telephone.unwrap_or_default(),
            address: raw.address.unwrap_or_default(),
            road_address: raw.road_address.unwrap_or_default(),
            map_x: coordinate(raw.mapx),
            map_y: coordinate(raw.mapy),
            link: raw.link.unwrap_or_default(),
        }
    }
}

/// HTTP client for the Naver local-search API
#[derive(Debug, Clone)]
pub struct LocalSearchClient {
    client: Client,
    client_id: Option<String>,
    client_secret: Option<String>,
    base_url: String,
    region: String,
    request_timeout: Duration,
}

impl LocalSearchClient {
    /// Missing credentials are not an error here; the client degrades instead
    pub fn new(config: &LocalSearchConfig) -> LocalSearchResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| LocalSearchError::Request(format!("Failed to build HTTP client: {}", e)))?;

        if config.is_configured() {
            info!("Local search client initialized");
        } else {
            warn!(
                has_client_id = config.client_id.is_some(),
                has_client_secret = config.client_secret.is_some(),
                "Local search credentials not configured, lookups will return no results"
            );
        }

        Ok(Self {
            client,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_LOCAL_SEARCH_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            region: config.region().to_string(),
            request_timeout: Duration::from_secs(config.request_timeout_secs.unwrap_or(10)),
        })
    }

    fn local_url(&self) -> String {
        format!("{}/v1/search/local.json", self.base_url)
    }

    fn credentials(&self) -> Option<(&str, &str)> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) if !id.trim().is_empty() && !secret.trim().is_empty() => {
                Some((id, secret))
            }
            _ => None,
        }
    }

    fn classify_transport_error(&self, e: reqwest::Error) -> LocalSearchError {
        if e.is_builder() {
            LocalSearchError::Request(e.to_string())
        } else if e.is_timeout() {
            LocalSearchError::Timeout(self.request_timeout.as_secs())
        } else {
            LocalSearchError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl VenueLookup for LocalSearchClient {
    async fn lookup(
        &self,
        query: &str,
        region: &str,
        max_results: u32,
    ) -> LocalSearchResult<Vec<VerifiedVenue>> {
        let (client_id, client_secret) =
            self.credentials().ok_or(LocalSearchError::NotConfigured)?;

        let full_query = build_query(region, query, None);
        info!(query = %full_query, max_results, "Searching local places");

        let display = max_results.to_string();
        let response = self
            .client
            .get(self.local_url())
            .query(&[
                ("query", full_query.as_str()),
                ("display", display.as_str()),
                ("start", "1"),
                ("sort", "random"),
            ])
            .header("X-Naver-Client-Id", client_id)
            .header("X-Naver-Client-Secret", client_secret)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| self.classify_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED => LocalSearchError::Unauthorized(body),
                StatusCode::TOO_MANY_REQUESTS => LocalSearchError::RateLimited(body),
                _ => LocalSearchError::Status {
                    status_code: status.as_u16(),
                    message: body,
                },
            });
        }

        let body: LocalSearchResponse = response
            .json()
            .await
            .map_err(|e| LocalSearchError::Decode(e.to_string()))?;

        let items = body.items.unwrap_or_default();
        info!(
            query = %full_query,
            total = body.total,
            items = items.len(),
            "Local search response received"
        );
        if items.is_empty() {
            warn!(query = %full_query, "No local search results");
            return Ok(Vec::new());
        }

        let venues: Vec<VerifiedVenue> = items.into_iter().map(VerifiedVenue::from).collect();
        if let Some(first) = venues.first() {
            info!(title = %first.title, address = %first.address, "First local search result");
        }
        Ok(venues)
    }

    fn is_configured(&self) -> bool {
        self.credentials().is_some()
    }

    fn default_region(&self) -> &str {
        &self.region
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn configured(server: &MockServer) -> LocalSearchClient {
        LocalSearchClient::new(&LocalSearchConfig {
            client_id: Some("id".to_string()),
            client_secret: Some("secret".to_string()),
            base_url: Some(server.uri()),
            region: None,
            request_timeout_secs: Some(5),
        })
        .unwrap()
    }

    fn place(title: &str) -> Value {
        json!({
            "title": title,
            "link": "https://example.com",
            "category": "한식>국밥",
            "description": "",
            "telephone": "051-000-0000",
            "address": "부산광역시 해운대구 우동 1",
            "roadAddress": "부산광역시 해운대구 해운대해변로 1",
            "mapx": "1291588742",
            "mapy": "351586730"
        })
    }

    #[test]
    fn test_strip_markup_leaves_plain_text_unchanged() {
        assert_eq!(strip_markup("해운대 암소갈비집"), "해운대 암소갈비집");
        let once = strip_markup("<b>해운대</b> 횟집");
        assert_eq!(strip_markup(&once), once);
    }

    #[test]
    fn test_strip_markup_nested_and_malformed() {
        assert_eq!(strip_markup("  <b><i>광안리</i></b> 카페 "), "광안리 카페");
        assert_eq!(strip_markup("<span class='x'>서면<br/> 맛집"), "서면 맛집");
        assert_eq!(strip_markup("<b>"), "");
    }

    #[test]
    fn test_build_query_prefixes_region() {
        assert_eq!(build_query("부산", "해운대 맛집", None), "부산 해운대 맛집");
        assert_eq!(
            build_query("제주", "애월", Some("숙소 호텔")),
            "제주 애월 숙소 호텔"
        );
    }

    #[tokio::test]
    async fn test_search_in_region_sends_qualified_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/search/local.json"))
            .and(query_param("query", "부산 해운대 맛집"))
            .and(query_param("display", "3"))
            .and(query_param("start", "1"))
            .and(query_param("sort", "random"))
            .and(header("X-Naver-Client-Id", "id"))
            .and(header("X-Naver-Client-Secret", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total": 1,
                "items": [place("<b>해운대</b> 암소갈비집")]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = configured(&server);
        let venues = client.search_in_region("해운대 맛집", "부산", 3).await;

        assert_eq!(venues.len(), 1);
        assert_eq!(venues[0].title, "해운대 암소갈비집");
        assert_eq!(venues[0].category, "한식>국밥");
        assert_eq!(venues[0].road_address, "부산광역시 해운대구 해운대해변로 1");
        assert_eq!(venues[0].map_x, "1291588742");
    }

    #[tokio::test]
    async fn test_missing_items_is_empty_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/search/local.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 0})))
            .mount(&server)
            .await;

        let client = configured(&server);
        let venues = client.lookup("없는곳", "부산", 3).await.unwrap();
        assert!(venues.is_empty());
    }

    #[tokio::test]
    async fn test_missing_fields_become_empty_strings() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/search/local.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total": 1,
                "items": [{"title": "송도 <b>케이블카</b>", "mapx": 1291, "mapy": 351}]
            })))
            .mount(&server)
            .await;

        let venues = configured(&server).lookup("송도", "부산", 3).await.unwrap();
        assert_eq!(
            venues[0],
            VerifiedVenue {
                title: "송도 케이블카".to_string(),
                map_x: "1291".to_string(),
                map_y: "351".to_string(),
                ..VerifiedVenue::default()
            }
        );
    }

    #[tokio::test]
    async fn test_status_classification() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("query", "부산 인증"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("query", "부산 제한"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("query", "부산 서버"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = configured(&server);
        assert!(matches!(
            client.lookup("인증", "부산", 3).await,
            Err(LocalSearchError::Unauthorized(body)) if body == "bad credentials"
        ));
        assert!(matches!(
            client.lookup("제한", "부산", 3).await,
            Err(LocalSearchError::RateLimited(_))
        ));
        assert!(matches!(
            client.lookup("서버", "부산", 3).await,
            Err(LocalSearchError::Status { status_code: 500, .. })
        ));

        // The generic path swallows every class
        assert!(client.search("인증", 3).await.is_empty());
    }

    #[tokio::test]
    async fn test_network_error_classification() {
        let client = LocalSearchClient::new(&LocalSearchConfig {
            client_id: Some("id".to_string()),
            client_secret: Some("secret".to_string()),
            base_url: Some("http://127.0.0.1:1".to_string()),
            region: None,
            request_timeout_secs: Some(2),
        })
        .unwrap();

        assert!(matches!(
            client.lookup("해운대", "부산", 3).await,
            Err(LocalSearchError::Network(_)) | Err(LocalSearchError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn test_non_json_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/search/local.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = configured(&server);
        let err = client.lookup("해운대", "부산", 3).await.unwrap_err();
        assert!(matches!(err, LocalSearchError::Decode(_)));
        assert!(client.search("해운대", 3).await.is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_client_issues_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = LocalSearchClient::new(&LocalSearchConfig {
            base_url: Some(server.uri()),
            ..LocalSearchConfig::default()
        })
        .unwrap();

        assert!(!client.is_configured());
        assert!(client.search("해운대", 3).await.is_empty());
        assert!(matches!(
            client
                .search_category(SearchCategory::Local, "해운대", None, None)
                .await,
            Err(LocalSearchError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_category_search_appends_qualifier() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("query", "부산 해운대 맛집"))
            .and(query_param("display", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total": 2,
                "items": [place("가"), place("나")]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("query", "제주 애월 숙소 호텔"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = configured(&server);
        let results = client
            .search_category(SearchCategory::Restaurant, "해운대", None, None)
            .await
            .unwrap();
        assert_eq!(results.query, "부산 해운대 맛집");
        assert_eq!(results.items.len(), 2);

        let failed = client
            .search_category(SearchCategory::Accommodation, "애월", Some("제주"), Some(5))
            .await;
        assert!(matches!(failed, Err(LocalSearchError::RateLimited(_))));
    }
}
