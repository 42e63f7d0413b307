use crate::core::cache::Cache;
use crate::core::config::{CacheConfig, MfapiConfig};
use crate::core::fund::{FundDataProvider, FundDetail, FundSummary, NavPoint};
use crate::core::returns::trailing_returns;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Fund houses recognized in scheme names, first match wins.
const KNOWN_FUND_HOUSES: [&str; 13] = [
    "HDFC",
    "SBI",
    "ICICI",
    "Axis",
    "Kotak",
    "Aditya Birla",
    "Nippon",
    "DSP",
    "UTI",
    "IDFC",
    "Franklin",
    "Tata",
    "Mirae",
];

/// NAV history cap for detail requests: most recent entries, not a
/// true one-year bound by elapsed time.
const NAV_HISTORY_CAP: usize = 365;

#[derive(Debug, Deserialize)]
struct CatalogueEntry {
    #[serde(rename = "schemeCode")]
    scheme_code: i64,
    #[serde(rename = "schemeName")]
    scheme_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct SchemeMeta {
    #[serde(default)]
    scheme_name: String,
    #[serde(default)]
    fund_house: String,
    #[serde(default)]
    scheme_type: String,
    #[serde(default)]
    scheme_category: String,
}

#[derive(Debug, Deserialize)]
struct RawNavEntry {
    date: String,
    nav: String,
}

#[derive(Debug, Deserialize)]
struct SchemeResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    meta: SchemeMeta,
    #[serde(default)]
    data: Vec<RawNavEntry>,
}

/// Fund data provider backed by the MFAPI scheme catalogue.
///
/// The source has no search endpoint; search fetches the full
/// catalogue and filters it locally. Results are cached through the
/// shared cache as serialized JSON.
pub struct MfapiProvider {
    base_url: String,
    client: reqwest::Client,
    cache: Arc<dyn Cache<String, Vec<u8>>>,
    cache_enabled: bool,
    cache_ttl: Duration,
}

impl MfapiProvider {
    pub fn new(
        config: &MfapiConfig,
        cache_config: &CacheConfig,
        cache: Arc<dyn Cache<String, Vec<u8>>>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("fundwise/0.1")
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(MfapiProvider {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            cache,
            cache_enabled: cache_config.enabled,
            cache_ttl: Duration::from_secs(cache_config.ttl_secs),
        })
    }

    async fn cached<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.cache_enabled {
            return None;
        }
        let bytes = self.cache.get(&key.to_string()).await?;
        serde_json::from_slice(&bytes).ok()
    }

    async fn store<T: serde::Serialize>(&self, key: &str, value: &T) {
        if !self.cache_enabled {
            return;
        }
        match serde_json::to_vec(value) {
            Ok(bytes) => {
                self.cache
                    .put(key.to_string(), bytes, Some(self.cache_ttl))
                    .await;
            }
            Err(e) => debug!(error = ?e, key, "Skipping cache write"),
        }
    }

    fn infer_fund_house(scheme_name: &str) -> Option<String> {
        KNOWN_FUND_HOUSES
            .iter()
            .find(|house| scheme_name.contains(*house))
            .map(|house| house.to_string())
    }

    fn parse_nav_points(raw: &[RawNavEntry]) -> Vec<NavPoint> {
        raw.iter()
            .filter_map(|entry| {
                let date = NaiveDate::parse_from_str(&entry.date, "%d-%m-%Y").ok()?;
                let nav = entry.nav.parse::<f64>().ok()?;
                Some(NavPoint { date, nav })
            })
            .collect()
    }

    fn build_detail(scheme_code: &str, response: SchemeResponse, include_history: bool) -> FundDetail {
        let points = Self::parse_nav_points(&response.data);
        let returns = trailing_returns(&points);
        let latest = points.first();

        let optional = |s: String| if s.is_empty() { None } else { Some(s) };

        FundDetail {
            scheme_code: scheme_code.to_string(),
            scheme_name: response.meta.scheme_name,
            fund_house: optional(response.meta.fund_house),
            scheme_type: optional(response.meta.scheme_type),
            scheme_category: optional(response.meta.scheme_category),
            latest_nav: latest.map(|p| p.nav),
            latest_nav_date: latest.map(|p| p.date),
            returns,
            nav_history: include_history
                .then(|| points.into_iter().take(NAV_HISTORY_CAP).collect()),
        }
    }
}

#[async_trait]
impl FundDataProvider for MfapiProvider {
    async fn search_funds(&self, query: &str, limit: usize) -> Vec<FundSummary> {
        let cache_key = format!("search:{query}:{limit}");
        if let Some(cached) = self.cached::<Vec<FundSummary>>(&cache_key).await {
            return cached;
        }

        debug!("Requesting fund catalogue from {}", self.base_url);
        let response = match self.client.get(&self.base_url).send().await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, query, "Error searching funds");
                return Vec::new();
            }
        };
        let response = match response.error_for_status() {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, query, "Error searching funds");
                return Vec::new();
            }
        };

        let catalogue: Vec<CatalogueEntry> = match response.json().await {
            Ok(catalogue) => catalogue,
            Err(e) => {
                error!(error = %e, query, "Failed to parse fund catalogue");
                return Vec::new();
            }
        };

        let needle = query.to_lowercase();
        let mut matches = Vec::new();
        for entry in catalogue {
            if entry.scheme_name.to_lowercase().contains(&needle) {
                matches.push(FundSummary {
                    scheme_code: entry.scheme_code.to_string(),
                    fund_house: Self::infer_fund_house(&entry.scheme_name),
                    scheme_name: entry.scheme_name,
                    category: None,
                });
                if matches.len() >= limit {
                    break;
                }
            }
        }

        self.store(&cache_key, &matches).await;
        matches
    }

    async fn fund_details(&self, scheme_code: &str, include_history: bool) -> Option<FundDetail> {
        let cache_key = format!("fund:{scheme_code}:{include_history}");
        if let Some(cached) = self.cached::<FundDetail>(&cache_key).await {
            return Some(cached);
        }

        let url = format!("{}/{}", self.base_url, scheme_code);
        debug!("Requesting fund details from {url}");

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, scheme_code, "Error fetching fund details");
                return None;
            }
        };
        let response = match response.error_for_status() {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, scheme_code, "Error fetching fund details");
                return None;
            }
        };

        let scheme: SchemeResponse = match response.json().await {
            Ok(scheme) => scheme,
            Err(e) => {
                error!(error = %e, scheme_code, "Failed to parse fund details response");
                return None;
            }
        };

        // A non-success status means the scheme does not exist; this is
        // a normal outcome, not a failure.
        if scheme.status != "SUCCESS" {
            debug!(scheme_code, status = %scheme.status, "Scheme not found");
            return None;
        }

        let detail = Self::build_detail(scheme_code, scheme, include_history);
        self.store(&cache_key, &detail).await;
        Some(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{CacheConfig, MfapiConfig};
    use crate::core::fund::Horizon;
    use crate::store::MemoryCache;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(base_url: &str, cache_enabled: bool) -> MfapiProvider {
        let mfapi = MfapiConfig {
            base_url: base_url.to_string(),
            timeout_secs: 5,
        };
        let cache_config = CacheConfig {
            enabled: cache_enabled,
            ttl_secs: 60,
            capacity: 64,
        };
        let cache = Arc::new(MemoryCache::<String, Vec<u8>>::new(64));
        MfapiProvider::new(&mfapi, &cache_config, cache).unwrap()
    }

    const CATALOGUE_JSON: &str = r#"[
        {"schemeCode": 100001, "schemeName": "HDFC Top 100 Fund - Growth"},
        {"schemeCode": 100002, "schemeName": "SBI Bluechip Fund - Direct"},
        {"schemeCode": 100003, "schemeName": "HDFC Mid-Cap Opportunities Fund"},
        {"schemeCode": 100004, "schemeName": "Quant Small Cap Fund"},
        {"schemeCode": 100005, "schemeName": "HDFC Balanced Advantage Fund"},
        {"schemeCode": 100006, "schemeName": "hdfc Liquid Fund - Growth"},
        {"schemeCode": 100007, "schemeName": "Axis Midcap Fund"}
    ]"#;

    async fn mount_catalogue(server: &MockServer, body: &str, expect: Option<u64>) {
        let mut mock = Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body));
        if let Some(calls) = expect {
            mock = mock.expect(calls);
        }
        mock.mount(server).await;
    }

    #[tokio::test]
    async fn test_search_match_limit_and_order() {
        let server = MockServer::start().await;
        mount_catalogue(&server, CATALOGUE_JSON, None).await;
        let provider = provider(&server.uri(), false);

        let results = provider.search_funds("HDFC", 3).await;

        assert_eq!(results.len(), 3);
        // Catalogue order is preserved, match is case-insensitive
        assert_eq!(results[0].scheme_code, "100001");
        assert_eq!(results[1].scheme_code, "100003");
        assert_eq!(results[2].scheme_code, "100005");
        for summary in &results {
            assert_eq!(summary.fund_house.as_deref(), Some("HDFC"));
        }
    }

    #[tokio::test]
    async fn test_search_case_insensitive_query() {
        let server = MockServer::start().await;
        mount_catalogue(&server, CATALOGUE_JSON, None).await;
        let provider = provider(&server.uri(), false);

        let results = provider.search_funds("hdfc", 10).await;
        assert_eq!(results.len(), 4);
        // Lower-cased scheme name does not match the known-house list
        assert!(results[3].fund_house.is_none());
    }

    #[tokio::test]
    async fn test_search_soft_fails_on_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let provider = provider(&server.uri(), false);

        assert!(provider.search_funds("HDFC", 5).await.is_empty());
    }

    #[tokio::test]
    async fn test_search_soft_fails_on_malformed_body() {
        let server = MockServer::start().await;
        mount_catalogue(&server, "not json", None).await;
        let provider = provider(&server.uri(), false);

        assert!(provider.search_funds("HDFC", 5).await.is_empty());
    }

    #[tokio::test]
    async fn test_search_cache_round_trip() {
        let server = MockServer::start().await;
        mount_catalogue(&server, CATALOGUE_JSON, Some(1)).await;
        let provider = provider(&server.uri(), true);

        let first = provider.search_funds("HDFC", 3).await;
        let second = provider.search_funds("HDFC", 3).await;
        assert_eq!(first, second);
        // expect(1) on the mock verifies a single catalogue fetch
    }

    const SCHEME_JSON: &str = r#"{
        "meta": {
            "fund_house": "HDFC Mutual Fund",
            "scheme_type": "Open Ended",
            "scheme_category": "Equity Scheme - Large Cap",
            "scheme_code": 100001,
            "scheme_name": "HDFC Top 100 Fund - Growth"
        },
        "data": [
            {"date": "03-06-2024", "nav": "110.00000"},
            {"date": "02-05-2024", "nav": "100.00000"}
        ],
        "status": "SUCCESS"
    }"#;

    async fn mount_scheme(server: &MockServer, code: &str, body: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(format!("/{code}")))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_fund_details_success() {
        let server = MockServer::start().await;
        mount_scheme(&server, "100001", SCHEME_JSON, 200).await;
        let provider = provider(&server.uri(), false);

        let detail = provider.fund_details("100001", true).await.unwrap();

        assert_eq!(detail.scheme_code, "100001");
        assert_eq!(detail.scheme_name, "HDFC Top 100 Fund - Growth");
        assert_eq!(detail.fund_house.as_deref(), Some("HDFC Mutual Fund"));
        assert_eq!(detail.scheme_type.as_deref(), Some("Open Ended"));
        assert_eq!(detail.latest_nav, Some(110.0));
        assert_eq!(
            detail.latest_nav_date,
            NaiveDate::parse_from_str("03-06-2024", "%d-%m-%Y").ok()
        );
        assert_eq!(detail.returns.get(&Horizon::OneMonth), Some(&10.0));
        assert_eq!(detail.nav_history.as_ref().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_fund_details_without_history() {
        let server = MockServer::start().await;
        mount_scheme(&server, "100001", SCHEME_JSON, 200).await;
        let provider = provider(&server.uri(), false);

        let detail = provider.fund_details("100001", false).await.unwrap();
        assert!(detail.nav_history.is_none());
        // Returns are still derived from the full series
        assert!(!detail.returns.is_empty());
    }

    #[tokio::test]
    async fn test_fund_details_history_capped() {
        let server = MockServer::start().await;
        let mut entries = Vec::new();
        let start = NaiveDate::parse_from_str("2024-06-03", "%Y-%m-%d").unwrap();
        for i in 0..400 {
            let date = start - chrono::Duration::days(i);
            entries.push(format!(
                r#"{{"date": "{}", "nav": "{}"}}"#,
                date.format("%d-%m-%Y"),
                100.0 + i as f64 * 0.01
            ));
        }
        let body = format!(
            r#"{{"meta": {{"scheme_name": "Big Fund"}}, "data": [{}], "status": "SUCCESS"}}"#,
            entries.join(",")
        );
        mount_scheme(&server, "100009", &body, 200).await;
        let provider = provider(&server.uri(), false);

        let detail = provider.fund_details("100009", true).await.unwrap();
        let history = detail.nav_history.unwrap();
        assert_eq!(history.len(), 365);
        // Most recent entries are kept
        assert_eq!(history[0].date, start);
    }

    #[tokio::test]
    async fn test_fund_details_not_found_status() {
        let server = MockServer::start().await;
        mount_scheme(
            &server,
            "999999",
            r#"{"status": "FAIL", "meta": {}, "data": []}"#,
            200,
        )
        .await;
        let provider = provider(&server.uri(), false);

        assert!(provider.fund_details("999999", true).await.is_none());
    }

    #[tokio::test]
    async fn test_fund_details_soft_fails_on_server_error() {
        let server = MockServer::start().await;
        mount_scheme(&server, "100001", "Server Error", 500).await;
        let provider = provider(&server.uri(), false);

        assert!(provider.fund_details("100001", true).await.is_none());
    }

    #[tokio::test]
    async fn test_fund_details_cache_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/100001"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SCHEME_JSON))
            .expect(1)
            .mount(&server)
            .await;
        let provider = provider(&server.uri(), true);

        let first = provider.fund_details("100001", true).await.unwrap();
        let second = provider.fund_details("100001", true).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_fund_details_cache_key_includes_history_flag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/100001"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SCHEME_JSON))
            .expect(2)
            .mount(&server)
            .await;
        let provider = provider(&server.uri(), true);

        let with_history = provider.fund_details("100001", true).await.unwrap();
        let without_history = provider.fund_details("100001", false).await.unwrap();
        assert!(with_history.nav_history.is_some());
        assert!(without_history.nav_history.is_none());
    }

    #[tokio::test]
    async fn test_malformed_nav_entries_skipped() {
        let server = MockServer::start().await;
        let body = r#"{
            "meta": {"scheme_name": "Odd Fund"},
            "data": [
                {"date": "03-06-2024", "nav": "110.0"},
                {"date": "bad-date", "nav": "105.0"},
                {"date": "02-05-2024", "nav": "not-a-number"},
                {"date": "02-05-2024", "nav": "100.0"}
            ],
            "status": "SUCCESS"
        }"#;
        mount_scheme(&server, "100010", body, 200).await;
        let provider = provider(&server.uri(), false);

        let detail = provider.fund_details("100010", true).await.unwrap();
        assert_eq!(detail.nav_history.as_ref().unwrap().len(), 2);
        assert_eq!(detail.returns.get(&Horizon::OneMonth), Some(&10.0));
    }
}
