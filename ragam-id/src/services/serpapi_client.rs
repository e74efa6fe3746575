//! SerpApi (Google engine) search client

use super::{SearchError, SearchHit, WebSearch};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_SERPAPI_BASE_URL: &str = "https://serpapi.com";
const SEARCH_PATH: &str = "/search.json";
const ENGINE: &str = "google";
const USER_AGENT: &str = concat!("ragam-id/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct SerpApiConfig {
    pub base_url: String,
    pub api_key: String,
}

impl std::fmt::Debug for SerpApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerpApiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct SerpApiResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    search_information: Option<SearchInformation>,
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct SearchInformation {
    organic_results_state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    link: Option<String>,
}

pub struct SerpApiClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl SerpApiClient {
    pub fn new(config: SerpApiConfig) -> Result<Self, SearchError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SearchError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: format!("{}{}", config.base_url.trim_end_matches('/'), SEARCH_PATH),
            api_key: config.api_key,
        })
    }
}

fn parse_results(body: &str) -> Result<Vec<SearchHit>, SearchError> {
    let parsed: SerpApiResponse =
        serde_json::from_str(body).map_err(|e| SearchError::Parse(e.to_string()))?;

    // An empty result page also carries an `error` string; that is a miss, not a failure
    let fully_empty = parsed
        .search_information
        .as_ref()
        .and_then(|info| info.organic_results_state.as_deref())
        == Some("Fully empty");

    if let Some(error) = parsed.error {
        if !fully_empty {
            return Err(SearchError::Provider(error));
        }
    }

    // Positions are preserved: a result without a link still occupies its rank
    Ok(parsed
        .organic_results
        .into_iter()
        .map(|r| SearchHit::new(r.link.unwrap_or_default()))
        .collect())
}

#[async_trait]
impl WebSearch for SerpApiClient {
    fn source_id(&self) -> &'static str {
        "SerpApi"
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        debug!(query = %query, "Querying SerpApi");

        let params = [
            ("engine", ENGINE),
            ("q", query),
            ("api_key", self.api_key.as_str()),
        ];

        let response = self
            .http_client
            .get(&self.endpoint)
            .query(&params)
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(SearchError::Api(status.as_u16(), body));
        }

        let hits = parse_results(&body)?;
        debug!(results = hits.len(), "SerpApi search complete");
        Ok(hits)
    }
}
