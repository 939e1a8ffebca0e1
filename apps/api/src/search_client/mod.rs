/// Search client — the single point of entry for search-provider calls.
///
/// The provider is treated as unreliable: every failure comes back as a
/// `SearchError` for the tool to turn into a soft message.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::discovery::query::ProviderQuery;
use crate::models::listing::RawResult;

const SERPAPI_URL: &str = "https://serpapi.com/search.json";
const SERPAPI_ENGINE: &str = "google";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const MAX_RETRIES: u32 = 3;
const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum SearchError {
    /// The request URL is stripped on construction; it carries the API key.
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::Http(err.without_url())
    }
}

impl SearchError {
    /// Short description safe to show to end users. Carries no provider body.
    pub fn summary(&self) -> String {
        match self {
            SearchError::Http(e) if e.is_timeout() => {
                "the search provider timed out".to_string()
            }
            SearchError::Http(_) => "the search provider could not be reached".to_string(),
            SearchError::Api { status, .. } => {
                format!("the search provider returned status {status}")
            }
            SearchError::Parse(_) => "the search provider sent an unreadable response".to_string(),
            SearchError::RateLimited { .. } => "the search provider is rate limiting".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    pub organic_results: Vec<RawResult>,
    pub related_queries: Vec<String>,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &ProviderQuery) -> Result<SearchResponse, SearchError>;
}

#[derive(Debug, Deserialize)]
struct SerpApiBody {
    #[serde(default)]
    organic_results: Vec<SerpApiOrganic>,
    #[serde(default)]
    related_searches: Vec<SerpApiRelated>,
}

#[derive(Debug, Deserialize)]
struct SerpApiOrganic {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    date: String,
}

#[derive(Debug, Deserialize)]
struct SerpApiRelated {
    query: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SerpApiError {
    error: String,
}

/// SerpAPI (Google engine) adapter.
#[derive(Clone)]
pub struct SerpApiClient {
    client: Client,
    api_key: String,
}

impl SerpApiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }

    fn params<'a>(&'a self, query: &'a ProviderQuery) -> Vec<(&'static str, &'a str)> {
        let mut params = vec![
            ("engine", SERPAPI_ENGINE),
            ("q", query.query.as_str()),
            ("api_key", self.api_key.as_str()),
        ];
        if let Some(code) = &query.time_range_code {
            params.push(("tbs", code.as_str()));
        }
        if let Some(location) = &query.location {
            params.push(("location", location.as_str()));
        }
        params
    }
}

#[async_trait]
impl SearchProvider for SerpApiClient {
    /// Retries 429 and 5xx with exponential backoff.
    async fn search(&self, query: &ProviderQuery) -> Result<SearchResponse, SearchError> {
        let params = self.params(query);
        let mut last_error: Option<SearchError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Search attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self.client.get(SERPAPI_URL).query(&params).send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(SearchError::from(e));
                    continue;
                }
            };

            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 || status.is_server_error() {
                let message = truncate(&body, MAX_ERROR_BODY_CHARS);
                warn!(status = status.as_u16(), body = %message, "Search API returned an error");
                last_error = Some(SearchError::Api {
                    status: status.as_u16(),
                    message,
                });
                continue;
            }

            if !status.is_success() {
                return Err(SearchError::Api {
                    status: status.as_u16(),
                    message: api_error_message(body),
                });
            }

            let parsed = parse_response(&body)?;
            debug!(
                results = parsed.organic_results.len(),
                related = parsed.related_queries.len(),
                "Search call succeeded"
            );
            return Ok(parsed);
        }

        Err(last_error.unwrap_or(SearchError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

fn api_error_message(body: String) -> String {
    let message = serde_json::from_str::<SerpApiError>(&body)
        .map(|e| e.error)
        .unwrap_or(body);
    truncate(&message, MAX_ERROR_BODY_CHARS)
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Maps a provider body to results. Entries without a link are skipped.
pub fn parse_response(body: &str) -> Result<SearchResponse, SearchError> {
    let body: SerpApiBody = serde_json::from_str(body)?;
    Ok(SearchResponse {
        organic_results: body
            .organic_results
            .into_iter()
            .filter(|r| !r.link.trim().is_empty())
            .map(|r| RawResult {
                title: r.title,
                link: r.link,
                snippet: r.snippet,
                date: r.date,
            })
            .collect(),
        related_queries: body
            .related_searches
            .into_iter()
            .filter_map(|r| r.query)
            .collect(),
    })
}
