use autoteam_core::tool::{Error as ToolError, Tool, ToolResult};
use reqwest::{Client, Url};
use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::http_error;

const BRAVE_URL: &str = "https://api.search.brave.com/res/v1/web/search";
const SERPAPI_URL: &str = "https://serpapi.com/search";
const DEFAULT_NUM_RESULTS: u32 = 10;
const MAX_NUM_RESULTS: u32 = 20;

/// The search API behind [`WebSearchTool`].
#[derive(Clone, PartialEq, Eq)]
pub enum SearchBackend {
    /// Brave Search, authenticated with a subscription token.
    Brave(String),
    /// SerpAPI, authenticated with an API key.
    SerpApi(String),
}

impl SearchBackend {
    /// Picks Brave when its key is set, SerpAPI otherwise.
    pub fn from_keys(brave: Option<&str>, serpapi: Option<&str>) -> Option<Self> {
        match (brave, serpapi) {
            (Some(key), _) => Some(Self::Brave(key.to_owned())),
            (None, Some(key)) => Some(Self::SerpApi(key.to_owned())),
            (None, None) => None,
        }
    }

    fn source(&self) -> &'static str {
        match self {
            Self::Brave(_) => "brave",
            Self::SerpApi(_) => "serpapi",
        }
    }
}

impl std::fmt::Debug for SearchBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.source())
    }
}

/// One search hit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    /// Page title.
    pub title: String,
    /// Page URL.
    pub url: String,
    /// Short excerpt.
    pub snippet: String,
}

#[derive(Deserialize)]
struct BraveResponse {
    #[serde(default)]
    web: Option<BraveWeb>,
}

#[derive(Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Deserialize)]
struct BraveResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    description: String,
}

#[derive(Deserialize)]
struct SerpApiResponse {
    #[serde(default)]
    organic_results: Vec<SerpApiResult>,
}

#[derive(Deserialize)]
struct SerpApiResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

fn parse_brave(body: BraveResponse, limit: usize) -> Vec<SearchResult> {
    body.web
        .map(|web| web.results)
        .unwrap_or_default()
        .into_iter()
        .take(limit)
        .map(|item| SearchResult {
            title: item.title,
            url: item.url,
            snippet: item.description,
        })
        .collect()
}

fn parse_serpapi(body: SerpApiResponse, limit: usize) -> Vec<SearchResult> {
    body.organic_results
        .into_iter()
        .take(limit)
        .map(|item| SearchResult {
            title: item.title,
            url: item.link,
            snippet: item.snippet,
        })
        .collect()
}

#[derive(Deserialize, JsonSchema)]
pub struct WebSearchInput {
    #[schemars(description = "The search query")]
    query: String,
    #[schemars(description = "Number of results to return (1-20)")]
    #[serde(default)]
    num_results: Option<u32>,
}

/// Searches the web through Brave Search or SerpAPI.
pub struct WebSearchTool {
    client: Client,
    backend: Option<SearchBackend>,
    parameter_schema: Value,
}

impl WebSearchTool {
    /// Creates a new search tool. Without a backend every call fails.
    pub fn new(backend: Option<SearchBackend>) -> Self {
        Self {
            client: Client::new(),
            backend,
            parameter_schema: schema_for!(WebSearchInput).to_value(),
        }
    }
}

impl Tool for WebSearchTool {
    type Input = WebSearchInput;

    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for information on a given topic. Returns top results with URLs, titles, and snippets. Use this for market research, competitor analysis, or finding current information."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: WebSearchInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let client = self.client.clone();
        let backend = self.backend.clone();
        async move {
            let Some(backend) = backend else {
                return Err(ToolError::execution_error().with_reason(
                    "No search API key configured. Please set BRAVE_API_KEY or SERPAPI_KEY.",
                ));
            };
            let num_results = input
                .num_results
                .unwrap_or(DEFAULT_NUM_RESULTS)
                .clamp(1, MAX_NUM_RESULTS);
            info!(query = %input.query, num_results, "searching the web");

            let results = search(&client, &backend, &input.query, num_results)
                .await
                .inspect_err(|err| error!("web search failed: {err}"))?;
            Ok(json!({
                "query": input.query,
                "results": results,
                "source": backend.source(),
            }))
        }
    }
}

async fn search(
    client: &Client,
    backend: &SearchBackend,
    query: &str,
    num_results: u32,
) -> Result<Vec<SearchResult>, ToolError> {
    let count = num_results.to_string();
    let limit = num_results as usize;

    match backend {
        SearchBackend::Brave(key) => {
            let url = Url::parse_with_params(BRAVE_URL, [("q", query), ("count", count.as_str())])
                .map_err(invalid_url)?;
            let body: BraveResponse = client
                .get(url)
                .header("X-Subscription-Token", key)
                .header("Accept", "application/json")
                .send()
                .await
                .and_then(|resp| resp.error_for_status())
                .map_err(http_error)?
                .json()
                .await
                .map_err(http_error)?;
            Ok(parse_brave(body, limit))
        }
        SearchBackend::SerpApi(key) => {
            let url = Url::parse_with_params(
                SERPAPI_URL,
                [("q", query), ("api_key", key.as_str()), ("num", count.as_str())],
            )
            .map_err(invalid_url)?;
            let body: SerpApiResponse = client
                .get(url)
                .send()
                .await
                .and_then(|resp| resp.error_for_status())
                .map_err(http_error)?
                .json()
                .await
                .map_err(http_error)?;
            Ok(parse_serpapi(body, limit))
        }
    }
}

fn invalid_url(err: impl std::fmt::Display) -> ToolError {
    ToolError::execution_error().with_reason(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_selection() {
        assert_eq!(
            SearchBackend::from_keys(Some("b"), Some("s")),
            Some(SearchBackend::Brave("b".to_owned()))
        );
        assert_eq!(
            SearchBackend::from_keys(None, Some("s")),
            Some(SearchBackend::SerpApi("s".to_owned()))
        );
        assert_eq!(SearchBackend::from_keys(None, None), None);
        assert_eq!(format!("{:?}", SearchBackend::Brave("secret".to_owned())), "brave");
    }

    #[test]
    fn test_parse_brave() {
        let body: BraveResponse = serde_json::from_value(json!({
            "web": {
                "results": [
                    { "title": "CRM market", "url": "https://a.example", "description": "Worth $60B" },
                    { "title": "No description", "url": "https://b.example" },
                    { "title": "Cut off", "url": "https://c.example", "description": "" },
                ]
            }
        }))
        .unwrap();
        let results = parse_brave(body, 2);
        assert_eq!(
            results,
            [
                SearchResult {
                    title: "CRM market".to_owned(),
                    url: "https://a.example".to_owned(),
                    snippet: "Worth $60B".to_owned(),
                },
                SearchResult {
                    title: "No description".to_owned(),
                    url: "https://b.example".to_owned(),
                    snippet: String::new(),
                },
            ]
        );

        let empty: BraveResponse = serde_json::from_value(json!({})).unwrap();
        assert!(parse_brave(empty, 10).is_empty());
    }

    #[test]
    fn test_parse_serpapi() {
        let body: SerpApiResponse = serde_json::from_value(json!({
            "search_metadata": { "status": "Success" },
            "organic_results": [
                { "position": 1, "title": "HubSpot", "link": "https://hubspot.example", "snippet": "Free CRM" },
            ]
        }))
        .unwrap();
        let results = parse_serpapi(body, 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, "https://hubspot.example");
        assert_eq!(results[0].snippet, "Free CRM");
    }

    #[tokio::test]
    async fn test_missing_key() {
        let tool = WebSearchTool::new(None);
        let input = serde_json::from_value(json!({ "query": "crm" })).unwrap();
        let err = tool.execute(input).await.unwrap_err();
        assert_eq!(
            err.reason(),
            "No search API key configured. Please set BRAVE_API_KEY or SERPAPI_KEY."
        );
    }

    #[test]
    fn test_schema() {
        let tool = WebSearchTool::new(None);
        let schema = tool.parameter_schema();
        assert_eq!(schema["required"], json!(["query"]));
        assert!(schema["properties"]["num_results"].is_object());
    }
}
