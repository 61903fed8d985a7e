use std::time::Duration;

use autoteam_core::tool::{Tool, ToolResult};
use reqwest::Client;
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::{Value, json};

use super::http_error;

const TIMEOUT: Duration = Duration::from_secs(30);
const MAX_CONTENT_CHARS: usize = 10_000;

#[derive(Deserialize, JsonSchema)]
pub struct ExtractDataInput {
    #[schemars(description = "The URL to extract data from")]
    url: String,
}

/// Fetches a page and returns the beginning of its body.
pub struct ExtractDataTool {
    client: Client,
    parameter_schema: Value,
}

impl ExtractDataTool {
    /// Creates a new extraction tool.
    #[inline]
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            parameter_schema: schema_for!(ExtractDataInput).to_value(),
        }
    }
}

impl Default for ExtractDataTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for ExtractDataTool {
    type Input = ExtractDataInput;

    fn name(&self) -> &str {
        "extract_data_from_url"
    }

    fn description(&self) -> &str {
        "Extract and parse content from a given URL. Returns the main text content and metadata. Useful for analyzing competitor websites, blog posts, or market reports."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: ExtractDataInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let client = self.client.clone();
        async move {
            info!(url = %input.url, "extracting page content");
            let resp = client
                .get(&input.url)
                .timeout(TIMEOUT)
                .send()
                .await
                .and_then(|resp| resp.error_for_status())
                .map_err(http_error)
                .inspect_err(|err| error!(url = %input.url, "extraction failed: {err}"))?;
            let status_code = resp.status().as_u16();
            let body = resp.text().await.map_err(http_error)?;
            Ok(json!({
                "url": input.url,
                "content": truncate_chars(&body, MAX_CONTENT_CHARS),
                "status_code": status_code,
            }))
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 5), "hello");
        assert_eq!(truncate_chars("hello", 2), "he");
        // Never splits a character.
        assert_eq!(truncate_chars("héllo wörld", 8), "héllo wö");

        let long = "a".repeat(MAX_CONTENT_CHARS + 5);
        assert_eq!(truncate_chars(&long, MAX_CONTENT_CHARS).len(), MAX_CONTENT_CHARS);
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let tool = ExtractDataTool::new();
        let input = serde_json::from_value(json!({ "url": "not a url" })).unwrap();
        assert!(tool.execute(input).await.is_err());
    }
}
