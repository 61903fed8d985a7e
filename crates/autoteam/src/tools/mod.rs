//! The generic tools every agent of the team can use.

mod extract_data;
mod store_context;
mod web_search;

use autoteam_core::tool::ToolRegistry;

pub use extract_data::ExtractDataTool;
pub use store_context::{ContextEntry, ContextStore, StoreContextTool};
pub use web_search::{SearchBackend, SearchResult, WebSearchTool};

/// Builds the registry shared by the team: web search, page extraction
/// and the context store, in that order.
pub fn default_registry(
    backend: Option<SearchBackend>,
    store: ContextStore,
) -> ToolRegistry {
    if backend.is_none() {
        warn!("no search API key configured, web_search will fail");
    }
    ToolRegistry::default()
        .with_tool(WebSearchTool::new(backend))
        .with_tool(ExtractDataTool::new())
        .with_tool(StoreContextTool::new(store))
}

fn http_error(err: reqwest::Error) -> autoteam_core::tool::Error {
    autoteam_core::tool::Error::execution_error().with_reason(err.to_string())
}
