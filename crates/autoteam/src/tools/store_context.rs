use std::collections::HashMap;
use std::future::ready;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use autoteam_core::tool::{Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// A stored piece of context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ContextEntry {
    /// The stored information.
    pub value: String,
    /// Free text category.
    pub category: String,
}

/// An in-memory key/value store shared by every agent of a team.
///
/// Clones share the same entries. Storing under an existing key replaces
/// the entry.
#[derive(Clone, Debug, Default)]
pub struct ContextStore {
    entries: Arc<Mutex<HashMap<String, ContextEntry>>>,
}

impl ContextStore {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, ContextEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores an entry.
    pub fn insert<K: Into<String>>(&self, key: K, entry: ContextEntry) {
        self.lock().insert(key.into(), entry);
    }

    /// Returns the entry stored under `key`.
    pub fn get(&self, key: &str) -> Option<ContextEntry> {
        self.lock().get(key).cloned()
    }

    /// Returns the keys of a category, sorted.
    pub fn keys_in(&self, category: &str) -> Vec<String> {
        let mut keys: Vec<_> = self
            .lock()
            .iter()
            .filter(|(_, entry)| entry.category == category)
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

fn default_category() -> String {
    "general".to_owned()
}

#[derive(Deserialize, JsonSchema)]
pub struct StoreContextInput {
    #[schemars(description = "Unique identifier for this context item")]
    key: String,
    #[schemars(description = "The information to store")]
    value: String,
    #[schemars(
        description = "Category (e.g., 'market_research', 'customer_data', 'strategy')"
    )]
    #[serde(default = "default_category")]
    category: String,
}

/// Saves findings to a [`ContextStore`].
pub struct StoreContextTool {
    store: ContextStore,
    parameter_schema: Value,
}

impl StoreContextTool {
    /// Creates a new tool writing to `store`.
    pub fn new(store: ContextStore) -> Self {
        Self {
            store,
            parameter_schema: schema_for!(StoreContextInput).to_value(),
        }
    }
}

impl Tool for StoreContextTool {
    type Input = StoreContextInput;

    fn name(&self) -> &str {
        "store_context"
    }

    fn description(&self) -> &str {
        "Store information in the context memory for later use by this or other agents. Use this to save important findings, decisions, or data that might be needed later."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: StoreContextInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let StoreContextInput {
            key,
            value,
            category,
        } = input;
        info!(key, category, "context stored");
        self.store.insert(
            key.clone(),
            ContextEntry {
                value,
                category: category.clone(),
            },
        );
        ready(Ok(json!({
            "key": key,
            "category": category,
            "message": "Context stored successfully",
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_context() {
        let store = ContextStore::default();
        let tool = StoreContextTool::new(store.clone());

        let input = serde_json::from_value(json!({
            "key": "market_size",
            "value": "$60B",
            "category": "market_research",
        }))
        .unwrap();
        let payload = tool.execute(input).await.unwrap();
        assert_eq!(payload["message"], "Context stored successfully");
        assert_eq!(payload["category"], "market_research");

        let input =
            serde_json::from_value(json!({ "key": "note", "value": "hi" })).unwrap();
        let payload = tool.execute(input).await.unwrap();
        assert_eq!(payload["category"], "general");

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("market_size").unwrap().value, "$60B");
        assert_eq!(store.keys_in("general"), ["note"]);
    }

    #[test]
    fn test_replace_entry() {
        let store = ContextStore::default();
        let entry = |value: &str| ContextEntry {
            value: value.to_owned(),
            category: "strategy".to_owned(),
        };
        store.insert("plan", entry("a"));
        store.insert("plan", entry("b"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("plan"), Some(entry("b")));
        assert!(store.get("missing").is_none());
    }
}
