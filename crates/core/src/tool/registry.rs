use std::collections::HashMap;
use std::sync::Arc;

use autoteam_model::ModelTool;
use serde_json::Value;

use crate::tool::object::{BoxedToolFuture, ToolObject, ToolObjectImpl};
use crate::tool::{Error, Tool, ToolResult};

/// Holds the tools shared by a team, keyed by unique name.
///
/// Definitions are listed in registration order, so requests built from
/// the same registry are stable.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn ToolObject>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Registers a tool. A tool with the same name is replaced.
    pub fn add_tool<T: Tool>(&mut self, tool: T) {
        let name = tool.name().to_owned();
        let tool: Arc<dyn ToolObject> = Arc::new(ToolObjectImpl(tool));
        if let Some(&idx) = self.index.get(&name) {
            warn!("replacing tool: {name}");
            self.tools[idx] = tool;
        } else {
            self.index.insert(name, self.tools.len());
            self.tools.push(tool);
        }
    }

    /// Registers a tool, builder style.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.add_tool(tool);
        self
    }

    /// Returns `true` if a tool with the given name is registered.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Returns the number of tools.
    #[inline]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if there are no tools.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Returns the definitions of every tool.
    pub fn definitions(&self) -> Vec<ModelTool> {
        self.tools
            .iter()
            .map(|tool| ModelTool {
                name: tool.name().to_owned(),
                description: tool.description().to_owned(),
                parameters: tool.parameter_schema().clone(),
            })
            .collect()
    }

    /// Executes a tool by name.
    ///
    /// The returned future doesn't borrow the registry. Unknown names
    /// resolve to a `NotFound` error.
    pub fn execute_tool(&self, name: &str, arguments: Value) -> BoxedToolFuture {
        let Some(&idx) = self.index.get(name) else {
            warn!("tool not found: {name}");
            return Box::pin(std::future::ready(ToolResult::Err(
                Error::not_found(name),
            )));
        };
        trace!("executing a tool ({name}) with args: {arguments:?}");
        Arc::clone(&self.tools[idx]).execute(arguments)
    }
}

#[cfg(test)]
mod tests {
    use std::future::ready;
    use std::sync::LazyLock;

    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::tool::ErrorKind;

    static SCHEMA: LazyLock<Value> = LazyLock::new(|| {
        json!({
            "type": "object",
            "properties": { "text": { "type": "string" } },
            "required": ["text"]
        })
    });

    #[derive(Deserialize)]
    struct EchoInput {
        text: String,
    }

    struct EchoTool(&'static str);

    impl Tool for EchoTool {
        type Input = EchoInput;

        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "Echoes the text"
        }

        fn parameter_schema(&self) -> &Value {
            &SCHEMA
        }

        fn execute(
            &self,
            input: Self::Input,
        ) -> impl Future<Output = ToolResult> + Send + 'static {
            ready(Ok(json!({ "echo": input.text })))
        }
    }

    #[tokio::test]
    async fn test_execute_tool() {
        let registry = ToolRegistry::default()
            .with_tool(EchoTool("echo"))
            .with_tool(EchoTool("another_echo"));
        assert_eq!(registry.len(), 2);

        let result = registry
            .execute_tool("echo", json!({ "text": "hi" }))
            .await
            .unwrap();
        assert_eq!(result, json!({ "echo": "hi" }));

        let err = registry
            .execute_tool("missing", json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.reason(), "Tool 'missing' not found");

        let err = registry
            .execute_tool("echo", json!({ "wrong": 1 }))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_definitions_keep_registration_order() {
        let mut registry = ToolRegistry::default();
        registry.add_tool(EchoTool("b"));
        registry.add_tool(EchoTool("a"));
        registry.add_tool(EchoTool("b"));

        let names: Vec<_> = registry
            .definitions()
            .into_iter()
            .map(|tool| tool.name)
            .collect();
        assert_eq!(names, ["b", "a"]);
        assert!(registry.contains("a"));
        assert!(!registry.contains("c"));
    }
}
