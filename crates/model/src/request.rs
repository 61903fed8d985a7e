use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A request to be sent to the model provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelRequest {
    /// Which model to sample and how.
    pub settings: ModelSettings,
    /// The system instructions.
    pub system: Option<String>,
    /// The conversation so far, oldest first.
    pub messages: Vec<ModelMessage>,
    /// Tools that are available to the model.
    pub tools: Vec<ModelTool>,
    /// Segments of the request that may be cached by the provider.
    #[serde(default)]
    pub cache: CacheHints,
}

/// Generation parameters of a request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    /// The model identifier, e.g. `claude-sonnet-4-5`.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound of the tokens the model may generate.
    pub max_output_tokens: u32,
}

impl ModelSettings {
    /// Creates settings for the given model.
    #[inline]
    pub fn new<M: Into<String>>(
        model: M,
        temperature: f32,
        max_output_tokens: u32,
    ) -> Self {
        Self {
            model: model.into(),
            temperature,
            max_output_tokens,
        }
    }
}

/// Marks which segments of a request form a repeatable prefix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheHints {
    /// The system prompt should be cached.
    pub system: bool,
    /// The tool definitions should be cached. Providers only mark the
    /// last definition, which covers all of them.
    pub tools: bool,
    /// Assistant messages among this many trailing messages should be
    /// cached. Zero disables history caching.
    pub recent_turns: usize,
}

/// A complete message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ModelMessage {
    /// A user input text.
    User(String),
    /// An assistant reply, made of text and tool call blocks.
    Assistant(Vec<ContentBlock>),
    /// Results of every tool call requested by the previous assistant
    /// message, in the order the calls were made.
    ToolResults(Vec<ToolCallResult>),
}

impl ModelMessage {
    /// Returns `true` if this message was produced by the model.
    #[inline]
    pub fn is_assistant(&self) -> bool {
        matches!(self, Self::Assistant(_))
    }
}

/// One block of an assistant message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ContentBlock {
    /// Plain text.
    Text(String),
    /// A tool invocation.
    ToolCall(crate::ToolCallRequest),
}

/// The result of calling a tool.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// The unique identifier for the tool call request.
    pub id: String,
    /// The result of the tool call.
    pub content: String,
    /// Whether the call failed.
    #[serde(default)]
    pub is_error: bool,
}

/// Describes a tool that can be used by the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTool {
    /// Name of the tool.
    pub name: String,
    /// Description of the tool.
    pub description: String,
    /// Parameters definition of the tool.
    ///
    /// For most model providers, the parameters should typically be
    /// defined by a [JSON schema](https://json-schema.org/).
    pub parameters: Value,
}
