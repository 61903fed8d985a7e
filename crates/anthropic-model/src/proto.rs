use autoteam_model::{ContentBlock, ModelMessage, ModelRequest, ModelTool};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct CacheControl {
    r#type: &'static str,
}

const EPHEMERAL: CacheControl = CacheControl {
    r#type: "ephemeral",
};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SystemBlock {
    r#type: &'static str,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_control: Option<CacheControl>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Tool {
    name: String,
    description: String,
    input_schema: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_control: Option<CacheControl>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Text {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        cache_control: Option<CacheControl>,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        cache_control: Option<CacheControl>,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        cache_control: Option<CacheControl>,
    },
}

impl Block {
    fn mark_cached(&mut self) {
        let (Self::Text { cache_control, .. }
        | Self::ToolUse { cache_control, .. }
        | Self::ToolResult { cache_control, .. }) = self;
        *cache_control = Some(EPHEMERAL);
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Message {
    role: &'static str,
    content: Vec<Block>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MessagesRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    system: Vec<SystemBlock>,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    stream: bool,
}

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub cache_creation_input_tokens: Option<u64>,
    #[serde(default)]
    pub cache_read_input_tokens: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct MessageStart {
    pub id: String,
    #[serde(default)]
    pub usage: Usage,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockStart {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
    #[serde(other)]
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct MessageDeltaBody {
    pub stop_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct DeltaUsage {
    #[serde(default)]
    pub output_tokens: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    pub r#type: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    MessageStart {
        message: MessageStart,
    },
    ContentBlockStart {
        index: usize,
        content_block: BlockStart,
    },
    ContentBlockDelta {
        index: usize,
        delta: BlockDelta,
    },
    ContentBlockStop {
        index: usize,
    },
    MessageDelta {
        delta: MessageDeltaBody,
        usage: Option<DeltaUsage>,
    },
    MessageStop,
    Ping,
    Error {
        error: ApiError,
    },
    #[serde(other)]
    Unknown,
}

// -----------
// Conversions
// -----------

pub fn create_request(req: &ModelRequest) -> MessagesRequest {
    let hints = req.cache;

    let system = req
        .system
        .iter()
        .filter(|text| !text.is_empty())
        .map(|text| SystemBlock {
            r#type: "text",
            text: text.clone(),
            cache_control: hints.system.then_some(EPHEMERAL),
        })
        .collect();

    let mut tools: Vec<_> = req.tools.iter().map(create_tool).collect();
    if hints.tools {
        // A marker on the last tool caches every tool definition.
        if let Some(Tool { cache_control, .. }) = tools.last_mut() {
            *cache_control = Some(EPHEMERAL);
        }
    }

    let mut messages: Vec<_> = req.messages.iter().map(create_message).collect();
    let recent_start = messages.len().saturating_sub(hints.recent_turns);
    for msg in &mut messages[recent_start..] {
        if msg.role != "assistant" {
            continue;
        }
        if let Some(block) = msg.content.last_mut() {
            block.mark_cached();
        }
    }

    MessagesRequest {
        model: req.settings.model.clone(),
        max_tokens: req.settings.max_output_tokens,
        temperature: req.settings.temperature,
        system,
        messages,
        tools,
        stream: true,
    }
}

fn create_message(msg: &ModelMessage) -> Message {
    match msg {
        ModelMessage::User(text) => Message {
            role: "user",
            content: vec![Block::Text {
                text: text.clone(),
                cache_control: None,
            }],
        },
        ModelMessage::Assistant(blocks) => Message {
            role: "assistant",
            content: blocks
                .iter()
                .filter_map(|block| match block {
                    // The API rejects empty text blocks.
                    ContentBlock::Text(text) if text.is_empty() => None,
                    ContentBlock::Text(text) => Some(Block::Text {
                        text: text.clone(),
                        cache_control: None,
                    }),
                    ContentBlock::ToolCall(call) => Some(Block::ToolUse {
                        id: call.id.clone(),
                        name: call.name.clone(),
                        input: call.arguments.clone(),
                        cache_control: None,
                    }),
                })
                .collect(),
        },
        ModelMessage::ToolResults(results) => Message {
            role: "user",
            content: results
                .iter()
                .map(|result| Block::ToolResult {
                    tool_use_id: result.id.clone(),
                    content: result.content.clone(),
                    is_error: result.is_error,
                    cache_control: None,
                })
                .collect(),
        },
    }
}

#[inline]
fn create_tool(tool: &ModelTool) -> Tool {
    Tool {
        name: tool.name.clone(),
        description: tool.description.clone(),
        input_schema: tool.parameters.clone(),
        cache_control: None,
    }
}

#[cfg(test)]
mod tests {
    use autoteam_model::{
        CacheHints, ModelSettings, ToolCallRequest, ToolCallResult,
    };
    use serde_json::json;

    use super::*;

    fn request(cache: CacheHints) -> ModelRequest {
        ModelRequest {
            settings: ModelSettings::new("claude-sonnet-4-5", 0.5, 4096),
            system: Some("You are the analyst.".to_owned()),
            messages: vec![
                ModelMessage::User("Size the market".to_owned()),
                ModelMessage::Assistant(vec![
                    ContentBlock::Text("Searching.".to_owned()),
                    ContentBlock::ToolCall(ToolCallRequest {
                        id: "toolu_1".to_owned(),
                        name: "web_search".to_owned(),
                        arguments: json!({ "query": "crm market size" }),
                    }),
                ]),
                ModelMessage::ToolResults(vec![ToolCallResult {
                    id: "toolu_1".to_owned(),
                    content: "No results".to_owned(),
                    is_error: true,
                }]),
            ],
            tools: vec![
                ModelTool {
                    name: "web_search".to_owned(),
                    description: "Searches the web.".to_owned(),
                    parameters: json!({ "type": "object" }),
                },
                ModelTool {
                    name: "store_context".to_owned(),
                    description: "Stores context.".to_owned(),
                    parameters: json!({ "type": "object" }),
                },
            ],
            cache,
        }
    }

    #[test]
    fn test_create_request_without_cache() {
        let body = serde_json::to_value(create_request(&request(CacheHints::default()))).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "claude-sonnet-4-5",
                "max_tokens": 4096,
                "temperature": 0.5,
                "system": [{ "type": "text", "text": "You are the analyst." }],
                "messages": [
                    {
                        "role": "user",
                        "content": [{ "type": "text", "text": "Size the market" }]
                    },
                    {
                        "role": "assistant",
                        "content": [
                            { "type": "text", "text": "Searching." },
                            {
                                "type": "tool_use",
                                "id": "toolu_1",
                                "name": "web_search",
                                "input": { "query": "crm market size" }
                            }
                        ]
                    },
                    {
                        "role": "user",
                        "content": [{
                            "type": "tool_result",
                            "tool_use_id": "toolu_1",
                            "content": "No results",
                            "is_error": true
                        }]
                    }
                ],
                "tools": [
                    {
                        "name": "web_search",
                        "description": "Searches the web.",
                        "input_schema": { "type": "object" }
                    },
                    {
                        "name": "store_context",
                        "description": "Stores context.",
                        "input_schema": { "type": "object" }
                    }
                ],
                "stream": true
            })
        );
    }

    #[test]
    fn test_create_request_with_cache() {
        let hints = CacheHints {
            system: true,
            tools: true,
            recent_turns: 2,
        };
        let body = serde_json::to_value(create_request(&request(hints))).unwrap();
        let ephemeral = json!({ "type": "ephemeral" });

        assert_eq!(body["system"][0]["cache_control"], ephemeral);
        assert_eq!(body["tools"][0].get("cache_control"), None);
        assert_eq!(body["tools"][1]["cache_control"], ephemeral);

        // Only the assistant turn inside the recent window is marked, on
        // its last block.
        let messages = &body["messages"];
        assert_eq!(messages[1]["content"][0].get("cache_control"), None);
        assert_eq!(messages[1]["content"][1]["cache_control"], ephemeral);
        assert_eq!(messages[2]["content"][0].get("cache_control"), None);
    }
}
