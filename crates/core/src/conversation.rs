//! Conversation-related types.

use autoteam_model::{
    ContentBlock, ModelFinishReason, ModelMessage, ToolCallRequest,
};
use serde::Serialize;

use crate::tool::ToolOutcome;

/// Who produced a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The task, or a batch of tool results.
    User,
    /// The model.
    Assistant,
}

/// One step of a conversation. Turns never change once appended.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Turn {
    role: Role,
    #[serde(skip)]
    msg: ModelMessage,
    transcript: String,
    stop_reason: Option<ModelFinishReason>,
}

impl Turn {
    /// A user turn carrying text.
    pub fn user<S: Into<String>>(text: S) -> Self {
        let text = text.into();
        Self {
            role: Role::User,
            transcript: text.clone(),
            msg: ModelMessage::User(text),
            stop_reason: None,
        }
    }

    /// An assistant turn made of the given blocks.
    pub fn assistant(
        blocks: Vec<ContentBlock>,
        stop_reason: ModelFinishReason,
    ) -> Self {
        let transcript = blocks
            .iter()
            .map(|block| match block {
                ContentBlock::Text(text) => text.clone(),
                ContentBlock::ToolCall(call) => {
                    format!("[tool call {} ({})]", call.name, call.id)
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            role: Role::Assistant,
            msg: ModelMessage::Assistant(blocks),
            transcript,
            stop_reason: Some(stop_reason),
        }
    }

    /// A user turn carrying the results of every tool call of the
    /// previous assistant turn, in call order.
    pub fn tool_results(outcomes: &[ToolOutcome]) -> Self {
        let results: Vec<_> =
            outcomes.iter().map(ToolOutcome::to_call_result).collect();
        let transcript = results
            .iter()
            .map(|result| format!("[tool result {}]\n{}", result.id, result.content))
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            role: Role::User,
            msg: ModelMessage::ToolResults(results),
            transcript,
            stop_reason: None,
        }
    }

    /// Returns the role of this turn.
    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the message sent to the model for this turn.
    #[inline]
    pub fn message(&self) -> &ModelMessage {
        &self.msg
    }

    /// Returns the transcript of this turn.
    ///
    /// The transcript is a string representation of the turn, which can
    /// be exported later. But transcript alone is not enough to
    /// reconstruct the message.
    #[inline]
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// Returns why the model stopped, for assistant turns.
    #[inline]
    pub fn stop_reason(&self) -> Option<&ModelFinishReason> {
        self.stop_reason.as_ref()
    }

    /// Returns the text blocks of an assistant turn joined by newlines.
    pub fn text(&self) -> String {
        match &self.msg {
            ModelMessage::Assistant(blocks) => blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::Text(text) => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
            ModelMessage::User(text) => text.clone(),
            ModelMessage::ToolResults(_) => String::new(),
        }
    }

    /// Returns the tool calls of an assistant turn.
    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCallRequest> {
        let blocks: &[ContentBlock] = match &self.msg {
            ModelMessage::Assistant(blocks) => blocks.as_slice(),
            _ => &[],
        };
        blocks.iter().filter_map(|block| match block {
            ContentBlock::ToolCall(call) => Some(call),
            _ => None,
        })
    }
}

/// An append-only, ordered log of turns.
#[derive(Clone, Default, Debug, Serialize)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    /// Appends a turn.
    #[inline]
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Appends every turn of another conversation.
    #[inline]
    pub fn extend(&mut self, other: Conversation) {
        self.turns.extend(other.turns);
    }

    /// Returns the turns, oldest first.
    #[inline]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Returns the number of turns.
    #[inline]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Returns `true` if there are no turns.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.turns.clear();
    }

    /// Returns the messages to send to the model.
    pub fn messages(&self) -> Vec<ModelMessage> {
        self.turns.iter().map(|turn| turn.msg.clone()).collect()
    }

    /// Returns every transcript joined, used to estimate request size.
    pub fn transcript(&self) -> String {
        self.turns
            .iter()
            .map(Turn::transcript)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_assistant_turn() {
        let turn = Turn::assistant(
            vec![
                ContentBlock::Text("Let me check.".to_owned()),
                ContentBlock::ToolCall(ToolCallRequest {
                    id: "call_1".to_owned(),
                    name: "web_search".to_owned(),
                    arguments: json!({ "query": "crm" }),
                }),
                ContentBlock::Text("Searching now.".to_owned()),
            ],
            ModelFinishReason::ToolCalls,
        );
        assert_eq!(turn.role(), Role::Assistant);
        assert_eq!(turn.text(), "Let me check.\nSearching now.");
        assert_eq!(turn.tool_calls().count(), 1);
        assert_eq!(turn.stop_reason(), Some(&ModelFinishReason::ToolCalls));
        assert!(turn.transcript().contains("[tool call web_search (call_1)]"));
    }

    #[test]
    fn test_tool_results_turn_keeps_order() {
        let outcomes = [
            ToolOutcome::success("b", json!("second")),
            ToolOutcome::failure("a", "boom"),
        ];
        let turn = Turn::tool_results(&outcomes);
        assert_eq!(turn.role(), Role::User);
        let ModelMessage::ToolResults(results) = turn.message() else {
            unreachable!();
        };
        let ids: Vec<_> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
        assert!(!results[0].is_error);
        assert!(results[1].is_error);
    }

    #[test]
    fn test_conversation() {
        let mut conversation = Conversation::default();
        assert!(conversation.is_empty());
        conversation.push(Turn::user("hello"));
        conversation.push(Turn::assistant(
            vec![ContentBlock::Text("hi".to_owned())],
            ModelFinishReason::Stop,
        ));
        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation.messages().len(), 2);
        assert_eq!(conversation.transcript(), "hello\nhi");
    }
}
