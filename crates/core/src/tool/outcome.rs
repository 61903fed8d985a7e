use autoteam_model::ToolCallResult;
use serde::Serialize;
use serde_json::{Map, Value, json};

use super::ToolResult;

/// The result of one tool call, as reported back to the model.
///
/// `error` is present iff `success` is false.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolOutcome {
    /// The id of the tool call this answers.
    pub call_id: String,
    /// Whether the call succeeded.
    pub success: bool,
    /// Structured or textual payload.
    pub payload: Value,
    /// What went wrong.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolOutcome {
    /// A successful outcome.
    #[inline]
    pub fn success<S: Into<String>>(call_id: S, payload: Value) -> Self {
        Self {
            call_id: call_id.into(),
            success: true,
            payload,
            error: None,
        }
    }

    /// A failed outcome without payload.
    #[inline]
    pub fn failure<S: Into<String>, E: Into<String>>(call_id: S, error: E) -> Self {
        Self {
            call_id: call_id.into(),
            success: false,
            payload: Value::Null,
            error: Some(error.into()),
        }
    }

    /// Attaches a payload, kept for failed outcomes too.
    #[inline]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Converts the result of a generic tool.
    pub fn from_result<S: Into<String>>(call_id: S, result: ToolResult) -> Self {
        match result {
            Ok(payload) => Self::success(call_id, payload),
            Err(err) => Self::failure(call_id, err.reason()),
        }
    }

    /// Renders the content the model sees.
    ///
    /// String payloads of successful calls are passed through as is, other
    /// payloads are pretty printed JSON. Failures are rendered as an object
    /// with `success` and `error` merged into the payload's own fields.
    pub fn render(&self) -> String {
        if self.success {
            return match &self.payload {
                Value::String(text) => text.clone(),
                payload => to_pretty(payload),
            };
        }

        let mut object = match &self.payload {
            Value::Object(fields) => fields.clone(),
            Value::Null => Map::new(),
            other => {
                let mut fields = Map::new();
                fields.insert("payload".to_owned(), other.clone());
                fields
            }
        };
        object.insert("success".to_owned(), json!(false));
        object.insert("error".to_owned(), json!(self.error));
        to_pretty(&Value::Object(object))
    }

    pub(crate) fn to_call_result(&self) -> ToolCallResult {
        ToolCallResult {
            id: self.call_id.clone(),
            content: self.render(),
            is_error: !self.success,
        }
    }
}

fn to_pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::Error;

    #[test]
    fn test_render_success() {
        let outcome = ToolOutcome::success("1", json!("plain text"));
        assert_eq!(outcome.render(), "plain text");

        let outcome = ToolOutcome::success("1", json!({ "results": [] }));
        assert_eq!(outcome.render(), "{\n  \"results\": []\n}");
    }

    #[test]
    fn test_render_failure_merges_payload() {
        let outcome = ToolOutcome::failure("1", "boom")
            .with_payload(json!({ "agent_id": "analyst" }));
        let rendered: Value = serde_json::from_str(&outcome.render()).unwrap();
        assert_eq!(
            rendered,
            json!({ "agent_id": "analyst", "success": false, "error": "boom" })
        );
        let result = outcome.to_call_result();
        assert!(result.is_error);
        assert_eq!(result.id, "1");
    }

    #[test]
    fn test_from_result() {
        let outcome = ToolOutcome::from_result("7", Err(Error::not_found("nope")));
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("Tool 'nope' not found"));

        let outcome = ToolOutcome::from_result("8", Ok(json!(1)));
        assert!(outcome.success);
        assert!(outcome.error.is_none());
    }
}
