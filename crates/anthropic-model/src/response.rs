use std::collections::{HashMap, VecDeque};
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use autoteam_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
    TokenUsage, ToolCallRequest,
};
use pin_project_lite::pin_project;
use serde_json::{Value, json};

use crate::Error;
use crate::io::Sse;
use crate::proto::{BlockDelta, BlockStart, StreamEvent};

struct PartialToolCall {
    id: String,
    name: String,
    input_json: String,
}

struct PartialState {
    sse: Sse,
    // Tool use blocks whose input is still streaming, by block index.
    tool_calls: HashMap<usize, PartialToolCall>,
    usage: TokenUsage,
    stop_reason: Option<String>,
    // Events decoded but not yet returned to the caller.
    pending: VecDeque<ModelResponseEvent>,
    finished: bool,
}

impl PartialState {
    fn apply(&mut self, event: StreamEvent) -> Result<(), Error> {
        match event {
            StreamEvent::MessageStart { message } => {
                trace!("message started: {}", message.id);
                let usage = message.usage;
                self.usage.input_tokens = usage.input_tokens;
                self.usage.output_tokens = usage.output_tokens;
                self.usage.cache_creation_input_tokens =
                    usage.cache_creation_input_tokens.unwrap_or_default();
                self.usage.cache_read_input_tokens =
                    usage.cache_read_input_tokens.unwrap_or_default();
            }
            StreamEvent::ContentBlockStart {
                index,
                content_block,
            } => match content_block {
                BlockStart::Text { text } => {
                    self.pending.push_back(ModelResponseEvent::TextBlockStart);
                    self.push_text(text);
                }
                BlockStart::ToolUse { id, name } => {
                    self.tool_calls.insert(
                        index,
                        PartialToolCall {
                            id,
                            name,
                            input_json: String::new(),
                        },
                    );
                }
                BlockStart::Other => {}
            },
            StreamEvent::ContentBlockDelta { index, delta } => match delta {
                BlockDelta::TextDelta { text } => self.push_text(text),
                BlockDelta::InputJsonDelta { partial_json } => {
                    let Some(call) = self.tool_calls.get_mut(&index) else {
                        return Err(Error::new(
                            format!("input delta for unknown block {index}"),
                            ErrorKind::Other,
                        ));
                    };
                    call.input_json.push_str(&partial_json);
                }
                BlockDelta::Other => {}
            },
            StreamEvent::ContentBlockStop { index } => {
                if let Some(call) = self.tool_calls.remove(&index) {
                    let arguments = parse_tool_input(&call.input_json)?;
                    self.pending.push_back(ModelResponseEvent::ToolCall(
                        ToolCallRequest {
                            id: call.id,
                            name: call.name,
                            arguments,
                        },
                    ));
                }
            }
            StreamEvent::MessageDelta { delta, usage } => {
                self.stop_reason = delta.stop_reason;
                if let Some(usage) = usage {
                    // Output tokens are cumulative.
                    self.usage.output_tokens = usage.output_tokens;
                }
            }
            StreamEvent::MessageStop => {
                let reason = finish_reason(self.stop_reason.as_deref());
                self.pending.push_back(ModelResponseEvent::Usage(self.usage));
                self.pending.push_back(ModelResponseEvent::Completed(reason));
                self.finished = true;
            }
            StreamEvent::Error { error } => {
                return Err(Error::new(
                    format!("{}: {}", error.r#type, error.message),
                    error_kind_for_type(&error.r#type),
                ));
            }
            StreamEvent::Ping | StreamEvent::Unknown => {}
        }
        Ok(())
    }

    #[inline]
    fn push_text(&mut self, text: String) {
        if !text.is_empty() {
            self.pending
                .push_back(ModelResponseEvent::MessageDelta(text));
        }
    }
}

fn parse_tool_input(input_json: &str) -> Result<Value, Error> {
    if input_json.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(input_json).map_err(|err| {
        Error::new(format!("invalid tool input: {err}"), ErrorKind::Other)
    })
}

/// Maps the `stop_reason` of a message.
pub(crate) fn finish_reason(stop_reason: Option<&str>) -> ModelFinishReason {
    match stop_reason {
        Some("end_turn") => ModelFinishReason::Stop,
        Some("tool_use") => ModelFinishReason::ToolCalls,
        Some(other) => ModelFinishReason::Other(other.to_owned()),
        None => ModelFinishReason::Other("missing".to_owned()),
    }
}

/// Maps the `type` of an API error object.
pub(crate) fn error_kind_for_type(error_type: &str) -> ErrorKind {
    match error_type {
        "rate_limit_error" => ErrorKind::RateLimitExceeded,
        "overloaded_error" | "api_error" => ErrorKind::Overloaded,
        "invalid_request_error" | "request_too_large" => ErrorKind::InvalidRequest,
        _ => ErrorKind::Other,
    }
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    /// A streamed Messages API response.
    pub struct AnthropicResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl AnthropicResponse {
    #[inline]
    pub(crate) fn from_sse(sse: Sse) -> Self {
        let partial_state = PartialState {
            sse,
            tool_calls: Default::default(),
            usage: Default::default(),
            stop_reason: None,
            pending: Default::default(),
            finished: false,
        };
        let next_event_fut = async move { next_event(partial_state).await };
        Self {
            next_event_fut: Some(Box::pin(next_event_fut)),
        }
    }
}

impl ModelResponse for AnthropicResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok((Some(event), partial_state)) => (event, partial_state),
                Ok((None, _)) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        let next_event_fut = async move { next_event(partial_state).await };
        *this.next_event_fut = Some(Box::pin(next_event_fut));

        Poll::Ready(Ok(Some(event)))
    }
}

async fn next_event(mut partial_state: PartialState) -> NextEvent {
    loop {
        if let Some(event) = partial_state.pending.pop_front() {
            return Ok((Some(event), partial_state));
        }
        if partial_state.finished {
            return Ok((None, partial_state));
        }

        let sse_event = match partial_state.sse.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => {
                return Err(Error::new(
                    "stream ended before message_stop",
                    ErrorKind::Other,
                ));
            }
            Err(err) => {
                return Err(Error::new(format!("{err:?}"), ErrorKind::Other));
            }
        };
        trace!("got sse event: {:?} {}", sse_event.event, sse_event.data);

        let event = serde_json::from_str::<StreamEvent>(&sse_event.data)
            .map_err(|err| Error::new(format!("{err}"), ErrorKind::Other))?;
        partial_state.apply(event)?;
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use autoteam_model::ModelProviderError;
    use bytes::Bytes;

    use super::*;
    use crate::io::Chunks;

    async fn collect(body: &'static [u8]) -> Result<Vec<ModelResponseEvent>, Error> {
        let chunks = Chunks::from_vec_deque(vec![Bytes::from_static(body)].into());
        let mut resp = pin!(AnthropicResponse::from_sse(Sse::new(chunks)));
        let mut events = vec![];
        while let Some(event) =
            poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await?
        {
            events.push(event);
        }
        Ok(events)
    }

    #[tokio::test]
    async fn test_tool_use_stream() {
        let events = collect(include_bytes!("../fixtures/tool_use_stream.txt"))
            .await
            .unwrap();
        assert_eq!(
            events,
            [
                ModelResponseEvent::TextBlockStart,
                ModelResponseEvent::MessageDelta("Let me look ".to_owned()),
                ModelResponseEvent::MessageDelta("that up.".to_owned()),
                ModelResponseEvent::ToolCall(ToolCallRequest {
                    id: "toolu_01".to_owned(),
                    name: "web_search".to_owned(),
                    arguments: json!({ "query": "crm market size", "num_results": 3 }),
                }),
                ModelResponseEvent::ToolCall(ToolCallRequest {
                    id: "toolu_02".to_owned(),
                    name: "store_context".to_owned(),
                    arguments: json!({}),
                }),
                ModelResponseEvent::Usage(TokenUsage {
                    input_tokens: 312,
                    output_tokens: 87,
                    cache_creation_input_tokens: 0,
                    cache_read_input_tokens: 1830,
                }),
                ModelResponseEvent::Completed(ModelFinishReason::ToolCalls),
            ]
        );
    }

    #[tokio::test]
    async fn test_error_event() {
        let err = collect(
            b"event: message_start\n\
              data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\",\"usage\":{\"input_tokens\":5,\"output_tokens\":1}}}\n\n\
              event: error\n\
              data: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"Overloaded\"}}\n\n",
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Overloaded);
        assert_eq!(err.message(), "overloaded_error: Overloaded");
    }

    #[tokio::test]
    async fn test_truncated_stream() {
        let err = collect(
            b"event: message_start\n\
              data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\"}}\n\n",
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
    }

    #[test]
    fn test_finish_reason() {
        assert_eq!(finish_reason(Some("end_turn")), ModelFinishReason::Stop);
        assert_eq!(finish_reason(Some("tool_use")), ModelFinishReason::ToolCalls);
        assert_eq!(
            finish_reason(Some("max_tokens")),
            ModelFinishReason::Other("max_tokens".to_owned())
        );
    }
}
