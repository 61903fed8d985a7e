//! A local fake model for testing purpose.

mod preset;

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use autoteam_model::{
    ErrorKind, ModelProvider, ModelProviderError, ModelRequest, ModelResponse,
    ModelResponseEvent,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub struct TestModelResponse {
    events: Vec<ModelResponseEvent>,
    event_idx: usize,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl TestModelResponse {
    fn new(preset: &PresetResponse, delay: Duration) -> Self {
        let mut events: Vec<_> = preset
            .events
            .iter()
            .map(|event| match event {
                PresetEvent::MessageDelta(msg) => {
                    ModelResponseEvent::MessageDelta(msg.clone())
                }
                PresetEvent::TextBlockStart => ModelResponseEvent::TextBlockStart,
                PresetEvent::ToolCall(req) => {
                    ModelResponseEvent::ToolCall(req.clone())
                }
            })
            .collect();
        if let Some(usage) = preset.usage {
            events.push(ModelResponseEvent::Usage(usage));
        }
        events.push(ModelResponseEvent::Completed(preset.finish_reason()));
        Self {
            events,
            event_idx: 0,
            delay,
            sleep: None,
        }
    }
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        // SAFETY: This type does not require to be pinned.
        let this = unsafe { self.get_unchecked_mut() };

        if let Some(sleep) = &mut this.sleep {
            ready!(sleep.as_mut().poll(cx));
            this.sleep = None;

            // Returns `None` when called after completion.
            let event = this.events.get(this.event_idx).cloned();
            this.event_idx += 1;
            return Poll::Ready(Ok(event));
        }
        this.sleep = Some(Box::pin(sleep(this.delay)));
        Pin::new(this).poll_next_event(cx)
    }
}

#[derive(Clone)]
enum ConversationStep {
    UserInput,
    AssistantResponse(PresetResponse),
}

#[derive(Default)]
struct SharedState {
    attempts: HashMap<usize, u64>,
    requests: Vec<ModelRequest>,
}

/// A local fake model for testing purpose.
///
/// Before sending requests, you need to setup the conversation script, which
/// is how the model should respond to a request. The added steps will be
/// selected according to the history messages in your request. If there are no
/// enough steps in the script, an error will be returned.
///
/// A batch of tool results counts as a user input step, so a run that calls
/// tools once is scripted as: user input, assistant response (with tool
/// calls), user input, assistant response.
///
/// Clones share the attempt counters and the request log.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone)]
pub struct TestModelProvider {
    conversation_script: Vec<ConversationStep>,
    delay: Duration,
    failure_kind: ErrorKind,
    state: Arc<Mutex<SharedState>>,
}

impl Default for TestModelProvider {
    fn default() -> Self {
        Self {
            conversation_script: vec![],
            delay: Duration::from_millis(1),
            failure_kind: ErrorKind::RateLimitExceeded,
            state: Default::default(),
        }
    }
}

impl TestModelProvider {
    #[inline]
    pub fn add_assistant_response_step(&mut self, preset: PresetResponse) {
        self.conversation_script
            .push(ConversationStep::AssistantResponse(preset));
    }

    #[inline]
    pub fn add_user_input_step(&mut self) {
        self.conversation_script.push(ConversationStep::UserInput);
    }

    /// Appends a user input step followed by the given response, which is
    /// the shape of every model turn in an agent run.
    #[inline]
    pub fn add_exchange(&mut self, preset: PresetResponse) {
        self.add_user_input_step();
        self.add_assistant_response_step(preset);
    }

    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = duration;
    }

    /// Sets the error kind returned by scripted failures.
    #[inline]
    pub fn set_failure_kind(&mut self, kind: ErrorKind) {
        self.failure_kind = kind;
    }

    /// Returns every request this provider (or any of its clones) has
    /// received, including failed attempts.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.lock_state().requests.clone()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn prepare_response(
        &self,
        req: &ModelRequest,
    ) -> Result<TestModelResponse, Error> {
        let step_idx = req.messages.len();
        let mut state = self.lock_state();
        state.requests.push(req.clone());

        let Some(step) = self.conversation_script.get(step_idx) else {
            return Err(Error {
                message: "no enough steps",
                kind: ErrorKind::Other,
            });
        };
        let ConversationStep::AssistantResponse(preset) = step else {
            return Err(Error {
                message: "not an assistant response step",
                kind: ErrorKind::InvalidRequest,
            });
        };

        if let Some(failures) = preset.failures {
            let attempts = state.attempts.entry(step_idx).or_default();
            *attempts += 1;
            if failures == 0 || *attempts <= failures {
                return Err(Error {
                    message: "scripted failure",
                    kind: self.failure_kind,
                });
            }
        }

        Ok(TestModelResponse::new(preset, self.delay))
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        ready(self.prepare_response(req))
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use autoteam_model::{
        CacheHints, ContentBlock, ModelFinishReason, ModelMessage,
        ModelSettings, ModelTool, TokenUsage, ToolCallRequest,
    };
    use serde_json::json;

    use super::*;

    struct Collected {
        text: String,
        tool_calls: Vec<ToolCallRequest>,
        usage: Option<TokenUsage>,
        finish_reason: ModelFinishReason,
    }

    async fn collect_response(resp: TestModelResponse) -> Collected {
        let mut resp = pin!(resp);
        let mut text = String::new();
        let mut tool_calls = vec![];
        let mut usage = None;
        let mut finish_reason = None;
        while let Some(event) = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
            .await
            .unwrap()
        {
            match event {
                ModelResponseEvent::Completed(reason) => {
                    finish_reason = Some(reason)
                }
                ModelResponseEvent::MessageDelta(delta) => {
                    text.push_str(&delta);
                }
                ModelResponseEvent::TextBlockStart => {}
                ModelResponseEvent::ToolCall(req) => tool_calls.push(req),
                ModelResponseEvent::Usage(reported) => usage = Some(reported),
            }
        }
        Collected {
            text,
            tool_calls,
            usage,
            finish_reason: finish_reason.unwrap(),
        }
    }

    fn request(messages: Vec<ModelMessage>) -> ModelRequest {
        ModelRequest {
            settings: ModelSettings::new("test", 0.7, 1024),
            system: None,
            messages,
            tools: vec![ModelTool {
                name: "web_search".to_owned(),
                description: "Searches the web".to_owned(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string" }
                    }
                }),
            }],
            cache: CacheHints::default(),
        }
    }

    #[tokio::test]
    async fn test_send_request() {
        let mut provider = TestModelProvider::default();
        provider.add_exchange(
            PresetResponse::with_events([
                PresetEvent::MessageDelta("Sure, ".to_owned()),
                PresetEvent::MessageDelta("let me search.".to_owned()),
                PresetEvent::ToolCall(ToolCallRequest {
                    id: "tool:1".to_owned(),
                    name: "web_search".to_owned(),
                    arguments: json!({ "query": "rust" }),
                }),
            ])
            .with_usage(10, 5),
        );
        provider.add_exchange(PresetResponse::with_text("Done."));

        let mut req = request(vec![ModelMessage::User("Hi".to_owned())]);
        let resp = provider.send_request(&req).await.unwrap();
        let collected = collect_response(resp).await;
        assert_eq!(collected.text, "Sure, let me search.");
        assert_eq!(collected.finish_reason, ModelFinishReason::ToolCalls);
        assert_eq!(collected.usage, Some(TokenUsage::new(10, 5)));
        let tool_call = &collected.tool_calls[0];
        assert_eq!(tool_call.name, "web_search");
        assert_eq!(tool_call.arguments, json!({ "query": "rust" }));

        req.messages.push(ModelMessage::Assistant(vec![
            ContentBlock::ToolCall(tool_call.clone()),
        ]));
        req.messages.push(ModelMessage::ToolResults(vec![]));
        let resp = provider.send_request(&req).await.unwrap();
        let collected = collect_response(resp).await;
        assert_eq!(collected.text, "Done.");
        assert_eq!(collected.finish_reason, ModelFinishReason::Stop);
        assert!(collected.usage.is_none());

        assert_eq!(provider.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_scripted_failures() {
        let mut provider = TestModelProvider::default();
        provider.add_exchange(PresetResponse::with_text("ok").with_failures(2));

        let req = request(vec![ModelMessage::User("Hi".to_owned())]);
        for _ in 0..2 {
            let err = provider.send_request(&req).await.err().unwrap();
            assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        }
        let resp = provider.send_request(&req).await.unwrap();
        assert_eq!(collect_response(resp).await.text, "ok");
    }

    #[tokio::test]
    async fn test_out_of_script() {
        let provider = TestModelProvider::default();
        let req = request(vec![ModelMessage::User("Hi".to_owned())]);
        let err = provider.send_request(&req).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert!(!err.kind().is_retryable());
    }
}
