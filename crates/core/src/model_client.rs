use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;
use std::time::Duration;

use autoteam_model::{
    ContentBlock, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent, TokenUsage,
    ToolCallRequest,
};
use backoff::ExponentialBackoffBuilder;
use tracing::Instrument;

type TranscriptFn = Arc<dyn Fn(String) + Send + Sync>;
type SendRequestResult =
    Result<ModelClientResponse, Box<dyn ModelProviderError>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
#[rustfmt::skip]
type HandlerFn = Arc<
    dyn Fn(ModelRequest, TranscriptFn) -> BoxedSendRequestFuture + Send + Sync
>;

/// How failed requests are retried.
///
/// Only errors whose kind is retryable (rate limits, overload) are
/// retried. Delays grow exponentially between attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Zero disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_interval: Duration,
    /// Upper bound of the delay between retries.
    pub max_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[inline]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }
}

/// A wrapper around a model provider that maintains an execution
/// environment for the provider and provides a type-erased interface
/// for the other modules.
///
/// Cloning is cheap, the provider is shared between clones.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
    retry: RetryPolicy,
}

impl ModelClient {
    /// Creates a client for the given provider.
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since `ModelClient` doesn't have a
        // generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req, on_transcript| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    let resp_or_err = fut.await;
                    handle_response::<P>(resp_or_err, on_transcript).await
                }
                .instrument(trace_span!("model client req")),
            )
        });
        Self {
            handler_fn,
            retry: RetryPolicy::default(),
        }
    }

    /// Replaces the retry policy.
    #[inline]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sends a request and returns the complete response.
    ///
    /// Retryable failures are retried according to the [`RetryPolicy`].
    /// Text deltas are passed to `on_transcript` as they arrive. A retried
    /// attempt streams its text again from the start.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming further
    /// events when this operation is cancelled.
    pub async fn send_request(
        &self,
        req: ModelRequest,
        on_transcript: impl Fn(String) + Send + Sync + 'static,
    ) -> Result<ModelClientResponse, Box<dyn ModelProviderError>> {
        let on_transcript: TranscriptFn = Arc::new(on_transcript);
        let policy = self.retry;
        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(policy.initial_interval)
            .with_max_interval(policy.max_interval)
            .with_max_elapsed_time(None)
            .build();

        let mut attempt = 0;
        backoff::future::retry(backoff, || {
            attempt += 1;
            let this_attempt = attempt;
            let fut = (self.handler_fn)(req.clone(), Arc::clone(&on_transcript));
            async move {
                fut.await.map_err(|err| {
                    let kind = err.kind();
                    if kind.is_retryable() && this_attempt <= policy.max_retries {
                        warn!(attempt = this_attempt, ?kind, "model request failed, retrying");
                        backoff::Error::transient(err)
                    } else {
                        backoff::Error::permanent(err)
                    }
                })
            }
        })
        .await
    }
}

/// A completely received response from the model client.
#[derive(Clone, Debug)]
pub struct ModelClientResponse {
    /// Every text delta joined.
    pub transcript: String,
    /// Text and tool call blocks in the order they were produced.
    pub blocks: Vec<ContentBlock>,
    /// Tool calls requested by the model.
    pub tool_calls: Vec<ToolCallRequest>,
    /// The reason the model finished generating.
    pub finish_reason: Option<ModelFinishReason>,
    /// Token usage reported by the provider.
    pub usage: TokenUsage,
}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
    on_transcript: TranscriptFn,
) -> SendRequestResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            error!("got an error: {err:?}");
            return Err(Box::new(err));
        }
    };

    let mut transcript = String::new();
    let mut blocks = Vec::new();
    let mut tool_calls = Vec::new();
    let mut finish_reason = None;
    let mut usage = TokenUsage::default();
    let mut text_block_started = false;

    trace!("start receiving events");

    let mut pinned_resp = pin!(resp);
    loop {
        let event_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx)).await;
        let event = match event_or_err {
            Ok(event) => event,
            Err(err) => {
                error!("got an error: {err:?}");
                return Err(Box::new(err));
            }
        };

        let Some(event) = event else {
            break;
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::MessageDelta(msg) => {
                transcript.push_str(&msg);
                // Consecutive deltas form one text block until the provider
                // starts a new one.
                match blocks.last_mut() {
                    Some(ContentBlock::Text(text)) if !text_block_started => {
                        text.push_str(&msg)
                    }
                    _ => blocks.push(ContentBlock::Text(msg.clone())),
                }
                text_block_started = false;
                on_transcript(msg);
            }
            ModelResponseEvent::TextBlockStart => {
                text_block_started = true;
            }
            ModelResponseEvent::ToolCall(req) => {
                blocks.push(ContentBlock::ToolCall(req.clone()));
                tool_calls.push(req);
            }
            ModelResponseEvent::Usage(reported) => {
                usage = reported;
            }
            ModelResponseEvent::Completed(reason) => {
                finish_reason = Some(reason);
            }
        }
    }

    trace!("finished a request");

    Ok(ModelClientResponse {
        transcript,
        blocks,
        tool_calls,
        finish_reason,
        usage,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use autoteam_model::{CacheHints, ErrorKind, ModelMessage, ModelSettings};
    use autoteam_test_model::{
        PresetEvent, PresetResponse, TestModelProvider,
    };
    use serde_json::json;

    use super::*;

    fn request() -> ModelRequest {
        ModelRequest {
            settings: ModelSettings::new("test", 0.7, 1024),
            system: None,
            messages: vec![ModelMessage::User("Hi".to_owned())],
            tools: vec![],
            cache: CacheHints::default(),
        }
    }

    fn fast_retry(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(2),
        }
    }

    #[tokio::test]
    async fn test_send_request() {
        let mut model_provider = TestModelProvider::default();
        model_provider.add_exchange(
            PresetResponse::with_events([
                PresetEvent::MessageDelta("How ".to_owned()),
                PresetEvent::MessageDelta("are ".to_owned()),
                PresetEvent::ToolCall(ToolCallRequest {
                    id: "call_1".to_owned(),
                    name: "web_search".to_owned(),
                    arguments: json!({ "query": "you" }),
                }),
                PresetEvent::MessageDelta("you?".to_owned()),
            ])
            .with_usage(7, 3),
        );

        let model_client = ModelClient::new(model_provider);

        for _ in 0..3 {
            let on_transcript_called = Arc::new(AtomicBool::new(false));
            let resp = model_client
                .send_request(request(), {
                    let on_transcript_called = Arc::clone(&on_transcript_called);
                    move |_| {
                        on_transcript_called.store(true, Ordering::Relaxed);
                    }
                })
                .await
                .unwrap();
            assert_eq!(resp.transcript, "How are you?");
            assert_eq!(resp.blocks.len(), 3);
            assert_eq!(resp.blocks[0], ContentBlock::Text("How are ".to_owned()));
            assert_eq!(resp.tool_calls.len(), 1);
            assert_eq!(resp.finish_reason, Some(ModelFinishReason::ToolCalls));
            assert_eq!(resp.usage, TokenUsage::new(7, 3));
            assert!(on_transcript_called.load(Ordering::Relaxed));
        }
    }

    #[tokio::test]
    async fn test_text_block_boundaries() {
        let mut model_provider = TestModelProvider::default();
        model_provider.add_exchange(PresetResponse::with_events([
            PresetEvent::TextBlockStart,
            PresetEvent::MessageDelta("A".to_owned()),
            PresetEvent::TextBlockStart,
            PresetEvent::MessageDelta("B".to_owned()),
            PresetEvent::MessageDelta("C".to_owned()),
        ]));

        let resp = ModelClient::new(model_provider)
            .send_request(request(), |_| {})
            .await
            .unwrap();
        assert_eq!(
            resp.blocks,
            [
                ContentBlock::Text("A".to_owned()),
                ContentBlock::Text("BC".to_owned()),
            ]
        );
        assert_eq!(resp.transcript, "ABC");
    }

    #[tokio::test]
    async fn test_error_handling() {
        let model_provider = TestModelProvider::default();
        let model_client = ModelClient::new(model_provider);
        let resp_or_err = model_client.send_request(request(), |_| {}).await;
        assert!(matches!(resp_or_err, Err(err) if err.kind() == ErrorKind::Other));
    }

    #[tokio::test]
    async fn test_retry_transient_failures() {
        let mut model_provider = TestModelProvider::default();
        model_provider
            .add_exchange(PresetResponse::with_text("finally").with_failures(2));
        let model_client = ModelClient::new(model_provider.clone())
            .with_retry_policy(fast_retry(3));

        let resp = model_client.send_request(request(), |_| {}).await.unwrap();
        assert_eq!(resp.transcript, "finally");
        assert_eq!(model_provider.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up() {
        let mut model_provider = TestModelProvider::default();
        model_provider
            .add_exchange(PresetResponse::with_text("never").with_failures(0));
        let model_client = ModelClient::new(model_provider.clone())
            .with_retry_policy(fast_retry(2));

        let err = model_client
            .send_request(request(), |_| {})
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        assert_eq!(model_provider.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let mut model_provider = TestModelProvider::default();
        model_provider.set_failure_kind(ErrorKind::InvalidRequest);
        model_provider
            .add_exchange(PresetResponse::with_text("never").with_failures(0));
        let model_client = ModelClient::new(model_provider.clone())
            .with_retry_policy(fast_retry(5));

        assert!(model_client.send_request(request(), |_| {}).await.is_err());
        assert_eq!(model_provider.requests().len(), 1);
    }
}
