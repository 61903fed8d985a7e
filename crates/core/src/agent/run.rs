use std::time::Instant;

use autoteam_model::{
    CacheHints, ModelFinishReason, ModelRequest, ModelSettings, TokenUsage,
};
use tracing::Instrument;

use super::{
    Agent, AgentEvent, AgentEventKind, BudgetPolicy, ModelSelection, RunError,
    RunResult, TaskContext, render_task,
};
use crate::conversation::{Conversation, Turn};

/// Output tokens assumed when estimating the cost of a call.
const EXPECTED_OUTPUT_TOKENS: u32 = 1000;

#[derive(Default)]
struct Progress {
    iterations: usize,
    usage: TokenUsage,
}

impl Agent {
    /// Runs a task to completion and returns the terminal record.
    ///
    /// Each iteration makes one model call. Tool calls of a response run
    /// concurrently and their results are fed back in call order. The run
    /// finishes when the model stops on its own, and fails when the model
    /// call fails, the model stops for any other reason, the budget is
    /// refused under [`BudgetPolicy::Enforce`], or `max_iterations` calls
    /// were made without an answer.
    ///
    /// Runs never share conversation state. Every turn of a finished run is
    /// appended to [`conversation_history`](Agent::conversation_history).
    pub async fn run(
        &self,
        task: &str,
        context: Option<&TaskContext>,
        max_iterations: usize,
    ) -> RunResult {
        let started = Instant::now();
        let mut conversation = Conversation::default();
        let mut progress = Progress::default();

        self.emit(AgentEventKind::RunStarted);
        let span = info_span!("agent run", agent_id = %self.id());
        let outcome = self
            .run_loop(task, context, max_iterations, &mut conversation, &mut progress)
            .instrument(span)
            .await;
        self.lock_history().extend(conversation);

        let elapsed_seconds = started.elapsed().as_secs_f64();
        let (result, error) = match outcome {
            Ok(text) => {
                info!(
                    agent_id = %self.id(),
                    iterations = progress.iterations,
                    elapsed_seconds,
                    "agent run completed"
                );
                (Some(text), None)
            }
            Err(err) => {
                warn!(agent_id = %self.id(), "agent run failed: {err}");
                (None, Some(err.to_string()))
            }
        };
        let success = result.is_some();
        self.emit(AgentEventKind::RunFinished { success });

        RunResult {
            success,
            agent_id: self.id().to_owned(),
            result,
            error,
            iterations: progress.iterations,
            elapsed_seconds,
            usage: progress.usage,
        }
    }

    async fn run_loop(
        &self,
        task: &str,
        context: Option<&TaskContext>,
        max_iterations: usize,
        conversation: &mut Conversation,
        progress: &mut Progress,
    ) -> Result<String, RunError> {
        let settings = self.model_settings(task);
        let tools = self.inner.toolset.definitions();
        let system = Some(self.inner.system_prompt.clone())
            .filter(|prompt| !prompt.is_empty());
        info!(model = %settings.model, max_iterations, "agent run started");

        conversation.push(Turn::user(render_task(task, context)));

        for iteration in 1..=max_iterations {
            self.check_budget(&settings, conversation)?;

            progress.iterations = iteration;
            self.emit(AgentEventKind::Thinking { iteration });
            debug!(iteration, "sending model request");

            let request = ModelRequest {
                settings: settings.clone(),
                system: system.clone(),
                messages: conversation.messages(),
                tools: tools.clone(),
                cache: self.plan_cache(tools.len(), conversation.len()),
            };
            let response = self
                .inner
                .client
                .send_request(request, self.transcript_sink())
                .await
                .map_err(RunError::Model)?;

            progress.usage += response.usage;
            self.record_usage(&settings.model, &response.usage);

            let finish_reason = response
                .finish_reason
                .unwrap_or_else(|| ModelFinishReason::Other("missing".to_owned()));
            let turn = Turn::assistant(response.blocks, finish_reason.clone());
            match finish_reason {
                ModelFinishReason::Stop => {
                    let text = turn.text();
                    conversation.push(turn);
                    return Ok(text);
                }
                ModelFinishReason::ToolCalls if !response.tool_calls.is_empty() => {
                    conversation.push(turn);
                    let outcomes = self.dispatch(&response.tool_calls).await;
                    conversation.push(Turn::tool_results(&outcomes));
                }
                ModelFinishReason::ToolCalls => {
                    conversation.push(turn);
                    return Err(RunError::UnexpectedStop(
                        "tool_use without tool calls".to_owned(),
                    ));
                }
                ModelFinishReason::Other(reason) => {
                    conversation.push(turn);
                    return Err(RunError::UnexpectedStop(reason));
                }
            }
        }

        Err(RunError::MaxIterations)
    }

    fn model_settings(&self, task: &str) -> ModelSettings {
        match &self.inner.model {
            ModelSelection::Fixed(settings) => settings.clone(),
            ModelSelection::Routed(router) => {
                let route = router.route_task(task, self.id(), None);
                ModelSettings::new(route.model, route.temperature, route.max_tokens)
            }
        }
    }

    fn check_budget(
        &self,
        settings: &ModelSettings,
        conversation: &Conversation,
    ) -> Result<(), RunError> {
        let Some(gate) = &self.inner.budget else {
            return Ok(());
        };

        let input = format!("{}\n{}", self.inner.system_prompt, conversation.transcript());
        let expected_output = settings.max_output_tokens.min(EXPECTED_OUTPUT_TOKENS);
        let admission =
            gate.manager
                .should_allow_call(&input, expected_output.into(), &settings.model);
        if admission.allowed {
            return Ok(());
        }

        match gate.policy {
            BudgetPolicy::Advisory => {
                warn!(reason = %admission.reason, "budget check failed, calling the model anyway");
                Ok(())
            }
            BudgetPolicy::Enforce => Err(RunError::BudgetDenied(admission.reason)),
        }
    }

    fn plan_cache(&self, tool_count: usize, turns: usize) -> CacheHints {
        match &self.inner.cache {
            Some(planner) => planner.plan(&self.inner.system_prompt, tool_count, turns),
            None => CacheHints::default(),
        }
    }

    fn record_usage(&self, model: &str, usage: &TokenUsage) {
        if let Some(gate) = &self.inner.budget {
            // Cached input is billed at the base price.
            let input_tokens = usage.input_tokens
                + usage.cache_creation_input_tokens
                + usage.cache_read_input_tokens;
            gate.manager
                .record_usage(self.id(), input_tokens, usage.output_tokens, model);
        }
        if let Some(planner) = &self.inner.cache {
            planner.record_usage(usage);
        }
    }

    fn transcript_sink(&self) -> impl Fn(String) + Send + Sync + 'static {
        let on_event = self.inner.on_event.clone();
        let agent_id = self.inner.id.clone();
        move |delta| {
            if let Some(on_event) = &on_event {
                on_event(AgentEvent {
                    agent_id: agent_id.clone(),
                    kind: AgentEventKind::TextDelta(delta),
                });
            }
        }
    }
}
