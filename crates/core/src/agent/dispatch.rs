use std::collections::HashMap;
use std::future::ready;
use std::pin::Pin;
use std::sync::Arc;

use autoteam_model::{ModelTool, ToolCallRequest};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tracing::Instrument;

use super::{Agent, AgentEventKind, AgentRole, TaskContext, TaskRunner};
use crate::tool::{ApprovalRequest, Error, RiskLevel, ToolOutcome, ToolRegistry};

/// The tool a manager uses to ask for human approval.
pub const APPROVAL_TOOL_NAME: &str = "request_human_approval";

type BoxedOutcomeFuture = Pin<Box<dyn Future<Output = ToolOutcome> + Send>>;

/// Returns the name of the tool that delegates to a specialist.
#[inline]
pub fn specialist_tool_name(agent_id: &str) -> String {
    format!("call_{agent_id}_agent")
}

pub(crate) struct SpecialistSlot {
    pub id: String,
    pub description: String,
    pub runner: Option<Arc<dyn TaskRunner>>,
}

/// What a tool name offered to the model is bound to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ToolBinding {
    Generic,
    Specialist(String),
    Approval,
}

/// The tools of one agent, resolved once when the agent is built.
pub(crate) struct Toolset {
    entries: Vec<(ToolBinding, ModelTool)>,
    index: HashMap<String, usize>,
}

impl Toolset {
    pub fn resolve(
        registry: &ToolRegistry,
        role: &AgentRole,
        slots: Vec<SpecialistSlot>,
    ) -> (Self, HashMap<String, Arc<dyn TaskRunner>>) {
        let mut toolset = Self {
            entries: vec![],
            index: HashMap::new(),
        };
        for definition in registry.definitions() {
            toolset.insert(ToolBinding::Generic, definition);
        }

        let mut runners = HashMap::new();
        if *role != AgentRole::Manager {
            return (toolset, runners);
        }

        for slot in slots {
            let description = if slot.description.is_empty() {
                format!("Delegate a task to the {} agent.", slot.id)
            } else {
                slot.description
            };
            toolset.insert(
                ToolBinding::Specialist(slot.id.clone()),
                ModelTool {
                    name: specialist_tool_name(&slot.id),
                    description,
                    parameters: specialist_schema(),
                },
            );
            if let Some(runner) = slot.runner {
                runners.insert(slot.id, runner);
            }
        }
        toolset.insert(
            ToolBinding::Approval,
            ModelTool {
                name: APPROVAL_TOOL_NAME.to_owned(),
                description: "Request human approval for high-stakes decisions \
                    like financial commitments >$1,000, major strategy pivots, \
                    or legal matters. Returns approval status."
                    .to_owned(),
                parameters: approval_schema(),
            },
        );
        (toolset, runners)
    }

    fn insert(&mut self, binding: ToolBinding, definition: ModelTool) {
        if let Some(&idx) = self.index.get(&definition.name) {
            warn!("tool {} is shadowed by a {binding:?} tool", definition.name);
            self.entries[idx] = (binding, definition);
            return;
        }
        self.index.insert(definition.name.clone(), self.entries.len());
        self.entries.push((binding, definition));
    }

    pub fn binding(&self, name: &str) -> Option<&ToolBinding> {
        self.index.get(name).map(|&idx| &self.entries[idx].0)
    }

    pub fn definitions(&self) -> Vec<ModelTool> {
        self.entries.iter().map(|(_, tool)| tool.clone()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(_, tool)| tool.name.clone()).collect()
    }
}

fn specialist_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "task": {
                "type": "string",
                "description": "The specific task or question for the specialist"
            },
            "context": {
                "type": "object",
                "description": "Additional context (product info, target market, etc.)"
            }
        },
        "required": ["task"]
    })
}

fn approval_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "decision": {
                "type": "string",
                "description": "The decision that needs approval"
            },
            "rationale": {
                "type": "string",
                "description": "Why this decision is recommended"
            },
            "risk_level": {
                "type": "string",
                "enum": ["low", "medium", "high"],
                "description": "Risk level of this decision"
            }
        },
        "required": ["decision", "rationale"]
    })
}

#[derive(Deserialize)]
struct SpecialistCallInput {
    task: String,
    #[serde(default)]
    context: Option<TaskContext>,
}

#[derive(Deserialize)]
struct ApprovalInput {
    decision: String,
    rationale: String,
    #[serde(default)]
    risk_level: RiskLevel,
}

struct PendingCall {
    call_id: String,
    failure_payload: Value,
    handle: JoinHandle<ToolOutcome>,
}

/// Tool calls of one response running as separate tasks.
///
/// Dropping the batch aborts the calls still running.
struct TaskBatch {
    calls: Vec<PendingCall>,
}

impl TaskBatch {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            calls: Vec::with_capacity(capacity),
        }
    }

    fn spawn(&mut self, call_id: String, failure_payload: Value, fut: BoxedOutcomeFuture) {
        let handle = tokio::spawn(fut);
        self.calls.push(PendingCall {
            call_id,
            failure_payload,
            handle,
        });
    }

    /// Waits for every call and returns the outcomes in spawn order.
    async fn join(mut self) -> Vec<ToolOutcome> {
        let mut outcomes = Vec::with_capacity(self.calls.len());
        for call in &mut self.calls {
            let outcome = match (&mut call.handle).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!("tool task failed: {err}");
                    ToolOutcome::failure(
                        call.call_id.clone(),
                        format!("Tool task failed: {err}"),
                    )
                    .with_payload(call.failure_payload.take())
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }
}

impl Drop for TaskBatch {
    fn drop(&mut self) {
        for call in &self.calls {
            call.handle.abort();
        }
    }
}

impl Agent {
    /// Runs every tool call of a response concurrently and returns one
    /// outcome per call, in call order.
    pub(super) async fn dispatch(&self, calls: &[ToolCallRequest]) -> Vec<ToolOutcome> {
        let mut batch = TaskBatch::with_capacity(calls.len());
        for call in calls {
            debug!(tool = %call.name, call_id = %call.id, "tool requested");
            self.emit(AgentEventKind::ToolStarted {
                name: call.name.clone(),
            });
            let (fut, failure_payload) = self.dispatch_one(call);
            batch.spawn(call.id.clone(), failure_payload, fut);
        }

        let outcomes = batch.join().await;
        for (call, outcome) in calls.iter().zip(&outcomes) {
            debug!(
                tool = %call.name,
                call_id = %call.id,
                success = outcome.success,
                "tool completed"
            );
            self.emit(AgentEventKind::ToolFinished {
                name: call.name.clone(),
                success: outcome.success,
            });
        }
        outcomes
    }

    fn dispatch_one(&self, call: &ToolCallRequest) -> (BoxedOutcomeFuture, Value) {
        let call_id = call.id.clone();
        match self.inner.toolset.binding(&call.name) {
            None => {
                warn!("tool not found: {}", call.name);
                let outcome = ToolOutcome::from_result(call_id, Err(Error::not_found(&call.name)));
                (Box::pin(ready(outcome)), Value::Null)
            }
            Some(ToolBinding::Generic) => {
                let fut = self
                    .inner
                    .registry
                    .execute_tool(&call.name, call.arguments.clone());
                let fut = async move { ToolOutcome::from_result(call_id, fut.await) };
                (Box::pin(fut.in_current_span()), Value::Null)
            }
            Some(ToolBinding::Specialist(agent_id)) => (
                self.delegate(call_id, agent_id, call.arguments.clone()),
                json!({ "agent_id": agent_id }),
            ),
            Some(ToolBinding::Approval) => {
                (self.request_approval(call_id, call.arguments.clone()), Value::Null)
            }
        }
    }

    /// Runs a specialist's full loop and reports its [`RunResult`] as the
    /// tool payload.
    ///
    /// [`RunResult`]: super::RunResult
    fn delegate(&self, call_id: String, agent_id: &str, arguments: Value) -> BoxedOutcomeFuture {
        let failure = |error: String| {
            ToolOutcome::failure(call_id.clone(), error)
                .with_payload(json!({ "agent_id": agent_id }))
        };

        let input: SpecialistCallInput = match serde_json::from_value(arguments) {
            Ok(input) => input,
            Err(err) => return Box::pin(ready(failure(format!("Invalid input: {err}")))),
        };
        let Some(runner) = self.inner.specialists.get(agent_id).cloned() else {
            warn!("unknown specialist agent: {agent_id}");
            return Box::pin(ready(failure(format!("Unknown specialist agent: {agent_id}"))));
        };

        let max_iterations = self.inner.specialist_max_iterations;
        let span = info_span!("delegate", manager = %self.id(), specialist = %agent_id);
        Box::pin(
            async move {
                info!("specialist call started");
                let result = runner
                    .run_task(input.task, input.context, max_iterations)
                    .await;
                let payload = serde_json::to_value(&result).unwrap_or_else(|err| {
                    json!({ "agent_id": result.agent_id, "error": err.to_string() })
                });
                if result.success {
                    info!(iterations = result.iterations, "specialist call completed");
                    ToolOutcome::success(call_id, payload)
                } else {
                    let error = result.error.unwrap_or_default();
                    warn!(%error, "specialist call failed");
                    ToolOutcome::failure(call_id, error).with_payload(payload)
                }
            }
            .instrument(span),
        )
    }

    fn request_approval(&self, call_id: String, arguments: Value) -> BoxedOutcomeFuture {
        let input: ApprovalInput = match serde_json::from_value(arguments) {
            Ok(input) => input,
            Err(err) => {
                let error = Error::invalid_input().with_reason(err.to_string());
                return Box::pin(ready(ToolOutcome::from_result(call_id, Err(error))));
            }
        };
        let request = ApprovalRequest::new(
            self.id(),
            input.decision,
            input.rationale,
            input.risk_level,
        );
        info!(policy = ?self.inner.approval, %request, "approval requested");

        let policy = self.inner.approval.clone();
        Box::pin(async move {
            let payload = policy.resolve(request).await;
            ToolOutcome::success(call_id, payload)
        })
    }
}
