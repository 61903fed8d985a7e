mod builder;
mod dispatch;
mod run;

use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use autoteam_cost::{BudgetManager, ModelRouter, PromptCachePlanner};
use autoteam_model::{ModelProviderError, ModelSettings, TokenUsage};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::conversation::Conversation;
use crate::model_client::ModelClient;
use crate::tool::{ApprovalPolicy, ToolRegistry};
pub use builder::{AgentBuilder, DEFAULT_SPECIALIST_MAX_ITERATIONS};
pub use dispatch::{APPROVAL_TOOL_NAME, specialist_tool_name};
use dispatch::Toolset;

/// Extra key/value pairs rendered below a task. Keys keep their
/// insertion order.
pub type TaskContext = Map<String, Value>;

/// Renders the first user turn of a run: the task, followed by a bullet
/// per context entry when there is any context.
pub fn render_task(task: &str, context: Option<&TaskContext>) -> String {
    let Some(context) = context.filter(|context| !context.is_empty()) else {
        return task.to_owned();
    };
    let mut rendered = format!("{task}\n\n**Additional Context:**\n");
    for (key, value) in context {
        let value = match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        rendered.push_str(&format!("- **{key}**: {value}\n"));
    }
    rendered
}

/// The two kinds of agents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AgentRole {
    /// Works on one domain with the generic tools.
    Specialist {
        /// Free text label of the domain.
        specialty: String,
    },
    /// Delegates to specialists and may ask for human approval.
    Manager,
}

/// How an agent picks its model settings.
#[derive(Clone, Debug)]
pub enum ModelSelection {
    /// The same settings for every run.
    Fixed(ModelSettings),
    /// Settings routed from the task at the start of every run.
    Routed(Arc<ModelRouter>),
}

/// Whether a denied budget check stops a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BudgetPolicy {
    /// Log the denial and make the call anyway.
    #[default]
    Advisory,
    /// Fail the run instead of making the call.
    Enforce,
}

/// A budget manager attached to an agent.
///
/// Every model call is checked before it's made and recorded after it
/// returns.
#[derive(Clone)]
pub struct BudgetGate {
    manager: Arc<BudgetManager>,
    policy: BudgetPolicy,
}

impl BudgetGate {
    /// Creates a gate.
    #[inline]
    pub fn new(manager: Arc<BudgetManager>, policy: BudgetPolicy) -> Self {
        Self { manager, policy }
    }

    /// Returns the budget manager.
    #[inline]
    pub fn manager(&self) -> &Arc<BudgetManager> {
        &self.manager
    }

    /// Returns the policy.
    #[inline]
    pub fn policy(&self) -> BudgetPolicy {
        self.policy
    }
}

impl Debug for BudgetGate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("BudgetGate")
            .field("daily_budget", &self.manager.daily_budget())
            .field("policy", &self.policy)
            .finish()
    }
}

/// Why a run failed.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The loop used every iteration without finishing.
    #[error("Max iterations reached")]
    MaxIterations,
    /// The model stopped for a reason other than finishing or calling
    /// tools.
    #[error("Max iterations reached: unexpected stop reason '{0}'")]
    UnexpectedStop(String),
    /// The model call failed.
    #[error("Model request failed: {0}")]
    Model(Box<dyn ModelProviderError>),
    /// The budget manager refused the call.
    #[error("Budget check failed: {0}")]
    BudgetDenied(String),
}

/// The terminal record of a run.
///
/// Exactly one of `result` and `error` is present.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunResult {
    /// Whether the run finished with an answer.
    pub success: bool,
    /// The agent that ran.
    pub agent_id: String,
    /// The answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// What went wrong.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Model calls made.
    pub iterations: usize,
    /// Wall clock time of the run.
    pub elapsed_seconds: f64,
    /// Tokens used by every model call of the run.
    pub usage: TokenUsage,
}

/// Something happened while an agent was running.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentEvent {
    /// The agent the event is about.
    pub agent_id: String,
    /// What happened.
    pub kind: AgentEventKind,
}

/// The kinds of [`AgentEvent`].
#[derive(Clone, Debug, PartialEq)]
pub enum AgentEventKind {
    /// A run started.
    RunStarted,
    /// A model call is about to be made.
    Thinking {
        /// One-based iteration.
        iteration: usize,
    },
    /// The model produced text.
    TextDelta(String),
    /// A tool is about to run.
    ToolStarted {
        /// Tool name.
        name: String,
    },
    /// A tool finished.
    ToolFinished {
        /// Tool name.
        name: String,
        /// Whether it succeeded.
        success: bool,
    },
    /// The run finished.
    RunFinished {
        /// Whether it succeeded.
        success: bool,
    },
}

type EventHandler = Arc<dyn Fn(AgentEvent) + Send + Sync>;

/// Something a manager can delegate a task to.
///
/// [`Agent`] is the canonical implementation.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    /// The id tools refer to this runner by.
    fn agent_id(&self) -> &str;

    /// Tells a manager when to delegate to this runner.
    fn description(&self) -> &str;

    /// Runs a task to completion. Never fails, see [`RunResult`].
    async fn run_task(
        &self,
        task: String,
        context: Option<TaskContext>,
        max_iterations: usize,
    ) -> RunResult;
}

pub(crate) struct AgentInner {
    id: String,
    name: String,
    description: String,
    role: AgentRole,
    system_prompt: String,
    model: ModelSelection,
    client: ModelClient,
    registry: Arc<ToolRegistry>,
    toolset: Toolset,
    specialists: HashMap<String, Arc<dyn TaskRunner>>,
    specialist_max_iterations: usize,
    approval: ApprovalPolicy,
    budget: Option<BudgetGate>,
    cache: Option<Arc<PromptCachePlanner>>,
    on_event: Option<EventHandler>,
    history: Mutex<Conversation>,
}

/// An agent: an identity, a model, a tool set and the loop that runs a
/// task to completion.
///
/// Agents are reusable and can run several tasks concurrently. Cloning is
/// cheap and clones share the diagnostic history.
#[derive(Clone)]
pub struct Agent {
    inner: Arc<AgentInner>,
}

impl Agent {
    /// Returns the agent id.
    #[inline]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Returns the display name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the role.
    #[inline]
    pub fn role(&self) -> &AgentRole {
        &self.inner.role
    }

    /// Returns the system prompt.
    #[inline]
    pub fn system_prompt(&self) -> &str {
        &self.inner.system_prompt
    }

    /// Returns the names of the tools offered to the model, in order.
    pub fn tool_names(&self) -> Vec<String> {
        self.inner.toolset.names()
    }

    fn lock_history(&self) -> MutexGuard<'_, Conversation> {
        self.inner
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a copy of every turn of every finished run.
    ///
    /// The history is only kept for diagnostics. Runs never read it.
    pub fn conversation_history(&self) -> Conversation {
        self.lock_history().clone()
    }

    /// Clears the diagnostic history.
    pub fn reset_conversation(&self) {
        self.lock_history().clear();
        debug!(agent_id = %self.id(), "conversation reset");
    }

    fn emit(&self, kind: AgentEventKind) {
        if let Some(on_event) = &self.inner.on_event {
            on_event(AgentEvent {
                agent_id: self.inner.id.clone(),
                kind,
            });
        }
    }
}

impl Debug for Agent {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.inner.id)
            .field("role", &self.inner.role)
            .field("model", &self.inner.model)
            .field("tools", &self.inner.toolset.names())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TaskRunner for Agent {
    #[inline]
    fn agent_id(&self) -> &str {
        self.id()
    }

    #[inline]
    fn description(&self) -> &str {
        &self.inner.description
    }

    async fn run_task(
        &self,
        task: String,
        context: Option<TaskContext>,
        max_iterations: usize,
    ) -> RunResult {
        self.run(&task, context.as_ref(), max_iterations).await
    }
}
