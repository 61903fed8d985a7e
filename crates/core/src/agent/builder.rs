use std::sync::{Arc, Mutex};

use autoteam_cost::{ModelRouter, PromptCachePlanner};
use autoteam_model::{ModelProvider, ModelSettings};

use super::dispatch::{SpecialistSlot, Toolset};
use super::{
    Agent, AgentEvent, AgentInner, AgentRole, BudgetGate, EventHandler,
    ModelSelection, TaskRunner,
};
use crate::model_client::ModelClient;
use crate::tool::{ApprovalPolicy, ToolRegistry};

/// Iterations a manager grants each delegated task.
pub const DEFAULT_SPECIALIST_MAX_ITERATIONS: usize = 10;

/// [`Agent`] builder.
pub struct AgentBuilder {
    id: String,
    name: Option<String>,
    description: String,
    role: AgentRole,
    system_prompt: String,
    model: ModelSelection,
    client: ModelClient,
    registry: Arc<ToolRegistry>,
    specialists: Vec<SpecialistSlot>,
    specialist_max_iterations: usize,
    approval: ApprovalPolicy,
    budget: Option<BudgetGate>,
    cache: Option<Arc<PromptCachePlanner>>,
    on_event: Option<EventHandler>,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(provider: P) -> Self {
        Self::with_model_client(ModelClient::new(provider))
    }

    /// Creates a new builder sharing an existing client.
    pub fn with_model_client(client: ModelClient) -> Self {
        Self {
            id: "agent".to_owned(),
            name: None,
            description: String::new(),
            role: AgentRole::Specialist {
                specialty: String::new(),
            },
            system_prompt: String::new(),
            model: ModelSelection::Fixed(ModelSettings::new(
                "claude-sonnet-4-5",
                0.7,
                4096,
            )),
            client,
            registry: Default::default(),
            specialists: vec![],
            specialist_max_iterations: DEFAULT_SPECIALIST_MAX_ITERATIONS,
            approval: ApprovalPolicy::default(),
            budget: None,
            cache: None,
            on_event: None,
        }
    }

    /// Sets the agent id.
    #[inline]
    pub fn with_id<S: Into<String>>(mut self, id: S) -> Self {
        self.id = id.into();
        self
    }

    /// Sets the display name. Defaults to the id.
    #[inline]
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the text a manager sees when deciding whether to delegate to
    /// this agent.
    #[inline]
    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    /// Makes the agent a specialist of the given domain.
    #[inline]
    pub fn specialist<S: Into<String>>(mut self, specialty: S) -> Self {
        self.role = AgentRole::Specialist {
            specialty: specialty.into(),
        };
        self
    }

    /// Makes the agent a manager.
    #[inline]
    pub fn manager(mut self) -> Self {
        self.role = AgentRole::Manager;
        self
    }

    /// Sets the system prompt.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Uses the same model settings for every run.
    #[inline]
    pub fn with_model_settings(mut self, settings: ModelSettings) -> Self {
        self.model = ModelSelection::Fixed(settings);
        self
    }

    /// Routes the model settings from the task of every run.
    #[inline]
    pub fn with_router(mut self, router: Arc<ModelRouter>) -> Self {
        self.model = ModelSelection::Routed(router);
        self
    }

    /// Sets the generic tools.
    #[inline]
    pub fn with_tools(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Adds a specialist a manager can delegate to.
    #[inline]
    pub fn with_specialist<R: TaskRunner + 'static>(self, runner: R) -> Self {
        self.with_specialist_runner(Arc::new(runner))
    }

    /// Adds a shared specialist a manager can delegate to.
    pub fn with_specialist_runner(mut self, runner: Arc<dyn TaskRunner>) -> Self {
        self.specialists.push(SpecialistSlot {
            id: runner.agent_id().to_owned(),
            description: runner.description().to_owned(),
            runner: Some(runner),
        });
        self
    }

    /// Offers a delegation tool for a specialist that has no agent behind
    /// it. Calls fail with an unknown specialist error.
    pub fn declare_specialist<S1, S2>(mut self, id: S1, description: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        self.specialists.push(SpecialistSlot {
            id: id.into(),
            description: description.into(),
            runner: None,
        });
        self
    }

    /// Sets the iterations granted to each delegated task.
    #[inline]
    pub fn with_specialist_max_iterations(mut self, max_iterations: usize) -> Self {
        self.specialist_max_iterations = max_iterations;
        self
    }

    /// Sets what happens when the manager asks for approval.
    #[inline]
    pub fn with_approval_policy(mut self, policy: ApprovalPolicy) -> Self {
        self.approval = policy;
        self
    }

    /// Checks and records every model call against a budget.
    #[inline]
    pub fn with_budget(mut self, gate: BudgetGate) -> Self {
        self.budget = Some(gate);
        self
    }

    /// Annotates requests with cache hints and records cache statistics.
    #[inline]
    pub fn with_cache_planner(mut self, planner: Arc<PromptCachePlanner>) -> Self {
        self.cache = Some(planner);
        self
    }

    /// Attaches a callback to be invoked on agent events.
    #[inline]
    pub fn on_event(
        mut self,
        on_event: impl Fn(AgentEvent) + Send + Sync + 'static,
    ) -> Self {
        self.on_event = Some(Arc::new(on_event));
        self
    }

    /// Builds the agent.
    pub fn build(self) -> Agent {
        let Self {
            id,
            name,
            description,
            role,
            system_prompt,
            model,
            client,
            registry,
            specialists,
            specialist_max_iterations,
            approval,
            budget,
            cache,
            on_event,
        } = self;

        if role != AgentRole::Manager && !specialists.is_empty() {
            warn!(agent_id = %id, "specialists are ignored by non-manager agents");
        }
        let (toolset, specialists) = Toolset::resolve(&registry, &role, specialists);

        let inner = AgentInner {
            name: name.unwrap_or_else(|| id.clone()),
            id,
            description,
            role,
            system_prompt,
            model,
            client,
            registry,
            toolset,
            specialists,
            specialist_max_iterations,
            approval,
            budget,
            cache,
            on_event,
            history: Mutex::default(),
        };
        Agent {
            inner: Arc::new(inner),
        }
    }
}
