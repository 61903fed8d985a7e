use std::collections::HashMap;
use std::sync::Arc;

use autoteam_anthropic_model::AnthropicProvider;
use autoteam_core::tool::{ApprovalPolicy, ApprovalRequest, ToolRegistry};
use autoteam_core::{
    Agent, AgentBuilder, AgentEvent, AgentRole, BudgetGate, BudgetPolicy,
    DEFAULT_SPECIALIST_MAX_ITERATIONS, ModelClient, RunResult, TaskContext,
};
use autoteam_cost::{BudgetManager, ModelRouter, PromptCachePlanner};
use autoteam_model::{ModelProvider, ModelSettings};
use serde::Serialize;

use crate::prompts::{PromptError, PromptLoader};
use crate::settings::Settings;
use crate::tools::{self, ContextStore, SearchBackend};

/// Iterations granted to a run started through [`Team::run`] when the
/// caller has no preference.
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Ids of every agent of the team, manager first.
pub(crate) const AGENT_IDS: [&str; 6] = [
    "manager",
    "analyst",
    "growth_hacker",
    "sales_machine",
    "system_builder",
    "brand_builder",
];

struct AgentProfile {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    specialty: Option<&'static str>,
    /// What the manager reads when choosing a specialist.
    delegation: &'static str,
    capabilities: &'static [&'static str],
}

const MANAGER: AgentProfile = AgentProfile {
    id: "manager",
    name: "Manager Agent",
    description: "Orchestrates specialist agents and routes tasks intelligently",
    specialty: None,
    delegation: "",
    capabilities: &[
        "Task routing",
        "Multi-agent coordination",
        "Quality validation",
        "Human approval workflows",
    ],
};

const SPECIALISTS: [AgentProfile; 5] = [
    AgentProfile {
        id: "analyst",
        name: "Analyst Agent",
        description: "Market research, competitive analysis, opportunity identification",
        specialty: Some("market_research_and_analysis"),
        delegation: "Call the Analyst Agent for market research, competitive analysis, and opportunity identification. Use this when you need data-driven insights, market sizing, competitor intelligence, or to identify growth opportunities.",
        capabilities: &[
            "Market research",
            "Competitive analysis",
            "Opportunity identification",
            "Data-driven insights",
        ],
    },
    AgentProfile {
        id: "growth_hacker",
        name: "Growth Hacker Agent",
        description: "Customer acquisition strategies, growth experiments, scaling tactics",
        specialty: Some("customer_acquisition_and_growth"),
        delegation: "Call the Growth Hacker Agent for customer acquisition strategies, growth experiments, and scaling tactics. Use this when you need growth strategies, experiment designs, viral mechanics, or rapid scaling plans.",
        capabilities: &[
            "Growth strategy design",
            "Experiment frameworks",
            "Viral loop mechanics",
            "Metrics tracking",
        ],
    },
    AgentProfile {
        id: "sales_machine",
        name: "Sales Machine Agent",
        description: "Sales copy, conversion optimization, offer design",
        specialty: Some("sales_copy_and_conversion"),
        delegation: "Call the Sales Machine Agent for sales copy, conversion optimization, and offer design. Use this when you need landing pages, email sequences, objection handling, or persuasive sales assets.",
        capabilities: &[
            "Sales copywriting",
            "Offer design",
            "Email sequences",
            "Objection handling",
        ],
    },
    AgentProfile {
        id: "system_builder",
        name: "System Builder Agent",
        description: "Process documentation, automation workflows, scaling plans",
        specialty: Some("process_automation_and_scaling"),
        delegation: "Call the System Builder Agent for process documentation, automation workflows, and scaling playbooks. Use this when you need SOPs, process maps, automation designs, or operational systems.",
        capabilities: &[
            "Process mapping",
            "Automation design",
            "SOP creation",
            "Scaling playbooks",
        ],
    },
    AgentProfile {
        id: "brand_builder",
        name: "Brand Builder Agent",
        description: "Content creation, authority building, audience engagement",
        specialty: Some("content_and_authority_building"),
        delegation: "Call the Brand Builder Agent for content creation, thought leadership, and audience engagement. Use this when you need blog posts, social content, SEO strategy, or authority-building content.",
        capabilities: &[
            "Content strategy",
            "SEO optimization",
            "Social media content",
            "Thought leadership",
        ],
    },
];

/// Public facts about an agent of the team.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AgentDescriptor {
    /// Id used to route tasks to the agent.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// One line summary.
    pub description: &'static str,
    /// Domain of a specialist, `None` for the manager.
    pub specialty: Option<&'static str>,
    /// What the agent is good at.
    pub capabilities: &'static [&'static str],
    /// Tools offered to the agent's model.
    pub tools: Vec<String>,
}

/// Errors raised by [`Team`] and [`TeamBuilder`].
#[derive(Debug, thiserror::Error)]
pub enum TeamError {
    /// No agent has the requested id.
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),
    /// A system prompt couldn't be loaded.
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

type EventHandler = Arc<dyn Fn(AgentEvent) + Send + Sync>;

/// [`Team`] builder.
pub struct TeamBuilder {
    client: ModelClient,
    clients: HashMap<String, ModelClient>,
    model_settings: ModelSettings,
    router: Option<Arc<ModelRouter>>,
    budget: Option<BudgetGate>,
    cache: Option<Arc<PromptCachePlanner>>,
    prompts: PromptLoader,
    tools: Option<Arc<ToolRegistry>>,
    context: ContextStore,
    approval: ApprovalPolicy,
    specialist_max_iterations: usize,
    on_event: Option<EventHandler>,
}

impl TeamBuilder {
    /// Creates a new builder whose agents all use the given provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(provider: P) -> Self {
        Self::with_model_client(ModelClient::new(provider))
    }

    /// Creates a new builder whose agents all share the given client.
    pub fn with_model_client(client: ModelClient) -> Self {
        Self {
            client,
            clients: HashMap::new(),
            model_settings: ModelSettings::new("claude-sonnet-4-5", 0.7, 4096),
            router: None,
            budget: Some(BudgetGate::new(
                Arc::new(BudgetManager::default()),
                BudgetPolicy::default(),
            )),
            cache: Some(Arc::new(PromptCachePlanner::default())),
            prompts: PromptLoader::new(),
            tools: None,
            context: ContextStore::default(),
            approval: ApprovalPolicy::default(),
            specialist_max_iterations: DEFAULT_SPECIALIST_MAX_ITERATIONS,
            on_event: None,
        }
    }

    /// Creates a builder configured from settings: the Anthropic provider,
    /// the budget, routing, caching, prompt directory, search keys and
    /// approval mode.
    pub fn from_settings(settings: &Settings) -> Self {
        let client = ModelClient::new(AnthropicProvider::new(settings.anthropic_config()))
            .with_retry_policy(settings.retry_policy());
        let mut builder = Self::with_model_client(client)
            .with_model_settings(settings.model_settings())
            .with_budget(
                Arc::new(BudgetManager::new(settings.max_cost_per_day())),
                settings.budget_policy(),
            );
        if settings.model_routing() {
            builder = builder.with_router(Arc::new(ModelRouter::default()));
        }
        if !settings.prompt_caching() {
            builder = builder.with_cache_planner(Arc::new(PromptCachePlanner::disabled()));
        }
        if let Some(dir) = settings.prompts_dir() {
            builder = builder.with_prompt_loader(PromptLoader::with_dir(dir));
        }
        let backend =
            SearchBackend::from_keys(settings.brave_api_key(), settings.serpapi_key());
        let registry = tools::default_registry(backend, builder.context.clone());
        builder = builder.with_tools(Arc::new(registry));
        if settings.is_development() {
            builder = builder.with_approval_policy(ApprovalPolicy::AutoApprove);
        }
        builder
    }

    /// Uses a different provider for one agent.
    pub fn with_model_for<S, P>(mut self, agent_id: S, provider: P) -> Self
    where
        S: Into<String>,
        P: ModelProvider + 'static,
    {
        self.clients
            .insert(agent_id.into(), ModelClient::new(provider));
        self
    }

    /// Uses the same model settings for every run.
    #[inline]
    pub fn with_model_settings(mut self, settings: ModelSettings) -> Self {
        self.model_settings = settings;
        self
    }

    /// Routes the model settings of every run from its task. Takes
    /// precedence over the fixed settings.
    #[inline]
    pub fn with_router(mut self, router: Arc<ModelRouter>) -> Self {
        self.router = Some(router);
        self
    }

    /// Replaces the shared budget manager.
    #[inline]
    pub fn with_budget(mut self, manager: Arc<BudgetManager>, policy: BudgetPolicy) -> Self {
        self.budget = Some(BudgetGate::new(manager, policy));
        self
    }

    /// Replaces the shared cache planner.
    #[inline]
    pub fn with_cache_planner(mut self, planner: Arc<PromptCachePlanner>) -> Self {
        self.cache = Some(planner);
        self
    }

    /// Replaces the prompt loader.
    #[inline]
    pub fn with_prompt_loader(mut self, loader: PromptLoader) -> Self {
        self.prompts = loader;
        self
    }

    /// Replaces the generic tools. Defaults to [`tools::default_registry`]
    /// without a search backend.
    #[inline]
    pub fn with_tools(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.tools = Some(registry);
        self
    }

    /// Sets what happens when the manager asks for approval.
    #[inline]
    pub fn with_approval_policy(mut self, policy: ApprovalPolicy) -> Self {
        self.approval = policy;
        self
    }

    /// Hands approval requests to `handler`. Keeps auto approval when the
    /// builder was configured for development.
    pub fn with_approval_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(ApprovalRequest) + Send + Sync + 'static,
    {
        if matches!(self.approval, ApprovalPolicy::AutoApprove) {
            debug!("approvals are automatic, handler not installed");
        } else {
            self.approval = ApprovalPolicy::interactive(handler);
        }
        self
    }

    /// Sets the iterations the manager grants each delegated task.
    #[inline]
    pub fn with_specialist_max_iterations(mut self, max_iterations: usize) -> Self {
        self.specialist_max_iterations = max_iterations;
        self
    }

    /// Attaches a callback invoked on the events of every agent.
    #[inline]
    pub fn on_event(
        mut self,
        on_event: impl Fn(AgentEvent) + Send + Sync + 'static,
    ) -> Self {
        self.on_event = Some(Arc::new(on_event));
        self
    }

    fn agent_builder(
        &self,
        profile: &AgentProfile,
        registry: &Arc<ToolRegistry>,
    ) -> Result<AgentBuilder, TeamError> {
        let client = self.clients.get(profile.id).unwrap_or(&self.client).clone();
        let prompt = self.prompts.load(profile.id)?;
        let mut builder = AgentBuilder::with_model_client(client)
            .with_id(profile.id)
            .with_name(profile.name)
            .with_description(profile.delegation)
            .with_system_prompt(&*prompt)
            .with_tools(Arc::clone(registry));
        builder = match &self.router {
            Some(router) => builder.with_router(Arc::clone(router)),
            None => builder.with_model_settings(self.model_settings.clone()),
        };
        if let Some(gate) = &self.budget {
            builder = builder.with_budget(gate.clone());
        }
        if let Some(planner) = &self.cache {
            builder = builder.with_cache_planner(Arc::clone(planner));
        }
        if let Some(on_event) = &self.on_event {
            let on_event = Arc::clone(on_event);
            builder = builder.on_event(move |event| on_event(event));
        }
        Ok(builder)
    }

    /// Builds the team.
    pub fn build(self) -> Result<Team, TeamError> {
        let registry = match &self.tools {
            Some(registry) => Arc::clone(registry),
            None => Arc::new(tools::default_registry(None, self.context.clone())),
        };

        let mut specialists = Vec::with_capacity(SPECIALISTS.len());
        for profile in &SPECIALISTS {
            let specialty = profile.specialty.unwrap_or_default();
            let agent = self
                .agent_builder(profile, &registry)?
                .specialist(specialty)
                .build();
            specialists.push(agent);
        }

        let mut manager = self
            .agent_builder(&MANAGER, &registry)?
            .manager()
            .with_specialist_max_iterations(self.specialist_max_iterations)
            .with_approval_policy(self.approval.clone());
        for agent in &specialists {
            manager = manager.with_specialist(agent.clone());
        }
        let manager = manager.build();
        info!(agents = specialists.len() + 1, "team assembled");

        Ok(Team {
            manager,
            specialists,
            budget: self.budget.map(|gate| Arc::clone(gate.manager())),
            cache: self.cache,
            context: self.context,
            prompts: self.prompts,
        })
    }
}

/// A manager and its five specialists, sharing tools, budget and cache.
pub struct Team {
    manager: Agent,
    specialists: Vec<Agent>,
    budget: Option<Arc<BudgetManager>>,
    cache: Option<Arc<PromptCachePlanner>>,
    context: ContextStore,
    prompts: PromptLoader,
}

impl Team {
    /// Runs a task.
    ///
    /// The task goes to the named agent, or to the manager when `agent`
    /// is `None`.
    pub async fn run(
        &self,
        task: &str,
        context: Option<&TaskContext>,
        agent: Option<&str>,
        max_iterations: usize,
    ) -> Result<RunResult, TeamError> {
        let agent = match agent {
            Some(id) => self
                .agent(id)
                .ok_or_else(|| TeamError::UnknownAgent(id.to_owned()))?,
            None => &self.manager,
        };
        Ok(agent.run(task, context, max_iterations).await)
    }

    /// Returns the manager.
    #[inline]
    pub fn manager(&self) -> &Agent {
        &self.manager
    }

    /// Returns the agent with the given id.
    pub fn agent(&self, id: &str) -> Option<&Agent> {
        if id == self.manager.id() {
            return Some(&self.manager);
        }
        self.specialists.iter().find(|agent| agent.id() == id)
    }

    /// Describes every agent, manager first.
    pub fn agents(&self) -> Vec<AgentDescriptor> {
        std::iter::once((&MANAGER, &self.manager))
            .chain(SPECIALISTS.iter().zip(&self.specialists))
            .map(|(profile, agent)| AgentDescriptor {
                id: profile.id,
                name: profile.name,
                description: profile.description,
                specialty: match agent.role() {
                    AgentRole::Manager => None,
                    AgentRole::Specialist { .. } => profile.specialty,
                },
                capabilities: profile.capabilities,
                tools: agent.tool_names(),
            })
            .collect()
    }

    /// Returns the shared budget manager.
    #[inline]
    pub fn budget(&self) -> Option<&Arc<BudgetManager>> {
        self.budget.as_ref()
    }

    /// Returns the shared cache planner.
    #[inline]
    pub fn cache_planner(&self) -> Option<&Arc<PromptCachePlanner>> {
        self.cache.as_ref()
    }

    /// Returns the context store written by `store_context`.
    ///
    /// Only meaningful when the team uses the default tools.
    #[inline]
    pub fn context(&self) -> &ContextStore {
        &self.context
    }

    /// Returns the prompt loader.
    #[inline]
    pub fn prompts(&self) -> &PromptLoader {
        &self.prompts
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Mutex;

    use autoteam_core::{AgentEventKind, RetryPolicy};
    use autoteam_model::{ModelMessage, ToolCallRequest};
    use autoteam_test_model::{PresetEvent, PresetResponse, TestModelProvider};
    use serde_json::{Value, json};

    use super::*;
    use crate::settings::SettingsBuilder;

    fn tool_call(id: &str, name: &str, arguments: Value) -> PresetEvent {
        PresetEvent::ToolCall(ToolCallRequest {
            id: id.to_owned(),
            name: name.to_owned(),
            arguments,
        })
    }

    fn scripted(responses: impl IntoIterator<Item = PresetResponse>) -> TestModelProvider {
        let mut provider = TestModelProvider::default();
        for response in responses {
            provider.add_exchange(response);
        }
        provider
    }

    #[test]
    fn test_agents() {
        let team = TeamBuilder::with_model_provider(TestModelProvider::default())
            .build()
            .unwrap();
        let agents = team.agents();
        let ids: Vec<_> = agents.iter().map(|agent| agent.id).collect();
        assert_eq!(ids, AGENT_IDS);

        let manager = &agents[0];
        assert_eq!(manager.name, "Manager Agent");
        assert_eq!(manager.specialty, None);
        assert_eq!(
            manager.tools,
            [
                "web_search",
                "extract_data_from_url",
                "store_context",
                "call_analyst_agent",
                "call_growth_hacker_agent",
                "call_sales_machine_agent",
                "call_system_builder_agent",
                "call_brand_builder_agent",
                "request_human_approval",
            ]
        );

        let analyst = &agents[1];
        assert_eq!(analyst.specialty, Some("market_research_and_analysis"));
        assert_eq!(analyst.capabilities.len(), 4);
        assert_eq!(
            analyst.tools,
            ["web_search", "extract_data_from_url", "store_context"]
        );
        assert!(team.agent("brand_builder").is_some());
        assert!(team.agent("ghost").is_none());
    }

    #[tokio::test]
    async fn test_unknown_agent() {
        let team = TeamBuilder::with_model_provider(TestModelProvider::default())
            .build()
            .unwrap();
        let err = team
            .run("hello", None, Some("ghost"), DEFAULT_MAX_ITERATIONS)
            .await
            .unwrap_err();
        assert!(matches!(err, TeamError::UnknownAgent(ref id) if id == "ghost"));
        assert_eq!(err.to_string(), "Unknown agent: ghost");
    }

    #[tokio::test]
    async fn test_run_specialist_directly() {
        let analyst = scripted([
            PresetResponse::with_events([tool_call(
                "call_1",
                "store_context",
                json!({ "key": "market_size", "value": "$60B", "category": "market_research" }),
            )])
            .with_usage(100, 20),
            PresetResponse::with_text("The CRM market is worth $60B.").with_usage(150, 30),
        ]);
        let team = TeamBuilder::with_model_provider(TestModelProvider::default())
            .with_model_for("analyst", analyst.clone())
            .build()
            .unwrap();

        let result = team
            .run("Size the CRM market", None, Some("analyst"), DEFAULT_MAX_ITERATIONS)
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.agent_id, "analyst");
        assert_eq!(result.result.as_deref(), Some("The CRM market is worth $60B."));
        assert_eq!(team.context().get("market_size").unwrap().value, "$60B");

        let requests = analyst.requests();
        assert!(
            requests[0]
                .system
                .as_deref()
                .is_some_and(|system| system.contains("# Identity"))
        );

        let usage = team.budget().unwrap().get_agent_usage("analyst");
        assert_eq!(usage.call_count, 2);
        assert_eq!(usage.total_tokens, 300);
    }

    #[tokio::test]
    async fn test_manager_delegates() {
        let manager = scripted([
            PresetResponse::with_events([
                tool_call(
                    "call_1",
                    "call_analyst_agent",
                    json!({ "task": "Size the market", "context": { "product": "CRM" } }),
                ),
                tool_call(
                    "call_2",
                    "request_human_approval",
                    json!({ "decision": "Spend $5,000 on ads", "rationale": "Fast feedback" }),
                ),
            ]),
            PresetResponse::with_text("Summary: go."),
        ]);
        let analyst = scripted([PresetResponse::with_text("$60B market.")]);

        let events = Arc::new(Mutex::new(vec![]));
        let team = TeamBuilder::with_model_provider(TestModelProvider::default())
            .with_model_for("manager", manager.clone())
            .with_model_for("analyst", analyst.clone())
            .with_approval_policy(ApprovalPolicy::AutoApprove)
            .on_event({
                let events = Arc::clone(&events);
                move |event: AgentEvent| events.lock().unwrap().push(event)
            })
            .build()
            .unwrap();

        let result = team
            .run("Plan our launch", None, None, DEFAULT_MAX_ITERATIONS)
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.agent_id, "manager");
        assert_eq!(result.result.as_deref(), Some("Summary: go."));

        let delegated = &analyst.requests()[0];
        let Some(ModelMessage::User(task)) = delegated.messages.first() else {
            panic!("expected the delegated task");
        };
        assert!(task.starts_with("Size the market"));
        assert!(task.contains("- **product**: CRM"));

        let requests = manager.requests();
        let Some(ModelMessage::ToolResults(results)) = requests[1].messages.last() else {
            panic!("expected tool results");
        };
        assert_eq!(results.len(), 2);
        assert!(results[0].content.contains("$60B market."));
        assert!(results[1].content.contains("Auto-approved in development mode"));

        let events = events.lock().unwrap();
        let started: Vec<_> = events
            .iter()
            .filter(|event| event.kind == AgentEventKind::RunStarted)
            .map(|event| event.agent_id.as_str())
            .collect();
        assert_eq!(started, ["manager", "analyst"]);
    }

    #[tokio::test]
    async fn test_model_failure_is_reported() {
        let manager = scripted([PresetResponse::with_text("never").with_failures(0)]);
        let client = ModelClient::new(manager).with_retry_policy(RetryPolicy::none());
        let team = TeamBuilder::with_model_client(client).build().unwrap();
        let result = team
            .run("Plan our launch", None, Some("manager"), DEFAULT_MAX_ITERATIONS)
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().starts_with("Model request failed"));
    }

    #[test]
    fn test_prompt_override() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("analyst.md"), "# Identity\nCustom analyst.").unwrap();
        fs::write(dir.path().join("manager.md"), "").unwrap();

        let err = TeamBuilder::with_model_provider(TestModelProvider::default())
            .with_prompt_loader(PromptLoader::with_dir(dir.path()))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, TeamError::Prompt(PromptError::Empty(_))));

        fs::remove_file(dir.path().join("manager.md")).unwrap();
        let team = TeamBuilder::with_model_provider(TestModelProvider::default())
            .with_prompt_loader(PromptLoader::with_dir(dir.path()))
            .build()
            .unwrap();
        assert_eq!(
            team.agent("analyst").unwrap().system_prompt(),
            "# Identity\nCustom analyst."
        );
    }

    #[test]
    fn test_from_settings() {
        let settings = SettingsBuilder::with_api_key("sk-test")
            .with_max_cost_per_day(12.5)
            .with_prompt_caching(false)
            .with_environment("production")
            .build();
        let team = TeamBuilder::from_settings(&settings).build().unwrap();
        assert_eq!(team.budget().unwrap().daily_budget(), 12.5);
        assert!(!team.cache_planner().unwrap().is_enabled());
        assert_eq!(team.agents().len(), 6);
    }

    async fn approval_payload(environment: &str) -> (Value, usize) {
        let manager = scripted([
            PresetResponse::with_events([tool_call(
                "call_1",
                "request_human_approval",
                json!({ "decision": "Launch the campaign", "rationale": "Ready" }),
            )]),
            PresetResponse::with_text("Launched."),
        ]);
        let settings = SettingsBuilder::with_api_key("sk-test")
            .with_environment(environment)
            .build();
        let handled = Arc::new(Mutex::new(0));
        let team = TeamBuilder::from_settings(&settings)
            .with_model_for("manager", manager.clone())
            .with_approval_handler({
                let handled = Arc::clone(&handled);
                move |request: ApprovalRequest| {
                    *handled.lock().unwrap() += 1;
                    request.approve();
                }
            })
            .build()
            .unwrap();

        let result = team
            .run("Launch", None, None, DEFAULT_MAX_ITERATIONS)
            .await
            .unwrap();
        assert!(result.success);

        let requests = manager.requests();
        let Some(ModelMessage::ToolResults(results)) = requests[1].messages.last() else {
            panic!("expected tool results");
        };
        let payload = serde_json::from_str(&results[0].content).unwrap();
        let handled = *handled.lock().unwrap();
        (payload, handled)
    }

    #[tokio::test]
    async fn test_approval_handler_respects_development_mode() {
        let (payload, handled) = approval_payload("development").await;
        assert_eq!(handled, 0);
        assert_eq!(payload["message"], json!("Auto-approved in development mode"));

        let (payload, handled) = approval_payload("production").await;
        assert_eq!(handled, 1);
        assert_eq!(payload["approved"], json!(true));
        assert_eq!(payload["message"], json!("Approved by reviewer"));
    }
}
