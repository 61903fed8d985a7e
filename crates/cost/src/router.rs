use serde::Serialize;

use crate::pricing::{ModelTier, Price, TierProfile};

/// How demanding a task is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskComplexity {
    /// Classification, extraction, summarization and the like.
    Simple,
    /// Analysis, generation, reasoning.
    Medium,
    /// Multi-step reasoning and creative work.
    Complex,
}

const SIMPLE_INDICATORS: &[&str] = &[
    "classify",
    "extract",
    "summarize",
    "validate",
    "format",
    "parse",
    "check if",
    "is this",
    "yes or no",
    "list the",
    "count the",
];

const COMPLEX_INDICATORS: &[&str] = &[
    "analyze and recommend",
    "create a strategy",
    "design a",
    "write copy",
    "generate content",
    "plan a",
    "come up with",
    "brainstorm",
    "multiple steps",
    "comprehensive",
];

/// Agents whose work is always creative or strategic.
pub const DEFAULT_COMPLEX_AGENTS: &[&str] =
    &["sales_machine", "brand_builder", "growth_hacker"];

struct Rule {
    tier: ModelTier,
    max_tokens: u32,
    temperature: f32,
    use_cases: &'static [&'static str],
}

impl TaskComplexity {
    fn rule(self) -> Rule {
        match self {
            Self::Simple => Rule {
                tier: ModelTier::Cheap,
                max_tokens: 2048,
                temperature: 0.3,
                use_cases: &[
                    "classification",
                    "extraction",
                    "summarization",
                    "validation",
                    "formatting",
                    "routing",
                ],
            },
            Self::Medium => Rule {
                tier: ModelTier::Balanced,
                max_tokens: 4096,
                temperature: 0.7,
                use_cases: &[
                    "analysis",
                    "generation",
                    "reasoning",
                    "planning",
                    "research",
                ],
            },
            // Complex work stays on the balanced tier for cost reasons.
            Self::Complex => Rule {
                tier: ModelTier::Balanced,
                max_tokens: 8192,
                temperature: 0.8,
                use_cases: &[
                    "multi_step_reasoning",
                    "creative_work",
                    "complex_analysis",
                    "strategic_planning",
                    "orchestration",
                ],
            },
        }
    }
}

/// The outcome of routing a task.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Route {
    /// Model identifier.
    pub model: String,
    /// Output token limit.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Price of the chosen model.
    pub pricing: Price,
    /// The tier the model belongs to.
    pub tier: ModelTier,
    /// The complexity the decision was based on.
    pub complexity: TaskComplexity,
}

/// Pricing facts of one tier, as reported by [`ModelRouter::pricing_info`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TierInfo {
    /// The tier.
    pub tier: ModelTier,
    /// Model, price and limits.
    #[serde(flatten)]
    pub profile: TierProfile,
    /// What the tier is typically used for.
    pub use_cases: &'static [&'static str],
}

/// Maps tasks to model tiers with fixed rules.
///
/// Routing is a pure function of its inputs: the router holds no mutable
/// state, so the same task and agent always get the same route.
#[derive(Clone, Debug)]
pub struct ModelRouter {
    complex_agents: Vec<String>,
}

impl Default for ModelRouter {
    fn default() -> Self {
        Self {
            complex_agents: DEFAULT_COMPLEX_AGENTS
                .iter()
                .map(|id| (*id).to_owned())
                .collect(),
        }
    }
}

impl ModelRouter {
    /// Replaces the agents that are always routed as complex.
    pub fn with_complex_agents<I, S>(mut self, agents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.complex_agents = agents.into_iter().map(Into::into).collect();
        self
    }

    /// Routes a task to a model.
    ///
    /// An explicit complexity skips detection.
    pub fn route_task(
        &self,
        task: &str,
        agent_id: &str,
        explicit_complexity: Option<TaskComplexity>,
    ) -> Route {
        let complexity = explicit_complexity
            .unwrap_or_else(|| self.detect_complexity(task, agent_id));
        let rule = complexity.rule();
        let profile = rule.tier.profile();

        debug!(
            agent_id,
            ?complexity,
            model = profile.model_id,
            estimated_savings = self.estimated_savings(complexity),
            "task routed"
        );

        Route {
            model: profile.model_id.to_owned(),
            max_tokens: rule.max_tokens,
            temperature: rule.temperature,
            pricing: profile.price,
            tier: rule.tier,
            complexity,
        }
    }

    /// Infers the complexity of a task.
    ///
    /// Forced agents are complex. Otherwise the lowercased task is matched
    /// against the simple indicators first, then the complex ones, and
    /// anything else is medium.
    pub fn detect_complexity(&self, task: &str, agent_id: &str) -> TaskComplexity {
        if self.complex_agents.iter().any(|id| id == agent_id) {
            return TaskComplexity::Complex;
        }

        let task = task.to_lowercase();
        let matches =
            |indicators: &[&str]| indicators.iter().any(|it| task.contains(it));
        if matches(SIMPLE_INDICATORS) {
            TaskComplexity::Simple
        } else if matches(COMPLEX_INDICATORS) {
            TaskComplexity::Complex
        } else {
            TaskComplexity::Medium
        }
    }

    /// Percentage saved against always using the balanced tier, rounded
    /// to one decimal.
    pub fn estimated_savings(&self, complexity: TaskComplexity) -> f64 {
        let savings = complexity.rule().tier.savings_vs_balanced();
        (savings * 10.0).round() / 10.0
    }

    /// Recommends a model for an agent doing a kind of task.
    ///
    /// Unknown agents and task types get the balanced tier.
    pub fn model_for_agent(&self, agent_id: &str, task_type: &str) -> &'static str {
        use ModelTier::*;

        let tier = match (agent_id, task_type) {
            ("manager", "routing") => Cheap,
            ("manager", "orchestration") => Balanced,
            ("analyst", "research") => Balanced,
            ("analyst", "summarization") => Cheap,
            ("system_builder", "documentation") => Balanced,
            ("system_builder", "validation") => Cheap,
            _ => Balanced,
        };
        tier.model_id()
    }

    /// Estimates the cost of a call on a tier in USD.
    #[inline]
    pub fn estimate_cost(
        &self,
        input_tokens: u64,
        output_tokens: u64,
        tier: ModelTier,
    ) -> f64 {
        tier.profile().price.cost(input_tokens, output_tokens)
    }

    /// Lists every tier with its price and limits.
    pub fn pricing_info(&self) -> Vec<TierInfo> {
        ModelTier::ALL
            .iter()
            .map(|&tier| {
                let use_cases = match tier {
                    ModelTier::Cheap => TaskComplexity::Simple.rule().use_cases,
                    _ => TaskComplexity::Complex.rule().use_cases,
                };
                TierInfo {
                    tier,
                    profile: *tier.profile(),
                    use_cases,
                }
            })
            .collect()
    }
}
