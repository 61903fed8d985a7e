use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::pricing::PriceTable;
use crate::tokens::TokenEstimator;

/// Daily ceiling used when none is configured, in USD.
pub const DEFAULT_DAILY_BUDGET: f64 = 50.0;

/// Share of the budget after which a warning is raised.
const WARNING_THRESHOLD_PERCENTAGE: f64 = 80.0;
/// Average tokens per call above which an agent is flagged.
const HIGH_TOKENS_PER_CALL: f64 = 5000.0;
/// Share of the budget after which daily spend is flagged.
const HIGH_DAILY_SPEND_PERCENTAGE: f64 = 50.0;

/// One recorded model call.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UsageRecord {
    /// The agent that made the call.
    pub agent_id: String,
    /// Input tokens.
    pub input_tokens: u64,
    /// Output tokens.
    pub output_tokens: u64,
    /// The model that served the call.
    pub model: String,
    /// When the call was recorded.
    pub timestamp: DateTime<Utc>,
    /// Cost of the call in USD.
    pub cost_usd: f64,
}

impl UsageRecord {
    /// Total tokens of the call.
    #[inline]
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Usage aggregated over one UTC day.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DailyUsage {
    /// The day.
    pub date: NaiveDate,
    /// Input plus output tokens.
    pub total_tokens: u64,
    /// Input tokens.
    pub input_tokens: u64,
    /// Output tokens.
    pub output_tokens: u64,
    /// Spend in USD.
    pub total_cost_usd: f64,
    /// Number of recorded calls.
    pub call_count: usize,
    /// Budget left in USD. Negative once overspent.
    pub budget_remaining_usd: f64,
    /// Spend as a percentage of the budget.
    pub budget_used_percentage: f64,
}

/// Usage aggregated over the lifetime of one agent.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AgentUsage {
    /// The agent.
    pub agent_id: String,
    /// Input plus output tokens.
    pub total_tokens: u64,
    /// Input tokens.
    pub input_tokens: u64,
    /// Output tokens.
    pub output_tokens: u64,
    /// Spend in USD.
    pub total_cost_usd: f64,
    /// Number of recorded calls.
    pub call_count: usize,
    /// Average tokens per call, zero without calls.
    pub avg_tokens_per_call: f64,
}

/// Where today's spend stands against the budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    /// Below the warning threshold.
    Available,
    /// At or above the warning threshold, still below the ceiling.
    Warning,
    /// At or above the ceiling.
    Exhausted,
}

/// The answer to a pre-call admission query.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Admission {
    /// Whether the call should go ahead.
    pub allowed: bool,
    /// Human readable explanation.
    pub reason: String,
}

/// What a cost suggestion is about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    /// An agent uses many tokens per call.
    HighTokensPerCall,
    /// Today's spend is past half the budget.
    HighDailySpend,
}

/// A hint on how to reduce spend.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Suggestion {
    /// The agent concerned, or `system` for team-wide issues.
    pub agent: String,
    /// The issue found.
    pub issue: SuggestionKind,
    /// What to do about it.
    pub recommendation: &'static str,
    /// The measured value: average tokens per call, or percentage of the
    /// budget used.
    pub value: f64,
}

/// Everything the budget manager knows, in one report.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UsageSummary {
    /// The configured ceiling in USD.
    pub daily_budget_usd: f64,
    /// Today's usage.
    pub daily_usage: DailyUsage,
    /// Per-agent usage, sorted by agent id.
    pub agents: Vec<AgentUsage>,
    /// Cost suggestions.
    pub suggestions: Vec<Suggestion>,
}

#[derive(Default)]
struct Totals {
    input_tokens: u64,
    output_tokens: u64,
    cost_usd: f64,
    calls: usize,
}

impl Totals {
    fn add(&mut self, record: &UsageRecord) {
        self.input_tokens += record.input_tokens;
        self.output_tokens += record.output_tokens;
        self.cost_usd += record.cost_usd;
        self.calls += 1;
    }
}

/// Tracks token usage and spend against a daily ceiling.
///
/// The ledger is append-only. All methods take `&self`, so the manager can
/// be shared by every agent of a team through an `Arc`. Accounting is
/// best effort: concurrent calls may all be admitted before any of them
/// is recorded.
pub struct BudgetManager {
    daily_budget: f64,
    prices: PriceTable,
    estimator: TokenEstimator,
    ledger: Mutex<Vec<UsageRecord>>,
}

impl Default for BudgetManager {
    fn default() -> Self {
        Self::new(DEFAULT_DAILY_BUDGET)
    }
}

impl BudgetManager {
    /// Creates a manager with the given daily ceiling in USD.
    pub fn new(daily_budget: f64) -> Self {
        debug!(daily_budget, "budget manager initialized");
        Self {
            daily_budget,
            prices: PriceTable::default(),
            estimator: TokenEstimator::default(),
            ledger: Mutex::default(),
        }
    }

    /// Replaces the price table.
    #[inline]
    pub fn with_prices(mut self, prices: PriceTable) -> Self {
        self.prices = prices;
        self
    }

    /// Replaces the token estimator.
    #[inline]
    pub fn with_estimator(mut self, estimator: TokenEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    /// The configured ceiling in USD.
    #[inline]
    pub fn daily_budget(&self) -> f64 {
        self.daily_budget
    }

    /// Estimates the token count of `text`.
    #[inline]
    pub fn estimate_tokens(&self, text: &str) -> u64 {
        self.estimator.estimate(text)
    }

    fn lock_ledger(&self) -> MutexGuard<'_, Vec<UsageRecord>> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a call made now and returns the ledger entry.
    #[inline]
    pub fn record_usage(
        &self,
        agent_id: &str,
        input_tokens: u64,
        output_tokens: u64,
        model: &str,
    ) -> UsageRecord {
        self.record_usage_at(agent_id, input_tokens, output_tokens, model, Utc::now())
    }

    /// Records a call made at the given time and returns the ledger entry.
    pub fn record_usage_at(
        &self,
        agent_id: &str,
        input_tokens: u64,
        output_tokens: u64,
        model: &str,
        timestamp: DateTime<Utc>,
    ) -> UsageRecord {
        let record = UsageRecord {
            agent_id: agent_id.to_owned(),
            input_tokens,
            output_tokens,
            model: model.to_owned(),
            timestamp,
            cost_usd: self.prices.cost(model, input_tokens, output_tokens),
        };
        debug!(
            agent_id,
            input_tokens,
            output_tokens,
            model,
            cost_usd = record.cost_usd,
            "token usage recorded"
        );
        self.lock_ledger().push(record.clone());
        record
    }

    /// Aggregates the usage of a UTC day, today if `date` is `None`.
    pub fn get_daily_usage(&self, date: Option<NaiveDate>) -> DailyUsage {
        let date = date.unwrap_or_else(|| Utc::now().date_naive());
        let mut totals = Totals::default();
        for record in self.lock_ledger().iter() {
            if record.timestamp.date_naive() == date {
                totals.add(record);
            }
        }

        DailyUsage {
            date,
            total_tokens: totals.input_tokens + totals.output_tokens,
            input_tokens: totals.input_tokens,
            output_tokens: totals.output_tokens,
            total_cost_usd: totals.cost_usd,
            call_count: totals.calls,
            budget_remaining_usd: self.daily_budget - totals.cost_usd,
            budget_used_percentage: self.used_percentage(totals.cost_usd),
        }
    }

    fn used_percentage(&self, spent: f64) -> f64 {
        if self.daily_budget > 0.0 {
            spent / self.daily_budget * 100.0
        } else {
            100.0
        }
    }

    /// Aggregates the usage of one agent over all days.
    pub fn get_agent_usage(&self, agent_id: &str) -> AgentUsage {
        let mut totals = Totals::default();
        for record in self.lock_ledger().iter() {
            if record.agent_id == agent_id {
                totals.add(record);
            }
        }
        agent_usage(agent_id, &totals)
    }

    fn all_agent_usage(&self) -> Vec<AgentUsage> {
        let mut by_agent: BTreeMap<String, Totals> = BTreeMap::new();
        for record in self.lock_ledger().iter() {
            by_agent
                .entry(record.agent_id.clone())
                .or_default()
                .add(record);
        }
        by_agent
            .iter()
            .map(|(agent_id, totals)| agent_usage(agent_id, totals))
            .collect()
    }

    /// Classifies today's spend.
    pub fn budget_status(&self) -> BudgetStatus {
        let usage = self.get_daily_usage(None);
        if usage.total_cost_usd >= self.daily_budget {
            BudgetStatus::Exhausted
        } else if usage.budget_used_percentage >= WARNING_THRESHOLD_PERCENTAGE {
            BudgetStatus::Warning
        } else {
            BudgetStatus::Available
        }
    }

    /// Returns `true` iff today's spend is below the ceiling.
    ///
    /// Crossing the warning threshold is logged but still returns `true`.
    pub fn check_budget_available(&self) -> bool {
        let usage = self.get_daily_usage(None);
        match self.budget_status() {
            BudgetStatus::Exhausted => {
                warn!(
                    spent = usage.total_cost_usd,
                    budget = self.daily_budget,
                    "daily budget exceeded"
                );
                false
            }
            BudgetStatus::Warning => {
                warn!(
                    percentage = usage.budget_used_percentage,
                    remaining = usage.budget_remaining_usd,
                    "daily budget almost used up"
                );
                true
            }
            BudgetStatus::Available => true,
        }
    }

    /// Estimates the cost of a call before it is made, in USD.
    pub fn estimate_call_cost(
        &self,
        input_text: &str,
        expected_output_tokens: u64,
        model: &str,
    ) -> f64 {
        let input_tokens = self.estimator.estimate(input_text);
        self.prices.cost(model, input_tokens, expected_output_tokens)
    }

    /// Decides whether a call should be made.
    ///
    /// Denies when today's budget is already spent, or when the estimated
    /// cost of this call alone exceeds what is left.
    pub fn should_allow_call(
        &self,
        input_text: &str,
        expected_output_tokens: u64,
        model: &str,
    ) -> Admission {
        if !self.check_budget_available() {
            return Admission {
                allowed: false,
                reason: "Daily budget exceeded".to_owned(),
            };
        }

        let estimated =
            self.estimate_call_cost(input_text, expected_output_tokens, model);
        let remaining = self.get_daily_usage(None).budget_remaining_usd;
        if estimated > remaining {
            return Admission {
                allowed: false,
                reason: format!(
                    "Call would exceed remaining budget (${remaining:.2})"
                ),
            };
        }

        Admission {
            allowed: true,
            reason: "Budget available".to_owned(),
        }
    }

    /// Points out agents and spend patterns worth optimizing.
    pub fn optimization_suggestions(&self) -> Vec<Suggestion> {
        let mut suggestions: Vec<_> = self
            .all_agent_usage()
            .into_iter()
            .filter(|usage| usage.avg_tokens_per_call > HIGH_TOKENS_PER_CALL)
            .map(|usage| Suggestion {
                agent: usage.agent_id,
                issue: SuggestionKind::HighTokensPerCall,
                recommendation: "Consider breaking down tasks into smaller chunks",
                value: usage.avg_tokens_per_call,
            })
            .collect();

        let daily = self.get_daily_usage(None);
        if daily.budget_used_percentage > HIGH_DAILY_SPEND_PERCENTAGE {
            suggestions.push(Suggestion {
                agent: "system".to_owned(),
                issue: SuggestionKind::HighDailySpend,
                recommendation: "Review agent prompts for efficiency, consider caching",
                value: daily.budget_used_percentage,
            });
        }
        suggestions
    }

    /// Reports today's usage, every agent's usage and the suggestions.
    pub fn summary(&self) -> UsageSummary {
        UsageSummary {
            daily_budget_usd: self.daily_budget,
            daily_usage: self.get_daily_usage(None),
            agents: self.all_agent_usage(),
            suggestions: self.optimization_suggestions(),
        }
    }
}

fn agent_usage(agent_id: &str, totals: &Totals) -> AgentUsage {
    let total_tokens = totals.input_tokens + totals.output_tokens;
    let avg_tokens_per_call = if totals.calls == 0 {
        0.0
    } else {
        total_tokens as f64 / totals.calls as f64
    };
    AgentUsage {
        agent_id: agent_id.to_owned(),
        total_tokens,
        input_tokens: totals.input_tokens,
        output_tokens: totals.output_tokens,
        total_cost_usd: totals.cost_usd,
        call_count: totals.calls,
        avg_tokens_per_call,
    }
}
