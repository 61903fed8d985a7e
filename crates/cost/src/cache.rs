use std::sync::{Mutex, MutexGuard, PoisonError};

use autoteam_model::{CacheHints, TokenUsage};
use serde::Serialize;

use crate::tokens::TokenEstimator;

/// System prompts shorter than this many tokens are not worth caching.
pub const MIN_CACHEABLE_SYSTEM_TOKENS: u64 = 1024;
/// Tool lists are cached when they have more entries than this.
pub const MIN_CACHEABLE_TOOLS: usize = 3;
/// Conversations are cached when they have more turns than this.
pub const MIN_CACHEABLE_TURNS: usize = 2;
/// Trailing turns considered for history caching.
pub const DEFAULT_RECENT_TURNS: usize = 3;

/// Cache write price in USD per one million tokens.
pub const CACHE_WRITE_PER_1M: f64 = 3.75;
/// Cache read price in USD per one million tokens.
pub const CACHE_READ_PER_1M: f64 = 0.30;

/// Returns `true` if a system prompt of `tokens` tokens should be cached.
#[inline]
pub fn should_cache_system_prompt(tokens: u64) -> bool {
    tokens >= MIN_CACHEABLE_SYSTEM_TOKENS
}

/// Returns `true` if a list of `count` tools should be cached.
#[inline]
pub fn should_cache_tools(count: usize) -> bool {
    count > MIN_CACHEABLE_TOOLS
}

/// Returns `true` if a conversation of `turns` turns should be cached.
#[inline]
pub fn should_cache_conversation_history(turns: usize) -> bool {
    turns > MIN_CACHEABLE_TURNS
}

/// Cache effectiveness as seen from reported usage.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Responses that read from or wrote to the cache.
    pub total_requests: u64,
    /// Responses that read from the cache.
    pub cache_hits: u64,
    /// Responses that wrote to the cache.
    pub cache_misses: u64,
    /// Hits over hits plus misses, in percent.
    pub hit_rate_percentage: f64,
    /// Estimated USD saved so far.
    pub total_savings_usd: f64,
    /// The savings so far extrapolated to thirty days.
    pub estimated_monthly_savings: f64,
}

#[derive(Default)]
struct Counters {
    hits: u64,
    misses: u64,
    savings_usd: f64,
}

/// Decides which request segments carry a cache hint, and keeps track of
/// how well caching works.
///
/// Statistics are observability only. They never change what is sent.
pub struct PromptCachePlanner {
    enabled: bool,
    recent_turns: usize,
    estimator: TokenEstimator,
    counters: Mutex<Counters>,
}

impl Default for PromptCachePlanner {
    fn default() -> Self {
        Self {
            enabled: true,
            recent_turns: DEFAULT_RECENT_TURNS,
            estimator: TokenEstimator::default(),
            counters: Mutex::default(),
        }
    }
}

impl PromptCachePlanner {
    /// Creates a planner that never marks anything.
    #[inline]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Sets how many trailing turns are considered for history caching.
    #[inline]
    pub fn with_recent_turns(mut self, turns: usize) -> Self {
        self.recent_turns = turns;
        self
    }

    /// Replaces the estimator used to size the system prompt.
    #[inline]
    pub fn with_estimator(mut self, estimator: TokenEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    /// Returns `true` unless the planner was disabled.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Plans the cache hints for a request.
    pub fn plan(&self, system: &str, tool_count: usize, turns: usize) -> CacheHints {
        if !self.enabled {
            return CacheHints::default();
        }
        let hints = CacheHints {
            system: should_cache_system_prompt(self.estimator.estimate(system)),
            tools: should_cache_tools(tool_count),
            recent_turns: if should_cache_conversation_history(turns) {
                self.recent_turns
            } else {
                0
            },
        };
        trace!(?hints, "cache planned");
        hints
    }

    fn lock_counters(&self) -> MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records the cache activity of one response.
    ///
    /// A response that read cached tokens counts as a hit, one that wrote
    /// tokens counts as a miss. A response may be both.
    pub fn record_usage(&self, usage: &TokenUsage) {
        let mut counters = self.lock_counters();
        if usage.cache_read_input_tokens > 0 {
            let savings = usage.cache_read_input_tokens as f64 / 1_000_000.0
                * (CACHE_WRITE_PER_1M - CACHE_READ_PER_1M);
            counters.hits += 1;
            counters.savings_usd += savings;
            debug!(
                cache_read_tokens = usage.cache_read_input_tokens,
                savings_usd = savings,
                "cache hit"
            );
        }
        if usage.cache_creation_input_tokens > 0 {
            counters.misses += 1;
            debug!(
                cache_creation_tokens = usage.cache_creation_input_tokens,
                "cache miss"
            );
        }
    }

    /// Returns the statistics collected so far.
    pub fn stats(&self) -> CacheStats {
        let counters = self.lock_counters();
        let total = counters.hits + counters.misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            counters.hits as f64 / total as f64 * 100.0
        };
        CacheStats {
            total_requests: total,
            cache_hits: counters.hits,
            cache_misses: counters.misses,
            hit_rate_percentage: hit_rate,
            total_savings_usd: counters.savings_usd,
            estimated_monthly_savings: counters.savings_usd * 30.0,
        }
    }

    /// Clears the statistics.
    pub fn reset_stats(&self) {
        *self.lock_counters() = Counters::default();
        debug!("cache stats reset");
    }
}
