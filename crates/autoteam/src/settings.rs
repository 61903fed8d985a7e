//! Runtime configuration read from the environment.

use std::env;
use std::fmt::{self, Debug};
use std::path::PathBuf;
use std::str::FromStr;

use autoteam_anthropic_model::{AnthropicConfig, AnthropicConfigBuilder};
use autoteam_core::{BudgetPolicy, RetryPolicy};
use autoteam_cost::DEFAULT_DAILY_BUDGET;
use autoteam_model::ModelSettings;

/// Errors raised while reading [`Settings`].
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// A required variable is not set.
    #[error("{0} environment variable is not set")]
    Missing(&'static str),
    /// A variable is set to something that can't be parsed.
    #[error("invalid value for {key}: {value:?}")]
    Invalid {
        /// The variable.
        key: &'static str,
        /// The raw value.
        value: String,
    },
}

/// Everything the team needs to know about its environment.
#[derive(Clone)]
pub struct Settings {
    anthropic_api_key: String,
    anthropic_base_url: Option<String>,
    default_model: String,
    max_tokens: u32,
    temperature: f32,
    max_cost_per_day: f64,
    environment: String,
    brave_api_key: Option<String>,
    serpapi_key: Option<String>,
    max_retries: u32,
    budget_policy: BudgetPolicy,
    model_routing: bool,
    prompt_caching: bool,
    prompts_dir: Option<PathBuf>,
}

impl Settings {
    /// Loads `.env` if there is one, then reads the process environment.
    pub fn from_env() -> Result<Self, SettingsError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("loaded environment from {}", path.display()),
            Err(err) if err.not_found() => {}
            Err(err) => warn!("failed to load .env: {err}"),
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads settings through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_key = get("ANTHROPIC_API_KEY")
            .ok_or(SettingsError::Missing("ANTHROPIC_API_KEY"))?;
        let mut builder = SettingsBuilder::with_api_key(api_key);
        builder.settings.anthropic_base_url = get("ANTHROPIC_BASE_URL");
        builder.settings.brave_api_key = get("BRAVE_API_KEY");
        builder.settings.serpapi_key = get("SERPAPI_KEY");
        builder.settings.prompts_dir = get("PROMPTS_DIR").map(PathBuf::from);
        if let Some(model) = get("DEFAULT_MODEL") {
            builder.settings.default_model = model;
        }
        if let Some(environment) = get("ENVIRONMENT") {
            builder.settings.environment = environment;
        }

        let settings = &mut builder.settings;
        parse_into(&get, "MAX_TOKENS", &mut settings.max_tokens)?;
        parse_into(&get, "TEMPERATURE", &mut settings.temperature)?;
        parse_into(&get, "MAX_COST_PER_DAY", &mut settings.max_cost_per_day)?;
        parse_into(&get, "MAX_RETRIES", &mut settings.max_retries)?;
        if let Some(value) = get("BUDGET_ENFORCEMENT") {
            settings.budget_policy = parse_budget_policy(&value).ok_or(
                SettingsError::Invalid {
                    key: "BUDGET_ENFORCEMENT",
                    value,
                },
            )?;
        }
        parse_flag(&get, "MODEL_ROUTING", &mut settings.model_routing)?;
        parse_flag(&get, "PROMPT_CACHING", &mut settings.prompt_caching)?;

        Ok(builder.build())
    }

    /// Returns the Anthropic API key.
    #[inline]
    pub fn anthropic_api_key(&self) -> &str {
        &self.anthropic_api_key
    }

    /// Returns the default model.
    #[inline]
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Returns the daily spend ceiling in USD.
    #[inline]
    pub fn max_cost_per_day(&self) -> f64 {
        self.max_cost_per_day
    }

    /// Returns the deployment environment.
    #[inline]
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Returns `true` when running in development, which auto-approves
    /// decisions.
    #[inline]
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Returns `true` when running in production.
    #[inline]
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Returns the Brave Search key.
    #[inline]
    pub fn brave_api_key(&self) -> Option<&str> {
        self.brave_api_key.as_deref()
    }

    /// Returns the SerpAPI key.
    #[inline]
    pub fn serpapi_key(&self) -> Option<&str> {
        self.serpapi_key.as_deref()
    }

    /// Returns what a denied budget check does.
    #[inline]
    pub fn budget_policy(&self) -> BudgetPolicy {
        self.budget_policy
    }

    /// Returns `true` if model settings are routed per task.
    #[inline]
    pub fn model_routing(&self) -> bool {
        self.model_routing
    }

    /// Returns `true` if requests carry cache hints.
    #[inline]
    pub fn prompt_caching(&self) -> bool {
        self.prompt_caching
    }

    /// Returns the directory prompt files are read from, if any.
    #[inline]
    pub fn prompts_dir(&self) -> Option<&PathBuf> {
        self.prompts_dir.as_ref()
    }

    /// The model settings used when routing is off.
    pub fn model_settings(&self) -> ModelSettings {
        ModelSettings::new(&self.default_model, self.temperature, self.max_tokens)
    }

    /// The retry policy of model requests.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            ..Default::default()
        }
    }

    /// The provider configuration.
    pub fn anthropic_config(&self) -> AnthropicConfig {
        let builder = AnthropicConfigBuilder::with_api_key(&self.anthropic_api_key);
        let builder = match &self.anthropic_base_url {
            Some(base_url) => builder.with_base_url(base_url),
            None => builder,
        };
        builder.build()
    }
}

impl Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "<redacted>");
        f.debug_struct("Settings")
            .field("anthropic_api_key", &"<redacted>")
            .field("anthropic_base_url", &self.anthropic_base_url)
            .field("default_model", &self.default_model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("max_cost_per_day", &self.max_cost_per_day)
            .field("environment", &self.environment)
            .field("brave_api_key", &redact(&self.brave_api_key))
            .field("serpapi_key", &redact(&self.serpapi_key))
            .field("max_retries", &self.max_retries)
            .field("budget_policy", &self.budget_policy)
            .field("model_routing", &self.model_routing)
            .field("prompt_caching", &self.prompt_caching)
            .field("prompts_dir", &self.prompts_dir)
            .finish()
    }
}

/// Builder for [`Settings`].
#[derive(Clone, Debug)]
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    /// Creates a builder with the given API key and defaults for
    /// everything else.
    pub fn with_api_key<S: Into<String>>(api_key: S) -> Self {
        Self {
            settings: Settings {
                anthropic_api_key: api_key.into(),
                anthropic_base_url: None,
                default_model: "claude-sonnet-4-5".to_owned(),
                max_tokens: 4096,
                temperature: 0.7,
                max_cost_per_day: DEFAULT_DAILY_BUDGET,
                environment: "development".to_owned(),
                brave_api_key: None,
                serpapi_key: None,
                max_retries: RetryPolicy::default().max_retries,
                budget_policy: BudgetPolicy::default(),
                model_routing: false,
                prompt_caching: true,
                prompts_dir: None,
            },
        }
    }

    /// Sets a custom API base URL.
    #[inline]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.settings.anthropic_base_url = Some(base_url.into());
        self
    }

    /// Sets the model, temperature and output limit.
    #[inline]
    pub fn with_model<S: Into<String>>(
        mut self,
        model: S,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        self.settings.default_model = model.into();
        self.settings.temperature = temperature;
        self.settings.max_tokens = max_tokens;
        self
    }

    /// Sets the daily spend ceiling in USD.
    #[inline]
    pub fn with_max_cost_per_day(mut self, max_cost_per_day: f64) -> Self {
        self.settings.max_cost_per_day = max_cost_per_day;
        self
    }

    /// Sets the deployment environment.
    #[inline]
    pub fn with_environment<S: Into<String>>(mut self, environment: S) -> Self {
        self.settings.environment = environment.into();
        self
    }

    /// Sets the search keys.
    #[inline]
    pub fn with_search_keys(
        mut self,
        brave_api_key: Option<String>,
        serpapi_key: Option<String>,
    ) -> Self {
        self.settings.brave_api_key = brave_api_key;
        self.settings.serpapi_key = serpapi_key;
        self
    }

    /// Sets how many times a failed model request is retried.
    #[inline]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.settings.max_retries = max_retries;
        self
    }

    /// Sets what a denied budget check does.
    #[inline]
    pub fn with_budget_policy(mut self, policy: BudgetPolicy) -> Self {
        self.settings.budget_policy = policy;
        self
    }

    /// Turns per-task model routing on or off.
    #[inline]
    pub fn with_model_routing(mut self, enabled: bool) -> Self {
        self.settings.model_routing = enabled;
        self
    }

    /// Turns prompt caching on or off.
    #[inline]
    pub fn with_prompt_caching(mut self, enabled: bool) -> Self {
        self.settings.prompt_caching = enabled;
        self
    }

    /// Reads prompts from a directory before falling back to the built-in
    /// ones.
    #[inline]
    pub fn with_prompts_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.settings.prompts_dir = Some(dir.into());
        self
    }

    /// Builds the settings.
    #[inline]
    pub fn build(self) -> Settings {
        self.settings
    }
}

fn parse_into<T, F>(get: &F, key: &'static str, slot: &mut T) -> Result<(), SettingsError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = get(key) {
        *slot = value
            .trim()
            .parse()
            .map_err(|_| SettingsError::Invalid { key, value })?;
    }
    Ok(())
}

fn parse_flag<F>(get: &F, key: &'static str, slot: &mut bool) -> Result<(), SettingsError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = get(key) else {
        return Ok(());
    };
    *slot = match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => return Err(SettingsError::Invalid { key, value }),
    };
    Ok(())
}

fn parse_budget_policy(value: &str) -> Option<BudgetPolicy> {
    match value.trim().to_ascii_lowercase().as_str() {
        "advisory" => Some(BudgetPolicy::Advisory),
        "enforce" => Some(BudgetPolicy::Enforce),
        _ => None,
    }
}
