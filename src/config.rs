use std::str::FromStr;
use std::time::Duration;

use crate::error::{AgentError, Result};

pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_NAV_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_ACTION_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAi,
}

impl Provider {
    /// Environment variable holding this provider's credential.
    pub fn credential_var(self) -> &'static str {
        match self {
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::OpenAi => "OPENAI_API_KEY",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Provider::Anthropic => DEFAULT_ANTHROPIC_MODEL,
            Provider::OpenAi => DEFAULT_OPENAI_MODEL,
        }
    }
}

impl FromStr for Provider {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            "openai" => Ok(Provider::OpenAi),
            other => Err(AgentError::InvalidConfig(format!(
                "unknown LLM_PROVIDER '{other}' (expected 'anthropic' or 'openai')"
            ))),
        }
    }
}

/// Settings shared by the planner, the browser session and the executor.
///
/// Built once at startup and handed down by reference.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub provider: Provider,
    /// Credential for `provider`. Checked when the model client is built.
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub headless: bool,
    pub chrome_path: Option<String>,
    pub nav_timeout: Duration,
    pub action_timeout: Duration,
    /// Pause after the start navigation so the page can settle.
    pub settle_delay: Duration,
    /// Pause between plan steps.
    pub step_delay: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Anthropic,
            api_key: None,
            model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            headless: false,
            chrome_path: None,
            nav_timeout: Duration::from_millis(DEFAULT_NAV_TIMEOUT_MS),
            action_timeout: Duration::from_millis(DEFAULT_ACTION_TIMEOUT_MS),
            settle_delay: Duration::from_secs(2),
            step_delay: Duration::from_secs(1),
        }
    }
}

impl AgentConfig {
    /// Load from the process environment, after reading `.env` if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let provider = match get("LLM_PROVIDER") {
            Some(raw) => raw.parse::<Provider>()?,
            None => Provider::Anthropic,
        };
        let defaults = Self::default();

        Ok(Self {
            provider,
            api_key: get(provider.credential_var()),
            model: get("LLM_MODEL").unwrap_or_else(|| provider.default_model().to_string()),
            max_tokens: parse_or("LLM_MAX_TOKENS", get("LLM_MAX_TOKENS"), defaults.max_tokens)?,
            headless: match get("HEADLESS") {
                Some(raw) => parse_bool("HEADLESS", &raw)?,
                None => defaults.headless,
            },
            chrome_path: get("CHROME_PATH"),
            nav_timeout: Duration::from_millis(parse_or(
                "NAV_TIMEOUT_MS",
                get("NAV_TIMEOUT_MS"),
                DEFAULT_NAV_TIMEOUT_MS,
            )?),
            action_timeout: Duration::from_millis(parse_or(
                "ACTION_TIMEOUT_MS",
                get("ACTION_TIMEOUT_MS"),
                DEFAULT_ACTION_TIMEOUT_MS,
            )?),
            settle_delay: defaults.settle_delay,
            step_delay: defaults.step_delay,
        })
    }

    /// The credential, or the configuration fault naming the missing variable.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(AgentError::MissingCredential {
                var: self.provider.credential_var(),
            })
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        Some(raw) => raw
            .parse()
            .map_err(|_| AgentError::InvalidConfig(format!("{key}='{raw}' is not a valid number"))),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AgentError::InvalidConfig(format!(
            "{key}='{raw}' is not a boolean"
        ))),
    }
}
