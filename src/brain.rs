use std::fmt::Write as _;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::config::{AgentConfig, Provider};
use crate::error::{AgentError, Result};
use crate::types::{
    PROMPT_ELEMENT_LIMIT, PROMPT_TEXT_PREVIEW_CHARS, PageContext, Plan, PlanStep, truncate_chars,
};

const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";

pub const SYSTEM_PROMPT: &str = r#"You are a web automation expert. Given a user's goal and the current webpage state, generate a step-by-step plan.

Available actions:
- fill: Fill an input field
  Format: {"action": "fill", "selector": "css selector", "text": "text to type"}
- click: Click an element
  Format: {"action": "click", "selector": "css selector"}
- goto: Navigate to URL
  Format: {"action": "goto", "url": "https://example.com"}
- wait: Wait for page to load
  Format: {"action": "wait", "seconds": 2}

Based on the page context, choose the best selectors. Prefer IDs over other selectors.
Return ONLY a JSON array of actions. No explanation, just the JSON."#;

/// A text-completion endpoint: one system instruction, one user message,
/// one completion back.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

#[async_trait]
impl<T: CompletionModel + ?Sized> CompletionModel for Box<T> {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        (**self).complete(system, user).await
    }
}

/// Build the client for the configured provider. Fails fast without a credential.
pub fn client_from_config(config: &AgentConfig) -> Result<Box<dyn CompletionModel>> {
    match config.provider {
        Provider::Anthropic => Ok(Box::new(AnthropicClient::new(config)?)),
        Provider::OpenAi => Ok(Box::new(OpenAiClient::new(config)?)),
    }
}

/// Anthropic Messages API.
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn new(config: &AgentConfig) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();
        Ok(Self {
            client: Client::new(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl CompletionModel for AnthropicClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let response = self
            .client
            .post(ANTHROPIC_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&json!({
                "model": self.model,
                "max_tokens": self.max_tokens,
                "system": system,
                "messages": [{"role": "user", "content": user}],
            }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let json_resp = decode_response(status, &body)?;

        json_resp["content"][0]["text"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| AgentError::EmptyCompletion(json_resp.to_string()))
    }
}

/// OpenAI chat completions API.
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiClient {
    pub fn new(config: &AgentConfig) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();
        Ok(Self {
            client: Client::new(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl CompletionModel for OpenAiClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let response = self
            .client
            .post(OPENAI_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({
                "model": self.model,
                "max_tokens": self.max_tokens,
                "temperature": 0.2,
                "messages": [
                    {"role": "system", "content": system},
                    {"role": "user", "content": user},
                ],
            }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let json_resp = decode_response(status, &body)?;

        json_resp["choices"][0]["message"]["content"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| AgentError::EmptyCompletion(json_resp.to_string()))
    }
}

/// Parse a model API response body. Any non-2xx status is an `Api` error,
/// whether or not the body is JSON.
fn decode_response(status: reqwest::StatusCode, body: &str) -> Result<Value> {
    if status.is_success() {
        return Ok(serde_json::from_str(body)?);
    }

    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| {
            let body = body.trim();
            if body.is_empty() {
                "Unknown API error".to_string()
            } else {
                truncate_chars(body, 200).to_string()
            }
        });
    warn!("[LLM] API error ({}): {}", status, message);
    Err(AgentError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Turns a goal plus a page snapshot into a plan via one completion call.
pub struct Planner<M> {
    model: M,
}

impl<M: CompletionModel> Planner<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    /// Ask the model for a plan.
    ///
    /// Transport and API faults are errors. A response that is not a JSON
    /// array yields an empty plan.
    pub async fn generate_plan(&self, goal: &str, context: &PageContext) -> Result<Plan> {
        let user_prompt = build_user_prompt(goal, context);

        info!("[LLM] Sending request to model...");
        let response = self.model.complete(SYSTEM_PROMPT, &user_prompt).await?;
        info!("[LLM] Received response from model");
        debug!("[LLM] Raw response: {}", response);

        let plan = parse_plan(&response);
        if !plan.is_empty() {
            info!("[LLM] Generated plan with {} steps", plan.len());
        }
        Ok(plan)
    }
}

/// The user turn: goal, page identity, then a numbered listing of the
/// first few elements.
pub fn build_user_prompt(goal: &str, context: &PageContext) -> String {
    let mut prompt = format!(
        "Goal: {}\n\nCurrent Page:\nTitle: {}\nURL: {}\n\nInteractive Elements:\n",
        goal, context.title, context.url
    );

    for (i, el) in context.elements.iter().take(PROMPT_ELEMENT_LIMIT).enumerate() {
        let _ = write!(prompt, "\n{}. {}", i + 1, el.tag);
        if !el.id.is_empty() {
            let _ = write!(prompt, " (id='{}')", el.id);
        }
        if !el.text.is_empty() {
            let _ = write!(
                prompt,
                " - '{}'",
                truncate_chars(&el.text, PROMPT_TEXT_PREVIEW_CHARS)
            );
        }
        if !el.placeholder.is_empty() {
            let _ = write!(prompt, " - placeholder: '{}'", el.placeholder);
        }
    }

    prompt.push_str("\n\nGenerate the action plan as a JSON array:");
    prompt
}

/// Take the inside of a ```json or bare ``` fence; other text is returned as is.
pub fn strip_code_fence(text: &str) -> &str {
    match text
        .split_once("```json")
        .or_else(|| text.split_once("```"))
    {
        Some((_, rest)) => rest.split("```").next().unwrap_or(rest),
        None => text,
    }
}

/// Decode a model response into a plan. Never fails: anything that is not
/// a JSON array becomes an empty plan.
pub fn parse_plan(response: &str) -> Plan {
    let body = strip_code_fence(response).trim();
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Array(items)) => items.into_iter().map(PlanStep::from_value).collect(),
        Ok(other) => {
            warn!("[LLM] Expected a JSON array of actions, got: {}", other);
            Vec::new()
        }
        Err(e) => {
            warn!("[LLM] Failed to parse response: {}", e);
            warn!("[LLM] Response was: {}", response);
            Vec::new()
        }
    }
}
