#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use browser_goal_agent::brain::CompletionModel;
use browser_goal_agent::{AgentConfig, AgentError, Page};
use serde_json::{Value, json};

/// Config with pacing removed so tests run instantly.
pub fn fast_config() -> AgentConfig {
    AgentConfig {
        settle_delay: Duration::ZERO,
        step_delay: Duration::ZERO,
        ..AgentConfig::default()
    }
}

pub fn element(tag: &str, id: &str, text: &str, placeholder: &str) -> Value {
    json!({
        "tag": tag,
        "type": if tag == "input" { "text" } else { "" },
        "text": text,
        "placeholder": placeholder,
        "id": id,
        "name": "",
        "href": ""
    })
}

/// In-memory page. Selectors listed as present can be clicked and filled;
/// anything else fails like a missing element would.
pub struct FakePage {
    title: String,
    url: Mutex<String>,
    present: HashSet<String>,
    texts: HashMap<String, String>,
    snapshot: Value,
    unreadable: bool,
    calls: Mutex<Vec<String>>,
}

impl FakePage {
    pub fn new(title: &str, url: &str) -> Self {
        Self {
            title: title.to_string(),
            url: Mutex::new(url.to_string()),
            present: HashSet::new(),
            texts: HashMap::new(),
            snapshot: Value::String("[]".to_string()),
            unreadable: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// The retail home page used throughout the tests.
    pub fn amazon() -> Self {
        Self::new("Amazon.com", "about:blank")
            .with_selectors(&["#twotabsearchtextbox", "#nav-search-submit-button"])
            .with_snapshot(vec![
                element("input", "twotabsearchtextbox", "", "Search Amazon"),
                element("input", "nav-search-submit-button", "Go", ""),
            ])
    }

    pub fn with_selectors(mut self, selectors: &[&str]) -> Self {
        self.present
            .extend(selectors.iter().map(|s| s.to_string()));
        self
    }

    pub fn with_text(mut self, selector: &str, text: &str) -> Self {
        self.texts.insert(selector.to_string(), text.to_string());
        self
    }

    /// Elements come back JSON-encoded, the way the page script returns them.
    pub fn with_snapshot(mut self, elements: Vec<Value>) -> Self {
        self.snapshot = Value::String(Value::Array(elements).to_string());
        self
    }

    pub fn unreadable(mut self) -> Self {
        self.unreadable = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Only the calls that act on the page.
    pub fn actions(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| {
                ["goto ", "click ", "fill ", "text "]
                    .iter()
                    .any(|prefix| c.starts_with(prefix))
            })
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn locate(&self, selector: &str) -> anyhow::Result<()> {
        if self.present.contains(selector) || self.texts.contains_key(selector) {
            Ok(())
        } else {
            Err(anyhow!("no element matches {}", selector))
        }
    }
}

#[async_trait]
impl Page for FakePage {
    async fn goto(&self, url: &str, _timeout: Duration) -> anyhow::Result<()> {
        self.record(format!("goto {url}"));
        if url.starts_with("https://unreachable") {
            return Err(anyhow!("net::ERR_NAME_NOT_RESOLVED"));
        }
        *self.url.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn click(&self, selector: &str, _timeout: Duration) -> anyhow::Result<()> {
        self.record(format!("click {selector}"));
        self.locate(selector)
    }

    async fn fill(&self, selector: &str, text: &str, _timeout: Duration) -> anyhow::Result<()> {
        self.record(format!("fill {selector} {text}"));
        self.locate(selector)
    }

    async fn text_content(&self, selector: &str, _timeout: Duration) -> anyhow::Result<String> {
        self.record(format!("text {selector}"));
        self.texts
            .get(selector)
            .cloned()
            .ok_or_else(|| anyhow!("no element matches {}", selector))
    }

    async fn evaluate(&self, _expression: &str) -> anyhow::Result<Value> {
        self.record("evaluate".to_string());
        if self.unreadable {
            return Err(anyhow!("Execution context was destroyed"));
        }
        Ok(self.snapshot.clone())
    }

    async fn url(&self) -> anyhow::Result<String> {
        self.record("url".to_string());
        Ok(self.url.lock().unwrap().clone())
    }

    async fn title(&self) -> anyhow::Result<String> {
        self.record("title".to_string());
        if self.unreadable {
            return Err(anyhow!("Target closed"));
        }
        Ok(self.title.clone())
    }
}

/// Model that answers every request with the same text and keeps the prompts.
pub struct ScriptedModel {
    response: Result<String, u16>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedModel {
    pub fn replying(response: &str) -> (Self, Arc<Mutex<Vec<String>>>) {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let model = Self {
            response: Ok(response.to_string()),
            prompts: Arc::clone(&prompts),
        };
        (model, prompts)
    }

    pub fn failing(status: u16) -> (Self, Arc<Mutex<Vec<String>>>) {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let model = Self {
            response: Err(status),
            prompts: Arc::clone(&prompts),
        };
        (model, prompts)
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    async fn complete(&self, _system: &str, user: &str) -> browser_goal_agent::Result<String> {
        self.prompts.lock().unwrap().push(user.to_string());
        match &self.response {
            Ok(text) => Ok(text.clone()),
            Err(status) => Err(AgentError::Api {
                status: *status,
                message: "overloaded".to_string(),
            }),
        }
    }
}
