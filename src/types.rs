use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Hard cap on elements kept in a page snapshot.
pub const MAX_CONTEXT_ELEMENTS: usize = 50;
/// Element text is cut to this many characters before it enters a snapshot.
pub const MAX_ELEMENT_TEXT_CHARS: usize = 100;
/// Only this many elements are rendered into the planning prompt.
pub const PROMPT_ELEMENT_LIMIT: usize = 10;
pub const PROMPT_TEXT_PREVIEW_CHARS: usize = 50;
pub const DEFAULT_WAIT_SECONDS: f64 = 2.0;

/// One visible interactive element observed on the page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageElement {
    pub tag: String,
    #[serde(rename = "type")]
    pub element_type: String,
    pub text: String,
    pub placeholder: String,
    pub id: String,
    pub name: String,
    pub href: String,
}

/// Bounded snapshot of one page at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContext {
    pub title: String,
    pub url: String,
    pub elements: Vec<PageElement>,
}

/// A single step of a model-produced plan.
///
/// Steps the executor cannot run are still kept in the plan so they fail in
/// place and the remaining steps keep their positions.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanStep {
    Goto { url: String },
    Fill { selector: String, text: String },
    Click { selector: String },
    Wait { seconds: f64 },
    /// The `action` tag is outside the recognized vocabulary.
    Unknown { action: String },
    /// A recognized tag with missing or ill-typed fields, or not an object at all.
    Malformed { action: String, reason: String },
}

pub type Plan = Vec<PlanStep>;

#[derive(Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
enum KnownStep {
    Goto {
        url: String,
    },
    Fill {
        selector: String,
        text: String,
    },
    Click {
        selector: String,
    },
    Wait {
        #[serde(default = "default_wait_seconds")]
        seconds: f64,
    },
}

fn default_wait_seconds() -> f64 {
    DEFAULT_WAIT_SECONDS
}

const KNOWN_ACTIONS: [&str; 4] = ["goto", "fill", "click", "wait"];

impl PlanStep {
    /// Decode one item of the model's JSON array. Never fails.
    pub fn from_value(value: Value) -> Self {
        let Some(object) = value.as_object() else {
            return PlanStep::Malformed {
                action: String::new(),
                reason: format!("expected an object, got {value}"),
            };
        };

        let action = match object.get("action") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => {
                return PlanStep::Malformed {
                    action: String::new(),
                    reason: "missing \"action\" field".to_string(),
                };
            }
        };

        if !KNOWN_ACTIONS.contains(&action.as_str()) {
            return PlanStep::Unknown { action };
        }

        match serde_json::from_value::<KnownStep>(value) {
            Ok(KnownStep::Goto { url }) => PlanStep::Goto { url },
            Ok(KnownStep::Fill { selector, text }) => PlanStep::Fill { selector, text },
            Ok(KnownStep::Click { selector }) => PlanStep::Click { selector },
            Ok(KnownStep::Wait { seconds }) => PlanStep::Wait { seconds },
            Err(e) => PlanStep::Malformed {
                action,
                reason: e.to_string(),
            },
        }
    }

    /// The raw `action` tag this step was decoded from.
    pub fn action(&self) -> &str {
        match self {
            PlanStep::Goto { .. } => "goto",
            PlanStep::Fill { .. } => "fill",
            PlanStep::Click { .. } => "click",
            PlanStep::Wait { .. } => "wait",
            PlanStep::Unknown { action } | PlanStep::Malformed { action, .. } => action,
        }
    }
}

impl fmt::Display for PlanStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanStep::Goto { url } => write!(f, "goto {url}"),
            PlanStep::Fill { selector, text } => write!(f, "fill ({selector}) with '{text}'"),
            PlanStep::Click { selector } => write!(f, "click ({selector})"),
            PlanStep::Wait { seconds } => write!(f, "wait {seconds}s"),
            PlanStep::Unknown { action } => write!(f, "{action}"),
            PlanStep::Malformed { action, reason } => write!(f, "{action} (malformed: {reason})"),
        }
    }
}

/// Outcome of one goal execution.
///
/// `success` means a plan was obtained and run to the end, not that every
/// step succeeded; `failed_steps` counts the ones that did not.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub steps_executed: usize,
    pub failed_steps: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn completed(steps_executed: usize, failed_steps: usize, final_url: String) -> Self {
        Self {
            success: true,
            steps_executed,
            failed_steps,
            final_url: Some(final_url),
            error: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            steps_executed: 0,
            failed_steps: 0,
            final_url: None,
            error: Some(reason.into()),
        }
    }
}

/// Cut `s` to at most `max` characters, respecting char boundaries.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
