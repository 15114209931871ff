//! Drive a browser toward a natural-language goal: snapshot the page, ask a
//! language model for a short plan, then run the plan step by step.

pub mod brain;
pub mod config;
pub mod dom;
pub mod error;
pub mod executor;
pub mod hands;
pub mod primitives;
pub mod search;
pub mod types;

pub use brain::{CompletionModel, Planner};
pub use config::AgentConfig;
pub use error::{AgentError, Result};
pub use executor::{GoalExecutor, Phase};
pub use hands::{BrowserSession, ChromePage, Page};
pub use types::{ExecutionResult, PageContext, PageElement, Plan, PlanStep};
