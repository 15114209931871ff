use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::brain::{CompletionModel, Planner};
use crate::config::AgentConfig;
use crate::dom;
use crate::hands::Page;
use crate::primitives::{safe_click, safe_fill, safe_goto};
use crate::types::{ExecutionResult, PlanStep};

pub const NO_PLAN_ERROR: &str = "No plan generated";

/// Where a goal execution currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    ContextGathered,
    PlanObtained,
    /// Running the 1-based step `n`.
    Executing(usize),
    Done,
    Failed,
}

/// Runs goals against one page: snapshot, plan, then every step in order.
///
/// A failing step never stops the plan. The page is owned by this executor
/// for as long as it lives; only one browser or model call is in flight at
/// a time.
pub struct GoalExecutor<P, M> {
    page: P,
    planner: Planner<M>,
    config: AgentConfig,
    phase: Phase,
}

impl<P: Page, M: CompletionModel> GoalExecutor<P, M> {
    pub fn new(page: P, planner: Planner<M>, config: &AgentConfig) -> Self {
        Self {
            page,
            planner,
            config: config.clone(),
            phase: Phase::Idle,
        }
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn enter(&mut self, phase: Phase) {
        debug!("[Agent] {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    /// Accomplish `goal`, optionally starting from `start_url`.
    ///
    /// Fails only when no plan could be obtained; otherwise reports how many
    /// steps ran and where the page ended up.
    pub async fn execute_goal(&mut self, goal: &str, start_url: Option<&str>) -> ExecutionResult {
        self.enter(Phase::Idle);
        info!("[Agent] Goal: {}", goal);

        if let Some(url) = start_url {
            info!("[Agent] Starting at: {}", url);
            safe_goto(&self.page, url, self.config.nav_timeout).await;
            sleep(self.config.settle_delay).await;
        }

        info!("[Step 1] Getting page context...");
        let context = match dom::get_page_context(&self.page).await {
            Ok(context) => context,
            Err(e) => {
                error!("[Error] Could not read page context: {}", e);
                self.enter(Phase::Failed);
                return ExecutionResult::failed(format!("could not read page context: {e}"));
            }
        };
        self.enter(Phase::ContextGathered);
        info!("[Context] Found {} interactive elements", context.elements.len());

        info!("[Step 2] Asking AI for a plan...");
        let plan = match self.planner.generate_plan(goal, &context).await {
            Ok(plan) => plan,
            Err(e) => {
                error!("[Error] Plan generation failed: {}", e);
                self.enter(Phase::Failed);
                return ExecutionResult::failed(format!("plan generation failed: {e}"));
            }
        };

        if plan.is_empty() {
            error!("[Error] AI could not generate a plan");
            self.enter(Phase::Failed);
            return ExecutionResult::failed(NO_PLAN_ERROR);
        }
        self.enter(Phase::PlanObtained);
        info!("[Agent] AI generated {} steps", plan.len());

        info!("[Step 3] Executing AI's plan...");
        let mut failed_steps = 0;
        for (i, step) in plan.iter().enumerate() {
            let number = i + 1;
            self.enter(Phase::Executing(number));
            info!("Step {}/{}: {}", number, plan.len(), step);

            if !self.execute_step(step).await {
                warn!("[Warning] Step {} failed, but continuing...", number);
                failed_steps += 1;
            }

            sleep(self.config.step_delay).await;
        }

        let final_url = self.page.url().await.unwrap_or_else(|e| {
            warn!("[Warning] Could not read final URL: {:#}", e);
            String::new()
        });
        self.enter(Phase::Done);
        info!(
            "[Agent] Execution complete: {} steps, {} failed",
            plan.len(),
            failed_steps
        );

        ExecutionResult::completed(plan.len(), failed_steps, final_url)
    }

    /// Run a single step. Returns whether it succeeded; never errors.
    pub async fn execute_step(&self, step: &PlanStep) -> bool {
        match step {
            PlanStep::Goto { url } => safe_goto(&self.page, url, self.config.nav_timeout).await,
            PlanStep::Fill { selector, text } => {
                safe_fill(&self.page, selector, text, self.config.action_timeout).await
            }
            PlanStep::Click { selector } => {
                safe_click(&self.page, selector, self.config.action_timeout).await
            }
            PlanStep::Wait { seconds } => match Duration::try_from_secs_f64(*seconds) {
                Ok(duration) => {
                    sleep(duration).await;
                    info!("[Success] waited {} seconds", seconds);
                    true
                }
                Err(_) => {
                    warn!("[Failure] cannot wait {} seconds", seconds);
                    false
                }
            },
            PlanStep::Unknown { action } => {
                warn!("[Warning] Unknown action: {}", action);
                false
            }
            PlanStep::Malformed { action, reason } => {
                warn!("[Failure] Malformed '{}' step: {}", action, reason);
                false
            }
        }
    }
}
