mod common;

use browser_goal_agent::executor::NO_PLAN_ERROR;
use browser_goal_agent::{GoalExecutor, Phase, PlanStep, Planner};
use common::{FakePage, ScriptedModel, fast_config};

const AMAZON: &str = "https://www.amazon.com";

fn executor(page: FakePage, model: ScriptedModel) -> GoalExecutor<FakePage, ScriptedModel> {
    GoalExecutor::new(page, Planner::new(model), &fast_config())
}

#[tokio::test]
async fn amazon_search_scenario() {
    let (model, prompts) = ScriptedModel::replying(
        r##"[{"action":"fill","selector":"#twotabsearchtextbox","text":"dinosaur"},{"action":"click","selector":"#nav-search-submit-button"}]"##,
    );
    let mut exec = executor(FakePage::amazon(), model);

    let result = exec
        .execute_goal("Search for a dinosaur on Amazon", Some(AMAZON))
        .await;

    assert!(result.success);
    assert_eq!(result.steps_executed, 2);
    assert_eq!(result.failed_steps, 0);
    assert_eq!(result.final_url.as_deref(), Some(AMAZON));
    assert!(result.error.is_none());
    assert_eq!(exec.phase(), Phase::Done);

    assert_eq!(
        exec.page().actions(),
        vec![
            format!("goto {AMAZON}"),
            "fill #twotabsearchtextbox dinosaur".to_string(),
            "click #nav-search-submit-button".to_string(),
        ]
    );

    let prompts = prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Goal: Search for a dinosaur on Amazon"));
    assert!(prompts[0].contains("URL: https://www.amazon.com"));
    assert!(prompts[0].contains("(id='twotabsearchtextbox')"));
}

#[tokio::test]
async fn failed_step_does_not_stop_the_plan() {
    let (model, _) = ScriptedModel::replying(
        r##"```json
[
  {"action":"fill","selector":"#twotabsearchtextbox","text":"google home"},
  {"action":"click","selector":".sponsored-result"},
  {"action":"click","selector":"#nav-search-submit-button"}
]
```"##,
    );
    let mut exec = executor(FakePage::amazon(), model);

    let result = exec.execute_goal("Search for google home", None).await;

    assert!(result.success);
    assert_eq!(result.steps_executed, 3);
    assert_eq!(result.failed_steps, 1);
    assert_eq!(
        exec.page().actions().last().map(String::as_str),
        Some("click #nav-search-submit-button")
    );
}

#[tokio::test]
async fn empty_plan_fails_without_touching_the_page() {
    let (model, prompts) = ScriptedModel::replying("I'm not sure how to do that.");
    let mut exec = executor(FakePage::amazon(), model);

    let result = exec.execute_goal("Search for a dinosaur", None).await;

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some(NO_PLAN_ERROR));
    assert_eq!(result.steps_executed, 0);
    assert!(result.final_url.is_none());
    assert!(exec.page().actions().is_empty());
    assert_eq!(prompts.lock().unwrap().len(), 1);
    assert_eq!(exec.phase(), Phase::Failed);
}

#[tokio::test]
async fn empty_array_is_no_plan() {
    let (model, _) = ScriptedModel::replying("[]");
    let mut exec = executor(FakePage::amazon(), model);

    let result = exec.execute_goal("Do nothing", None).await;

    assert!(!result.success);
    assert!(!result.error.unwrap_or_default().is_empty());
    assert!(exec.page().actions().is_empty());
}

#[tokio::test]
async fn unknown_actions_fail_in_place() {
    let (model, _) = ScriptedModel::replying(
        r##"[{"action":"scroll","pixels":400},{"action":"click","selector":"#nav-search-submit-button"},{"action":"fill","selector":"#twotabsearchtextbox"}]"##,
    );
    let mut exec = executor(FakePage::amazon(), model);

    let result = exec.execute_goal("Scroll then search", None).await;

    assert!(result.success);
    assert_eq!(result.steps_executed, 3);
    assert_eq!(result.failed_steps, 2);
    assert_eq!(
        exec.page().actions(),
        vec!["click #nav-search-submit-button".to_string()]
    );
}

#[tokio::test]
async fn plan_order_is_followed_verbatim() {
    let (model, _) = ScriptedModel::replying(
        r##"[{"action":"fill","selector":"#twotabsearchtextbox","text":"t-rex"},{"action":"goto","url":"https://www.amazon.com/deals"},{"action":"wait","seconds":0}]"##,
    );
    let mut exec = executor(FakePage::amazon(), model);

    let result = exec.execute_goal("Find t-rex deals", None).await;

    assert!(result.success);
    assert_eq!(result.failed_steps, 0);
    assert_eq!(result.final_url.as_deref(), Some("https://www.amazon.com/deals"));
    assert_eq!(
        exec.page().actions(),
        vec![
            "fill #twotabsearchtextbox t-rex".to_string(),
            "goto https://www.amazon.com/deals".to_string(),
        ]
    );
}

#[tokio::test]
async fn unreachable_start_url_still_plans() {
    let (model, _) = ScriptedModel::replying(r##"[{"action":"wait","seconds":0}]"##);
    let mut exec = executor(FakePage::amazon(), model);

    let result = exec
        .execute_goal("Anything", Some("https://unreachable.example"))
        .await;

    assert!(result.success);
    assert_eq!(result.final_url.as_deref(), Some("about:blank"));
}

#[tokio::test]
async fn model_error_is_reported_as_failure() {
    let (model, _) = ScriptedModel::failing(529);
    let mut exec = executor(FakePage::amazon(), model);

    let result = exec.execute_goal("Search for a dinosaur", None).await;

    assert!(!result.success);
    let error = result.error.unwrap();
    assert!(error.starts_with("plan generation failed"), "{error}");
    assert!(error.contains("529"), "{error}");
    assert!(exec.page().actions().is_empty());
}

#[tokio::test]
async fn unreadable_page_fails_before_planning() {
    let (model, prompts) = ScriptedModel::replying("[]");
    let mut exec = executor(FakePage::amazon().unreadable(), model);

    let result = exec.execute_goal("Search for a dinosaur", None).await;

    assert!(!result.success);
    assert!(
        result
            .error
            .unwrap()
            .starts_with("could not read page context")
    );
    assert!(prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn single_steps_report_their_outcome() {
    let (model, _) = ScriptedModel::replying("[]");
    let exec = executor(FakePage::amazon(), model);

    assert!(
        exec.execute_step(&PlanStep::Fill {
            selector: "#twotabsearchtextbox".into(),
            text: "test".into(),
        })
        .await
    );
    assert!(exec.execute_step(&PlanStep::Wait { seconds: 0.0 }).await);
    assert!(
        exec.execute_step(&PlanStep::Click {
            selector: "#nav-search-submit-button".into(),
        })
        .await
    );
    assert!(
        !exec
            .execute_step(&PlanStep::Click {
                selector: "#missing".into(),
            })
            .await
    );
    assert!(!exec.execute_step(&PlanStep::Wait { seconds: -1.0 }).await);
    assert!(
        !exec
            .execute_step(&PlanStep::Unknown {
                action: "hover".into(),
            })
            .await
    );
    assert_eq!(exec.phase(), Phase::Idle);
}
