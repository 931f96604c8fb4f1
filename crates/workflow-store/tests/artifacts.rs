use replayer_core_types::{ActionKind, StrategyTag};
use workflow_store::{FsWorkflowStore, StoreError, WorkflowStore};

const LOGIN: &str = r#"{
  "name": "login",
  "steps": [
    { "action_kind": "navigate", "selector_candidates": [], "value": "{{BASE_URL}}",
      "timeout_ms": null, "critical": null, "metadata": {} },
    { "action_kind": "type", "selector_candidates": [{"strategy": "id", "value": "user"}],
      "value": "{{USER}}", "timeout_ms": null, "critical": null, "metadata": {} },
    { "action_kind": "type", "selector_candidates": [{"strategy": "id", "value": "pass"}],
      "value": "{{PASS}}", "timeout_ms": null, "critical": null, "metadata": {} },
    { "action_kind": "click", "selector_candidates": [{"strategy": "data-attribute", "value": "submit-btn"}],
      "value": null, "timeout_ms": null, "critical": null, "metadata": {"label": "Log in"} }
  ]
}"#;

fn store_with(files: &[(&str, &str)]) -> (tempfile::TempDir, FsWorkflowStore) {
    let dir = tempfile::tempdir().unwrap();
    for (name, body) in files {
        std::fs::write(dir.path().join(format!("{name}.json")), body).unwrap();
    }
    let store = FsWorkflowStore::new(dir.path());
    (dir, store)
}

#[tokio::test]
async fn loads_recorded_login_workflow() {
    let (_dir, store) = store_with(&[("login", LOGIN)]);
    let workflow = store.load("login").await.unwrap();

    assert_eq!(workflow.name, "login");
    let kinds: Vec<ActionKind> = workflow.steps.iter().map(|s| s.action_kind).collect();
    assert_eq!(
        kinds,
        vec![
            ActionKind::Navigate,
            ActionKind::Type,
            ActionKind::Type,
            ActionKind::Click
        ]
    );
    assert_eq!(
        workflow.steps[3].selector_candidates[0].strategy,
        StrategyTag::DataAttribute
    );
    assert_eq!(workflow.steps[3].label(), Some("Log in"));
}

#[tokio::test]
async fn empty_selector_list_for_click_is_malformed() {
    let body = r#"{"name": "c", "steps": [{"action_kind": "click", "selector_candidates": []}]}"#;
    let (_dir, store) = store_with(&[("c", body)]);
    match store.load("c").await {
        Err(StoreError::Malformed { name, reason }) => {
            assert_eq!(name, "c");
            assert!(reason.contains("selector candidate"));
        }
        other => panic!("expected malformed, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_steps_field_is_malformed() {
    let (_dir, store) = store_with(&[("nosteps", r#"{"name": "nosteps"}"#)]);
    assert!(matches!(
        store.load("nosteps").await,
        Err(StoreError::Malformed { .. })
    ));
}

#[tokio::test]
async fn unknown_strategy_is_malformed() {
    let body = r#"{"name": "s", "steps": [{"action_kind": "click",
        "selector_candidates": [{"strategy": "aria", "value": "button"}]}]}"#;
    let (_dir, store) = store_with(&[("s", body)]);
    assert!(matches!(store.load("s").await, Err(StoreError::Malformed { .. })));
}

#[tokio::test]
async fn zero_step_workflow_is_valid() {
    let (_dir, store) = store_with(&[("noop", r#"{"name": "noop", "steps": []}"#)]);
    let workflow = store.load("noop").await.unwrap();
    assert!(workflow.is_empty());
    assert_eq!(store.list().await.unwrap(), vec!["noop"]);
}
