use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

const LOGIN: &str = r#"{
  "name": "login",
  "steps": [
    { "action_kind": "navigate", "value": "{{BASE_URL}}/login" },
    { "action_kind": "type", "selector_candidates": [{ "strategy": "id", "value": "user" }], "value": "{{USER}}" },
    { "action_kind": "type", "selector_candidates": [{ "strategy": "id", "value": "pass" }], "value": "{{PASS}}" },
    { "action_kind": "click", "selector_candidates": [
        { "strategy": "data-attribute", "value": "submit-btn" },
        { "strategy": "text", "value": "Log in" }
    ], "critical": true }
  ]
}"#;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("workflows")).unwrap();
        let config = format!(
            "workflows_dir: {:?}\nenv_file: {:?}\ninherit_process_env: false\noutput_dir: {:?}\nbrowser:\n  executable: {:?}\n  launch_timeout_ms: 2000\n",
            root.join("workflows").display().to_string(),
            root.join(".env").display().to_string(),
            root.join("runs").display().to_string(),
            root.join("no-such-chrome").display().to_string(),
        );
        fs::write(root.join("config.yaml"), config).unwrap();
        Self { dir }
    }

    fn workflow(&self, name: &str, body: &str) -> &Self {
        fs::write(
            self.dir.path().join("workflows").join(format!("{name}.json")),
            body,
        )
        .unwrap();
        self
    }

    fn env(&self, body: &str) -> &Self {
        fs::write(self.dir.path().join(".env"), body).unwrap();
        self
    }

    fn runs_dir(&self) -> PathBuf {
        self.dir.path().join("runs")
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("replayer").unwrap();
        cmd.current_dir(self.dir.path())
            .env_remove("RUST_LOG")
            .env_remove("REPLAYER_HEADLESS")
            .env_remove("REPLAYER_CHROME")
            .arg("--config")
            .arg(self.dir.path().join("config.yaml"));
        cmd
    }
}

fn json_stdout(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn list_prints_sorted_names() {
    let fx = Fixture::new();
    fx.workflow("signup", &LOGIN.replace("\"login\"", "\"signup\""))
        .workflow("login", LOGIN);

    let output = fx.cmd().args(["--output", "json", "list"]).output().unwrap();
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(json_stdout(&output), serde_json::json!(["login", "signup"]));

    let output = fx.cmd().arg("list").output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().collect::<Vec<_>>(), vec!["login", "signup"]);
}

#[test]
fn validate_maps_store_errors_to_exit_codes() {
    let fx = Fixture::new();
    fx.workflow("login", LOGIN)
        .workflow(
            "no-target",
            r#"{ "name": "no-target", "steps": [{ "action_kind": "click" }] }"#,
        )
        .workflow("garbled", "{ not json");

    let ok = fx.cmd().args(["validate", "login"]).output().unwrap();
    assert_eq!(ok.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&ok.stdout).contains("is valid (4 steps)"));

    let missing = fx.cmd().args(["validate", "ghost"]).output().unwrap();
    assert_eq!(missing.status.code(), Some(3));

    let invalid = fx.cmd().args(["validate", "no-target"]).output().unwrap();
    assert_eq!(invalid.status.code(), Some(4));
    assert!(String::from_utf8_lossy(&invalid.stderr).contains("selector candidate"));

    let garbled = fx.cmd().args(["validate", "garbled"]).output().unwrap();
    assert_eq!(garbled.status.code(), Some(4));
}

#[test]
fn inspect_reports_required_and_unresolved_variables() {
    let fx = Fixture::new();
    fx.workflow("login", LOGIN)
        .env("BASE_URL=https://app.example\nUSER=alice\n");

    let output = fx
        .cmd()
        .args(["--output", "json", "inspect", "login"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));

    let body = json_stdout(&output);
    assert_eq!(body["name"], "login");
    assert_eq!(body["steps"].as_array().unwrap().len(), 4);
    assert_eq!(
        body["required_variables"],
        serde_json::json!(["BASE_URL", "PASS", "USER"])
    );
    assert_eq!(body["unresolved"], serde_json::json!(["PASS"]));
}

#[test]
fn replay_with_missing_variable_exits_before_launch() {
    let fx = Fixture::new();
    fx.workflow("login", LOGIN)
        .env("BASE_URL=https://app.example\nUSER=alice\nPASS=\n");

    let output = fx
        .cmd()
        .args(["--output", "json", "replay", "login"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(5));

    let run = json_stdout(&output);
    assert_eq!(run["status"], "failed");
    assert_eq!(run["steps"].as_array().unwrap().len(), 0);
    assert_eq!(run["fatal_error"]["kind"], "missing_variable");
    assert_eq!(run["fatal_error"]["detail"], serde_json::json!(["PASS"]));
}

#[test]
fn replay_with_unlaunchable_browser_is_a_session_error() {
    let fx = Fixture::new();
    fx.workflow("login", LOGIN);

    let output = fx
        .cmd()
        .args(["--output", "json", "replay", "login", "--save"])
        .args(["-o", "BASE_URL=https://app.example", "-o", "USER=alice"])
        .args(["--override", "PASS=p=ss"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(6));

    let run = json_stdout(&output);
    assert_eq!(run["fatal_error"]["kind"], "session_error");
    assert_eq!(run["steps"].as_array().unwrap().len(), 0);

    let saved: Vec<_> = fs::read_dir(fx.runs_dir())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(saved.len(), 1);
    assert!(saved[0].starts_with("login-"));
    assert!(saved[0].ends_with(".json"));
}

#[test]
fn replay_of_unknown_workflow_exits_3() {
    let fx = Fixture::new();
    let output = fx.cmd().args(["replay", "ghost"]).output().unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("workflow 'ghost' not found"));
}

#[test]
fn malformed_override_is_a_usage_error() {
    let fx = Fixture::new();
    fx.workflow("login", LOGIN);
    let output = fx
        .cmd()
        .args(["replay", "login", "-o", "NOEQUALS"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn missing_explicit_config_is_a_usage_error() {
    let fx = Fixture::new();
    let output = Command::cargo_bin("replayer")
        .unwrap()
        .current_dir(fx.dir.path())
        .args(["--config", "absent.yaml", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}
