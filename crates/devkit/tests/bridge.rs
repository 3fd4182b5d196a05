#![cfg(unix)]

use std::sync::Arc;

use serde_json::{Value, json};

use devkit::{AppSettings, Toolbox, serve};
use devkit_exec::testing::ScriptedRunner;
use devkit_exec::{CommandSpec, ExecutionFailure, ExecutionResult, FailureKind};

const INSTALLED: &str = "       v16.20.2\n->     v18.17.0\n       v20.11.1\ndefault -> 18 (-> v18.17.0)\n";
const REMOTE: &str = "        v9.11.2\n       v10.24.1\n       v18.16.0\n       v18.17.0\n";
const REGISTRIES: &str = concat!(
    "* npm ---------- https://registry.npmjs.org/\n",
    "  yarn --------- https://registry.yarnpkg.com/\n",
);

/// Stands in for nvm, nrm and printenv. printenv echoes the overrides it
/// was started with, like a real child process would.
fn fake_tools(spec: &CommandSpec) -> Result<ExecutionResult, ExecutionFailure> {
    let args = spec.arguments().join(" ");
    let stdout = match (spec.program(), args.as_str()) {
        ("nvm", "ls --no-colors") => INSTALLED.to_string(),
        ("nvm", "ls-remote --no-colors") => REMOTE.to_string(),
        ("nvm", "current") => "v18.17.0\n".to_string(),
        ("nvm", "use 20") => "Now using node v20.11.1 (npm v10.2.4)\n".to_string(),
        ("nrm", "ls") => REGISTRIES.to_string(),
        ("printenv", "") => {
            let mut out = String::from("HOME=/home/dev\nSHELL=/bin/zsh\n");
            for (name, value) in spec.env_overrides() {
                if let Some(value) = value {
                    out.push_str(&format!("{name}={value}\n"));
                }
            }
            out
        }
        (program, _) => {
            return Err(ExecutionFailure::new(
                FailureKind::NotFound,
                format!("`{program}` was not found"),
            ));
        }
    };
    Ok(ExecutionResult::new(stdout, ""))
}

fn toolbox() -> Arc<Toolbox> {
    let settings = AppSettings {
        remote_fallback: false,
        nvm_path: Some("/opt/nvm".into()),
        ..AppSettings::default()
    };
    Arc::new(Toolbox::from_settings(
        &settings,
        Arc::new(ScriptedRunner::with_handler(fake_tools)),
    ))
}

async fn exchange(toolbox: Arc<Toolbox>, input: &str) -> Vec<Value> {
    let output = serve(toolbox, input.as_bytes(), Vec::new())
        .await
        .expect("bridge should run to EOF");

    String::from_utf8(output)
        .expect("responses should be UTF-8")
        .lines()
        .map(|line| serde_json::from_str(line).expect("each response line should be JSON"))
        .collect()
}

fn by_id(responses: &[Value], id: i64) -> &Value {
    responses
        .iter()
        .find(|response| response["id"] == json!(id))
        .unwrap_or_else(|| panic!("no response for id {id}"))
}

#[tokio::test]
async fn answers_every_request_with_its_id() {
    let input = concat!(
        r#"{"id": 1, "op": "list-installed-versions"}"#,
        "\n",
        r#"{"id": 2, "op": "list-registries"}"#,
        "\n",
        r#"{"id": 3, "op": "current-version"}"#,
        "\n",
    );

    let responses = exchange(toolbox(), input).await;

    assert_eq!(responses.len(), 3);
    assert_eq!(
        by_id(&responses, 1)["data"],
        json!([
            {"value": "v16.20.2", "is_current": false},
            {"value": "v18.17.0", "is_current": true},
            {"value": "v20.11.1", "is_current": false},
        ])
    );
    assert_eq!(by_id(&responses, 2)["data"][0]["name"], json!("npm"));
    assert_eq!(by_id(&responses, 2)["data"][0]["is_current"], json!(true));
    assert_eq!(by_id(&responses, 3)["data"], json!("v18.17.0"));
}

#[tokio::test]
async fn available_versions_are_newest_first() {
    let responses = exchange(
        toolbox(),
        "{\"id\": 1, \"op\": \"list-available-versions\"}\n",
    )
    .await;

    assert_eq!(
        responses[0]["data"],
        json!(["v18.17.0", "v18.16.0", "v10.24.1", "v9.11.2"])
    );
}

#[tokio::test]
async fn malformed_line_gets_null_id_and_the_rest_still_run() {
    let input = "this is not json\n\n{\"id\": 5, \"op\": \"current-version\"}\n";

    let responses = exchange(toolbox(), input).await;

    assert_eq!(responses.len(), 2);
    let rejected = responses
        .iter()
        .find(|response| response["id"].is_null())
        .expect("malformed line should be answered");
    assert_eq!(rejected["kind"], json!("invalid-request"));
    assert_eq!(by_id(&responses, 5)["data"], json!("v18.17.0"));
}

#[tokio::test]
async fn tool_failures_carry_a_kind() {
    let input = concat!(
        r#"{"id": 1, "op": "test-registry-speed", "name": "npm"}"#,
        "\n",
        r#"{"id": 2, "op": "install-version", "version": "18; rm -rf ~"}"#,
        "\n",
    );

    let responses = exchange(toolbox(), input).await;

    assert_eq!(by_id(&responses, 1)["kind"], json!("tool-not-found"));
    assert!(
        by_id(&responses, 1)["error"]
            .as_str()
            .is_some_and(|message| message.contains("nrm"))
    );
    assert_eq!(by_id(&responses, 2)["kind"], json!("invalid-input"));
}

#[tokio::test]
async fn switch_returns_raw_output() {
    let responses = exchange(
        toolbox(),
        "{\"id\": 1, \"op\": \"switch-version\", \"version\": \"20\"}\n",
    )
    .await;

    assert_eq!(
        responses[0]["data"]["stdout"],
        json!("Now using node v20.11.1 (npm v10.2.4)\n")
    );
    assert!(responses[0].get("warning").is_none());
}

#[tokio::test]
async fn repeated_listing_is_stable() {
    let toolbox = toolbox();

    let first = exchange(
        Arc::clone(&toolbox),
        "{\"id\": 1, \"op\": \"list-installed-versions\"}\n",
    )
    .await;
    let second = exchange(toolbox, "{\"id\": 1, \"op\": \"list-installed-versions\"}\n").await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn session_variable_shows_up_in_listing() {
    let toolbox = toolbox();

    let set = exchange(
        Arc::clone(&toolbox),
        r#"{"id": 1, "op": "set-env-variable", "name": "FOO", "value": "bar", "scope": "user"}"#,
    )
    .await;
    let listed = exchange(toolbox, r#"{"id": 2, "op": "list-env-variables"}"#).await;

    assert!(set[0]["warning"].is_string());
    let variables = listed[0]["data"]
        .as_array()
        .expect("listing should be an array");
    assert!(variables.contains(&json!({"name": "FOO", "value": "bar", "scope": "user"})));
    assert_eq!(variables[0]["scope"], json!("user"));
    assert_eq!(variables.last().map(|v| &v["name"]), Some(&json!("HOME")));
}
