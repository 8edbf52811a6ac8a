//! Integration tests for `tuneline finetune`, `status`, `runs` and `report`
//! against a local mock of the OpenAI and grading endpoints.

use assert_cmd::Command;
use mockito::{Matcher, Server};
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const ENV_VARS: [&str; 7] = [
    "OPENAI_API_KEY",
    "API_KEY",
    "TUNELINE_OPENAI_BASE_URL",
    "TUNELINE_REPORT_URL",
    "TUNELINE_DATASET_URL",
    "TUNELINE_BASE_MODEL",
    "TUNELINE_MODEL",
];

fn tuneline(workspace: &Path) -> Command {
    let config = workspace.join("tuneline.toml");
    if !config.exists() {
        std::fs::write(&config, "").unwrap();
    }
    let mut cmd = Command::cargo_bin("tuneline").unwrap();
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.current_dir(workspace).arg("--config").arg(&config).arg("--workspace").arg(workspace);
    cmd
}

/// Same as `tuneline`, pointed at `server` with test credentials.
fn tuneline_against(workspace: &Path, server: &mockito::ServerGuard) -> Command {
    let mut cmd = tuneline(workspace);
    cmd.env("OPENAI_API_KEY", "sk-test")
        .env("API_KEY", "report-key")
        .env("TUNELINE_OPENAI_BASE_URL", format!("{}/v1", server.url()))
        .env("TUNELINE_REPORT_URL", format!("{}/report", server.url()));
    cmd
}

fn prepare(workspace: &Path) {
    let data = workspace.join("data");
    std::fs::create_dir_all(&data).unwrap();
    std::fs::write(data.join("correct.txt"), "1,2,3\n").unwrap();
    std::fs::write(data.join("incorect.txt"), "7,8,9\n").unwrap();
    std::fs::write(data.join("verify.txt"), "number=1,2,3\n\nnumber=9,9,9\n").unwrap();
    tuneline(workspace).arg("prepare").arg("--skip-download").assert().success();
}

fn job_body(status: &str, model: Option<&str>) -> String {
    serde_json::json!({
        "id": "ftjob-1",
        "status": status,
        "model": "gpt-4o-mini-2024-07-18",
        "created_at": 1_700_000_000,
        "fine_tuned_model": model,
        "trained_tokens": model.map(|_| 1234),
    })
    .to_string()
}

#[test]
fn test_finetune_requires_openai_key() {
    let temp_dir = TempDir::new().unwrap();
    prepare(temp_dir.path());

    tuneline(temp_dir.path())
        .arg("finetune")
        .assert()
        .failure()
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}

#[test]
fn test_finetune_requires_prepared_dataset() {
    let temp_dir = TempDir::new().unwrap();
    let server = Server::new();

    tuneline_against(temp_dir.path(), &server)
        .arg("finetune")
        .assert()
        .failure()
        .stderr(predicate::str::contains("tuneline prepare"));
}

#[test]
fn test_finetune_then_report() {
    let temp_dir = TempDir::new().unwrap();
    prepare(temp_dir.path());
    let mut server = Server::new();

    let upload = server
        .mock("POST", "/v1/files")
        .match_header("authorization", "Bearer sk-test")
        .with_status(200)
        .with_body(r#"{"id":"file-abc","filename":"training.jsonl","purpose":"fine-tune"}"#)
        .create();
    let create = server
        .mock("POST", "/v1/fine_tuning/jobs")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "training_file": "file-abc",
            "model": "gpt-4o-mini-2024-07-18"
        })))
        .with_status(200)
        .with_body(job_body("validating_files", None))
        .create();
    let retrieve = server
        .mock("GET", "/v1/fine_tuning/jobs/ftjob-1")
        .with_status(200)
        .with_body(job_body("succeeded", Some("ft:gpt-4o-mini:tuneline")))
        .create();

    tuneline_against(temp_dir.path(), &server)
        .arg("finetune")
        .arg("--interval-secs")
        .arg("0")
        .assert()
        .success()
        .stdout(predicate::str::contains("[finetune:ftjob-1] submitted"))
        .stdout(predicate::str::contains("ft:gpt-4o-mini:tuneline"));

    upload.assert();
    create.assert();
    retrieve.assert();

    let assert = tuneline(temp_dir.path()).arg("runs").arg("--json").assert().success();
    let runs: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(runs[0]["job_id"], "ftjob-1");
    assert_eq!(runs[0]["status"], "succeeded");
    assert_eq!(runs[0]["fine_tuned_model"], "ft:gpt-4o-mini:tuneline");
    assert_eq!(runs[0]["trained_tokens"], 1234);

    let positive = server
        .mock("POST", "/v1/chat/completions")
        .match_body(Matcher::PartialJson(serde_json::json!({ "model": "ft:gpt-4o-mini:tuneline" })))
        .with_status(200)
        .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"1"}}]}"#)
        .expect(2)
        .create();

    // verify.txt line 2 is blank, so the two records answer for lines 1 and 3
    tuneline_against(temp_dir.path(), &server)
        .arg("report")
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""task": "research""#))
        .stdout(predicate::str::contains(r#""apikey": "***""#))
        .stdout(predicate::str::contains("\"01\""))
        .stdout(predicate::str::contains("\"03\""))
        .stdout(predicate::str::contains("\"02\"").not());

    positive.assert();
}

#[test]
fn test_failed_job_exits_nonzero() {
    let temp_dir = TempDir::new().unwrap();
    prepare(temp_dir.path());
    let mut server = Server::new();

    let _upload = server.mock("POST", "/v1/files").with_status(200).with_body(r#"{"id":"file-abc"}"#).create();
    let _create = server.mock("POST", "/v1/fine_tuning/jobs").with_status(200).with_body(job_body("queued", None)).create();
    let _retrieve = server
        .mock("GET", "/v1/fine_tuning/jobs/ftjob-1")
        .with_status(200)
        .with_body(
            serde_json::json!({
                "id": "ftjob-1",
                "status": "failed",
                "error": { "code": "invalid_training_file", "message": "bad line 3" }
            })
            .to_string(),
        )
        .create();

    tuneline_against(temp_dir.path(), &server)
        .arg("finetune")
        .arg("--interval-secs")
        .arg("0")
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad line 3"));

    let assert = tuneline(temp_dir.path()).arg("runs").arg("--json").assert().success();
    let runs: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(runs[0]["status"], "failed");
}

#[test]
fn test_poll_limit_stops_waiting() {
    let temp_dir = TempDir::new().unwrap();
    prepare(temp_dir.path());
    let mut server = Server::new();

    let _upload = server.mock("POST", "/v1/files").with_status(200).with_body(r#"{"id":"file-abc"}"#).create();
    let _create = server.mock("POST", "/v1/fine_tuning/jobs").with_status(200).with_body(job_body("queued", None)).create();
    let retrieve = server
        .mock("GET", "/v1/fine_tuning/jobs/ftjob-1")
        .with_status(200)
        .with_body(job_body("running", None))
        .expect(2)
        .create();

    tuneline_against(temp_dir.path(), &server)
        .arg("finetune")
        .arg("--interval-secs")
        .arg("0")
        .arg("--max-attempts")
        .arg("2")
        .assert()
        .failure()
        .stderr(predicate::str::contains("still running after 2 polls"));

    retrieve.assert();
}

#[test]
fn test_status_reports_remote_state() {
    let temp_dir = TempDir::new().unwrap();
    let mut server = Server::new();
    let _retrieve = server
        .mock("GET", "/v1/fine_tuning/jobs/ftjob-1")
        .with_status(200)
        .with_body(job_body("running", None))
        .create();

    let assert = tuneline_against(temp_dir.path(), &server)
        .arg("status")
        .arg("ftjob-1")
        .arg("--json")
        .assert()
        .success();
    let handle: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(handle["id"], "ftjob-1");
    assert_eq!(handle["status"], "running");
}

#[test]
fn test_report_without_model_fails() {
    let temp_dir = TempDir::new().unwrap();
    prepare(temp_dir.path());
    let server = Server::new();

    tuneline_against(temp_dir.path(), &server)
        .arg("report")
        .arg("--dry-run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No fine-tuned model available"));
}

#[test]
fn test_report_submits_answer() {
    let temp_dir = TempDir::new().unwrap();
    prepare(temp_dir.path());
    let mut server = Server::new();

    let _chat = server
        .mock("POST", "/v1/chat/completions")
        .match_body(Matcher::Regex("9,9,9".to_string()))
        .with_status(200)
        .with_body(r#"{"choices":[{"message":{"content":"1"}}]}"#)
        .create();
    let _chat_negative = server
        .mock("POST", "/v1/chat/completions")
        .match_body(Matcher::Regex("1,2,3".to_string()))
        .with_status(200)
        .with_body(r#"{"choices":[{"message":{"content":"0"}}]}"#)
        .create();
    let report = server
        .mock("POST", "/report")
        .match_body(Matcher::Json(serde_json::json!({
            "task": "research",
            "apikey": "report-key",
            "answer": ["03"]
        })))
        .with_status(200)
        .with_body(r#"{"code":0,"message":"OK"}"#)
        .create();

    tuneline_against(temp_dir.path(), &server)
        .arg("report")
        .arg("--model")
        .arg("ft:given")
        .assert()
        .success()
        .stdout(predicate::str::contains("Report submitted"));

    report.assert();
}

#[test]
fn test_report_checks_grading_key_before_inference() {
    let temp_dir = TempDir::new().unwrap();
    prepare(temp_dir.path());
    let mut server = Server::new();

    let chat = server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_body(r#"{"choices":[{"message":{"content":"1"}}]}"#)
        .expect(0)
        .create();

    tuneline(temp_dir.path())
        .env("OPENAI_API_KEY", "sk-test")
        .env("TUNELINE_OPENAI_BASE_URL", format!("{}/v1", server.url()))
        .arg("report")
        .arg("--model")
        .arg("ft:given")
        .assert()
        .failure()
        .stderr(predicate::str::contains("API_KEY"));

    chat.assert();
}
