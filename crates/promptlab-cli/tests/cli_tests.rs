use assert_cmd::Command;
use predicates::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// ── Fixture helpers ────────────────────────────────────────────────────────

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Create a temporary home with Claude Code and OpenCode session logs.
///
/// Layout:
///   <tmp>/.claude/projects/app/c1.jsonl                 (2 pairs, 2025-01-01)
///   <tmp>/.local/share/opencode/storage/message/ses_1/  (1 pair, 2024-06-15)
///   <tmp>/.local/share/opencode/storage/part/msg_*/     (text parts)
fn create_session_fixture() -> TempDir {
    let tmp = TempDir::new().expect("failed to create temp dir");
    let base = tmp.path();

    let claude = [
        r#"{"type":"user","sessionId":"c1","timestamp":"2025-01-01T10:00:00Z","message":{"role":"user","content":"You must always run the tests before committing."}}"#,
        r#"{"type":"assistant","sessionId":"c1","timestamp":"2025-01-01T10:00:05Z","message":{"role":"assistant","model":"claude-sonnet-4","content":[{"type":"text","text":"Understood, I will run them."}]}}"#,
        r#"{"type":"user","sessionId":"c1","timestamp":"2025-01-01T10:01:00Z","message":{"role":"user","content":"/review the parser module"}}"#,
        r#"{"type":"assistant","sessionId":"c1","timestamp":"2025-01-01T10:01:30Z","message":{"role":"assistant","model":"claude-sonnet-4","content":[{"type":"text","text":"The parser looks fine."},{"type":"tool_use","name":"Read","input":{}}]}}"#,
        "not json at all",
    ]
    .join("\n");
    write(&base.join(".claude/projects/app/c1.jsonl"), &claude);

    let storage = base.join(".local/share/opencode/storage");
    write(
        &storage.join("session/app/ses_1.json"),
        r#"{"id":"ses_1","title":"Fix CI","directory":"/work/app"}"#,
    );
    // 2024-06-15 12:00:00 UTC = 1718452800000 ms
    write(
        &storage.join("message/ses_1/msg_1.json"),
        r#"{"id":"msg_1","sessionID":"ses_1","role":"user","time":{"created":1718452800000}}"#,
    );
    write(
        &storage.join("message/ses_1/msg_2.json"),
        r#"{
            "id": "msg_2",
            "sessionID": "ses_1",
            "role": "assistant",
            "modelID": "gpt-5.2-codex",
            "providerID": "openai",
            "mode": "build",
            "tokens": { "input": 1000000, "output": 2000, "reasoning": 10, "cache": { "read": 0, "write": 0 } },
            "path": { "root": "/work/app" },
            "time": { "created": 1718452805000 }
        }"#,
    );
    write(
        &storage.join("part/msg_1/prt_1.json"),
        r#"{"type":"text","text":"why is CI red?"}"#,
    );
    write(
        &storage.join("part/msg_2/prt_1.json"),
        r#"{"type":"text","text":"A feature flag is missing."}"#,
    );
    tmp
}

/// Build a Command rooted in the temp dir with HOME, data and config dirs pointing into it.
fn cmd_in(tmp: &Path) -> Command {
    let mut cmd = Command::cargo_bin("promptlab").unwrap();
    cmd.current_dir(tmp)
        .env("HOME", tmp)
        .env("XDG_DATA_HOME", tmp.join(".local/share"))
        .env("XDG_CONFIG_HOME", tmp.join(".config"))
        .env_remove("CLAUDE_CONFIG_DIR")
        .env_remove("PROMPTLAB_CLAUDE_DIR")
        .env_remove("PROMPTLAB_OPENCODE_DIR")
        .env_remove("PROMPTLAB_OUTPUT_DIR")
        .env_remove("RUST_LOG");
    cmd
}

fn export(tmp: &Path) {
    cmd_in(tmp)
        .args(["export", "--no-spinner"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 3 prompt/answer pairs"));
}

fn read_lines(path: &Path) -> Vec<serde_json::Value> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

/// File name -> contents for every file directly under `dir`
fn snapshot(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.is_file())
        .map(|path| {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            (name, fs::read(&path).unwrap())
        })
        .collect()
}

// ── Help and parsing ───────────────────────────────────────────────────────

#[test]
fn test_help_command() {
    let mut cmd = Command::cargo_bin("promptlab").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Prompt/answer datasets"));
}

#[test]
fn test_version_flag() {
    let mut cmd = Command::cargo_bin("promptlab").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("promptlab"));
}

#[test]
fn test_export_help_describes_include_system() {
    let mut cmd = Command::cargo_bin("promptlab").unwrap();
    cmd.args(["export", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "records and messages whose type or role is not user/assistant",
        ));
}

#[test]
fn test_invalid_command() {
    let mut cmd = Command::cargo_bin("promptlab").unwrap();
    cmd.arg("frobnicate").assert().failure();
}

#[test]
fn test_report_rejects_unknown_format() {
    let tmp = TempDir::new().unwrap();
    cmd_in(tmp.path())
        .args(["report", "--format", "pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pdf"));
}

// ── Export ─────────────────────────────────────────────────────────────────

#[test]
fn test_export_writes_pairs() {
    let tmp = create_session_fixture();
    export(tmp.path());

    let pairs = read_lines(&tmp.path().join("output/pairs.jsonl"));
    assert_eq!(pairs.len(), 3);

    let opencode = pairs
        .iter()
        .find(|p| p["source"] == "opencode")
        .expect("opencode pair");
    assert_eq!(opencode["prompt"], "why is CI red?");
    assert_eq!(opencode["answer"], "A feature flag is missing.");
    assert_eq!(opencode["session_title"], "Fix CI");
    assert_eq!(opencode["answer_model"], "gpt-5.2-codex");
    assert_eq!(opencode["answer_mode"], "build");

    let claude: Vec<_> = pairs.iter().filter(|p| p["source"] == "claude").collect();
    assert_eq!(claude.len(), 2);
    assert!(claude.iter().all(|p| p["total_tokens"].as_u64().unwrap() > 0));
    assert!(claude
        .iter()
        .any(|p| p["answer_tools"] == serde_json::json!(["Read"])));
}

#[test]
fn test_export_custom_dirs_and_out() {
    let tmp = create_session_fixture();
    cmd_in(tmp.path())
        .args([
            "export",
            "--no-spinner",
            "--claude-dir",
            "nowhere",
            "--out",
            "custom/pairs.jsonl",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 1 prompt/answer pairs"));
    assert!(tmp.path().join("custom/pairs.jsonl").exists());
}

#[test]
fn test_export_respects_settings_output_dir() {
    let tmp = create_session_fixture();
    write(
        &tmp.path().join(".config/promptlab/settings.json"),
        r#"{"outputDir":"from-settings"}"#,
    );
    export(tmp.path());
    assert!(tmp.path().join("from-settings/pairs.jsonl").exists());
    assert!(!tmp.path().join("output/pairs.jsonl").exists());
}

#[test]
fn test_export_env_overrides_settings() {
    let tmp = create_session_fixture();
    write(
        &tmp.path().join(".config/promptlab/settings.json"),
        r#"{"outputDir":"from-settings"}"#,
    );
    cmd_in(tmp.path())
        .env("PROMPTLAB_OUTPUT_DIR", tmp.path().join("from-env"))
        .args(["export", "--no-spinner"])
        .assert()
        .success();
    assert!(tmp.path().join("from-env/pairs.jsonl").exists());
}

#[test]
fn test_export_is_idempotent() {
    let tmp = create_session_fixture();
    export(tmp.path());
    let first = fs::read(tmp.path().join("output/pairs.jsonl")).unwrap();
    export(tmp.path());
    let second = fs::read(tmp.path().join("output/pairs.jsonl")).unwrap();
    assert_eq!(first, second);
    assert_eq!(snapshot(&tmp.path().join("output")).len(), 1);
}

// ── Chunk ──────────────────────────────────────────────────────────────────

#[test]
fn test_chunk_respects_max_pairs() {
    let tmp = create_session_fixture();
    export(tmp.path());

    cmd_in(tmp.path())
        .args(["chunk", "--max-pairs", "2", "--include-times"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 2 chunks"));

    let chunks = read_lines(&tmp.path().join("output/chunks.jsonl"));
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0]["chunk_id"], 1);
    assert_eq!(chunks[0]["pair_count"], 2);
    assert_eq!(chunks[1]["pair_count"], 1);
    let prompt = chunks[0]["prompt"].as_str().unwrap();
    assert!(prompt.contains("PAIR 1:"));
    assert!(prompt.contains("prompt_time:"));
    assert!(chunks[0].get("created_at").is_none());
}

#[test]
fn test_chunk_is_idempotent() {
    let tmp = create_session_fixture();
    export(tmp.path());

    cmd_in(tmp.path()).arg("chunk").assert().success();
    let first = fs::read(tmp.path().join("output/chunks.jsonl")).unwrap();
    cmd_in(tmp.path()).arg("chunk").assert().success();
    let second = fs::read(tmp.path().join("output/chunks.jsonl")).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_chunk_rejects_zero_max_pairs() {
    let tmp = create_session_fixture();
    export(tmp.path());
    cmd_in(tmp.path())
        .args(["chunk", "--max-pairs", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_pairs"));
}

#[test]
fn test_chunk_without_pairs_fails() {
    let tmp = TempDir::new().unwrap();
    write(&tmp.path().join("output/pairs.jsonl"), "\n");
    cmd_in(tmp.path())
        .arg("chunk")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No pairs found"));
}

// ── Stats and report ───────────────────────────────────────────────────────

#[test]
fn test_stats_writes_tables_and_charts() {
    let tmp = create_session_fixture();
    export(tmp.path());

    cmd_in(tmp.path())
        .args(["stats", "--out-dir", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("stats files"));

    let out = tmp.path().join("stats");
    for name in [
        "messages_per_session.csv",
        "messages_per_session.svg",
        "messages_per_day.csv",
        "messages_per_day.svg",
        "pairs_per_model.csv",
        "pairs_per_source.svg",
        "tokens_per_session.csv",
        "tokens_per_model.csv",
    ] {
        assert!(out.join(name).exists(), "missing {}", name);
    }

    let days = fs::read_to_string(out.join("messages_per_day.csv")).unwrap();
    assert_eq!(days, "day,pairs\n2024-06-15,1\n2025-01-01,2\n");
    let sessions = fs::read_to_string(out.join("messages_per_session.csv")).unwrap();
    assert!(sessions.starts_with("session_id,pairs\nc1,2\n"));
}

#[test]
fn test_stats_is_idempotent() {
    let tmp = create_session_fixture();
    export(tmp.path());
    let out = tmp.path().join("stats");

    cmd_in(tmp.path()).args(["stats", "--out-dir", "stats"]).assert().success();
    let first = snapshot(&out);
    cmd_in(tmp.path()).args(["stats", "--out-dir", "stats"]).assert().success();
    let second = snapshot(&out);

    assert!(first.keys().any(|name| name.ends_with(".csv")));
    assert!(first.keys().any(|name| name.ends_with(".svg")));
    if cfg!(feature = "png") {
        assert!(first.contains_key("messages_per_day.png"));
    }
    assert!(!first.keys().any(|name| name.ends_with(".tmp")));
    assert_eq!(first, second);
}

#[test]
fn test_stats_json_summary() {
    let tmp = create_session_fixture();
    export(tmp.path());

    let output = cmd_in(tmp.path())
        .args(["stats", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["pairs"], 3);
    assert_eq!(json["sessions"], 2);
    assert_eq!(json["days"], 2);
    assert_eq!(json["topSessions"][0]["key"], "c1");
    assert!(json["totals"]["estimated_cost"].as_f64().unwrap() >= 0.0);
}

#[test]
fn test_report_html_embeds_stats_charts() {
    let tmp = create_session_fixture();
    export(tmp.path());
    cmd_in(tmp.path()).arg("stats").assert().success();

    cmd_in(tmp.path())
        .arg("report")
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote lab report"));

    let html = fs::read_to_string(tmp.path().join("output/report.html")).unwrap();
    assert!(html.contains("Lab Report: Prompt/Answer Dataset"));
    assert!(html.contains(r#"<img src="messages_per_session.svg""#));
    assert!(html.contains("/review"));
    assert!(html.contains("you must always run the tests before committing"));
}

#[test]
fn test_report_markdown_default_path() {
    let tmp = create_session_fixture();
    export(tmp.path());

    cmd_in(tmp.path())
        .args(["report", "--format", "md"])
        .assert()
        .success();

    let md = fs::read_to_string(tmp.path().join("output/report.md")).unwrap();
    assert!(md.starts_with("# Lab Report: Prompt/Answer Dataset"));
    assert!(md.contains("- Total prompt/answer pairs: 3"));
    assert!(md.contains("## Activity Over Time (pairs/day)"));
    assert!(md.contains("- c1 | 2"));
}

// ── Usage ──────────────────────────────────────────────────────────────────

#[test]
fn test_usage_writes_latest_and_stamped_reports() {
    let tmp = create_session_fixture();
    cmd_in(tmp.path())
        .args(["usage", "--out-dir", "reports"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Report saved"))
        .stdout(predicate::str::contains("openai/gpt-5.2-codex"));

    let reports = tmp.path().join("reports");
    let html = fs::read_to_string(reports.join("latest.html")).unwrap();
    assert!(html.contains("Token Usage by Model"));
    assert!(html.contains("gpt-5.2-codex"));
    assert!(html.contains("$1.78"));

    let stamped: Vec<_> = fs::read_dir(&reports)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("report_") && name.ends_with(".html"))
        .collect();
    assert_eq!(stamped.len(), 1);
}

#[test]
fn test_usage_without_token_data_fails() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join(".local/share/opencode/storage/message")).unwrap();
    cmd_in(tmp.path())
        .arg("usage")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No assistant messages"));
}

// ── Sources ────────────────────────────────────────────────────────────────

#[test]
fn test_sources_command() {
    let tmp = create_session_fixture();
    cmd_in(tmp.path())
        .arg("sources")
        .assert()
        .success()
        .stdout(predicate::str::contains("Claude Code"))
        .stdout(predicate::str::contains("OpenCode"));
}

#[test]
fn test_sources_json() {
    let tmp = create_session_fixture();
    let output = cmd_in(tmp.path())
        .args(["sources", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();

    let sources = json["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0]["source"], "claude");
    assert_eq!(sources[0]["exists"], true);
    assert_eq!(sources[0]["files"], 1);
    assert_eq!(sources[1]["source"], "opencode");
    assert_eq!(sources[1]["files"], 2);
    assert!(sources[1]["database"].is_null());
    assert!(json.get("settingsPath").is_some());
}
