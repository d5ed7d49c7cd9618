//! Claude Code session parser
//!
//! Parses JSONL transcripts from ~/.claude/projects/{project}/{session}.jsonl.
//! Each line is one event; only user/assistant turns with text are kept.

use super::{parse_timestamp_str, ExtractOptions, Role, SessionMessage};
use rayon::prelude::*;
use serde::Deserialize;
use serde_json::Value;
use std::io::{BufRead, BufReader};
use std::path::Path;

const SOURCE: &str = "claude";

/// One line of a Claude Code transcript
#[derive(Debug, Deserialize)]
struct ClaudeLine {
    #[serde(rename = "type")]
    entry_type: Option<String>,
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
    timestamp: Option<String>,
    message: Option<Value>,
}

fn is_turn_type(value: Option<&str>) -> bool {
    matches!(value, Some("user") | Some("assistant"))
}

/// Flatten message content into plain text
pub fn extract_text(content: &Value, options: &ExtractOptions) -> String {
    let items = match content {
        Value::String(s) => return s.clone(),
        Value::Array(items) => items,
        _ => return String::new(),
    };

    let mut parts: Vec<String> = Vec::new();
    for item in items.iter().filter_map(Value::as_object) {
        match item.get("type").and_then(Value::as_str) {
            Some("text") => {
                let text = match item.get("text").and_then(Value::as_str) {
                    Some(t) if !t.is_empty() => t,
                    _ => continue,
                };
                if options.rejects_text_item(text) {
                    continue;
                }
                parts.push(text.to_string());
            }
            Some("tool_result") if options.include_tool_output => {
                let output = match item.get("content") {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Array(children)) => children
                        .iter()
                        .filter_map(Value::as_object)
                        .flat_map(|child| {
                            ["text", "content"]
                                .into_iter()
                                .filter_map(|key| child.get(key).and_then(Value::as_str))
                        })
                        .collect::<Vec<_>>()
                        .join("\n"),
                    _ => String::new(),
                };
                if let Some(formatted) = options.format_tool_output(&output) {
                    parts.push(formatted);
                }
            }
            _ => {}
        }
    }
    parts.join("\n")
}

/// Names of the tools an assistant message invoked
pub fn extract_tools(content: &Value) -> Vec<String> {
    content
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .filter(|item| item.get("type").and_then(Value::as_str) == Some("tool_use"))
                .filter_map(|item| item.get("name").and_then(Value::as_str))
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_line(line: &str, options: &ExtractOptions) -> Option<SessionMessage> {
    let mut bytes = line.as_bytes().to_vec();
    let entry: ClaudeLine = simd_json::from_slice(&mut bytes).ok()?;

    if !options.include_system && !is_turn_type(entry.entry_type.as_deref()) {
        return None;
    }

    let message = entry.message.as_ref()?.as_object()?;
    let role_str = message.get("role").and_then(Value::as_str);
    if !options.include_system && !is_turn_type(role_str) {
        return None;
    }
    let role = Role::parse(role_str);

    let content = message.get("content").unwrap_or(&Value::Null);
    let text = extract_text(content, options);
    if options.rejects_text(&text) {
        return None;
    }

    let model = message
        .get("model")
        .and_then(Value::as_str)
        .map(str::to_string);
    let tools = if role == Role::Assistant {
        extract_tools(content)
    } else {
        Vec::new()
    };

    Some(SessionMessage {
        source: SOURCE,
        session_id: entry.session_id.unwrap_or_else(|| "unknown".to_string()),
        role,
        text,
        time: entry.timestamp.as_deref().and_then(parse_timestamp_str),
        title: None,
        provider: model.as_ref().map(|_| SOURCE.to_string()),
        model,
        agent: None,
        mode: None,
        tools,
    })
}

/// Parse one Claude Code JSONL transcript
pub fn parse_claude_file(path: &Path, options: &ExtractOptions) -> Vec<SessionMessage> {
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(err) => {
            tracing::debug!("skipping {}: {}", path.display(), err);
            return Vec::new();
        }
    };

    let reader = BufReader::new(file);
    let mut messages = Vec::new();
    let mut skipped = 0usize;

    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => continue,
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match parse_line(trimmed, options) {
            Some(msg) => messages.push(msg),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::debug!("{}: skipped {} records", path.display(), skipped);
    }
    messages
}

/// Parse every transcript under `root`, keeping scan order
pub fn load_claude_messages(root: &Path, options: &ExtractOptions) -> Vec<SessionMessage> {
    let files = crate::scanner::scan_claude(root, options.include_subagents);
    tracing::debug!("found {} Claude transcripts under {}", files.len(), root.display());

    let per_file: Vec<Vec<SessionMessage>> = files
        .par_iter()
        .map(|path| parse_claude_file(path, options))
        .collect();
    per_file.into_iter().flatten().collect()
}
