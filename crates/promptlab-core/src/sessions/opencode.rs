//! OpenCode session parser
//!
//! Parses messages from:
//! - SQLite database (OpenCode 1.2+): ~/.local/share/opencode/opencode.db
//! - Legacy JSON files: ~/.local/share/opencode/storage/{session,message,part}/

use super::{timestamp_from_millis, ExtractOptions, Role, SessionMessage};
use crate::error::Result;
use crate::scanner::OpenCodeLayout;
use rayon::prelude::*;
use rusqlite::{Connection, OpenFlags};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

const SOURCE: &str = "opencode";

/// OpenCode message structure (from JSON files and SQLite data column)
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct OpenCodeMessage {
    pub id: Option<String>,
    #[serde(rename = "sessionID")]
    pub session_id: Option<String>,
    pub role: Option<String>,
    #[serde(rename = "modelID")]
    pub model_id: Option<String>,
    #[serde(rename = "providerID")]
    pub provider_id: Option<String>,
    /// Newer messages nest `{modelID, providerID}` here
    pub model: Option<Value>,
    pub agent: Option<String>,
    pub mode: Option<String>,
    pub time: Option<OpenCodeTime>,
    pub tokens: Option<OpenCodeTokens>,
    pub cost: Option<f64>,
    pub path: Option<OpenCodePath>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct OpenCodeTime {
    pub created: Option<f64>, // Unix timestamp in milliseconds
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OpenCodeTokens {
    pub input: i64,
    pub output: i64,
    pub reasoning: i64,
    pub cache: OpenCodeCache,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OpenCodeCache {
    pub read: i64,
    pub write: i64,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct OpenCodePath {
    pub root: Option<String>,
}

/// One message part (text, tool call, ...)
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct OpenCodePart {
    #[serde(rename = "type")]
    pub part_type: Option<String>,
    pub text: Option<Value>,
    pub state: Option<Value>,
}

/// Session metadata
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OpenCodeSession {
    pub id: Option<String>,
    pub directory: Option<String>,
    pub title: Option<String>,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|s| !s.is_empty()).map(str::to_string)
}

impl OpenCodeMessage {
    pub fn from_slice(bytes: &mut [u8]) -> Option<Self> {
        simd_json::from_slice(bytes).ok()
    }

    pub fn from_file(path: &Path) -> Option<Self> {
        let mut bytes = std::fs::read(path).ok()?;
        Self::from_slice(&mut bytes)
    }

    pub fn is_assistant(&self) -> bool {
        self.role.as_deref() == Some("assistant")
    }

    /// Model and provider, preferring the flat fields over the nested `model` object
    pub fn model_and_provider(&self) -> (Option<String>, Option<String>) {
        let model = non_empty(self.model_id.as_deref());
        let provider = non_empty(self.provider_id.as_deref());
        if model.is_some() {
            return (model, provider);
        }
        match &self.model {
            Some(Value::Object(nested)) => (
                nested.get("modelID").and_then(Value::as_str).map(str::to_string),
                nested.get("providerID").and_then(Value::as_str).map(str::to_string),
            ),
            _ => (None, provider),
        }
    }

    pub fn created_ms(&self) -> Option<i64> {
        self.time
            .as_ref()
            .and_then(|t| t.created)
            .filter(|ms| ms.is_finite() && *ms > 0.0)
            .map(|ms| ms as i64)
    }

    pub fn project_root(&self) -> Option<&str> {
        self.path
            .as_ref()
            .and_then(|p| p.root.as_deref())
            .filter(|root| !root.is_empty())
    }
}

/// Concatenate the readable parts of one message
pub fn parts_text<'a>(
    parts: impl IntoIterator<Item = &'a OpenCodePart>,
    options: &ExtractOptions,
) -> String {
    let mut out: Vec<String> = Vec::new();
    for part in parts {
        match part.part_type.as_deref() {
            Some("text") => {
                if let Some(text) = part.text.as_ref().and_then(Value::as_str) {
                    let text = text.trim();
                    if !text.is_empty() {
                        out.push(text.to_string());
                    }
                }
            }
            Some("tool") if options.include_tool_output => {
                let output = part
                    .state
                    .as_ref()
                    .and_then(|s| s.get("output"))
                    .and_then(Value::as_str);
                if let Some(formatted) = output.and_then(|o| options.format_tool_output(o)) {
                    out.push(formatted);
                }
            }
            _ => {}
        }
    }
    out.join("\n")
}

fn read_part_file(path: &Path) -> Option<OpenCodePart> {
    let mut bytes = std::fs::read(path).ok()?;
    simd_json::from_slice(&mut bytes).ok()
}

fn accepted_role(msg: &OpenCodeMessage, options: &ExtractOptions) -> Option<Role> {
    let role = Role::parse(msg.role.as_deref());
    if !options.include_system && role == Role::Other {
        return None;
    }
    Some(role)
}

fn build_message(
    msg: &OpenCodeMessage,
    role: Role,
    session_id: String,
    text: String,
    titles: &HashMap<String, OpenCodeSession>,
    options: &ExtractOptions,
) -> Option<SessionMessage> {
    if options.rejects_text(&text) {
        return None;
    }
    let (model, provider) = msg.model_and_provider();
    Some(SessionMessage {
        source: SOURCE,
        title: titles.get(&session_id).and_then(|s| s.title.clone()),
        session_id,
        role,
        text,
        time: msg.created_ms().and_then(timestamp_from_millis),
        model,
        provider,
        agent: non_empty(msg.agent.as_deref()),
        mode: non_empty(msg.mode.as_deref()),
        tools: Vec::new(),
    })
}

pub(crate) fn open_readonly(db_path: &Path) -> Result<Connection> {
    Ok(Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?)
}

fn load_sessions_sqlite(db_path: &Path) -> Result<HashMap<String, OpenCodeSession>> {
    let conn = open_readonly(db_path)?;
    let mut stmt = conn.prepare("SELECT id, directory, title FROM session")?;
    let rows = stmt.query_map([], |row| {
        Ok(OpenCodeSession {
            id: row.get(0)?,
            directory: row.get(1)?,
            title: row.get(2)?,
        })
    })?;

    let mut sessions = HashMap::new();
    for session in rows.flatten() {
        if let Some(id) = session.id.clone() {
            sessions.insert(id, session);
        }
    }
    Ok(sessions)
}

fn load_sessions_json(layout: &OpenCodeLayout) -> HashMap<String, OpenCodeSession> {
    let mut sessions = HashMap::new();
    for path in layout.session_files() {
        let mut bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(_) => continue,
        };
        let session: OpenCodeSession = match simd_json::from_slice(&mut bytes) {
            Ok(s) => s,
            Err(_) => {
                tracing::debug!("skipping malformed session file {}", path.display());
                continue;
            }
        };
        if let Some(id) = session.id.clone().filter(|id| !id.is_empty()) {
            sessions.insert(id, session);
        }
    }
    sessions
}

/// Session metadata keyed by session id; SQLite first, JSON files otherwise
pub fn load_sessions(layout: &OpenCodeLayout) -> HashMap<String, OpenCodeSession> {
    if let Some(db) = &layout.db {
        match load_sessions_sqlite(db) {
            Ok(sessions) => return sessions,
            Err(err) => tracing::debug!("session table unreadable, using JSON: {}", err),
        }
    }
    load_sessions_json(layout)
}

fn load_parts_sqlite(conn: &Connection) -> Result<HashMap<String, Vec<OpenCodePart>>> {
    let mut stmt = conn.prepare("SELECT message_id, data FROM part ORDER BY message_id, id")?;
    let rows = stmt.query_map([], |row| {
        let message_id: String = row.get(0)?;
        let data: String = row.get(1)?;
        Ok((message_id, data))
    })?;

    let mut parts: HashMap<String, Vec<OpenCodePart>> = HashMap::new();
    for (message_id, data) in rows.flatten() {
        let mut bytes = data.into_bytes();
        if let Ok(part) = simd_json::from_slice::<OpenCodePart>(&mut bytes) {
            parts.entry(message_id).or_default().push(part);
        }
    }
    Ok(parts)
}

fn load_messages_sqlite(
    db_path: &Path,
    options: &ExtractOptions,
    titles: &HashMap<String, OpenCodeSession>,
) -> Result<Vec<SessionMessage>> {
    let conn = open_readonly(db_path)?;
    let parts = load_parts_sqlite(&conn).unwrap_or_else(|err| {
        tracing::debug!("part table unreadable: {}", err);
        HashMap::new()
    });

    let mut stmt = conn.prepare("SELECT id, session_id, data FROM message ORDER BY rowid")?;
    let rows = stmt.query_map([], |row| {
        let id: String = row.get(0)?;
        let session_id: String = row.get(1)?;
        let data: String = row.get(2)?;
        Ok((id, session_id, data))
    })?;

    let mut messages = Vec::new();
    for row_result in rows {
        let (id, session_id, data) = match row_result {
            Ok(r) => r,
            Err(_) => continue,
        };
        let mut bytes = data.into_bytes();
        let msg = match OpenCodeMessage::from_slice(&mut bytes) {
            Some(m) => m,
            None => continue,
        };
        let role = match accepted_role(&msg, options) {
            Some(r) => r,
            None => continue,
        };
        let text = parts
            .get(&id)
            .map(|p| parts_text(p, options))
            .unwrap_or_default();
        if let Some(message) = build_message(&msg, role, session_id, text, titles, options) {
            messages.push(message);
        }
    }
    Ok(messages)
}

fn parse_message_file(
    path: &Path,
    layout: &OpenCodeLayout,
    options: &ExtractOptions,
    titles: &HashMap<String, OpenCodeSession>,
) -> Option<SessionMessage> {
    let msg = OpenCodeMessage::from_file(path)?;
    let role = accepted_role(&msg, options)?;

    let part_files = layout.part_files(msg.id.as_deref().unwrap_or_default());
    let parts: Vec<OpenCodePart> = part_files.iter().filter_map(|p| read_part_file(p)).collect();
    let text = parts_text(&parts, options);

    let session_id = msg.session_id.clone().unwrap_or_else(|| "unknown".to_string());
    build_message(&msg, role, session_id, text, titles, options)
}

fn load_messages_json(
    layout: &OpenCodeLayout,
    options: &ExtractOptions,
    titles: &HashMap<String, OpenCodeSession>,
) -> Vec<SessionMessage> {
    let files = layout.message_files();
    tracing::debug!("found {} OpenCode message files", files.len());

    let parsed: Vec<Option<SessionMessage>> = files
        .par_iter()
        .map(|path| parse_message_file(path, layout, options, titles))
        .collect();
    parsed.into_iter().flatten().collect()
}

/// Load OpenCode messages under `root`, preferring the SQLite database
pub fn load_opencode_messages(root: &Path, options: &ExtractOptions) -> Vec<SessionMessage> {
    let layout = OpenCodeLayout::new(root);
    let titles = load_sessions(&layout);

    if let Some(db) = &layout.db {
        match load_messages_sqlite(db, options, &titles) {
            Ok(messages) if !messages.is_empty() => return messages,
            Ok(_) => tracing::debug!("{} has no usable messages, trying JSON", db.display()),
            Err(err) => tracing::debug!("failed to read {}: {}", db.display(), err),
        }
    }
    load_messages_json(&layout, options, &titles)
}
