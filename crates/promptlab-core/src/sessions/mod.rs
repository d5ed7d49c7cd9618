//! Session loaders
//!
//! Each loader turns a vendor-specific log layout into [`SessionMessage`]s.
//! Records that do not have the expected shape are skipped.

pub mod claudecode;
pub mod opencode;

use crate::ordered::OrderedMap;
use chrono::{DateTime, TimeZone, Utc};

const SUGGESTION_MODE_PREFIX: &str = "[SUGGESTION MODE:";
const IDE_OPENED_FILE_MARKER: &str = "<ide_opened_file>";
const INTERRUPTED_PREFIX: &str = "[Request interrupted by user for tool use]";
const TOOL_OUTPUT_PREFIX: &str = "TOOL_OUTPUT: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    Other,
}

impl Role {
    pub fn parse(role: Option<&str>) -> Self {
        match role {
            Some("user") => Role::User,
            Some("assistant") => Role::Assistant,
            _ => Role::Other,
        }
    }
}

/// Inclusion toggles shared by every loader
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub include_tool_output: bool,
    /// Characters kept from each tool output; 0 keeps everything
    pub tool_output_max_len: usize,
    pub include_system: bool,
    pub include_subagents: bool,
    pub exclude_suggestion_mode: bool,
    pub include_ide_events: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            include_tool_output: false,
            tool_output_max_len: 2000,
            include_system: false,
            include_subagents: false,
            exclude_suggestion_mode: true,
            include_ide_events: false,
        }
    }
}

impl ExtractOptions {
    /// Whether a fully assembled message text should be dropped
    pub fn rejects_text(&self, text: &str) -> bool {
        if self.exclude_suggestion_mode && text.trim_start().starts_with(SUGGESTION_MODE_PREFIX) {
            return true;
        }
        if !self.include_ide_events && text.contains(IDE_OPENED_FILE_MARKER) {
            return true;
        }
        is_interruption(text) || text.trim().is_empty()
    }

    /// Whether a single text item inside a message should be dropped
    pub(crate) fn rejects_text_item(&self, text: &str) -> bool {
        (!self.include_ide_events && text.contains(IDE_OPENED_FILE_MARKER)) || is_interruption(text)
    }

    /// Trim, truncate and label one tool output; `None` when nothing is left
    pub(crate) fn format_tool_output(&self, output: &str) -> Option<String> {
        let trimmed = output.trim();
        if trimmed.is_empty() {
            return None;
        }
        let max = self.tool_output_max_len;
        let body = if max > 0 && trimmed.chars().count() > max {
            let cut: String = trimmed.chars().take(max).collect();
            format!("{}...", cut)
        } else {
            trimmed.to_string()
        };
        Some(format!("{}{}", TOOL_OUTPUT_PREFIX, body))
    }
}

fn is_interruption(text: &str) -> bool {
    text.trim().starts_with(INTERRUPTED_PREFIX)
}

/// One user or assistant turn, normalized across sources
#[derive(Debug, Clone, PartialEq)]
pub struct SessionMessage {
    pub source: &'static str,
    pub session_id: String,
    pub role: Role,
    pub text: String,
    pub time: Option<DateTime<Utc>>,
    pub title: Option<String>,
    pub model: Option<String>,
    pub provider: Option<String>,
    pub agent: Option<String>,
    pub mode: Option<String>,
    pub tools: Vec<String>,
}

/// Messages grouped per session, sessions kept in order of first appearance
#[derive(Debug, Default)]
pub struct SessionLog(OrderedMap<Vec<SessionMessage>>);

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: SessionMessage) {
        self.0.entry(&message.session_id).push(message);
    }

    pub fn extend(&mut self, messages: impl IntoIterator<Item = SessionMessage>) {
        for message in messages {
            self.push(message);
        }
    }

    pub fn session_count(&self) -> usize {
        self.0.len()
    }

    pub fn message_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    /// Sessions in first-appearance order
    pub fn into_sessions(self) -> Vec<(String, Vec<SessionMessage>)> {
        self.0.into_vec()
    }
}

/// Parse an ISO 8601 timestamp such as `2025-01-01T12:00:00.000Z`
pub fn parse_timestamp_str(ts: &str) -> Option<DateTime<Utc>> {
    if ts.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Convert epoch milliseconds to a UTC timestamp
pub fn timestamp_from_millis(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}
