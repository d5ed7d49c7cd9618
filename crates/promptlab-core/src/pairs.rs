//! Prompt/answer pairing
//!
//! Turns per-session message streams into [`Pair`]s: each user message opens a
//! prompt, following assistant messages form its answer.

use crate::sessions::{
    claudecode, opencode, parse_timestamp_str, ExtractOptions, Role, SessionLog, SessionMessage,
};
use crate::tokenizer::Tokenizer;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// One prompt/answer exchange, as stored in `pairs.jsonl`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pair {
    pub session_id: String,
    pub session_title: Option<String>,
    pub source: Option<String>,
    pub prompt: String,
    pub answer: String,
    pub prompt_tokens: u64,
    pub answer_tokens: u64,
    pub total_tokens: u64,
    pub prompt_time: Option<String>,
    pub answer_time: Option<String>,
    pub prompt_model: Option<String>,
    pub prompt_provider: Option<String>,
    pub answer_model: Option<String>,
    pub answer_provider: Option<String>,
    pub answer_agent: Option<String>,
    pub answer_mode: Option<String>,
    pub answer_tools: Vec<String>,
}

impl Pair {
    pub fn prompt_datetime(&self) -> Option<DateTime<Utc>> {
        self.prompt_time.as_deref().and_then(parse_timestamp_str)
    }

    /// `provider/model` of the answer, `unknown` for missing parts
    pub fn model_key(&self) -> String {
        format!(
            "{}/{}",
            self.answer_provider.as_deref().unwrap_or("unknown"),
            self.answer_model.as_deref().unwrap_or("unknown")
        )
    }

    pub fn count_tokens(&mut self, tokenizer: &dyn Tokenizer) {
        self.prompt_tokens = tokenizer.count_tokens(&self.prompt) as u64;
        self.answer_tokens = tokenizer.count_tokens(&self.answer) as u64;
        self.total_tokens = self.prompt_tokens + self.answer_tokens;
    }
}

fn format_time(time: Option<DateTime<Utc>>) -> Option<String> {
    time.map(|t| t.to_rfc3339())
}

/// Accumulates one prompt and its answer parts
struct OpenPrompt<'a> {
    prompt: &'a SessionMessage,
    answer_parts: Vec<&'a str>,
    answer_time: Option<DateTime<Utc>>,
    answer_model: Option<String>,
    answer_provider: Option<String>,
    answer_agent: Option<String>,
    answer_mode: Option<String>,
    tools: BTreeSet<String>,
}

impl<'a> OpenPrompt<'a> {
    fn new(prompt: &'a SessionMessage) -> Self {
        Self {
            prompt,
            answer_parts: Vec::new(),
            answer_time: None,
            answer_model: None,
            answer_provider: None,
            answer_agent: None,
            answer_mode: None,
            tools: BTreeSet::new(),
        }
    }

    fn absorb(&mut self, answer: &'a SessionMessage) {
        self.answer_parts.push(&answer.text);
        self.answer_time = answer.time;
        if answer.model.is_some() {
            self.answer_model.clone_from(&answer.model);
        }
        if answer.provider.is_some() {
            self.answer_provider.clone_from(&answer.provider);
        }
        if answer.agent.is_some() {
            self.answer_agent.clone_from(&answer.agent);
        }
        if answer.mode.is_some() {
            self.answer_mode.clone_from(&answer.mode);
        }
        self.tools.extend(answer.tools.iter().cloned());
    }

    fn finish(self, session_id: &str) -> Option<Pair> {
        if self.answer_parts.is_empty() {
            return None;
        }
        let prompt = self.prompt;
        Some(Pair {
            session_id: session_id.to_string(),
            session_title: prompt.title.clone(),
            source: Some(prompt.source.to_string()),
            prompt: prompt.text.clone(),
            answer: self.answer_parts.join("\n"),
            prompt_tokens: 0,
            answer_tokens: 0,
            total_tokens: 0,
            prompt_time: format_time(prompt.time),
            answer_time: format_time(self.answer_time),
            prompt_model: prompt.model.clone(),
            prompt_provider: prompt.provider.clone(),
            answer_model: self.answer_model,
            answer_provider: self.answer_provider,
            answer_agent: self.answer_agent,
            answer_mode: self.answer_mode,
            answer_tools: self.tools.into_iter().collect(),
        })
    }
}

/// Pair up one session's messages. Messages are stably sorted by time first,
/// untimed messages ahead of timed ones. Token counts are left at zero.
pub fn pair_messages(session_id: &str, messages: &[SessionMessage]) -> Vec<Pair> {
    let mut ordered: Vec<&SessionMessage> = messages.iter().collect();
    ordered.sort_by_key(|m| m.time);

    let mut pairs = Vec::new();
    let mut open: Option<OpenPrompt> = None;

    for msg in ordered {
        match msg.role {
            Role::User => {
                if let Some(pair) = open.take().and_then(|p| p.finish(session_id)) {
                    pairs.push(pair);
                }
                open = Some(OpenPrompt::new(msg));
            }
            Role::Assistant => {
                if let Some(current) = open.as_mut() {
                    current.absorb(msg);
                }
            }
            Role::Other => {}
        }
    }
    if let Some(pair) = open.and_then(|p| p.finish(session_id)) {
        pairs.push(pair);
    }
    pairs
}

/// Load every enabled source into one session log: Claude first, then OpenCode
pub fn collect_sessions(
    claude_root: Option<&Path>,
    opencode_root: Option<&Path>,
    options: &ExtractOptions,
) -> SessionLog {
    let mut log = SessionLog::new();
    if let Some(root) = claude_root {
        log.extend(claudecode::load_claude_messages(root, options));
    }
    if let Some(root) = opencode_root {
        log.extend(opencode::load_opencode_messages(root, options));
    }
    tracing::info!(
        "loaded {} messages across {} sessions",
        log.message_count(),
        log.session_count()
    );
    log
}

/// Pair every session and count tokens
pub fn extract_pairs(log: SessionLog, tokenizer: &dyn Tokenizer) -> Vec<Pair> {
    let mut pairs: Vec<Pair> = log
        .into_sessions()
        .iter()
        .flat_map(|(session_id, messages)| pair_messages(session_id, messages))
        .collect();

    pairs
        .par_iter_mut()
        .for_each(|pair| pair.count_tokens(tokenizer));
    pairs
}
