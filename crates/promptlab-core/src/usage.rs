//! OpenCode token usage
//!
//! Loads assistant messages that carry token counts and aggregates them per
//! model, per hour and per project.

use crate::error::{Error, Result};
use crate::ordered::OrderedMap;
use crate::pricing;
use crate::scanner::OpenCodeLayout;
use crate::sessions::opencode::{self, OpenCodeMessage, OpenCodeSession, OpenCodeTokens};
use crate::sessions::timestamp_from_millis;
use chrono::{Datelike, Duration, Months, NaiveDateTime};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

/// Where the usage data was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageSource {
    Sqlite,
    Json,
}

impl UsageSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageSource::Sqlite => "sqlite",
            UsageSource::Json => "json",
        }
    }
}

/// One assistant message with token data
#[derive(Debug, Clone, PartialEq)]
pub struct UsageMessage {
    pub session_id: String,
    pub provider_id: Option<String>,
    pub model_id: Option<String>,
    pub tokens: OpenCodeTokens,
    pub cost_logged: f64,
    pub created_ms: Option<i64>,
    pub project_root: Option<String>,
}

impl UsageMessage {
    pub fn from_message(msg: OpenCodeMessage) -> Option<Self> {
        if !msg.is_assistant() {
            return None;
        }
        let tokens = msg.tokens?;
        let (model_id, provider_id) = msg.model_and_provider();
        Some(Self {
            session_id: msg.session_id.clone().unwrap_or_default(),
            created_ms: msg.created_ms(),
            project_root: msg.project_root().map(str::to_string),
            cost_logged: msg.cost.filter(|c| c.is_finite()).unwrap_or(0.0).max(0.0),
            provider_id,
            model_id,
            tokens,
        })
    }

    /// `provider/model`, `unknown` for missing parts
    pub fn model_key(&self) -> String {
        format!(
            "{}/{}",
            self.provider_id.as_deref().filter(|s| !s.is_empty()).unwrap_or("unknown"),
            self.model_id.as_deref().filter(|s| !s.is_empty()).unwrap_or("unknown")
        )
    }
}

fn load_messages_sqlite(db_path: &Path) -> Result<Vec<UsageMessage>> {
    let conn = opencode::open_readonly(db_path)?;
    let mut stmt = conn.prepare("SELECT session_id, data FROM message ORDER BY rowid")?;
    let rows = stmt.query_map([], |row| {
        let session_id: String = row.get(0)?;
        let data: String = row.get(1)?;
        Ok((session_id, data))
    })?;

    let mut messages = Vec::new();
    for (session_id, data) in rows.flatten() {
        let mut bytes = data.into_bytes();
        let mut msg = match OpenCodeMessage::from_slice(&mut bytes) {
            Some(m) => m,
            None => continue,
        };
        msg.session_id = Some(session_id);
        if let Some(usage) = UsageMessage::from_message(msg) {
            messages.push(usage);
        }
    }
    Ok(messages)
}

fn load_messages_json(layout: &OpenCodeLayout) -> Vec<UsageMessage> {
    let parsed: Vec<Option<UsageMessage>> = layout
        .message_files()
        .par_iter()
        .map(|path| OpenCodeMessage::from_file(path).and_then(UsageMessage::from_message))
        .collect();
    parsed.into_iter().flatten().collect()
}

/// Usage messages under `root`: SQLite first, JSON files when it yields nothing
pub fn load_usage_messages(layout: &OpenCodeLayout) -> (Vec<UsageMessage>, UsageSource) {
    if let Some(db) = &layout.db {
        match load_messages_sqlite(db) {
            Ok(messages) if !messages.is_empty() => return (messages, UsageSource::Sqlite),
            Ok(_) => tracing::debug!("{} has no token data, trying JSON", db.display()),
            Err(err) => tracing::debug!("failed to read {}: {}", db.display(), err),
        }
    }
    (load_messages_json(layout), UsageSource::Json)
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ModelUsage {
    pub messages: u64,
    pub input: i64,
    pub output: i64,
    pub reasoning: i64,
    pub cache_read: i64,
    pub cache_write: i64,
    pub cost_logged: f64,
    pub cost_estimated: f64,
}

impl ModelUsage {
    pub fn total(&self) -> i64 {
        self.input.saturating_add(self.output)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct IoTokens {
    pub input: i64,
    pub output: i64,
}

impl IoTokens {
    pub fn total(&self) -> i64 {
        self.input.saturating_add(self.output)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ProjectUsage {
    pub path: String,
    pub messages: u64,
    pub input: i64,
    pub output: i64,
}

impl ProjectUsage {
    pub fn total(&self) -> i64 {
        self.input.saturating_add(self.output)
    }

    /// Last path component, or the whole path when it has none
    pub fn display_name(&self) -> &str {
        self.path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.path)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct UsageTotals {
    pub input: i64,
    pub output: i64,
    pub reasoning: i64,
    pub cache_read: i64,
    pub cache_write: i64,
    pub cost_logged: f64,
    pub cost_estimated: f64,
}

/// Aggregated view of OpenCode token usage
#[derive(Debug, Clone, Serialize)]
pub struct UsageReport {
    pub source: UsageSource,
    pub total_messages: u64,
    pub total_sessions: usize,
    /// Sorted by input+output descending, ties in first-appearance order
    pub models: Vec<(String, ModelUsage)>,
    /// `YYYY-MM-DDTHH` (UTC) -> model key -> tokens
    pub hourly: BTreeMap<String, BTreeMap<String, IoTokens>>,
    /// Sorted by input+output descending, ties in first-appearance order
    pub projects: Vec<ProjectUsage>,
}

fn add_tokens(total: &mut i64, n: i64) {
    *total = total.saturating_add(n);
}

impl UsageReport {
    pub fn aggregate(
        messages: &[UsageMessage],
        sessions: &HashMap<String, OpenCodeSession>,
        source: UsageSource,
    ) -> Self {
        let mut models: OrderedMap<ModelUsage> = OrderedMap::new();
        let mut projects: OrderedMap<ProjectUsage> = OrderedMap::new();
        let mut hourly: BTreeMap<String, BTreeMap<String, IoTokens>> = BTreeMap::new();
        let mut session_ids: HashSet<&str> = HashSet::new();

        for msg in messages {
            let key = msg.model_key();
            let t = &msg.tokens;
            let input = t.input.max(0);
            let output = t.output.max(0);

            let ms = models.entry(&key);
            ms.messages += 1;
            add_tokens(&mut ms.input, input);
            add_tokens(&mut ms.output, output);
            add_tokens(&mut ms.reasoning, t.reasoning.max(0));
            add_tokens(&mut ms.cache_read, t.cache.read.max(0));
            add_tokens(&mut ms.cache_write, t.cache.write.max(0));
            ms.cost_logged += msg.cost_logged;

            if let Some(dt) = msg.created_ms.and_then(timestamp_from_millis) {
                let bucket = hourly
                    .entry(dt.format("%Y-%m-%dT%H").to_string())
                    .or_default()
                    .entry(key.clone())
                    .or_default();
                add_tokens(&mut bucket.input, input);
                add_tokens(&mut bucket.output, output);
            }

            let path = msg
                .project_root
                .clone()
                .or_else(|| {
                    sessions
                        .get(&msg.session_id)
                        .and_then(|s| s.directory.clone())
                        .filter(|d| !d.is_empty())
                })
                .unwrap_or_else(|| "unknown".to_string());
            let project = projects.entry(&path);
            project.path.clone_from(&path);
            project.messages += 1;
            add_tokens(&mut project.input, input);
            add_tokens(&mut project.output, output);

            session_ids.insert(msg.session_id.as_str());
        }

        let mut models = models.into_vec();
        for (key, ms) in models.iter_mut() {
            ms.cost_estimated = pricing::estimate_cost(key, ms.input, ms.output, ms.cache_read);
        }
        models.sort_by(|a, b| b.1.total().cmp(&a.1.total()));

        let mut projects: Vec<ProjectUsage> = projects.into_vec().into_iter().map(|(_, p)| p).collect();
        projects.sort_by(|a, b| b.total().cmp(&a.total()));

        UsageReport {
            source,
            total_messages: messages.len() as u64,
            total_sessions: session_ids.len(),
            models,
            hourly,
            projects,
        }
    }

    pub fn totals(&self) -> UsageTotals {
        let mut totals = UsageTotals::default();
        for (_, ms) in &self.models {
            add_tokens(&mut totals.input, ms.input);
            add_tokens(&mut totals.output, ms.output);
            add_tokens(&mut totals.reasoning, ms.reasoning);
            add_tokens(&mut totals.cache_read, ms.cache_read);
            add_tokens(&mut totals.cache_write, ms.cache_write);
            totals.cost_logged += ms.cost_logged;
            totals.cost_estimated += ms.cost_estimated;
        }
        totals
    }

    /// Input and output tokens summed over models per `grouping` bucket.
    ///
    /// Day, week and month series include empty buckets between the first
    /// and last active one; hour series only list active hours.
    pub fn timeline(&self, grouping: TimeGrouping) -> Vec<(String, IoTokens)> {
        let mut buckets: BTreeMap<String, IoTokens> = BTreeMap::new();
        let mut first: Option<NaiveDateTime> = None;
        let mut last: Option<NaiveDateTime> = None;
        for (hour, per_model) in &self.hourly {
            let Some(start) = parse_hour(hour) else {
                continue;
            };
            first = Some(first.map_or(start, |f| f.min(start)));
            last = Some(last.map_or(start, |l| l.max(start)));
            let bucket = buckets.entry(grouping.bucket_key(start)).or_default();
            for tokens in per_model.values() {
                add_tokens(&mut bucket.input, tokens.input);
                add_tokens(&mut bucket.output, tokens.output);
            }
        }

        let (Some(first), Some(last)) = (first, last) else {
            return Vec::new();
        };
        if grouping == TimeGrouping::Hour {
            return buckets.into_iter().collect();
        }

        let last_key = grouping.bucket_key(last);
        let mut series: Vec<(String, IoTokens)> = Vec::new();
        let mut cursor = first;
        loop {
            let key = grouping.bucket_key(cursor);
            if series.last().map(|(k, _)| k != &key).unwrap_or(true) {
                let tokens = buckets.get(&key).copied().unwrap_or_default();
                series.push((key.clone(), tokens));
            }
            if key == last_key {
                break;
            }
            match grouping.advance(cursor) {
                Some(next) if next <= last => cursor = next,
                _ => break,
            }
        }
        if series.last().map(|(k, _)| k != &last_key).unwrap_or(false) {
            let tokens = buckets.get(&last_key).copied().unwrap_or_default();
            series.push((last_key, tokens));
        }
        series
    }
}

/// Time bucket size for the usage timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeGrouping {
    Hour,
    Day,
    Week,
    Month,
}

impl TimeGrouping {
    pub const ALL: [TimeGrouping; 4] = [
        TimeGrouping::Hour,
        TimeGrouping::Day,
        TimeGrouping::Week,
        TimeGrouping::Month,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeGrouping::Hour => "hour",
            TimeGrouping::Day => "day",
            TimeGrouping::Week => "week",
            TimeGrouping::Month => "month",
        }
    }

    /// `2025-01-31T09`, `2025-01-31`, `2025-W05` (ISO week) or `2025-01`
    pub fn bucket_key(&self, at: NaiveDateTime) -> String {
        match self {
            TimeGrouping::Hour => at.format("%Y-%m-%dT%H").to_string(),
            TimeGrouping::Day => at.format("%Y-%m-%d").to_string(),
            TimeGrouping::Week => {
                let week = at.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            TimeGrouping::Month => at.format("%Y-%m").to_string(),
        }
    }

    fn advance(&self, at: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            TimeGrouping::Hour => at.checked_add_signed(Duration::hours(1)),
            TimeGrouping::Day => at.checked_add_signed(Duration::days(1)),
            TimeGrouping::Week => at.checked_add_signed(Duration::days(7)),
            TimeGrouping::Month => at.checked_add_months(Months::new(1)),
        }
    }
}

fn parse_hour(key: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&format!("{}:00:00", key), "%Y-%m-%dT%H:%M:%S").ok()
}

/// Load and aggregate OpenCode usage under `root`
pub fn load_usage_report(root: &Path) -> Result<UsageReport> {
    let layout = OpenCodeLayout::new(root);
    let sessions = opencode::load_sessions(&layout);
    let (messages, source) = load_usage_messages(&layout);
    if messages.is_empty() {
        return Err(Error::NoUsage {
            path: root.to_path_buf(),
        });
    }
    tracing::info!(
        "loaded {} assistant messages from {}",
        messages.len(),
        source.as_str()
    );
    Ok(UsageReport::aggregate(&messages, &sessions, source))
}
