//! Pair statistics
//!
//! Counts pairs per session / day / source / model / provider / agent / mode /
//! tool, and sums tokens and estimated cost per session and per model.
//! Ranked lists are descending by count; ties keep first-appearance order.

use crate::ordered::OrderedMap;
use crate::pairs::Pair;
use crate::pricing;
use serde::Serialize;

/// Counter that remembers the order in which keys first appeared
#[derive(Debug, Default, Clone)]
pub struct Tally(OrderedMap<u64>);

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: &str) {
        let count = self.0.entry(key);
        *count = count.saturating_add(1);
    }

    pub fn get(&self, key: &str) -> u64 {
        self.0.get(key).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in first-appearance order
    pub fn entries(&self) -> Vec<(String, u64)> {
        self.0.iter().map(|(key, count)| (key.to_string(), *count)).collect()
    }

    /// Highest counts first, at most `limit` entries
    pub fn most_common(&self, limit: usize) -> Vec<(String, u64)> {
        let mut entries = self.entries();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries.truncate(limit);
        entries
    }

    /// Entries sorted by key ascending
    pub fn sorted_by_key(&self) -> Vec<(String, u64)> {
        let mut entries = self.entries();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct TokenTotals {
    pub pairs: u64,
    pub prompt_tokens: u64,
    pub answer_tokens: u64,
    pub total_tokens: u64,
    pub estimated_cost: f64,
}

impl TokenTotals {
    fn add_pair(&mut self, pair: &Pair, cost: f64) {
        self.pairs = self.pairs.saturating_add(1);
        self.prompt_tokens = self.prompt_tokens.saturating_add(pair.prompt_tokens);
        self.answer_tokens = self.answer_tokens.saturating_add(pair.answer_tokens);
        self.total_tokens = self.total_tokens.saturating_add(pair.total_tokens);
        self.estimated_cost += cost;
    }
}

/// Token sums keyed by session or model, in first-appearance order
#[derive(Debug, Default, Clone)]
pub struct TokenTable(OrderedMap<TokenTotals>);

impl TokenTable {
    fn add(&mut self, key: &str, pair: &Pair, cost: f64) {
        self.0.entry(key).add_pair(pair, cost);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&TokenTotals> {
        self.0.get(key)
    }

    /// Highest total tokens first, at most `limit` rows
    pub fn top(&self, limit: usize) -> Vec<(String, TokenTotals)> {
        let mut rows: Vec<(String, TokenTotals)> = self
            .0
            .iter()
            .map(|(key, totals)| (key.to_string(), totals.clone()))
            .collect();
        rows.sort_by(|a, b| b.1.total_tokens.cmp(&a.1.total_tokens));
        rows.truncate(limit);
        rows
    }
}

/// Everything `promptlab stats` derives from a pairs file
#[derive(Debug, Default, Clone)]
pub struct PairStats {
    pub pairs: usize,
    pub sessions: Tally,
    pub days: Tally,
    pub sources: Tally,
    pub models: Tally,
    pub providers: Tally,
    pub agents: Tally,
    pub modes: Tally,
    pub tools: Tally,
    pub session_tokens: TokenTable,
    pub model_tokens: TokenTable,
    pub totals: TokenTotals,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Estimated cost of one pair: prompt tokens as input, answer tokens as output
pub fn pair_cost(pair: &Pair) -> f64 {
    pricing::estimate_cost(
        &pair.model_key(),
        i64::try_from(pair.prompt_tokens).unwrap_or(i64::MAX),
        i64::try_from(pair.answer_tokens).unwrap_or(i64::MAX),
        0,
    )
}

impl PairStats {
    pub fn from_pairs(pairs: &[Pair]) -> Self {
        let mut stats = PairStats::default();

        for pair in pairs {
            stats.pairs += 1;
            let session_id = if pair.session_id.is_empty() {
                "unknown"
            } else {
                pair.session_id.as_str()
            };
            stats.sessions.add(session_id);

            if let Some(day) = pair.prompt_datetime() {
                stats.days.add(&day.format("%Y-%m-%d").to_string());
            }
            stats.sources.add(present(&pair.source).unwrap_or("unknown"));
            if let Some(model) = present(&pair.answer_model) {
                stats.models.add(model);
            }
            if let Some(provider) = present(&pair.answer_provider) {
                stats.providers.add(provider);
            }
            if let Some(agent) = present(&pair.answer_agent) {
                stats.agents.add(agent);
            }
            if let Some(mode) = present(&pair.answer_mode) {
                stats.modes.add(mode);
            }
            for tool in &pair.answer_tools {
                stats.tools.add(tool);
            }

            let cost = pair_cost(pair);
            stats.session_tokens.add(session_id, pair, cost);
            stats.model_tokens.add(&pair.model_key(), pair, cost);
            stats.totals.add_pair(pair, cost);
        }

        tracing::debug!(
            "aggregated {} pairs over {} sessions",
            stats.pairs,
            stats.sessions.len()
        );
        stats
    }

    pub fn summary(&self, top: usize) -> StatsSummary {
        let ranked = |tally: &Tally| {
            tally
                .most_common(top)
                .into_iter()
                .map(|(key, count)| RankedCount { key, count })
                .collect()
        };
        StatsSummary {
            pairs: self.pairs,
            sessions: self.sessions.len(),
            days: self.days.len(),
            totals: self.totals.clone(),
            top_sessions: ranked(&self.sessions),
            top_models: ranked(&self.models),
            top_providers: ranked(&self.providers),
            top_agents: ranked(&self.agents),
            top_modes: ranked(&self.modes),
            top_tools: ranked(&self.tools),
            top_sources: ranked(&self.sources),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCount {
    pub key: String,
    pub count: u64,
}

/// Machine-readable summary printed by `promptlab stats --json`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub pairs: usize,
    pub sessions: usize,
    pub days: usize,
    pub totals: TokenTotals,
    pub top_sessions: Vec<RankedCount>,
    pub top_models: Vec<RankedCount>,
    pub top_providers: Vec<RankedCount>,
    pub top_agents: Vec<RankedCount>,
    pub top_modes: Vec<RankedCount>,
    pub top_tools: Vec<RankedCount>,
    pub top_sources: Vec<RankedCount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(session: &str, time: Option<&str>, model: Option<&str>, tokens: (u64, u64)) -> Pair {
        Pair {
            session_id: session.to_string(),
            source: Some("opencode".into()),
            prompt: "p".into(),
            answer: "a".into(),
            prompt_tokens: tokens.0,
            answer_tokens: tokens.1,
            total_tokens: tokens.0 + tokens.1,
            prompt_time: time.map(str::to_string),
            answer_model: model.map(str::to_string),
            answer_provider: model.map(|_| "openai".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_most_common_ties_keep_first_appearance() {
        let mut tally = Tally::new();
        for key in ["b", "a", "c", "a", "b", "d"] {
            tally.add(key);
        }
        assert_eq!(
            tally.most_common(3),
            vec![("b".to_string(), 2), ("a".to_string(), 2), ("c".to_string(), 1)]
        );
        assert_eq!(tally.len(), 4);
        assert_eq!(tally.sorted_by_key()[0].0, "a");
    }

    #[test]
    fn test_from_pairs_counts() {
        let mut tooled = pair("s1", Some("2025-01-02T09:00:00Z"), Some("gpt-5.2-codex"), (10, 20));
        tooled.answer_tools = vec!["bash".into(), "read".into()];
        let pairs = vec![
            pair("s1", Some("2025-01-01T23:30:00-02:00"), None, (1, 1)),
            tooled,
            pair("", None, Some("gpt-5.2-codex"), (5, 5)),
        ];
        let stats = PairStats::from_pairs(&pairs);

        assert_eq!(stats.pairs, 3);
        assert_eq!(stats.sessions.get("s1"), 2);
        assert_eq!(stats.sessions.get("unknown"), 1);
        // 23:30 at -02:00 is the next UTC day
        assert_eq!(stats.days.get("2025-01-02"), 2);
        assert_eq!(stats.days.len(), 1);
        assert_eq!(stats.models.get("gpt-5.2-codex"), 2);
        assert_eq!(stats.providers.get("openai"), 2);
        assert_eq!(stats.tools.get("bash"), 1);
        assert_eq!(stats.sources.get("opencode"), 3);
        assert!(stats.agents.is_empty());
    }

    #[test]
    fn test_token_tables_and_cost() {
        let pairs = vec![
            pair("s1", None, Some("gpt-5.2-codex"), (1_000_000, 0)),
            pair("s2", None, Some("gpt-5.2-codex"), (0, 1_000_000)),
            pair("s2", None, None, (10, 10)),
        ];
        let stats = PairStats::from_pairs(&pairs);

        let model = stats.model_tokens.get("openai/gpt-5.2-codex").unwrap();
        assert_eq!(model.pairs, 2);
        assert!((model.estimated_cost - 15.75).abs() < 1e-9);
        assert_eq!(stats.model_tokens.get("unknown/unknown").unwrap().estimated_cost, 0.0);

        let top = stats.session_tokens.top(10);
        assert_eq!(top[0].0, "s2");
        assert_eq!(top[0].1.total_tokens, 1_000_020);
        assert!((stats.totals.estimated_cost - 15.75).abs() < 1e-9);
    }

    #[test]
    fn test_token_table_ties_keep_first_appearance() {
        let pairs = vec![
            pair("x", None, None, (5, 5)),
            pair("y", None, None, (5, 5)),
            pair("z", None, None, (1, 1)),
        ];
        let stats = PairStats::from_pairs(&pairs);
        let keys: Vec<String> = stats.session_tokens.top(2).into_iter().map(|r| r.0).collect();
        assert_eq!(keys, vec!["x", "y"]);
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let stats = PairStats::from_pairs(&[pair("s1", None, None, (1, 2))]);
        let json = serde_json::to_value(stats.summary(5)).unwrap();
        assert_eq!(json["pairs"], 1);
        assert_eq!(json["topSessions"][0]["key"], "s1");
        assert_eq!(json["totals"]["total_tokens"], 3);
    }

    #[test]
    fn test_token_sums_saturate_instead_of_overflowing() {
        let mut huge = pair("s1", None, None, (0, 0));
        huge.prompt_tokens = u64::MAX;
        huge.total_tokens = u64::MAX;
        let stats = PairStats::from_pairs(&[huge.clone(), huge]);

        assert_eq!(stats.pairs, 2);
        assert_eq!(stats.totals.prompt_tokens, u64::MAX);
        assert_eq!(stats.totals.total_tokens, u64::MAX);
        assert_eq!(stats.session_tokens.get("s1").unwrap().total_tokens, u64::MAX);
        assert!(stats.totals.estimated_cost >= 0.0);
    }
}
