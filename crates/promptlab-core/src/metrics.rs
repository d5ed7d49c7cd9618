//! Lab report metrics: token quantiles, prompt starters, rule-like sentences,
//! correction language and slash-command mentions.

use crate::pairs::Pair;
use crate::stats::Tally;
use once_cell::sync::Lazy;
use regex::Regex;

pub const TOP_SESSIONS: usize = 15;
pub const TOP_PROMPTS: usize = 10;
pub const TOP_RULES: usize = 12;
pub const TOP_SKILLS: usize = 10;

const PROMPT_STARTER_CHARS: usize = 80;
const RULE_MIN_CHARS: usize = 12;
const RULE_MAX_CHARS: usize = 240;

static RULE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(must|should|always|never|avoid|prefer|only|do not|don't|cannot|can't|require|required|forbid|forbidden)\b",
    )
    .expect("valid rule regex")
});

static CORRECTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(actually|wait|undo|no,|that's wrong|wrong)\b").expect("valid correction regex")
});

static SKILL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)(?:^|\s)(/[a-z][a-z0-9-]{1,30})\b").expect("valid skill regex")
});

static SENTENCE_SPLIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?\n]+").expect("valid sentence regex"));

static NON_ALNUM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9\s]+").expect("valid normalize regex"));

static SPACES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid spaces regex"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Quantiles {
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
}

fn quantile_at(sorted: &[u64], q: f64) -> u64 {
    let idx = ((sorted.len() - 1) as f64 * q) as usize;
    sorted[idx]
}

/// Nearest-rank-below quantiles; all zero for an empty slice
pub fn quantiles(values: &[u64]) -> Quantiles {
    if values.is_empty() {
        return Quantiles::default();
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    Quantiles {
        p50: quantile_at(&sorted, 0.5),
        p90: quantile_at(&sorted, 0.9),
        p99: quantile_at(&sorted, 0.99),
    }
}

/// `#` for the filled share of `width`, `-` for the rest
pub fn ascii_bar(value: u64, max_value: u64, width: usize) -> String {
    if max_value == 0 {
        return String::new();
    }
    let filled = ((width as f64) * (value as f64 / max_value as f64)) as usize;
    let filled = filled.min(width);
    format!("{}{}", "#".repeat(filled), "-".repeat(width - filled))
}

pub fn normalize_sentence(sentence: &str) -> String {
    let lower = sentence.to_lowercase();
    let cleaned = NON_ALNUM_RE.replace_all(&lower, " ");
    SPACES_RE.replace_all(&cleaned, " ").trim().to_string()
}

pub fn split_sentences(text: &str) -> Vec<&str> {
    SENTENCE_SPLIT_RE
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// First line of the prompt, cut to 80 characters
pub fn prompt_starter(prompt: &str) -> Option<String> {
    let first_line = prompt.trim().split('\n').next().unwrap_or("").trim();
    if first_line.is_empty() {
        return None;
    }
    Some(first_line.chars().take(PROMPT_STARTER_CHARS).collect())
}

pub fn has_correction_language(prompt: &str) -> bool {
    CORRECTION_RE.is_match(prompt)
}

pub fn skill_mentions(prompt: &str) -> Vec<&str> {
    SKILL_RE
        .captures_iter(prompt)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

/// Normalized sentences that read like standing instructions
pub fn rule_candidates(prompt: &str) -> Vec<String> {
    split_sentences(prompt)
        .into_iter()
        .filter(|s| {
            let len = s.chars().count();
            (RULE_MIN_CHARS..=RULE_MAX_CHARS).contains(&len)
        })
        .filter(|s| RULE_RE.is_match(s))
        .map(normalize_sentence)
        .collect()
}

#[derive(Debug, Default, Clone)]
pub struct LabMetrics {
    pub total_pairs: usize,
    pub prompt_tokens: Vec<u64>,
    pub answer_tokens: Vec<u64>,
    pub total_tokens: Vec<u64>,
    pub sessions: Tally,
    pub days: Tally,
    pub prompt_starts: Tally,
    pub rule_candidates: Tally,
    pub skill_mentions: Tally,
    pub correction_hits: usize,
}

fn saturating_sum(values: &[u64]) -> u64 {
    values.iter().fold(0u64, |acc, v| acc.saturating_add(*v))
}

impl LabMetrics {
    pub fn collect(pairs: &[Pair]) -> Self {
        let mut metrics = LabMetrics {
            total_pairs: pairs.len(),
            ..Default::default()
        };

        for pair in pairs {
            metrics.prompt_tokens.push(pair.prompt_tokens);
            metrics.answer_tokens.push(pair.answer_tokens);
            metrics.total_tokens.push(pair.total_tokens);

            let session_id = if pair.session_id.is_empty() {
                "unknown"
            } else {
                pair.session_id.as_str()
            };
            metrics.sessions.add(session_id);
            if let Some(day) = pair.prompt_datetime() {
                metrics.days.add(&day.format("%Y-%m-%d").to_string());
            }

            let prompt = pair.prompt.as_str();
            if let Some(starter) = prompt_starter(prompt) {
                metrics.prompt_starts.add(&starter);
            }
            if has_correction_language(prompt) {
                metrics.correction_hits += 1;
            }
            for skill in skill_mentions(prompt) {
                metrics.skill_mentions.add(skill);
            }
            for rule in rule_candidates(prompt) {
                metrics.rule_candidates.add(&rule);
            }
        }
        metrics
    }

    pub fn prompt_quantiles(&self) -> Quantiles {
        quantiles(&self.prompt_tokens)
    }

    pub fn answer_quantiles(&self) -> Quantiles {
        quantiles(&self.answer_tokens)
    }

    pub fn total_quantiles(&self) -> Quantiles {
        quantiles(&self.total_tokens)
    }

    pub fn sum_prompt_tokens(&self) -> u64 {
        saturating_sum(&self.prompt_tokens)
    }

    pub fn sum_answer_tokens(&self) -> u64 {
        saturating_sum(&self.answer_tokens)
    }

    pub fn sum_total_tokens(&self) -> u64 {
        saturating_sum(&self.total_tokens)
    }
}
