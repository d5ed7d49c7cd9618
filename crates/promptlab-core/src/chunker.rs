//! Token-bounded chunking of pairs into LLM-ready prompts
//!
//! Pairs are packed greedily in input order. A chunk closes when the next pair
//! would push its token sum past `max_total_tokens` or when it already holds
//! `max_pairs` pairs. A pair larger than the token budget gets a chunk of its own.

use crate::error::{Error, Result};
use crate::pairs::Pair;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_TOTAL_TOKENS: u64 = 12_000;
pub const DEFAULT_MAX_PAIRS: usize = 80;

/// Instructions placed at the top of every chunk prompt
pub const ANALYSIS_TEMPLATE: &str = r#"You are analyzing prompt/answer pairs from an AI coding assistant.
Your tasks:
1) Identify instructions that should become durable rules in AGENTS.md or CLAUDE.md.
2) Identify repeated workflows that should become skills (slash commands).
3) Flag any corrections or constraints that should be enforced globally.

Return JSON with keys:
{
  "rules": [{"text": "...", "reason": "..."}],
  "skills": [{"name": "...", "reason": "..."}],
  "notes": ["..."]
}
"#;

const SEPARATOR: &str = "---";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLimits {
    pub max_total_tokens: u64,
    pub max_pairs: usize,
}

impl Default for ChunkLimits {
    fn default() -> Self {
        Self {
            max_total_tokens: DEFAULT_MAX_TOTAL_TOKENS,
            max_pairs: DEFAULT_MAX_PAIRS,
        }
    }
}

impl ChunkLimits {
    pub fn new(max_total_tokens: u64, max_pairs: usize) -> Result<Self> {
        if max_pairs == 0 {
            return Err(Error::InvalidLimits);
        }
        Ok(Self {
            max_total_tokens,
            max_pairs,
        })
    }
}

/// One line of `chunks.jsonl`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk_id: usize,
    pub pair_count: usize,
    pub token_sum: u64,
    pub prompt: String,
}

/// Split `items` into consecutive slices under `limits`.
/// `tokens` gives the weight of each item.
pub fn chunk_by_tokens<'a, T, F>(items: &'a [T], limits: ChunkLimits, tokens: F) -> Vec<&'a [T]>
where
    F: Fn(&T) -> u64,
{
    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut current_tokens = 0u64;

    for (idx, item) in items.iter().enumerate() {
        let weight = tokens(item);
        let len = idx - start;
        if len > 0
            && (current_tokens.saturating_add(weight) > limits.max_total_tokens
                || len >= limits.max_pairs)
        {
            chunks.push(&items[start..idx]);
            start = idx;
            current_tokens = 0;
        }
        current_tokens = current_tokens.saturating_add(weight);
    }
    if start < items.len() {
        chunks.push(&items[start..]);
    }
    chunks
}

pub fn chunk_pairs(pairs: &[Pair], limits: ChunkLimits) -> Vec<&[Pair]> {
    chunk_by_tokens(pairs, limits, |p| p.total_tokens)
}

/// Render the prompt text for one chunk
pub fn build_chunk_text(pairs: &[Pair], include_times: bool) -> String {
    let mut lines: Vec<&str> = vec![ANALYSIS_TEMPLATE, "", SEPARATOR, ""];
    let headers: Vec<String> = (1..=pairs.len()).map(|n| format!("PAIR {}:", n)).collect();
    let times: Vec<(String, String)> = if include_times {
        pairs
            .iter()
            .map(|p| {
                (
                    format!("prompt_time: {}", p.prompt_time.as_deref().unwrap_or("null")),
                    format!("answer_time: {}", p.answer_time.as_deref().unwrap_or("null")),
                )
            })
            .collect()
    } else {
        Vec::new()
    };

    for (idx, pair) in pairs.iter().enumerate() {
        lines.push(&headers[idx]);
        if let Some((prompt_time, answer_time)) = times.get(idx) {
            lines.push(prompt_time);
            lines.push(answer_time);
        }
        lines.extend(["PROMPT:", pair.prompt.as_str(), "ANSWER:", pair.answer.as_str()]);
        lines.extend(["", SEPARATOR, ""]);
    }

    let mut text = lines.join("\n").trim().to_string();
    text.push('\n');
    text
}

/// Chunk `pairs` and render each chunk into a [`ChunkRecord`]; ids start at 1
pub fn build_chunks(pairs: &[Pair], limits: ChunkLimits, include_times: bool) -> Vec<ChunkRecord> {
    chunk_pairs(pairs, limits)
        .into_iter()
        .enumerate()
        .map(|(idx, chunk)| ChunkRecord {
            chunk_id: idx + 1,
            pair_count: chunk.len(),
            token_sum: chunk
                .iter()
                .fold(0u64, |acc, p| acc.saturating_add(p.total_tokens)),
            prompt: build_chunk_text(chunk, include_times),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs_with(tokens: &[u64]) -> Vec<Pair> {
        tokens
            .iter()
            .enumerate()
            .map(|(i, t)| Pair {
                session_id: format!("s{}", i),
                prompt: format!("prompt {}", i),
                answer: format!("answer {}", i),
                total_tokens: *t,
                ..Default::default()
            })
            .collect()
    }

    fn sizes(chunks: &[&[Pair]]) -> Vec<Vec<u64>> {
        chunks
            .iter()
            .map(|c| c.iter().map(|p| p.total_tokens).collect())
            .collect()
    }

    #[test]
    fn test_greedy_packing_example() {
        let pairs = pairs_with(&[5000, 4000, 5000]);
        let chunks = chunk_pairs(&pairs, ChunkLimits::default());
        assert_eq!(sizes(&chunks), vec![vec![5000, 4000], vec![5000]]);
    }

    #[test]
    fn test_oversized_pair_gets_own_chunk() {
        let pairs = pairs_with(&[100, 20000, 100]);
        let chunks = chunk_pairs(&pairs, ChunkLimits::default());
        assert_eq!(sizes(&chunks), vec![vec![100], vec![20000], vec![100]]);

        let alone = pairs_with(&[20000]);
        assert_eq!(sizes(&chunk_pairs(&alone, ChunkLimits::default())), vec![vec![20000]]);
    }

    #[test]
    fn test_exact_budget_fits() {
        let pairs = pairs_with(&[6000, 6000, 1]);
        let chunks = chunk_pairs(&pairs, ChunkLimits::default());
        assert_eq!(sizes(&chunks), vec![vec![6000, 6000], vec![1]]);
    }

    #[test]
    fn test_max_pairs_bound() {
        let pairs = pairs_with(&[1; 7]);
        let limits = ChunkLimits::new(12_000, 3).unwrap();
        let chunks = chunk_pairs(&pairs, limits);
        let lens: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
        assert_eq!(lens, vec![3, 3, 1]);
    }

    #[test]
    fn test_preserves_order_count_and_bounds() {
        let tokens: Vec<u64> = (0..200).map(|i| (i * 7919 % 5000) as u64).collect();
        let pairs = pairs_with(&tokens);
        let limits = ChunkLimits::new(9000, 5).unwrap();
        let chunks = chunk_pairs(&pairs, limits);

        let flattened: Vec<&str> = chunks
            .iter()
            .flat_map(|c| c.iter().map(|p| p.session_id.as_str()))
            .collect();
        let original: Vec<&str> = pairs.iter().map(|p| p.session_id.as_str()).collect();
        assert_eq!(flattened, original);

        for chunk in &chunks {
            assert!(!chunk.is_empty());
            assert!(chunk.len() <= limits.max_pairs);
            let sum: u64 = chunk.iter().map(|p| p.total_tokens).sum();
            assert!(sum <= limits.max_total_tokens || chunk.len() == 1);
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(chunk_pairs(&[], ChunkLimits::default()).is_empty());
        assert!(build_chunks(&[], ChunkLimits::default(), false).is_empty());
    }

    #[test]
    fn test_zero_max_pairs_rejected() {
        assert!(matches!(ChunkLimits::new(100, 0), Err(Error::InvalidLimits)));
    }

    #[test]
    fn test_chunk_text_layout() {
        let mut pairs = pairs_with(&[1]);
        pairs[0].prompt_time = Some("2025-01-01T00:00:00+00:00".into());
        let text = build_chunk_text(&pairs, true);

        assert!(text.starts_with("You are analyzing prompt/answer pairs"));
        assert!(text.ends_with("---\n"));
        assert!(!text.ends_with("\n\n"));
        assert!(text.contains(
            "---\n\nPAIR 1:\nprompt_time: 2025-01-01T00:00:00+00:00\nanswer_time: null\nPROMPT:\nprompt 0\nANSWER:\nanswer 0\n\n---"
        ));

        let without = build_chunk_text(&pairs, false);
        assert!(!without.contains("prompt_time:"));
    }

    #[test]
    fn test_build_chunks_records() {
        let pairs = pairs_with(&[5000, 4000, 5000]);
        let records = build_chunks(&pairs, ChunkLimits::default(), false);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].chunk_id, 1);
        assert_eq!(records[0].pair_count, 2);
        assert_eq!(records[0].token_sum, 9000);
        assert_eq!(records[1].chunk_id, 2);
        assert!(records[1].prompt.contains("PAIR 1:\nPROMPT:\nprompt 2"));
    }

    #[test]
    fn test_token_sum_saturates_on_huge_counts() {
        let half = u64::MAX / 2 + 1;
        let pairs = pairs_with(&[half, half]);
        let limits = ChunkLimits::new(u64::MAX, 10).unwrap();
        let records = build_chunks(&pairs, limits, false);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].pair_count, 2);
        assert_eq!(records[0].token_sum, u64::MAX);
    }
}
