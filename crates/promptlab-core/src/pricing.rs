//! Static per-model pricing
//!
//! Keys are `provider/model`. Prices are USD per 1M tokens. Models missing
//! from the table cost nothing.

use once_cell::sync::Lazy;
use std::collections::HashMap;

const PER_MILLION: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModelPricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
    pub cache_read_per_million: f64,
}

static PRICING: Lazy<HashMap<&'static str, ModelPricing>> = Lazy::new(build_pricing_table);

fn build_pricing_table() -> HashMap<&'static str, ModelPricing> {
    let entries: &[(&str, f64, f64, f64)] = &[
        // Free-tier models
        ("opencode/kimi-k2.5-free", 0.0, 0.0, 0.0),
        ("opencode/glm-4.7-free", 0.0, 0.0, 0.0),
        ("opencode/glm-5-free", 0.0, 0.0, 0.0),
        // Internal model, price unknown
        ("opencode/big-pickle", 0.0, 0.0, 0.0),
        // GPT-5.x codex: $1.75/$14.00 per 1M tokens, $0.175 cache read
        ("openai/gpt-5.2-codex", 1.75, 14.00, 0.175),
        ("openai/gpt-5.3-codex", 1.75, 14.00, 0.175),
    ];

    let mut table = HashMap::with_capacity(entries.len());
    for (key, input, output, cache_read) in entries {
        table.insert(
            *key,
            ModelPricing {
                input_per_million: *input,
                output_per_million: *output,
                cache_read_per_million: *cache_read,
            },
        );
    }
    table
}

pub fn lookup(model_key: &str) -> Option<ModelPricing> {
    PRICING.get(model_key).copied()
}

fn non_negative(count: i64) -> f64 {
    count.max(0) as f64
}

/// Estimated USD cost of a token mix; 0 for unlisted models
pub fn estimate_cost(model_key: &str, input: i64, output: i64, cache_read: i64) -> f64 {
    let price = lookup(model_key).unwrap_or_default();
    let cost = non_negative(input) / PER_MILLION * price.input_per_million
        + non_negative(output) / PER_MILLION * price.output_per_million
        + non_negative(cache_read) / PER_MILLION * price.cache_read_per_million;
    if cost.is_finite() {
        cost.max(0.0)
    } else {
        0.0
    }
}
