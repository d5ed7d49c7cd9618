use super::{format_cost, format_currency, format_tokens};
use comfy_table::{ContentArrangement, Table};
use promptlab_core::stats::TokenTotals;
use promptlab_core::usage::UsageReport;

/// Token sums per session or model, as printed by `promptlab stats`
pub fn token_table(key_header: &str, rows: &[(String, TokenTotals)]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![key_header, "Pairs", "Prompt", "Answer", "Total", "Cost"]);

    for (key, totals) in rows {
        table.add_row(vec![
            key.clone(),
            totals.pairs.to_string(),
            format_tokens(totals.prompt_tokens as i64),
            format_tokens(totals.answer_tokens as i64),
            format_tokens(totals.total_tokens as i64),
            format_currency(totals.estimated_cost),
        ]);
    }
    table
}

pub fn count_table(key_header: &str, rows: &[(String, u64)]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![key_header, "Pairs"]);
    for (key, count) in rows {
        table.add_row(vec![key.clone(), count.to_string()]);
    }
    table
}

pub fn usage_table(report: &UsageReport) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Model", "Messages", "Input", "Output", "Reasoning", "Cache", "Cost",
    ]);

    for (key, usage) in &report.models {
        table.add_row(vec![
            key.clone(),
            usage.messages.to_string(),
            format_tokens(usage.input),
            format_tokens(usage.output),
            format_tokens(usage.reasoning),
            format_tokens(usage.cache_read),
            format_cost(usage.cost_estimated),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_table_rows() {
        let rows = vec![(
            "openai/gpt-5.2-codex".to_string(),
            TokenTotals {
                pairs: 3,
                prompt_tokens: 1_500,
                answer_tokens: 20,
                total_tokens: 1_520,
                estimated_cost: 1.5,
            },
        )];
        let rendered = token_table("Model", &rows).to_string();
        assert!(rendered.contains("openai/gpt-5.2-codex"));
        assert!(rendered.contains("1.5K"));
        assert!(rendered.contains("$1.50"));
    }

    #[test]
    fn test_count_table_header() {
        let rendered = count_table("Tool", &[("bash".to_string(), 4)]).to_string();
        assert!(rendered.contains("Tool"));
        assert!(rendered.contains("bash"));
    }
}
