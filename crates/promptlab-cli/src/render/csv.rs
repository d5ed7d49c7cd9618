use anyhow::Result;
use promptlab_core::records::write_atomic;
use promptlab_core::stats::TokenTotals;
use std::path::Path;

fn write_rows<R>(path: &Path, header: &[&str], rows: R) -> Result<()>
where
    R: IntoIterator<Item = Vec<String>>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(&row)?;
    }
    let bytes = writer.into_inner().map_err(|e| anyhow::anyhow!("{}", e.error()))?;
    write_atomic(path, &bytes)?;
    Ok(())
}

/// Two-column `key,count` table
pub fn write_counts(path: &Path, key_header: &str, count_header: &str, rows: &[(String, u64)]) -> Result<()> {
    write_rows(
        path,
        &[key_header, count_header],
        rows.iter().map(|(k, v)| vec![k.clone(), v.to_string()]),
    )
}

/// Token sums per key, cost with six decimals
pub fn write_token_table(path: &Path, key_header: &str, rows: &[(String, TokenTotals)]) -> Result<()> {
    write_rows(
        path,
        &[
            key_header,
            "pairs",
            "prompt_tokens",
            "answer_tokens",
            "total_tokens",
            "estimated_cost",
        ],
        rows.iter().map(|(key, t)| {
            vec![
                key.clone(),
                t.pairs.to_string(),
                t.prompt_tokens.to_string(),
                t.answer_tokens.to_string(),
                t.total_tokens.to_string(),
                format!("{:.6}", t.estimated_cost),
            ]
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_counts_quotes_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/counts.csv");
        write_counts(&path, "session_id", "pairs", &[("a,b".to_string(), 3), ("c".to_string(), 1)]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "session_id,pairs\n\"a,b\",3\nc,1\n");
    }

    #[test]
    fn test_write_token_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tokens.csv");
        let totals = TokenTotals {
            pairs: 2,
            prompt_tokens: 10,
            answer_tokens: 5,
            total_tokens: 15,
            estimated_cost: 0.5,
        };
        write_token_table(&path, "model", &[("openai/gpt".to_string(), totals)]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("model,pairs,prompt_tokens,answer_tokens,total_tokens,estimated_cost")
        );
        assert_eq!(lines.next(), Some("openai/gpt,2,10,5,15,0.500000"));
    }
}
