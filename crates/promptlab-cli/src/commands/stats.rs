use super::{progress, wrote};
use crate::render::{csv, svg, table};
use crate::settings::Settings;
use anyhow::{Context, Result};
use clap::Args;
use promptlab_core::records::write_atomic;
use promptlab_core::stats::Tally;
use promptlab_core::{load_pairs, PairStats};
use std::path::Path;

#[derive(Args, Debug, Default)]
pub struct StatsArgs {
    /// Pairs JSONL (default: <output dir>/pairs.jsonl)
    #[arg(long = "in")]
    pub input: Option<String>,

    /// Directory for CSV tables and charts
    #[arg(long)]
    pub out_dir: Option<String>,

    /// Rows kept in ranked tables and charts
    #[arg(long)]
    pub top_sessions: Option<usize>,

    /// Print a JSON summary instead of tables
    #[arg(long)]
    pub json: bool,
}

const GROUPS: [(&str, &str); 6] = [
    ("model", "Pairs per model"),
    ("provider", "Pairs per provider"),
    ("agent", "Pairs per agent"),
    ("mode", "Pairs per mode"),
    ("tool", "Pairs per tool"),
    ("source", "Pairs per source"),
];

fn group_tally<'a>(stats: &'a PairStats, group: &str) -> &'a Tally {
    match group {
        "model" => &stats.models,
        "provider" => &stats.providers,
        "agent" => &stats.agents,
        "mode" => &stats.modes,
        "tool" => &stats.tools,
        _ => &stats.sources,
    }
}

fn write_svg(path: &Path, svg: &str) -> Result<()> {
    write_atomic(path, svg.as_bytes()).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(feature = "png")]
fn write_png(svg: &str, path: &Path) {
    if let Err(err) = crate::render::png::svg_to_png(svg, path) {
        tracing::warn!("skipping {}: {:#}", path.display(), err);
    }
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _path: &Path) {}

/// Write every CSV table and chart into `out_dir`; returns the file count
pub fn write_outputs(stats: &PairStats, out_dir: &Path, top: usize) -> Result<usize> {
    let mut written = 0;

    let sessions = stats.sessions.most_common(top);
    csv::write_counts(&out_dir.join("messages_per_session.csv"), "session_id", "pairs", &sessions)?;
    let session_svg = svg::bar_chart(
        "Pairs per session",
        &format!("top {} of {} sessions", sessions.len(), stats.sessions.len()),
        &sessions,
    );
    write_svg(&out_dir.join("messages_per_session.svg"), &session_svg)?;
    write_png(&session_svg, &out_dir.join("messages_per_session.png"));
    written += 2;

    let days = stats.days.sorted_by_key();
    csv::write_counts(&out_dir.join("messages_per_day.csv"), "day", "pairs", &days)?;
    let day_svg = svg::line_chart(
        "Pairs per day",
        &format!("{} days (UTC)", days.len()),
        &days,
    );
    write_svg(&out_dir.join("messages_per_day.svg"), &day_svg)?;
    write_png(&day_svg, &out_dir.join("messages_per_day.png"));
    written += 2;

    for (group, title) in GROUPS {
        let tally = group_tally(stats, group);
        let rows = tally.most_common(top);
        csv::write_counts(&out_dir.join(format!("pairs_per_{}.csv", group)), group, "pairs", &rows)?;
        let chart = svg::bar_chart(title, &format!("top {} of {}", rows.len(), tally.len()), &rows);
        write_svg(&out_dir.join(format!("pairs_per_{}.svg", group)), &chart)?;
        written += 2;
    }

    csv::write_token_table(
        &out_dir.join("tokens_per_session.csv"),
        "session_id",
        &stats.session_tokens.top(top),
    )?;
    csv::write_token_table(
        &out_dir.join("tokens_per_model.csv"),
        "model",
        &stats.model_tokens.top(top),
    )?;
    written += 2;

    Ok(written)
}

pub fn run(args: StatsArgs, settings: &Settings) -> Result<()> {
    let input = settings.output_file(args.input.as_deref(), "pairs.jsonl");
    let out_dir = settings.output_dir(args.out_dir.as_deref());
    let top = settings.top_sessions(args.top_sessions);

    let pairs = load_pairs(&input)?;
    let stats = PairStats::from_pairs(&pairs);
    let written = write_outputs(&stats, &out_dir, top)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats.summary(top))?);
        return Ok(());
    }

    progress(&format!(
        "{} pairs, {} sessions, {} days",
        stats.pairs,
        stats.sessions.len(),
        stats.days.len()
    ));
    println!("{}", table::token_table("Model", &stats.model_tokens.top(top)));
    if !stats.tools.is_empty() {
        println!("{}", table::count_table("Tool", &stats.tools.most_common(top)));
    }
    wrote(&format!("{} stats files", written), &out_dir);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptlab_core::Pair;
    use tempfile::TempDir;

    #[test]
    fn test_write_outputs_creates_tables_and_charts() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("stats");
        let pairs = vec![Pair {
            session_id: "s1".into(),
            source: Some("claude".into()),
            prompt_tokens: 2,
            answer_tokens: 3,
            total_tokens: 5,
            prompt_time: Some("2025-01-01T00:00:00+00:00".into()),
            ..Default::default()
        }];
        let stats = PairStats::from_pairs(&pairs);
        let written = write_outputs(&stats, &out, 20).unwrap();
        assert_eq!(written, 18);

        for name in [
            "messages_per_session.csv",
            "messages_per_session.svg",
            "messages_per_day.csv",
            "messages_per_day.svg",
            "pairs_per_source.csv",
            "pairs_per_tool.svg",
            "tokens_per_session.csv",
            "tokens_per_model.csv",
        ] {
            assert!(out.join(name).exists(), "missing {}", name);
        }
        let day_csv = std::fs::read_to_string(out.join("messages_per_day.csv")).unwrap();
        assert_eq!(day_csv, "day,pairs\n2025-01-01,1\n");
        let models = std::fs::read_to_string(out.join("tokens_per_model.csv")).unwrap();
        assert!(models.contains("unknown/unknown,1,2,3,5,0.000000"));
    }
}
