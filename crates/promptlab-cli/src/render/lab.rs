//! Lab report over a pairs dataset, as Markdown or a single HTML page

use super::escape_xml;
use promptlab_core::metrics::{self, ascii_bar, LabMetrics, Quantiles};
use std::fmt::Write;
use std::path::{Component, Path, PathBuf};

const TITLE: &str = "Lab Report: Prompt/Answer Dataset";
const DAY_BAR_WIDTH: usize = 30;

/// Chart files `promptlab stats` may leave in the assets directory
pub const CHART_FILES: [(&str, &str); 8] = [
    ("Messages per session", "messages_per_session.svg"),
    ("Messages per day", "messages_per_day.svg"),
    ("Pairs per model", "pairs_per_model.svg"),
    ("Pairs per provider", "pairs_per_provider.svg"),
    ("Pairs per agent", "pairs_per_agent.svg"),
    ("Pairs per mode", "pairs_per_mode.svg"),
    ("Pairs per tool", "pairs_per_tool.svg"),
    ("Pairs per source", "pairs_per_source.svg"),
];

const RECOMMENDATIONS: [&str; 3] = [
    "Convert repeated rule-like prompts into AGENTS.md or CLAUDE.md entries.",
    "Promote frequently referenced slash commands into skills if not already present.",
    "Use the top prompt starters list to create template skills or prompts.",
];

const METHODOLOGY: [&str; 4] = [
    "Parsed prompt/answer pairs from pairs.jsonl.",
    "Token counts derived from the dataset (BPE tokenizer when available, whitespace fallback).",
    "Rule candidates detected via modal keyword heuristics.",
    "Skill mentions detected via slash command regex.",
];

const LIMITATIONS: [&str; 3] = [
    "Heuristic rule detection may include false positives.",
    "Token counts are approximate when the whitespace tokenizer was used.",
    "Multi-turn context is not reconstructed beyond prompt/answer pairs.",
];

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn normalized(path: &Path) -> Vec<Component<'_>> {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir if matches!(parts.last(), Some(Component::Normal(_))) => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts
}

/// `target` relative to the directory `base`, with `/` separators
pub fn relative_path(target: &Path, base: &Path) -> String {
    let target = absolute(target);
    let base = absolute(base);
    let target_parts = normalized(&target);
    let base_parts = normalized(&base);

    let common = target_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<String> = Vec::new();
    for _ in common..base_parts.len() {
        segments.push("..".to_string());
    }
    for part in &target_parts[common..] {
        segments.push(part.as_os_str().to_string_lossy().into_owned());
    }
    if segments.is_empty() {
        ".".to_string()
    } else {
        segments.join("/")
    }
}

/// Existing charts as `(label, path relative to the report directory)`
pub fn find_charts(assets_dir: &Path, report_dir: &Path) -> Vec<(&'static str, String)> {
    CHART_FILES
        .iter()
        .filter_map(|(label, file)| {
            let path = assets_dir.join(file);
            path.exists().then(|| (*label, relative_path(&path, report_dir)))
        })
        .collect()
}

fn quantile_line(label: &str, q: Quantiles) -> String {
    format!("{} tokens (median / p90 / p99): {} / {} / {}", label, q.p50, q.p90, q.p99)
}

pub fn render_markdown(m: &LabMetrics, generated: &str, assets_dir: &Path) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}\n", TITLE);
    let _ = writeln!(out, "Generated: {}\n", generated);

    let _ = writeln!(out, "## Overview");
    let _ = writeln!(out, "- Total prompt/answer pairs: {}", m.total_pairs);
    let _ = writeln!(out, "- Total prompt tokens: {}", m.sum_prompt_tokens());
    let _ = writeln!(out, "- Total answer tokens: {}", m.sum_answer_tokens());
    let _ = writeln!(out, "- Total tokens: {}\n", m.sum_total_tokens());

    let _ = writeln!(out, "## Token Distribution");
    let _ = writeln!(out, "{}", quantile_line("Prompt", m.prompt_quantiles()));
    let _ = writeln!(out, "{}", quantile_line("Answer", m.answer_quantiles()));
    let _ = writeln!(out, "{}\n", quantile_line("Total", m.total_quantiles()));

    let _ = writeln!(out, "## Activity Over Time (pairs/day)");
    let days = m.days.sorted_by_key();
    let max_day = days.iter().map(|(_, c)| *c).max().unwrap_or(0);
    for (day, count) in &days {
        let _ = writeln!(
            out,
            "- {} | {:4} | {}",
            day,
            count,
            ascii_bar(*count, max_day, DAY_BAR_WIDTH)
        );
    }
    out.push('\n');

    let _ = writeln!(out, "## Charts");
    for (label, file) in CHART_FILES.iter().take(2) {
        let _ = writeln!(
            out,
            "- {}: `{}`",
            label.to_lowercase(),
            assets_dir.join(file).display()
        );
    }
    out.push('\n');

    let _ = writeln!(out, "## Top Sessions (by pairs)");
    for (session, count) in m.sessions.most_common(metrics::TOP_SESSIONS) {
        let _ = writeln!(out, "- {} | {}", session, count);
    }
    out.push('\n');

    let _ = writeln!(out, "## Prompt Starters (top {})", metrics::TOP_PROMPTS);
    for (text, count) in m.prompt_starts.most_common(metrics::TOP_PROMPTS) {
        let _ = writeln!(out, "- {} | {}", text, count);
    }
    out.push('\n');

    markdown_ranked(
        &mut out,
        "Candidate Global Rules (heuristic)",
        &m.rule_candidates.most_common(metrics::TOP_RULES),
    );
    markdown_ranked(
        &mut out,
        "Skill Mentions (slash commands)",
        &m.skill_mentions.most_common(metrics::TOP_SKILLS),
    );

    let _ = writeln!(out, "## Corrections and Constraints");
    let _ = writeln!(out, "- Prompts containing correction language: {}\n", m.correction_hits);

    markdown_list(&mut out, "Recommendations", &RECOMMENDATIONS);
    markdown_list(&mut out, "Methodology", &METHODOLOGY);
    markdown_list(&mut out, "Limitations", &LIMITATIONS);

    format!("{}\n", out.trim_end())
}

fn markdown_ranked(out: &mut String, heading: &str, items: &[(String, u64)]) {
    let _ = writeln!(out, "## {}", heading);
    if items.is_empty() {
        let _ = writeln!(out, "- none detected");
    }
    for (text, count) in items {
        let _ = writeln!(out, "- {} | {}", text, count);
    }
    out.push('\n');
}

fn markdown_list(out: &mut String, heading: &str, items: &[&str]) {
    let _ = writeln!(out, "## {}", heading);
    for item in items {
        let _ = writeln!(out, "- {}", item);
    }
    out.push('\n');
}

fn html_items(items: &[(String, u64)]) -> String {
    if items.is_empty() {
        return "<li>none detected</li>".to_string();
    }
    items
        .iter()
        .map(|(text, count)| {
            format!(
                r#"<li>{} <span class="muted">({})</span></li>"#,
                escape_xml(text),
                count
            )
        })
        .collect::<Vec<_>>()
        .join("\n        ")
}

const LAB_CSS: &str = r#"    :root {
      --bg: #f7f7fb;
      --card: #ffffff;
      --text: #141419;
      --muted: #5b6270;
      --accent: #2f6fe4;
      --border: #e4e6ef;
    }
    body {
      margin: 0;
      font-family: "Inter", "Helvetica Neue", Arial, sans-serif;
      background: var(--bg);
      color: var(--text);
    }
    header {
      padding: 40px 8vw 24px;
      background: linear-gradient(120deg, #eef2ff 0%, #f7f7fb 60%);
      border-bottom: 1px solid var(--border);
    }
    header h1 { margin: 0 0 8px; font-size: 32px; }
    header p { margin: 0; color: var(--muted); }
    main { padding: 24px 8vw 48px; display: grid; gap: 20px; }
    section {
      background: var(--card);
      border: 1px solid var(--border);
      border-radius: 16px;
      padding: 20px 24px;
      box-shadow: 0 10px 30px rgba(20, 20, 40, 0.06);
    }
    h2 { margin-top: 0; font-size: 20px; }
    .grid {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(220px, 1fr));
      gap: 16px;
    }
    .metric {
      border: 1px solid var(--border);
      border-radius: 12px;
      padding: 14px 16px;
      background: #fbfbff;
    }
    .metric h3 {
      margin: 0 0 6px;
      font-size: 14px;
      color: var(--muted);
      font-weight: 600;
      text-transform: uppercase;
      letter-spacing: 0.04em;
    }
    .metric p { margin: 0; font-size: 18px; font-weight: 600; }
    ul { margin: 8px 0 0 18px; }
    .muted { color: var(--muted); font-size: 0.9em; }
    .charts img {
      width: 100%;
      border-radius: 12px;
      border: 1px solid var(--border);
      background: #fff;
      padding: 8px;
    }
"#;

pub fn render_html(m: &LabMetrics, generated: &str, charts: &[(&str, String)]) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>{title}</title>
  <style>
{css}  </style>
</head>
<body>
  <header>
    <h1>{title}</h1>
    <p>Generated {generated}</p>
  </header>
  <main>
"#,
        title = TITLE,
        css = LAB_CSS,
        generated = escape_xml(generated)
    );

    let _ = write!(
        out,
        r#"    <section>
      <h2>Overview</h2>
      <div class="grid">
        <div class="metric"><h3>Total pairs</h3><p>{}</p></div>
        <div class="metric"><h3>Prompt tokens</h3><p>{}</p></div>
        <div class="metric"><h3>Answer tokens</h3><p>{}</p></div>
        <div class="metric"><h3>Total tokens</h3><p>{}</p></div>
      </div>
    </section>
    <section>
      <h2>Token Distribution</h2>
      <ul>
        <li>{}</li>
        <li>{}</li>
        <li>{}</li>
      </ul>
    </section>
"#,
        m.total_pairs,
        m.sum_prompt_tokens(),
        m.sum_answer_tokens(),
        m.sum_total_tokens(),
        quantile_line("Prompt", m.prompt_quantiles()),
        quantile_line("Answer", m.answer_quantiles()),
        quantile_line("Total", m.total_quantiles()),
    );

    let images: String = charts
        .iter()
        .map(|(label, path)| {
            format!(
                r#"<img src="{}" alt="{}" />"#,
                escape_xml(path),
                escape_xml(label)
            )
        })
        .collect();
    let _ = write!(
        out,
        "    <section class=\"charts\">\n      <h2>Charts</h2>\n      {}\n    </section>\n",
        images
    );

    let ranked = [
        ("Top Sessions", m.sessions.most_common(metrics::TOP_SESSIONS)),
        ("Prompt Starters", m.prompt_starts.most_common(metrics::TOP_PROMPTS)),
        ("Candidate Global Rules", m.rule_candidates.most_common(metrics::TOP_RULES)),
        ("Skill Mentions", m.skill_mentions.most_common(metrics::TOP_SKILLS)),
    ];
    for (heading, items) in &ranked {
        let _ = write!(
            out,
            "    <section>\n      <h2>{}</h2>\n      <ul>\n        {}\n      </ul>\n    </section>\n",
            heading,
            html_items(items)
        );
    }

    let _ = write!(
        out,
        r#"    <section>
      <h2>Corrections and Constraints</h2>
      <p>Prompts containing correction language: <strong>{}</strong></p>
    </section>
    <section>
      <h2>Methodology</h2>
      <ul>
"#,
        m.correction_hits
    );
    for item in METHODOLOGY {
        let _ = writeln!(out, "        <li>{}</li>", item);
    }
    out.push_str(
        r#"      </ul>
      <p class="muted">Heuristic rule detection may include false positives; multi-turn context is not reconstructed beyond pairs.</p>
    </section>
  </main>
</body>
</html>
"#,
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptlab_core::Pair;
    use tempfile::TempDir;

    fn sample_metrics() -> LabMetrics {
        let pairs = vec![
            Pair {
                session_id: "s1".into(),
                prompt: "You must always run the tests first.\n/review".into(),
                prompt_tokens: 10,
                answer_tokens: 20,
                total_tokens: 30,
                prompt_time: Some("2025-02-01T08:00:00+00:00".into()),
                ..Default::default()
            },
            Pair {
                session_id: "s1".into(),
                prompt: "<b>bold</b> & more".into(),
                prompt_tokens: 1,
                answer_tokens: 1,
                total_tokens: 2,
                prompt_time: Some("2025-02-03T08:00:00+00:00".into()),
                ..Default::default()
            },
        ];
        LabMetrics::collect(&pairs)
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(
            relative_path(Path::new("/a/out/x.svg"), Path::new("/a/out")),
            "x.svg"
        );
        assert_eq!(
            relative_path(Path::new("/a/assets/x.svg"), Path::new("/a/reports/html")),
            "../../assets/x.svg"
        );
        assert_eq!(relative_path(Path::new("/a/./b"), Path::new("/a/b")), ".");
    }

    #[test]
    fn test_find_charts_only_existing() {
        let dir = TempDir::new().unwrap();
        let assets = dir.path().join("assets");
        std::fs::create_dir_all(&assets).unwrap();
        std::fs::write(assets.join("messages_per_day.svg"), "<svg/>").unwrap();
        std::fs::write(assets.join("pairs_per_tool.svg"), "<svg/>").unwrap();

        let charts = find_charts(&assets, &dir.path().join("report"));
        assert_eq!(
            charts,
            vec![
                ("Messages per day", "../assets/messages_per_day.svg".to_string()),
                ("Pairs per tool", "../assets/pairs_per_tool.svg".to_string()),
            ]
        );
    }

    #[test]
    fn test_markdown_sections() {
        let md = render_markdown(&sample_metrics(), "2025-02-04T00:00:00", Path::new("output"));
        assert!(md.starts_with("# Lab Report: Prompt/Answer Dataset\n\nGenerated: 2025-02-04T00:00:00\n"));
        assert!(md.contains("- Total prompt/answer pairs: 2"));
        assert!(md.contains("Total tokens (median / p90 / p99): 2 / 2 / 2"));
        assert!(md.contains(&format!("- 2025-02-01 |    1 | {}", "#".repeat(30))));
        assert!(md.contains("- s1 | 2"));
        assert!(md.contains("- you must always run the tests first | 1"));
        assert!(md.contains("- /review | 1"));
        assert!(md.contains("- messages per session: `output/messages_per_session.svg`"));
        assert!(md.contains("- Prompts containing correction language: 0"));
        assert!(md.ends_with("pairs.\n"));
    }

    #[test]
    fn test_markdown_none_detected() {
        let md = render_markdown(&LabMetrics::default(), "now", Path::new("output"));
        assert_eq!(md.matches("- none detected").count(), 2);
    }

    #[test]
    fn test_html_escapes_and_embeds_charts() {
        let charts = vec![("Messages per day", "messages_per_day.svg".to_string())];
        let html = render_html(&sample_metrics(), "now", &charts);
        assert!(html.starts_with("<!doctype html>"));
        assert!(html.contains(r#"<img src="messages_per_day.svg" alt="Messages per day" />"#));
        assert!(html.contains("&lt;b&gt;bold&lt;/b&gt; &amp; more"));
        assert!(!html.contains("<b>bold</b>"));
        assert!(html.contains(r#"<div class="metric"><h3>Total pairs</h3><p>2</p></div>"#));
        assert!(html.trim_end().ends_with("</html>"));
    }
}
