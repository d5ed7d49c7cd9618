//! Self-contained HTML page for OpenCode token usage

use super::{escape_xml, format_cost, format_tokens, format_with_commas, truncate_label};
use promptlab_core::usage::{IoTokens, ModelUsage, TimeGrouping, UsageReport};
use std::fmt::Write;

pub const PALETTE: [&str; 6] = ["#6366f1", "#22d3ee", "#f59e0b", "#10b981", "#ef4444", "#a78bfa"];

const CHART_WIDTH: f64 = 820.0;
const MODEL_ROW_HEIGHT: f64 = 34.0;
const MODEL_LABEL_WIDTH: f64 = 200.0;
const TIMELINE_HEIGHT: f64 = 300.0;
const TIMELINE_PAD: f64 = 48.0;
const DONUT_WIDTH: f64 = 420.0;
const DONUT_HEIGHT: f64 = 220.0;
const DONUT_RADIUS: f64 = 80.0;
const DONUT_STROKE: f64 = 28.0;

/// Split a `provider/model` key; keys without a slash are all model
fn split_key(key: &str) -> (&str, &str) {
    match key.split_once('/') {
        Some((provider, model)) => (provider, model),
        None => ("unknown", key),
    }
}

fn model_bars(models: &[(String, ModelUsage)]) -> String {
    let height = (models.len().max(1) as f64) * MODEL_ROW_HEIGHT + 24.0;
    let plot = CHART_WIDTH - MODEL_LABEL_WIDTH - 90.0;
    let max_total = models.iter().map(|(_, m)| m.total()).max().unwrap_or(0).max(1) as f64;

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg class="chart" viewBox="0 0 {w} {h}" width="100%" role="img" aria-label="Tokens by model">"#,
        w = CHART_WIDTH,
        h = height
    );
    for (index, (key, usage)) in models.iter().enumerate() {
        let color = PALETTE[index % PALETTE.len()];
        let y = 12.0 + index as f64 * MODEL_ROW_HEIGHT;
        let input_w = usage.input.max(0) as f64 / max_total * plot;
        let output_w = usage.output.max(0) as f64 / max_total * plot;
        let (_, model) = split_key(key);
        let _ = writeln!(
            svg,
            r##"<text x="{:.1}" y="{:.1}" text-anchor="end" fill="#e6edf3" font-size="12">{}</text>"##,
            MODEL_LABEL_WIDTH - 10.0,
            y + 15.0,
            escape_xml(&truncate_label(model, 28))
        );
        let _ = writeln!(
            svg,
            r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="20" rx="3" fill="{}"/>"#,
            MODEL_LABEL_WIDTH, y, input_w, color
        );
        let _ = writeln!(
            svg,
            r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="20" rx="3" fill="{}" fill-opacity="0.45"/>"#,
            MODEL_LABEL_WIDTH + input_w,
            y,
            output_w,
            color
        );
        let _ = writeln!(
            svg,
            r##"<text x="{:.1}" y="{:.1}" fill="#7d8590" font-size="11">{}</text>"##,
            MODEL_LABEL_WIDTH + input_w + output_w + 6.0,
            y + 15.0,
            format_tokens(usage.total())
        );
    }
    svg.push_str("</svg>");
    svg
}

fn donut(models: &[(String, ModelUsage)]) -> String {
    let total: f64 = models.iter().map(|(_, m)| m.output.max(0) as f64).sum();
    let circumference = 2.0 * std::f64::consts::PI * DONUT_RADIUS;

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg class="chart" viewBox="0 0 {w} {h}" width="100%" role="img" aria-label="Output token share">"#,
        w = DONUT_WIDTH,
        h = DONUT_HEIGHT
    );
    let (cx, cy) = (DONUT_HEIGHT / 2.0, DONUT_HEIGHT / 2.0);
    let _ = writeln!(
        svg,
        r##"<circle cx="{cx}" cy="{cy}" r="{r}" fill="none" stroke="#21262d" stroke-width="{sw}"/>"##,
        cx = cx,
        cy = cy,
        r = DONUT_RADIUS,
        sw = DONUT_STROKE
    );

    let mut offset = 0.0;
    for (index, (key, usage)) in models.iter().enumerate() {
        let color = PALETTE[index % PALETTE.len()];
        let share = if total > 0.0 {
            usage.output.max(0) as f64 / total
        } else {
            0.0
        };
        let length = share * circumference;
        if length > 0.0 {
            let _ = writeln!(
                svg,
                r#"<circle cx="{cx}" cy="{cy}" r="{r}" fill="none" stroke="{color}" stroke-width="{sw}" stroke-dasharray="{len:.2} {rest:.2}" stroke-dashoffset="{off:.2}" transform="rotate(-90 {cx} {cy})"/>"#,
                cx = cx,
                cy = cy,
                r = DONUT_RADIUS,
                color = color,
                sw = DONUT_STROKE,
                len = length,
                rest = circumference - length,
                off = -offset
            );
        }
        offset += length;

        let (_, model) = split_key(key);
        let y = 24.0 + index as f64 * 22.0;
        let _ = writeln!(
            svg,
            r#"<rect x="{x}" y="{y:.1}" width="12" height="12" rx="2" fill="{color}"/>"#,
            x = DONUT_HEIGHT + 10.0,
            y = y - 10.0,
            color = color
        );
        let _ = writeln!(
            svg,
            r##"<text x="{x}" y="{y:.1}" fill="#e6edf3" font-size="12">{label} <tspan fill="#7d8590">{pct:.1}%</tspan></text>"##,
            x = DONUT_HEIGHT + 28.0,
            y = y,
            label = escape_xml(&truncate_label(model, 24)),
            pct = share * 100.0
        );
    }
    let _ = writeln!(
        svg,
        r##"<text x="{cx}" y="{cy}" text-anchor="middle" fill="#e6edf3" font-size="16" font-weight="700">{v}</text>"##,
        cx = cx,
        cy = cy + 6.0,
        v = format_tokens(total as i64)
    );
    svg.push_str("</svg>");
    svg
}

/// Input, output and total lines for one timeline grouping
fn timeline_chart(series: &[(String, IoTokens)], grouping: TimeGrouping) -> String {
    let plot_w = CHART_WIDTH - TIMELINE_PAD * 2.0;
    let plot_h = TIMELINE_HEIGHT - TIMELINE_PAD * 2.0;
    let bottom = TIMELINE_PAD + plot_h;
    let max_value = series.iter().map(|(_, t)| t.total()).max().unwrap_or(0).max(1) as f64;

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg class="chart" viewBox="0 0 {w} {h}" width="100%" role="img" aria-label="Tokens per {g}">"#,
        w = CHART_WIDTH,
        h = TIMELINE_HEIGHT,
        g = grouping.as_str()
    );
    let _ = writeln!(
        svg,
        r##"<line x1="{p}" y1="{b}" x2="{r}" y2="{b}" stroke="#21262d"/>"##,
        p = TIMELINE_PAD,
        b = bottom,
        r = CHART_WIDTH - TIMELINE_PAD
    );
    let _ = writeln!(
        svg,
        r##"<text x="{}" y="{}" fill="#7d8590" font-size="11">max: {}</text>"##,
        TIMELINE_PAD,
        TIMELINE_PAD - 12.0,
        format_tokens(max_value as i64)
    );

    let x_at = |index: usize| {
        if series.len() > 1 {
            TIMELINE_PAD + plot_w * index as f64 / (series.len() - 1) as f64
        } else {
            TIMELINE_PAD + plot_w / 2.0
        }
    };
    let y_at = |value: i64| bottom - plot_h * (value.max(0) as f64 / max_value);

    let lines: [(&str, &str, fn(&IoTokens) -> i64); 3] = [
        ("Input", PALETTE[0], |t| t.input),
        ("Output", PALETTE[1], |t| t.output),
        ("Total", PALETTE[2], IoTokens::total),
    ];
    for (index, (label, color, value)) in lines.iter().enumerate() {
        let coords: Vec<String> = series
            .iter()
            .enumerate()
            .map(|(i, (_, t))| format!("{:.1},{:.1}", x_at(i), y_at(value(t))))
            .collect();
        if coords.len() > 1 {
            let _ = writeln!(
                svg,
                r#"<polyline class="series" points="{}" fill="none" stroke="{}" stroke-width="2"/>"#,
                coords.join(" "),
                color
            );
        } else if let Some((_, t)) = series.first() {
            let _ = writeln!(
                svg,
                r#"<circle cx="{:.1}" cy="{:.1}" r="3" fill="{}"/>"#,
                x_at(0),
                y_at(value(t)),
                color
            );
        }
        let legend_x = CHART_WIDTH - TIMELINE_PAD - 240.0 + index as f64 * 80.0;
        let _ = writeln!(
            svg,
            r##"<rect x="{:.1}" y="{:.1}" width="10" height="10" fill="{}"/><text x="{:.1}" y="{:.1}" fill="#7d8590" font-size="11">{}</text>"##,
            legend_x,
            TIMELINE_PAD - 21.0,
            color,
            legend_x + 14.0,
            TIMELINE_PAD - 12.0,
            label
        );
    }

    let label_step = (series.len() / 8).max(1);
    for (index, (key, _)) in series.iter().enumerate() {
        if index % label_step == 0 {
            let _ = writeln!(
                svg,
                r##"<text x="{:.1}" y="{:.1}" text-anchor="middle" fill="#7d8590" font-size="11">{}</text>"##,
                x_at(index),
                bottom + 18.0,
                escape_xml(key)
            );
        }
    }
    svg.push_str("</svg>");
    svg
}

/// One radio-switched panel per grouping, day selected
fn timeline_panels(report: &UsageReport) -> String {
    let mut tabs = String::new();
    let mut panels = String::new();
    for grouping in TimeGrouping::ALL {
        let name = grouping.as_str();
        let checked = if grouping == TimeGrouping::Day { " checked" } else { "" };
        let _ = write!(
            tabs,
            r#"
      <input type="radio" name="timeline" id="tl-{name}"{checked}/><label class="btn" for="tl-{name}">{title}</label>"#,
            name = name,
            checked = checked,
            title = capitalize(name)
        );
        let _ = write!(
            panels,
            r#"
      <div class="timeline-panel" id="panel-{name}">{chart}</div>"#,
            name = name,
            chart = timeline_chart(&report.timeline(grouping), grouping)
        );
    }
    format!(
        r#"<div class="timeline">
    <div class="timeline-header">
      <h2>Token Usage Over Time</h2>
      <div class="btn-group">{tabs}
      </div>
    </div>{panels}
    </div>"#,
        tabs = tabs,
        panels = panels
    )
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn card(out: &mut String, label: &str, value: &str, sub: &str, color: Option<&str>) {
    let style = color
        .map(|c| format!(r#" style="color:{}""#, c))
        .unwrap_or_default();
    let _ = write!(
        out,
        r#"
    <div class="card">
      <div class="label">{}</div>
      <div class="value"{}>{}</div>
      <div class="sub">{}</div>
    </div>"#,
        label,
        style,
        escape_xml(value),
        escape_xml(sub)
    );
}

fn model_rows(models: &[(String, ModelUsage)]) -> String {
    let mut rows = String::new();
    for (index, (key, ms)) in models.iter().enumerate() {
        let color = PALETTE[index % PALETTE.len()];
        let (provider, model) = split_key(key);
        let _ = write!(
            rows,
            r#"
          <tr>
            <td data-sort="{model}"><span class="model-badge" style="background:{c}20;color:{c};border-color:{c}40">{model}</span></td>
            <td class="mono" data-sort="{provider}">{provider}</td>
            <td class="mono right" data-sort="{messages_raw}">{messages}</td>
            <td class="mono right" data-sort="{input_raw}">{input}</td>
            <td class="mono right" data-sort="{output_raw}">{output}</td>
            <td class="mono right" data-sort="{reasoning_raw}">{reasoning}</td>
            <td class="mono right" data-sort="{cache_raw}">{cache}</td>
            <td class="mono right" data-sort="{total_raw}">{total}</td>
            <td class="mono right cost" data-sort="{cost_raw:.6}">{cost}</td>
          </tr>"#,
            c = color,
            messages_raw = ms.messages,
            input_raw = ms.input,
            output_raw = ms.output,
            reasoning_raw = ms.reasoning,
            cache_raw = ms.cache_read,
            total_raw = ms.total(),
            cost_raw = ms.cost_estimated,
            model = escape_xml(model),
            provider = escape_xml(provider),
            messages = format_with_commas(ms.messages as i64),
            input = format_with_commas(ms.input),
            output = format_with_commas(ms.output),
            reasoning = format_with_commas(ms.reasoning),
            cache = format_with_commas(ms.cache_read),
            total = format_with_commas(ms.total()),
            cost = format_cost(ms.cost_estimated),
        );
    }
    rows
}

fn project_rows(report: &UsageReport) -> String {
    let mut rows = String::new();
    for project in &report.projects {
        let _ = write!(
            rows,
            r#"
          <tr>
            <td class="mono path" title="{path}" data-sort="{name}">{name}</td>
            <td class="mono right" data-sort="{messages_raw}">{messages}</td>
            <td class="mono right" data-sort="{input_raw}">{input}</td>
            <td class="mono right" data-sort="{output_raw}">{output}</td>
            <td class="mono right" data-sort="{total_raw}">{total}</td>
          </tr>"#,
            messages_raw = project.messages,
            input_raw = project.input,
            output_raw = project.output,
            total_raw = project.total(),
            path = escape_xml(&project.path),
            name = escape_xml(project.display_name()),
            messages = format_with_commas(project.messages as i64),
            input = format_with_commas(project.input),
            output = format_with_commas(project.output),
            total = format_with_commas(project.total()),
        );
    }
    rows
}

const USAGE_CSS: &str = r#"    :root {
      --bg: #0f1117;
      --surface: #161b22;
      --border: #21262d;
      --text: #e6edf3;
      --muted: #7d8590;
      --accent: #6366f1;
    }
    * { box-sizing: border-box; margin: 0; padding: 0; }
    body {
      font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", system-ui, sans-serif;
      background: var(--bg);
      color: var(--text);
      line-height: 1.6;
    }
    header {
      background: linear-gradient(135deg, #1a1f2e 0%, #161b22 100%);
      border-bottom: 1px solid var(--border);
      padding: 2rem 2.5rem;
    }
    header h1 { font-size: 1.75rem; font-weight: 700; }
    header h1 span { color: var(--accent); }
    header p { color: var(--muted); font-size: 0.875rem; margin-top: 0.25rem; }
    .container { max-width: 1400px; margin: 0 auto; padding: 2rem 2.5rem; }
    .summary-grid {
      display: grid;
      grid-template-columns: repeat(7, 1fr);
      gap: 1rem;
      margin-bottom: 2.5rem;
    }
    .card, .chart-card, .table-card {
      background: var(--surface);
      border: 1px solid var(--border);
      border-radius: 12px;
    }
    .card { padding: 1.25rem 1.5rem; }
    .card .label { font-size: 0.75rem; text-transform: uppercase; letter-spacing: 0.05em; color: var(--muted); }
    .card .value { font-size: 1.75rem; font-weight: 700; margin-top: 0.25rem; }
    .card .sub { font-size: 0.8rem; color: var(--muted); margin-top: 0.125rem; }
    h2 { font-size: 1.125rem; font-weight: 600; margin-bottom: 1rem; }
    .section { margin-bottom: 3rem; }
    .charts-grid { display: grid; grid-template-columns: 1fr 1fr; gap: 1.5rem; margin-bottom: 2.5rem; }
    .chart-card { padding: 1.5rem; }
    table { width: 100%; border-collapse: collapse; font-size: 0.875rem; }
    thead th {
      background: #0d1117;
      padding: 0.75rem 1rem;
      text-align: left;
      font-size: 0.75rem;
      font-weight: 600;
      text-transform: uppercase;
      letter-spacing: 0.04em;
      color: var(--muted);
      border-bottom: 1px solid var(--border);
    }
    thead th.right { text-align: right; }
    tbody tr { border-bottom: 1px solid var(--border); }
    tbody tr:last-child { border-bottom: none; }
    tbody tr:hover { background: #1c2128; }
    tbody td { padding: 0.75rem 1rem; }
    .table-card { overflow: hidden; }
    .table-card h2 { padding: 1.25rem 1.5rem; border-bottom: 1px solid var(--border); margin: 0; }
    .mono { font-family: ui-monospace, "SF Mono", monospace; }
    .right { text-align: right; }
    .cost { color: #22d3ee; }
    .path { max-width: 400px; overflow: hidden; text-overflow: ellipsis; white-space: nowrap; font-size: 0.8rem; color: var(--muted); }
    .model-badge {
      display: inline-block;
      padding: 0.2em 0.65em;
      border-radius: 999px;
      border: 1px solid;
      font-size: 0.8rem;
      font-weight: 500;
      font-family: ui-monospace, monospace;
    }
    .timeline { background: var(--surface); border: 1px solid var(--border); border-radius: 12px; padding: 1.5rem; margin-bottom: 2.5rem; }
    .timeline-header { display: flex; align-items: center; justify-content: space-between; gap: 0.75rem; margin-bottom: 1rem; }
    .timeline-header h2 { margin: 0; }
    .btn-group { display: flex; border: 1px solid var(--border); border-radius: 8px; overflow: hidden; }
    .btn-group input { display: none; }
    .btn { color: var(--muted); padding: 0.35rem 0.75rem; font-size: 0.75rem; cursor: pointer; }
    .btn:hover { color: var(--text); background: #1c2128; }
    .timeline-panel { display: none; }
    #tl-hour:checked ~ label[for="tl-hour"], #tl-day:checked ~ label[for="tl-day"],
    #tl-week:checked ~ label[for="tl-week"], #tl-month:checked ~ label[for="tl-month"] { background: var(--accent); color: #fff; }
    .timeline:has(#tl-hour:checked) #panel-hour, .timeline:has(#tl-day:checked) #panel-day,
    .timeline:has(#tl-week:checked) #panel-week, .timeline:has(#tl-month:checked) #panel-month { display: block; }
    .sortable thead th { cursor: pointer; user-select: none; }
    .sortable thead th:hover { color: var(--text); }
    .sortable thead th.sort-asc::after { content: " \25B2"; color: var(--accent); }
    .sortable thead th.sort-desc::after { content: " \25BC"; color: var(--accent); }
    @media (max-width: 900px) {
      .charts-grid { grid-template-columns: 1fr; }
      .summary-grid { grid-template-columns: repeat(2, 1fr); }
    }
"#;

/// Click-to-sort for `table.sortable`, keyed on each cell's `data-sort`
const SORT_SCRIPT: &str = r#"document.querySelectorAll("table.sortable").forEach(table => {
  table.querySelectorAll("thead th").forEach((th, col) => {
    th.addEventListener("click", () => {
      const numeric = th.dataset.type === "number";
      const asc = !th.classList.contains("sort-asc");
      table.querySelectorAll("thead th").forEach(h => h.classList.remove("sort-asc", "sort-desc"));
      th.classList.add(asc ? "sort-asc" : "sort-desc");
      const body = table.tBodies[0];
      const rows = Array.from(body.rows);
      rows.sort((a, b) => {
        const x = a.cells[col].dataset.sort, y = b.cells[col].dataset.sort;
        const cmp = numeric ? Number(x) - Number(y) : x.localeCompare(y);
        return asc ? cmp : -cmp;
      });
      rows.forEach(row => body.appendChild(row));
    });
  });
});
"#;

/// Render the usage page; `generated` is shown verbatim in the header
pub fn render_usage_html(report: &UsageReport, generated: &str, data_dir: &str) -> String {
    let totals = report.totals();
    let mut cards = String::new();
    card(
        &mut cards,
        "Messages",
        &format_tokens(report.total_messages as i64),
        &format!("{} turns", format_with_commas(report.total_messages as i64)),
        None,
    );
    card(
        &mut cards,
        "Sessions",
        &format_tokens(report.total_sessions as i64),
        "unique sessions",
        None,
    );
    card(&mut cards, "Input", &format_tokens(totals.input), &format_with_commas(totals.input), Some(PALETTE[0]));
    card(&mut cards, "Output", &format_tokens(totals.output), &format_with_commas(totals.output), Some(PALETTE[1]));
    card(
        &mut cards,
        "Reasoning",
        &format_tokens(totals.reasoning),
        &format_with_commas(totals.reasoning),
        Some(PALETTE[2]),
    );
    card(
        &mut cards,
        "Cache Read",
        &format_tokens(totals.cache_read),
        &format_with_commas(totals.cache_read),
        Some(PALETTE[3]),
    );
    card(
        &mut cards,
        "Est. Cost",
        &format_cost(totals.cost_estimated),
        "based on pricing",
        Some(PALETTE[1]),
    );

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>OpenCode Token Report</title>
  <style>
{css}  </style>
</head>
<body>

<header>
  <h1><span>OpenCode</span> Token Report</h1>
  <p>Generated {generated} from {data_dir} ({source})</p>
</header>

<div class="container">

  <div class="summary-grid">{cards}
  </div>

  <div class="charts-grid">
    <div class="chart-card">
      <h2>Tokens by Model</h2>
      {bars}
    </div>
    <div class="chart-card">
      <h2>Output Token Share</h2>
      {donut}
    </div>
  </div>

  {timeline}

  <div class="section">
    <div class="table-card">
      <h2>Token Usage by Model</h2>
      <table class="sortable">
        <thead>
          <tr>
            <th data-type="string">Model</th>
            <th data-type="string">Provider</th>
            <th class="right" data-type="number">Messages</th>
            <th class="right" data-type="number">Input</th>
            <th class="right" data-type="number">Output</th>
            <th class="right" data-type="number">Reasoning</th>
            <th class="right" data-type="number">Cache Read</th>
            <th class="right" data-type="number">Total</th>
            <th class="right" data-type="number">Est. Cost</th>
          </tr>
        </thead>
        <tbody>{model_rows}
        </tbody>
      </table>
    </div>
  </div>

  <div class="section">
    <div class="table-card">
      <h2>Projects by Token Usage</h2>
      <table class="sortable">
        <thead>
          <tr>
            <th data-type="string">Project</th>
            <th class="right" data-type="number">Messages</th>
            <th class="right" data-type="number">Input</th>
            <th class="right" data-type="number">Output</th>
            <th class="right" data-type="number">Total</th>
          </tr>
        </thead>
        <tbody>{project_rows}
        </tbody>
      </table>
    </div>
  </div>

</div>
<script>
{script}</script>
</body>
</html>
"#,
        css = USAGE_CSS,
        generated = escape_xml(generated),
        data_dir = escape_xml(data_dir),
        source = report.source.as_str(),
        cards = cards,
        bars = model_bars(&report.models),
        donut = donut(&report.models),
        timeline = timeline_panels(report),
        script = SORT_SCRIPT,
        model_rows = model_rows(&report.models),
        project_rows = project_rows(report),
    )
}
