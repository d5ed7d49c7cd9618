//! Standalone SVG charts for `promptlab stats`

use super::{escape_xml, truncate_label};
use std::fmt::Write;

const BAR_WIDTH: u32 = 1100;
const BAR_HEIGHT: u32 = 22;
const BAR_GAP: u32 = 8;
const BAR_LEFT_PAD: u32 = 240;
const BAR_RIGHT_PAD: u32 = 40;
const BAR_TOP_PAD: u32 = 60;
const BAR_BOTTOM_PAD: u32 = 40;
const BAR_COLOR: &str = "#4C78A8";
const LABEL_CHARS: usize = 28;

const LINE_WIDTH: u32 = 1100;
const LINE_HEIGHT: u32 = 420;
const LINE_LEFT_PAD: f64 = 70.0;
const LINE_RIGHT_PAD: f64 = 30.0;
const LINE_TOP_PAD: f64 = 60.0;
const LINE_BOTTOM_PAD: f64 = 60.0;
const LINE_COLOR: &str = "#F58518";
const GRID_LINES: u32 = 4;
const X_LABELS: usize = 8;

const FONT: &str = "font-family=\"Helvetica, Arial, sans-serif\"";

fn header(out: &mut String, width: u32, height: u32, title: &str, subtitle: &str) {
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    );
    let _ = writeln!(
        out,
        r##"<rect x="0" y="0" width="{}" height="{}" fill="#ffffff"/>"##,
        width, height
    );
    let _ = writeln!(
        out,
        r##"<text x="20" y="32" {} font-size="20" font-weight="bold" fill="#222222">{}</text>"##,
        FONT,
        escape_xml(title)
    );
    if !subtitle.is_empty() {
        let _ = writeln!(
            out,
            r##"<text x="20" y="50" {} font-size="12" fill="#666666">{}</text>"##,
            FONT,
            escape_xml(subtitle)
        );
    }
}

/// Horizontal bar chart, one bar per row, rows drawn top to bottom
pub fn bar_chart(title: &str, subtitle: &str, rows: &[(String, u64)]) -> String {
    let count = rows.len().max(1) as u32;
    let height = BAR_TOP_PAD + count * (BAR_HEIGHT + BAR_GAP) + BAR_BOTTOM_PAD;
    let plot_width = (BAR_WIDTH - BAR_LEFT_PAD - BAR_RIGHT_PAD) as f64;
    let max_value = rows.iter().map(|(_, v)| *v).max().unwrap_or(0).max(1) as f64;

    let mut out = String::new();
    header(&mut out, BAR_WIDTH, height, title, subtitle);

    for (index, (label, value)) in rows.iter().enumerate() {
        let y = BAR_TOP_PAD + index as u32 * (BAR_HEIGHT + BAR_GAP);
        let bar = (*value as f64 / max_value * plot_width).max(1.0);
        let text_y = y + BAR_HEIGHT / 2 + 4;
        let _ = writeln!(
            out,
            r##"<text x="{}" y="{}" {} font-size="12" text-anchor="end" fill="#333333">{}</text>"##,
            BAR_LEFT_PAD - 10,
            text_y,
            FONT,
            escape_xml(&truncate_label(label, LABEL_CHARS))
        );
        let _ = writeln!(
            out,
            r#"<rect x="{}" y="{}" width="{:.1}" height="{}" rx="3" fill="{}"/>"#,
            BAR_LEFT_PAD, y, bar, BAR_HEIGHT, BAR_COLOR
        );
        let _ = writeln!(
            out,
            r##"<text x="{:.1}" y="{}" {} font-size="11" fill="#333333">{}</text>"##,
            BAR_LEFT_PAD as f64 + bar + 6.0,
            text_y,
            FONT,
            value
        );
    }

    let baseline_bottom = height - BAR_BOTTOM_PAD;
    let _ = writeln!(
        out,
        r##"<line x1="{x}" y1="{}" x2="{x}" y2="{}" stroke="#bdbdbd" stroke-width="1"/>"##,
        BAR_TOP_PAD - 4,
        baseline_bottom,
        x = BAR_LEFT_PAD
    );
    out.push_str("</svg>\n");
    out
}

/// Line chart over ordered points; x labels are thinned to about eight
pub fn line_chart(title: &str, subtitle: &str, points: &[(String, u64)]) -> String {
    let width = LINE_WIDTH as f64;
    let height = LINE_HEIGHT as f64;
    let plot_w = width - LINE_LEFT_PAD - LINE_RIGHT_PAD;
    let plot_h = height - LINE_TOP_PAD - LINE_BOTTOM_PAD;
    let max_value = points.iter().map(|(_, v)| *v).max().unwrap_or(0).max(1);

    let mut out = String::new();
    header(&mut out, LINE_WIDTH, LINE_HEIGHT, title, subtitle);

    for step in 0..=GRID_LINES {
        let y = LINE_TOP_PAD + plot_h * step as f64 / GRID_LINES as f64;
        let _ = writeln!(
            out,
            r##"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="#efefef" stroke-width="1"/>"##,
            LINE_LEFT_PAD,
            y,
            width - LINE_RIGHT_PAD,
            y
        );
    }

    let bottom = LINE_TOP_PAD + plot_h;
    let _ = writeln!(
        out,
        r##"<line x1="{l:.1}" y1="{t:.1}" x2="{l:.1}" y2="{b:.1}" stroke="#bdbdbd" stroke-width="1"/>"##,
        l = LINE_LEFT_PAD,
        t = LINE_TOP_PAD,
        b = bottom
    );
    let _ = writeln!(
        out,
        r##"<line x1="{:.1}" y1="{b:.1}" x2="{:.1}" y2="{b:.1}" stroke="#bdbdbd" stroke-width="1"/>"##,
        LINE_LEFT_PAD,
        width - LINE_RIGHT_PAD,
        b = bottom
    );
    let _ = writeln!(
        out,
        r##"<text x="{:.1}" y="{:.1}" {} font-size="11" text-anchor="end" fill="#666666">max: {}</text>"##,
        LINE_LEFT_PAD - 8.0,
        LINE_TOP_PAD + 4.0,
        FONT,
        max_value
    );

    let coords: Vec<(f64, f64)> = points
        .iter()
        .enumerate()
        .map(|(index, (_, value))| {
            let x = if points.len() > 1 {
                LINE_LEFT_PAD + plot_w * index as f64 / (points.len() - 1) as f64
            } else {
                LINE_LEFT_PAD + plot_w / 2.0
            };
            let y = bottom - plot_h * (*value as f64 / max_value as f64);
            (x, y)
        })
        .collect();

    if coords.len() > 1 {
        let path: Vec<String> = coords.iter().map(|(x, y)| format!("{:.1},{:.1}", x, y)).collect();
        let _ = writeln!(
            out,
            r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="2.5"/>"#,
            path.join(" "),
            LINE_COLOR
        );
    }
    for (x, y) in &coords {
        let _ = writeln!(
            out,
            r#"<circle cx="{:.1}" cy="{:.1}" r="3.5" fill="{}"/>"#,
            x, y, LINE_COLOR
        );
    }

    let label_step = (points.len() / X_LABELS).max(1);
    for (index, ((label, _), (x, _))) in points.iter().zip(&coords).enumerate() {
        if index % label_step != 0 {
            continue;
        }
        let _ = writeln!(
            out,
            r##"<text x="{:.1}" y="{:.1}" {} font-size="11" text-anchor="middle" fill="#666666">{}</text>"##,
            x,
            bottom + 20.0,
            FONT,
            escape_xml(label)
        );
    }

    out.push_str("</svg>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(values: &[(&str, u64)]) -> Vec<(String, u64)> {
        values.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_bar_chart_layout() {
        let svg = bar_chart("Pairs per session", "top 2", &rows(&[("a", 10), ("b", 5)]));
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        // 60 + 2 * 30 + 40
        assert!(svg.contains(r#"height="160""#));
        assert!(svg.contains(r#"width="820.0""#));
        assert!(svg.contains(r#"width="410.0""#));
        assert!(svg.contains("Pairs per session"));
    }

    #[test]
    fn test_bar_chart_escapes_labels() {
        let svg = bar_chart("<t>", "", &rows(&[("a&b", 1)]));
        assert!(svg.contains("&lt;t&gt;"));
        assert!(svg.contains("a&amp;b"));
        assert!(!svg.contains("<t>"));
    }

    #[test]
    fn test_bar_chart_empty() {
        let svg = bar_chart("Empty", "", &[]);
        assert!(svg.contains(r#"height="130""#));
        assert!(!svg.contains("rx=\"3\""));
    }

    #[test]
    fn test_line_chart_labels_are_thinned() {
        let points: Vec<(String, u64)> = (0..20).map(|i| (format!("d{:02}", i), i)).collect();
        let svg = line_chart("Pairs per day", "", &points);
        assert_eq!(svg.matches("<circle").count(), 20);
        assert!(svg.contains(">d00<"));
        assert!(svg.contains(">d02<"));
        assert!(!svg.contains(">d01<"));
        assert!(svg.contains("max: 19"));
        assert!(svg.contains("<polyline"));
    }

    #[test]
    fn test_line_chart_single_point() {
        let svg = line_chart("One", "", &rows(&[("2025-01-01", 3)]));
        assert!(!svg.contains("<polyline"));
        assert_eq!(svg.matches("<circle").count(), 1);
    }
}
