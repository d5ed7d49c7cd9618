use super::wrote;
use crate::render::lab;
use crate::settings::Settings;
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use promptlab_core::load_pairs;
use promptlab_core::metrics::LabMetrics;
use promptlab_core::records::write_atomic;
use promptlab_core::sources::expand_path;
use std::path::Path;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Html,
    Md,
}

impl ReportFormat {
    fn default_file(&self) -> &'static str {
        match self {
            ReportFormat::Html => "report.html",
            ReportFormat::Md => "report.md",
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct ReportArgs {
    /// Pairs JSONL (default: <output dir>/pairs.jsonl)
    #[arg(long = "in")]
    pub input: Option<String>,

    /// Report path (default: <output dir>/report.html or report.md)
    #[arg(long)]
    pub out: Option<String>,

    #[arg(long, value_enum, default_value_t = ReportFormat::Html)]
    pub format: ReportFormat,

    /// Directory holding the charts written by `promptlab stats`
    #[arg(long)]
    pub assets_dir: Option<String>,
}

pub fn run(args: ReportArgs, settings: &Settings) -> Result<()> {
    let input = settings.output_file(args.input.as_deref(), "pairs.jsonl");
    let out = settings.output_file(args.out.as_deref(), args.format.default_file());
    let assets_dir = match args.assets_dir.as_deref() {
        Some(dir) => expand_path(dir),
        None => settings.output_dir(None),
    };

    let pairs = load_pairs(&input)?;
    let metrics = LabMetrics::collect(&pairs);
    let generated = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string();

    let body = match args.format {
        ReportFormat::Md => lab::render_markdown(&metrics, &generated, &assets_dir),
        ReportFormat::Html => {
            let report_dir = out.parent().unwrap_or_else(|| Path::new("."));
            let charts = lab::find_charts(&assets_dir, report_dir);
            tracing::debug!("embedding {} charts from {}", charts.len(), assets_dir.display());
            lab::render_html(&metrics, &generated, &charts)
        }
    };

    write_atomic(&out, body.as_bytes()).with_context(|| format!("failed to write {}", out.display()))?;
    wrote("lab report", &out);
    Ok(())
}
