use super::progress;
use crate::render::{format_cost, format_with_commas, table, usage_html};
use crate::settings::Settings;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use promptlab_core::records::write_atomic;
use promptlab_core::usage::load_usage_report;

#[derive(Args, Debug, Default)]
pub struct UsageArgs {
    /// OpenCode data directory
    #[arg(long)]
    pub opencode_dir: Option<String>,

    /// Directory for the HTML reports
    #[arg(long)]
    pub out_dir: Option<String>,
}

pub fn run(args: UsageArgs, settings: &Settings) -> Result<()> {
    let data_dir = settings.opencode_dir(args.opencode_dir.as_deref());
    let out_dir = settings.output_dir(args.out_dir.as_deref());

    progress(&format!("Loading OpenCode usage from {}", data_dir.display()));
    let report = load_usage_report(&data_dir)?;
    progress(&format!(
        "{} assistant messages with token data (source: {})",
        report.total_messages,
        report.source.as_str()
    ));

    let now = chrono::Local::now();
    let html = usage_html::render_usage_html(
        &report,
        &now.format("%Y-%m-%d %H:%M:%S").to_string(),
        &data_dir.display().to_string(),
    );

    let stamped = out_dir.join(format!("report_{}.html", now.format("%Y-%m-%d_%H-%M-%S")));
    let latest = out_dir.join("latest.html");
    for path in [&stamped, &latest] {
        write_atomic(path, html.as_bytes()).with_context(|| format!("failed to write {}", path.display()))?;
    }

    let totals = report.totals();
    println!("{}", table::usage_table(&report));
    println!(
        "\nSessions: {} | Messages: {} | Input: {} | Output: {} | Cost: {}",
        format_with_commas(report.total_sessions as i64),
        format_with_commas(report.total_messages as i64),
        format_with_commas(totals.input),
        format_with_commas(totals.output),
        format_cost(totals.cost_estimated)
    );
    println!("\nReport saved:");
    println!("  {}", stamped.display());
    println!("  {}", latest.display().to_string().cyan());
    Ok(())
}
