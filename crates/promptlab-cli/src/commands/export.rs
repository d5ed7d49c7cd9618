use super::{progress, wrote};
use crate::settings::Settings;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use promptlab_core::records::write_jsonl;
use promptlab_core::{export_pairs, ExportOptions, ExtractOptions};
use std::time::Duration;

#[derive(Args, Debug, Default)]
pub struct ExportArgs {
    /// Claude Code projects directory
    #[arg(long)]
    pub claude_dir: Option<String>,

    /// OpenCode data directory
    #[arg(long)]
    pub opencode_dir: Option<String>,

    /// Output JSONL path (default: <output dir>/pairs.jsonl)
    #[arg(long)]
    pub out: Option<String>,

    /// Model name used to pick the tokenizer
    #[arg(long)]
    pub model: Option<String>,

    /// Tokenizer encoding (overrides --model)
    #[arg(long)]
    pub encoding: Option<String>,

    /// Append tool results to prompts
    #[arg(long)]
    pub include_tool_output: bool,

    /// Also read records and messages whose type or role is not user/assistant
    #[arg(long)]
    pub include_system: bool,

    /// Read Claude subagent transcripts too
    #[arg(long)]
    pub include_subagents: bool,

    /// Keep prompts written by the suggestion mode
    #[arg(long)]
    pub include_suggestion_mode: bool,

    /// Keep IDE file-open events
    #[arg(long)]
    pub include_ide_events: bool,

    /// Characters kept from each tool output (0 keeps everything)
    #[arg(long)]
    pub tool_output_max_len: Option<usize>,

    /// Disable the loading spinner
    #[arg(long)]
    pub no_spinner: bool,
}

impl ExportArgs {
    fn extract_options(&self, settings: &Settings) -> ExtractOptions {
        ExtractOptions {
            include_tool_output: self.include_tool_output,
            tool_output_max_len: settings.tool_output_max_len(self.tool_output_max_len),
            include_system: self.include_system,
            include_subagents: self.include_subagents,
            exclude_suggestion_mode: !self.include_suggestion_mode,
            include_ide_events: self.include_ide_events,
        }
    }
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner());
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub fn run(args: ExportArgs, settings: &Settings) -> Result<()> {
    let claude_dir = settings.claude_dir(args.claude_dir.as_deref());
    let opencode_dir = settings.opencode_dir(args.opencode_dir.as_deref());
    let out = settings.output_file(args.out.as_deref(), "pairs.jsonl");

    let options = ExportOptions {
        claude_dir: Some(claude_dir.clone()),
        opencode_dir: Some(opencode_dir.clone()),
        model: args.model.clone(),
        encoding: args.encoding.clone(),
        extract: args.extract_options(settings),
    };

    let pb = (!args.no_spinner).then(|| spinner("Reading session logs..."));
    if pb.is_none() {
        progress(&format!(
            "Reading {} and {}",
            claude_dir.display(),
            opencode_dir.display()
        ));
    }
    let result = export_pairs(&options);
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    if result.approximate_tokens {
        eprintln!(
            "  {}",
            "No BPE tokenizer available; token counts use whitespace splitting".yellow()
        );
    }

    write_jsonl(&out, &result.pairs)
        .with_context(|| format!("failed to write {}", out.display()))?;

    progress(&format!(
        "{} sessions, {} messages, tokenizer {} ({}ms)",
        result.sessions, result.messages, result.tokenizer, result.processing_time_ms
    ));
    wrote(&format!("{} prompt/answer pairs", result.pairs.len()), &out);
    Ok(())
}
