mod commands;
mod render;
mod settings;

use anyhow::Result;
use clap::{Parser, Subcommand};
use settings::Settings;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "promptlab")]
#[command(author, version, about = "Prompt/answer datasets and reports from AI coding assistant logs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, help = "Enable debug logging")]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Export prompt/answer pairs from Claude Code and OpenCode logs")]
    Export(commands::export::ExportArgs),

    #[command(about = "Split pairs into token-bounded analysis chunks")]
    Chunk(commands::chunk::ChunkArgs),

    #[command(about = "Write CSV tables and charts for a pairs file")]
    Stats(commands::stats::StatsArgs),

    #[command(about = "Render a lab report (HTML or Markdown) for a pairs file")]
    Report(commands::report::ReportArgs),

    #[command(about = "Build an HTML token usage report from OpenCode data")]
    Usage(commands::usage::UsageArgs),

    #[command(about = "Show where session logs are read from")]
    Sources(commands::sources::SourcesArgs),
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let settings = Settings::load();
    tracing::debug!("settings: {:?}", settings);

    match cli.command {
        Commands::Export(args) => commands::export::run(args, &settings),
        Commands::Chunk(args) => commands::chunk::run(args, &settings),
        Commands::Stats(args) => commands::stats::run(args, &settings),
        Commands::Report(args) => commands::report::run(args, &settings),
        Commands::Usage(args) => commands::usage::run(args, &settings),
        Commands::Sources(args) => commands::sources::run(args, &settings),
    }
}
