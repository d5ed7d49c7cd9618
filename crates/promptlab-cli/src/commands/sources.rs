use crate::settings::Settings;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use promptlab_core::scanner::describe_sources;

#[derive(Args, Debug, Default)]
pub struct SourcesArgs {
    /// Print machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

fn describe_path(path: &str, exists: bool) -> String {
    if exists {
        path.to_string()
    } else {
        format!("{} (missing)", path)
    }
}

pub fn run(args: SourcesArgs, settings: &Settings) -> Result<()> {
    let claude_dir = settings.claude_dir(None);
    let opencode_dir = settings.opencode_dir(None);
    let sources = describe_sources(&claude_dir, &opencode_dir);

    if args.json {
        #[derive(serde::Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Output<'a> {
            settings_path: Option<String>,
            output_dir: String,
            sources: &'a [promptlab_core::scanner::SourceLocation],
        }

        let output = Output {
            settings_path: Settings::config_path().map(|p| p.display().to_string()),
            output_dir: settings.output_dir(None).display().to_string(),
            sources: &sources,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("\n  {}", "Local session sources".cyan());
    if let Some(path) = Settings::config_path() {
        println!("  {}", format!("settings: {}", describe_path(&path.display().to_string(), path.exists())).bright_black());
    }
    println!();

    for row in &sources {
        println!("  {}", row.name.white());
        println!("  {}", format!("path: {}", describe_path(&row.path, row.exists)).bright_black());
        if let Some(db) = &row.database {
            println!("  {}", format!("database: {}", db).bright_black());
        }
        println!("  {}", format!("files: {}", row.files).bright_black());
        println!();
    }
    Ok(())
}
