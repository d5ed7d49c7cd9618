use super::{progress, wrote};
use crate::settings::Settings;
use anyhow::{Context, Result};
use clap::Args;
use promptlab_core::records::write_jsonl;
use promptlab_core::{build_chunks, load_pairs, ChunkLimits};

#[derive(Args, Debug, Default)]
pub struct ChunkArgs {
    /// Pairs JSONL (default: <output dir>/pairs.jsonl)
    #[arg(long = "in")]
    pub input: Option<String>,

    /// Chunks JSONL (default: <output dir>/chunks.jsonl)
    #[arg(long)]
    pub out: Option<String>,

    /// Token budget per chunk
    #[arg(long)]
    pub max_total_tokens: Option<u64>,

    /// Pair budget per chunk
    #[arg(long)]
    pub max_pairs: Option<usize>,

    /// Include prompt/answer timestamps in the chunk text
    #[arg(long)]
    pub include_times: bool,
}

pub fn run(args: ChunkArgs, settings: &Settings) -> Result<()> {
    let input = settings.output_file(args.input.as_deref(), "pairs.jsonl");
    let out = settings.output_file(args.out.as_deref(), "chunks.jsonl");
    let limits = ChunkLimits::new(
        settings.max_total_tokens(args.max_total_tokens),
        settings.max_pairs(args.max_pairs),
    )?;

    let pairs = load_pairs(&input)?;
    let chunks = build_chunks(&pairs, limits, args.include_times);
    tracing::info!(
        "{} pairs into {} chunks (max {} tokens / {} pairs)",
        pairs.len(),
        chunks.len(),
        limits.max_total_tokens,
        limits.max_pairs
    );

    write_jsonl(&out, &chunks).with_context(|| format!("failed to write {}", out.display()))?;
    progress(&format!("{} pairs read from {}", pairs.len(), input.display()));
    wrote(&format!("{} chunks", chunks.len()), &out);
    Ok(())
}
