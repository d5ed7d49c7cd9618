#![deny(clippy::all)]

pub mod chunker;
pub mod error;
pub mod metrics;
pub mod ordered;
pub mod pairs;
pub mod pricing;
pub mod records;
pub mod scanner;
pub mod sessions;
pub mod sources;
pub mod stats;
pub mod tokenizer;
pub mod usage;

pub use chunker::{build_chunks, chunk_pairs, ChunkLimits, ChunkRecord};
pub use error::{Error, Result};
pub use pairs::Pair;
pub use sessions::ExtractOptions;
pub use sources::SourceId;
pub use stats::PairStats;

use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Claude Code projects directory; `None` skips the source
    pub claude_dir: Option<PathBuf>,
    /// OpenCode data directory; `None` skips the source
    pub opencode_dir: Option<PathBuf>,
    pub model: Option<String>,
    pub encoding: Option<String>,
    pub extract: ExtractOptions,
}

#[derive(Debug, Clone)]
pub struct ExportResult {
    pub pairs: Vec<Pair>,
    pub sessions: usize,
    pub messages: usize,
    pub tokenizer: String,
    pub approximate_tokens: bool,
    pub processing_time_ms: u32,
}

/// Read every configured source and build token-counted pairs
pub fn export_pairs(options: &ExportOptions) -> ExportResult {
    let start = Instant::now();

    let tokenizer = tokenizer::load_tokenizer(options.model.as_deref(), options.encoding.as_deref());
    let log = pairs::collect_sessions(
        options.claude_dir.as_deref(),
        options.opencode_dir.as_deref(),
        &options.extract,
    );
    let sessions = log.session_count();
    let messages = log.message_count();
    let pairs = pairs::extract_pairs(log, tokenizer.as_ref());

    ExportResult {
        pairs,
        sessions,
        messages,
        tokenizer: tokenizer.name().to_string(),
        approximate_tokens: tokenizer.is_approximate(),
        processing_time_ms: start.elapsed().as_millis() as u32,
    }
}

/// Load pairs from a JSONL file; an empty result is an error
pub fn load_pairs(path: &Path) -> Result<Vec<Pair>> {
    let pairs: Vec<Pair> = records::read_jsonl(path)?;
    if pairs.is_empty() {
        return Err(Error::NoPairs {
            path: path.to_path_buf(),
        });
    }
    Ok(pairs)
}
