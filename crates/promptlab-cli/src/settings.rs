use std::fs;
use std::path::{Path, PathBuf};

use promptlab_core::chunker::{DEFAULT_MAX_PAIRS, DEFAULT_MAX_TOTAL_TOKENS};
use promptlab_core::sources::{expand_path, home_dir_string};
use promptlab_core::SourceId;
use serde::{Deserialize, Serialize};

pub const CLAUDE_DIR_ENV: &str = "PROMPTLAB_CLAUDE_DIR";
pub const OPENCODE_DIR_ENV: &str = "PROMPTLAB_OPENCODE_DIR";
pub const OUTPUT_DIR_ENV: &str = "PROMPTLAB_OUTPUT_DIR";

const DEFAULT_OUTPUT_DIR: &str = "output";
const DEFAULT_TOP_SESSIONS: usize = 20;
const DEFAULT_TOOL_OUTPUT_MAX_LEN: usize = 2000;

/// Optional defaults read from `<config_dir>/promptlab/settings.json`.
///
/// Every value resolves as: command-line flag, then environment (directories
/// only), then this file, then the built-in default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub claude_dir: Option<String>,
    pub opencode_dir: Option<String>,
    pub output_dir: Option<String>,
    pub max_total_tokens: Option<u64>,
    pub max_pairs: Option<usize>,
    pub top_sessions: Option<usize>,
    pub tool_output_max_len: Option<usize>,
}

fn env_value(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn pick_dir(flag: Option<&str>, env_var: &str, file: Option<&str>) -> Option<PathBuf> {
    flag.map(str::to_string)
        .or_else(|| env_value(env_var))
        .or_else(|| file.map(str::to_string))
        .map(|p| expand_path(&p))
}

fn default_source_dir(source: SourceId) -> PathBuf {
    let home = home_dir_string(&None).unwrap_or_else(|| ".".to_string());
    source.data().resolve_path(&home)
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("promptlab").join("settings.json"))
    }

    /// Missing or malformed settings fall back to defaults
    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|content| match serde_json::from_str(&content) {
                Ok(settings) => Some(settings),
                Err(err) => {
                    tracing::warn!("ignoring malformed settings {}: {}", path.display(), err);
                    None
                }
            })
            .unwrap_or_default()
    }

    pub fn claude_dir(&self, flag: Option<&str>) -> PathBuf {
        pick_dir(flag, CLAUDE_DIR_ENV, self.claude_dir.as_deref())
            .unwrap_or_else(|| default_source_dir(SourceId::Claude))
    }

    pub fn opencode_dir(&self, flag: Option<&str>) -> PathBuf {
        pick_dir(flag, OPENCODE_DIR_ENV, self.opencode_dir.as_deref())
            .unwrap_or_else(|| default_source_dir(SourceId::OpenCode))
    }

    pub fn output_dir(&self, flag: Option<&str>) -> PathBuf {
        pick_dir(flag, OUTPUT_DIR_ENV, self.output_dir.as_deref())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }

    /// An explicit file path, or `name` inside the output directory
    pub fn output_file(&self, flag: Option<&str>, name: &str) -> PathBuf {
        match flag {
            Some(path) => expand_path(path),
            None => self.output_dir(None).join(name),
        }
    }

    pub fn max_total_tokens(&self, flag: Option<u64>) -> u64 {
        flag.or(self.max_total_tokens)
            .unwrap_or(DEFAULT_MAX_TOTAL_TOKENS)
    }

    pub fn max_pairs(&self, flag: Option<usize>) -> usize {
        flag.or(self.max_pairs).unwrap_or(DEFAULT_MAX_PAIRS)
    }

    pub fn top_sessions(&self, flag: Option<usize>) -> usize {
        flag.or(self.top_sessions).unwrap_or(DEFAULT_TOP_SESSIONS)
    }

    pub fn tool_output_max_len(&self, flag: Option<usize>) -> usize {
        flag.or(self.tool_output_max_len)
            .unwrap_or(DEFAULT_TOOL_OUTPUT_MAX_LEN)
    }
}
