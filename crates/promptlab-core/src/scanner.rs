//! Deterministic file scanner for session directories
//!
//! Walks are sorted by file name so repeated runs visit files in the same order.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::sources::SourceId;

/// Directory component that holds Claude Code subagent transcripts
const SUBAGENTS_DIR: &str = "subagents";

fn matches_pattern(file_name: &str, pattern: &str) -> bool {
    match pattern {
        "*.json" => file_name.ends_with(".json"),
        "*.jsonl" => file_name.ends_with(".jsonl"),
        _ => false,
    }
}

/// Scan a single directory for session files
pub fn scan_directory(root: &Path, pattern: &str) -> Vec<PathBuf> {
    scan_directory_filtered(root, pattern, &[])
}

/// Scan a directory, skipping any subtree whose directory name is in `skip_dirs`
pub fn scan_directory_filtered(root: &Path, pattern: &str, skip_dirs: &[&str]) -> Vec<PathBuf> {
    if !root.exists() {
        return Vec::new();
    }

    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            !skip_dirs.iter().any(|skip| name == *skip)
        })
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::debug!("skipping unreadable entry: {}", err);
                None
            }
        })
        .filter(|e| {
            e.file_type().is_file()
                && e
                    .file_name()
                    .to_str()
                    .map(|name| matches_pattern(name, pattern))
                    .unwrap_or(false)
        })
        .map(|e| e.into_path())
        .collect()
}

/// Claude Code transcripts under `root`; subagent transcripts are skipped unless requested
pub fn scan_claude(root: &Path, include_subagents: bool) -> Vec<PathBuf> {
    let skip: &[&str] = if include_subagents {
        &[]
    } else {
        &[SUBAGENTS_DIR]
    };
    scan_directory_filtered(root, SourceId::Claude.file_pattern(), skip)
}

/// Locations inside an OpenCode data directory
#[derive(Debug, Clone)]
pub struct OpenCodeLayout {
    pub root: PathBuf,
    /// OpenCode 1.2+ SQLite database, when present
    pub db: Option<PathBuf>,
    pub session_dir: PathBuf,
    pub message_dir: PathBuf,
    pub part_dir: PathBuf,
}

impl OpenCodeLayout {
    pub fn new(root: &Path) -> Self {
        let storage = root.join("storage");
        let db = root.join("opencode.db");
        Self {
            root: root.to_path_buf(),
            db: db.is_file().then_some(db),
            session_dir: storage.join("session"),
            message_dir: storage.join("message"),
            part_dir: storage.join("part"),
        }
    }

    pub fn session_files(&self) -> Vec<PathBuf> {
        scan_directory(&self.session_dir, SourceId::OpenCode.file_pattern())
    }

    pub fn message_files(&self) -> Vec<PathBuf> {
        scan_directory(&self.message_dir, SourceId::OpenCode.file_pattern())
    }

    /// Part files of one message, sorted by file name
    pub fn part_files(&self, message_id: &str) -> Vec<PathBuf> {
        if message_id.is_empty() {
            return Vec::new();
        }
        let dir = self.part_dir.join(message_id);
        let mut files: Vec<PathBuf> = match std::fs::read_dir(&dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    p.is_file()
                        && p.file_name()
                            .and_then(|n| n.to_str())
                            .map(|n| matches_pattern(n, "*.json"))
                            .unwrap_or(false)
                })
                .collect(),
            Err(_) => return Vec::new(),
        };
        files.sort();
        files
    }
}

/// One row of `promptlab sources`
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub source: String,
    pub name: String,
    pub path: String,
    pub exists: bool,
    pub files: usize,
    pub database: Option<String>,
}

pub fn describe_sources(claude_root: &Path, opencode_root: &Path) -> Vec<SourceLocation> {
    let claude_files = scan_claude(claude_root, true).len();
    let layout = OpenCodeLayout::new(opencode_root);
    vec![
        SourceLocation {
            source: SourceId::Claude.as_str().to_string(),
            name: SourceId::Claude.display_name().to_string(),
            path: claude_root.display().to_string(),
            exists: claude_root.exists(),
            files: claude_files,
            database: None,
        },
        SourceLocation {
            source: SourceId::OpenCode.as_str().to_string(),
            name: SourceId::OpenCode.display_name().to_string(),
            path: opencode_root.display().to_string(),
            exists: opencode_root.exists(),
            files: layout.message_files().len(),
            database: layout.db.as_ref().map(|p| p.display().to_string()),
        },
    ]
}
