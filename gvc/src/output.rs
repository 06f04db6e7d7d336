//! Output formatting for CLI commands.
//!
//! Provides abstraction layer for outputting results in text or JSON format.

use anyhow::Result;
use chrono::{DateTime, Utc};
use gvc_core::{FileSet, FileSetDiff, Hash, Revision};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Write};

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Writer for command output with format abstraction.
pub struct OutputWriter {
    format: OutputFormat,
    stdout: io::Stdout,
}

impl OutputWriter {
    /// Create a new OutputWriter.
    pub fn new(json: bool) -> Self {
        Self {
            format: if json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            },
            stdout: io::stdout(),
        }
    }

    /// Write output using the configured format.
    ///
    /// The `data` parameter must be a serializable struct that includes
    /// `success: bool` and `result_code: u8` fields.
    ///
    /// The `text_fn` closure is called only in text mode to generate the
    /// human-readable output.
    pub fn write<T: Serialize>(
        &self,
        data: &T,
        text_fn: impl FnOnce() -> String,
    ) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(data)?;
                writeln!(&self.stdout, "{}", json)?;
            }
            OutputFormat::Text => {
                let text = text_fn();
                if !text.is_empty() {
                    write!(&self.stdout, "{}", text)?;
                }
            }
        }
        Ok(())
    }

    /// Write an error message to stderr.
    ///
    /// In JSON mode, writes a JSON error object with success=false.
    /// In text mode, writes the error chain directly.
    pub fn write_error(&self, error: &anyhow::Error, result_code: u8) {
        match self.format {
            OutputFormat::Json => {
                let error_output = ErrorOutput {
                    success: false,
                    result_code,
                    error: format!("{:#}", error),
                };
                if let Ok(json) = serde_json::to_string_pretty(&error_output) {
                    let _ = writeln!(io::stderr(), "{}", json);
                }
            }
            OutputFormat::Text => {
                let _ = writeln!(io::stderr(), "Error: {:#}", error);
            }
        }
    }
}

/// Map an error to a process result code.
///
/// 2 for rejected operations (nothing changed), 3 for damaged repository
/// data, 1 for everything else.
pub fn result_code(error: &anyhow::Error) -> u8 {
    let core = error
        .chain()
        .find_map(|cause| cause.downcast_ref::<gvc_core::Error>());
    match core {
        Some(e) if e.is_policy() => 2,
        Some(e) if e.is_corruption() => 3,
        _ => 1,
    }
}

// ============================================================================
// Path-level view of digest-level diffs
// ============================================================================

/// How a single path changed between two filesets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

impl ChangeKind {
    fn marker(self) -> char {
        match self {
            ChangeKind::Added => 'A',
            ChangeKind::Modified => 'M',
            ChangeKind::Deleted => 'D',
        }
    }
}

/// One changed path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathChange {
    pub kind: ChangeKind,
    pub path: String,
}

/// Collapse a digest-level diff into per-path changes.
///
/// Paths listed on both sides under the same digest are unchanged (the diff
/// replaces whole path sets), a path on both sides under different digests
/// was modified.
pub fn path_changes(diff: &FileSetDiff) -> Vec<PathChange> {
    let before = diff.removed.by_path();
    let after = diff.added.by_path();
    let mut changes = Vec::new();

    for (path, hash) in &before {
        match after.get(path) {
            Some(new_hash) if new_hash == hash => {}
            Some(_) => changes.push(PathChange {
                kind: ChangeKind::Modified,
                path: path.to_string(),
            }),
            None => changes.push(PathChange {
                kind: ChangeKind::Deleted,
                path: path.to_string(),
            }),
        }
    }

    for path in after.keys() {
        if !before.contains_key(path) {
            changes.push(PathChange {
                kind: ChangeKind::Added,
                path: path.to_string(),
            });
        }
    }

    changes.sort_by(|a, b| a.path.cmp(&b.path));
    changes
}

/// Render path changes as `A path` lines.
pub fn format_changes(changes: &[PathChange]) -> String {
    changes
        .iter()
        .map(|c| format!("{} {}\n", c.kind.marker(), c.path))
        .collect()
}

/// Render a fileset as `hash: path path` lines.
pub fn format_fileset(set: &FileSet) -> String {
    set.iter()
        .map(|(hash, paths)| {
            let joined: Vec<&str> = paths.iter().map(String::as_str).collect();
            format!("{}: {}\n", hash, joined.join(" "))
        })
        .collect()
}

// ============================================================================
// Data Transfer Objects (DTOs) for JSON output
// ============================================================================

/// Error output structure.
#[derive(Debug, Serialize)]
pub struct ErrorOutput {
    pub success: bool,
    pub result_code: u8,
    pub error: String,
}

/// Output for `init` command.
#[derive(Debug, Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub result_code: u8,
    pub root: String,
    pub algorithm: String,
    pub revision: Hash,
    pub files: usize,
}

/// Output for `commit` command.
#[derive(Debug, Serialize)]
pub struct CommitOutput {
    pub success: bool,
    pub result_code: u8,
    pub revision: Hash,
    pub parent: Hash,
    pub changes: Vec<PathChange>,
}

/// Output for `status` command.
#[derive(Debug, Serialize)]
pub struct StatusOutput {
    pub success: bool,
    pub result_code: u8,
    pub current: Hash,
    pub clean: bool,
    pub changes: Vec<PathChange>,
}

/// Summary of one revision.
#[derive(Debug, Clone, Serialize)]
pub struct RevisionInfo {
    pub hash: Hash,
    pub parent: Option<Hash>,
    pub date: DateTime<Utc>,
    pub comment: String,
}

impl From<&Revision> for RevisionInfo {
    fn from(rev: &Revision) -> Self {
        Self {
            hash: rev.hash(),
            parent: rev.parent(),
            date: rev.timestamp(),
            comment: rev.comment().to_string(),
        }
    }
}

impl RevisionInfo {
    /// Multi-line header used by `log` and `show`.
    pub fn to_text(&self) -> String {
        let mut text = format!("revision {}\n", self.hash);
        if let Some(parent) = self.parent {
            text.push_str(&format!("Parent:  {}\n", parent));
        }
        text.push_str(&format!(
            "Date:    {}\n\n    {}\n",
            self.date.format("%Y-%m-%d %H:%M:%S UTC"),
            self.comment
        ));
        text
    }
}

/// Output for `log` command.
#[derive(Debug, Serialize)]
pub struct LogOutput {
    pub success: bool,
    pub result_code: u8,
    pub revisions: Vec<RevisionInfo>,
}

/// Output for `show` command.
#[derive(Debug, Serialize)]
pub struct ShowOutput {
    pub success: bool,
    pub result_code: u8,
    #[serde(flatten)]
    pub revision: RevisionInfo,
    pub files_added: BTreeMap<Hash, Vec<String>>,
    pub files_removed: BTreeMap<Hash, Vec<String>>,
}

/// Output for `fileset` command.
#[derive(Debug, Serialize)]
pub struct FilesetOutput {
    pub success: bool,
    pub result_code: u8,
    /// Revision hash, or "working" for a scan of the working tree.
    pub source: String,
    pub entries: BTreeMap<Hash, Vec<String>>,
}

/// Fileset as a serializable map.
pub fn fileset_entries(set: &FileSet) -> BTreeMap<Hash, Vec<String>> {
    set.iter()
        .map(|(hash, paths)| (*hash, paths.iter().cloned().collect()))
        .collect()
}
