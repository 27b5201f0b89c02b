//! Sync diagnostics for skipped files and contained failures.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Reason why a path was not handed to the producer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Path could not be canonicalized (missing, permission denied)
    Unresolvable,
    /// Path is not valid UTF-8
    NotUtf8,
    /// Path contains a line break and cannot be sent to the producer
    LineBreak,
    /// Symlink found while enumerating a directory
    Symlink,
    /// Neither a regular file nor a directory (socket, fifo, device)
    NotAFile,
}

impl SkipReason {
    /// Stable sort key for deterministic ordering.
    pub fn sort_key(&self) -> u8 {
        match self {
            SkipReason::Unresolvable => 0,
            SkipReason::NotUtf8 => 1,
            SkipReason::LineBreak => 2,
            SkipReason::Symlink => 3,
            SkipReason::NotAFile => 4,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SkipReason::Unresolvable => "cannot resolve path",
            SkipReason::NotUtf8 => "path is not valid UTF-8",
            SkipReason::LineBreak => "path contains a line break",
            SkipReason::Symlink => "symbolic link",
            SkipReason::NotAFile => "not a regular file",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl PartialOrd for SkipReason {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SkipReason {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// Step of the per-file pipeline where a failure was contained.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DiagnosticStage {
    /// Reading file metadata
    Stat,
    /// Replacing the file row
    Store,
    /// Zero tags produced; transaction rolled back
    Rollback,
}

impl DiagnosticStage {
    pub fn sort_key(&self) -> u8 {
        match self {
            DiagnosticStage::Stat => 0,
            DiagnosticStage::Store => 1,
            DiagnosticStage::Rollback => 2,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DiagnosticStage::Stat => "reading metadata",
            DiagnosticStage::Store => "storing file",
            DiagnosticStage::Rollback => "ingesting tags",
        }
    }
}

impl fmt::Display for DiagnosticStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl PartialOrd for DiagnosticStage {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DiagnosticStage {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// A diagnostic event from a synchronization run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SyncDiagnostic {
    Skipped {
        path: String,
        reason: SkipReason,
    },
    Error {
        path: String,
        stage: DiagnosticStage,
        /// Stable error code (`SYM-*`)
        code: String,
        message: String,
    },
}

impl SyncDiagnostic {
    pub fn path(&self) -> &str {
        match self {
            SyncDiagnostic::Skipped { path, .. } => path,
            SyncDiagnostic::Error { path, .. } => path,
        }
    }

    /// Primary: path. Secondary: errors before skips. Tertiary: stage/reason.
    pub fn sort_key(&self) -> (&str, u8, u8) {
        match self {
            SyncDiagnostic::Error { path, stage, .. } => (path, 0, stage.sort_key()),
            SyncDiagnostic::Skipped { path, reason } => (path, 1, reason.sort_key()),
        }
    }

    pub fn skipped(path: String, reason: SkipReason) -> Self {
        SyncDiagnostic::Skipped { path, reason }
    }

    pub fn error(path: String, stage: DiagnosticStage, code: &str, message: String) -> Self {
        SyncDiagnostic::Error {
            path,
            stage,
            code: code.to_string(),
            message,
        }
    }

    /// Examples:
    /// - "SKIP src/link.c: symbolic link"
    /// - "ERROR src/empty.c: ingesting tags [SYM-ING-002]: no tags produced"
    pub fn format_stderr(&self) -> String {
        match self {
            SyncDiagnostic::Skipped { path, reason } => {
                format!("SKIP {}: {}", path, reason)
            }
            SyncDiagnostic::Error {
                path,
                stage,
                code,
                message,
            } => {
                format!("ERROR {}: {} [{}]: {}", path, stage, code, message)
            }
        }
    }
}

impl fmt::Display for SyncDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_stderr())
    }
}

impl PartialOrd for SyncDiagnostic {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SyncDiagnostic {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_reason_ord() {
        assert!(SkipReason::Unresolvable < SkipReason::Symlink);
        assert!(SkipReason::Symlink < SkipReason::NotAFile);
    }

    #[test]
    fn test_stage_ord() {
        assert!(DiagnosticStage::Stat < DiagnosticStage::Store);
        assert!(DiagnosticStage::Store < DiagnosticStage::Rollback);
    }

    #[test]
    fn test_errors_sort_before_skips_on_same_path() {
        let error = SyncDiagnostic::error(
            "src/a.c".to_string(),
            DiagnosticStage::Rollback,
            "SYM-ING-002",
            "no tags".to_string(),
        );
        let skipped = SyncDiagnostic::skipped("src/a.c".to_string(), SkipReason::Symlink);
        assert!(error < skipped);
    }

    #[test]
    fn test_sorting_vec() {
        let mut diagnostics = vec![
            SyncDiagnostic::skipped("src/c.c".to_string(), SkipReason::NotAFile),
            SyncDiagnostic::error(
                "src/a.c".to_string(),
                DiagnosticStage::Stat,
                "SYM-IO-001",
                "denied".to_string(),
            ),
            SyncDiagnostic::skipped("src/b.c".to_string(), SkipReason::Symlink),
        ];
        diagnostics.sort();

        assert_eq!(diagnostics[0].path(), "src/a.c");
        assert_eq!(diagnostics[1].path(), "src/b.c");
        assert_eq!(diagnostics[2].path(), "src/c.c");
    }

    #[test]
    fn test_format_stderr() {
        let skipped = SyncDiagnostic::skipped("src/link.c".to_string(), SkipReason::Symlink);
        assert_eq!(skipped.format_stderr(), "SKIP src/link.c: symbolic link");

        let error = SyncDiagnostic::error(
            "src/empty.c".to_string(),
            DiagnosticStage::Rollback,
            "SYM-ING-002",
            "no tags produced".to_string(),
        );
        assert_eq!(
            error.to_string(),
            "ERROR src/empty.c: ingesting tags [SYM-ING-002]: no tags produced"
        );
    }
}
