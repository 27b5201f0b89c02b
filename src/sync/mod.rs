//! Incremental synchronization of the store with the file system.
//!
//! A run walks the requested roots, decides per file whether to (re)index,
//! drives the tag producer one file at a time and commits each file in its
//! own transaction. An optional sweep afterwards removes rows whose backing
//! file disappeared.
//!
//! # Guarantees
//! - a file's rows are replaced atomically: committed with at least one tag,
//!   or rolled back to the prior state
//! - unchanged files (incremental mode) cause no store mutation and no
//!   producer request
//! - a fatal error leaves every previously committed file queryable

use std::fs::Metadata;
use std::path::Path;
use std::time::UNIX_EPOCH;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::diagnostics::{DiagnosticStage, SkipReason, SyncDiagnostic};
use crate::error::{IndexError, PathError, Result};
use crate::error_codes::SYM_ING_002_ROLLBACK;
use crate::paths;
use crate::producer::TagChannel;
use crate::store::SymbolStore;

/// Which files are handed to the producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SyncMode {
    /// Every discovered file is reingested
    #[default]
    Full,
    /// Only new files and files whose size or mtime changed
    Incremental,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncOptions {
    pub mode: SyncMode,
    /// Descend into subdirectories of directory roots
    pub recursive: bool,
    /// Remove rows of vanished files after traversal
    pub sweep: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            mode: SyncMode::Full,
            recursive: false,
            sweep: true,
        }
    }
}

/// Outcome counts of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Files committed with at least one tag
    pub indexed: usize,
    /// Files left alone because size and mtime matched
    pub unchanged: usize,
    /// Files whose transaction was rolled back (zero tags)
    pub rolled_back: usize,
    /// Paths not handed to the producer
    pub skipped: usize,
    /// Rows removed by the sweep
    pub deleted: usize,
    /// Tags committed
    pub tags: u64,
    /// Records dropped for missing required fields
    pub rejected_records: u64,
    pub diagnostics: Vec<SyncDiagnostic>,
}

impl SyncReport {
    /// Diagnostics in deterministic order.
    pub fn sorted_diagnostics(&self) -> Vec<SyncDiagnostic> {
        let mut diagnostics = self.diagnostics.clone();
        diagnostics.sort();
        diagnostics
    }
}

/// Drives one synchronization run against a store and a producer channel.
pub struct Synchronizer<'a, C: TagChannel> {
    store: &'a SymbolStore,
    channel: C,
    options: SyncOptions,
    report: SyncReport,
}

impl<'a, C: TagChannel> Synchronizer<'a, C> {
    pub fn new(store: &'a SymbolStore, channel: C, options: SyncOptions) -> Self {
        Self {
            store,
            channel,
            options,
            report: SyncReport::default(),
        }
    }

    /// Process every root, then sweep unless disabled.
    ///
    /// # Errors
    /// Only fatal errors ([`IndexError::is_fatal`] and store failures) are
    /// returned; per-file failures are counted in the report.
    pub fn run<P: AsRef<Path>>(&mut self, roots: &[P]) -> Result<SyncReport> {
        for root in roots {
            self.sync_root(root.as_ref())?;
        }
        if self.options.sweep {
            sweep(self.store, &mut self.report)?;
        }
        Ok(std::mem::take(&mut self.report))
    }

    /// Give back the channel (to close the producer).
    pub fn into_channel(self) -> C {
        self.channel
    }

    /// Process one root: a regular file directly, a directory by enumeration.
    pub fn sync_root(&mut self, root: &Path) -> Result<()> {
        let absolute = match self.store.resolve(root) {
            Ok(path) => path,
            Err(IndexError::PathResolution(e)) => {
                self.skip(root.display().to_string(), skip_reason(&e));
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let metadata = match std::fs::metadata(&absolute) {
            Ok(m) => m,
            Err(e) => {
                self.contain(&absolute, DiagnosticStage::Stat, IndexError::from(e));
                return Ok(());
            }
        };

        if metadata.is_file() {
            self.sync_file(&absolute, &metadata)
        } else if metadata.is_dir() {
            self.sync_directory(&absolute)
        } else {
            let display = self.display(&absolute);
            self.skip(display, SkipReason::NotAFile);
            Ok(())
        }
    }

    fn sync_directory(&mut self, dir: &Utf8Path) -> Result<()> {
        let max_depth = if self.options.recursive { usize::MAX } else { 1 };

        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(max_depth)
            .follow_links(false)
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| dir.to_string());
                    warn!(path = %path, error = %e, "cannot read directory entry");
                    self.report.diagnostics.push(SyncDiagnostic::error(
                        path,
                        DiagnosticStage::Stat,
                        crate::error_codes::SYM_IO_001,
                        e.to_string(),
                    ));
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                continue;
            }
            if file_type.is_symlink() {
                self.skip(entry.path().display().to_string(), SkipReason::Symlink);
                continue;
            }
            if !file_type.is_file() {
                self.skip(entry.path().display().to_string(), SkipReason::NotAFile);
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    let path = entry.path().display().to_string();
                    self.report.diagnostics.push(SyncDiagnostic::error(
                        path,
                        DiagnosticStage::Stat,
                        crate::error_codes::SYM_IO_001,
                        e.to_string(),
                    ));
                    continue;
                }
            };

            match Utf8PathBuf::from_path_buf(entry.into_path()) {
                Ok(path) => self.sync_file(&path, &metadata)?,
                Err(path) => self.skip(path.display().to_string(), SkipReason::NotUtf8),
            }
        }

        Ok(())
    }

    /// Decide whether `path` needs (re)indexing and ingest it if so.
    fn sync_file(&mut self, path: &Utf8Path, metadata: &Metadata) -> Result<()> {
        let size = metadata.len();
        let mtime = mtime_secs(metadata);

        if self.options.mode == SyncMode::Incremental {
            match self.store.get_file(path.as_std_path()) {
                Ok(Some(record)) if record.size == size && record.mtime == mtime => {
                    self.report.unchanged += 1;
                    return Ok(());
                }
                Ok(_) => {}
                Err(e @ IndexError::PathResolution(_)) => {
                    self.contain(path, DiagnosticStage::Stat, e);
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }

        self.ingest_file(path, size, mtime)
    }

    /// Replace the rows of `path` with a fresh tag set from the producer.
    fn ingest_file(&mut self, path: &Utf8Path, size: u64, mtime: i64) -> Result<()> {
        if let Err(e) = paths::ensure_single_line(path) {
            let display = self.display(path);
            self.skip(display, skip_reason(&e));
            return Ok(());
        }

        let tx = self.store.transaction()?;

        let fid = match self.store.set_file(path.as_std_path(), size, mtime) {
            Ok(fid) => fid,
            Err(e @ IndexError::PathResolution(_)) => {
                tx.rollback()?;
                self.contain(path, DiagnosticStage::Store, e);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        // A channel error drops `tx`, rolling this file back
        let group = self.channel.request(path)?;

        let mut added = 0u64;
        for record in &group.records {
            match self.store.add_tag(fid, record) {
                Ok(()) => added += 1,
                Err(IndexError::Bind(reason)) => {
                    self.report.rejected_records += 1;
                    debug!(path = %path, %reason, "dropped tag record");
                }
                Err(e) => return Err(e),
            }
        }

        if !group.complete {
            tx.rollback()?;
            return Err(IndexError::ProducerChannel(format!(
                "producer closed its output while tagging {}",
                path
            )));
        }

        if added > 0 {
            tx.commit()?;
            self.report.indexed += 1;
            self.report.tags += added;
            debug!(path = %path, tags = added, "indexed");
        } else {
            tx.rollback()?;
            self.report.rolled_back += 1;
            let error = IndexError::IngestionRollback(path.to_string());
            debug!(path = %path, "{}", error);
            let display = self.display(path);
            self.report.diagnostics.push(SyncDiagnostic::error(
                display,
                DiagnosticStage::Rollback,
                SYM_ING_002_ROLLBACK,
                error.to_string(),
            ));
        }

        Ok(())
    }

    fn skip(&mut self, path: String, reason: SkipReason) {
        debug!(path = %path, %reason, "skipped");
        self.report.skipped += 1;
        self.report
            .diagnostics
            .push(SyncDiagnostic::skipped(path, reason));
    }

    fn contain(&mut self, path: &Utf8Path, stage: DiagnosticStage, error: IndexError) {
        warn!(path = %path, code = error.code(), "{}", error);
        let display = self.display(path);
        self.report.skipped += 1;
        self.report.diagnostics.push(SyncDiagnostic::error(
            display,
            stage,
            error.code(),
            error.to_string(),
        ));
    }

    fn display(&self, path: &Utf8Path) -> String {
        self.store.relative(path).into_string()
    }
}

/// Delete every row whose file no longer exists or is not a regular file.
///
/// Rows are collected first and removed by id, so paths that no longer
/// resolve on disk are still handled.
pub fn sweep(store: &SymbolStore, report: &mut SyncReport) -> Result<()> {
    for record in store.files()? {
        let present = std::fs::metadata(&record.path)
            .map(|m| m.is_file())
            .unwrap_or(false);
        if present {
            continue;
        }

        if store.delete_file_id(record.id)? {
            report.deleted += 1;
            debug!(path = %record.path, "deleted");
        }
    }
    Ok(())
}

/// Modification time in whole seconds since the Unix epoch (0 when unknown).
pub fn mtime_secs(metadata: &Metadata) -> i64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn skip_reason(error: &PathError) -> SkipReason {
    match error {
        PathError::Unresolvable(_) => SkipReason::Unresolvable,
        PathError::NotUtf8(_) => SkipReason::NotUtf8,
        PathError::LineBreak(_) => SkipReason::LineBreak,
    }
}
