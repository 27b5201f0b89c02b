//! Index command implementation
//!
//! Synchronizes the requested roots through a ctags child process, then
//! sweeps rows of vanished files.

use std::path::PathBuf;

use anyhow::{Context, Result};
use symdex::producer::{self, CtagsProducer};
use symdex::sync::{self, SyncOptions, SyncReport, Synchronizer};
use symdex::{Config, SymbolStore};

/// Index `roots` and sweep according to `config`.
///
/// The producer is only started when there is at least one root. A fatal
/// error skips the sweep; files committed before it stay in the store.
pub fn run_index(store: &SymbolStore, config: &Config, roots: &[PathBuf]) -> Result<SyncReport> {
    let mut report = if roots.is_empty() {
        SyncReport::default()
    } else {
        let program = producer::locate_program()?;
        let producer = CtagsProducer::spawn(
            &program,
            store.base().as_std_path(),
            &config.producer_args,
            config.encoding.as_deref(),
        )?;

        let options = SyncOptions {
            sweep: false,
            ..config.sync
        };
        let mut synchronizer = Synchronizer::new(store, producer, options);
        let outcome = synchronizer.run(roots);
        let producer = synchronizer.into_channel();
        let report = outcome.context("indexing aborted")?;
        producer.finish().context("waiting for ctags")?;
        report
    };

    if config.sync.sweep {
        sync::sweep(store, &mut report).context("sweeping deleted files")?;
    }

    Ok(report)
}

/// Summary printed in verbose mode.
pub fn print_report(report: &SyncReport) {
    for diagnostic in report.sorted_diagnostics() {
        eprintln!("{}", diagnostic);
    }
    eprintln!(
        "indexed: {}, unchanged: {}, rolled back: {}, skipped: {}, deleted: {}, tags: {}",
        report.indexed,
        report.unchanged,
        report.rolled_back,
        report.skipped,
        report.deleted,
        report.tags
    );
}
