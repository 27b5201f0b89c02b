//! symdex CLI - incremental ctags-driven symbol index
//!
//! Usage: symdex [OPTIONS] [FILES...] [-- CTAGS_ARGS...]

mod cli;
mod index_cmd;
mod line_cmd;
mod query_cmd;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use symdex::paths::to_utf8;
use symdex::{logging, version, SymbolStore, TagPrinter};

use crate::cli::Cli;

fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir().context("current directory doesn't exist")?;
    let config = cli.config(&cwd);
    tracing::debug!(db = %config.db_path.display(), base = %config.base.display(), "configuration");

    let store = SymbolStore::open(&config.db_path, &config.base, config.case)
        .context("open database failed")?;

    let (listed, stdin_consumed) = cli.listed_paths()?;
    let mut roots = cli.files.clone();
    roots.extend(listed);

    let report = index_cmd::run_index(&store, &config, &roots)?;
    if config.verbose {
        index_cmd::print_report(&report);
    }

    let cwd = to_utf8(&cwd)?.to_path_buf();
    let mode = cli.query_mode();

    if let Some(request) = cli.query() {
        let printer = TagPrinter::new(cli.format(), &cwd, store.normalizer());
        query_cmd::run_query(
            &store,
            &printer,
            &request,
            mode,
            cli.output.as_deref(),
            config.verbose,
        )?;
    }

    // Reading the file list from stdin leaves nothing to read commands from
    if cli.line_mode && !stdin_consumed {
        let printer = TagPrinter::new(symdex::TagFormat::Cscope, &cwd, store.normalizer());
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        line_cmd::run_line_mode(&store, &printer, mode, stdin.lock(), &mut stdout.lock())?;
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version {
        println!("{}", version::version());
        return ExitCode::SUCCESS;
    }

    logging::init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}
