//! Query command implementation
//!
//! Runs one catalog query, path listing or raw filter and prints the result.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use symdex::{Query, QueryMode, RegexSyntax, SymbolStore, TagPrinter};

/// What to look up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryRequest {
    Catalog(Query, String),
    /// Indexed file paths matching a glob
    FindPath(String),
    /// Trusted raw `WHERE` expression
    Filter(String, RegexSyntax),
}

impl QueryRequest {
    /// Apply request-specific overrides to `mode`.
    pub fn mode(&self, mode: QueryMode) -> QueryMode {
        match self {
            QueryRequest::Filter(_, syntax) => mode.with_regex(*syntax),
            _ => mode,
        }
    }
}

/// Run `request` and write its rows. Returns the number of result rows.
pub fn execute<W: Write>(
    store: &SymbolStore,
    printer: &TagPrinter,
    request: &QueryRequest,
    mode: QueryMode,
    out: &mut W,
    count: bool,
) -> Result<usize> {
    let mode = request.mode(mode);
    let rows = match request {
        QueryRequest::Catalog(query, pattern) => {
            let rows = store
                .query(*query, pattern, mode)
                .with_context(|| format!("{} query for '{}'", query, pattern))?;
            printer.write_tags(out, &rows, count)?;
            rows.len()
        }
        QueryRequest::FindPath(pattern) => {
            let paths = store
                .find_paths(pattern, mode)
                .with_context(|| format!("path query for '{}'", pattern))?;
            printer.write_paths(out, &paths, count)?;
            paths.len()
        }
        QueryRequest::Filter(filter, _) => {
            let rows = store
                .query_filter(filter, mode)
                .with_context(|| format!("filter '{}'", filter))?;
            printer.write_tags(out, &rows, count)?;
            rows.len()
        }
    };
    out.flush()?;
    Ok(rows)
}

/// Run a command-line query, to `output` (with file header and footer) or
/// stdout.
///
/// Usage: symdex [-0..-9 PATTERN | -r PATTERN | -e/-E FILTER] [-o FILE]
pub fn run_query(
    store: &SymbolStore,
    printer: &TagPrinter,
    request: &QueryRequest,
    mode: QueryMode,
    output: Option<&Path>,
    count: bool,
) -> Result<usize> {
    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating output file {}", path.display()))?;
            let mut out = BufWriter::new(file);
            printer.write_file_header(&mut out)?;
            let rows = execute(store, printer, request, mode, &mut out, count)?;
            printer.write_file_footer(&mut out)?;
            out.flush()?;
            Ok(rows)
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            execute(store, printer, request, mode, &mut out, count)
        }
    }
}
