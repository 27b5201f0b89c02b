//! Interactive line mode
//!
//! Reads one command per line after a `>> ` prompt and answers in cscope
//! format with a `cscope: N lines` header, like `cscope -l`.

use std::io::{BufRead, Write};

use anyhow::Result;
use symdex::{Query, QueryMode, RegexSyntax, SymbolStore, TagPrinter};

use crate::query_cmd::{self, QueryRequest};

pub const PROMPT: &str = ">> ";

/// Regex and case-folding switches carried between commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineState {
    pub regex: Option<RegexSyntax>,
    pub fold_case: bool,
}

impl LineState {
    pub fn from_mode(mode: QueryMode) -> Self {
        Self {
            regex: mode.regex,
            fold_case: mode.fold_case,
        }
    }

    pub fn mode(&self) -> QueryMode {
        let mode = QueryMode::globbing().with_fold_case(self.fold_case);
        match self.regex {
            Some(syntax) => mode.with_regex(syntax),
            None => mode,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineCommand {
    Run(QueryRequest),
    /// State changed or nothing to do
    Continue,
    Quit,
    Unknown(String),
}

/// Parse one input line, updating `state`.
///
/// Leading `5`s switch regex mode on before the command character.
pub fn parse_line(line: &str, state: &mut LineState) -> LineCommand {
    let mut rest = line.trim();
    while let Some(stripped) = rest.strip_prefix('5') {
        state.regex = Some(RegexSyntax::Basic);
        rest = stripped;
    }

    let mut chars = rest.chars();
    let Some(command) = chars.next() else {
        return LineCommand::Continue;
    };
    let argument = chars.as_str().to_string();

    if let Some(query) = Query::from_digit(command) {
        return LineCommand::Run(QueryRequest::Catalog(query, argument));
    }

    match command {
        '7' => LineCommand::Run(QueryRequest::FindPath(argument)),
        'r' => LineCommand::Run(QueryRequest::Catalog(Query::InFile, argument)),
        'e' => {
            state.regex = Some(RegexSyntax::Basic);
            LineCommand::Run(QueryRequest::Filter(argument, RegexSyntax::Basic))
        }
        'E' => {
            state.regex = Some(RegexSyntax::Extended);
            LineCommand::Run(QueryRequest::Filter(argument, RegexSyntax::Extended))
        }
        'c' => {
            state.fold_case = !state.fold_case;
            LineCommand::Continue
        }
        'C' => {
            state.fold_case = true;
            LineCommand::Continue
        }
        'R' => {
            state.regex = None;
            state.fold_case = false;
            LineCommand::Continue
        }
        'F' => LineCommand::Continue,
        'q' => LineCommand::Quit,
        _ => LineCommand::Unknown(rest.to_string()),
    }
}

/// Serve commands from `input` until `q` or end of input.
pub fn run_line_mode<R: BufRead, W: Write>(
    store: &SymbolStore,
    printer: &TagPrinter,
    mode: QueryMode,
    input: R,
    out: &mut W,
) -> Result<()> {
    let mut state = LineState::from_mode(mode);
    let mut lines = input.lines();

    loop {
        write!(out, "{}", PROMPT)?;
        out.flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;

        match parse_line(&line, &mut state) {
            LineCommand::Run(request) => {
                if let Err(e) = query_cmd::execute(store, printer, &request, state.mode(), out, true) {
                    eprintln!("Error: {:#}", e);
                }
            }
            LineCommand::Continue => {}
            LineCommand::Quit => break,
            LineCommand::Unknown(text) => eprintln!("unknown command '{}'.", text),
        }
    }

    Ok(())
}
