//! Custom SQL matching functions.
//!
//! SQLite rewrites `X MATCH Y` to `match(Y, X)` and `X REGEXP Y` to
//! `regexp(Y, X)`, so the pattern is always argument 0 and the value argument
//! 1. Both functions evaluate a [`MatchStrategy`] read from shared state that
//! the store sets immediately before running a statement.
//!
//! `ABSPATH(stored)` and `RELPATH(supplied)` map between stored relative paths
//! and absolute paths using the store's base directory.

use std::borrow::Cow;
use std::sync::{Arc, Mutex};

use camino::{Utf8Path, Utf8PathBuf};
use globset::{GlobBuilder, GlobMatcher};
use regex::{Regex, RegexBuilder};
use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::types::ValueRef;
use rusqlite::Connection;

use crate::paths::{self, PathNormalizer};

/// POSIX regular expression dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegexSyntax {
    /// Basic syntax: `\(`, `\{`, `\|`, `\+`, `\?` are operators
    Basic,
    /// Extended syntax: `(`, `{`, `|`, `+`, `?` are operators
    Extended,
}

/// How a pattern is compared against a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchStrategy {
    /// Whole-string compare; ASCII case folding when `fold_case`.
    Exact { fold_case: bool },
    /// Shell wildcard match, no escape character.
    Glob { fold_case: bool },
    /// Unanchored regular expression search.
    Regex { syntax: RegexSyntax, fold_case: bool },
}

/// Per-query matching options.
///
/// `MATCH` uses glob matching when `glob` is set and an exact compare
/// otherwise; `REGEXP` uses a regular expression when `regex` is set and an
/// exact compare otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryMode {
    pub glob: bool,
    pub regex: Option<RegexSyntax>,
    pub fold_case: bool,
}

impl QueryMode {
    /// Exact compare for both operators.
    pub fn plain() -> Self {
        Self::default()
    }

    /// Glob `MATCH`, exact `REGEXP`: what the command line uses by default.
    pub fn globbing() -> Self {
        Self {
            glob: true,
            ..Self::default()
        }
    }

    pub fn with_regex(mut self, syntax: RegexSyntax) -> Self {
        self.regex = Some(syntax);
        self
    }

    pub fn with_fold_case(mut self, fold_case: bool) -> Self {
        self.fold_case = fold_case;
        self
    }

    /// Strategy used by the `MATCH` operator.
    pub fn match_strategy(&self) -> MatchStrategy {
        if self.glob {
            MatchStrategy::Glob {
                fold_case: self.fold_case,
            }
        } else {
            MatchStrategy::Exact {
                fold_case: self.fold_case,
            }
        }
    }

    /// Strategy used by the `REGEXP` operator.
    pub fn regexp_strategy(&self) -> MatchStrategy {
        match self.regex {
            Some(syntax) => MatchStrategy::Regex {
                syntax,
                fold_case: self.fold_case,
            },
            None => MatchStrategy::Exact {
                fold_case: self.fold_case,
            },
        }
    }
}

enum Compiled {
    Glob(GlobMatcher),
    Regex(Regex),
    /// Pattern failed to compile; every value is a non-match
    Invalid,
}

/// Mode plus a single-entry compiled-pattern cache.
///
/// A query evaluates the same pattern against every row, so one cached entry
/// is enough.
#[derive(Default)]
pub(crate) struct MatchState {
    mode: QueryMode,
    cache: Option<(MatchStrategy, String, Compiled)>,
}

impl MatchState {
    pub(crate) fn set_mode(&mut self, mode: QueryMode) {
        self.mode = mode;
    }

    fn eval_match(&mut self, pattern: &str, value: &str) -> bool {
        let strategy = self.mode.match_strategy();
        self.evaluate(strategy, pattern, value)
    }

    fn eval_regexp(&mut self, pattern: &str, value: &str) -> bool {
        let strategy = self.mode.regexp_strategy();
        self.evaluate(strategy, pattern, value)
    }

    pub(crate) fn evaluate(&mut self, strategy: MatchStrategy, pattern: &str, value: &str) -> bool {
        if let MatchStrategy::Exact { fold_case } = strategy {
            return if fold_case {
                pattern.eq_ignore_ascii_case(value)
            } else {
                pattern == value
            };
        }

        let hit = matches!(&self.cache, Some((s, p, _)) if *s == strategy && p == pattern);
        if !hit {
            self.cache = Some((strategy, pattern.to_string(), compile(strategy, pattern)));
        }

        match &self.cache {
            Some((_, _, Compiled::Glob(glob))) => glob.is_match(value),
            Some((_, _, Compiled::Regex(re))) => re.is_match(value),
            _ => false,
        }
    }
}

fn compile(strategy: MatchStrategy, pattern: &str) -> Compiled {
    match strategy {
        MatchStrategy::Glob { fold_case } => GlobBuilder::new(pattern)
            .literal_separator(false)
            .backslash_escape(false)
            .case_insensitive(fold_case)
            .build()
            .map(|g| Compiled::Glob(g.compile_matcher()))
            .unwrap_or(Compiled::Invalid),
        MatchStrategy::Regex { syntax, fold_case } => {
            RegexBuilder::new(&translate_posix(pattern, syntax))
                .case_insensitive(fold_case)
                .build()
                .map(Compiled::Regex)
                .unwrap_or(Compiled::Invalid)
        }
        MatchStrategy::Exact { .. } => Compiled::Invalid,
    }
}

/// Rewrite a POSIX regular expression into `regex` crate syntax.
///
/// Handles the operator/literal swap of basic syntax, `\<`/`\>` word
/// boundaries, bracket expressions (where backslash is literal) and a leading
/// `*` (literal in basic syntax). Back-references have no equivalent and make
/// the result fail to compile.
pub fn translate_posix(pattern: &str, syntax: RegexSyntax) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut i = 0;
    // Position where `*` is still literal in basic syntax
    let mut at_expr_start = true;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' if i + 1 < chars.len() => {
                let next = chars[i + 1];
                i += 2;
                match next {
                    '<' | '>' => out.push_str(r"\b"),
                    '(' | ')' | '{' | '}' | '|' | '+' | '?' if syntax == RegexSyntax::Basic => {
                        out.push(next);
                        at_expr_start = matches!(next, '(' | '|');
                        continue;
                    }
                    _ => {
                        out.push('\\');
                        out.push(next);
                    }
                }
                at_expr_start = false;
            }
            '\\' => {
                out.push_str(r"\\");
                i += 1;
            }
            '[' => {
                i = translate_bracket(&chars, i, &mut out);
                at_expr_start = false;
            }
            '(' | ')' | '{' | '}' | '|' | '+' | '?' if syntax == RegexSyntax::Basic => {
                out.push('\\');
                out.push(c);
                i += 1;
                at_expr_start = false;
            }
            '*' if at_expr_start && syntax == RegexSyntax::Basic => {
                out.push_str(r"\*");
                i += 1;
                at_expr_start = false;
            }
            '^' => {
                out.push(c);
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
                at_expr_start = false;
            }
        }
    }

    out
}

/// Copy the bracket expression starting at `chars[start] == '['`.
///
/// Returns the index after the closing `]`. An unterminated bracket is
/// emitted as a literal `[`.
fn translate_bracket(chars: &[char], start: usize, out: &mut String) -> usize {
    let mut i = start + 1;
    let mut body = String::from("[");

    if i < chars.len() && chars[i] == '^' {
        body.push('^');
        i += 1;
    }
    // A `]` right after the opening is a member
    if i < chars.len() && chars[i] == ']' {
        body.push_str(r"\]");
        i += 1;
    }

    while i < chars.len() {
        match chars[i] {
            ']' => {
                body.push(']');
                out.push_str(&body);
                return i + 1;
            }
            '[' if i + 1 < chars.len() && matches!(chars[i + 1], ':' | '=' | '.') => {
                let delim = chars[i + 1];
                let close = (i + 2..chars.len().saturating_sub(1))
                    .find(|&j| chars[j] == delim && chars[j + 1] == ']');
                match close {
                    Some(j) if delim == ':' => {
                        body.extend(&chars[i..j + 2]);
                        i = j + 2;
                    }
                    Some(j) => {
                        // Collating element or equivalence class: keep the members
                        for &m in &chars[i + 2..j] {
                            push_class_literal(&mut body, m);
                        }
                        i = j + 2;
                    }
                    None => {
                        body.push_str(r"\[");
                        i += 1;
                    }
                }
            }
            c => {
                push_class_literal(&mut body, c);
                i += 1;
            }
        }
    }

    out.push_str(r"\[");
    start + 1
}

fn push_class_literal(body: &mut String, c: char) {
    match c {
        '\\' | '[' | '&' | '~' => {
            body.push('\\');
            body.push(c);
        }
        _ => body.push(c),
    }
}

/// Text argument; stored values that are not UTF-8 are compared lossily.
fn text_arg<'a>(ctx: &'a Context<'_>, idx: usize) -> Option<Cow<'a, str>> {
    match ctx.get_raw(idx) {
        ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes)),
        _ => None,
    }
}

fn lock_error() -> rusqlite::Error {
    rusqlite::Error::UserFunctionError("match state lock poisoned".into())
}

/// Register `match`, `regexp`, `ABSPATH` and `RELPATH` on `conn`.
pub(crate) fn register(
    conn: &Connection,
    state: Arc<Mutex<MatchState>>,
    base: Utf8PathBuf,
    normalizer: PathNormalizer,
) -> rusqlite::Result<()> {
    let path_flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;
    // Results depend on the current query mode
    let match_flags = FunctionFlags::SQLITE_UTF8;

    let match_state = Arc::clone(&state);
    conn.create_scalar_function("match", 2, match_flags, move |ctx| {
        let (Some(pattern), Some(value)) = (text_arg(ctx, 0), text_arg(ctx, 1)) else {
            return Ok(None);
        };
        let mut state = match_state.lock().map_err(|_| lock_error())?;
        Ok(Some(state.eval_match(&pattern, &value)))
    })?;

    let regexp_state = state;
    conn.create_scalar_function("regexp", 2, match_flags, move |ctx| {
        let (Some(pattern), Some(value)) = (text_arg(ctx, 0), text_arg(ctx, 1)) else {
            return Ok(None);
        };
        let mut state = regexp_state.lock().map_err(|_| lock_error())?;
        Ok(Some(state.eval_regexp(&pattern, &value)))
    })?;

    let abs_base = base.clone();
    conn.create_scalar_function("ABSPATH", 1, path_flags, move |ctx| {
        Ok(text_arg(ctx, 0).map(|stored| {
            paths::join_lexically(&abs_base, Utf8Path::new(stored.as_ref())).into_string()
        }))
    })?;

    conn.create_scalar_function("RELPATH", 1, path_flags, move |ctx| {
        Ok(text_arg(ctx, 0).map(|supplied| {
            normalizer
                .to_relative(&base, Utf8Path::new(supplied.as_ref()))
                .into_string()
        }))
    })?;

    Ok(())
}
