//! Command-line arguments for symdex
//!
//! One flat option set: positional files are indexed first, then at most one
//! query runs, then line mode starts when requested.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use symdex::config::parse_bool;
use symdex::{CaseSensitivity, Config, Query, QueryMode, RegexSyntax, TagFormat, Template};

use crate::query_cmd::QueryRequest;

#[derive(Parser, Debug)]
#[command(
    name = "symdex",
    about = "Incremental ctags-driven symbol index",
    disable_version_flag = true,
    group(ArgGroup::new("query").multiple(false)),
    group(ArgGroup::new("format").multiple(false))
)]
pub struct Cli {
    /// Files or directories to index
    #[arg(value_name = "FILES")]
    pub files: Vec<PathBuf>,

    /// Extra arguments for ctags, given after `--`
    #[arg(last = true, value_name = "CTAGS_ARGS")]
    pub ctags_args: Vec<String>,

    /// Search symbol
    #[arg(short = '0', value_name = "PATTERN", group = "query")]
    pub symbol: Option<String>,

    /// Search definition
    #[arg(short = '1', value_name = "PATTERN", group = "query")]
    pub definition: Option<String>,

    /// Search tags inside matching functions
    #[arg(short = '2', value_name = "PATTERN", group = "query")]
    pub caller: Option<String>,

    /// Search reference
    #[arg(short = '3', value_name = "PATTERN", group = "query")]
    pub reference: Option<String>,

    /// Search string
    #[arg(short = '4', value_name = "PATTERN", group = "query")]
    pub string: Option<String>,

    /// Match names and contexts as regular expressions
    #[arg(short = '5')]
    pub regex: bool,

    /// Search context
    #[arg(short = '6', value_name = "PATTERN", group = "query")]
    pub pattern: Option<String>,

    /// List indexed files whose path matches
    #[arg(short = '7', value_name = "PATTERN", group = "query")]
    pub find_path: Option<String>,

    /// Search files including a header
    #[arg(short = '8', value_name = "PATTERN", group = "query")]
    pub include: Option<String>,

    /// Search assignment
    #[arg(short = '9', value_name = "PATTERN", group = "query")]
    pub assign: Option<String>,

    /// List every tag of files whose path matches
    #[arg(short = 'r', value_name = "PATTERN", group = "query")]
    pub in_file: Option<String>,

    /// Raw WHERE filter, basic regular expressions
    #[arg(short = 'e', value_name = "FILTER", group = "query")]
    pub filter: Option<String>,

    /// Raw WHERE filter, extended regular expressions
    #[arg(short = 'E', value_name = "FILTER", group = "query")]
    pub filter_extended: Option<String>,

    /// Ignore case when searching
    #[arg(short = 'C')]
    pub fold_case: bool,

    /// Database file (default: nearest tag.db upward)
    #[arg(short = 'f', value_name = "FILE")]
    pub db: Option<PathBuf>,

    /// Read file names to index from FILE (`-` for stdin)
    #[arg(short = 'L', value_name = "FILE")]
    pub list: Option<PathBuf>,

    /// Write query results to FILE
    #[arg(short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Base directory for stored paths
    #[arg(short = 'P', value_name = "DIR")]
    pub prefix: Option<PathBuf>,

    /// Custom output format
    #[arg(
        short = 'p',
        long = "print",
        value_name = "FORMAT",
        group = "format",
        value_parser = Template::parse
    )]
    pub print: Option<Template>,

    /// ctags output (default)
    #[arg(short = 'c', group = "format")]
    pub ctags: bool,

    /// cscope output
    #[arg(short = 's', group = "format")]
    pub cscope: bool,

    /// xref output
    #[arg(short = 'x', group = "format")]
    pub xref: bool,

    /// grep output
    #[arg(short = 'g', group = "format")]
    pub grep: bool,

    /// XML output
    #[arg(short = 'X', group = "format")]
    pub xml: bool,

    /// JSON lines output
    #[arg(short = 'j', group = "format")]
    pub json: bool,

    /// Only index new or changed files
    #[arg(short = 'u')]
    pub update: bool,

    /// Like -u, and keep rows of deleted files
    #[arg(short = 'd')]
    pub update_no_sweep: bool,

    /// Interactive line mode
    #[arg(short = 'l')]
    pub line_mode: bool,

    /// Verbose output
    #[arg(short = 'V', long)]
    pub verbose: bool,

    /// Descend into subdirectories
    #[arg(
        short = 'R',
        long = "recurse",
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "yes"
    )]
    pub recurse: Option<String>,

    /// Treat the file system as case sensitive
    #[arg(
        long = "fs-sensitive",
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "yes"
    )]
    pub fs_sensitive: Option<String>,

    /// Ask ctags for UTF-8 output
    #[arg(
        long = "output-encoding",
        value_name = "ENCODING",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "UTF-8"
    )]
    pub output_encoding: Option<String>,

    /// Print version
    #[arg(short = 'v', long = "version")]
    pub version: bool,
}

impl Cli {
    /// Resolve database, base directory and sync options against `cwd`.
    pub fn config(&self, cwd: &std::path::Path) -> Config {
        let mut config = Config::new(cwd);
        if let Some(db) = &self.db {
            config = config.with_db(db, self.prefix.as_deref());
        } else if let Some(prefix) = &self.prefix {
            config = config.with_prefix(prefix);
        }

        let case = match &self.fs_sensitive {
            Some(value) => CaseSensitivity::from_flag(parse_bool(Some(value))),
            None => CaseSensitivity::platform_default(),
        };

        config
            .with_case(case)
            .with_update(self.update, self.update_no_sweep)
            .with_recursive(self.recurse.as_deref().map(|v| parse_bool(Some(v))).unwrap_or(false))
            .with_producer(self.ctags_args.clone(), self.output_encoding.clone())
            .with_verbose(self.verbose)
    }

    /// The query requested on the command line, if any.
    pub fn query(&self) -> Option<QueryRequest> {
        let catalog = [
            (Query::Symbol, &self.symbol),
            (Query::Definition, &self.definition),
            (Query::Caller, &self.caller),
            (Query::Reference, &self.reference),
            (Query::String, &self.string),
            (Query::Pattern, &self.pattern),
            (Query::InFile, &self.in_file),
            (Query::Include, &self.include),
            (Query::Assign, &self.assign),
        ];
        for (query, pattern) in catalog {
            if let Some(pattern) = pattern {
                return Some(QueryRequest::Catalog(query, pattern.clone()));
            }
        }

        if let Some(pattern) = &self.find_path {
            return Some(QueryRequest::FindPath(pattern.clone()));
        }
        if let Some(filter) = &self.filter {
            return Some(QueryRequest::Filter(filter.clone(), RegexSyntax::Basic));
        }
        self.filter_extended
            .as_ref()
            .map(|filter| QueryRequest::Filter(filter.clone(), RegexSyntax::Extended))
    }

    /// Matching mode for the command-line query.
    pub fn query_mode(&self) -> QueryMode {
        let mode = QueryMode::globbing().with_fold_case(self.fold_case);
        if self.regex {
            mode.with_regex(RegexSyntax::Basic)
        } else {
            mode
        }
    }

    /// Selected output format; cscope in line mode, ctags otherwise.
    pub fn format(&self) -> TagFormat {
        if let Some(print) = &self.print {
            TagFormat::Custom(print.clone())
        } else if self.cscope {
            TagFormat::Cscope
        } else if self.xref {
            TagFormat::Xref
        } else if self.grep {
            TagFormat::Grep
        } else if self.xml {
            TagFormat::Xml
        } else if self.json {
            TagFormat::Json
        } else if self.ctags || !self.line_mode {
            TagFormat::Ctags
        } else {
            TagFormat::Cscope
        }
    }

    /// Paths read from the `-L` list, plus whether stdin was consumed.
    pub fn listed_paths(&self) -> Result<(Vec<PathBuf>, bool)> {
        let Some(list) = &self.list else {
            return Ok((Vec::new(), false));
        };

        if list.as_os_str() == "-" {
            let stdin = std::io::stdin();
            let paths = read_path_list(stdin.lock()).context("reading file list from stdin")?;
            return Ok((paths, true));
        }

        if !list.is_file() {
            tracing::warn!(list = %list.display(), "file list not found");
            return Ok((Vec::new(), false));
        }
        let file = std::fs::File::open(list)
            .with_context(|| format!("opening file list {}", list.display()))?;
        let paths = read_path_list(std::io::BufReader::new(file))
            .with_context(|| format!("reading file list {}", list.display()))?;
        Ok((paths, false))
    }
}

/// One path per line; surrounding whitespace trimmed, blank lines and lines
/// starting with `#` ignored.
pub fn read_path_list<R: std::io::BufRead>(reader: R) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let entry = line.trim();
        if entry.is_empty() || entry.starts_with('#') {
            continue;
        }
        paths.push(PathBuf::from(entry));
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("symdex").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_digit_queries() {
        let cli = parse(&["-1", "foo"]);
        assert!(matches!(cli.query(), Some(QueryRequest::Catalog(Query::Definition, p)) if p == "foo"));

        let cli = parse(&["-7", "*.h"]);
        assert!(matches!(cli.query(), Some(QueryRequest::FindPath(p)) if p == "*.h"));

        let cli = parse(&["-E", "kind = 'function'"]);
        assert!(matches!(
            cli.query(),
            Some(QueryRequest::Filter(_, RegexSyntax::Extended))
        ));
    }

    #[test]
    fn test_two_queries_conflict() {
        assert!(Cli::try_parse_from(["symdex", "-0", "a", "-1", "b"]).is_err());
    }

    #[test]
    fn test_regex_and_case_flags() {
        let mode = parse(&["-5", "-C", "-0", "f.*"]).query_mode();
        assert!(mode.glob);
        assert!(mode.fold_case);
        assert_eq!(mode.regex, Some(RegexSyntax::Basic));
    }

    #[test]
    fn test_optional_bool_values() {
        let cli = parse(&["-R", "src"]);
        assert_eq!(cli.recurse.as_deref(), Some("yes"));
        assert_eq!(cli.files, vec![PathBuf::from("src")]);

        let cli = parse(&["--recurse=no"]);
        assert_eq!(cli.recurse.as_deref(), Some("no"));
        assert!(!parse_bool(cli.recurse.as_deref()));
    }

    #[test]
    fn test_ctags_args_after_separator() {
        let cli = parse(&["src", "--", "--languages=C"]);
        assert_eq!(cli.ctags_args, vec!["--languages=C".to_string()]);
    }

    #[test]
    fn test_default_format_depends_on_line_mode() {
        assert_eq!(parse(&[]).format(), TagFormat::Ctags);
        assert_eq!(parse(&["-l"]).format(), TagFormat::Cscope);
        assert_eq!(parse(&["-l", "-x"]).format(), TagFormat::Xref);
    }

    #[test]
    fn test_print_template_is_validated() {
        let format = parse(&["--print", "%-10N %n\\n"]).format();
        assert_eq!(format, TagFormat::custom("%-10N %n\\n").unwrap());

        let err = Cli::try_parse_from(["symdex", "--print", "%99999999999999999999999N", "-0", "x"])
            .unwrap_err();
        assert!(err.to_string().contains("exceeds 4096"));
    }

    #[test]
    fn test_read_path_list() {
        let input = "  src/a.c  \n\n# comment\nsrc/b.c\n";
        let paths = read_path_list(std::io::Cursor::new(input)).unwrap();
        assert_eq!(paths, vec![PathBuf::from("src/a.c"), PathBuf::from("src/b.c")]);
    }
}
