//! Run configuration resolved from command-line values and the environment.

use std::path::{Path, PathBuf};

use crate::paths::CaseSensitivity;
use crate::sync::{SyncMode, SyncOptions};

/// Database file name searched for when no path is given.
pub const DEFAULT_DB_NAME: &str = "tag.db";

/// Interpret an optional boolean option value.
///
/// A missing value means true; otherwise only `yes`, `true` and `1`
/// (any case) are true.
pub fn parse_bool(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(v) => {
            v.eq_ignore_ascii_case("yes") || v.eq_ignore_ascii_case("true") || v == "1"
        }
    }
}

/// Nearest `tag.db` in `cwd` or one of its ancestors, else `<cwd>/tag.db`.
pub fn discover_db(cwd: &Path) -> PathBuf {
    discover_db_within(cwd, None)
}

/// [`discover_db`] that stops after checking `ceiling`.
fn discover_db_within(cwd: &Path, ceiling: Option<&Path>) -> PathBuf {
    let mut dirs = cwd.ancestors();
    let mut searched_ceiling = false;
    std::iter::from_fn(|| {
        if searched_ceiling {
            return None;
        }
        let dir = dirs.next()?;
        searched_ceiling = ceiling == Some(dir);
        Some(dir)
    })
    .map(|dir| dir.join(DEFAULT_DB_NAME))
    .find(|candidate| candidate.is_file())
    .unwrap_or_else(|| cwd.join(DEFAULT_DB_NAME))
}

/// Base directory for stored paths.
///
/// An explicit `prefix` wins when it names an existing directory; without
/// one the database's directory is used. Anything else falls back to `cwd`.
pub fn resolve_base(prefix: Option<&Path>, db_path: &Path, cwd: &Path) -> PathBuf {
    match prefix {
        Some(prefix) => {
            let candidate = cwd.join(prefix);
            if candidate.is_dir() {
                candidate
            } else {
                tracing::debug!(prefix = %prefix.display(), "prefix is not a directory, using cwd");
                cwd.to_path_buf()
            }
        }
        None => match db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(dir) => cwd.join(dir),
            None => cwd.to_path_buf(),
        },
    }
}

/// Resolved settings for one invocation.
#[derive(Debug, Clone)]
pub struct Config {
    pub cwd: PathBuf,
    pub db_path: PathBuf,
    pub base: PathBuf,
    pub case: CaseSensitivity,
    /// Extra arguments handed to the producer before its filter options
    pub producer_args: Vec<String>,
    /// Output encoding requested from the producer
    pub encoding: Option<String>,
    pub sync: SyncOptions,
    pub verbose: bool,
}

impl Config {
    /// Defaults for `cwd`: discovered database, derived base, platform case
    /// sensitivity, non-recursive full sync with sweep.
    pub fn new(cwd: &Path) -> Self {
        let db_path = discover_db(cwd);
        let base = resolve_base(None, &db_path, cwd);
        Self {
            cwd: cwd.to_path_buf(),
            db_path,
            base,
            case: CaseSensitivity::platform_default(),
            producer_args: Vec::new(),
            encoding: None,
            sync: SyncOptions::default(),
            verbose: false,
        }
    }

    /// Use `db_path` (relative to the working directory) and rederive the base.
    pub fn with_db(mut self, db_path: &Path, prefix: Option<&Path>) -> Self {
        self.db_path = self.cwd.join(db_path);
        self.base = resolve_base(prefix, &self.db_path, &self.cwd);
        self
    }

    pub fn with_prefix(mut self, prefix: &Path) -> Self {
        self.base = resolve_base(Some(prefix), &self.db_path, &self.cwd);
        self
    }

    pub fn with_case(mut self, case: CaseSensitivity) -> Self {
        self.case = case;
        self
    }

    /// `-u` selects incremental mode; `-d` additionally skips the sweep.
    pub fn with_update(mut self, incremental: bool, skip_sweep: bool) -> Self {
        if incremental || skip_sweep {
            self.sync.mode = SyncMode::Incremental;
        }
        self.sync.sweep = !skip_sweep;
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.sync.recursive = recursive;
        self
    }

    pub fn with_producer(mut self, args: Vec<String>, encoding: Option<String>) -> Self {
        self.producer_args = args;
        self.encoding = encoding;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}
