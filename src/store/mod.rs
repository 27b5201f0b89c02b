//! SQLite-backed symbol store.
//!
//! Owns the `file` and `tag` tables, the custom matching functions and the
//! canned query catalog. Paths are persisted relative to the base directory
//! fixed at open time; every path argument is canonicalized before it is
//! looked up or stored.

pub mod catalog;
mod files;
pub mod matching;
pub mod schema;
mod tags;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use camino::{Utf8Path, Utf8PathBuf};
use rusqlite::Connection;

pub use catalog::{Query, TagRow};
pub use files::{FileId, FileRecord};
pub use matching::{MatchStrategy, QueryMode, RegexSyntax};

use crate::error::{IndexError, Result};
use crate::paths::{CaseSensitivity, PathNormalizer};
use matching::MatchState;

/// Handle to an open symbol database.
///
/// Single writer: one `SymbolStore` per database file at a time.
pub struct SymbolStore {
    conn: Connection,
    base: Utf8PathBuf,
    /// Working directory at open; relative path arguments resolve against it
    cwd: PathBuf,
    normalizer: PathNormalizer,
    state: Arc<Mutex<MatchState>>,
}

impl SymbolStore {
    /// Open (creating if needed) the database at `db_path`.
    ///
    /// # Arguments
    /// * `db_path` - Database file
    /// * `base` - Directory stored paths are relative to; must exist
    /// * `case` - Case sensitivity of the indexed file system
    ///
    /// # Errors
    /// [`IndexError::StoreOpen`] when the file cannot be opened, the base
    /// directory cannot be resolved, the schema cannot be created or the
    /// matching functions cannot be registered.
    pub fn open(db_path: &Path, base: &Path, case: CaseSensitivity) -> Result<Self> {
        let conn = Connection::open(db_path).map_err(|e| IndexError::StoreOpen {
            path: db_path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::with_connection(conn, db_path.to_path_buf(), base, case)
    }

    /// Open a private in-memory store. Used by tests and benchmarks.
    pub fn open_in_memory(base: &Path, case: CaseSensitivity) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| IndexError::StoreOpen {
            path: ":memory:".to_string(),
            reason: e.to_string(),
        })?;
        Self::with_connection(conn, PathBuf::from(":memory:"), base, case)
    }

    fn with_connection(
        conn: Connection,
        db_path: PathBuf,
        base: &Path,
        case: CaseSensitivity,
    ) -> Result<Self> {
        let open_error = |reason: String| IndexError::StoreOpen {
            path: db_path.display().to_string(),
            reason,
        };

        if !schema::sqlite_supported() {
            return Err(open_error(format!(
                "SQLite {} is older than 3.9.0",
                rusqlite::version()
            )));
        }

        let cwd = std::env::current_dir()
            .map_err(|e| open_error(format!("cannot read working directory: {}", e)))?;
        let normalizer = PathNormalizer::new(case);
        let base = normalizer
            .to_absolute(&cwd, base)
            .map_err(|e| open_error(format!("invalid base directory: {}", e)))?;
        if !base.is_dir() {
            return Err(open_error(format!("base {} is not a directory", base)));
        }

        schema::initialize(&conn).map_err(|e| open_error(format!("schema: {}", e)))?;

        let state = Arc::new(Mutex::new(MatchState::default()));
        matching::register(&conn, Arc::clone(&state), base.clone(), normalizer)
            .map_err(|e| open_error(format!("cannot register functions: {}", e)))?;

        tracing::debug!(db = %db_path.display(), base = %base, "opened symbol store");

        Ok(Self {
            conn,
            base,
            cwd,
            normalizer,
            state,
        })
    }

    /// Absolute canonical base directory.
    pub fn base(&self) -> &Utf8Path {
        &self.base
    }

    pub fn normalizer(&self) -> PathNormalizer {
        self.normalizer
    }

    /// Canonicalize an external path argument.
    pub fn resolve(&self, path: &Path) -> Result<Utf8PathBuf> {
        Ok(self.normalizer.to_absolute(&self.cwd, path)?)
    }

    /// Storage form of an absolute path.
    pub fn relative(&self, absolute: &Utf8Path) -> Utf8PathBuf {
        self.normalizer.to_relative(&self.base, absolute)
    }

    /// Begin a transaction; dropping it without `commit` rolls back.
    pub fn transaction(&self) -> Result<StoreTransaction<'_>> {
        let tx = self.conn.unchecked_transaction()?;
        Ok(StoreTransaction { tx })
    }

    /// Install the matching mode read by `MATCH`/`REGEXP` for the next statement.
    pub(crate) fn set_query_mode(&self, mode: QueryMode) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.set_mode(mode);
    }

    fn path_case(&self) -> CaseSensitivity {
        self.normalizer.case()
    }
}

/// Per-file unit of atomicity.
pub struct StoreTransaction<'a> {
    tx: rusqlite::Transaction<'a>,
}

impl StoreTransaction<'_> {
    pub fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }

    /// Discard every change since `transaction()`.
    pub fn rollback(self) -> Result<()> {
        self.tx.rollback()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
