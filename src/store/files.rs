//! File row operations.

use std::path::Path;

use camino::Utf8PathBuf;
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use super::SymbolStore;
use crate::error::{IndexError, Result};
use crate::paths::CaseSensitivity;

/// Store-assigned file identity. Changes whenever the path is reindexed.
pub type FileId = i64;

/// A `file` row with its path projected to absolute form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub id: FileId,
    pub path: String,
    pub size: u64,
    /// Seconds since the Unix epoch
    pub mtime: i64,
}

impl FileRecord {
    pub fn path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(&self.path)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(FileRecord {
            id: row.get(0)?,
            path: row.get(1)?,
            size: row.get::<_, Option<i64>>(2)?.unwrap_or(0).max(0) as u64,
            mtime: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
        })
    }
}

const GET_FILE: &str =
    "SELECT id, ABSPATH(path), size, time FROM file WHERE path = RELPATH(?1) LIMIT 1";
const GET_FILE_NOCASE: &str =
    "SELECT id, ABSPATH(path), size, time FROM file WHERE path = RELPATH(?1) COLLATE NOCASE LIMIT 1";
const DELETE_FILE: &str = "DELETE FROM file WHERE path = RELPATH(?1)";
const DELETE_FILE_NOCASE: &str = "DELETE FROM file WHERE path = RELPATH(?1) COLLATE NOCASE";
const INSERT_FILE: &str = "INSERT INTO file (path, size, time) VALUES (RELPATH(?1), ?2, ?3)";
const ALL_FILES: &str = "SELECT id, ABSPATH(path), size, time FROM file ORDER BY id";

impl SymbolStore {
    fn file_sql(&self, sensitive: &'static str, insensitive: &'static str) -> &'static str {
        match self.path_case() {
            CaseSensitivity::Sensitive => sensitive,
            CaseSensitivity::Insensitive => insensitive,
        }
    }

    /// Look up the row for `path`.
    ///
    /// # Errors
    /// [`IndexError::PathResolution`] when `path` does not resolve.
    pub fn get_file(&self, path: &Path) -> Result<Option<FileRecord>> {
        let absolute = self.resolve(path)?;
        let mut stmt = self
            .conn
            .prepare_cached(self.file_sql(GET_FILE, GET_FILE_NOCASE))?;
        let record = stmt
            .query_row(params![absolute.as_str()], FileRecord::from_row)
            .optional()?;
        Ok(record)
    }

    /// Replace the row for `path` with a fresh one.
    ///
    /// The previous row (and, by cascade, its tags) is deleted first, so the
    /// returned id is always new. Run inside a [`super::StoreTransaction`] to
    /// make the replacement atomic.
    pub fn set_file(&self, path: &Path, size: u64, mtime: i64) -> Result<FileId> {
        let absolute = self.resolve(path)?;

        self.conn
            .prepare_cached(self.file_sql(DELETE_FILE, DELETE_FILE_NOCASE))?
            .execute(params![absolute.as_str()])?;
        self.conn
            .prepare_cached(INSERT_FILE)?
            .execute(params![absolute.as_str(), size as i64, mtime])?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Delete the row for `path` and its tags.
    ///
    /// `path` need not exist on disk any more.
    ///
    /// # Errors
    /// [`IndexError::NotFound`] when no row matches.
    pub fn delete_file(&self, path: &Path) -> Result<()> {
        let absolute = self.normalizer.resolve_lenient(&self.cwd, path)?;
        let deleted = self
            .conn
            .prepare_cached(self.file_sql(DELETE_FILE, DELETE_FILE_NOCASE))?
            .execute(params![absolute.as_str()])?;
        if deleted == 0 {
            return Err(IndexError::NotFound(absolute.to_string()));
        }
        Ok(())
    }

    /// Delete a row by id. Returns whether a row was removed.
    pub fn delete_file_id(&self, id: FileId) -> Result<bool> {
        let deleted = self
            .conn
            .prepare_cached("DELETE FROM file WHERE id = ?1")?
            .execute(params![id])?;
        Ok(deleted > 0)
    }

    /// Visit every file row.
    ///
    /// The visitor must not modify the store; collect with [`Self::files`]
    /// first when rows are deleted along the way.
    pub fn for_each_file<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(FileRecord) -> Result<()>,
    {
        let mut stmt = self.conn.prepare_cached(ALL_FILES)?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            visit(FileRecord::from_row(row)?)?;
        }
        Ok(())
    }

    pub fn files(&self) -> Result<Vec<FileRecord>> {
        let mut files = Vec::new();
        self.for_each_file(|record| {
            files.push(record);
            Ok(())
        })?;
        Ok(files)
    }

    pub fn count_files(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM file", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
