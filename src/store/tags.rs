//! Tag row insertion.

use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params, ErrorCode};

use super::{FileId, SymbolStore};
use crate::error::{IndexError, Result};
use crate::ingest::{FieldKey, TagFields};

const INSERT_TAG: &str = "INSERT INTO tag (
    fid, mark, name, pattern, compact, line, endl, language, roles, kind,
    typeref, signature, access, inherits, implementation, scopeKind, scopeName, extras
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)";

impl SymbolStore {
    /// Insert one tag owned by file `fid`.
    ///
    /// Absent optional text binds NULL and an absent `endl` binds 0. Text is
    /// bound as TEXT with the producer's bytes unchanged, UTF-8 or not.
    ///
    /// # Errors
    /// [`IndexError::Bind`] when a required field (`name`, `mark`, `pattern`,
    /// `compact`, `line`, `kind`) is missing or `fid` names no file row.
    pub fn add_tag(&self, fid: FileId, fields: &TagFields) -> Result<()> {
        if let Some(missing) = fields.missing_required() {
            return Err(IndexError::Bind(format!(
                "record lacks required field '{}'",
                missing
            )));
        }

        let text = move |key: FieldKey| {
            fields
                .text_bytes(key)
                .map(|bytes| ToSqlOutput::Borrowed(ValueRef::Text(bytes)))
        };
        let mut stmt = self.conn.prepare_cached(INSERT_TAG)?;
        stmt.execute(params![
            fid,
            text(FieldKey::Mark),
            text(FieldKey::Name),
            text(FieldKey::Pattern),
            text(FieldKey::Compact),
            fields.int(FieldKey::Line),
            fields.int(FieldKey::Endl).unwrap_or(0),
            text(FieldKey::Language),
            text(FieldKey::Roles),
            text(FieldKey::Kind),
            text(FieldKey::Typeref),
            text(FieldKey::Signature),
            text(FieldKey::Access),
            text(FieldKey::Inherits),
            text(FieldKey::Implementation),
            text(FieldKey::ScopeKind),
            text(FieldKey::ScopeName),
            text(FieldKey::Extras),
        ])
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(ref err, _)
                if err.code == ErrorCode::ConstraintViolation =>
            {
                IndexError::Bind(format!("file id {} does not exist", fid))
            }
            other => IndexError::from(other),
        })?;

        Ok(())
    }

    pub fn count_tags(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM tag", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
