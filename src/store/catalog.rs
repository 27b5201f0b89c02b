//! Canned symbol queries.
//!
//! | Query | Selects |
//! |---|---|
//! | `Symbol` | tags whose name matches |
//! | `Definition` | matching tags with mark `D` |
//! | `Caller` | tags inside the line range of a matching `function` tag |
//! | `Reference` | matching tags with mark `R` |
//! | `String` | matching tags of kind `string` |
//! | `Pattern` | tags whose compact context matches |
//! | `InFile` | every tag of files whose path matches (`MATCH`) |
//! | `Include` | matching tags of kind `header` |
//! | `Assign` | matching tags of kind `variable` |
//!
//! Name and context predicates use `REGEXP`; path predicates use `MATCH`.
//! [`SymbolStore::find_paths`] lists file paths and
//! [`SymbolStore::query_filter`] runs a caller-supplied `WHERE` expression.
//! Every tag result is ordered by name, line, kind.

use std::fmt;
use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{params, Row, Statement};
use serde::Serialize;

use super::{QueryMode, SymbolStore};
use crate::error::Result;
use crate::paths::CaseSensitivity;

macro_rules! select_tags {
    () => {
        "SELECT ABSPATH(file.path), tag.mark, tag.name, tag.pattern, tag.compact, tag.line, \
         tag.endl, tag.language, tag.roles, tag.kind, tag.typeref, tag.signature, tag.access, \
         tag.inherits, tag.implementation, tag.scopeKind, tag.scopeName, tag.extras \
         FROM tag INNER JOIN file ON tag.fid = file.id "
    };
}

macro_rules! order_tags {
    () => {
        " ORDER BY tag.name, tag.line, tag.kind ASC"
    };
}

const SQL_SYMBOL: &str = concat!(select_tags!(), "WHERE tag.name REGEXP ?1", order_tags!());
const SQL_DEFINITION: &str = concat!(
    select_tags!(),
    "WHERE tag.name REGEXP ?1 AND tag.mark = 'D'",
    order_tags!()
);
const SQL_CALLER: &str = concat!(
    select_tags!(),
    "INNER JOIN (SELECT fid, line AS line1, endl AS line2 FROM tag \
     WHERE name REGEXP ?1 AND kind = 'function') AS scope ON tag.fid = scope.fid \
     WHERE tag.line BETWEEN scope.line1 AND scope.line2",
    order_tags!()
);
const SQL_REFERENCE: &str = concat!(
    select_tags!(),
    "WHERE tag.name REGEXP ?1 AND tag.mark = 'R'",
    order_tags!()
);
const SQL_STRING: &str = concat!(
    select_tags!(),
    "WHERE tag.name REGEXP ?1 AND tag.kind = 'string'",
    order_tags!()
);
const SQL_PATTERN: &str = concat!(select_tags!(), "WHERE tag.compact REGEXP ?1", order_tags!());
const SQL_IN_FILE: &str = concat!(select_tags!(), "WHERE file.path MATCH ?1", order_tags!());
const SQL_INCLUDE: &str = concat!(
    select_tags!(),
    "WHERE tag.name REGEXP ?1 AND tag.kind = 'header'",
    order_tags!()
);
const SQL_ASSIGN: &str = concat!(
    select_tags!(),
    "WHERE tag.name REGEXP ?1 AND tag.kind = 'variable'",
    order_tags!()
);
const SQL_FIND_PATH: &str = "SELECT ABSPATH(path) FROM file WHERE path MATCH ?1 ORDER BY path ASC";
const SQL_TAGS_IN_FILE: &str = concat!(select_tags!(), "WHERE file.path = RELPATH(?1)", order_tags!());
const SQL_TAGS_IN_FILE_NOCASE: &str = concat!(
    select_tags!(),
    "WHERE file.path = RELPATH(?1) COLLATE NOCASE",
    order_tags!()
);

/// Parametrized tag queries. Each takes a single pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Query {
    Symbol,
    Definition,
    Caller,
    Reference,
    String,
    Pattern,
    InFile,
    Include,
    Assign,
}

impl Query {
    pub const ALL: [Query; 9] = [
        Query::Symbol,
        Query::Definition,
        Query::Caller,
        Query::Reference,
        Query::String,
        Query::Pattern,
        Query::InFile,
        Query::Include,
        Query::Assign,
    ];

    /// Map a command digit to its query.
    ///
    /// `5` (regex toggle) and `7` (path listing) are not tag queries.
    pub fn from_digit(digit: char) -> Option<Query> {
        match digit {
            '0' => Some(Query::Symbol),
            '1' => Some(Query::Definition),
            '2' => Some(Query::Caller),
            '3' => Some(Query::Reference),
            '4' => Some(Query::String),
            '6' => Some(Query::Pattern),
            '8' => Some(Query::Include),
            '9' => Some(Query::Assign),
            _ => None,
        }
    }

    pub fn sql(self) -> &'static str {
        match self {
            Query::Symbol => SQL_SYMBOL,
            Query::Definition => SQL_DEFINITION,
            Query::Caller => SQL_CALLER,
            Query::Reference => SQL_REFERENCE,
            Query::String => SQL_STRING,
            Query::Pattern => SQL_PATTERN,
            Query::InFile => SQL_IN_FILE,
            Query::Include => SQL_INCLUDE,
            Query::Assign => SQL_ASSIGN,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Query::Symbol => "symbol",
            Query::Definition => "definition",
            Query::Caller => "caller",
            Query::Reference => "reference",
            Query::String => "string",
            Query::Pattern => "pattern",
            Query::InFile => "in-file",
            Query::Include => "include",
            Query::Assign => "assign",
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One tag query result row. `path` is absolute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagRow {
    pub path: String,
    pub mark: String,
    pub name: String,
    pub pattern: String,
    pub compact: String,
    pub line: i64,
    pub endl: i64,
    pub language: Option<String>,
    pub roles: Option<String>,
    pub kind: Option<String>,
    pub typeref: Option<String>,
    pub signature: Option<String>,
    pub access: Option<String>,
    pub inherits: Option<String>,
    pub implementation: Option<String>,
    pub scope_kind: Option<String>,
    pub scope_name: Option<String>,
    pub extras: Option<String>,
}

/// Read a text column; bytes that are not UTF-8 are replaced for display.
fn text_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => None,
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
        ValueRef::Integer(n) => Some(n.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
    })
}

impl TagRow {
    /// Decode a row; `None` when a required column is NULL.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Option<TagRow>> {
        let text = |idx| text_column(row, idx);
        let required = (
            text(0)?,
            text(1)?,
            text(2)?,
            text(3)?,
            text(4)?,
            row.get::<_, Option<i64>>(5)?,
        );
        let (Some(path), Some(mark), Some(name), Some(pattern), Some(compact), Some(line)) =
            required
        else {
            return Ok(None);
        };

        Ok(Some(TagRow {
            path,
            mark,
            name,
            pattern,
            compact,
            line,
            endl: row.get::<_, Option<i64>>(6)?.unwrap_or(0),
            language: text(7)?,
            roles: text(8)?,
            kind: text(9)?,
            typeref: text(10)?,
            signature: text(11)?,
            access: text(12)?,
            inherits: text(13)?,
            implementation: text(14)?,
            scope_kind: text(15)?,
            scope_name: text(16)?,
            extras: text(17)?,
        }))
    }
}

fn collect_rows(stmt: &mut Statement<'_>, pattern: Option<&str>) -> Result<Vec<TagRow>> {
    let rows = match pattern {
        Some(p) => stmt.query_map(params![p], TagRow::from_row)?,
        None => stmt.query_map([], TagRow::from_row)?,
    };

    let mut out = Vec::new();
    for row in rows {
        if let Some(tag) = row? {
            out.push(tag);
        }
    }
    Ok(out)
}

impl SymbolStore {
    /// Run a catalog query.
    ///
    /// `mode` decides how `MATCH` and `REGEXP` compare `pattern` for this
    /// statement only.
    pub fn query(&self, query: Query, pattern: &str, mode: QueryMode) -> Result<Vec<TagRow>> {
        self.set_query_mode(mode);
        let mut stmt = self.conn.prepare_cached(query.sql())?;
        let rows = collect_rows(&mut stmt, Some(pattern))?;
        tracing::debug!(query = %query, pattern, rows = rows.len(), "catalog query");
        Ok(rows)
    }

    /// Absolute paths of files whose stored path matches `pattern`, sorted.
    pub fn find_paths(&self, pattern: &str, mode: QueryMode) -> Result<Vec<String>> {
        self.set_query_mode(mode);
        let mut stmt = self.conn.prepare_cached(SQL_FIND_PATH)?;
        let paths = stmt
            .query_map(params![pattern], |row| row.get::<_, Option<String>>(0))?
            .filter_map(|r| r.transpose())
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(paths)
    }

    /// Run a raw `WHERE` expression over the tag/file join.
    ///
    /// The expression is pasted into the statement verbatim: it is trusted
    /// input and must come from the local user, never from an untrusted
    /// source. Columns are qualified as `tag.*` and `file.*`; the unqualified
    /// tag columns are also accepted where unambiguous.
    pub fn query_filter(&self, filter: &str, mode: QueryMode) -> Result<Vec<TagRow>> {
        self.set_query_mode(mode);
        let sql = format!("{}WHERE {}{}", select_tags!(), filter, order_tags!());
        let mut stmt = self.conn.prepare(&sql)?;
        collect_rows(&mut stmt, None)
    }

    /// Every tag of the file at `path`, ordered like catalog queries.
    pub fn tags_in_file(&self, path: &Path) -> Result<Vec<TagRow>> {
        let absolute = self.resolve(path)?;
        let sql = match self.path_case() {
            CaseSensitivity::Sensitive => SQL_TAGS_IN_FILE,
            CaseSensitivity::Insensitive => SQL_TAGS_IN_FILE_NOCASE,
        };
        let mut stmt = self.conn.prepare_cached(sql)?;
        collect_rows(&mut stmt, Some(absolute.as_str()))
    }
}
