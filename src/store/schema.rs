//! Database schema for the symbol store.

use rusqlite::Connection;

/// Oldest SQLite accepted at open (3.9.0).
pub const MIN_SQLITE_VERSION: i32 = 3_009_000;

/// Schema version recorded in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i64 = 1;

const CREATE_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS file (
    id INTEGER PRIMARY KEY,
    path TEXT UNIQUE NOT NULL,
    size INTEGER DEFAULT 0,
    time INTEGER DEFAULT 0
);
CREATE TABLE IF NOT EXISTS tag (
    fid INTEGER NOT NULL,
    mark TEXT NOT NULL,
    name TEXT NOT NULL,
    pattern TEXT NOT NULL,
    compact TEXT NOT NULL,
    line INTEGER NOT NULL,
    endl INTEGER DEFAULT 0,
    language TEXT,
    roles TEXT,
    kind TEXT,
    typeref TEXT,
    signature TEXT,
    access TEXT,
    inherits TEXT,
    implementation TEXT,
    scopeKind TEXT,
    scopeName TEXT,
    extras TEXT,
    FOREIGN KEY(fid) REFERENCES file(id) ON UPDATE CASCADE ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS tag_fid ON tag(fid);
";

/// Apply connection pragmas and create tables if missing.
///
/// Idempotent: opening an existing store leaves its rows untouched.
pub fn initialize(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "OFF")?;
    conn.execute_batch(CREATE_SCHEMA)?;

    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version == 0 {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }
    Ok(())
}

/// Whether the linked SQLite is new enough.
pub fn sqlite_supported() -> bool {
    rusqlite::version_number() >= MIN_SQLITE_VERSION
}
