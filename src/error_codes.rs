//! symdex error codes
//!
//! Error codes follow the pattern: SYM-{CATEGORY}-{3-digit number}
//!
//! Categories:
//! - STORE: Store-related errors (open, schema, lookups)
//! - PATH: Path resolution errors
//! - ING: Ingestion errors (record binding, rollback)
//! - PROD: Tag producer channel errors
//!
//! Each error code is stable and should not be reused.

/// Store could not be opened (file, schema, function registration)
pub const SYM_STORE_001_OPEN_FAILED: &str = "SYM-STORE-001";

/// Path not present in the store
pub const SYM_STORE_002_NOT_FOUND: &str = "SYM-STORE-002";

/// Underlying SQLite failure
pub const SYM_STORE_003_SQLITE: &str = "SYM-STORE-003";

/// Supplied path cannot be canonicalized
pub const SYM_PATH_001_UNRESOLVABLE: &str = "SYM-PATH-001";

/// Tag record is missing required fields or references an unknown file
pub const SYM_ING_001_BIND: &str = "SYM-ING-001";

/// No tags produced for a file, transaction rolled back
pub const SYM_ING_002_ROLLBACK: &str = "SYM-ING-002";

/// Tag producer could not be started or its channel broke
pub const SYM_PROD_001_CHANNEL: &str = "SYM-PROD-001";

/// Generic I/O failure
pub const SYM_IO_001: &str = "SYM-IO-001";

/// Error code documentation
///
/// | Code | Description | Remediation |
/// |------|-------------|-------------|
/// | SYM-STORE-001 | Store open failed | Check database path permissions and SQLite version (>= 3.9.0) |
/// | SYM-STORE-002 | Path not in store | Index the file first, or check the base directory (`-P`) |
/// | SYM-STORE-003 | SQLite error | Re-run the index; delete the database if it is corrupt |
/// | SYM-PATH-001 | Unresolvable path | Verify the file exists and its name is valid UTF-8 |
/// | SYM-ING-001 | Bind error | Producer emitted an incomplete record; record is dropped |
/// | SYM-ING-002 | Ingestion rollback | Producer emitted no tags for the file; prior state kept |
/// | SYM-PROD-001 | Producer channel failure | Check `CTAGSPATH` or that Universal Ctags is on `PATH` |
/// | SYM-IO-001 | I/O error | Check file permissions |
pub const ERROR_CODE_DOCUMENTATION: &str = "Error code documentation available in source";
