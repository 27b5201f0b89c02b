//! symdex: an incremental symbol index driven by Universal Ctags.
//!
//! Files are handed one at a time to a tag producer running in filter mode;
//! the tags it returns are stored per file in a SQLite database and served
//! back through a small catalog of name, context and path queries.
//!
//! # Paths
//!
//! Stored paths are relative to a base directory; query results carry
//! absolute paths and presentation makes them relative to the working
//! directory. Case sensitivity of path comparison is an explicit
//! [`CaseSensitivity`] value chosen when the store is opened.
//!
//! # Consistency
//!
//! Every file is ingested in its own transaction: after a run each file has
//! either its new tag set or its previous one, never a mix.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod error_codes;
pub mod ingest;
pub mod logging;
pub mod output;
pub mod paths;
pub mod producer;
pub mod store;
pub mod sync;
pub mod version;

pub use config::Config;
pub use diagnostics::{DiagnosticStage, SkipReason, SyncDiagnostic};
pub use error::{IndexError, PathError, Result};
pub use ingest::{FieldKey, FieldValue, TagFields, TagGroup};
pub use output::{TagFormat, TagPrinter, Template, TemplateError};
pub use paths::{CaseSensitivity, PathNormalizer};
pub use producer::{CtagsProducer, PipeChannel, TagChannel};
pub use store::{FileRecord, Query, QueryMode, RegexSyntax, SymbolStore, TagRow};
pub use sync::{SyncMode, SyncOptions, SyncReport, Synchronizer};
