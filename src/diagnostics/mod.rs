//! Structured diagnostics for synchronization runs.
//!
//! Provides deterministic, sortable diagnostic types for skipped files and
//! contained per-file failures. The CLI prints them to stderr in verbose mode.

pub mod sync_diagnostics;

pub use sync_diagnostics::{DiagnosticStage, SkipReason, SyncDiagnostic};
