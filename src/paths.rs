//! Path canonicalization and base-relative path mapping.
//!
//! Every path that reaches the store goes through [`PathNormalizer`]:
//! - external arguments are canonicalized to absolute form
//! - stored paths are relative to the store's base directory
//! - segment comparison honors the configured [`CaseSensitivity`]
//!
//! Paths are UTF-8 (`camino`) because they are persisted as SQLite text and
//! written line-by-line to the tag producer.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use std::path::Path;

use crate::error::PathError;

/// Whether the indexed file system compares names case-sensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseSensitivity {
    Sensitive,
    Insensitive,
}

impl CaseSensitivity {
    /// Platform default: insensitive on Windows and macOS, sensitive elsewhere.
    pub fn platform_default() -> Self {
        if cfg!(any(windows, target_os = "macos")) {
            CaseSensitivity::Insensitive
        } else {
            CaseSensitivity::Sensitive
        }
    }

    pub fn from_flag(sensitive: bool) -> Self {
        if sensitive {
            CaseSensitivity::Sensitive
        } else {
            CaseSensitivity::Insensitive
        }
    }

    /// Compare two path segments.
    pub fn segments_equal(self, a: &str, b: &str) -> bool {
        match self {
            CaseSensitivity::Sensitive => a == b,
            CaseSensitivity::Insensitive => {
                a.len() == b.len() && a.eq_ignore_ascii_case(b)
                    || a.to_lowercase() == b.to_lowercase()
            }
        }
    }
}

impl Default for CaseSensitivity {
    fn default() -> Self {
        Self::platform_default()
    }
}

/// Canonicalizes and relativizes paths against a base directory.
///
/// Holds no state besides the case-sensitivity value, so it is `Copy` and is
/// handed to every component that compares paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathNormalizer {
    case: CaseSensitivity,
}

impl PathNormalizer {
    pub fn new(case: CaseSensitivity) -> Self {
        Self { case }
    }

    pub fn case(&self) -> CaseSensitivity {
        self.case
    }

    /// Convert `path` to a canonical absolute path.
    ///
    /// Relative paths are joined with `base` first. `.`, `..` and symlinks are
    /// resolved through the file system, so the path must exist.
    ///
    /// # Errors
    /// - [`PathError::Unresolvable`] when the path does not exist or cannot be accessed
    /// - [`PathError::NotUtf8`] when the canonical path is not valid UTF-8
    pub fn to_absolute(&self, base: &Path, path: &Path) -> Result<Utf8PathBuf, PathError> {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        };

        let canonical = std::fs::canonicalize(&joined)
            .map_err(|_| PathError::Unresolvable(joined.to_string_lossy().to_string()))?;

        Utf8PathBuf::from_path_buf(canonical)
            .map_err(|p| PathError::NotUtf8(p.to_string_lossy().to_string()))
    }

    /// Canonicalize when possible, otherwise normalize lexically.
    ///
    /// Used where the target may already be gone from disk (deleting the row
    /// of a vanished file). Lexical normalization drops `.` and folds `..`
    /// without consulting the file system.
    pub fn resolve_lenient(&self, base: &Path, path: &Path) -> Result<Utf8PathBuf, PathError> {
        match self.to_absolute(base, path) {
            Ok(resolved) => Ok(resolved),
            Err(PathError::Unresolvable(_)) => {
                let base = to_utf8(base)?;
                let path = to_utf8(path)?;
                Ok(join_lexically(base, path))
            }
            Err(e) => Err(e),
        }
    }

    /// Express `path` relative to `base`.
    ///
    /// Walks the longest common prefix segment by segment (a mismatch in the
    /// middle of a segment never counts as shared), emits one `..` for every
    /// base segment beyond that prefix and appends the rest of `path`.
    ///
    /// When the two paths share nothing but the root, `path` is returned
    /// unchanged. `path == base` yields `.`.
    pub fn to_relative(&self, base: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
        let base_parts: Vec<Utf8Component<'_>> = base.components().collect();
        let path_parts: Vec<Utf8Component<'_>> = path.components().collect();

        let common = base_parts
            .iter()
            .zip(path_parts.iter())
            .take_while(|(a, b)| self.components_equal(a, b))
            .count();

        let shared_segments = base_parts[..common]
            .iter()
            .filter(|c| matches!(c, Utf8Component::Normal(_)))
            .count();
        if shared_segments == 0 {
            return path.to_path_buf();
        }

        let mut relative = Utf8PathBuf::new();
        for _ in common..base_parts.len() {
            relative.push("..");
        }
        for part in &path_parts[common..] {
            relative.push(part.as_str());
        }

        if relative.as_str().is_empty() {
            relative.push(".");
        }
        relative
    }

    fn components_equal(&self, a: &Utf8Component<'_>, b: &Utf8Component<'_>) -> bool {
        match (a, b) {
            (Utf8Component::Normal(a), Utf8Component::Normal(b)) => self.case.segments_equal(a, b),
            // Drive prefixes are case-insensitive on every platform that has them
            (Utf8Component::Prefix(a), Utf8Component::Prefix(b)) => {
                a.as_str().eq_ignore_ascii_case(b.as_str())
            }
            _ => a == b,
        }
    }
}

/// Join a stored relative path onto `base` and normalize it lexically.
///
/// Never touches the file system. Absolute `relative` inputs replace `base`
/// (stored paths outside the base are kept absolute).
pub fn join_lexically(base: &Utf8Path, relative: &Utf8Path) -> Utf8PathBuf {
    let joined = base.join(relative);
    let mut normalized: Vec<Utf8Component<'_>> = Vec::new();

    for component in joined.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => match normalized.last() {
                Some(Utf8Component::Normal(_)) => {
                    normalized.pop();
                }
                // `/..` is `/`
                Some(Utf8Component::RootDir) | Some(Utf8Component::Prefix(_)) => {}
                _ => normalized.push(component),
            },
            other => normalized.push(other),
        }
    }

    let mut out = Utf8PathBuf::new();
    for component in normalized {
        out.push(component.as_str());
    }
    if out.as_str().is_empty() {
        out.push(".");
    }
    out
}

/// Backslash-escape backslashes and whitespace for whitespace-delimited output.
pub fn escape_for_display(path: &str) -> String {
    let mut escaped = String::with_capacity(path.len() + 8);
    for ch in path.chars() {
        // C `isspace` set, including vertical tab
        if ch == '\\' || matches!(ch, ' ' | '\t' | '\n' | '\x0B' | '\x0C' | '\r') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Borrow a `Path` as UTF-8.
pub fn to_utf8(path: &Path) -> Result<&Utf8Path, PathError> {
    Utf8Path::from_path(path).ok_or_else(|| PathError::NotUtf8(path.to_string_lossy().to_string()))
}

/// Reject paths that cannot travel over the newline-delimited producer channel.
pub fn ensure_single_line(path: &Utf8Path) -> Result<(), PathError> {
    if path.as_str().contains(['\n', '\r']) {
        return Err(PathError::LineBreak(path.to_string()));
    }
    Ok(())
}
