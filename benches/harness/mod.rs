//! Benchmark harness for ingestion and query throughput
//!
//! Builds a temporary project and an in-process tag channel so benchmarks
//! measure the store and synchronizer without a ctags process.

use std::fs;
use std::path::PathBuf;

use camino::Utf8Path;
use symdex::ingest::{FieldKey, TagFields, TagGroup};
use symdex::{CaseSensitivity, SymbolStore, TagChannel};
use tempfile::TempDir;

/// Answers every request with `tags_per_file` synthetic function tags.
pub struct SyntheticChannel {
    pub tags_per_file: usize,
}

impl TagChannel for SyntheticChannel {
    fn request(&mut self, path: &Utf8Path) -> symdex::Result<TagGroup> {
        let stem = path.file_stem().unwrap_or("file");
        let records = (0..self.tags_per_file)
            .map(|i| {
                let name = format!("{}_fn_{}", stem, i);
                let line = (i * 10 + 1) as i64;
                TagFields::new()
                    .with_text(FieldKey::Mark, if i % 3 == 0 { "R" } else { "D" })
                    .with_text(FieldKey::Name, &name)
                    .with_text(FieldKey::Pattern, &format!("/^void {}(void)$/", name))
                    .with_text(FieldKey::Compact, &format!("void {}(void)", name))
                    .with_int(FieldKey::Line, line)
                    .with_int(FieldKey::Endl, line + 8)
                    .with_text(FieldKey::Kind, "function")
                    .with_text(FieldKey::Language, "C")
            })
            .collect();
        Ok(TagGroup::complete(records))
    }
}

/// Create `file_count` source files under a fresh temporary root
///
/// # Returns
/// Tuple of (TempDir, canonical root, file paths). The TempDir keeps the
/// files alive.
pub fn make_project(file_count: usize) -> (TempDir, PathBuf, Vec<PathBuf>) {
    let temp_dir = TempDir::new().unwrap();
    let root = fs::canonicalize(temp_dir.path()).unwrap();
    let files = (0..file_count)
        .map(|i| {
            let path = root.join(format!("src/mod_{}.c", i));
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, format!("void mod_{}_fn_0(void) {{}}\n", i)).unwrap();
            path
        })
        .collect();
    (temp_dir, root, files)
}

pub fn open_store(root: &std::path::Path) -> SymbolStore {
    SymbolStore::open_in_memory(root, CaseSensitivity::Sensitive).unwrap()
}
