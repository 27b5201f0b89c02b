use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use super::*;
use crate::error::IndexError;
use crate::ingest::{FieldKey, FieldValue, TagFields};

fn tag(name: &str, mark: &str, kind: &str, line: i64) -> TagFields {
    TagFields::new()
        .with_text(FieldKey::Mark, mark)
        .with_text(FieldKey::Name, name)
        .with_text(FieldKey::Pattern, &format!("/^{}$/", name))
        .with_text(FieldKey::Compact, name)
        .with_int(FieldKey::Line, line)
        .with_text(FieldKey::Kind, kind)
}

fn setup(files: &[&str]) -> (TempDir, SymbolStore, Vec<PathBuf>) {
    let temp_dir = TempDir::new().unwrap();
    let root = fs::canonicalize(temp_dir.path()).unwrap();
    let mut paths = Vec::new();
    for f in files {
        let p = root.join(f);
        if let Some(parent) = p.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&p, b"content").unwrap();
        paths.push(p);
    }
    let store = SymbolStore::open_in_memory(&root, CaseSensitivity::Sensitive).unwrap();
    (temp_dir, store, paths)
}

#[test]
fn test_open_rejects_missing_base() {
    let temp_dir = TempDir::new().unwrap();
    let result = SymbolStore::open_in_memory(&temp_dir.path().join("nope"), CaseSensitivity::Sensitive);
    assert!(matches!(result, Err(IndexError::StoreOpen { .. })));
}

#[test]
fn test_paths_are_stored_relative_to_base() {
    let (_dir, store, paths) = setup(&["src/a.c"]);
    store.set_file(&paths[0], 7, 100).unwrap();

    let stored: String = store
        .conn
        .query_row("SELECT path FROM file", [], |row| row.get(0))
        .unwrap();
    assert_eq!(stored, "src/a.c");

    let record = store.get_file(&paths[0]).unwrap().unwrap();
    assert_eq!(Path::new(&record.path), paths[0].as_path());
    assert_eq!(record.size, 7);
    assert_eq!(record.mtime, 100);
}

#[test]
fn test_set_file_replaces_row_and_cascades() {
    let (_dir, store, paths) = setup(&["a.c"]);
    let first = store.set_file(&paths[0], 1, 1).unwrap();
    store.add_tag(first, &tag("foo", "D", "function", 1)).unwrap();
    store.add_tag(first, &tag("bar", "R", "function", 2)).unwrap();
    assert_eq!(store.count_tags().unwrap(), 2);

    let second = store.set_file(&paths[0], 2, 2).unwrap();
    assert_ne!(first, second);
    assert_eq!(store.count_files().unwrap(), 1);
    assert_eq!(store.count_tags().unwrap(), 0);
}

#[test]
fn test_add_tag_requires_fields() {
    let (_dir, store, paths) = setup(&["a.c"]);
    let fid = store.set_file(&paths[0], 1, 1).unwrap();

    let incomplete = TagFields::new()
        .with_text(FieldKey::Name, "foo")
        .with_int(FieldKey::Line, 1);
    assert!(matches!(store.add_tag(fid, &incomplete), Err(IndexError::Bind(_))));

    let orphan = store.add_tag(fid + 100, &tag("foo", "D", "function", 1));
    assert!(matches!(orphan, Err(IndexError::Bind(_))));
    assert_eq!(store.count_tags().unwrap(), 0);
}

#[test]
fn test_optional_fields_bind_null_and_zero() {
    let (_dir, store, paths) = setup(&["a.c"]);
    let fid = store.set_file(&paths[0], 1, 1).unwrap();
    store.add_tag(fid, &tag("foo", "D", "function", 4)).unwrap();

    let rows = store.tags_in_file(&paths[0]).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].endl, 0);
    assert_eq!(rows[0].signature, None);
    assert_eq!(rows[0].kind.as_deref(), Some("function"));
}

#[test]
fn test_non_utf8_text_is_stored_verbatim() {
    let (_dir, store, paths) = setup(&["latin1.c"]);
    let fid = store.set_file(&paths[0], 1, 1).unwrap();
    let mut fields = tag("cafe", "D", "variable", 1);
    fields.insert(FieldKey::Compact, FieldValue::Bytes(b"char *s = \"caf\xE9\";".to_vec()));
    store.add_tag(fid, &fields).unwrap();

    let (kind, bytes): (String, Vec<u8>) = store
        .conn
        .query_row("SELECT typeof(compact), CAST(compact AS BLOB) FROM tag", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .unwrap();
    assert_eq!(kind, "text");
    assert_eq!(bytes, b"char *s = \"caf\xE9\";".to_vec());

    // Reading for display still works
    let rows = store.tags_in_file(&paths[0]).unwrap();
    assert_eq!(rows[0].compact, "char *s = \"caf\u{FFFD}\";");

    let mode = QueryMode::globbing().with_regex(RegexSyntax::Basic);
    assert_eq!(store.query(Query::Pattern, "caf", mode).unwrap().len(), 1);
}

#[test]
fn test_rollback_restores_prior_rows() {
    let (_dir, store, paths) = setup(&["a.c"]);
    let fid = store.set_file(&paths[0], 1, 1).unwrap();
    store.add_tag(fid, &tag("foo", "D", "function", 1)).unwrap();

    let tx = store.transaction().unwrap();
    let new_fid = store.set_file(&paths[0], 9, 9).unwrap();
    store.add_tag(new_fid, &tag("baz", "D", "function", 1)).unwrap();
    tx.rollback().unwrap();

    let record = store.get_file(&paths[0]).unwrap().unwrap();
    assert_eq!(record.id, fid);
    assert_eq!(record.size, 1);
    let rows = store.tags_in_file(&paths[0]).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "foo");
}

#[test]
fn test_dropped_transaction_rolls_back() {
    let (_dir, store, paths) = setup(&["a.c"]);
    {
        let _tx = store.transaction().unwrap();
        store.set_file(&paths[0], 1, 1).unwrap();
    }
    assert!(store.get_file(&paths[0]).unwrap().is_none());
}

#[test]
fn test_delete_file_not_found() {
    let (_dir, store, paths) = setup(&["a.c"]);
    assert!(matches!(store.delete_file(&paths[0]), Err(IndexError::NotFound(_))));
}

#[test]
fn test_delete_vanished_file() {
    let (_dir, store, paths) = setup(&["a.c"]);
    let fid = store.set_file(&paths[0], 1, 1).unwrap();
    store.add_tag(fid, &tag("foo", "D", "function", 1)).unwrap();
    fs::remove_file(&paths[0]).unwrap();

    store.delete_file(&paths[0]).unwrap();
    assert_eq!(store.count_files().unwrap(), 0);
    assert_eq!(store.count_tags().unwrap(), 0);
}

#[test]
fn test_definition_query_scenario() {
    let (_dir, store, paths) = setup(&["a.c"]);
    let fid = store.set_file(&paths[0], 1, 1).unwrap();
    store.add_tag(fid, &tag("foo", "D", "function", 3)).unwrap();
    store.add_tag(fid, &tag("foo", "R", "function", 9)).unwrap();

    let rows = store
        .query(Query::Definition, "foo", QueryMode::globbing())
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].line, 3);
    assert_eq!(Path::new(&rows[0].path), paths[0].as_path());

    store.delete_file(&paths[0]).unwrap();
    let rows = store
        .query(Query::Definition, "foo", QueryMode::globbing())
        .unwrap();
    assert!(rows.is_empty());
}

#[test]
fn test_glob_versus_plain_path_match() {
    let (_dir, store, paths) = setup(&["foo.h", "bar.h", "baz.c"]);
    for p in &paths {
        store.set_file(p, 1, 1).unwrap();
    }

    let globbed = store.find_paths("*.h", QueryMode::globbing()).unwrap();
    assert_eq!(globbed.len(), 2);

    assert!(store.find_paths("*.h", QueryMode::plain()).unwrap().is_empty());

    let exact = store.find_paths("foo.h", QueryMode::plain()).unwrap();
    assert_eq!(exact.len(), 1);
    assert!(exact[0].ends_with("foo.h"));
}

#[test]
fn test_mode_change_reevaluates_cached_statement() {
    let (_dir, store, paths) = setup(&["a.c"]);
    let fid = store.set_file(&paths[0], 1, 1).unwrap();
    store.add_tag(fid, &tag("x_init", "D", "function", 1)).unwrap();

    let regex = QueryMode::globbing().with_regex(RegexSyntax::Basic);
    for _ in 0..2 {
        assert_eq!(store.query(Query::Symbol, "x_.*", regex).unwrap().len(), 1);
        assert!(store
            .query(Query::Symbol, "x_.*", QueryMode::globbing())
            .unwrap()
            .is_empty());
    }

    for _ in 0..2 {
        assert_eq!(store.find_paths("*.c", QueryMode::globbing()).unwrap().len(), 1);
        assert!(store.find_paths("*.c", QueryMode::plain()).unwrap().is_empty());
    }
}

#[test]
fn test_query_results_are_sorted() {
    let (_dir, store, paths) = setup(&["a.c"]);
    let fid = store.set_file(&paths[0], 1, 1).unwrap();
    store.add_tag(fid, &tag("zeta", "D", "variable", 1)).unwrap();
    store.add_tag(fid, &tag("alpha", "D", "variable", 9)).unwrap();
    store.add_tag(fid, &tag("alpha", "D", "function", 2)).unwrap();

    let mode = QueryMode::globbing().with_regex(RegexSyntax::Basic);
    let rows = store.query(Query::Symbol, ".", mode).unwrap();
    let order: Vec<(&str, i64)> = rows.iter().map(|r| (r.name.as_str(), r.line)).collect();
    assert_eq!(order, vec![("alpha", 2), ("alpha", 9), ("zeta", 1)]);
}

#[test]
fn test_caller_query_uses_function_range() {
    let (_dir, store, paths) = setup(&["a.c", "b.c"]);
    let a = store.set_file(&paths[0], 1, 1).unwrap();
    store
        .add_tag(a, &tag("main", "D", "function", 10).with_int(FieldKey::Endl, 20))
        .unwrap();
    store.add_tag(a, &tag("helper", "R", "function", 15)).unwrap();
    store.add_tag(a, &tag("outside", "R", "function", 30)).unwrap();
    let b = store.set_file(&paths[1], 1, 1).unwrap();
    store.add_tag(b, &tag("other", "R", "function", 12)).unwrap();

    let rows = store.query(Query::Caller, "main", QueryMode::plain()).unwrap();
    let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["helper", "main"]);
}

#[test]
fn test_kind_filtered_queries() {
    let (_dir, store, paths) = setup(&["a.c"]);
    let fid = store.set_file(&paths[0], 1, 1).unwrap();
    store.add_tag(fid, &tag("stdio.h", "R", "header", 1)).unwrap();
    store.add_tag(fid, &tag("x", "D", "variable", 2)).unwrap();
    store.add_tag(fid, &tag("hello", "R", "string", 3)).unwrap();

    let mode = QueryMode::plain();
    assert_eq!(store.query(Query::Include, "stdio.h", mode).unwrap().len(), 1);
    assert_eq!(store.query(Query::Assign, "x", mode).unwrap().len(), 1);
    assert_eq!(store.query(Query::String, "hello", mode).unwrap().len(), 1);
    assert_eq!(store.query(Query::Reference, "x", mode).unwrap().len(), 0);
}

#[test]
fn test_in_file_and_raw_filter() {
    let (_dir, store, paths) = setup(&["src/a.c", "lib/b.c"]);
    for p in &paths {
        let fid = store.set_file(p, 1, 1).unwrap();
        store.add_tag(fid, &tag("f", "D", "function", 1)).unwrap();
    }

    let rows = store.query(Query::InFile, "src/*", QueryMode::globbing()).unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].path.ends_with("src/a.c"));

    let mode = QueryMode::globbing().with_regex(RegexSyntax::Extended);
    let rows = store
        .query_filter("tag.kind = 'function' AND file.path REGEXP '^lib/'", mode)
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].path.ends_with("lib/b.c"));
}

#[test]
fn test_case_insensitive_lookup() {
    let temp_dir = TempDir::new().unwrap();
    let root = fs::canonicalize(temp_dir.path()).unwrap();
    fs::write(root.join("Main.c"), b"x").unwrap();
    let store = SymbolStore::open_in_memory(&root, CaseSensitivity::Insensitive).unwrap();
    store.set_file(&root.join("Main.c"), 1, 1).unwrap();

    store
        .conn
        .execute("UPDATE file SET path = 'MAIN.C'", [])
        .unwrap();
    assert!(store.get_file(&root.join("Main.c")).unwrap().is_some());
}
