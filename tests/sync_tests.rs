//! Integration tests for the synchronization engine.
//!
//! A scripted in-process channel stands in for ctags so every scenario is
//! deterministic.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use camino::Utf8Path;
use symdex::diagnostics::{SkipReason, SyncDiagnostic};
use symdex::ingest::{FieldKey, TagFields, TagGroup};
use symdex::{
    CaseSensitivity, IndexError, Query, QueryMode, SymbolStore, SyncMode, SyncOptions, Synchronizer,
    TagChannel,
};
use tempfile::TempDir;

enum Reply {
    Tags(Vec<TagFields>),
    Truncated,
}

/// Answers by file name; unknown files get one definition named after the stem.
#[derive(Default)]
struct ScriptedChannel {
    replies: HashMap<String, Reply>,
    requests: Vec<String>,
}

impl ScriptedChannel {
    fn reply(mut self, file_name: &str, reply: Reply) -> Self {
        self.replies.insert(file_name.to_string(), reply);
        self
    }
}

impl TagChannel for ScriptedChannel {
    fn request(&mut self, path: &Utf8Path) -> symdex::Result<TagGroup> {
        let name = path.file_name().unwrap_or_default().to_string();
        self.requests.push(name.clone());
        match self.replies.get(&name) {
            Some(Reply::Tags(tags)) => Ok(TagGroup::complete(tags.clone())),
            Some(Reply::Truncated) => Ok(TagGroup {
                records: vec![tag("partial", "D", 1)],
                complete: false,
            }),
            None => {
                let stem = path.file_stem().unwrap_or_default();
                Ok(TagGroup::complete(vec![tag(stem, "D", 1)]))
            }
        }
    }
}

fn tag(name: &str, mark: &str, line: i64) -> TagFields {
    TagFields::new()
        .with_text(FieldKey::Mark, mark)
        .with_text(FieldKey::Name, name)
        .with_text(FieldKey::Pattern, &format!("/^{}$/", name))
        .with_text(FieldKey::Compact, name)
        .with_int(FieldKey::Line, line)
        .with_text(FieldKey::Kind, "function")
}

fn project(files: &[&str]) -> (TempDir, PathBuf, SymbolStore) {
    let temp_dir = TempDir::new().unwrap();
    let root = fs::canonicalize(temp_dir.path()).unwrap();
    for f in files {
        let p = root.join(f);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(&p, format!("// {}\n", f)).unwrap();
    }
    let store = SymbolStore::open_in_memory(&root, CaseSensitivity::Sensitive).unwrap();
    (temp_dir, root, store)
}

fn names(store: &SymbolStore) -> Vec<String> {
    store
        .query_filter("1 = 1", QueryMode::plain())
        .unwrap()
        .into_iter()
        .map(|row| row.name)
        .collect()
}

fn sync<P: AsRef<Path>>(
    store: &SymbolStore,
    channel: ScriptedChannel,
    options: SyncOptions,
    roots: &[P],
) -> (symdex::Result<symdex::SyncReport>, ScriptedChannel) {
    let mut synchronizer = Synchronizer::new(store, channel, options);
    let result = synchronizer.run(roots);
    (result, synchronizer.into_channel())
}

#[test]
fn test_full_sync_is_idempotent() {
    let (_dir, root, store) = project(&["a.c", "b.c"]);

    let (first, _) = sync(&store, ScriptedChannel::default(), SyncOptions::default(), &[&root]);
    let first = first.unwrap();
    assert_eq!(first.indexed, 2);
    assert_eq!(first.tags, 2);
    let before = names(&store);

    let (second, _) = sync(&store, ScriptedChannel::default(), SyncOptions::default(), &[&root]);
    assert_eq!(second.unwrap().indexed, 2);
    assert_eq!(names(&store), before);
    assert_eq!(store.count_files().unwrap(), 2);
    assert_eq!(store.count_tags().unwrap(), 2);
}

#[test]
fn test_reindex_replaces_previous_tags() {
    let (_dir, root, store) = project(&["a.c"]);
    let file = root.join("a.c");

    sync(&store, ScriptedChannel::default(), SyncOptions::default(), &[&file]).0.unwrap();
    assert_eq!(names(&store), vec!["a"]);

    let channel = ScriptedChannel::default().reply(
        "a.c",
        Reply::Tags(vec![tag("bar", "D", 2), tag("baz", "R", 3)]),
    );
    sync(&store, channel, SyncOptions::default(), &[&file]).0.unwrap();
    assert_eq!(names(&store), vec!["bar", "baz"]);
}

#[test]
fn test_zero_tags_keeps_previous_state() {
    let (_dir, root, store) = project(&["a.c"]);
    let file = root.join("a.c");

    sync(&store, ScriptedChannel::default(), SyncOptions::default(), &[&file]).0.unwrap();
    let record = store.get_file(&file).unwrap().unwrap();

    let channel = ScriptedChannel::default().reply("a.c", Reply::Tags(Vec::new()));
    let report = sync(&store, channel, SyncOptions::default(), &[&file]).0.unwrap();

    assert_eq!(report.rolled_back, 1);
    assert_eq!(report.indexed, 0);
    assert_eq!(names(&store), vec!["a"]);
    assert_eq!(store.get_file(&file).unwrap().unwrap(), record);
}

#[test]
fn test_new_file_without_tags_is_not_stored() {
    let (_dir, root, store) = project(&["empty.txt"]);
    let channel = ScriptedChannel::default().reply("empty.txt", Reply::Tags(Vec::new()));

    let report = sync(&store, channel, SyncOptions::default(), &[&root]).0.unwrap();
    assert_eq!(report.rolled_back, 1);
    assert!(store.get_file(&root.join("empty.txt")).unwrap().is_none());
}

#[test]
fn test_incremental_skips_unchanged_files() {
    let (_dir, root, store) = project(&["a.c", "b.c"]);
    sync(&store, ScriptedChannel::default(), SyncOptions::default(), &[&root]).0.unwrap();
    let before = store.files().unwrap();
    let tags_before = store.count_tags().unwrap();
    assert_eq!(before.len(), 2);
    assert_eq!(tags_before, 2);

    let options = SyncOptions {
        mode: SyncMode::Incremental,
        ..SyncOptions::default()
    };
    let (report, channel) = sync(&store, ScriptedChannel::default(), options, &[&root]);
    let report = report.unwrap();

    assert_eq!(report.unchanged, 2);
    assert_eq!(report.indexed, 0);
    assert!(channel.requests.is_empty());

    // Same rows, not a delete and re-insert
    assert_eq!(store.files().unwrap(), before);
    assert_eq!(store.count_tags().unwrap(), tags_before);
    assert_eq!(names(&store), vec!["a", "b"]);
}

#[test]
fn test_incremental_reindexes_changed_size() {
    let (_dir, root, store) = project(&["a.c"]);
    let file = root.join("a.c");
    sync(&store, ScriptedChannel::default(), SyncOptions::default(), &[&file]).0.unwrap();

    fs::write(&file, "// a.c grew a few bytes\n").unwrap();
    let options = SyncOptions {
        mode: SyncMode::Incremental,
        ..SyncOptions::default()
    };
    let (report, channel) = sync(&store, ScriptedChannel::default(), options, &[&file]);
    assert_eq!(report.unwrap().indexed, 1);
    assert_eq!(channel.requests, vec!["a.c"]);
}

#[test]
fn test_sweep_removes_deleted_files() {
    let (_dir, root, store) = project(&["foo.c", "keep.c"]);
    sync(&store, ScriptedChannel::default(), SyncOptions::default(), &[&root]).0.unwrap();

    let hits = store.query(Query::Definition, "foo", QueryMode::plain()).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(Path::new(&hits[0].path), root.join("foo.c"));

    fs::remove_file(root.join("foo.c")).unwrap();
    let no_roots: [&Path; 0] = [];
    let (report, channel) = sync(&store, ScriptedChannel::default(), SyncOptions::default(), &no_roots);

    assert_eq!(report.unwrap().deleted, 1);
    assert!(channel.requests.is_empty());
    assert!(store.query(Query::Definition, "foo", QueryMode::plain()).unwrap().is_empty());
    assert_eq!(names(&store), vec!["keep"]);
}

#[test]
fn test_sweep_removes_file_replaced_by_directory() {
    let (_dir, root, store) = project(&["gone.c", "keep.c"]);
    sync(&store, ScriptedChannel::default(), SyncOptions::default(), &[&root]).0.unwrap();
    assert_eq!(names(&store), vec!["gone", "keep"]);

    let gone = root.join("gone.c");
    fs::remove_file(&gone).unwrap();
    fs::create_dir(&gone).unwrap();
    fs::write(gone.join("inner.txt"), "x").unwrap();

    let no_roots: [&Path; 0] = [];
    let report = sync(&store, ScriptedChannel::default(), SyncOptions::default(), &no_roots)
        .0
        .unwrap();

    assert_eq!(report.deleted, 1);
    assert!(store.get_file(&gone).unwrap().is_none());
    assert_eq!(store.count_files().unwrap(), 1);
    assert_eq!(names(&store), vec!["keep"]);
    assert!(store
        .query(Query::Definition, "gone", QueryMode::plain())
        .unwrap()
        .is_empty());
}

#[test]
fn test_sweep_disabled_keeps_rows() {
    let (_dir, root, store) = project(&["foo.c"]);
    sync(&store, ScriptedChannel::default(), SyncOptions::default(), &[&root]).0.unwrap();
    fs::remove_file(root.join("foo.c")).unwrap();

    let options = SyncOptions {
        sweep: false,
        ..SyncOptions::default()
    };
    let no_roots: [&Path; 0] = [];
    let report = sync(&store, ScriptedChannel::default(), options, &no_roots).0.unwrap();
    assert_eq!(report.deleted, 0);
    assert_eq!(store.count_files().unwrap(), 1);
}

#[test]
fn test_truncated_group_aborts_and_keeps_committed_files() {
    let (_dir, root, store) = project(&["a.c", "b.c", "c.c"]);
    let channel = ScriptedChannel::default().reply("b.c", Reply::Truncated);

    let roots = [root.join("a.c"), root.join("b.c"), root.join("c.c")];
    let mut synchronizer = Synchronizer::new(&store, channel, SyncOptions::default());
    let result = synchronizer.run(&roots);

    match result {
        Err(e @ IndexError::ProducerChannel(_)) => assert!(e.is_fatal()),
        other => panic!("expected producer channel error, got {:?}", other),
    }
    assert_eq!(names(&store), vec!["a"]);
    assert!(store.get_file(&roots[1]).unwrap().is_none());
    assert_eq!(synchronizer.into_channel().requests, vec!["a.c", "b.c"]);
}

#[test]
fn test_records_missing_required_fields_are_dropped() {
    let (_dir, root, store) = project(&["a.c"]);
    let broken = TagFields::new().with_text(FieldKey::Name, "nameonly");
    let channel = ScriptedChannel::default().reply(
        "a.c",
        Reply::Tags(vec![broken, tag("good", "D", 1)]),
    );

    let report = sync(&store, channel, SyncOptions::default(), &[&root]).0.unwrap();
    assert_eq!(report.rejected_records, 1);
    assert_eq!(report.tags, 1);
    assert_eq!(names(&store), vec!["good"]);
}

#[test]
fn test_directory_roots_respect_recursion() {
    let (_dir, root, store) = project(&["top.c", "sub/deep.c"]);

    let report = sync(&store, ScriptedChannel::default(), SyncOptions::default(), &[&root])
        .0
        .unwrap();
    assert_eq!(report.indexed, 1);
    assert_eq!(names(&store), vec!["top"]);

    let options = SyncOptions {
        recursive: true,
        ..SyncOptions::default()
    };
    let report = sync(&store, ScriptedChannel::default(), options, &[&root]).0.unwrap();
    assert_eq!(report.indexed, 2);
    assert_eq!(names(&store), vec!["deep", "top"]);
}

#[test]
fn test_missing_root_is_skipped() {
    let (_dir, root, store) = project(&[]);
    let report = sync(
        &store,
        ScriptedChannel::default(),
        SyncOptions::default(),
        &[&root.join("ghost.c")],
    )
    .0
    .unwrap();

    assert_eq!(report.skipped, 1);
    assert!(matches!(
        &report.diagnostics[0],
        SyncDiagnostic::Skipped { reason: SkipReason::Unresolvable, .. }
    ));
}

#[test]
#[cfg(unix)]
fn test_symlinks_inside_directories_are_skipped() {
    let (_dir, root, store) = project(&["real.c"]);
    std::os::unix::fs::symlink(root.join("real.c"), root.join("link.c")).unwrap();

    let (report, channel) = sync(&store, ScriptedChannel::default(), SyncOptions::default(), &[&root]);
    let report = report.unwrap();

    assert_eq!(report.indexed, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(channel.requests, vec!["real.c"]);
    assert!(report
        .diagnostics
        .iter()
        .any(|d| matches!(d, SyncDiagnostic::Skipped { reason: SkipReason::Symlink, .. })));
}
