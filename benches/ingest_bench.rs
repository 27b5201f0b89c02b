//! Ingestion and query benchmarks.
//!
//! Run with: cargo bench --bench ingest_bench

mod harness;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use symdex::{Query, QueryMode, RegexSyntax, SyncMode, SyncOptions, Synchronizer};

use harness::{make_project, open_store, SyntheticChannel};

fn benchmark_full_sync(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_sync");

    for file_count in [10usize, 100] {
        let (_dir, root, _files) = make_project(file_count);
        group.bench_with_input(BenchmarkId::from_parameter(file_count), &file_count, |b, _| {
            b.iter(|| {
                let store = open_store(&root);
                let channel = SyntheticChannel { tags_per_file: 50 };
                let mut synchronizer = Synchronizer::new(&store, channel, SyncOptions::default());
                black_box(synchronizer.run(&[&root]).unwrap());
            })
        });
    }

    group.finish();
}

fn benchmark_incremental_noop(c: &mut Criterion) {
    let (_dir, root, _files) = make_project(100);
    let store = open_store(&root);
    let mut synchronizer = Synchronizer::new(
        &store,
        SyntheticChannel { tags_per_file: 50 },
        SyncOptions::default(),
    );
    synchronizer.run(&[&root]).unwrap();

    let options = SyncOptions {
        mode: SyncMode::Incremental,
        ..SyncOptions::default()
    };
    c.bench_function("incremental_unchanged_100_files", |b| {
        b.iter(|| {
            let mut synchronizer =
                Synchronizer::new(&store, SyntheticChannel { tags_per_file: 50 }, options);
            black_box(synchronizer.run(&[&root]).unwrap());
        })
    });
}

fn benchmark_queries(c: &mut Criterion) {
    let (_dir, root, _files) = make_project(100);
    let store = open_store(&root);
    let mut synchronizer = Synchronizer::new(
        &store,
        SyntheticChannel { tags_per_file: 50 },
        SyncOptions::default(),
    );
    synchronizer.run(&[&root]).unwrap();

    let mut group = c.benchmark_group("query");
    group.bench_function("definition_exact", |b| {
        b.iter(|| black_box(store.query(Query::Definition, "mod_42_fn_7", QueryMode::globbing()).unwrap()))
    });
    group.bench_function("symbol_regex", |b| {
        let mode = QueryMode::globbing().with_regex(RegexSyntax::Basic);
        b.iter(|| black_box(store.query(Query::Symbol, "^mod_4.*_fn_1$", mode).unwrap()))
    });
    group.bench_function("caller_range", |b| {
        b.iter(|| black_box(store.query(Query::Caller, "mod_7_fn_2", QueryMode::globbing()).unwrap()))
    });
    group.bench_function("find_path_glob", |b| {
        b.iter(|| black_box(store.find_paths("src/mod_1*.c", QueryMode::globbing()).unwrap()))
    });
    group.finish();
}

criterion_group!(
    benches,
    benchmark_full_sync,
    benchmark_incremental_noop,
    benchmark_queries
);
criterion_main!(benches);
