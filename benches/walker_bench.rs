//! Benchmarks for parfs
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::fs;
use std::path::Path;

fn build_tree(root: &Path, fanout: usize, depth: usize) {
    if depth == 0 {
        return;
    }
    for i in 0..fanout {
        let sub = root.join(format!("d{}", i));
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join("f"), b"x").unwrap();
        build_tree(&sub, fanout, depth - 1);
    }
}

fn benchmark_bottom_up_walk(c: &mut Criterion) {
    use parfs::walker::BottomUpDirs;

    let dir = tempfile::tempdir().unwrap();
    build_tree(dir.path(), 6, 4);

    c.bench_function("bottom_up_walk_fanout6_depth4", |b| {
        b.iter(|| {
            let count = BottomUpDirs::new(dir.path())
                .filter_map(Result::ok)
                .count();
            black_box(count);
        })
    });
}

fn benchmark_dir_ownership(c: &mut Criterion) {
    use parfs::partition::{DirOwnership, RoundRobin};
    use std::path::PathBuf;

    c.bench_function("dir_ownership_10k_entries", |b| {
        b.iter(|| {
            let mut ownership = DirOwnership::new(3, 16);
            let owned = (0..10_000).filter(|_| ownership.next_dir()).count();
            black_box(owned);
        })
    });

    c.bench_function("round_robin_10k_assignments", |b| {
        b.iter(|| {
            let mut dealer = RoundRobin::new(16);
            let sum: usize = (0..10_000).map(|_| dealer.assign()).sum();
            black_box(sum);
        })
    });

    let parents: Vec<PathBuf> = (0..1_000)
        .map(|i| PathBuf::from(format!("src/module{}/nested", i)))
        .collect();
    c.bench_function("orphan_owner_1k_paths", |b| {
        let ownership = DirOwnership::new(0, 16);
        b.iter(|| {
            for parent in &parents {
                black_box(ownership.orphan_owner(parent));
            }
        })
    });
}

criterion_group!(benches, benchmark_bottom_up_walk, benchmark_dir_ownership);
criterion_main!(benches);
