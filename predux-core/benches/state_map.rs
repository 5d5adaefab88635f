//! Benchmarks for state-map evaluation and reducer commits.
//!
//! Run with: cargo bench -p predux-core

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

use indexmap::IndexMap;
use predux_core::select::{ChangeFlags, EvaluationPlan, Selector, StateMap};
use predux_core::store::Store;

#[derive(Debug, Clone)]
struct Grid {
    cells: Vec<u64>,
}

fn grid(len: usize) -> Store<Grid> {
    Store::new(Grid {
        cells: (0..len as u64).collect(),
    })
}

/// Half the entries props-aware, half state-only.
fn plan(entries: usize) -> EvaluationPlan<Grid, usize, u64> {
    let mut map = StateMap::new();
    for i in 0..entries {
        if i % 2 == 0 {
            map.insert(
                format!("cell{i}"),
                Selector::props(move |g: &Grid, at: &usize| g.cells[(i + at) % g.cells.len()]),
            );
        } else {
            map.insert(
                format!("sum{i}"),
                Selector::state(move |g: &Grid| g.cells.iter().take(i).sum()),
            );
        }
    }
    map.compile()
}

// ---------------------------------------------------------------------------
// Evaluation per change flag
// ---------------------------------------------------------------------------

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("state_map/evaluate");
    let store = grid(256);

    for entries in [8, 64] {
        let plan = plan(entries);
        group.throughput(Throughput::Elements(entries as u64));

        for (name, flags) in [
            ("none", ChangeFlags::NONE),
            ("props", ChangeFlags::props()),
            ("state", ChangeFlags::state()),
        ] {
            let mut target: IndexMap<String, u64> = IndexMap::new();
            group.bench_with_input(BenchmarkId::new(name, entries), &flags, |b, flags| {
                b.iter(|| black_box(plan.evaluate(&mut target, &store, &3, *flags)))
            });
        }
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Memoized composite
// ---------------------------------------------------------------------------

fn bench_composite(c: &mut Criterion) {
    let store = grid(1_024);
    let plan: EvaluationPlan<Grid, usize, u64> = StateMap::new()
        .with(
            "total",
            Selector::composite(
                vec![
                    Selector::state(|g: &Grid| g.cells.len() as u64),
                    Selector::props(|_: &Grid, at: &usize| *at as u64),
                ],
                |inputs: &[u64]| (0..inputs[0]).map(|n| n * inputs[1]).sum(),
            ),
        )
        .compile();

    c.bench_function("state_map/composite_hit", |b| {
        let mut target: IndexMap<String, u64> = IndexMap::new();
        b.iter(|| plan.evaluate(&mut target, &store, black_box(&7), ChangeFlags::state()))
    });
}

// ---------------------------------------------------------------------------
// Reducer commit
// ---------------------------------------------------------------------------

fn bench_commit(c: &mut Criterion) {
    let store = Store::new(0_u64);
    let increment = store
        .reducer("increment", |n: &u64, (): ()| n.wrapping_add(1))
        .expect("reducer registers");
    store.state_changed().on(|_| {});

    c.bench_function("store/commit", |b| {
        b.iter(|| black_box(increment.call(()).expect("commit succeeds")))
    });
}

criterion_group!(benches, bench_evaluate, bench_composite, bench_commit);
criterion_main!(benches);
