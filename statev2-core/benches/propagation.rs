//! Benchmarks for statev2-core
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use statev2_core::collections::TrackedList;
use statev2_core::reactive::{Memo, Runtime, State};

// =============================================================================
// STATE BENCHMARKS
// =============================================================================

fn bench_state_set(c: &mut Criterion) {
    let runtime = Runtime::new();
    let s = runtime.mutable_state(0i32);
    let mut i = 0i32;
    c.bench_function("state_set", |b| {
        b.iter(|| {
            i += 1;
            s.set(black_box(i))
        })
    });
}

fn bench_state_set_same_value(c: &mut Criterion) {
    let runtime = Runtime::new();
    let s = runtime.mutable_state(42i32);
    c.bench_function("state_set_same_value", |b| b.iter(|| s.set(black_box(42))));
}

// =============================================================================
// MEMO BENCHMARKS
// =============================================================================

fn bench_memo_get_cached(c: &mut Criterion) {
    let runtime = Runtime::new();
    let s = runtime.mutable_state(42i32);
    let d = runtime.memo(move |obs| s.get(obs) * 2);
    let _ = d.get_untracked();

    c.bench_function("memo_get_cached", |b| b.iter(|| black_box(d.get_untracked())));
}

fn bench_memo_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("memo_chain");

    for depth in [1, 5, 10, 20] {
        group.bench_with_input(BenchmarkId::new("depth", depth), &depth, |b, &depth| {
            let runtime = Runtime::new();
            let s = runtime.mutable_state(1i32);

            let mut current: Memo<i32> = {
                let s = s.clone();
                runtime.memo(move |obs| s.get(obs) + 1)
            };
            for _ in 1..depth {
                let prev = current.clone();
                current = runtime.memo(move |obs| prev.get(obs) + 1);
            }

            let mut i = 0i32;
            b.iter(|| {
                i += 1;
                s.set(black_box(i));
                black_box(current.get_untracked())
            })
        });
    }

    group.finish();
}

// =============================================================================
// EFFECT BENCHMARKS
// =============================================================================

fn bench_effect_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("effect_fan_out");

    for width in [1, 10, 100] {
        group.bench_with_input(BenchmarkId::new("width", width), &width, |b, &width| {
            let runtime = Runtime::new();
            let s = runtime.mutable_state(0i32);
            let _effects: Vec<_> = (0..width)
                .map(|_| {
                    let s = s.clone();
                    runtime.effect(move |obs| {
                        black_box(s.get(obs));
                    })
                })
                .collect();

            let mut i = 0i32;
            b.iter(|| {
                i += 1;
                s.set(black_box(i))
            })
        });
    }

    group.finish();
}

fn bench_diamond(c: &mut Criterion) {
    let runtime = Runtime::new();
    let s = runtime.mutable_state(0i32);
    let left = {
        let s = s.clone();
        runtime.memo(move |obs| s.get(obs) + 1)
    };
    let right = {
        let s = s.clone();
        runtime.memo(move |obs| s.get(obs) + 2)
    };
    let _effect = runtime.effect(move |obs| {
        black_box(left.get(obs) + right.get(obs));
    });

    let mut i = 0i32;
    c.bench_function("diamond", |b| {
        b.iter(|| {
            i += 1;
            s.set(black_box(i))
        })
    });
}

// =============================================================================
// TRACKED LIST BENCHMARKS
// =============================================================================

fn bench_changes_since(c: &mut Criterion) {
    let mut group = c.benchmark_group("changes_since");

    for len in [10usize, 100, 1_000] {
        let old = TrackedList::new((0..len).collect::<Vec<_>>());
        let mut shuffled = old.to_vec();
        shuffled.swap(len / 3, 2 * len / 3);
        shuffled.insert(len / 2, len);
        let new = TrackedList::new(shuffled);

        group.bench_with_input(BenchmarkId::new("estimate", len), &len, |b, _| {
            b.iter(|| black_box(new.changes_since(&old).iter().count()))
        });

        let recorded = old.with_pushed(len);
        group.bench_with_input(BenchmarkId::new("recorded", len), &len, |b, _| {
            b.iter(|| black_box(recorded.changes_since(&old).iter().count()))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_state_set,
    bench_state_set_same_value,
    bench_memo_get_cached,
    bench_memo_chain,
    bench_effect_fan_out,
    bench_diamond,
    bench_changes_since,
);
criterion_main!(benches);
