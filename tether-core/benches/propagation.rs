//! Benchmarks for change propagation through signals and stores.

use std::hint::black_box;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use tether_core::reactive::Signal;
use tether_core::store::Store;

fn signal_set_with_effects(c: &mut Criterion) {
    let mut group = c.benchmark_group("signal_set");

    for effects in [1usize, 8, 64] {
        let id = BenchmarkId::from_parameter(effects);
        group.bench_with_input(id, &effects, |b, &effects| {
            let signal = Signal::new(0u64);
            let runs = Arc::new(AtomicUsize::new(0));
            let memos: Vec<_> = (0..effects)
                .map(|i| signal.derive(move |x| x % (i as u64 + 2)))
                .collect();
            for memo in &memos {
                let runs = runs.clone();
                signal.use_effect(
                    move || {
                        runs.fetch_add(1, Ordering::Relaxed);
                    },
                    &[memo.node()],
                );
            }

            let mut next = 0u64;
            b.iter(|| {
                next += 1;
                signal.set(black_box(next));
            });
        });
    }

    group.finish();
}

fn memo_get(c: &mut Criterion) {
    let signal = Signal::new(1u64);
    let squared = signal.derive(|x| x * x);

    c.bench_function("memo_get_clean", |b| b.iter(|| black_box(squared.get())));

    let mut next = 1u64;
    c.bench_function("memo_get_after_set", |b| {
        b.iter(|| {
            next += 1;
            signal.set(next);
            black_box(squared.get())
        })
    });
}

fn store_dispatch(c: &mut Criterion) {
    let store = Store::new(0u64, |count: &u64, by: u64| count + by);
    for _ in 0..16 {
        store.subscribe(|| {});
    }

    c.bench_function("store_dispatch_16_subscribers", |b| {
        b.iter(|| store.dispatch(black_box(1)).unwrap())
    });
}

criterion_group!(benches, signal_set_with_effects, memo_get, store_dispatch);
criterion_main!(benches);
