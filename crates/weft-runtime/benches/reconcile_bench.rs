//! Benchmarks for keyed list reconciliation.
//!
//! Run with: cargo bench -p weft-runtime

use std::hint::black_box;
use std::rc::Rc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use weft_core::RenderSurface;
use weft_core::testing::RecordingSurface;
use weft_runtime::list::plan_keyed;
use weft_runtime::{Host, KeyedList, Runtime, RuntimeConfig, StandardHost, Value, mount};

/// Deterministic shuffle (xorshift) so runs are comparable.
fn shuffled(n: usize, seed: u64) -> Vec<u32> {
    let mut keys: Vec<u32> = (0..n as u32).collect();
    let mut state = seed | 1;
    for i in (1..keys.len()).rev() {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        keys.swap(i, (state % (i as u64 + 1)) as usize);
    }
    keys
}

fn list_of(keys: &[u32]) -> KeyedList {
    KeyedList::from_items(keys.iter().copied(), |k| *k, |k| Value::from(*k))
}

fn bench_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile/plan");
    for n in [10, 100, 1_000, 10_000] {
        let old: Vec<u32> = (0..n as u32).collect();
        let new = shuffled(n, 0x9e37_79b9);
        group.bench_with_input(BenchmarkId::new("shuffle", n), &(old, new), |b, (old, new)| {
            b.iter(|| black_box(plan_keyed(old, new)))
        });
    }
    group.finish();
}

fn bench_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile/commit");
    for n in [10, 100, 1_000] {
        let surface = RecordingSurface::new();
        let container = surface.create_element("ul");
        let config = RuntimeConfig::default();
        let host = Rc::new(StandardHost::new(Rc::new(surface.clone()), config.clone()));
        let runtime = Runtime::new(&config, Rc::clone(&host) as Rc<dyn Host>);
        let ordered: Vec<u32> = (0..n as u32).collect();
        let reordered = shuffled(n, 42);
        let root = mount(&runtime, list_of(&ordered), container);
        host.run_until_idle();

        let mut flip = false;
        group.bench_function(BenchmarkId::new("shuffle", n), |b| {
            b.iter(|| {
                flip = !flip;
                let keys = if flip { &reordered } else { &ordered };
                let _ = root.update(list_of(keys));
                host.run_until_idle();
                surface.clear_ops();
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_plan, bench_commit);
criterion_main!(benches);
