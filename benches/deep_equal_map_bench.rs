use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use deep_equal_collections::{DeepEqualMap, DeepEqualSet};
use serde_json::{json, Value};

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> Value {
    json!({ "id": format!("k{:016x}", n), "tags": [n % 7, n % 11] })
}

// Every operation is a linear scan, so sizes stay small.
const SIZES: [usize; 3] = [16, 128, 1024];

fn bench_set_fresh(c: &mut Criterion) {
    let mut group = c.benchmark_group("map::set_fresh");
    for n in SIZES {
        let keys: Vec<Value> = lcg(1).take(n).map(key).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &keys, |b, keys| {
            b.iter_batched(
                || keys.clone(),
                |keys| {
                    let mut m = DeepEqualMap::new();
                    for (i, k) in keys.into_iter().enumerate() {
                        m.set(k, i);
                    }
                    black_box(m)
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_get_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("map::get_hit");
    for n in SIZES {
        let m: DeepEqualMap<Value, usize> =
            lcg(2).take(n).enumerate().map(|(i, x)| (key(x), i)).collect();
        // Fresh copies of stored keys, so lookups cannot short-circuit.
        let needles: Vec<Value> = lcg(2).take(n).step_by(n / 16).map(key).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &needles, |b, needles| {
            b.iter(|| {
                let mut acc = 0usize;
                for p in needles {
                    acc = acc.wrapping_add(*m.get(p).unwrap());
                }
                black_box(acc)
            })
        });
    }
    group.finish();
}

fn bench_get_miss(c: &mut Criterion) {
    let mut group = c.benchmark_group("map::get_miss");
    for n in SIZES {
        let m: DeepEqualMap<Value, usize> =
            lcg(3).take(n).enumerate().map(|(i, x)| (key(x), i)).collect();
        let needle = key(u64::MAX);
        group.bench_function(BenchmarkId::from_parameter(n), |b| {
            b.iter(|| black_box(m.get(black_box(&needle))))
        });
    }
    group.finish();
}

fn bench_merge_sets(c: &mut Criterion) {
    c.bench_function("map::merge_set_values_64", |b| {
        b.iter_batched(
            || {
                let mk = |seed| -> DeepEqualMap<Value, DeepEqualSet<u64>> {
                    lcg(4)
                        .take(64)
                        .zip(lcg(seed))
                        .map(|(x, y)| (key(x), DeepEqualSet::from([y % 5, y % 3])))
                        .collect()
                };
                (mk(5), mk(6))
            },
            |(mut left, right)| {
                left.merge(&right).unwrap();
                black_box(left)
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    bench_set_fresh,
    bench_get_hit,
    bench_get_miss,
    bench_merge_sets
);
criterion_main!(benches);
