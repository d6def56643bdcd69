use std::{
    hint::black_box,
    num::NonZeroUsize,
};

use criterion::{
    Criterion,
    criterion_group,
    criterion_main,
};
use pincache::PinnedLru;

fn bench_put_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("pinned_lru_put_update");
    group.bench_function(criterion::BenchmarkId::from_parameter(10000), |b| {
        let mut cache = PinnedLru::new(NonZeroUsize::new(10000).unwrap());
        for i in 0..10000 {
            cache.insert(i, i);
        }
        b.iter(|| {
            for i in 0..10000 {
                black_box(cache.insert(i, i));
            }
        });
    });
    group.finish();
}

fn bench_put_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("pinned_lru_put_insert");
    group.bench_function(criterion::BenchmarkId::from_parameter(10000), |b| {
        let mut cache = PinnedLru::new(NonZeroUsize::new(10000).unwrap());
        b.iter(|| {
            for i in 0..10000 {
                black_box(cache.insert(i, i));
            }
        });
    });
    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("pinned_lru_get");
    group.bench_function(criterion::BenchmarkId::from_parameter(10000), |b| {
        let mut cache = PinnedLru::new(NonZeroUsize::new(10000).unwrap());
        for i in 0..10000 {
            cache.insert(i, i);
        }
        b.iter(|| {
            for i in 0..10000 {
                black_box(cache.get(&i));
            }
        });
    });
    group.finish();
}

fn bench_get_pinned(c: &mut Criterion) {
    let mut group = c.benchmark_group("pinned_lru_get_pinned");
    group.bench_function(criterion::BenchmarkId::from_parameter(10000), |b| {
        let mut cache = PinnedLru::new(NonZeroUsize::new(10000).unwrap());
        for i in 0..10000 {
            cache.insert_pinned(i, i);
        }
        b.iter(|| {
            for i in 0..10000 {
                black_box(cache.get(&i));
            }
        });
    });
    group.finish();
}

fn bench_peek(c: &mut Criterion) {
    let mut group = c.benchmark_group("pinned_lru_peek");
    group.bench_function(criterion::BenchmarkId::from_parameter(10000), |b| {
        let mut cache = PinnedLru::new(NonZeroUsize::new(10000).unwrap());
        for i in 0..10000 {
            cache.insert(i, i);
        }
        b.iter(|| {
            for i in 0..10000 {
                black_box(cache.peek(&i));
            }
        });
    });
    group.finish();
}

fn bench_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("pinned_lru_remove");
    group.bench_function(criterion::BenchmarkId::from_parameter(10000), |b| {
        let mut cache = PinnedLru::new(NonZeroUsize::new(10000).unwrap());
        for i in 0..10000 {
            cache.insert(i, i);
        }
        b.iter(|| {
            for i in 0..10000 {
                black_box(cache.remove(&i));
            }
        });
    });
    group.finish();
}

fn bench_get_not_found(c: &mut Criterion) {
    let mut group = c.benchmark_group("pinned_lru_get_not_found");
    group.bench_function(criterion::BenchmarkId::from_parameter(10000), |b| {
        let mut cache = PinnedLru::new(NonZeroUsize::new(10000).unwrap());
        for i in 0..10000 {
            cache.insert(i, i);
        }
        b.iter(|| {
            for i in 10000..20000 {
                black_box(cache.get(&i));
            }
        });
    });
    group.finish();
}

fn bench_pin_unpin(c: &mut Criterion) {
    let mut group = c.benchmark_group("pinned_lru_pin_unpin");
    group.bench_function(criterion::BenchmarkId::from_parameter(10000), |b| {
        let mut cache = PinnedLru::new(NonZeroUsize::new(10000).unwrap());
        for i in 0..10000 {
            cache.insert(i, i);
        }
        b.iter(|| {
            for i in 0..10000 {
                black_box(cache.pin(&i));
                black_box(cache.unpin(&i));
            }
        });
    });
    group.finish();
}

fn bench_evict(c: &mut Criterion) {
    let mut group = c.benchmark_group("pinned_lru_evict");
    group.bench_function(criterion::BenchmarkId::from_parameter(10000), |b| {
        let mut cache = PinnedLru::new(NonZeroUsize::new(10000).unwrap());
        for i in 0..10000 {
            cache.insert(i, i);
        }
        b.iter(|| {
            for i in 10000..20000 {
                black_box(cache.insert(i, i));
            }
        });
    });
    group.finish();
}

fn bench_evict_with_pinned(c: &mut Criterion) {
    let mut group = c.benchmark_group("pinned_lru_evict_with_pinned");
    group.bench_function(criterion::BenchmarkId::from_parameter(10000), |b| {
        let mut cache = PinnedLru::new(NonZeroUsize::new(10000).unwrap());
        for i in 0..1000 {
            cache.insert_pinned(i, i);
        }
        for i in 1000..11000 {
            cache.insert(i, i);
        }
        b.iter(|| {
            for i in 11000..21000 {
                black_box(cache.insert(i, i));
            }
        });
    });
    group.finish();
}

criterion_group!(
    pinned_lru,
    bench_put_update,
    bench_put_insert,
    bench_get,
    bench_get_pinned,
    bench_peek,
    bench_remove,
    bench_get_not_found,
    bench_pin_unpin,
    bench_evict,
    bench_evict_with_pinned,
);
criterion_main!(pinned_lru);
