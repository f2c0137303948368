use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::thread::scope;
use std::time::Instant;
use trough::Trough;

// Items streamed per benchmark iteration.
const TOTAL_ITEMS: usize = 65_536;

/// Produce-and-drain throughput with a single consumer on the bench thread.
fn bench_single_consumer(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream/single-consumer");
    group.throughput(Throughput::Elements(TOTAL_ITEMS as u64));

    group.bench_function(format!("elems/{TOTAL_ITEMS}"), |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();
            for _ in 0..iters {
                let stream = Trough::spawn(|ctx| {
                    ctx.begin(TOTAL_ITEMS).unwrap();
                    for i in 0..TOTAL_ITEMS {
                        ctx.push(i);
                    }
                });
                for item in &stream {
                    black_box(item);
                }
            }
            start.elapsed()
        })
    });

    group.finish();
}

/// Contended draining: several consumers race for the same claim cursor.
fn bench_contended_consumers(c: &mut Criterion) {
    let consumers = num_cpus::get().max(2);

    let mut group = c.benchmark_group("stream/contended");
    group.throughput(Throughput::Elements(TOTAL_ITEMS as u64));

    group.bench_function(format!("consumers/{consumers}"), |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();
            for _ in 0..iters {
                let stream = Trough::spawn(|ctx| {
                    ctx.begin(TOTAL_ITEMS).unwrap();
                    ctx.push_all(0..TOTAL_ITEMS);
                });
                scope(|s| {
                    for _ in 0..consumers {
                        let stream = &stream;
                        s.spawn(move || {
                            for item in stream {
                                black_box(item);
                            }
                        });
                    }
                });
            }
            start.elapsed()
        })
    });

    group.finish();
}

/// Bulk publication vs. per-item locking on the producer side.
fn bench_bulk_publication(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream/bulk-publish");
    group.throughput(Throughput::Elements(TOTAL_ITEMS as u64));

    group.bench_function(format!("elems/{TOTAL_ITEMS}"), |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();
            for _ in 0..iters {
                let stream = Trough::spawn(|ctx| {
                    ctx.begin(TOTAL_ITEMS).unwrap();
                    ctx.push_all(0..TOTAL_ITEMS);
                });
                for item in &stream {
                    black_box(item);
                }
            }
            start.elapsed()
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_single_consumer,
    bench_contended_consumers,
    bench_bulk_publication
);
criterion_main!(benches);
