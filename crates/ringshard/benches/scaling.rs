use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ringshard::{Config, Harness, PollStrategy};

const TOTAL_ITEMS: u64 = 1 << 18; // 256K items per run
const PRODUCERS: usize = 8;
const CONSUMERS: usize = 8;

/// Same workload, same thread counts, spread over more and more locks.
fn bench_buffer_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_count");
    group.throughput(Throughput::Elements(TOTAL_ITEMS));
    group.sample_size(10);

    for buffers in [1usize, 2, 4, 8] {
        let config = Config::new(10, buffers, PRODUCERS, CONSUMERS, TOTAL_ITEMS);
        let harness = Harness::new(config).unwrap();

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}B_{}P_{}C", buffers, PRODUCERS, CONSUMERS)),
            &harness,
            |b, harness| {
                b.iter(|| {
                    let report = harness.run().unwrap();
                    assert_eq!(report.items_received, TOTAL_ITEMS);
                });
            },
        );
    }

    group.finish();
}

/// Busy spin versus spin-then-yield on a contended single buffer.
fn bench_poll_strategy(c: &mut Criterion) {
    let mut group = c.benchmark_group("poll_strategy");
    group.throughput(Throughput::Elements(TOTAL_ITEMS));
    group.sample_size(10);

    for poll in [PollStrategy::Spin, PollStrategy::Backoff] {
        let config = Config::new(10, 1, PRODUCERS, CONSUMERS, TOTAL_ITEMS).with_poll(poll);
        let harness = Harness::new(config).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(format!("{poll:?}")), &harness, |b, harness| {
            b.iter(|| harness.run().unwrap());
        });
    }

    group.finish();
}

/// Capacity controls how often workers hit a full or empty buffer.
fn bench_capacity(c: &mut Criterion) {
    let mut group = c.benchmark_group("capacity");
    group.throughput(Throughput::Elements(TOTAL_ITEMS));
    group.sample_size(10);

    for capacity in [1usize, 10, 100, 1000] {
        let config = Config::new(capacity, 4, PRODUCERS, CONSUMERS, TOTAL_ITEMS);
        let harness = Harness::new(config).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(capacity), &harness, |b, harness| {
            b.iter(|| harness.run().unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_buffer_count, bench_poll_strategy, bench_capacity);
criterion_main!(benches);
