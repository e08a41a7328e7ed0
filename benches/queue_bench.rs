//! Benchmarks for the request scheduler.
//!
//! Benchmarks cover:
//! - Submission throughput through a single bucket
//! - Fan-out across many buckets with `submit_parallel`
//! - Priority ordering under a mixed backlog
//! - Inline `Immediate` execution
//!
//! Pacing and jitter are disabled so the numbers reflect scheduler overhead.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::time::Duration;

use futures::future::{ready, try_join_all, Ready};
use prometheus_request_queue::builders::SchedulerBuilder;
use prometheus_request_queue::config::SchedulerConfig;
use prometheus_request_queue::core::{ErrorClass, Scheduler, Submission};
use prometheus_request_queue::util::Priority;

use tokio::runtime::Runtime;

// ============================================================================
// Helper Functions
// ============================================================================

fn bench_config() -> SchedulerConfig {
    SchedulerConfig::new()
        .with_min_delay(Duration::ZERO)
        .with_max_jitter(Duration::ZERO)
        .with_max_queue_size(10_000)
}

fn build_scheduler() -> Scheduler {
    SchedulerBuilder::from_config(bench_config())
        .build()
        .expect("benchmarks run inside a tokio runtime")
}

fn noop(id: u64) -> impl FnMut() -> Ready<Result<u64, ErrorClass>> + Send + 'static {
    move || ready(Ok(id))
}

// ============================================================================
// Single Bucket Benchmarks
// ============================================================================

fn bench_single_bucket_submit(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_bucket_submit");

    for size in [10_u64, 100, 1000] {
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.to_async(Runtime::new().unwrap()).iter(|| async move {
                let scheduler = build_scheduler();
                let handles: Vec<_> = (0..size)
                    .map(|i| scheduler.enqueue("bench:1", Priority::Normal, noop(i)).unwrap())
                    .collect();
                black_box(try_join_all(handles).await.unwrap());
            });
        });
    }
    group.finish();
}

fn bench_mixed_priorities(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixed_priorities");
    let priorities = [Priority::Low, Priority::Normal, Priority::High];

    group.bench_function("ordered_drain_300", |b| {
        b.to_async(Runtime::new().unwrap()).iter(|| async {
            let scheduler = build_scheduler();
            let handles: Vec<_> = (0..300_u64)
                .map(|i| {
                    let priority = priorities[(i % 3) as usize];
                    scheduler.enqueue("bench:1", priority, noop(i)).unwrap()
                })
                .collect();
            black_box(try_join_all(handles).await.unwrap());
        });
    });
    group.finish();
}

// ============================================================================
// Multi Bucket Benchmarks
// ============================================================================

fn bench_submit_parallel(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit_parallel");

    for buckets in [10_u64, 100, 500] {
        group.throughput(Throughput::Elements(buckets));
        group.bench_with_input(BenchmarkId::from_parameter(buckets), &buckets, |b, &buckets| {
            b.to_async(Runtime::new().unwrap()).iter(|| async move {
                let scheduler = build_scheduler();
                let results = scheduler
                    .submit_parallel(
                        (0..buckets).map(|i| Submission::new(format!("bench:{i}"), Priority::High, noop(i))),
                    )
                    .await
                    .unwrap();
                black_box(results);
            });
        });
    }
    group.finish();
}

fn bench_immediate_inline(c: &mut Criterion) {
    let mut group = c.benchmark_group("immediate_inline");

    group.bench_function("submit_immediate", |b| {
        let runtime = Runtime::new().unwrap();
        let scheduler = runtime.block_on(async { build_scheduler() });
        b.to_async(&runtime).iter(|| {
            let scheduler = scheduler.clone();
            async move {
                black_box(scheduler.submit("bench:1", Priority::Immediate, noop(1)).await.unwrap());
            }
        });
    });
    group.finish();
}

// ============================================================================
// Benchmark Groups
// ============================================================================

criterion_group!(bucket_benches, bench_single_bucket_submit, bench_mixed_priorities);

criterion_group!(fanout_benches, bench_submit_parallel, bench_immediate_inline);

criterion_main!(bucket_benches, fanout_benches);
