//! # PubSub Dispatch Benchmarks
//!
//! | Path | What is measured |
//! |------|------------------|
//! | publish | exact + wildcard fan-out for growing slot sizes |
//! | stop | early termination on the first exact handler |
//! | subscribe/unsubscribe | registry churn |
//! | trigger | combined-form parsing on top of publish |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pubsub::{Dispatcher, ManualScheduler};
use std::sync::Arc;

fn dispatcher() -> Dispatcher {
    Dispatcher::with_scheduler("bench", Arc::new(ManualScheduler::new()))
}

fn bench_publish_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish");

    for size in [1usize, 10, 100, 1000] {
        let bus = dispatcher();
        for _ in 0..size {
            bus.subscribe("order:created", |event| black_box(event).is_request());
            bus.subscribe("order", |_| false);
        }

        group.throughput(Throughput::Elements((size * 2) as u64));
        group.bench_with_input(BenchmarkId::new("fan_out", size), &size, |b, _| {
            b.iter(|| bus.publish("bench", "order", "created", 1).is_ok())
        });
    }

    group.finish();
}

fn bench_stop_propagation(c: &mut Criterion) {
    let bus = dispatcher();
    bus.subscribe("order:created", |_| true);
    for _ in 0..1000 {
        bus.subscribe("order", |_| false);
    }

    c.bench_function("stop/first_exact", |b| {
        b.iter(|| black_box(bus.publish("bench", "order", "created", ())))
    });
}

fn bench_subscribe_churn(c: &mut Criterion) {
    let bus = dispatcher();

    c.bench_function("subscribe_unsubscribe", |b| {
        b.iter(|| {
            let handle = bus.subscribe("churn:tick", |_| false);
            black_box(bus.unsubscribe(&handle))
        })
    });
}

fn bench_trigger_combined(c: &mut Criterion) {
    let bus = dispatcher();
    bus.subscribe("order:created", |_| false);

    c.bench_function("trigger/combined", |b| {
        b.iter(|| black_box(bus.trigger_combined("bench", "order:created", "#1")))
    });
}

criterion_group!(
    benches,
    bench_publish_fan_out,
    bench_stop_propagation,
    bench_subscribe_churn,
    bench_trigger_combined
);
criterion_main!(benches);
