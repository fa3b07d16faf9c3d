use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::sync::atomic::{AtomicU64, Ordering};
use tickstat_telemetry::{CounterKey, TimerKey};

static BENCH_EVENTS: CounterKey = CounterKey::new("bench_events", "Counter hot path");
static BENCH_SECTION: TimerKey = TimerKey::new("bench_section", "Timer hot path");
static SHARED_ATOMIC: AtomicU64 = AtomicU64::new(0);

fn bench_updates(c: &mut Criterion) {
    let mut group = c.benchmark_group("Hot path updates");

    group.bench_function("Shared atomic fetch_add (baseline)", |b| {
        b.iter(|| SHARED_ATOMIC.fetch_add(black_box(1), Ordering::Relaxed));
    });

    group.bench_function("CounterKey::add (thread-local table)", |b| {
        b.iter(|| BENCH_EVENTS.add(black_box(1)));
    });

    let instance = BENCH_EVENTS.instance();
    group.bench_function("Instance::add (caller-owned)", |b| {
        b.iter(|| instance.add(black_box(1)));
    });

    group.bench_function("TimerKey::time", |b| {
        b.iter(|| BENCH_SECTION.time(|| black_box(7u64)));
    });

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let instances: Vec<_> = (0..64).map(|_| BENCH_EVENTS.instance()).collect();
    for instance in &instances {
        instance.add(1);
    }

    c.bench_function("NamedMetric::snapshot (64 live instances)", |b| {
        b.iter(|| black_box(BENCH_EVENTS.snapshot()));
    });
}

criterion_group!(benches, bench_updates, bench_snapshot);
criterion_main!(benches);
