//! Benchmarks for the Murmur broadcast path
//!
//! Run with: cargo bench

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use murmur::broadcast::render::event_frame;
use murmur::{Dispatcher, Message, RegistryConfig, SubscriberRegistry};

fn message(id: i64) -> Message {
    Message::new(id, "alice", "hello <world> & everyone", Utc::now())
}

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out");

    for subscribers in [1, 100, 1000] {
        let dispatcher = Dispatcher::new(SubscriberRegistry::new(RegistryConfig {
            max_subscribers: subscribers,
            subscriber_buffer: 64,
        }));
        let mut subs: Vec<_> = (0..subscribers)
            .map(|_| dispatcher.registry().join().unwrap())
            .collect();

        group.throughput(Throughput::Elements(subscribers as u64));

        group.bench_function(format!("publish_{}", subscribers), |b| {
            let mut id = 0;
            b.iter(|| {
                id += 1;
                let report = dispatcher.publish(black_box(message(id)));
                // Drain so nobody is evicted for a full buffer
                for sub in subs.iter_mut() {
                    while sub.try_recv().is_ok() {}
                }
                report
            })
        });
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    let msg = message(1);

    group.bench_function("event_frame", |b| b.iter(|| event_frame(black_box(&msg))));

    group.finish();
}

criterion_group!(benches, bench_fan_out, bench_render);
criterion_main!(benches);
