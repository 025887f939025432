//! Benchmarks for one bridge invocation.
//!
//! At the default 1024 frames and 44.1 kHz a chunk period is about 23 ms;
//! these numbers should sit several orders of magnitude below that.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;

use lan_intercom::bridge::Bridge;
use lan_intercom::codec::ChunkShape;
use lan_intercom::network::{MemoryTransport, MeteredTransport};
use lan_intercom::telemetry::Counters;

fn bridge_process(c: &mut Criterion) {
    let mut group = c.benchmark_group("bridge_process");
    let shape = ChunkShape::new(1024, 2);
    group.throughput(Throughput::Bytes(shape.payload_len(2) as u64));

    let capture: Vec<i16> = (0..shape.samples()).map(|i| i as i16).collect();
    let mut playback = vec![0i16; shape.samples()];

    group.bench_function("loopback", |b| {
        let mut bridge = Bridge::<i16, _>::new(shape, MemoryTransport::loopback());
        b.iter(|| bridge.process(black_box(&capture), black_box(&mut playback)).unwrap())
    });

    group.bench_function("loopback_metered", |b| {
        let counters = Arc::new(Counters::new());
        let transport = MeteredTransport::new(MemoryTransport::loopback(), counters.clone());
        let mut bridge = Bridge::<i16, _>::new(shape, transport).with_counters(counters);
        b.iter(|| bridge.process(black_box(&capture), black_box(&mut playback)).unwrap())
    });

    group.bench_function("silence_fallback", |b| {
        let mut bridge = Bridge::<i16, _>::new(shape, MemoryTransport::new());
        b.iter(|| bridge.process(black_box(&capture), black_box(&mut playback)).unwrap())
    });

    group.finish();
}

fn bridge_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("bridge_chunk_scaling");

    for frames in [128usize, 512, 1024, 4096] {
        let shape = ChunkShape::new(frames, 2);
        let capture = vec![1i16; shape.samples()];
        let mut playback = vec![0i16; shape.samples()];
        let mut bridge = Bridge::<i16, _>::new(shape, MemoryTransport::loopback());

        group.throughput(Throughput::Bytes(shape.payload_len(2) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(frames), &frames, |b, _| {
            b.iter(|| bridge.process(black_box(&capture), black_box(&mut playback)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bridge_process, bridge_scaling);
criterion_main!(benches);
