//! Replica Pipeline Benchmarks
//!
//! Measures projection, smoothing and a full replica tick, plus frame
//! encoding for the wire.

use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use glam::{EulerRot, Quat, Vec2};
use tokio_util::codec::Encoder;

use cursor_timeline::cursor::SmoothingWindow;
use cursor_timeline::orientation::{OrientationProjector, ProjectionConfig, ProjectionMode};
use cursor_timeline::protocol::{Snapshot, WireCodec, WireFrame};
use cursor_timeline::replication::{Inbox, PipelineConfig, ReplicaCursor};

/// Attitudes sweeping a small cone around forward
fn generate_attitudes(count: usize) -> Vec<Quat> {
    (0..count)
        .map(|i| {
            let phase = i as f32 / count.max(1) as f32 * std::f32::consts::TAU;
            Quat::from_euler(EulerRot::YXZ, 0.3 * phase.sin(), 0.15 * phase.cos(), 0.0)
        })
        .collect()
}

/// Benchmark single and dual plane projection
fn bench_projection(c: &mut Criterion) {
    let mut group = c.benchmark_group("projection");
    let attitudes = generate_attitudes(256);
    group.throughput(Throughput::Elements(attitudes.len() as u64));

    for mode in [ProjectionMode::Single, ProjectionMode::Dual] {
        let projector = OrientationProjector::new(&ProjectionConfig {
            mode,
            ..Default::default()
        });
        group.bench_with_input(BenchmarkId::from_parameter(mode), &attitudes, |b, attitudes| {
            b.iter(|| {
                for q in attitudes {
                    black_box(projector.project(black_box(*q)));
                }
            });
        });
    }

    group.finish();
}

/// Benchmark window push + mean at several window sizes
fn bench_smoothing(c: &mut Criterion) {
    let mut group = c.benchmark_group("smoothing");

    for bound in [4usize, 8, 32] {
        group.bench_with_input(BenchmarkId::from_parameter(bound), &bound, |b, &bound| {
            let mut window = SmoothingWindow::new(bound);
            let mut x = 0.0f32;
            b.iter(|| {
                x += 0.01;
                window.push(Vec2::new(x.sin(), x.cos()));
                black_box(window.value())
            });
        });
    }

    group.finish();
}

/// Benchmark one replica tick fed a fresh snapshot
fn bench_replica_tick(c: &mut Criterion) {
    let attitudes = generate_attitudes(1024);

    c.bench_function("replica_tick", |b| {
        let mut replica = ReplicaCursor::new(&PipelineConfig::default());
        let mut seq = 0u64;
        b.iter(|| {
            seq += 1;
            let q = attitudes[(seq as usize) % attitudes.len()];
            let inbox = Inbox {
                snapshot: Some(Snapshot::new(seq, q)),
                commands: Vec::new(),
            };
            black_box(replica.tick(inbox))
        });
    });
}

/// Benchmark snapshot frame encoding
fn bench_encode(c: &mut Criterion) {
    c.bench_function("encode_snapshot", |b| {
        let mut codec = WireCodec::new();
        let mut buf = BytesMut::with_capacity(256);
        let snapshot =
            Snapshot::new(42, Quat::from_rotation_y(0.2)).with_pointer(Some(Vec2::new(0.1, -0.4)));
        b.iter(|| {
            buf.clear();
            codec
                .encode(WireFrame::Snapshot(black_box(snapshot)), &mut buf)
                .unwrap();
            black_box(buf.len())
        });
    });
}

criterion_group!(
    benches,
    bench_projection,
    bench_smoothing,
    bench_replica_tick,
    bench_encode
);
criterion_main!(benches);
