//! Benchmarks for skew detection and full resolution passes

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use skewline_core::{Event, NodeName, StateCode, Timestamp};
use skewline_resolve::{NullObserver, ResolutionEngine, ResolveConfig, SkewDetector};
use skewline_test::{ClockModel, TopologySimulator};

fn stream(origin: &str, len: usize, offset_ms: i64) -> Vec<Event> {
    (0..len)
        .map(|i| {
            Event::new(
                origin,
                "b",
                StateCode::new((i % 11) as u8),
                Timestamp::from_millis(i as i64 * 30_000 + offset_ms),
            )
        })
        .collect()
}

fn bench_detect_streams_aligned(c: &mut Criterion) {
    let detector = SkewDetector::default();
    let a = stream("a", 1_000, 5_000);
    let b = stream("b", 1_000, 0);

    c.bench_function("detect_streams_aligned", |bench| {
        bench.iter(|| black_box(detector.detect_streams(a.clone(), b.clone())))
    });
}

fn bench_detect_streams_negligible(c: &mut Criterion) {
    // Offset under tolerance: the whole stream is walked
    let detector = SkewDetector::default();
    let a = stream("a", 1_000, 500);
    let b = stream("b", 1_000, 0);

    c.bench_function("detect_streams_negligible", |bench| {
        bench.iter(|| black_box(detector.detect_streams(a.clone(), b.clone())))
    });
}

fn bench_resolution_pass(c: &mut Criterion) {
    let mut simulator = TopologySimulator::new(7);
    for i in 0..12 {
        simulator.add_node(format!("n{}", i), ClockModel::offset_secs(i * 5).with_jitter(100));
    }
    simulator
        .add_anonymous("100", "n12", ClockModel::offset_secs(-40))
        .add_anonymous("101", "n13", ClockModel::offset_secs(-80))
        .add_decoy("ghost")
        .with_transitions(20);
    let topology = simulator.build().unwrap();
    let engine = ResolutionEngine::with_observer(
        ResolveConfig::default(),
        std::sync::Arc::new(NullObserver),
    );

    c.bench_function("resolution_pass_14_nodes", |bench| {
        bench.iter(|| {
            let mut store = topology.store.clone();
            let mut directory = topology.directory.clone();
            black_box(engine.run(&mut store, &mut directory).unwrap().table.len())
        })
    });

    let anchor = NodeName::new("n0");
    c.bench_function("candidate_names", |bench| {
        bench.iter(|| {
            black_box(
                skewline_resolve::IdentityResolver::candidate_names(
                    &topology.store,
                    &topology.directory,
                )
                .unwrap()
                .contains(&anchor),
            )
        })
    });
}

criterion_group!(
    benches,
    bench_detect_streams_aligned,
    bench_detect_streams_negligible,
    bench_resolution_pass
);
criterion_main!(benches);
