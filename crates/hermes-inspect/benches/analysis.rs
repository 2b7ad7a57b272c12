use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hermes_core::test_utils::weather_fixture;
use hermes_inspect::{analyze_receiver, analyze_sender};
use hermes_types::{CancelToken, NullSink};

fn bench_sender(c: &mut Criterion) {
    let fixture = weather_fixture();
    c.bench_function("sender constant propagation", |b| {
        b.iter(|| {
            let mut sink = NullSink;
            black_box(analyze_sender(&fixture.set, fixture.send_site, &mut sink))
        })
    });
}

fn bench_receiver(c: &mut Criterion) {
    let fixture = weather_fixture();
    let cancel = CancelToken::new();
    c.bench_function("receiver usage classification", |b| {
        b.iter(|| {
            let mut sink = NullSink;
            black_box(analyze_receiver(&fixture.set, fixture.recv_site, &mut sink, &cancel))
        })
    });
}

criterion_group!(benches, bench_sender, bench_receiver);
criterion_main!(benches);
