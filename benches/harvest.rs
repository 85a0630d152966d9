#[macro_use]
extern crate criterion;

use criterion::*;
use frame_profiler::sim::{ManualClock, SimDevice};
use frame_profiler::*;

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("record_and_harvest_frame", |b| {
        let device = SimDevice::new(1_000_000_000);
        let mut context = device.context();
        let clock = ManualClock::new();
        let mut profiler = FrameProfiler::with_clock(ProfilerConfiguration::default(), clock.clone());
        profiler.init(&device).unwrap();

        b.iter(|| {
            profiler.begin_frame(&mut context);
            for &marker in MarkerKind::ALL[1..MarkerKind::COUNT - 1].iter() {
                context.advance(1000);
                profiler.timestamp(&mut context, marker);
            }
            profiler.end_frame(&mut context);
            clock.advance(std::time::Duration::from_millis(16));
            black_box(profiler.wait_for_data_and_update(&mut context))
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
