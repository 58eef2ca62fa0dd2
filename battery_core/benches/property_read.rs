use battery_core::decoder::decode_pair;
use battery_core::mocks::{FixedStrap, ScriptedSource};
use battery_core::{BatteryDevice, DeviceCfg, FallbackCache, LocalRegistry, Property};
use battery_traits::ReadOutcome;
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::sync::Arc;

// Words as a converter would emit them: address in the top nibble.
fn synth_words(n: usize, seed: u32) -> Vec<[u16; 2]> {
    let mut state = seed.max(1);
    let mut next = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        (x & 0x0FFF) as u16
    };
    (0..n).map(|_| [next() | 0x1000, next()]).collect()
}

fn tune(g: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>) {
    //   BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p battery_core --bench property_read
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(1));
        }
    } else {
        g.sample_size(50);
    }
    if let Ok(ms) = std::env::var("BENCH_MEAS_MS")
        && let Ok(ms_u64) = ms.parse::<u64>()
    {
        g.measurement_time(std::time::Duration::from_millis(ms_u64));
    }
}

fn device(outcome: ReadOutcome) -> BatteryDevice {
    let source = Arc::new(ScriptedSource::new());
    source
        .set_default("voltage", outcome.clone())
        .set_default("current", outcome);
    BatteryDevice::init(
        source,
        &mut FixedStrap::new(false),
        Arc::new(LocalRegistry::new()),
        &DeviceCfg::default(),
    )
    .expect("bench device")
}

pub fn bench_ingest(c: &mut Criterion) {
    let mut g = c.benchmark_group("ingest");
    tune(&mut g);
    let words = synth_words(4096, 0xB4_77E7);
    let cache = FallbackCache::default();
    g.bench_function("decode_and_store", |b| {
        b.iter(|| {
            for (n, w) in words.iter().enumerate() {
                cache.store(decode_pair(black_box(w)), n as u64);
            }
        })
    });
    g.finish();
}

pub fn bench_property_read(c: &mut Criterion) {
    let mut g = c.benchmark_group("property_read");
    tune(&mut g);
    for (label, outcome) in [
        ("fresh", ReadOutcome::Fresh(1000)),
        ("busy_cached", ReadOutcome::Busy),
    ] {
        let dev = device(outcome);
        g.bench_function(format!("voltage_now_{label}"), |b| {
            b.iter(|| black_box(dev.telemetry().get(black_box(Property::VoltageNow))))
        });
    }
    let dev = device(ReadOutcome::Fresh(0));
    g.bench_function("snapshot", |b| b.iter(|| black_box(dev.telemetry().snapshot())));
    g.finish();
}

criterion_group!(property_read, bench_ingest, bench_property_read);
criterion_main!(property_read);
