use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use streambed::{
    next_wave, wave_data_target_type, wave_data_type, Stream, StreamStore, View, WaveData,
    WaveDataTarget,
};

const NS: &str = "bench";
const STREAM_ID: &str = "waves";

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn one_minute() -> NaiveTime {
    NaiveTime::from_hms_opt(0, 1, 0).unwrap()
}

/// Store preloaded with `events` wave records at consecutive orders.
fn populated_store(events: i32) -> StreamStore {
    let store = StreamStore::new();
    store
        .get_or_create_type(NS, wave_data_type("wave-type"))
        .expect("type");
    store
        .get_or_create_type(NS, wave_data_target_type("target-type"))
        .expect("target type");
    store
        .create_or_update_stream(NS, Stream::new(STREAM_ID, "Waves", "", "wave-type"))
        .expect("stream");
    store
        .get_or_create_view(NS, View::new("auto-view", "View", "wave-type", "target-type"))
        .expect("view");

    let batch: Vec<WaveData> = (0..events)
        .map(|order| WaveData {
            order,
            radians: f64::from(order) * 0.001,
            sin: (f64::from(order) * 0.001).sin(),
            cos: (f64::from(order) * 0.001).cos(),
            ..WaveData::default()
        })
        .collect();
    store
        .insert_values(NS, STREAM_ID, &batch)
        .expect("insert batch");
    store
}

fn bench_generator(c: &mut Criterion) {
    let interval = one_minute();
    c.bench_function("next_wave", |b| {
        let mut order = 0i32;
        b.iter(|| {
            order = order.wrapping_add(1);
            let at = base_time() + Duration::milliseconds(i64::from(order % 600_000));
            next_wave(black_box(at), black_box(interval), 2.0, order).expect("wave")
        })
    });
}

fn bench_window_queries(c: &mut Criterion) {
    let store = populated_store(10_000);
    let mut group = c.benchmark_group("window");

    group.bench_function("window_10k", |b| {
        b.iter(|| {
            let waves: Vec<WaveData> = store
                .get_window_values(NS, STREAM_ID, 0, 10_000, None)
                .expect("window");
            black_box(waves.len())
        })
    });

    group.bench_function("window_10k_through_view", |b| {
        b.iter(|| {
            let waves: Vec<WaveDataTarget> = store
                .get_window_values(NS, STREAM_ID, 0, 10_000, Some("auto-view"))
                .expect("viewed window");
            black_box(waves.len())
        })
    });

    group.finish();
}

fn bench_insert(c: &mut Criterion) {
    c.bench_function("insert_1k", |b| {
        let batch: Vec<WaveData> = (0..1_000)
            .map(|order| WaveData {
                order,
                radians: f64::from(order),
                ..WaveData::default()
            })
            .collect();
        b.iter_batched(
            || {
                let store = StreamStore::new();
                store
                    .get_or_create_type(NS, wave_data_type("wave-type"))
                    .expect("type");
                store
                    .create_or_update_stream(NS, Stream::new(STREAM_ID, "Waves", "", "wave-type"))
                    .expect("stream");
                store
            },
            |store| {
                store
                    .insert_values(NS, STREAM_ID, black_box(&batch))
                    .expect("insert")
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    bench_generator,
    bench_window_queries,
    bench_insert
);
criterion_main!(benches);
