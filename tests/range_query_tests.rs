//! Range-read semantics: boundary types, interpolation behaviors, direction,
//! and skip/count handling.

use streambed::{
    wave_data_type, Behavior, BoundaryType, InterpolationMode, StoreError, Stream, StreamStore,
    WaveData,
};

const NS: &str = "range";
const TYPE_ID: &str = "wave-type";
const STREAM_ID: &str = "waves";

// Hand-built events with linear field values so interpolation results are
// easy to predict: radians = order, sin = order * 10.
fn wave(order: i32) -> WaveData {
    WaveData {
        order,
        radians: f64::from(order),
        sin: f64::from(order) * 10.0,
        ..WaveData::default()
    }
}

/// Store with events at even orders 0..=8.
fn populated_store() -> StreamStore {
    let store = StreamStore::new();
    store
        .get_or_create_type(NS, wave_data_type(TYPE_ID))
        .unwrap();
    store
        .create_or_update_stream(NS, Stream::new(STREAM_ID, "Waves", "", TYPE_ID))
        .unwrap();
    let events: Vec<WaveData> = (0..=8).step_by(2).map(wave).collect();
    store.insert_values(NS, STREAM_ID, &events).unwrap();
    store
}

fn range(
    store: &StreamStore,
    start: i64,
    skip: usize,
    count: usize,
    reversed: bool,
    boundary: BoundaryType,
) -> Vec<WaveData> {
    store
        .get_range_values(NS, STREAM_ID, start, skip, count, reversed, boundary, None)
        .unwrap()
}

fn orders(waves: &[WaveData]) -> Vec<i32> {
    waves.iter().map(|w| w.order).collect()
}

fn attach_discrete_behavior(store: &StreamStore) {
    let behavior = store
        .get_or_create_behavior(NS, Behavior::new("discrete", InterpolationMode::Discrete))
        .unwrap();
    let mut stream = store.get_stream(NS, STREAM_ID).unwrap();
    stream.behavior_id = Some(behavior.id);
    store.create_or_update_stream(NS, stream).unwrap();
}

#[test]
fn test_continuous_interpolates_between_neighbors() {
    let store = populated_store();
    let waves = range(&store, 3, 0, 2, false, BoundaryType::ExactOrCalculated);

    assert_eq!(orders(&waves), vec![3, 4]);
    // Halfway between the events at 2 and 4.
    let calculated = &waves[0];
    assert!((calculated.radians - 3.0).abs() < 1e-12);
    assert!((calculated.sin - 30.0).abs() < 1e-12);
}

#[test]
fn test_start_at_stored_key_is_exact() {
    let store = populated_store();
    let waves = range(&store, 4, 0, 3, false, BoundaryType::ExactOrCalculated);
    assert_eq!(orders(&waves), vec![4, 6, 8]);
    assert_eq!(waves[0], wave(4));
}

#[test]
fn test_exact_boundary_never_synthesizes() {
    let store = populated_store();
    let waves = range(&store, 3, 0, 2, false, BoundaryType::Exact);
    assert_eq!(orders(&waves), vec![4, 6]);

    let waves = range(&store, 3, 0, 2, false, BoundaryType::Inside);
    assert_eq!(orders(&waves), vec![4, 6]);
}

#[test]
fn test_outside_includes_preceding_event() {
    let store = populated_store();
    let waves = range(&store, 3, 0, 2, false, BoundaryType::Outside);
    assert_eq!(orders(&waves), vec![2, 4]);
}

#[test]
fn test_discrete_behavior_skips_to_next_stored() {
    let store = populated_store();
    attach_discrete_behavior(&store);

    let waves = range(&store, 3, 0, 2, false, BoundaryType::ExactOrCalculated);
    assert_eq!(orders(&waves), vec![4, 6]);
}

#[test]
fn test_reversed_walk_descends() {
    let store = populated_store();
    let waves = range(&store, 5, 0, 3, true, BoundaryType::ExactOrCalculated);

    assert_eq!(orders(&waves), vec![5, 4, 2]);
    assert!((waves[0].radians - 5.0).abs() < 1e-12);
}

#[test]
fn test_reversed_from_stored_key() {
    let store = populated_store();
    let waves = range(&store, 4, 0, 3, true, BoundaryType::ExactOrCalculated);
    assert_eq!(orders(&waves), vec![4, 2, 0]);
}

#[test]
fn test_skip_drops_leading_events() {
    let store = populated_store();
    let waves = range(&store, 0, 1, 2, false, BoundaryType::ExactOrCalculated);
    assert_eq!(orders(&waves), vec![2, 4]);
}

#[test]
fn test_start_before_first_returns_stored_events() {
    let store = populated_store();
    let waves = range(&store, -5, 0, 3, false, BoundaryType::ExactOrCalculated);
    // Nothing to interpolate before the first event; the walk starts there.
    assert_eq!(orders(&waves), vec![0, 2, 4]);
}

#[test]
fn test_start_after_last_clamps_to_edge() {
    let store = populated_store();
    let waves = range(&store, 100, 0, 3, false, BoundaryType::ExactOrCalculated);
    // No extrapolation: the edge event is returned as-is.
    assert_eq!(orders(&waves), vec![8]);
    assert_eq!(waves[0], wave(8));
}

#[test]
fn test_count_zero_returns_nothing() {
    let store = populated_store();
    let waves = range(&store, 0, 0, 0, false, BoundaryType::ExactOrCalculated);
    assert!(waves.is_empty());
}

#[test]
fn test_count_beyond_data_is_truncated() {
    let store = populated_store();
    let waves = range(&store, 0, 0, 50, false, BoundaryType::ExactOrCalculated);
    assert_eq!(orders(&waves), vec![0, 2, 4, 6, 8]);
}

#[test]
fn test_empty_stream_range_is_empty() {
    let store = StreamStore::new();
    store
        .get_or_create_type(NS, wave_data_type(TYPE_ID))
        .unwrap();
    store
        .create_or_update_stream(NS, Stream::new(STREAM_ID, "Waves", "", TYPE_ID))
        .unwrap();

    let waves = range(&store, 1, 0, 3, false, BoundaryType::ExactOrCalculated);
    assert!(waves.is_empty());
}

#[test]
fn test_range_on_missing_stream_errors() {
    let store = StreamStore::new();
    let result = store.get_range_values::<WaveData>(
        NS,
        "missing",
        0,
        0,
        3,
        false,
        BoundaryType::ExactOrCalculated,
        None,
    );
    assert!(matches!(result, Err(StoreError::StreamNotFound(_))));
}
