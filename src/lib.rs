#![doc = include_str!("../README.md")]
// Declare modules
pub mod error;
pub mod schema;
pub mod store;
pub mod stream;
pub mod telemetry;
pub mod view;
pub mod wave;

/// Error type for store operations.
pub use crate::error::StoreError;
/// Named type schemas and their properties.
pub use crate::schema::{EventType, TypeCode, TypeProperty};
/// Main entry point: the in-process stream store.
pub use crate::store::{Key, StreamStore};
/// Streams, interpolation behaviors, and range boundaries.
pub use crate::stream::{Behavior, BoundaryType, InterpolationMode, Stream};
/// Structured event hook for observability.
pub use crate::telemetry::{noop_event_listener, StoreEvent, StoreEventListener};
/// Read-time view definitions and resolved maps.
pub use crate::view::{View, ViewMap, ViewMapProperty, ViewProperty};
/// Wave-sample records, their schemas, and the generator.
pub use crate::wave::{
    next_wave, wave_data_integer_type, wave_data_target_type, wave_data_type, WaveData,
    WaveDataInteger, WaveDataTarget,
};

/// Namespace used by callers that do not need namespace isolation.
pub const DEFAULT_NAMESPACE: &str = "default";
