//! Streams, behaviors, and range-boundary handling.

use serde::{Deserialize, Serialize};

/// An ordered, key-indexed sequence of events conforming to a registered type.
///
/// The stream itself is pure metadata; the events live in the store's data map
/// under the stream's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stream {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Id of the registered [`EventType`](crate::schema::EventType) this stream's events conform to.
    pub type_id: String,
    /// Optional behavior controlling how ranged reads resolve non-indexed start locations.
    #[serde(default)]
    pub behavior_id: Option<String>,
}

impl Stream {
    pub fn new(id: &str, name: &str, description: &str, type_id: &str) -> Self {
        Stream {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            type_id: type_id.to_string(),
            behavior_id: None,
        }
    }
}

/// How a stream resolves reads at index locations without a stored event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InterpolationMode {
    /// Synthesize a calculated event between stored neighbors (the default).
    #[default]
    Continuous,
    /// Return stored events only.
    Discrete,
}

/// A named, reusable interpolation policy attached to streams by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Behavior {
    pub id: String,
    pub mode: InterpolationMode,
}

impl Behavior {
    pub fn new(id: &str, mode: InterpolationMode) -> Self {
        Behavior {
            id: id.to_string(),
            mode,
        }
    }
}

/// How a ranged read treats a start index that falls between stored keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BoundaryType {
    /// Start at the next stored event; never synthesize.
    Exact,
    /// Start at the stored event, or a calculated one per the stream's behavior.
    #[default]
    ExactOrCalculated,
    /// Start strictly inside the requested range.
    Inside,
    /// Include the stored event just outside the requested start.
    Outside,
}
