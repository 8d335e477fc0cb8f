//! The in-process stream store: namespaced registries for types, streams,
//! behaviors, and views, plus per-stream key-ordered event data.
//!
//! Events cross the API as serde types and are held internally as JSON
//! objects keyed by the value of the stream type's key property. Reads are
//! generic over the caller's record type and parse with defaults; writes are
//! generic over any serializable record carrying the key property.

use crate::error::StoreError;
use crate::schema::{EventType, TypeCode};
use crate::stream::{Behavior, BoundaryType, InterpolationMode, Stream};
use crate::telemetry::{noop_event_listener, StoreEvent, StoreEventListener};
use crate::view::{View, ViewMap};
use rayon::prelude::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;
use std::sync::{Arc, RwLock};

/// Key type of stream events (the value of the type's `Int32` key property).
pub type Key = i64;

/// Per-stream event data, ordered by key.
/// Uses RwLock for concurrent read access during queries and exclusive write
/// access during mutations, shared via Arc so reads don't hold the outer map.
type StreamData = Arc<RwLock<BTreeMap<Key, JsonValue>>>;

/// Registries are scoped by (namespace, id).
type Scoped<T> = HashMap<(String, String), T>;

fn scoped(namespace: &str, id: &str) -> (String, String) {
    (namespace.to_string(), id.to_string())
}

enum WriteMode {
    Insert,
    Update,
    Replace,
}

/// The main in-process stream store struct.
#[derive(Debug)]
pub struct StreamStore {
    types: RwLock<Scoped<EventType>>,
    streams: RwLock<Scoped<Stream>>,
    behaviors: RwLock<Scoped<Behavior>>,
    views: RwLock<Scoped<View>>,
    data: RwLock<Scoped<StreamData>>,
    /// Structured event hook for observability (no-op by default).
    events: Arc<dyn StoreEventListener>,
}

impl Default for StreamStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamStore {
    /// Creates an empty store with the no-op event listener.
    pub fn new() -> Self {
        Self::with_listener(noop_event_listener())
    }

    /// Creates an empty store forwarding structured events to `listener`.
    pub fn with_listener(listener: Arc<dyn StoreEventListener>) -> Self {
        StreamStore {
            types: RwLock::new(HashMap::new()),
            streams: RwLock::new(HashMap::new()),
            behaviors: RwLock::new(HashMap::new()),
            views: RwLock::new(HashMap::new()),
            data: RwLock::new(HashMap::new()),
            events: listener,
        }
    }

    // --- Type registry --- //

    /// Registers a type, or returns the registered definition when it is
    /// structurally identical. A differing definition under the same id is a
    /// `DefinitionConflict`.
    pub fn get_or_create_type(
        &self,
        namespace: &str,
        event_type: EventType,
    ) -> Result<EventType, StoreError> {
        event_type.validate()?;
        let created = {
            let mut types = self.types.write()?;
            let key = scoped(namespace, &event_type.id);
            if let Some(existing) = types.get(&key) {
                if *existing == event_type {
                    return Ok(existing.clone());
                }
                return Err(StoreError::DefinitionConflict {
                    kind: "type",
                    id: event_type.id.clone(),
                });
            }
            types.insert(key, event_type.clone());
            event_type
        };
        self.events.on_event(StoreEvent::TypeCreated {
            namespace: namespace.to_string(),
            id: created.id.clone(),
        });
        Ok(created)
    }

    pub fn get_type(&self, namespace: &str, type_id: &str) -> Result<EventType, StoreError> {
        self.types
            .read()?
            .get(&scoped(namespace, type_id))
            .cloned()
            .ok_or_else(|| StoreError::TypeNotFound(type_id.to_string()))
    }

    /// Deletes a type. Fails with `TypeInUse` while any stream in the
    /// namespace references it.
    pub fn delete_type(&self, namespace: &str, type_id: &str) -> Result<(), StoreError> {
        let referencing = {
            let streams = self.streams.read()?;
            streams
                .iter()
                .find(|((ns, _), stream)| ns == namespace && stream.type_id == type_id)
                .map(|(_, stream)| stream.id.clone())
        };
        if let Some(stream_id) = referencing {
            return Err(StoreError::TypeInUse {
                type_id: type_id.to_string(),
                stream_id,
            });
        }

        let removed = self.types.write()?.remove(&scoped(namespace, type_id));
        if removed.is_none() {
            return Err(StoreError::TypeNotFound(type_id.to_string()));
        }
        self.events.on_event(StoreEvent::TypeDeleted {
            namespace: namespace.to_string(),
            id: type_id.to_string(),
        });
        Ok(())
    }

    // --- Stream registry --- //

    /// Creates a stream, or updates its metadata in place. The referenced type
    /// must be registered; stored events survive updates.
    pub fn create_or_update_stream(
        &self,
        namespace: &str,
        stream: Stream,
    ) -> Result<Stream, StoreError> {
        if stream.id.is_empty() {
            return Err(StoreError::InvalidArgument(
                "stream id must not be empty".to_string(),
            ));
        }
        // Referenced definitions must exist before the stream is visible.
        self.get_type(namespace, &stream.type_id)?;
        if let Some(behavior_id) = &stream.behavior_id {
            let behaviors = self.behaviors.read()?;
            if !behaviors.contains_key(&scoped(namespace, behavior_id)) {
                return Err(StoreError::BehaviorNotFound(behavior_id.clone()));
            }
        }

        let updated = {
            let mut streams = self.streams.write()?;
            streams
                .insert(scoped(namespace, &stream.id), stream.clone())
                .is_some()
        };
        self.data
            .write()?
            .entry(scoped(namespace, &stream.id))
            .or_insert_with(|| Arc::new(RwLock::new(BTreeMap::new())));

        let event = if updated {
            StoreEvent::StreamUpdated {
                namespace: namespace.to_string(),
                id: stream.id.clone(),
            }
        } else {
            StoreEvent::StreamCreated {
                namespace: namespace.to_string(),
                id: stream.id.clone(),
            }
        };
        self.events.on_event(event);
        Ok(stream)
    }

    pub fn get_stream(&self, namespace: &str, stream_id: &str) -> Result<Stream, StoreError> {
        self.streams
            .read()?
            .get(&scoped(namespace, stream_id))
            .cloned()
            .ok_or_else(|| StoreError::StreamNotFound(stream_id.to_string()))
    }

    /// Deletes a stream and drops its stored events.
    pub fn delete_stream(&self, namespace: &str, stream_id: &str) -> Result<(), StoreError> {
        let removed = self.streams.write()?.remove(&scoped(namespace, stream_id));
        if removed.is_none() {
            return Err(StoreError::StreamNotFound(stream_id.to_string()));
        }
        self.data.write()?.remove(&scoped(namespace, stream_id));
        self.events.on_event(StoreEvent::StreamDeleted {
            namespace: namespace.to_string(),
            id: stream_id.to_string(),
        });
        Ok(())
    }

    // --- Behavior registry --- //

    pub fn get_or_create_behavior(
        &self,
        namespace: &str,
        behavior: Behavior,
    ) -> Result<Behavior, StoreError> {
        if behavior.id.is_empty() {
            return Err(StoreError::InvalidArgument(
                "behavior id must not be empty".to_string(),
            ));
        }
        let created = {
            let mut behaviors = self.behaviors.write()?;
            let key = scoped(namespace, &behavior.id);
            if let Some(existing) = behaviors.get(&key) {
                if *existing == behavior {
                    return Ok(existing.clone());
                }
                return Err(StoreError::DefinitionConflict {
                    kind: "behavior",
                    id: behavior.id.clone(),
                });
            }
            behaviors.insert(key, behavior.clone());
            behavior
        };
        self.events.on_event(StoreEvent::BehaviorCreated {
            namespace: namespace.to_string(),
            id: created.id.clone(),
        });
        Ok(created)
    }

    pub fn get_behavior(&self, namespace: &str, behavior_id: &str) -> Result<Behavior, StoreError> {
        self.behaviors
            .read()?
            .get(&scoped(namespace, behavior_id))
            .cloned()
            .ok_or_else(|| StoreError::BehaviorNotFound(behavior_id.to_string()))
    }

    pub fn delete_behavior(&self, namespace: &str, behavior_id: &str) -> Result<(), StoreError> {
        let removed = self
            .behaviors
            .write()?
            .remove(&scoped(namespace, behavior_id));
        if removed.is_none() {
            return Err(StoreError::BehaviorNotFound(behavior_id.to_string()));
        }
        self.events.on_event(StoreEvent::BehaviorDeleted {
            namespace: namespace.to_string(),
            id: behavior_id.to_string(),
        });
        Ok(())
    }

    // --- View registry --- //

    /// Registers a view. Both referenced types must already be registered and
    /// explicit property pairs must name existing properties.
    pub fn get_or_create_view(&self, namespace: &str, view: View) -> Result<View, StoreError> {
        if view.id.is_empty() {
            return Err(StoreError::InvalidArgument(
                "view id must not be empty".to_string(),
            ));
        }
        let source = self.get_type(namespace, &view.source_type_id)?;
        let target = self.get_type(namespace, &view.target_type_id)?;
        for pair in &view.properties {
            if source.property(&pair.source_id).is_none() {
                return Err(StoreError::InvalidArgument(format!(
                    "view {} maps unknown source property {}",
                    view.id, pair.source_id
                )));
            }
            if target.property(&pair.target_id).is_none() {
                return Err(StoreError::InvalidArgument(format!(
                    "view {} maps unknown target property {}",
                    view.id, pair.target_id
                )));
            }
        }

        let created = {
            let mut views = self.views.write()?;
            let key = scoped(namespace, &view.id);
            if let Some(existing) = views.get(&key) {
                if *existing == view {
                    return Ok(existing.clone());
                }
                return Err(StoreError::DefinitionConflict {
                    kind: "view",
                    id: view.id.clone(),
                });
            }
            views.insert(key, view.clone());
            view
        };
        self.events.on_event(StoreEvent::ViewCreated {
            namespace: namespace.to_string(),
            id: created.id.clone(),
        });
        Ok(created)
    }

    pub fn get_view(&self, namespace: &str, view_id: &str) -> Result<View, StoreError> {
        self.views
            .read()?
            .get(&scoped(namespace, view_id))
            .cloned()
            .ok_or_else(|| StoreError::ViewNotFound(view_id.to_string()))
    }

    pub fn delete_view(&self, namespace: &str, view_id: &str) -> Result<(), StoreError> {
        let removed = self.views.write()?.remove(&scoped(namespace, view_id));
        if removed.is_none() {
            return Err(StoreError::ViewNotFound(view_id.to_string()));
        }
        self.events.on_event(StoreEvent::ViewDeleted {
            namespace: namespace.to_string(),
            id: view_id.to_string(),
        });
        Ok(())
    }

    /// Resolves a registered view against its source and target types.
    pub fn get_view_map(&self, namespace: &str, view_id: &str) -> Result<ViewMap, StoreError> {
        let view = self.get_view(namespace, view_id)?;
        let source = self.get_type(namespace, &view.source_type_id)?;
        let target = self.get_type(namespace, &view.target_type_id)?;
        Ok(ViewMap::resolve(&view, &source, &target))
    }

    // --- Value writes --- //

    /// Inserts a single event. Fails with `DuplicateKey` when the key is taken.
    pub fn insert_value<T: Serialize>(
        &self,
        namespace: &str,
        stream_id: &str,
        event: &T,
    ) -> Result<(), StoreError> {
        self.write_values(namespace, stream_id, std::slice::from_ref(event), WriteMode::Insert)
    }

    /// Inserts a batch of events; the whole batch is rejected on any duplicate key.
    pub fn insert_values<T: Serialize>(
        &self,
        namespace: &str,
        stream_id: &str,
        events: &[T],
    ) -> Result<(), StoreError> {
        self.write_values(namespace, stream_id, events, WriteMode::Insert)
    }

    /// Updates a single event, inserting it when no prior entry exists.
    pub fn update_value<T: Serialize>(
        &self,
        namespace: &str,
        stream_id: &str,
        event: &T,
    ) -> Result<(), StoreError> {
        self.write_values(namespace, stream_id, std::slice::from_ref(event), WriteMode::Update)
    }

    /// Upserts a batch of events.
    pub fn update_values<T: Serialize>(
        &self,
        namespace: &str,
        stream_id: &str,
        events: &[T],
    ) -> Result<(), StoreError> {
        self.write_values(namespace, stream_id, events, WriteMode::Update)
    }

    /// Replaces a single existing event; fails with `KeyNotFound` when absent.
    pub fn replace_value<T: Serialize>(
        &self,
        namespace: &str,
        stream_id: &str,
        event: &T,
    ) -> Result<(), StoreError> {
        self.write_values(namespace, stream_id, std::slice::from_ref(event), WriteMode::Replace)
    }

    /// Replaces a batch of existing events; the whole batch is rejected on any
    /// missing key.
    pub fn replace_values<T: Serialize>(
        &self,
        namespace: &str,
        stream_id: &str,
        events: &[T],
    ) -> Result<(), StoreError> {
        self.write_values(namespace, stream_id, events, WriteMode::Replace)
    }

    /// Removes the event at `key`; fails with `KeyNotFound` when absent.
    pub fn remove_value(
        &self,
        namespace: &str,
        stream_id: &str,
        key: Key,
    ) -> Result<(), StoreError> {
        let data = self.stream_data(namespace, stream_id)?;
        let removed = data.write()?.remove(&key);
        if removed.is_none() {
            return Err(StoreError::KeyNotFound {
                stream: stream_id.to_string(),
                key,
            });
        }
        self.events.on_event(StoreEvent::ValuesRemoved {
            namespace: namespace.to_string(),
            stream: stream_id.to_string(),
            count: 1,
        });
        Ok(())
    }

    /// Removes every event with a key in `[start, end]`; an empty window is
    /// not an error. Returns the number of events removed.
    pub fn remove_window_values(
        &self,
        namespace: &str,
        stream_id: &str,
        start: Key,
        end: Key,
    ) -> Result<usize, StoreError> {
        if start > end {
            return Err(StoreError::InvalidWindow { start, end });
        }
        let data = self.stream_data(namespace, stream_id)?;
        let removed = {
            let mut map = data.write()?;
            let keys: Vec<Key> = map.range(start..=end).map(|(k, _)| *k).collect();
            for key in &keys {
                map.remove(key);
            }
            keys.len()
        };
        if removed > 0 {
            self.events.on_event(StoreEvent::ValuesRemoved {
                namespace: namespace.to_string(),
                stream: stream_id.to_string(),
                count: removed,
            });
        }
        Ok(removed)
    }

    // --- Value reads --- //

    /// Returns the event at `key`, or `None`. Absence is an explicit result,
    /// never an error.
    pub fn get_value<T: DeserializeOwned>(
        &self,
        namespace: &str,
        stream_id: &str,
        key: Key,
    ) -> Result<Option<T>, StoreError> {
        let data = self.stream_data(namespace, stream_id)?;
        let guard = data.read()?;
        match guard.get(&key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// Returns the event with the highest key, or `None` on an empty stream.
    pub fn get_last_value<T: DeserializeOwned>(
        &self,
        namespace: &str,
        stream_id: &str,
    ) -> Result<Option<T>, StoreError> {
        let data = self.stream_data(namespace, stream_id)?;
        let guard = data.read()?;
        match guard.iter().next_back() {
            Some((_, value)) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// Returns every event with a key in `[start, end]`, ascending, optionally
    /// reshaped through a registered view.
    pub fn get_window_values<T: DeserializeOwned>(
        &self,
        namespace: &str,
        stream_id: &str,
        start: Key,
        end: Key,
        view_id: Option<&str>,
    ) -> Result<Vec<T>, StoreError> {
        if start > end {
            return Err(StoreError::InvalidWindow { start, end });
        }
        let records: Vec<JsonValue> = {
            let data = self.stream_data(namespace, stream_id)?;
            let guard = data.read()?;
            guard.range(start..=end).map(|(_, v)| v.clone()).collect()
        };
        self.materialize(namespace, records, view_id)
    }

    /// Returns up to `count` events beginning at index location `start_key`
    /// (after dropping `skip`), walking toward higher keys, or lower keys when
    /// `reversed`.
    ///
    /// When no event is stored at `start_key`, the `boundary` and the stream's
    /// behavior decide the first record: `Continuous` mode under
    /// `ExactOrCalculated` synthesizes a linear interpolation between the
    /// neighboring events (clamping to the edge event beyond the stored
    /// range), `Discrete` and `Exact`/`Inside` start at the next stored event,
    /// and `Outside` includes the stored event just outside the start.
    #[allow(clippy::too_many_arguments)]
    pub fn get_range_values<T: DeserializeOwned>(
        &self,
        namespace: &str,
        stream_id: &str,
        start_key: Key,
        skip: usize,
        count: usize,
        reversed: bool,
        boundary: BoundaryType,
        view_id: Option<&str>,
    ) -> Result<Vec<T>, StoreError> {
        let stream = self.get_stream(namespace, stream_id)?;
        let mode = match &stream.behavior_id {
            Some(behavior_id) => self
                .behaviors
                .read()?
                .get(&scoped(namespace, behavior_id))
                .map(|b| b.mode)
                .unwrap_or_default(),
            None => InterpolationMode::default(),
        };
        let event_type = self.get_type(namespace, &stream.type_id)?;

        let budget = skip.saturating_add(count);
        let selected: Vec<JsonValue> = {
            let data = self.stream_data(namespace, stream_id)?;
            let guard = data.read()?;

            let at = guard.get(&start_key).cloned();
            let before = guard
                .range(..start_key)
                .next_back()
                .map(|(k, v)| (*k, v.clone()));
            let after = guard
                .range((Bound::Excluded(start_key), Bound::<Key>::Unbounded))
                .next()
                .map(|(k, v)| (*k, v.clone()));

            let head = match at {
                Some(value) => Some(value),
                None => resolve_start(
                    &event_type, start_key, boundary, mode, reversed, &before, &after,
                ),
            };

            let mut selected: Vec<JsonValue> = Vec::new();
            if let Some(head) = head {
                selected.push(head);
            }
            if reversed {
                for (_, value) in guard.range(..start_key).rev() {
                    if selected.len() >= budget {
                        break;
                    }
                    selected.push(value.clone());
                }
            } else {
                for (_, value) in guard.range((Bound::Excluded(start_key), Bound::<Key>::Unbounded))
                {
                    if selected.len() >= budget {
                        break;
                    }
                    selected.push(value.clone());
                }
            }
            selected
        };

        let window: Vec<JsonValue> = selected.into_iter().skip(skip).take(count).collect();
        self.materialize(namespace, window, view_id)
    }

    // --- Internals --- //

    fn stream_data(&self, namespace: &str, stream_id: &str) -> Result<StreamData, StoreError> {
        self.data
            .read()?
            .get(&scoped(namespace, stream_id))
            .cloned()
            .ok_or_else(|| StoreError::StreamNotFound(stream_id.to_string()))
    }

    fn write_values<T: Serialize>(
        &self,
        namespace: &str,
        stream_id: &str,
        events: &[T],
        mode: WriteMode,
    ) -> Result<(), StoreError> {
        if events.is_empty() {
            return Ok(());
        }
        let stream = self.get_stream(namespace, stream_id)?;
        let event_type = self.get_type(namespace, &stream.type_id)?;
        // validate() guarantees a key property on every registered type.
        let key_id = event_type
            .key_property()
            .map(|p| p.id.clone())
            .ok_or_else(|| {
                StoreError::InvalidArgument(format!("type {} has no key property", event_type.id))
            })?;

        let mut records: Vec<(Key, JsonValue)> = Vec::with_capacity(events.len());
        let mut batch_keys: HashSet<Key> = HashSet::with_capacity(events.len());
        for event in events {
            let value = serde_json::to_value(event)?;
            if !value.is_object() {
                return Err(StoreError::InvalidArgument(
                    "events must serialize to objects".to_string(),
                ));
            }
            let key = value
                .get(&key_id)
                .and_then(JsonValue::as_i64)
                .ok_or_else(|| {
                    StoreError::InvalidArgument(format!(
                        "event carries no integer key property {}",
                        key_id
                    ))
                })?;
            if !batch_keys.insert(key) {
                return Err(StoreError::DuplicateKey {
                    stream: stream_id.to_string(),
                    key,
                });
            }
            records.push((key, value));
        }

        let data = self.stream_data(namespace, stream_id)?;
        let count = records.len();
        {
            let mut map = data.write()?;
            match mode {
                WriteMode::Insert => {
                    for (key, _) in &records {
                        if map.contains_key(key) {
                            return Err(StoreError::DuplicateKey {
                                stream: stream_id.to_string(),
                                key: *key,
                            });
                        }
                    }
                }
                WriteMode::Replace => {
                    for (key, _) in &records {
                        if !map.contains_key(key) {
                            return Err(StoreError::KeyNotFound {
                                stream: stream_id.to_string(),
                                key: *key,
                            });
                        }
                    }
                }
                WriteMode::Update => {}
            }
            for (key, value) in records {
                map.insert(key, value);
            }
        }

        self.events.on_event(StoreEvent::ValuesWritten {
            namespace: namespace.to_string(),
            stream: stream_id.to_string(),
            count,
        });
        Ok(())
    }

    fn materialize<T: DeserializeOwned>(
        &self,
        namespace: &str,
        records: Vec<JsonValue>,
        view_id: Option<&str>,
    ) -> Result<Vec<T>, StoreError> {
        let shaped: Vec<JsonValue> = match view_id {
            None => records,
            Some(view_id) => {
                let map = self.get_view_map(namespace, view_id)?;
                let target = self.get_type(namespace, &map.target_type_id)?;
                records
                    .par_iter()
                    .map(|record| map.apply(&target, record))
                    .collect()
            }
        };
        shaped
            .into_iter()
            .map(|value| serde_json::from_value(value).map_err(StoreError::from))
            .collect()
    }
}

/// First record of a ranged read when nothing is stored at the start key.
fn resolve_start(
    event_type: &EventType,
    start_key: Key,
    boundary: BoundaryType,
    mode: InterpolationMode,
    reversed: bool,
    before: &Option<(Key, JsonValue)>,
    after: &Option<(Key, JsonValue)>,
) -> Option<JsonValue> {
    match boundary {
        BoundaryType::Outside => {
            // One stored event just outside the start of the walk.
            if reversed {
                after.as_ref().map(|(_, v)| v.clone())
            } else {
                before.as_ref().map(|(_, v)| v.clone())
            }
        }
        BoundaryType::ExactOrCalculated if mode == InterpolationMode::Continuous => {
            match (before, after) {
                (Some(b), Some(a)) => Some(interpolate_record(
                    event_type,
                    start_key,
                    (b.0, &b.1),
                    (a.0, &a.1),
                )),
                // Beyond the stored range: clamp to the edge event instead of
                // extrapolating.
                (Some(b), None) if !reversed => Some(b.1.clone()),
                (None, Some(a)) if reversed => Some(a.1.clone()),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Linear interpolation of the type's numeric properties between two stored
/// events; the key property takes the requested key.
fn interpolate_record(
    event_type: &EventType,
    key: Key,
    before: (Key, &JsonValue),
    after: (Key, &JsonValue),
) -> JsonValue {
    let (k0, v0) = before;
    let (k1, v1) = after;
    let t = if k1 == k0 {
        0.0
    } else {
        (key - k0) as f64 / (k1 - k0) as f64
    };

    let mut out = Map::new();
    for prop in &event_type.properties {
        if prop.is_key {
            out.insert(prop.id.clone(), JsonValue::from(key));
            continue;
        }
        match prop.code {
            TypeCode::Double | TypeCode::Int32 => {
                let a = v0.get(&prop.id).and_then(JsonValue::as_f64).unwrap_or(0.0);
                let b = v1.get(&prop.id).and_then(JsonValue::as_f64).unwrap_or(0.0);
                let value = a + (b - a) * t;
                if prop.code == TypeCode::Int32 {
                    out.insert(prop.id.clone(), JsonValue::from(value.round() as i64));
                } else {
                    out.insert(prop.id.clone(), JsonValue::from(value));
                }
            }
            TypeCode::Object => {
                if let Some(v) = v0.get(&prop.id) {
                    out.insert(prop.id.clone(), v.clone());
                }
            }
        }
    }
    JsonValue::Object(out)
}
