//! Read-time views: declarative mappings from one event type onto another.
//!
//! A view names a source and a target type and optionally explicit property
//! pairs. Resolution produces a [`ViewMap`] listing, for every source property,
//! the target property it feeds (or none). Applying the map reshapes a stored
//! record into the target type's shape, converting `Double` to `Int32` where
//! the target demands it.

use crate::schema::{EventType, TypeCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashSet;

/// An explicit source-to-target property pair inside a view definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewProperty {
    pub source_id: String,
    pub target_id: String,
}

impl ViewProperty {
    pub fn new(source_id: &str, target_id: &str) -> Self {
        ViewProperty {
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
        }
    }
}

/// A named mapping definition between two registered event types.
///
/// With no explicit properties the mapping is automatic: same-id properties
/// map to each other, and the leftovers pair up positionally when both sides
/// are numeric. Explicit pairs always win.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    pub id: String,
    pub name: String,
    pub source_type_id: String,
    pub target_type_id: String,
    #[serde(default)]
    pub properties: Vec<ViewProperty>,
}

impl View {
    pub fn new(id: &str, name: &str, source_type_id: &str, target_type_id: &str) -> Self {
        View {
            id: id.to_string(),
            name: name.to_string(),
            source_type_id: source_type_id.to_string(),
            target_type_id: target_type_id.to_string(),
            properties: Vec::new(),
        }
    }

    pub fn with_properties(
        id: &str,
        name: &str,
        source_type_id: &str,
        target_type_id: &str,
        properties: Vec<ViewProperty>,
    ) -> Self {
        View {
            properties,
            ..View::new(id, name, source_type_id, target_type_id)
        }
    }
}

/// One resolved mapping entry. Unmapped source properties keep `target_id = None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewMapProperty {
    pub source_id: String,
    pub target_id: Option<String>,
}

/// The fully resolved property mapping of a view against its registered types.
///
/// Lists every source property exactly once, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewMap {
    pub source_type_id: String,
    pub target_type_id: String,
    pub properties: Vec<ViewMapProperty>,
}

impl ViewMap {
    /// Resolves a view against its source and target types.
    ///
    /// Pairing happens in three passes: explicit pairs from the view, then
    /// equal ids, then positional pairing of the numeric leftovers. Each target
    /// property is consumed at most once.
    pub fn resolve(view: &View, source: &EventType, target: &EventType) -> ViewMap {
        let mut targets: Vec<Option<String>> = vec![None; source.properties.len()];
        let mut used: HashSet<&str> = HashSet::new();

        // Pass 1: explicit pairs, skipping ids that exist on neither side.
        for pair in &view.properties {
            if target.property(&pair.target_id).is_none() || used.contains(pair.target_id.as_str())
            {
                continue;
            }
            if let Some(idx) = source.properties.iter().position(|p| p.id == pair.source_id) {
                if targets[idx].is_none() {
                    targets[idx] = Some(pair.target_id.clone());
                    used.insert(pair.target_id.as_str());
                }
            }
        }

        // Pass 2: equal ids.
        for (idx, prop) in source.properties.iter().enumerate() {
            if targets[idx].is_some() {
                continue;
            }
            if target.property(&prop.id).is_some() && !used.contains(prop.id.as_str()) {
                targets[idx] = Some(prop.id.clone());
                used.insert(prop.id.as_str());
            }
        }

        // Pass 3: positional pairing of the numeric leftovers. This is what lets
        // a same-shape target with renamed properties map automatically.
        let mut leftovers = target
            .properties
            .iter()
            .filter(|p| !used.contains(p.id.as_str()))
            .peekable();
        for (idx, prop) in source.properties.iter().enumerate() {
            if targets[idx].is_some() {
                continue;
            }
            let candidate = match leftovers.peek() {
                Some(t) => *t,
                None => break,
            };
            let compatible = candidate.code == prop.code
                || (candidate.code.is_numeric() && prop.code.is_numeric());
            if compatible {
                targets[idx] = Some(candidate.id.clone());
                leftovers.next();
            }
        }

        let properties = source
            .properties
            .iter()
            .zip(targets)
            .map(|(prop, target_id)| ViewMapProperty {
                source_id: prop.id.clone(),
                target_id,
            })
            .collect();

        ViewMap {
            source_type_id: source.id.clone(),
            target_type_id: target.id.clone(),
            properties,
        }
    }

    /// Reshapes one stored record into the target type's shape.
    ///
    /// Values of unmapped target properties are simply absent; readers parse
    /// with defaults. `Double` values feeding an `Int32` target round half away
    /// from zero.
    pub fn apply(&self, target: &EventType, record: &JsonValue) -> JsonValue {
        let mut out = Map::new();
        for entry in &self.properties {
            let target_id = match &entry.target_id {
                Some(id) => id,
                None => continue,
            };
            let value = match record.get(&entry.source_id) {
                Some(v) => v,
                None => continue,
            };
            let code = target
                .property(target_id)
                .map(|p| p.code)
                .unwrap_or(TypeCode::Object);
            out.insert(target_id.clone(), convert_value(value, code));
        }
        JsonValue::Object(out)
    }
}

/// Converts a stored JSON value to the code the target property demands.
fn convert_value(value: &JsonValue, code: TypeCode) -> JsonValue {
    match code {
        TypeCode::Int32 => match value.as_f64() {
            Some(f) => JsonValue::from(f.round() as i64),
            None => value.clone(),
        },
        TypeCode::Double => match value.as_f64() {
            Some(f) => JsonValue::from(f),
            None => value.clone(),
        },
        TypeCode::Object => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TypeProperty;
    use serde_json::json;

    fn source_type() -> EventType {
        EventType::new(
            "source",
            "Source",
            "",
            vec![
                TypeProperty::key("Order", TypeCode::Int32),
                TypeProperty::new("Sin", TypeCode::Double),
                TypeProperty::new("Cos", TypeCode::Double),
            ],
        )
    }

    fn renamed_target_type() -> EventType {
        EventType::new(
            "target",
            "Target",
            "",
            vec![
                TypeProperty::key("OrderTarget", TypeCode::Int32),
                TypeProperty::new("SinTarget", TypeCode::Double),
                TypeProperty::new("CosTarget", TypeCode::Double),
            ],
        )
    }

    #[test]
    fn test_automatic_positional_mapping() {
        let source = source_type();
        let target = renamed_target_type();
        let view = View::new("v", "V", "source", "target");
        let map = ViewMap::resolve(&view, &source, &target);

        let pairs: Vec<(&str, Option<&str>)> = map
            .properties
            .iter()
            .map(|p| (p.source_id.as_str(), p.target_id.as_deref()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("Order", Some("OrderTarget")),
                ("Sin", Some("SinTarget")),
                ("Cos", Some("CosTarget")),
            ]
        );
    }

    #[test]
    fn test_same_id_mapping_wins_over_position() {
        let source = source_type();
        // Target declares Cos before Sin; equal ids must still map id-to-id.
        let target = EventType::new(
            "target",
            "Target",
            "",
            vec![
                TypeProperty::key("Order", TypeCode::Int32),
                TypeProperty::new("Cos", TypeCode::Double),
                TypeProperty::new("Sin", TypeCode::Double),
            ],
        );
        let view = View::new("v", "V", "source", "target");
        let map = ViewMap::resolve(&view, &source, &target);

        let sin = map.properties.iter().find(|p| p.source_id == "Sin").unwrap();
        assert_eq!(sin.target_id.as_deref(), Some("Sin"));
    }

    #[test]
    fn test_explicit_mapping_leaves_rest_unmapped() {
        let source = source_type();
        let target = EventType::new(
            "ints",
            "Ints",
            "",
            vec![
                TypeProperty::key("OrderTarget", TypeCode::Int32),
                TypeProperty::new("SinInt", TypeCode::Int32),
            ],
        );
        let view = View::with_properties(
            "v",
            "V",
            "source",
            "ints",
            vec![
                ViewProperty::new("Order", "OrderTarget"),
                ViewProperty::new("Sin", "SinInt"),
            ],
        );
        let map = ViewMap::resolve(&view, &source, &target);

        let cos = map.properties.iter().find(|p| p.source_id == "Cos").unwrap();
        assert_eq!(cos.target_id, None);
    }

    #[test]
    fn test_apply_converts_double_to_int32() {
        let source = source_type();
        let target = EventType::new(
            "ints",
            "Ints",
            "",
            vec![
                TypeProperty::key("OrderTarget", TypeCode::Int32),
                TypeProperty::new("SinInt", TypeCode::Int32),
            ],
        );
        let view = View::with_properties(
            "v",
            "V",
            "source",
            "ints",
            vec![
                ViewProperty::new("Order", "OrderTarget"),
                ViewProperty::new("Sin", "SinInt"),
            ],
        );
        let map = ViewMap::resolve(&view, &source, &target);

        let record = json!({"Order": 4, "Sin": 1.5, "Cos": -0.2});
        let mapped = map.apply(&target, &record);
        assert_eq!(mapped, json!({"OrderTarget": 4, "SinInt": 2}));

        let record = json!({"Order": 4, "Sin": -2.5, "Cos": 0.0});
        let mapped = map.apply(&target, &record);
        assert_eq!(mapped["SinInt"], json!(-3));
    }

    #[test]
    fn test_apply_skips_missing_source_values() {
        let source = source_type();
        let target = renamed_target_type();
        let view = View::new("v", "V", "source", "target");
        let map = ViewMap::resolve(&view, &source, &target);

        let record = json!({"Order": 1});
        let mapped = map.apply(&target, &record);
        assert_eq!(mapped, json!({"OrderTarget": 1}));
    }
}
