//! Named type schemas: the structural definitions event streams are bound to.

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Primitive codes a property of an event type can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeCode {
    Int32,
    Double,
    Object,
}

impl TypeCode {
    /// Int32 and Double values convert into each other on view-mapped reads.
    pub fn is_numeric(self) -> bool {
        matches!(self, TypeCode::Int32 | TypeCode::Double)
    }
}

/// A single named property of an event type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeProperty {
    pub id: String,
    pub code: TypeCode,
    /// Marks the property used as the primary index of a stream.
    #[serde(default)]
    pub is_key: bool,
}

impl TypeProperty {
    pub fn new(id: &str, code: TypeCode) -> Self {
        TypeProperty {
            id: id.to_string(),
            code,
            is_key: false,
        }
    }

    /// Shorthand for the designated key property.
    pub fn key(id: &str, code: TypeCode) -> Self {
        TypeProperty {
            id: id.to_string(),
            code,
            is_key: true,
        }
    }
}

/// A named, structural event type: the schema a stream's events conform to.
///
/// Exactly one property must be marked as the key, and the key must be `Int32`;
/// [`EventType::validate`] enforces this before a type enters a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventType {
    pub id: String,
    pub name: String,
    pub description: String,
    pub properties: Vec<TypeProperty>,
}

impl EventType {
    pub fn new(id: &str, name: &str, description: &str, properties: Vec<TypeProperty>) -> Self {
        EventType {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            properties,
        }
    }

    /// Checks the structural invariants of the type definition.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.id.is_empty() {
            return Err(StoreError::InvalidArgument(
                "type id must not be empty".to_string(),
            ));
        }
        if self.properties.is_empty() {
            return Err(StoreError::InvalidArgument(format!(
                "type {} has no properties",
                self.id
            )));
        }

        let mut seen = HashSet::new();
        for prop in &self.properties {
            if prop.id.is_empty() {
                return Err(StoreError::InvalidArgument(format!(
                    "type {} has a property with an empty id",
                    self.id
                )));
            }
            if !seen.insert(prop.id.as_str()) {
                return Err(StoreError::InvalidArgument(format!(
                    "type {} has duplicate property id {}",
                    self.id, prop.id
                )));
            }
        }

        let keys: Vec<&TypeProperty> = self.properties.iter().filter(|p| p.is_key).collect();
        match keys.as_slice() {
            [key] if key.code == TypeCode::Int32 => Ok(()),
            [key] => Err(StoreError::InvalidArgument(format!(
                "key property {} of type {} must be Int32",
                key.id, self.id
            ))),
            [] => Err(StoreError::InvalidArgument(format!(
                "type {} has no key property",
                self.id
            ))),
            _ => Err(StoreError::InvalidArgument(format!(
                "type {} has more than one key property",
                self.id
            ))),
        }
    }

    /// Returns the designated key property, if the type has one.
    pub fn key_property(&self) -> Option<&TypeProperty> {
        self.properties.iter().find(|p| p.is_key)
    }

    /// Looks up a property by id.
    pub fn property(&self, id: &str) -> Option<&TypeProperty> {
        self.properties.iter().find(|p| p.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_type(properties: Vec<TypeProperty>) -> EventType {
        EventType::new("sample", "Sample", "A sample type", properties)
    }

    #[test]
    fn test_valid_type() {
        let t = sample_type(vec![
            TypeProperty::key("Order", TypeCode::Int32),
            TypeProperty::new("Value", TypeCode::Double),
        ]);
        assert!(t.validate().is_ok());
        assert_eq!(t.key_property().unwrap().id, "Order");
        assert_eq!(t.property("Value").unwrap().code, TypeCode::Double);
        assert!(t.property("Missing").is_none());
    }

    #[test]
    fn test_missing_key_rejected() {
        let t = sample_type(vec![TypeProperty::new("Value", TypeCode::Double)]);
        match t.validate() {
            Err(StoreError::InvalidArgument(msg)) => assert!(msg.contains("no key property")),
            other => panic!("Expected InvalidArgument, got {:?}", other),
        }
    }

    #[test]
    fn test_multiple_keys_rejected() {
        let t = sample_type(vec![
            TypeProperty::key("A", TypeCode::Int32),
            TypeProperty::key("B", TypeCode::Int32),
        ]);
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_non_int32_key_rejected() {
        let t = sample_type(vec![TypeProperty::key("Order", TypeCode::Double)]);
        match t.validate() {
            Err(StoreError::InvalidArgument(msg)) => assert!(msg.contains("must be Int32")),
            other => panic!("Expected InvalidArgument, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_property_ids_rejected() {
        let t = sample_type(vec![
            TypeProperty::key("Order", TypeCode::Int32),
            TypeProperty::new("Order", TypeCode::Double),
        ]);
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_empty_id_rejected() {
        let t = EventType::new(
            "",
            "Anonymous",
            "",
            vec![TypeProperty::key("Order", TypeCode::Int32)],
        );
        assert!(t.validate().is_err());
    }
}
