//! # Flattened Schemas
//!
//! A resource's JSON Schema, reduced to a flat map of dot/bracket property
//! paths to primitive descriptors. Nested objects flatten to `address.city`,
//! arrays of objects to `phones[*].number`, arrays of primitives to a
//! multi-valued descriptor at the array's own path.
//!
//! Derived once per resource configuration; read-only input to the grammar
//! compiler.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ParseError;

/// Primitive JSON-Schema types the grammar knows how to coerce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    String,
    Integer,
    Number,
    Boolean,
}

/// The primitive descriptor of one flattened property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    pub kind: PrimitiveKind,
    /// `true` when the property itself is array-typed in the schema.
    pub multi_valued: bool,
    pub enum_values: Option<Vec<Value>>,
    pub pattern: Option<String>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: Option<f64>,
    pub exclusive_maximum: Option<f64>,
    pub multiple_of: Option<f64>,
}

impl PropertyDescriptor {
    /// A plain single-valued property with no constraints.
    pub fn scalar(kind: PrimitiveKind) -> Self {
        Self {
            kind,
            multi_valued: false,
            enum_values: None,
            pattern: None,
            min_length: None,
            max_length: None,
            minimum: None,
            maximum: None,
            exclusive_minimum: None,
            exclusive_maximum: None,
            multiple_of: None,
        }
    }

    /// An array-typed property with the given element kind.
    pub fn array_of(kind: PrimitiveKind) -> Self {
        Self {
            multi_valued: true,
            ..Self::scalar(kind)
        }
    }
}

/// Flat map from property path to descriptor, ordered by path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlattenedSchema {
    properties: BTreeMap<String, PropertyDescriptor>,
}

impl FlattenedSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, descriptor: PropertyDescriptor) {
        self.properties.insert(name.to_string(), descriptor);
    }

    pub fn get(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Property paths in ascending order.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyDescriptor)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Flatten a JSON Schema of `type: object` into property paths.
    pub fn from_json_schema(schema: &Value) -> Result<Self, ParseError> {
        let mut flattened = Self::new();
        flatten_into("", schema, false, &mut flattened)?;
        if flattened.is_empty() {
            return Err(ParseError::Schema("schema has no parseable properties".into()));
        }
        Ok(flattened)
    }
}

fn flatten_into(
    prefix: &str,
    schema: &Value,
    multi: bool,
    out: &mut FlattenedSchema,
) -> Result<(), ParseError> {
    let kind = schema
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| ParseError::Schema(format!("property '{}' has no type", prefix)))?;

    match kind {
        "object" => {
            let properties = schema
                .get("properties")
                .and_then(Value::as_object)
                .ok_or_else(|| {
                    ParseError::Schema(format!("object '{}' has no properties", prefix))
                })?;
            for (name, sub) in properties {
                let path = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{}.{}", prefix, name)
                };
                flatten_into(&path, sub, multi, out)?;
            }
        }
        "array" => {
            let items = schema.get("items").ok_or_else(|| {
                ParseError::Schema(format!("array '{}' has no items", prefix))
            })?;
            let item_type = items.get("type").and_then(Value::as_str);
            if item_type == Some("object") {
                flatten_into(&format!("{}[*]", prefix), items, true, out)?;
            } else {
                // Primitive array: the array path itself becomes multi-valued.
                let mut descriptor = descriptor_from(items, item_type, prefix)?;
                descriptor.multi_valued = true;
                out.insert(prefix, descriptor);
            }
        }
        _ => {
            let mut descriptor = descriptor_from(schema, Some(kind), prefix)?;
            descriptor.multi_valued = multi;
            out.insert(prefix, descriptor);
        }
    }
    Ok(())
}

fn descriptor_from(
    schema: &Value,
    kind: Option<&str>,
    path: &str,
) -> Result<PropertyDescriptor, ParseError> {
    let kind = match kind {
        Some("string") => PrimitiveKind::String,
        Some("integer") => PrimitiveKind::Integer,
        Some("number") => PrimitiveKind::Number,
        Some("boolean") => PrimitiveKind::Boolean,
        other => {
            return Err(ParseError::Schema(format!(
                "property '{}' has unsupported type {:?}",
                path, other
            )))
        }
    };

    let mut descriptor = PropertyDescriptor::scalar(kind);
    descriptor.enum_values = schema.get("enum").and_then(Value::as_array).cloned();
    descriptor.pattern = schema
        .get("pattern")
        .and_then(Value::as_str)
        .map(str::to_string);
    descriptor.min_length = schema.get("minLength").and_then(Value::as_u64);
    descriptor.max_length = schema.get("maxLength").and_then(Value::as_u64);
    descriptor.minimum = schema.get("minimum").and_then(Value::as_f64);
    descriptor.maximum = schema.get("maximum").and_then(Value::as_f64);
    descriptor.exclusive_minimum = schema.get("exclusiveMinimum").and_then(Value::as_f64);
    descriptor.exclusive_maximum = schema.get("exclusiveMaximum").and_then(Value::as_f64);
    descriptor.multiple_of = schema.get("multipleOf").and_then(Value::as_f64);
    Ok(descriptor)
}
