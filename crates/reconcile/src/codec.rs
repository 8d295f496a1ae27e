//! Canonical state <-> wire document mapping.
//!
//! The wire format is a flat JSON object keyed by each attribute's wire name
//! (lowerCamelCase by default), with the identity under `id`. Nested object
//! attributes translate recursively. Fields the schema does not declare are
//! dropped on decode.

use crate::error::{Error, Result};
use crate::schema::{Attribute, Kind, ResourceSchema, coerce_scalar};
use crate::types::{ResourceState, Value, json_int};
use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;

/// Encode a state as a wire document.
///
/// Attributes absent from the state are omitted; `Null` encodes as `null`.
pub fn encode(schema: &ResourceSchema, state: &ResourceState) -> Json {
    let mut doc = Map::new();
    if !state.id.is_empty() {
        doc.insert("id".to_string(), Json::String(state.id.clone()));
    }
    for attr in schema.attributes() {
        if let Some(value) = state.get(&attr.name) {
            doc.insert(attr.wire_name.clone(), to_wire(&attr.kind, value));
        }
    }
    Json::Object(doc)
}

/// Decode a wire document into a state.
///
/// Declared fields missing from the document stay absent; the reconciler
/// fills them with `Null` after a read.
///
/// # Errors
///
/// Returns `Error::Protocol` if the document is not an object or a field
/// cannot be coerced into its attribute's kind.
pub fn decode(schema: &ResourceSchema, wire: &Json) -> Result<ResourceState> {
    let Json::Object(doc) = wire else {
        return Err(protocol(schema, None, format!("expected an object, got {}", json_type(wire))));
    };
    let id = identity(wire).unwrap_or_default();

    let mut state = ResourceState::with_id(id);
    for attr in schema.attributes() {
        let Some(field) = doc.get(&attr.wire_name) else {
            continue;
        };
        let value = from_wire(&attr.kind, field).ok_or_else(|| {
            protocol(
                schema,
                Some(&state.id),
                format!("field {} does not fit {}: {field}", attr.wire_name, attr.kind),
            )
        })?;
        state.attributes.insert(attr.name.clone(), value);
    }
    Ok(state)
}

/// Identity carried by a wire document, if any.
///
/// Numeric identities are accepted and stringified.
pub fn identity(wire: &Json) -> Option<String> {
    match wire.get("id")? {
        Json::String(s) if !s.is_empty() => Some(s.clone()),
        Json::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Body of a create request: every non-computed, non-null attribute.
pub fn create_payload(schema: &ResourceSchema, state: &ResourceState) -> Json {
    let fields = schema
        .attributes()
        .iter()
        .filter(|a| !a.is_computed())
        .filter_map(|a| {
            let value = state.get(&a.name).filter(|v| !v.is_null())?;
            Some((a.wire_name.clone(), to_wire(&a.kind, value)))
        })
        .collect();
    Json::Object(fields)
}

/// Body of an update request: exactly the named attributes.
///
/// `Null` values are sent as `null` so an unset reaches the backend.
pub fn update_payload(schema: &ResourceSchema, state: &ResourceState, names: &[&str]) -> Json {
    let fields = schema
        .attributes()
        .iter()
        .filter(|a| names.contains(&a.name.as_str()))
        .map(|a| {
            let value = state.get(&a.name).cloned().unwrap_or_default();
            (a.wire_name.clone(), to_wire(&a.kind, &value))
        })
        .collect();
    Json::Object(fields)
}

fn to_wire(kind: &Kind, value: &Value) -> Json {
    match (kind, value) {
        (Kind::List(element), Value::List(items)) => {
            Json::Array(items.iter().map(|v| to_wire(element, v)).collect())
        }
        (Kind::Map(element), Value::Map(entries)) => Json::Object(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), to_wire(element, v)))
                .collect(),
        ),
        (Kind::Object(fields), Value::Map(entries)) => Json::Object(
            entries
                .iter()
                .map(|(k, v)| match field(fields, |f| f.name == *k) {
                    Some(f) => (f.wire_name.clone(), to_wire(&f.kind, v)),
                    None => (k.clone(), v.to_json()),
                })
                .collect(),
        ),
        _ => value.to_json(),
    }
}

fn from_wire(kind: &Kind, json: &Json) -> Option<Value> {
    match (kind, json) {
        (_, Json::Null) => Some(Value::Null),
        (Kind::List(element), Json::Array(items)) => items
            .iter()
            .map(|item| from_wire(element, item))
            .collect::<Option<Vec<_>>>()
            .map(Value::List),
        (Kind::Map(element), Json::Object(entries)) => entries
            .iter()
            .map(|(k, v)| Some((k.clone(), from_wire(element, v)?)))
            .collect::<Option<BTreeMap<_, _>>>()
            .map(Value::Map),
        (Kind::Object(fields), Json::Object(entries)) => {
            let mut out = BTreeMap::new();
            for (wire_name, v) in entries {
                if let Some(f) = field(fields, |f| f.wire_name == *wire_name) {
                    out.insert(f.name.clone(), from_wire(&f.kind, v)?);
                }
            }
            Some(Value::Map(out))
        }
        (Kind::String, Json::Number(n)) => Some(Value::String(n.to_string())),
        (Kind::Int | Kind::Bool, Json::Number(n)) => coerce_scalar(kind, &Value::Int(json_int(n)?)),
        (Kind::String | Kind::Int | Kind::Bool, Json::String(s)) => {
            coerce_scalar(kind, &Value::String(s.clone()))
        }
        (Kind::String | Kind::Int | Kind::Bool, Json::Bool(b)) => coerce_scalar(kind, &Value::Bool(*b)),
        _ => None,
    }
}

fn field<'a>(fields: &'a [Attribute], pred: impl Fn(&Attribute) -> bool) -> Option<&'a Attribute> {
    fields.iter().find(|f| pred(f))
}

fn protocol(schema: &ResourceSchema, id: Option<&str>, reason: String) -> Error {
    Error::Protocol {
        resource_type: schema.resource_type().to_string(),
        id: id.filter(|i| !i.is_empty()).map(str::to_string),
        reason,
    }
}

pub(crate) fn json_type(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}
