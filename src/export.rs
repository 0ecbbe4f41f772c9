//! JSON schema export for editor autocompletion.
//!
//! YAML language servers read JSON Schema, so a config type's schema is
//! emitted in the draft 2020-12 vocabulary:
//!
//! ```json
//! {
//!   "$schema": "https://json-schema.org/draft/2020-12/schema",
//!   "title": "TrainConfig",
//!   "type": "object",
//!   "properties": {
//!     "learning_rate": { "type": "number", "default": 0.0003, "exclusiveMinimum": 0 }
//!   },
//!   "additionalProperties": false
//! }
//! ```
//!
//! Exclusive groups have no JSON Schema keyword; they are listed under the
//! `x-mutually-exclusive` extension key at the root.
//!
//! Schemas are composed at runtime rather than derived from the struct, so
//! there is nothing for `schemars::schema_for!` to read. The document is
//! assembled directly as a [`schemars::Schema`] from the descriptors instead.

use std::path::Path;

use schemars::{Schema, json_schema};
use serde_json::{Map, Value as Json, json};

use crate::descriptor::{Descriptors, FieldDescriptor};
use crate::error::SchemafigError;
use crate::file;
use crate::schema::{Constraints, FieldKind};

pub const DRAFT: &str = "https://json-schema.org/draft/2020-12/schema";

/// Build the JSON schema document for `descriptors`.
pub fn json_schema(descriptors: &Descriptors) -> Schema {
    let mut root = object_schema(descriptors, &[]);
    root.insert("$schema".into(), json!(DRAFT));
    root.insert("title".into(), json!(descriptors.schema_name()));
    if let Some(description) = descriptors.description() {
        root.insert("description".into(), json!(description));
    }
    if !descriptors.groups().is_empty() {
        let groups: Vec<Json> = descriptors
            .groups()
            .iter()
            .map(|g| json!(g.members()))
            .collect();
        root.insert("x-mutually-exclusive".into(), Json::Array(groups));
    }
    root
}

/// Write the schema to `path` as pretty-printed JSON, creating parents.
pub fn write_json_schema(descriptors: &Descriptors, path: &Path) -> Result<(), SchemafigError> {
    let text = to_pretty(descriptors)?;
    file::write_text(path, &text)?;
    tracing::debug!(path = %path.display(), "wrote JSON schema");
    Ok(())
}

pub(crate) fn to_pretty(descriptors: &Descriptors) -> Result<String, SchemafigError> {
    serde_json::to_string_pretty(&json_schema(descriptors))
        .map(|mut s| {
            s.push('\n');
            s
        })
        .map_err(|e| SchemafigError::InvalidValue {
            key: "<schema>".into(),
            reason: e.to_string(),
        })
}

fn object_schema(descriptors: &Descriptors, prefix: &[String]) -> Schema {
    let mut properties = Map::new();
    let mut required = Vec::new();

    let children = descriptors
        .iter()
        .filter(|d| d.path.len() == prefix.len() + 1 && d.path.starts_with(prefix));
    for d in children {
        let Some(name) = d.path.last() else {
            continue;
        };
        let mut property = if d.is_container {
            object_schema(descriptors, &d.path)
        } else {
            leaf_schema(d)
        };
        if let Some(title) = &d.title {
            property.insert("title".into(), json!(title));
        }
        if let Some(description) = &d.description {
            property.insert("description".into(), json!(description));
        }
        if d.is_required() {
            required.push(json!(name));
        }
        properties.insert(name.clone(), property.to_value());
    }

    let mut schema = json_schema!({
        "type": "object",
        "properties": properties,
        "additionalProperties": false,
    });
    if !required.is_empty() {
        schema.insert("required".into(), Json::Array(required));
    }
    schema
}

/// Schema of one leaf's value: kind, nullability, default, and constraints.
/// Validation checks resolved values against exactly this.
pub(crate) fn leaf_schema(d: &FieldDescriptor) -> Schema {
    let mut schema = kind_schema(&d.kind);
    if d.optional {
        if let Some(Json::String(t)) = schema.get("type").cloned() {
            schema.insert("type".into(), json!([t, "null"]));
        }
        if let Some(Json::Array(choices)) = schema.get_mut("enum") {
            choices.push(Json::Null);
        }
    }
    if let Some(default) = &d.default
        && let Ok(value) = serde_json::to_value(default)
    {
        schema.insert("default".into(), value);
    }
    add_constraints(&mut schema, &d.kind, &d.constraints);
    Schema::from(schema)
}

fn kind_schema(kind: &FieldKind) -> Map<String, Json> {
    let mut schema = Map::new();
    match kind {
        FieldKind::Bool => {
            schema.insert("type".into(), json!("boolean"));
        }
        FieldKind::Integer => {
            schema.insert("type".into(), json!("integer"));
        }
        FieldKind::Float => {
            schema.insert("type".into(), json!("number"));
        }
        FieldKind::String => {
            schema.insert("type".into(), json!("string"));
        }
        FieldKind::Choice(choices) => {
            schema.insert("type".into(), json!("string"));
            schema.insert("enum".into(), json!(choices));
        }
        FieldKind::List(inner) => {
            schema.insert("type".into(), json!("array"));
            schema.insert("items".into(), Json::Object(kind_schema(inner)));
        }
        FieldKind::Map(value) => {
            schema.insert("type".into(), json!("object"));
            if **value != FieldKind::Any {
                schema.insert("additionalProperties".into(), Json::Object(kind_schema(value)));
            }
        }
        FieldKind::Nested(_) => {
            schema.insert("type".into(), json!("object"));
        }
        FieldKind::Any => {}
    }
    schema
}

fn add_constraints(schema: &mut Map<String, Json>, kind: &FieldKind, c: &Constraints) {
    let bounds = [
        ("exclusiveMinimum", c.gt),
        ("minimum", c.ge),
        ("exclusiveMaximum", c.lt),
        ("maximum", c.le),
    ];
    for (keyword, bound) in bounds {
        if let Some(b) = bound {
            schema.insert(keyword.into(), number(b));
        }
    }

    let (min_key, max_key) = match kind {
        FieldKind::List(_) => ("minItems", "maxItems"),
        FieldKind::Map(_) => ("minProperties", "maxProperties"),
        _ => ("minLength", "maxLength"),
    };
    if let Some(n) = c.min_length {
        schema.insert(min_key.into(), json!(n));
    }
    if let Some(n) = c.max_length {
        schema.insert(max_key.into(), json!(n));
    }
}

/// Whole bounds are written as integers (`0`, not `0.0`).
fn number(n: f64) -> Json {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        json!(n as i64)
    } else {
        json!(n)
    }
}
