//! Schema tree walker: flatten a [`Schema`] into ordered field descriptors.
//!
//! Every stage after this one works from the descriptor list rather than the
//! schema itself. The CLI mapper turns each leaf into a `--dotted.path` flag,
//! the validator checks each leaf against the merged document, and the
//! exclusivity pass reads defaults from it.
//!
//! Descriptors come out in declaration order, depth first. A nested field
//! yields a container descriptor immediately followed by its children:
//!
//! ```text
//! host               str
//! database           (container)
//! database.url       str
//! database.pool_size int
//! ```

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use serde_yaml::{Mapping, Value};

use crate::Document;
use crate::error::SchemafigError;
use crate::overrides;
use crate::schema::{Constraints, ExclusiveGroup, FieldKind, Schema, Settings};

/// Nesting deeper than this is treated as a cyclic schema.
pub const MAX_DEPTH: usize = 32;

/// One field of a flattened schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub path: Vec<String>,
    pub kind: FieldKind,
    pub default: Option<Value>,
    pub optional: bool,
    pub is_container: bool,
    pub description: Option<String>,
    pub title: Option<String>,
    pub constraints: Constraints,
}

impl FieldDescriptor {
    pub fn dotted(&self) -> String {
        self.path.join(".")
    }

    /// Nesting depth; top-level fields are at depth 0.
    pub fn depth(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    pub fn is_required(&self) -> bool {
        !self.is_container && self.default.is_none()
    }
}

/// The ordered descriptor list of one schema, with its exclusive groups
/// re-rooted to full dotted paths.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptors {
    schema: String,
    description: Option<String>,
    fields: Vec<FieldDescriptor>,
    groups: Vec<ExclusiveGroup>,
}

impl Descriptors {
    /// Walk `schema` without touching the cache.
    pub fn from_schema(schema: &Schema) -> Result<Self, SchemafigError> {
        let mut fields = Vec::new();
        let mut groups = Vec::new();
        walk(schema, &[], 0, &mut fields, &mut groups)?;

        let descriptors = Self {
            schema: schema.name().to_string(),
            description: schema.description().map(str::to_string),
            fields,
            groups,
        };
        descriptors.check_groups()?;
        Ok(descriptors)
    }

    pub fn schema_name(&self) -> &str {
        &self.schema
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter()
    }

    pub fn leaves(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|d| !d.is_container)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, dotted: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|d| d.dotted() == dotted)
    }

    pub fn groups(&self) -> &[ExclusiveGroup] {
        &self.groups
    }

    /// The document of declared defaults. Containers are always present;
    /// required leaves without a default are left out.
    pub fn defaults(&self) -> Document {
        let entries: Vec<(String, Value)> = self
            .fields
            .iter()
            .filter_map(|d| {
                if d.is_container {
                    Some((d.dotted(), Value::Mapping(Mapping::new())))
                } else {
                    d.default.clone().map(|v| (d.dotted(), v))
                }
            })
            .collect();
        overrides::overrides_to_document(&entries)
    }

    fn check_groups(&self) -> Result<(), SchemafigError> {
        for group in &self.groups {
            if group.members().len() < 2 {
                return Err(self.malformed(format!(
                    "exclusive group [{}] needs at least two members",
                    group.members().join(", ")
                )));
            }
            for member in group.members() {
                match self.get(member) {
                    Some(d) if !d.is_container => {}
                    _ => {
                        return Err(self.malformed(format!(
                            "exclusive group member '{member}' is not a declared leaf field"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn malformed(&self, reason: String) -> SchemafigError {
        SchemafigError::MalformedSchema {
            schema: self.schema.clone(),
            reason,
        }
    }
}

fn walk(
    schema: &Schema,
    prefix: &[String],
    depth: usize,
    fields: &mut Vec<FieldDescriptor>,
    groups: &mut Vec<ExclusiveGroup>,
) -> Result<(), SchemafigError> {
    if depth > MAX_DEPTH {
        return Err(SchemafigError::CyclicSchema {
            path: prefix.join("."),
            depth: MAX_DEPTH,
        });
    }

    let malformed = |reason: String| SchemafigError::MalformedSchema {
        schema: schema.name().to_string(),
        reason,
    };

    let mut seen = HashSet::new();
    for field in schema.fields() {
        let name = field.name();
        if name.is_empty() || name.contains('.') {
            return Err(malformed(format!(
                "field name '{name}' must be non-empty and must not contain '.'"
            )));
        }
        if !seen.insert(name) {
            return Err(malformed(format!("duplicate field '{name}'")));
        }
        if let FieldKind::List(inner) | FieldKind::Map(inner) = &field.kind
            && inner.is_nested()
        {
            return Err(malformed(format!(
                "field '{name}' cannot hold nested schemas as items"
            )));
        }

        let mut path = prefix.to_vec();
        path.push(name.to_string());

        let is_container = field.kind.is_nested();
        fields.push(FieldDescriptor {
            path: path.clone(),
            kind: field.kind.clone(),
            default: if is_container { None } else { field.default.clone() },
            optional: field.optional,
            is_container,
            description: field.description.clone(),
            title: field.title.clone(),
            constraints: field.constraints.clone(),
        });

        if let FieldKind::Nested(child) = &field.kind {
            walk(&child.build(), &path, depth + 1, fields, groups)?;
        }
    }

    for group in schema.groups() {
        let rooted = group.members().iter().map(|member| {
            if prefix.is_empty() {
                member.clone()
            } else {
                format!("{}.{member}", prefix.join("."))
            }
        });
        groups.push(ExclusiveGroup::new(rooted));
    }

    Ok(())
}

type Slot = Arc<Mutex<Option<Arc<Descriptors>>>>;

/// Descriptors for `C`, built on first use and cached for the process
/// lifetime.
///
/// Each type has its own slot. The global map is locked only to find the
/// slot; the slot stays locked while `C::schema()` runs, so a type is walked
/// at most once even under concurrent first access, and a `schema()` that
/// describes *other* types does not block. A `schema()` that describes its
/// own type deadlocks.
pub fn describe<C: Settings>() -> Result<Arc<Descriptors>, SchemafigError> {
    static CACHE: OnceLock<Mutex<HashMap<TypeId, Slot>>> = OnceLock::new();

    let slot = {
        let cache = CACHE.get_or_init(Default::default);
        let mut guard = cache.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(guard.entry(TypeId::of::<C>()).or_default())
    };

    let mut entry = slot.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(found) = entry.as_ref() {
        return Ok(Arc::clone(found));
    }

    let built = Arc::new(Descriptors::from_schema(&C::schema())?);
    tracing::debug!(
        schema = built.schema_name(),
        fields = built.len(),
        groups = built.groups().len(),
        "built field descriptors"
    );
    *entry = Some(Arc::clone(&built));
    Ok(built)
}
