//! Convert dotted-key assignments into a nested [`Document`], and look paths
//! back up.
//!
//! Each `("database.url", Value)` pair is expanded into the nested mapping
//! structure needed for deep-merge with other layers. This is the inverse of
//! the descriptor walker's flattening: splitting a leaf's dotted path on `.`
//! gives back exactly the keys the walker joined.

use serde_yaml::{Mapping, Value};

use crate::Document;

/// Convert dotted-key assignments into a nested document.
///
/// `("database.url", "pg://")` becomes `{database: {url: "pg://"}}`.
///
/// If multiple entries target the same key, the last one wins. An
/// intermediate key that currently holds a non-mapping value is replaced by
/// a mapping.
pub fn overrides_to_document(entries: &[(String, Value)]) -> Document {
    let mut doc = Document::new();
    for (dotted_key, value) in entries {
        let segments: Vec<&str> = dotted_key.split('.').collect();
        set_path(&mut doc, &segments, value.clone());
    }
    doc
}

/// Assign `value` at `path`, creating intermediate mappings as needed.
pub fn set_path<S: AsRef<str>>(doc: &mut Document, path: &[S], value: Value) {
    let Some((leaf, parents)) = path.split_last() else {
        return;
    };

    let mut current = doc;
    for segment in parents {
        let slot = current
            .entry(Value::from(segment.as_ref()))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
        if !slot.is_mapping() {
            *slot = Value::Mapping(Mapping::new());
        }
        current = match slot {
            Value::Mapping(next) => next,
            _ => return,
        };
    }
    current.insert(Value::from(leaf.as_ref()), value);
}

/// Look up the value at `path`, descending through nested mappings.
pub fn get_path<'a, S: AsRef<str>>(doc: &'a Document, path: &[S]) -> Option<&'a Value> {
    let (leaf, parents) = path.split_last()?;
    let mut current = doc;
    for segment in parents {
        current = current.get(segment.as_ref())?.as_mapping()?;
    }
    current.get(leaf.as_ref())
}
