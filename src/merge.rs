use serde_yaml::Value;

use crate::Document;

/// Deep-merge `overlay` on top of `base`.
/// If both sides have a mapping for the same key, recurse.
/// Otherwise, `overlay`'s value wins (scalars and sequences replace wholesale).
pub fn deep_merge(mut base: Document, overlay: Document) -> Document {
    for (key, overlay_val) in overlay {
        let merged = match (base.get_mut(&key), overlay_val) {
            (Some(Value::Mapping(base_map)), Value::Mapping(overlay_map)) => {
                Value::Mapping(deep_merge(std::mem::take(base_map), overlay_map))
            }
            (_, overlay_val) => overlay_val,
        };
        base.insert(key, merged);
    }
    base
}

/// Merge layers in precedence order: first = lowest priority, last = highest.
pub fn merge_all<I: IntoIterator<Item = Document>>(layers: I) -> Document {
    layers.into_iter().fold(Document::new(), deep_merge)
}
