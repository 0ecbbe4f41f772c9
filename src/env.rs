//! Environment variable layer.
//!
//! With a prefix of `APP`, the variable `APP__DATABASE__POOL_SIZE=20` sets
//! `database.pool_size`. Double underscore `__` separates nesting levels;
//! a single `_` is part of the field name. Segments are lowercased.
//!
//! Only variables that name a declared leaf are used, and their values are
//! coerced to the leaf's kind exactly like command-line tokens. Anything
//! else under the prefix is ignored.

use serde_yaml::Value;

use crate::Document;
use crate::args::coerce_leaf;
use crate::descriptor::Descriptors;
use crate::error::SchemafigError;
use crate::overrides::overrides_to_document;

/// Build the env layer from variables matching `{PREFIX}__*`.
///
/// Takes an iterator so tests can pass synthetic data instead of
/// `std::env::vars()`.
pub fn env_to_document(
    prefix: &str,
    vars: impl IntoIterator<Item = (String, String)>,
    descriptors: &Descriptors,
) -> Result<Document, SchemafigError> {
    let needle = format!("{prefix}__");
    let mut assignments: Vec<(String, Value)> = Vec::new();

    for (key, raw) in vars {
        let Some(rest) = key.strip_prefix(&needle) else {
            continue;
        };
        if rest.is_empty() {
            continue;
        }

        let dotted = rest
            .split("__")
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(".");
        let Some(descriptor) = descriptors.get(&dotted).filter(|d| !d.is_container) else {
            tracing::trace!(var = %key, "ignoring env var with no matching field");
            continue;
        };

        let value = coerce_leaf(descriptor, &raw).map_err(|reason| {
            SchemafigError::InvalidEnvValue {
                var: key.clone(),
                value: raw.clone(),
                reason,
            }
        })?;
        assignments.push((dotted, value));
    }

    // Environment order is unspecified; sort for a stable layer.
    assignments.sort_by(|a, b| a.0.cmp(&b.0));
    tracing::debug!(prefix, vars = assignments.len(), "collected env layer");
    Ok(overrides_to_document(&assignments))
}
