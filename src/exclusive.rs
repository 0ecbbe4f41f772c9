//! Mutual-exclusion check over the merged document.
//!
//! A group member is *active* when its value differs from its declared
//! default. Numbers compare by value, so `layers: 2.0` is not active against
//! a default of `2`. A member without a default is active once it is present
//! and non-null. At most one member of each group may be active.

use serde_yaml::Value;

use crate::Document;
use crate::descriptor::Descriptors;
use crate::error::SchemafigError;
use crate::overrides::get_path;

pub fn check_exclusive(
    descriptors: &Descriptors,
    document: &Document,
) -> Result<(), SchemafigError> {
    for group in descriptors.groups() {
        let active: Vec<String> = group
            .members()
            .iter()
            .filter(|member| is_active(descriptors, document, member))
            .cloned()
            .collect();
        tracing::trace!(group = ?group.members(), active = ?active, "checked exclusive group");
        if active.len() > 1 {
            return Err(SchemafigError::Exclusivity {
                group: group.members().to_vec(),
                active,
            });
        }
    }
    Ok(())
}

fn is_active(descriptors: &Descriptors, document: &Document, member: &str) -> bool {
    let Some(descriptor) = descriptors.get(member) else {
        return false;
    };
    match (&descriptor.default, get_path(document, &descriptor.path)) {
        (Some(default), Some(value)) => !values_equal(default, value),
        (None, Some(value)) => !value.is_null(),
        (_, None) => false,
    }
}

/// Structural equality where numbers compare by value.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::Sequence(xs), Value::Sequence(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Mapping(xs), Value::Mapping(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}
