//! Write configs back to YAML.
//!
//! The output is plain YAML of the serialized config: every field, no
//! include directives. Loading a saved file reproduces the same config.

use std::path::Path;

use serde::Serialize;

use crate::error::SchemafigError;
use crate::file;

/// Serialize `config` to a YAML string.
pub fn to_yaml<S: Serialize>(config: &S) -> Result<String, SchemafigError> {
    serde_yaml::to_string(config).map_err(|e| SchemafigError::InvalidValue {
        key: "<config>".into(),
        reason: e.to_string(),
    })
}

/// Serialize `config` and write it to `path`, creating parent directories.
pub fn save_yaml<S: Serialize>(config: &S, path: &Path) -> Result<(), SchemafigError> {
    let text = to_yaml(config)?;
    file::write_text(path, &text)?;
    tracing::debug!(path = %path.display(), "saved config");
    Ok(())
}
