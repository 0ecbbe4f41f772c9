//! Include resolution for YAML config files.
//!
//! A mapping may pull in another file through the YAML merge key:
//!
//! ```yaml
//! <<: !include base.yaml
//! learning_rate: 5.0e-5
//! ```
//!
//! The included file's keys populate the mapping, and keys written in the
//! mapping itself win over them. Merging is recursive: a nested mapping in
//! the including file is merged key-by-key into the included one instead of
//! replacing it.
//!
//! Rules:
//!
//! - Include paths are resolved against the directory of the file that
//!   contains the directive, not the process working directory.
//! - Includes are transitive; an included file may include further files.
//! - The `<<` value may also be a plain mapping (e.g. a YAML alias), or a
//!   list of includes/mappings, where earlier entries take precedence.
//! - `!include` is only valid as the `<<` value. Anywhere else it is an
//!   error, as is including a file whose top level is not a mapping.
//! - The chain of files being resolved is tracked by canonical path. Coming
//!   back to a file already on the chain is a circular include.

use std::path::{Path, PathBuf};

use serde_yaml::value::Tag;
use serde_yaml::{Mapping, Value};

use crate::Document;
use crate::error::SchemafigError;
use crate::file;
use crate::merge::deep_merge;
use crate::validate::value_kind;

/// The YAML merge key.
pub const MERGE_KEY: &str = "<<";

/// Tag name of the include directive (written `!include`).
pub const INCLUDE_TAG: &str = "include";

/// Parse `path` and expand every include directive in it.
pub fn resolve_file(path: &Path) -> Result<Document, SchemafigError> {
    IncludeResolver::default().resolve(path, None)
}

fn is_include(tag: &Tag) -> bool {
    tag.to_string().trim_start_matches('!') == INCLUDE_TAG
}

#[derive(Default)]
struct IncludeResolver {
    /// Canonical paths of the files currently being resolved, outermost first.
    chain: Vec<PathBuf>,
}

impl IncludeResolver {
    fn resolve(
        &mut self,
        path: &Path,
        included_from: Option<&Path>,
    ) -> Result<Document, SchemafigError> {
        let canonical = file::canonicalize(path, included_from)?;
        if self.chain.contains(&canonical) {
            let mut chain = self.chain.clone();
            chain.push(canonical);
            return Err(SchemafigError::CircularInclude { chain });
        }

        tracing::debug!(
            path = %path.display(),
            depth = self.chain.len(),
            "resolving config file"
        );
        let content = file::read_text(path, included_from)?;
        let raw: Value = if content.trim().is_empty() {
            Value::Null
        } else {
            serde_yaml::from_str(&content).map_err(|e| SchemafigError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?
        };

        let mapping = match raw {
            Value::Mapping(m) => m,
            Value::Null => Mapping::new(),
            other => {
                return Err(SchemafigError::InvalidInclude {
                    path: path.to_path_buf(),
                    reason: format!(
                        "top-level document must be a mapping, found {}",
                        value_kind(&other)
                    ),
                });
            }
        };

        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        self.chain.push(canonical);
        let result = self.expand_mapping(mapping, &base_dir, path);
        self.chain.pop();
        result
    }

    fn expand_mapping(
        &mut self,
        mapping: Mapping,
        base_dir: &Path,
        current: &Path,
    ) -> Result<Document, SchemafigError> {
        let mut merged_in = None;
        let mut local = Mapping::new();
        for (key, value) in mapping {
            if key.as_str() == Some(MERGE_KEY) {
                merged_in = Some(self.expand_merge_value(value, base_dir, current)?);
            } else {
                let expanded = self.expand_value(value, base_dir, current)?;
                local.insert(key, expanded);
            }
        }
        Ok(match merged_in {
            Some(included) => deep_merge(included, local),
            None => local,
        })
    }

    fn expand_value(
        &mut self,
        value: Value,
        base_dir: &Path,
        current: &Path,
    ) -> Result<Value, SchemafigError> {
        match value {
            Value::Mapping(m) => Ok(Value::Mapping(self.expand_mapping(m, base_dir, current)?)),
            Value::Sequence(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.expand_value(item, base_dir, current)?);
                }
                Ok(Value::Sequence(out))
            }
            Value::Tagged(tagged) if is_include(&tagged.tag) => Err(SchemafigError::InvalidInclude {
                path: current.to_path_buf(),
                reason: format!("!include is only valid as the value of a '{MERGE_KEY}' merge key"),
            }),
            other => Ok(other),
        }
    }

    fn expand_merge_value(
        &mut self,
        value: Value,
        base_dir: &Path,
        current: &Path,
    ) -> Result<Document, SchemafigError> {
        match value {
            Value::Tagged(tagged) if is_include(&tagged.tag) => {
                let Value::String(target) = tagged.value else {
                    return Err(SchemafigError::InvalidInclude {
                        path: current.to_path_buf(),
                        reason: format!(
                            "!include expects a file path, found {}",
                            value_kind(&tagged.value)
                        ),
                    });
                };
                let include_path = file::resolve_relative(base_dir, Path::new(&target));
                self.resolve(&include_path, Some(current))
            }
            Value::Mapping(m) => self.expand_mapping(m, base_dir, current),
            Value::Sequence(items) => {
                let mut merged = Document::new();
                for item in items {
                    let next = self.expand_merge_value(item, base_dir, current)?;
                    // Earlier entries win, so each later one goes underneath.
                    merged = deep_merge(next, merged);
                }
                Ok(merged)
            }
            other => Err(SchemafigError::InvalidInclude {
                path: current.to_path_buf(),
                reason: format!(
                    "'{MERGE_KEY}' expects an !include, a mapping, or a list of them, found {}",
                    value_kind(&other)
                ),
            }),
        }
    }
}
