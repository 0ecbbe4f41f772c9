//! Config operations: template generation, key lookup, listing, the flag
//! table, diffs against defaults, and result types.
//!
//! Provides the logic behind `config list`, `config gen`, `config get`,
//! `config flags`, and `config diff`, plus the `ConfigResult` enum that
//! callers use to display results. Everything here works from descriptors
//! and resolved documents, so none of it needs the typed config.

use std::fmt;
use std::path::PathBuf;

use serde_yaml::Value;

use crate::Document;
use crate::args::flag_name;
use crate::descriptor::{Descriptors, FieldDescriptor};
use crate::error::SchemafigError;
use crate::exclusive::values_equal;
use crate::flatten;
use crate::overrides::get_path;
use crate::schema::FieldKind;

/// Result of a config operation. Returned to the caller for display.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigResult {
    /// A generated YAML template string.
    Template(String),
    /// Confirmation that a template or schema was written to a file.
    Written { path: PathBuf },
    /// A key's resolved value and its description.
    KeyValue {
        key: String,
        value: String,
        doc: Vec<String>,
    },
    /// All resolved configuration key-value pairs.
    Listing { entries: Vec<(String, String)> },
    /// A pretty-printed JSON schema.
    Schema(String),
    /// The rendered flag table.
    Flags(String),
    /// Leaves whose resolved value differs from the default, as
    /// `(key, default, value)`.
    Diff { entries: Vec<(String, String, String)> },
}

impl fmt::Display for ConfigResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigResult::Template(t) | ConfigResult::Schema(t) | ConfigResult::Flags(t) => {
                write!(f, "{t}")
            }
            ConfigResult::Written { path } => write!(f, "Written to {}", path.display()),
            ConfigResult::KeyValue { key, value, doc } => {
                for line in doc {
                    writeln!(f, "# {line}")?;
                }
                write!(f, "{key}: {value}")
            }
            ConfigResult::Listing { entries } => {
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                Ok(())
            }
            ConfigResult::Diff { entries } => {
                if entries.is_empty() {
                    return write!(f, "No changes from defaults");
                }
                for (i, (key, default, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{key}: {default} -> {value}")?;
                }
                Ok(())
            }
        }
    }
}

/// Format a value for display: strings verbatim, everything else as
/// single-line YAML.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => render_inline(other),
    }
}

/// Single-line YAML: scalars as the codec writes them, collections in flow
/// style.
fn render_inline(value: &Value) -> String {
    match value {
        Value::Sequence(items) => {
            let items: Vec<String> = items.iter().map(render_inline).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Mapping(m) => {
            let entries: Vec<String> = m
                .iter()
                .map(|(k, v)| format!("{}: {}", render_inline(k), render_inline(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
        Value::String(text) if text.contains(['\n', '\r']) => {
            serde_json::to_string(text).unwrap_or_else(|_| format!("{text:?}"))
        }
        scalar => serde_yaml::to_string(scalar)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_else(|_| format!("{scalar:?}")),
    }
}

/// Generate a commented YAML template from the schema's descriptions and
/// defaults. Required fields without a default are written commented out.
pub fn generate_template(descriptors: &Descriptors) -> String {
    let mut out = String::new();
    if let Some(description) = descriptors.description() {
        for line in description.lines() {
            out.push_str(&format!("# {line}\n"));
        }
        out.push('\n');
    }

    // A section with no defaulted leaf below it is written as `{}`; its
    // descendants then only appear as comments.
    let mut empty_section: Option<&[String]> = None;
    for d in descriptors.iter() {
        if empty_section.is_some_and(|prefix| !d.path.starts_with(prefix)) {
            empty_section = None;
        }
        let indent = "  ".repeat(d.depth());
        let name = d.path.last().map(String::as_str).unwrap_or_default();
        if let Some(description) = &d.description {
            for line in description.lines() {
                out.push_str(&format!("{indent}# {line}\n"));
            }
        }
        let rules = d.constraints.rules();
        if !rules.is_empty() {
            out.push_str(&format!("{indent}# Constraints: {}\n", rules.join(", ")));
        }
        if let FieldKind::Choice(choices) = &d.kind {
            out.push_str(&format!("{indent}# One of: {}\n", choices.join(", ")));
        }

        if d.is_container {
            if empty_section.is_some() {
                out.push_str(&format!("{indent}# {name}:\n"));
            } else if has_defaulted_leaf(descriptors, &d.path) {
                out.push_str(&format!("{indent}{name}:\n"));
            } else {
                out.push_str(&format!("{indent}{name}: {{}}\n"));
                empty_section = Some(&d.path);
            }
        } else {
            match &d.default {
                Some(default) => {
                    out.push_str(&format!("{indent}{name}: {}\n", render_inline(default)));
                }
                None => {
                    out.push_str(&format!("{indent}# {name}: <{}, required>\n", d.kind.label()));
                }
            }
        }
    }
    out
}

fn has_defaulted_leaf(descriptors: &Descriptors, section: &[String]) -> bool {
    descriptors.leaves().any(|d| {
        d.path.len() > section.len() && d.path.starts_with(section) && d.default.is_some()
    })
}

/// Get a resolved value by dotted key, including its description.
pub fn get_value(
    descriptors: &Descriptors,
    document: &Document,
    key: &str,
) -> Result<ConfigResult, SchemafigError> {
    let path: Vec<&str> = key.split('.').collect();
    let value =
        get_path(document, &path).ok_or_else(|| SchemafigError::KeyNotFound(key.into()))?;

    let doc = descriptors
        .get(key)
        .and_then(|d| d.description.as_deref())
        .map(|text| text.lines().map(str::to_string).collect())
        .unwrap_or_default();

    Ok(ConfigResult::KeyValue {
        key: key.into(),
        value: format_value(value),
        doc,
    })
}

/// List all resolved values as flattened dotted key-value pairs.
pub fn list_values(descriptors: &Descriptors, document: &Document) -> ConfigResult {
    let entries = flatten::flatten(document, descriptors)
        .into_iter()
        .map(|(key, value)| {
            let display = match value {
                Value::Null => "<not set>".to_string(),
                v => format_value(&v),
            };
            (key, display)
        })
        .collect();
    ConfigResult::Listing { entries }
}

/// Leaves whose resolved value differs from the declared default.
/// Required leaves always appear, with `<required>` as their default.
pub fn diff_from_defaults(descriptors: &Descriptors, document: &Document) -> ConfigResult {
    let entries = descriptors
        .leaves()
        .filter_map(|d| {
            let value = get_path(document, &d.path)?;
            match &d.default {
                Some(default) if values_equal(default, value) => None,
                Some(default) => Some((d.dotted(), format_value(default), format_value(value))),
                None => Some((d.dotted(), "<required>".to_string(), format_value(value))),
            }
        })
        .collect();
    ConfigResult::Diff { entries }
}

/// The top-level entries of `document` whose names a callee accepts, minus
/// `exclude`. Useful for forwarding a config's fields as keyword arguments.
pub fn compatible_args(document: &Document, accepted: &[&str], exclude: &[&str]) -> Document {
    document
        .iter()
        .filter(|(key, _)| {
            key.as_str()
                .is_some_and(|k| accepted.contains(&k) && !exclude.contains(&k))
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Render the command-line flag table.
pub fn help_text(descriptors: &Descriptors, hyphenate: bool) -> String {
    let rows: Vec<(String, String)> = descriptors
        .leaves()
        .map(|d| (flag_usage(d, hyphenate), flag_notes(d)))
        .chain(std::iter::once((
            "-h, --help".to_string(),
            "Print this help".to_string(),
        )))
        .collect();
    let width = rows.iter().map(|(flag, _)| flag.len()).max().unwrap_or(0);

    let mut out = format!("Usage: {} [OPTIONS]\n", descriptors.schema_name());
    if let Some(description) = descriptors.description() {
        out.push('\n');
        out.push_str(description);
        out.push('\n');
    }
    out.push_str("\nOptions:\n");
    for (flag, notes) in &rows {
        if notes.is_empty() {
            out.push_str(&format!("  {flag}\n"));
        } else {
            out.push_str(&format!("  {flag:<width$}  {notes}\n"));
        }
    }

    if !descriptors.groups().is_empty() {
        out.push_str("\nMutually exclusive (set at most one):\n");
        for group in descriptors.groups() {
            out.push_str(&format!("  {}\n", group.members().join(", ")));
        }
    }
    out
}

fn flag_usage(d: &FieldDescriptor, hyphenate: bool) -> String {
    let name = flag_name(d, hyphenate);
    match &d.kind {
        FieldKind::Bool => format!("--{name} [true|false]"),
        FieldKind::List(inner) => format!("--{name} <{}>...", inner.label()),
        kind => format!("--{name} <{}>", kind.label()),
    }
}

fn flag_notes(d: &FieldDescriptor) -> String {
    let mut notes = Vec::new();
    if let Some(description) = &d.description {
        notes.push(description.clone());
    }
    match &d.default {
        Some(default) => notes.push(format!("[default: {}]", render_inline(default))),
        None => notes.push("[required]".to_string()),
    }
    let rules = d.constraints.rules();
    if !rules.is_empty() {
        notes.push(format!("[{}]", rules.join(", ")));
    }
    notes.join(" ")
}
