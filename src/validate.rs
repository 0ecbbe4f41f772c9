//! Type validation of the merged document.
//!
//! Validation runs in two passes. [`check_document`] walks the descriptors
//! for the document's shape (sections are mappings, required leaves are
//! present, strict mode has no undeclared keys) and hands every present leaf
//! to `jsonschema`, checked against the same per-field schema that
//! `config schema` exports. Every failure is collected rather than stopping
//! at the first. Only when that passes does [`deserialize`] hand the
//! document to the config type's `Deserialize` impl. In strict mode, keys
//! that the type does not consume (detected with `serde_ignored`) are
//! reported as field errors too.

use std::fmt;

use serde_yaml::{Mapping, Value};

use crate::Document;
use crate::descriptor::{Descriptors, FieldDescriptor};
use crate::export;
use crate::overrides::get_path;
use crate::schema::{FieldKind, Settings};

/// One failed field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    /// Dotted path of the field; empty for whole-document errors.
    pub path: String,
    pub message: String,
}

/// Every field error of one validation pass over a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationErrors {
    pub schema: String,
    pub errors: Vec<FieldError>,
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.errors.len();
        write!(
            f,
            "{n} validation error{} for {}",
            if n == 1 { "" } else { "s" },
            self.schema
        )?;
        for error in &self.errors {
            if error.path.is_empty() {
                write!(f, "\n  {}", error.message)?;
            } else {
                write!(f, "\n  {}: {}", error.path, error.message)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Short name of a value's YAML kind, for error messages.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

/// Check `document` against every descriptor.
///
/// In strict mode, keys that do not correspond to a declared field are
/// errors. Values of `map` and `any` fields are never inspected for keys.
pub fn check_document(
    descriptors: &Descriptors,
    document: &Document,
    strict: bool,
) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();
    // Sections whose value is not a mapping; their children are not reported.
    let mut broken: Vec<String> = Vec::new();

    for descriptor in descriptors.iter() {
        let dotted = descriptor.dotted();
        if broken
            .iter()
            .any(|prefix| dotted.starts_with(&format!("{prefix}.")))
        {
            continue;
        }
        let value = get_path(document, &descriptor.path);

        if descriptor.is_container {
            if let Some(v) = value
                && !v.is_mapping()
            {
                errors.push(FieldError {
                    path: dotted.clone(),
                    message: format!("expected a mapping, found {}", value_kind(v)),
                });
                broken.push(dotted);
            }
            continue;
        }

        match value {
            None if descriptor.is_required() => errors.push(FieldError {
                path: dotted,
                message: "field required".into(),
            }),
            None => {}
            Some(v) => errors.extend(check_leaf(descriptor, v).into_iter().map(|message| {
                FieldError {
                    path: dotted.clone(),
                    message,
                }
            })),
        }
    }

    if strict {
        unknown_keys(descriptors, document, &mut Vec::new(), &mut errors);
    }

    tracing::debug!(
        schema = descriptors.schema_name(),
        errors = errors.len(),
        strict,
        "checked document"
    );
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors {
            schema: descriptors.schema_name().to_string(),
            errors,
        })
    }
}

/// Every message for one present leaf; empty when the value is valid.
fn check_leaf(descriptor: &FieldDescriptor, value: &Value) -> Vec<String> {
    if let Some(n) = value.as_f64()
        && !n.is_finite()
    {
        return if descriptor.constraints.has_bounds() {
            vec![format!(
                "{n} is not a finite number ({})",
                descriptor.constraints.rules().join(", ")
            )]
        } else {
            Vec::new()
        };
    }
    if let Some(message) = fractional_integer(&descriptor.kind, value) {
        return vec![message];
    }

    let instance = match serde_json::to_value(value) {
        Ok(instance) => instance,
        Err(e) => return vec![format!("cannot be checked: {e}")],
    };
    let schema = export::leaf_schema(descriptor).to_value();
    let validator = match jsonschema::validator_for(&schema) {
        Ok(validator) => validator,
        Err(e) => return vec![format!("invalid field schema: {e}")],
    };
    validator
        .iter_errors(&instance)
        .map(|e| e.to_string())
        .collect()
}

/// JSON Schema counts `3.0` as an integer; the YAML codec does not.
fn fractional_integer(kind: &FieldKind, value: &Value) -> Option<String> {
    match (kind, value) {
        (FieldKind::Integer, Value::Number(n)) if n.is_f64() => {
            Some(format!("{n} is not of type \"integer\""))
        }
        (FieldKind::List(inner), Value::Sequence(items)) => {
            items.iter().enumerate().find_map(|(i, item)| {
                fractional_integer(inner, item).map(|m| format!("item {i}: {m}"))
            })
        }
        (FieldKind::Map(inner), Value::Mapping(entries)) => {
            entries.iter().find_map(|(key, item)| {
                fractional_integer(inner, item)
                    .map(|m| format!("{}: {m}", key.as_str().unwrap_or("<key>")))
            })
        }
        _ => None,
    }
}

fn unknown_keys(
    descriptors: &Descriptors,
    mapping: &Mapping,
    prefix: &mut Vec<String>,
    errors: &mut Vec<FieldError>,
) {
    for (key, value) in mapping {
        let Some(key) = key.as_str() else {
            errors.push(FieldError {
                path: prefix.join("."),
                message: format!("keys must be strings, found {}", value_kind(key)),
            });
            continue;
        };
        prefix.push(key.to_string());
        let dotted = prefix.join(".");
        match descriptors.get(&dotted) {
            None => errors.push(FieldError {
                path: dotted,
                message: "unknown field".into(),
            }),
            Some(d) if d.is_container => {
                if let Value::Mapping(inner) = value {
                    unknown_keys(descriptors, inner, prefix, errors);
                }
            }
            Some(_) => {}
        }
        prefix.pop();
    }
}

/// Deserialize a checked document into `C`.
pub fn deserialize<C: Settings>(
    descriptors: &Descriptors,
    document: Document,
    strict: bool,
) -> Result<C, ValidationErrors> {
    let mut ignored: Vec<String> = Vec::new();
    let result: Result<C, serde_yaml::Error> =
        serde_ignored::deserialize(Value::Mapping(document), |path| {
            ignored.push(path.to_string());
        });

    let fail = |errors: Vec<FieldError>| ValidationErrors {
        schema: descriptors.schema_name().to_string(),
        errors,
    };

    let config = result.map_err(|e| {
        fail(vec![FieldError {
            path: String::new(),
            message: e.to_string(),
        }])
    })?;

    if !ignored.is_empty() {
        if strict {
            return Err(fail(
                ignored
                    .into_iter()
                    .map(|path| FieldError {
                        path,
                        message: "not consumed by the config type".into(),
                    })
                    .collect(),
            ));
        }
        tracing::trace!(keys = ?ignored, "keys ignored during deserialization");
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::describe;
    use crate::fixtures::test::{CompoundConfig, RequiredConfig, TestConfig, TypedMapConfig};
    use crate::merge::deep_merge;
    use crate::schema::{Field, Schema};
    use serde::Deserialize;

    fn merged<C: Settings>(yaml: &str) -> (std::sync::Arc<Descriptors>, Document) {
        let d = describe::<C>().unwrap();
        let overlay: Document = serde_yaml::from_str(yaml).unwrap();
        let doc = deep_merge(d.defaults(), overlay);
        (d, doc)
    }

    fn errors_of<C: Settings>(yaml: &str) -> Vec<FieldError> {
        let (d, doc) = merged::<C>(yaml);
        check_document(&d, &doc, true).unwrap_err().errors
    }

    fn paths(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|e| e.path.as_str()).collect()
    }

    #[test]
    fn defaults_are_valid() {
        let (d, doc) = merged::<TestConfig>("{}");
        assert!(check_document(&d, &doc, true).is_ok());
    }

    #[test]
    fn wrong_type_names_path_and_kind() {
        let errors = errors_of::<TestConfig>("port: eighty");
        assert_eq!(paths(&errors), vec!["port"]);
        assert!(errors[0].message.contains("eighty"));
        assert!(errors[0].message.contains("integer"));
    }

    #[test]
    fn errors_are_aggregated() {
        let errors = errors_of::<TestConfig>(
            "port: 0\nrate: 2.0\ndebug: yes please\ndatabase: {pool_size: 0}",
        );
        assert_eq!(paths(&errors), vec!["port", "debug", "rate", "database.pool_size"]);
        assert!(errors.iter().all(|e| !e.message.is_empty()));
    }

    #[test]
    fn float_field_accepts_integer() {
        let (d, doc) = merged::<TestConfig>("rate: 1");
        assert!(check_document(&d, &doc, true).is_ok());
    }

    #[test]
    fn integer_field_rejects_float() {
        let errors = errors_of::<TestConfig>("port: 80.5");
        assert_eq!(errors[0].message, "80.5 is not of type \"integer\"");
        let errors = errors_of::<TestConfig>("port: 3.0");
        assert_eq!(paths(&errors), vec!["port"]);
    }

    #[test]
    fn null_requires_optional() {
        let (d, doc) = merged::<TestConfig>("database: {url: null}");
        assert!(check_document(&d, &doc, true).is_ok());
        let errors = errors_of::<TestConfig>("host: null");
        assert_eq!(paths(&errors), vec!["host"]);
        assert!(errors[0].message.contains("null"));
    }

    #[test]
    fn required_fields_are_reported() {
        let errors = errors_of::<RequiredConfig>("{}");
        assert_eq!(paths(&errors), vec!["distribution", "seed"]);
        assert!(errors.iter().all(|e| e.message == "field required"));
    }

    #[test]
    fn choice_rejects_other_literal() {
        let errors = errors_of::<RequiredConfig>("distribution: poisson\nseed: 1");
        assert_eq!(paths(&errors), vec!["distribution"]);
        assert!(errors[0].message.contains("poisson"));
    }

    #[test]
    fn list_items_are_checked() {
        let errors = errors_of::<CompoundConfig>("numbers: [1, two, 3]");
        assert_eq!(paths(&errors), vec!["numbers"]);
        assert!(errors[0].message.contains("two"));
        let errors = errors_of::<CompoundConfig>("numbers: [1, 2.5]");
        assert_eq!(errors[0].message, "item 1: 2.5 is not of type \"integer\"");
    }

    #[test]
    fn section_must_be_mapping() {
        let errors = errors_of::<TestConfig>("database: off");
        assert_eq!(
            errors,
            vec![FieldError {
                path: "database".into(),
                message: "expected a mapping, found string".into(),
            }]
        );
    }

    #[test]
    fn unknown_keys_only_in_strict_mode() {
        let (d, doc) = merged::<TestConfig>("typo: 1\ndatabase: {typo2: 2}");
        let errors = check_document(&d, &doc, true).unwrap_err().errors;
        assert_eq!(paths(&errors), vec!["database.typo2", "typo"]);
        assert!(errors.iter().all(|e| e.message == "unknown field"));
        assert!(check_document(&d, &doc, false).is_ok());
    }

    #[test]
    fn free_form_values_are_not_key_checked() {
        let (d, doc) = merged::<CompoundConfig>("my_dict: {anything: 1}\nextra: {deep: {x: 1}}");
        assert!(check_document(&d, &doc, true).is_ok());
    }

    #[test]
    fn non_finite_number_violates_bounds() {
        let errors = errors_of::<TestConfig>("rate: .nan");
        assert_eq!(paths(&errors), vec!["rate"]);
        assert!(errors[0].message.contains("not a finite number"));
        let errors = errors_of::<TestConfig>("rate: -.inf");
        assert_eq!(paths(&errors), vec!["rate"]);
    }

    #[test]
    fn non_finite_number_without_bounds_is_accepted() {
        let (d, doc) = merged::<CompoundConfig>("inner: {favourite_number: .nan}");
        assert!(check_document(&d, &doc, true).is_ok());
    }

    #[test]
    fn typed_map_values_are_checked() {
        let (d, doc) = merged::<TypedMapConfig>("counts: {a: 1, b: 2}");
        assert!(check_document(&d, &doc, true).is_ok());

        let errors = errors_of::<TypedMapConfig>("counts: {name: Maria}");
        assert_eq!(paths(&errors), vec!["counts"]);
        assert!(errors[0].message.contains("Maria"));

        let errors = errors_of::<TypedMapConfig>("counts: {a: 1.5}");
        assert_eq!(errors[0].message, "a: 1.5 is not of type \"integer\"");
    }

    #[test]
    fn length_constraints() {
        let schema = Schema::new("Named")
            .field(Field::string("name").default("ab").min_length(2).max_length(4))
            .field(Field::list("ids", crate::schema::FieldKind::Integer).default(vec![1]).min_length(1));
        let d = Descriptors::from_schema(&schema).unwrap();
        let doc: Document = serde_yaml::from_str("name: abcdef\nids: []").unwrap();
        let errors = check_document(&d, &doc, true).unwrap_err().errors;
        assert_eq!(paths(&errors), vec!["name", "ids"]);
        assert!(errors[0].message.contains("abcdef"));
    }

    #[test]
    fn display_is_multi_line_report() {
        let report = ValidationErrors {
            schema: "TestConfig".into(),
            errors: vec![
                FieldError {
                    path: "port".into(),
                    message: "field required".into(),
                },
                FieldError {
                    path: "rate".into(),
                    message: "must be less than or equal to 1".into(),
                },
            ],
        };
        assert_eq!(
            report.to_string(),
            "2 validation errors for TestConfig\n  port: field required\n  rate: must be less than or equal to 1"
        );
    }

    #[test]
    fn deserialize_checked_document() {
        let (d, doc) = merged::<TestConfig>("port: 3000\ndatabase: {url: pg://x}");
        let config: TestConfig = deserialize(&d, doc, true).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.database.url.as_deref(), Some("pg://x"));
        assert_eq!(config.database.pool_size, 5);
    }

    #[derive(Debug, Deserialize)]
    struct Narrow {
        #[allow(dead_code)]
        kept: i64,
    }

    impl Settings for Narrow {
        fn schema() -> Schema {
            Schema::new("Narrow")
                .field(Field::integer("kept").default(1))
                .field(Field::integer("dropped").default(2))
        }
    }

    #[test]
    fn keys_the_type_ignores_fail_in_strict_mode() {
        let (d, doc) = merged::<Narrow>("{}");
        let err = deserialize::<Narrow>(&d, doc.clone(), true).unwrap_err();
        assert_eq!(paths(&err.errors), vec!["dropped"]);
        assert!(deserialize::<Narrow>(&d, doc, false).is_ok());
    }
}
