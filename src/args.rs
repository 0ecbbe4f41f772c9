//! Dotted-path command-line mapper.
//!
//! Every leaf of the schema is addressable as `--<dotted.path>`, at any
//! nesting depth:
//!
//! ```text
//! train config.yaml --optimizer.lr 5e-5 --model.layers 4 --tags a b c
//! ```
//!
//! Tokens are coerced to the leaf's declared kind here, so a bad flag value
//! is reported against the flag that carried it. The resulting flat
//! assignments are nested into an override document with
//! [`overrides_to_document`], the inverse of the descriptor walker's
//! flattening.

use std::collections::HashMap;

use serde_yaml::{Mapping, Value};

use crate::Document;
use crate::descriptor::{Descriptors, FieldDescriptor};
use crate::error::SchemafigError;
use crate::overrides::overrides_to_document;
use crate::schema::FieldKind;

/// How the mapper treats flag names it does not know.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgOptions {
    /// Collect unknown flags into [`ParsedArgs::unknown`] instead of failing.
    pub allow_unknown: bool,
    /// Spell `_` in field names as `-` on the command line.
    pub hyphenate: bool,
}

/// Output of [`map_args`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedArgs {
    /// Override document built from the recognised flags.
    pub document: Document,
    /// Unrecognised flags, `name -> value`, when unknown flags are allowed.
    pub unknown: Mapping,
}

/// The flag spelling of a leaf, without the leading `--`.
pub fn flag_name(descriptor: &FieldDescriptor, hyphenate: bool) -> String {
    let name = descriptor.dotted();
    if hyphenate {
        name.replace('_', "-")
    } else {
        name
    }
}

/// Map command-line tokens onto the leaves of `descriptors`.
pub fn map_args<S: AsRef<str>>(
    descriptors: &Descriptors,
    tokens: &[S],
    options: &ArgOptions,
) -> Result<ParsedArgs, SchemafigError> {
    let leaves: HashMap<String, &FieldDescriptor> =
        descriptors.leaves().map(|d| (d.dotted(), d)).collect();
    let lookup = |name: &str| {
        let key = if options.hyphenate {
            name.replace('-', "_")
        } else {
            name.to_string()
        };
        leaves.get(&key).copied()
    };

    let mut cursor = Cursor { tokens, pos: 0 };
    let mut assignments: Vec<(String, Value)> = Vec::new();
    let mut unknown = Mapping::new();

    while let Some(token) = cursor.advance() {
        if token == "-h" || token == "--help" {
            return Err(SchemafigError::HelpRequested {
                text: crate::ops::help_text(descriptors, options.hyphenate),
            });
        }
        let Some(body) = token.strip_prefix("--") else {
            return Err(SchemafigError::UnexpectedArgument {
                token: token.to_string(),
            });
        };
        let (name, inline) = match body.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (body, None),
        };
        let flag = format!("--{name}");

        if let Some(descriptor) = lookup(name) {
            let value = match &descriptor.kind {
                FieldKind::Bool => bool_value(descriptor, &flag, inline, &mut cursor)?,
                FieldKind::List(element) => {
                    list_value(descriptor, element, &flag, inline, &mut cursor)?
                }
                _ => {
                    let raw = match inline {
                        Some(v) => v,
                        None => cursor
                            .next_value()
                            .ok_or_else(|| SchemafigError::MissingValue { flag: flag.clone() })?,
                    };
                    coerce_leaf(descriptor, raw).map_err(|reason| {
                        SchemafigError::InvalidFlagValue {
                            flag: flag.clone(),
                            token: raw.to_string(),
                            reason,
                        }
                    })?
                }
            };
            tracing::trace!(flag = %flag, value = ?value, "mapped flag");
            assignments.push((descriptor.dotted(), value));
        } else if let Some(descriptor) = name
            .strip_prefix("no-")
            .and_then(lookup)
            .filter(|d| d.kind == FieldKind::Bool)
        {
            if let Some(v) = inline {
                return Err(SchemafigError::InvalidFlagValue {
                    flag,
                    token: v.to_string(),
                    reason: "a negated flag takes no value".into(),
                });
            }
            assignments.push((descriptor.dotted(), Value::Bool(false)));
        } else if options.allow_unknown {
            let value = match inline.or_else(|| cursor.next_value()) {
                Some(raw) => parse_loose(raw),
                None => Value::Bool(true),
            };
            unknown.insert(Value::from(name), value);
        } else {
            return Err(SchemafigError::UnknownFlag { flag });
        }
    }

    tracing::debug!(
        assignments = assignments.len(),
        unknown = unknown.len(),
        "mapped command-line arguments"
    );
    Ok(ParsedArgs {
        document: overrides_to_document(&assignments),
        unknown,
    })
}

struct Cursor<'a, S> {
    tokens: &'a [S],
    pos: usize,
}

impl<'a, S: AsRef<str>> Cursor<'a, S> {
    fn advance(&mut self) -> Option<&'a str> {
        let token = self.tokens.get(self.pos)?.as_ref();
        self.pos += 1;
        Some(token)
    }

    fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.pos).map(AsRef::as_ref)
    }

    /// The next token, unless it is another flag.
    fn next_value(&mut self) -> Option<&'a str> {
        match self.peek() {
            Some(token) if !token.starts_with("--") => self.advance(),
            _ => None,
        }
    }
}

fn bool_value<S: AsRef<str>>(
    descriptor: &FieldDescriptor,
    flag: &str,
    inline: Option<&str>,
    cursor: &mut Cursor<'_, S>,
) -> Result<Value, SchemafigError> {
    if let Some(raw) = inline {
        return coerce_flag(&FieldKind::Bool, descriptor.optional, flag, raw);
    }
    if let Some(b) = cursor.peek().and_then(parse_bool) {
        cursor.advance();
        return Ok(Value::Bool(b));
    }
    let toggled = match &descriptor.default {
        Some(Value::Bool(default)) => !default,
        _ => true,
    };
    Ok(Value::Bool(toggled))
}

fn list_value<S: AsRef<str>>(
    descriptor: &FieldDescriptor,
    element: &FieldKind,
    flag: &str,
    inline: Option<&str>,
    cursor: &mut Cursor<'_, S>,
) -> Result<Value, SchemafigError> {
    let mut raw = Vec::new();
    match inline {
        Some(v) => raw.push(v),
        None => {
            while let Some(v) = cursor.next_value() {
                raw.push(v);
            }
        }
    }

    match raw.as_slice() {
        [] => Err(SchemafigError::MissingValue {
            flag: flag.to_string(),
        }),
        ["null"] if descriptor.optional => Ok(Value::Null),
        tokens => tokens
            .iter()
            .map(|t| coerce_flag(element, false, flag, t))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Sequence),
    }
}

fn coerce_flag(
    kind: &FieldKind,
    optional: bool,
    flag: &str,
    token: &str,
) -> Result<Value, SchemafigError> {
    coerce(kind, optional, token).map_err(|reason| SchemafigError::InvalidFlagValue {
        flag: flag.to_string(),
        token: token.to_string(),
        reason,
    })
}

/// Coerce a token for a scalar leaf. A bounded number must be finite, so
/// `nan` and `inf` are rejected before they reach validation.
pub(crate) fn coerce_leaf(descriptor: &FieldDescriptor, token: &str) -> Result<Value, String> {
    let value = coerce(&descriptor.kind, descriptor.optional, token)?;
    if descriptor.constraints.has_bounds()
        && value.as_f64().is_some_and(|n| !n.is_finite())
    {
        return Err(format!(
            "expected a finite number ({})",
            descriptor.constraints.rules().join(", ")
        ));
    }
    Ok(value)
}

/// Coerce one textual token to `kind`. Shared by the CLI and env layers.
pub(crate) fn coerce(kind: &FieldKind, optional: bool, token: &str) -> Result<Value, String> {
    if optional && token == "null" {
        return Ok(Value::Null);
    }
    match kind {
        FieldKind::Bool => parse_bool(token)
            .map(Value::Bool)
            .ok_or_else(|| "expected true or false".to_string()),
        FieldKind::Integer => token
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| "expected an integer".to_string()),
        FieldKind::Float => token
            .parse::<f64>()
            .map(Value::from)
            .map_err(|_| "expected a float".to_string()),
        FieldKind::String => Ok(Value::String(token.to_string())),
        FieldKind::Choice(choices) => {
            if choices.iter().any(|c| c == token) {
                Ok(Value::String(token.to_string()))
            } else {
                Err(format!("expected one of: {}", choices.join(", ")))
            }
        }
        FieldKind::Map(_) => match serde_yaml::from_str::<Value>(token) {
            Ok(Value::Mapping(m)) => Ok(Value::Mapping(m)),
            _ => Err("expected a YAML mapping such as '{key: value}'".to_string()),
        },
        FieldKind::List(element) => match serde_yaml::from_str::<Value>(token) {
            Ok(Value::Sequence(items)) => Ok(Value::Sequence(items)),
            _ => coerce(element, false, token).map(|v| Value::Sequence(vec![v])),
        },
        FieldKind::Any => Ok(parse_loose(token)),
        FieldKind::Nested(_) => Err("a nested section cannot be set from a single value".into()),
    }
}

fn parse_bool(token: &str) -> Option<bool> {
    if token.eq_ignore_ascii_case("true") {
        Some(true)
    } else if token.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Parse a token as a YAML scalar or flow value, falling back to the raw
/// string.
fn parse_loose(token: &str) -> Value {
    if token.trim().is_empty() {
        return Value::String(token.to_string());
    }
    match serde_yaml::from_str::<Value>(token) {
        Ok(Value::Tagged(_)) | Err(_) => Value::String(token.to_string()),
        Ok(value) => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::describe;
    use crate::fixtures::test::{CompoundConfig, ExclusiveConfig, TestConfig, UnderscoreConfig};
    use crate::schema::Settings;

    fn map<C: Settings>(tokens: &[&str]) -> Result<ParsedArgs, SchemafigError> {
        map_with::<C>(tokens, &ArgOptions::default())
    }

    fn map_with<C: Settings>(
        tokens: &[&str],
        options: &ArgOptions,
    ) -> Result<ParsedArgs, SchemafigError> {
        let d = describe::<C>().unwrap();
        map_args(&d, tokens, options)
    }

    fn doc(yaml: &str) -> Document {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn no_tokens_empty_document() {
        let parsed = map::<TestConfig>(&[]).unwrap();
        assert!(parsed.document.is_empty());
        assert!(parsed.unknown.is_empty());
    }

    #[test]
    fn scalar_flags_are_coerced() {
        let parsed = map::<TestConfig>(&["--host", "0.0.0.0", "--port", "3000", "--rate", "0.5"])
            .unwrap();
        assert_eq!(parsed.document, doc("host: 0.0.0.0\nport: 3000\nrate: 0.5"));
    }

    #[test]
    fn non_finite_number_for_bounded_flag_is_rejected() {
        for token in ["nan", "inf", "NaN"] {
            let err = map::<TestConfig>(&["--rate", token]).unwrap_err();
            assert!(
                matches!(&err, SchemafigError::InvalidFlagValue { flag, .. } if flag == "--rate"),
                "{token}: {err}"
            );
        }
    }

    #[test]
    fn non_finite_number_for_unbounded_flag_is_kept() {
        let parsed = map::<CompoundConfig>(&["--inner.favourite_number", "inf"]).unwrap();
        assert_eq!(
            parsed.document["inner"]["favourite_number"].as_f64(),
            Some(f64::INFINITY)
        );
    }

    #[test]
    fn nested_dotted_flags() {
        let parsed = map::<CompoundConfig>(&[
            "--inner.name",
            "Outer",
            "--inner.favourite_number",
            "-2.5",
        ])
        .unwrap();
        assert_eq!(
            parsed.document,
            doc("inner: {name: Outer, favourite_number: -2.5}")
        );
    }

    #[test]
    fn float_flag_accepts_integer_token() {
        let parsed = map::<TestConfig>(&["--rate", "1"]).unwrap();
        assert_eq!(parsed.document["rate"].as_f64(), Some(1.0));
    }

    #[test]
    fn inline_equals_value() {
        let parsed = map::<TestConfig>(&["--port=9000", "--database.url=pg://x"]).unwrap();
        assert_eq!(parsed.document["port"].as_i64(), Some(9000));
        assert_eq!(parsed.document["database"]["url"].as_str(), Some("pg://x"));
    }

    #[test]
    fn list_consumes_until_next_flag() {
        let parsed = map::<CompoundConfig>(&["--numbers", "4", "5", "6", "--inner.name", "x"])
            .unwrap();
        assert_eq!(parsed.document["numbers"], doc("v: [4, 5, 6]")["v"]);
        assert_eq!(parsed.document["inner"]["name"].as_str(), Some("x"));
    }

    #[test]
    fn list_elements_are_coerced() {
        let err = map::<CompoundConfig>(&["--numbers", "1", "two"]).unwrap_err();
        match err {
            SchemafigError::InvalidFlagValue { flag, token, .. } => {
                assert_eq!(flag, "--numbers");
                assert_eq!(token, "two");
            }
            other => panic!("Expected InvalidFlagValue, got: {other:?}"),
        }
    }

    #[test]
    fn list_without_values_is_missing_value() {
        let err = map::<CompoundConfig>(&["--numbers", "--inner.name", "x"]).unwrap_err();
        assert!(matches!(err, SchemafigError::MissingValue { flag } if flag == "--numbers"));
    }

    #[test]
    fn map_field_takes_yaml_text() {
        let parsed = map::<CompoundConfig>(&["--my_dict", "{key: value, n: 2}"]).unwrap();
        assert_eq!(parsed.document["my_dict"], Value::Mapping(doc("key: value\nn: 2")));
    }

    #[test]
    fn map_field_rejects_scalar() {
        let err = map::<CompoundConfig>(&["--my_dict", "oops"]).unwrap_err();
        assert!(err.to_string().contains("YAML mapping"));
    }

    #[test]
    fn optional_field_accepts_null() {
        let parsed = map::<CompoundConfig>(&["--optional", "null"]).unwrap();
        assert_eq!(parsed.document["optional"], Value::Null);
    }

    #[test]
    fn any_field_parses_yaml_or_keeps_string() {
        let parsed = map::<CompoundConfig>(&["--extra", "3"]).unwrap();
        assert_eq!(parsed.document["extra"].as_i64(), Some(3));
        let parsed = map::<CompoundConfig>(&["--extra", "[a, b]"]).unwrap();
        assert!(parsed.document["extra"].is_sequence());
        let parsed = map::<CompoundConfig>(&["--extra", "{unclosed"]).unwrap();
        assert_eq!(parsed.document["extra"].as_str(), Some("{unclosed"));
    }

    #[test]
    fn bare_bool_toggles_default() {
        let parsed = map::<TestConfig>(&["--debug"]).unwrap();
        assert_eq!(parsed.document["debug"], Value::Bool(true));

        let parsed = map::<ExclusiveConfig>(&["--use_dropout"]).unwrap();
        assert_eq!(parsed.document["use_dropout"], Value::Bool(false));
    }

    #[test]
    fn bool_consumes_explicit_value() {
        let parsed = map::<TestConfig>(&["--debug", "FALSE", "--port", "1"]).unwrap();
        assert_eq!(parsed.document["debug"], Value::Bool(false));
        assert_eq!(parsed.document["port"].as_i64(), Some(1));
    }

    #[test]
    fn bool_does_not_consume_other_tokens() {
        let err = map::<TestConfig>(&["--debug", "maybe"]).unwrap_err();
        assert!(matches!(err, SchemafigError::UnexpectedArgument { token } if token == "maybe"));
    }

    #[test]
    fn negated_bool_flag() {
        let parsed = map::<ExclusiveConfig>(&["--no-use_dropout"]).unwrap();
        assert_eq!(parsed.document["use_dropout"], Value::Bool(false));
        assert!(map::<ExclusiveConfig>(&["--no-use_dropout=true"]).is_err());
    }

    #[test]
    fn scalar_missing_value_at_end() {
        let err = map::<TestConfig>(&["--port"]).unwrap_err();
        assert!(matches!(err, SchemafigError::MissingValue { flag } if flag == "--port"));
    }

    #[test]
    fn scalar_followed_by_flag_is_missing_value() {
        let err = map::<TestConfig>(&["--host", "--port", "1"]).unwrap_err();
        assert!(matches!(err, SchemafigError::MissingValue { flag } if flag == "--host"));
    }

    #[test]
    fn invalid_integer_names_flag_and_token() {
        let err = map::<TestConfig>(&["--port", "eighty"]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("--port"));
        assert!(msg.contains("eighty"));
        assert!(msg.contains("expected an integer"));
    }

    #[test]
    fn choice_must_match_declared_literal() {
        let parsed = map::<ExclusiveConfig>(&["--model.activation", "gelu"]).unwrap();
        assert_eq!(parsed.document["model"]["activation"].as_str(), Some("gelu"));
        let err = map::<ExclusiveConfig>(&["--model.activation", "swish"]).unwrap_err();
        assert!(err.to_string().contains("expected one of: relu, gelu, tanh"));
    }

    #[test]
    fn unknown_flag_is_named() {
        let err = map::<TestConfig>(&["--nonexistent.path", "1"]).unwrap_err();
        assert!(matches!(&err, SchemafigError::UnknownFlag { flag } if flag == "--nonexistent.path"));
        assert!(err.to_string().contains("--nonexistent.path"));
    }

    #[test]
    fn container_is_not_a_flag() {
        let err = map::<TestConfig>(&["--database", "x"]).unwrap_err();
        assert!(matches!(err, SchemafigError::UnknownFlag { .. }));
    }

    #[test]
    fn positional_token_is_rejected() {
        let err = map::<TestConfig>(&["config.yaml"]).unwrap_err();
        assert!(matches!(err, SchemafigError::UnexpectedArgument { token } if token == "config.yaml"));
    }

    #[test]
    fn repeated_flag_last_wins() {
        let parsed = map::<TestConfig>(&["--port", "1", "--port", "2"]).unwrap();
        assert_eq!(parsed.document["port"].as_i64(), Some(2));
    }

    #[test]
    fn help_renders_flag_table() {
        let err = map::<TestConfig>(&["--port", "1", "--help"]).unwrap_err();
        match err {
            SchemafigError::HelpRequested { text } => {
                assert!(text.contains("--database.pool_size"));
                assert!(text.contains("Connection pool size."));
            }
            other => panic!("Expected HelpRequested, got: {other:?}"),
        }
        assert!(matches!(
            map::<TestConfig>(&["-h"]),
            Err(SchemafigError::HelpRequested { .. })
        ));
    }

    #[test]
    fn hyphenated_flags() {
        let options = ArgOptions {
            hyphenate: true,
            ..Default::default()
        };
        let parsed = map_with::<UnderscoreConfig>(
            &["--batch-size", "4", "--this-config-is-very-important"],
            &options,
        )
        .unwrap();
        assert_eq!(
            parsed.document,
            doc("batch_size: 4\nthis_config_is_very_important: true")
        );
        let parsed =
            map_with::<UnderscoreConfig>(&["--no-this-config-is-very-important"], &options).unwrap();
        assert_eq!(
            parsed.document["this_config_is_very_important"],
            Value::Bool(false)
        );
    }

    #[test]
    fn underscores_required_without_hyphenation() {
        let err = map::<UnderscoreConfig>(&["--batch-size", "4"]).unwrap_err();
        assert!(matches!(err, SchemafigError::UnknownFlag { .. }));
    }

    #[test]
    fn flag_name_spelling() {
        let d = describe::<UnderscoreConfig>().unwrap();
        let leaf = d.get("batch_size").unwrap();
        assert_eq!(flag_name(leaf, false), "batch_size");
        assert_eq!(flag_name(leaf, true), "batch-size");
    }

    #[test]
    fn allow_unknown_collects_side_mapping() {
        let options = ArgOptions {
            allow_unknown: true,
            ..Default::default()
        };
        let parsed = map_with::<TestConfig>(
            &["--foo", "1", "--bar", "--baz=x", "--port", "7", "--qux"],
            &options,
        )
        .unwrap();
        assert_eq!(parsed.document, doc("port: 7"));
        assert_eq!(parsed.unknown, doc("foo: 1\nbar: true\nbaz: x\nqux: true"));
    }

    #[test]
    fn coerce_list_from_single_token() {
        let kind = FieldKind::List(Box::new(FieldKind::Integer));
        assert_eq!(coerce(&kind, false, "[1, 2]").unwrap(), doc("v: [1, 2]")["v"]);
        assert_eq!(coerce(&kind, false, "7").unwrap(), doc("v: [7]")["v"]);
    }
}
