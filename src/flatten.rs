//! Convert serializable values to documents and flatten documents into
//! dotted key-value pairs.
//!
//! Flattening is descriptor-aware: it descends into declared sections only,
//! so a `map` or `any` field comes out as one pair holding the whole value
//! instead of being split into keys the schema does not know.

use serde::Serialize;
use serde_yaml::Value;

use crate::Document;
use crate::descriptor::Descriptors;
use crate::error::SchemafigError;

/// Serialize `source` into a document. Fails if it is not map-like.
pub fn to_document<S: Serialize>(source: &S) -> Result<Document, SchemafigError> {
    let value = serde_yaml::to_value(source).map_err(|e| SchemafigError::InvalidValue {
        key: "<source>".into(),
        reason: e.to_string(),
    })?;
    match value {
        Value::Mapping(m) => Ok(m),
        Value::Null => Ok(Document::new()),
        other => Err(SchemafigError::InvalidValue {
            key: "<source>".into(),
            reason: format!(
                "expected a struct or map, found {}",
                crate::validate::value_kind(&other)
            ),
        }),
    }
}

/// Flatten `document` into `(dotted.key, value)` pairs in document order.
///
/// Keys that are declared sections are recursed into; everything else,
/// including keys the schema does not declare, is emitted as-is.
pub fn flatten(document: &Document, descriptors: &Descriptors) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    flatten_into(document, descriptors, &mut Vec::new(), &mut out);
    out
}

fn flatten_into(
    mapping: &Document,
    descriptors: &Descriptors,
    prefix: &mut Vec<String>,
    out: &mut Vec<(String, Value)>,
) {
    for (key, value) in mapping {
        let key = match key {
            Value::String(s) => s.clone(),
            other => crate::ops::format_value(other),
        };
        prefix.push(key);
        let dotted = prefix.join(".");
        let is_section = descriptors.get(&dotted).is_some_and(|d| d.is_container);
        match value {
            Value::Mapping(inner) if is_section => {
                flatten_into(inner, descriptors, prefix, out);
            }
            _ => out.push((dotted, value.clone())),
        }
        prefix.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::describe;
    use crate::fixtures::test::{CompoundConfig, InnerConfig, TestConfig, TestDbConfig};
    use std::collections::BTreeMap;

    fn keys(pairs: &[(String, Value)]) -> Vec<&str> {
        pairs.iter().map(|(k, _)| k.as_str()).collect()
    }

    fn test_config() -> TestConfig {
        TestConfig {
            host: "localhost".into(),
            port: 8080,
            debug: false,
            rate: 0.1,
            tags: vec!["a".into()],
            database: TestDbConfig {
                url: None,
                pool_size: 5,
            },
        }
    }

    #[test]
    fn struct_to_document() {
        let doc = to_document(&test_config()).unwrap();
        assert_eq!(doc["port"].as_i64(), Some(8080));
        assert!(doc["database"]["url"].is_null());
    }

    #[test]
    fn scalar_source_is_rejected() {
        assert!(to_document(&42).is_err());
    }

    #[test]
    fn flattens_sections_in_order() {
        let d = describe::<TestConfig>().unwrap();
        let pairs = flatten(&to_document(&test_config()).unwrap(), &d);
        assert_eq!(
            keys(&pairs),
            vec![
                "host",
                "port",
                "debug",
                "rate",
                "tags",
                "database.url",
                "database.pool_size"
            ]
        );
        assert_eq!(pairs[5].1, Value::Null);
    }

    #[test]
    fn map_fields_stay_whole() {
        let d = describe::<CompoundConfig>().unwrap();
        let mut my_dict = BTreeMap::new();
        my_dict.insert("a".to_string(), Value::from(1));
        let config = CompoundConfig {
            inner: InnerConfig {
                name: "x".into(),
                favourite_number: 1.5,
            },
            optional: None,
            numbers: vec![1],
            my_dict,
            extra: serde_yaml::from_str("{deep: {x: 1}}").unwrap(),
        };
        let pairs = flatten(&to_document(&config).unwrap(), &d);
        assert_eq!(
            keys(&pairs),
            vec![
                "inner.name",
                "inner.favourite_number",
                "optional",
                "numbers",
                "my_dict",
                "extra"
            ]
        );
    }

    #[test]
    fn undeclared_keys_are_emitted_whole() {
        let d = describe::<TestConfig>().unwrap();
        let doc: Document = serde_yaml::from_str("other: {a: 1}\nport: 1").unwrap();
        assert_eq!(keys(&flatten(&doc, &d)), vec!["other", "port"]);
    }

    #[test]
    fn flatten_then_unflatten_restores_document() {
        let d = describe::<TestConfig>().unwrap();
        let doc = to_document(&test_config()).unwrap();
        let pairs = flatten(&doc, &d);
        assert_eq!(crate::overrides::overrides_to_document(&pairs), doc);
    }
}
