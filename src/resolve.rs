//! Core resolution pipeline: merge all config layers and produce a typed config.
//!
//! Operates on pre-loaded data (`ResolveInput`) with no I/O, making the full
//! pipeline testable with synthetic inputs. Steps:
//!
//! 1. Build (or fetch cached) descriptors for `C`
//! 2. Start from the declared defaults
//! 3. Deep-merge the include-resolved file document on top
//! 4. Deep-merge env vars on top (only with a prefix)
//! 5. Map CLI tokens and deep-merge them on top
//! 6. Deep-merge explicit keyword overrides on top (highest priority)
//! 7. Check exclusive groups
//! 8. Check every field, then deserialize into `C`

use serde_yaml::{Mapping, Value};

use crate::Document;
use crate::args::{self, ArgOptions};
use crate::descriptor::describe;
use crate::env;
use crate::error::SchemafigError;
use crate::exclusive::check_exclusive;
use crate::merge::merge_all;
use crate::overrides;
use crate::schema::Settings;
use crate::validate;

/// All pre-loaded data needed to resolve a config. No I/O happens here.
#[derive(Debug, Clone)]
pub struct ResolveInput {
    /// Include-resolved config file document, if any.
    pub file: Option<Document>,
    /// Raw environment variable pairs (pass `std::env::vars().collect()` or synthetic data).
    pub env_vars: Vec<(String, String)>,
    /// Env var prefix (e.g. `"MYAPP"`). `None` means env disabled.
    pub env_prefix: Option<String>,
    /// Command-line tokens, without the program name or config file path.
    pub args: Vec<String>,
    pub arg_options: ArgOptions,
    /// Explicit overrides as `(dotted_key, value)` pairs.
    pub explicit: Vec<(String, Value)>,
    /// Whether to reject keys that match no declared field.
    pub strict: bool,
}

impl Default for ResolveInput {
    fn default() -> Self {
        Self {
            file: None,
            env_vars: Vec::new(),
            env_prefix: None,
            args: Vec::new(),
            arg_options: ArgOptions::default(),
            explicit: Vec::new(),
            strict: true,
        }
    }
}

/// A loaded config together with the document it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<C> {
    pub config: C,
    /// The merged document after every layer, as validated.
    pub document: Document,
    /// Flags the CLI mapper did not recognise (allow-unknown mode only).
    pub unknown_args: Mapping,
}

/// Resolve configuration from pre-loaded inputs.
pub fn resolve<C: Settings>(input: ResolveInput) -> Result<Resolved<C>, SchemafigError> {
    let descriptors = describe::<C>()?;

    let mut layers = vec![descriptors.defaults()];
    if let Some(file) = input.file {
        layers.push(file);
    }
    if let Some(prefix) = &input.env_prefix {
        layers.push(env::env_to_document(prefix, input.env_vars, &descriptors)?);
    }
    let parsed = args::map_args(&descriptors, &input.args, &input.arg_options)?;
    layers.push(parsed.document);
    if !input.explicit.is_empty() {
        layers.push(overrides::overrides_to_document(&input.explicit));
    }

    tracing::debug!(
        schema = descriptors.schema_name(),
        layers = layers.len(),
        "merging config layers"
    );
    let document = merge_all(layers);

    check_exclusive(&descriptors, &document)?;
    validate::check_document(&descriptors, &document, input.strict)?;
    let config = validate::deserialize::<C>(&descriptors, document.clone(), input.strict)?;

    Ok(Resolved {
        config,
        document,
        unknown_args: parsed.unknown,
    })
}
