use std::marker::PhantomData;
use std::path::PathBuf;

use serde::Serialize;
use serde_yaml::Value;

use crate::args::ArgOptions;
use crate::descriptor::describe;
use crate::error::SchemafigError;
use crate::export;
use crate::file;
use crate::flatten;
use crate::include;
use crate::ops::{self, ConfigResult};
use crate::resolve::{self, ResolveInput, Resolved};
use crate::schema::Settings;
use crate::types::ConfigAction;

/// Entry point for building a schemafig configuration.
pub struct Schemafig;

impl Schemafig {
    pub fn builder<C: Settings>() -> SchemafigBuilder<C> {
        SchemafigBuilder::new()
    }
}

/// Builder for configuring and loading layered configuration.
///
/// Layers, lowest priority first:
///
/// - **Defaults** declared on the schema.
/// - **File**: [`file()`](Self::file) or the first positional argument with
///   [`file_from_args()`](Self::file_from_args), include-resolved.
/// - **Environment**: only with [`env_prefix()`](Self::env_prefix).
/// - **Command line**: [`args()`](Self::args) or
///   [`args_from_env()`](Self::args_from_env), as `--dotted.path value`.
/// - **Explicit overrides**: [`set()`](Self::set) and
///   [`overrides_from()`](Self::overrides_from).
pub struct SchemafigBuilder<C: Settings> {
    file: Option<PathBuf>,
    file_from_args: bool,
    args: Vec<String>,
    arg_options: ArgOptions,
    env_prefix: Option<String>,
    strict: bool,
    explicit: Vec<(String, Value)>,
    _phantom: PhantomData<C>,
}

impl<C: Settings> SchemafigBuilder<C> {
    fn new() -> Self {
        Self {
            file: None,
            file_from_args: false,
            args: Vec::new(),
            arg_options: ArgOptions::default(),
            env_prefix: None,
            strict: true,
            explicit: Vec::new(),
            _phantom: PhantomData,
        }
    }

    /// Load this YAML file (and everything it includes) as the file layer.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Take the config file path from the first command-line token when it
    /// is not a flag. A path set with [`file()`](Self::file) is the fallback;
    /// with neither, loading fails with [`SchemafigError::MissingConfigFile`].
    pub fn file_from_args(mut self, enabled: bool) -> Self {
        self.file_from_args = enabled;
        self
    }

    /// Command-line tokens, without the program name.
    pub fn args<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = tokens.into_iter().map(Into::into).collect();
        self
    }

    /// Use the process arguments, skipping the program name.
    pub fn args_from_env(self) -> Self {
        self.args(std::env::args().skip(1))
    }

    /// Collect unknown flags instead of failing (default: `false`). They are
    /// returned in [`Resolved::unknown_args`].
    pub fn allow_unknown_flags(mut self, allow: bool) -> Self {
        self.arg_options.allow_unknown = allow;
        self
    }

    /// Spell flags with `-` instead of `_` (default: `false`).
    pub fn hyphenate_flags(mut self, hyphenate: bool) -> Self {
        self.arg_options.hyphenate = hyphenate;
        self
    }

    /// Enable the environment layer: `{PREFIX}__SECTION__KEY`.
    pub fn env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self
    }

    /// Enable or disable strict mode (default: `true`).
    /// In strict mode, keys that match no declared field produce errors.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Add an explicit override by dotted key. `None` values are ignored
    /// (useful for optional clap args).
    pub fn set<V: Into<Value>>(mut self, key: &str, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.explicit.push((key.to_string(), v.into()));
        }
        self
    }

    /// Add explicit overrides from any serializable source, auto-matching by
    /// field name.
    ///
    /// Serializes `source`, skips `null` values, and keeps only keys that
    /// name declared leaves of `C`. Non-matching keys are silently ignored,
    /// so clap-only fields like `command` or `verbose` are automatically
    /// excluded. Nested structs and dotted map keys both reach nested
    /// fields.
    ///
    /// Composes with [`set`](Self::set); both push to the same override
    /// list and later calls take precedence.
    pub fn overrides_from<S: Serialize>(mut self, source: &S) -> Result<Self, SchemafigError> {
        let descriptors = describe::<C>()?;
        let document = flatten::to_document(source)?;
        for (key, value) in flatten::flatten(&document, &descriptors) {
            let is_leaf = descriptors.get(&key).is_some_and(|d| !d.is_container);
            if is_leaf && !value.is_null() {
                self.explicit.push((key, value));
            }
        }
        Ok(self)
    }

    /// Split off the config file path and read the file layer.
    fn build_input(&self) -> Result<ResolveInput, SchemafigError> {
        let mut tokens = self.args.clone();
        let mut path = self.file.clone();

        if self.file_from_args {
            match tokens.first() {
                Some(first) if !first.starts_with('-') => {
                    path = Some(PathBuf::from(tokens.remove(0)));
                }
                _ if path.is_some() => {}
                _ if tokens.iter().any(|t| t == "-h" || t == "--help") => {
                    let descriptors = describe::<C>()?;
                    return Err(SchemafigError::HelpRequested {
                        text: ops::help_text(&descriptors, self.arg_options.hyphenate),
                    });
                }
                _ => return Err(SchemafigError::MissingConfigFile),
            }
        }

        let file = path.as_deref().map(include::resolve_file).transpose()?;
        let env_vars = match &self.env_prefix {
            Some(_) => std::env::vars().collect(),
            None => Vec::new(),
        };

        Ok(ResolveInput {
            file,
            env_vars,
            env_prefix: self.env_prefix.clone(),
            args: tokens,
            arg_options: self.arg_options.clone(),
            explicit: self.explicit.clone(),
            strict: self.strict,
        })
    }

    /// Load and resolve the configuration through all layers.
    pub fn load(self) -> Result<C, SchemafigError> {
        self.load_resolved().map(|r| r.config)
    }

    /// Like [`load`](Self::load), also returning the merged document and any
    /// unknown flags.
    pub fn load_resolved(self) -> Result<Resolved<C>, SchemafigError> {
        let input = self.build_input()?;
        resolve::resolve(input)
    }

    /// Handle a `ConfigAction` and print the result to stdout.
    pub fn handle_and_print(self, action: &ConfigAction) -> Result<(), SchemafigError> {
        let result = self.handle(action)?;
        println!("{result}");
        Ok(())
    }

    /// Handle a `ConfigAction` (list / gen / get / schema / flags / diff).
    ///
    /// `gen`, `schema`, and `flags` only need the schema; the others load
    /// the configuration first.
    pub fn handle(self, action: &ConfigAction) -> Result<ConfigResult, SchemafigError> {
        let descriptors = describe::<C>()?;
        match action {
            ConfigAction::List => {
                let resolved = self.load_resolved()?;
                Ok(ops::list_values(&descriptors, &resolved.document))
            }
            ConfigAction::Gen { output } => {
                let template = ops::generate_template(&descriptors);
                match output {
                    Some(path) => {
                        file::write_text(path, &template)?;
                        Ok(ConfigResult::Written { path: path.clone() })
                    }
                    None => Ok(ConfigResult::Template(template)),
                }
            }
            ConfigAction::Get { key } => {
                let resolved = self.load_resolved()?;
                ops::get_value(&descriptors, &resolved.document, key)
            }
            ConfigAction::Schema { output } => match output {
                Some(path) => {
                    export::write_json_schema(&descriptors, path)?;
                    Ok(ConfigResult::Written { path: path.clone() })
                }
                None => Ok(ConfigResult::Schema(export::to_pretty(&descriptors)?)),
            },
            ConfigAction::Flags => Ok(ConfigResult::Flags(ops::help_text(
                &descriptors,
                self.arg_options.hyphenate,
            ))),
            ConfigAction::Diff => {
                let resolved = self.load_resolved()?;
                Ok(ops::diff_from_defaults(&descriptors, &resolved.document))
            }
        }
    }
}
