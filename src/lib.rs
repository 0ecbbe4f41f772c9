//! Typed, schema-driven YAML configuration for experiment and tool configs.
//! Declare a schema, point at a file, and go.
//!
//! Schemafig resolves a config from declared defaults, a YAML file with
//! includes, optional environment variables, and `--dotted.path` command-line
//! flags, then validates the merged result against the schema and hands you
//! a typed struct.
//!
//! ```ignore
//! let config: TrainConfig = Schemafig::builder()
//!     .file("conf/train.yaml")
//!     .args_from_env()
//!     .load()?;
//! ```
//!
//! # Schema as source of truth
//!
//! A config type implements [`Settings`] by returning a [`Schema`] built
//! from composed [`Field`] values. The schema is the single definition
//! behind everything:
//!
//! - **Defaults** are the lowest layer, always present.
//! - **Kinds** drive command-line coercion (`--lr 0.5` is a float because the
//!   field is one).
//! - **Constraints** (`gt`, `ge`, `lt`, `le`, lengths, choices) are checked
//!   after merging, and every failing field is reported at once.
//! - **Descriptions** become comments in generated templates, the `--help`
//!   table, and the JSON schema.
//! - **Nested schemas** map to YAML sections and dotted flag names.
//! - **Exclusive groups** name fields of which at most one may be set.
//!
//! The struct only provides `Deserialize`. A field missing from the schema
//! but present in a source is an error in strict mode.
//!
//! # Layer precedence
//!
//! ```text
//! Schema defaults       Field::default(...)
//!        ↑ overridden by
//! Config file           .file() or the first positional argument
//!        ↑ overridden by
//! Environment vars      PREFIX__SECTION__KEY (only with .env_prefix())
//!        ↑ overridden by
//! Command line          --section.key value
//!        ↑ overridden by
//! Explicit overrides    .set() / .overrides_from()
//! ```
//!
//! Every layer is **sparse**. Mappings merge key by key; scalars and
//! sequences are replaced whole.
//!
//! # Includes
//!
//! A file composes others through the YAML merge key:
//!
//! ```yaml
//! <<: !include base.yaml
//! optimizer:
//!   lr: 0.01
//! ```
//!
//! Paths are relative to the including file. Local keys beat included ones,
//! includes nest transitively, and a file that includes itself (directly or
//! through others) fails with the full chain in the error.
//!
//! # Command-line flags
//!
//! Every leaf of the schema is a flag named by its dotted path:
//!
//! | Field kind | Example |
//! |------------|---------|
//! | scalar | `--optimizer.lr 0.01` or `--optimizer.lr=0.01` |
//! | bool | `--debug`, `--debug false`, `--no-debug` |
//! | list | `--layers 64 64 32` |
//! | map / any | `--extra "{key: value}"` |
//!
//! `--help` renders the flag table as [`SchemafigError::HelpRequested`].
//! Unknown flags fail unless [`allow_unknown_flags`](SchemafigBuilder::allow_unknown_flags)
//! is on, in which case they are returned beside the config.
//!
//! # Strict mode
//!
//! Strict mode is **on by default**. Keys that match no declared field fail
//! validation with their dotted path:
//!
//! ```text
//! [validation] 1 validation error for TrainConfig
//!   optimizer.typo: unknown field
//! ```
//!
//! Turn it off with [`.strict(false)`](SchemafigBuilder::strict).
//!
//! # Core library, no CLI framework required
//!
//! Flag mapping is built in, so the core has no dependency on any CLI
//! parser. For [clap](https://docs.rs/clap) users, the `clap` feature (on by
//! default) adds [`ConfigArgs`], which gives an app `config
//! list|gen|get|schema|flags|diff` subcommands handled by
//! [`SchemafigBuilder::handle`].
//!
//! # Error handling
//!
//! All fallible operations return [`SchemafigError`]. Each variant belongs to
//! one pipeline [`Stage`], and its message starts with that stage. See the
//! [`error`] module for the full set.

pub mod error;
pub mod types;

mod args;
mod builder;
#[cfg(feature = "clap")]
mod cli;
mod descriptor;
mod env;
mod exclusive;
mod export;
mod file;
mod flatten;
mod include;
pub(crate) mod merge;
mod ops;
mod overrides;
mod persist;
mod resolve;
mod schema;
mod validate;

#[cfg(test)]
mod fixtures;

/// A YAML mapping: the shape every layer takes before validation.
pub type Document = serde_yaml::Mapping;

pub use args::{ArgOptions, ParsedArgs, flag_name, map_args};
pub use builder::{Schemafig, SchemafigBuilder};
#[cfg(feature = "clap")]
pub use cli::{ConfigArgs, ConfigSubcommand};
pub use descriptor::{Descriptors, FieldDescriptor, MAX_DEPTH, describe};
pub use env::env_to_document;
pub use error::{SchemafigError, Stage};
pub use exclusive::check_exclusive;
pub use export::{json_schema, write_json_schema};
pub use flatten::{flatten, to_document};
pub use include::resolve_file;
pub use merge::{deep_merge, merge_all};
pub use ops::{
    ConfigResult, compatible_args, diff_from_defaults, generate_template, get_value, help_text,
    list_values,
};
pub use overrides::{get_path, overrides_to_document, set_path};
pub use persist::{save_yaml, to_yaml};
pub use resolve::{ResolveInput, Resolved, resolve};
pub use schema::{Constraints, ExclusiveGroup, Field, FieldKind, Schema, SchemaRef, Settings};
pub use types::ConfigAction;
pub use validate::{FieldError, ValidationErrors, check_document, deserialize};
