//! Error types for every stage of the resolution pipeline.
//!
//! Each variant belongs to exactly one [`Stage`], and its message is prefixed
//! with that stage so a user can tell a broken include from a bad flag from a
//! type error at a glance:
//!
//! ```text
//! [file] Included file not found: /proj/conf/base.yaml (included from /proj/conf/train.yaml)
//! [cli] Unknown flag '--optimiser.lr'
//! [exclusivity] Mutually exclusive fields set together: use_mlp, use_cnn (group: use_mlp, use_cnn)
//! ```

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::validate::ValidationErrors;

/// The pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Building descriptors from a schema declaration.
    Schema,
    /// Reading, parsing, and include-resolving config files.
    File,
    /// Mapping environment variables.
    Env,
    /// Mapping command-line tokens.
    Cli,
    /// Cross-field mutual exclusion.
    Exclusivity,
    /// Per-field type and constraint validation.
    Validation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Schema => "schema",
            Stage::File => "file",
            Stage::Env => "env",
            Stage::Cli => "cli",
            Stage::Exclusivity => "exclusivity",
            Stage::Validation => "validation",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
#[cfg_attr(feature = "rich-errors", derive(miette::Diagnostic))]
pub enum SchemafigError {
    #[error("[schema] Cyclic schema: nesting exceeds depth {depth} at '{path}'")]
    #[cfg_attr(
        feature = "rich-errors",
        diagnostic(
            code(schemafig::schema::cyclic),
            help("a nested schema refers back to one of its ancestors")
        )
    )]
    CyclicSchema { path: String, depth: usize },

    #[error("[schema] Malformed schema '{schema}': {reason}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(schemafig::schema::malformed)))]
    MalformedSchema { schema: String, reason: String },

    #[error("[file] Included file not found: {}{}", path.display(), included_from_suffix(included_from))]
    #[cfg_attr(
        feature = "rich-errors",
        diagnostic(
            code(schemafig::file::not_found),
            help("include paths are relative to the including file's directory")
        )
    )]
    IncludeNotFound {
        path: PathBuf,
        included_from: Option<PathBuf>,
    },

    #[error("[file] Circular include: {}", format_chain(chain))]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(schemafig::file::circular)))]
    CircularInclude { chain: Vec<PathBuf> },

    #[error("[file] Invalid include in {}: {reason}", path.display())]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(schemafig::file::invalid_include)))]
    InvalidInclude { path: PathBuf, reason: String },

    #[error("[file] Failed to parse {}: {source}", path.display())]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(schemafig::file::parse)))]
    ParseError {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("[file] Failed to access {}: {source}", path.display())]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(schemafig::file::io)))]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("[env] Invalid value '{value}' for {var}: {reason}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(schemafig::env::invalid_value)))]
    InvalidEnvValue {
        var: String,
        value: String,
        reason: String,
    },

    #[error("[cli] Unknown flag '{flag}'")]
    #[cfg_attr(
        feature = "rich-errors",
        diagnostic(
            code(schemafig::cli::unknown_flag),
            help("pass --help to list every accepted flag")
        )
    )]
    UnknownFlag { flag: String },

    #[error("[cli] Flag '{flag}' expects a value")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(schemafig::cli::missing_value)))]
    MissingValue { flag: String },

    #[error("[cli] Invalid value '{token}' for '{flag}': {reason}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(schemafig::cli::invalid_value)))]
    InvalidFlagValue {
        flag: String,
        token: String,
        reason: String,
    },

    #[error("[cli] Unexpected argument '{token}'")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(schemafig::cli::unexpected)))]
    UnexpectedArgument { token: String },

    #[error("[cli] Missing config file path: pass it as the first argument")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(schemafig::cli::missing_config_file)))]
    MissingConfigFile,

    /// `--help` was passed. The payload is the rendered flag table; callers
    /// print it and exit successfully.
    #[error("{text}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(schemafig::cli::help)))]
    HelpRequested { text: String },

    #[error(
        "[exclusivity] Mutually exclusive fields set together: {} (group: {})",
        active.join(", "),
        group.join(", ")
    )]
    #[cfg_attr(
        feature = "rich-errors",
        diagnostic(
            code(schemafig::exclusivity),
            help("leave all but one of these fields at their default value")
        )
    )]
    Exclusivity {
        group: Vec<String>,
        active: Vec<String>,
    },

    #[error("[validation] {0}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(schemafig::validation::fields)))]
    Validation(ValidationErrors),

    #[error("[validation] Key not found: {0}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(schemafig::validation::key_not_found)))]
    KeyNotFound(String),

    #[error("[validation] Invalid value for '{key}': {reason}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(schemafig::validation::invalid_value)))]
    InvalidValue { key: String, reason: String },
}

impl SchemafigError {
    /// The pipeline stage this error was raised in.
    pub fn stage(&self) -> Stage {
        match self {
            SchemafigError::CyclicSchema { .. } | SchemafigError::MalformedSchema { .. } => {
                Stage::Schema
            }
            SchemafigError::IncludeNotFound { .. }
            | SchemafigError::CircularInclude { .. }
            | SchemafigError::InvalidInclude { .. }
            | SchemafigError::ParseError { .. }
            | SchemafigError::IoError { .. } => Stage::File,
            SchemafigError::InvalidEnvValue { .. } => Stage::Env,
            SchemafigError::UnknownFlag { .. }
            | SchemafigError::MissingValue { .. }
            | SchemafigError::InvalidFlagValue { .. }
            | SchemafigError::UnexpectedArgument { .. }
            | SchemafigError::MissingConfigFile
            | SchemafigError::HelpRequested { .. } => Stage::Cli,
            SchemafigError::Exclusivity { .. } => Stage::Exclusivity,
            SchemafigError::Validation(_)
            | SchemafigError::KeyNotFound(_)
            | SchemafigError::InvalidValue { .. } => Stage::Validation,
        }
    }
}

impl From<ValidationErrors> for SchemafigError {
    fn from(errors: ValidationErrors) -> Self {
        SchemafigError::Validation(errors)
    }
}

fn included_from_suffix(included_from: &Option<PathBuf>) -> String {
    match included_from {
        Some(parent) => format!(" (included from {})", parent.display()),
        None => String::new(),
    }
}

fn format_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
