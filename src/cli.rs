//! Clap adapter for schemafig.
//!
//! Compiled only with the `clap` Cargo feature (on by default). It provides
//! [`ConfigArgs`] and [`ConfigSubcommand`], which embed into a clap
//! `#[derive(Parser)]` struct to give an app `config
//! list|gen|get|schema|flags|diff` subcommands.
//!
//! The only bridge to the core is [`ConfigArgs::into_action()`]. From there,
//! all logic flows through
//! [`SchemafigBuilder::handle()`](crate::SchemafigBuilder::handle).

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::types::ConfigAction;

/// Clap-derived args for the `config` subcommand group.
///
/// ```ignore
/// #[derive(Parser)]
/// struct Cli {
///     #[command(subcommand)]
///     command: Commands,
/// }
///
/// #[derive(Subcommand)]
/// enum Commands {
///     Config(ConfigArgs),
/// }
/// ```
#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigSubcommand>,
}

/// Available config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigSubcommand {
    /// Show all resolved configuration key-value pairs.
    List,
    /// Generate a commented YAML template with every default.
    Gen {
        /// Write to a file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the resolved value and documentation for a config key.
    Get {
        /// Dotted key path (e.g. "database.url").
        key: String,
    },
    /// Export the JSON schema for editor autocompletion.
    Schema {
        /// Write to a file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show every accepted command-line flag.
    Flags,
    /// Show resolved values that differ from the defaults.
    Diff,
}

impl ConfigArgs {
    /// Convert clap-parsed args into a framework-agnostic `ConfigAction`.
    ///
    /// Bare `config` (no subcommand) and explicit `config list` both map to
    /// `ConfigAction::List`.
    pub fn into_action(self) -> ConfigAction {
        match self.action {
            None | Some(ConfigSubcommand::List) => ConfigAction::List,
            Some(ConfigSubcommand::Gen { output }) => ConfigAction::Gen { output },
            Some(ConfigSubcommand::Get { key }) => ConfigAction::Get { key },
            Some(ConfigSubcommand::Schema { output }) => ConfigAction::Schema { output },
            Some(ConfigSubcommand::Flags) => ConfigAction::Flags,
            Some(ConfigSubcommand::Diff) => ConfigAction::Diff,
        }
    }
}
