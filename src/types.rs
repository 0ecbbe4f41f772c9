use std::path::PathBuf;

/// A config operation, independent of any CLI framework.
/// The CLI layer converts parsed clap args into this.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigAction {
    /// Every resolved value as a dotted key-value pair.
    List,
    /// A commented YAML template of the schema with its defaults.
    Gen { output: Option<PathBuf> },
    /// One resolved value and its description.
    Get { key: String },
    /// The JSON schema, for editor autocompletion.
    Schema { output: Option<PathBuf> },
    /// The table of accepted command-line flags.
    Flags,
    /// Resolved values that differ from the declared defaults.
    Diff,
}
