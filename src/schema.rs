//! Schema declaration: the typed, defaulted field tree a config type exposes.
//!
//! A schema is a plain value built by composition, not derived from the
//! struct's shape. The struct provides `Deserialize` for the final typed
//! instance; the schema provides everything the pipeline needs before that
//! point: field order, kinds for CLI coercion, defaults, constraints, docs,
//! and exclusive groups.
//!
//! ```ignore
//! impl Settings for TrainConfig {
//!     fn schema() -> Schema {
//!         Schema::new("TrainConfig")
//!             .field(Field::string("device").default("cpu"))
//!             .field(Field::float("learning_rate").default(3.0e-4).gt(0.0))
//!             .field(Field::nested::<OptimizerConfig>("optimizer"))
//!             .exclusive(["use_mlp", "use_cnn"])
//!     }
//! }
//! ```
//!
//! Nested schemas are referenced lazily through [`SchemaRef`], so a schema
//! that (mistakenly) nests itself is representable; the descriptor walker
//! rejects it with a cyclic-schema error instead of recursing forever.

use std::any::type_name;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_yaml::Value;

/// A config type with a declared schema.
///
/// The schema and the `Deserialize` impl must agree on field names; keys the
/// type does not consume are reported as field errors in strict mode.
pub trait Settings: DeserializeOwned + 'static {
    fn schema() -> Schema;
}

/// Lazy reference to the schema of a nested [`Settings`] type.
#[derive(Clone, Copy)]
pub struct SchemaRef {
    type_name: &'static str,
    build: fn() -> Schema,
}

impl SchemaRef {
    pub fn of<S: Settings>() -> Self {
        Self {
            type_name: type_name::<S>(),
            build: S::schema,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn build(&self) -> Schema {
        (self.build)()
    }
}

impl fmt::Debug for SchemaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SchemaRef({})", self.type_name)
    }
}

impl PartialEq for SchemaRef {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name
    }
}

/// The declared type of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Bool,
    Integer,
    Float,
    String,
    /// One of a fixed set of string literals.
    Choice(Vec<String>),
    /// A sequence whose elements all have the inner kind.
    List(Box<FieldKind>),
    /// A mapping with string keys whose values all have the inner kind.
    /// `Map(Box::new(FieldKind::Any))` is free-form.
    Map(Box<FieldKind>),
    /// Any YAML value.
    Any,
    /// A nested schema.
    Nested(SchemaRef),
}

impl FieldKind {
    /// Short type label used in help output and error messages.
    pub fn label(&self) -> String {
        match self {
            FieldKind::Bool => "bool".into(),
            FieldKind::Integer => "int".into(),
            FieldKind::Float => "float".into(),
            FieldKind::String => "str".into(),
            FieldKind::Choice(choices) => format!("{{{}}}", choices.join("|")),
            FieldKind::List(inner) => format!("list[{}]", inner.label()),
            FieldKind::Map(value) if **value == FieldKind::Any => "map".into(),
            FieldKind::Map(value) => format!("map[{}]", value.label()),
            FieldKind::Any => "any".into(),
            FieldKind::Nested(schema) => short_type_name(schema.type_name()).into(),
        }
    }

    pub fn is_nested(&self) -> bool {
        matches!(self, FieldKind::Nested(_))
    }
}

fn short_type_name(full: &str) -> &str {
    full.rsplit("::").next().unwrap_or(full)
}

/// Numeric bounds and length limits on a field.
///
/// Bounds apply to numbers; lengths apply to strings (in characters),
/// sequences, and mappings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    pub gt: Option<f64>,
    pub ge: Option<f64>,
    pub lt: Option<f64>,
    pub le: Option<f64>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        *self == Constraints::default()
    }

    /// Whether any numeric bound is declared.
    pub fn has_bounds(&self) -> bool {
        self.gt.is_some() || self.ge.is_some() || self.lt.is_some() || self.le.is_some()
    }

    /// Human-readable rule list, e.g. `["gt: 0", "le: 1"]`.
    pub fn rules(&self) -> Vec<String> {
        let mut rules = Vec::new();
        let bounds = [
            ("gt", self.gt),
            ("ge", self.ge),
            ("lt", self.lt),
            ("le", self.le),
        ];
        for (name, bound) in bounds {
            if let Some(b) = bound {
                rules.push(format!("{name}: {b}"));
            }
        }
        if let Some(n) = self.min_length {
            rules.push(format!("min_length: {n}"));
        }
        if let Some(n) = self.max_length {
            rules.push(format!("max_length: {n}"));
        }
        rules
    }
}

/// One declared field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub(crate) name: String,
    pub(crate) kind: FieldKind,
    pub(crate) default: Option<Value>,
    pub(crate) optional: bool,
    pub(crate) description: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) constraints: Constraints,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
            optional: false,
            description: None,
            title: None,
            constraints: Constraints::default(),
        }
    }

    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Bool)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Float)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String)
    }

    pub fn choice<I, S>(name: impl Into<String>, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            FieldKind::Choice(choices.into_iter().map(Into::into).collect()),
        )
    }

    pub fn list(name: impl Into<String>, element: FieldKind) -> Self {
        Self::new(name, FieldKind::List(Box::new(element)))
    }

    /// A mapping field; pass [`FieldKind::Any`] for free-form values.
    pub fn map(name: impl Into<String>, value: FieldKind) -> Self {
        Self::new(name, FieldKind::Map(Box::new(value)))
    }

    pub fn any(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Any)
    }

    pub fn nested<S: Settings>(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Nested(SchemaRef::of::<S>()))
    }

    /// Set the default value. Fields without a default are required.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Allow `null`. An optional field without an explicit default defaults
    /// to `null`.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        if self.default.is_none() {
            self.default = Some(Value::Null);
        }
        self
    }

    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn title(mut self, text: impl Into<String>) -> Self {
        self.title = Some(text.into());
        self
    }

    pub fn gt(mut self, bound: f64) -> Self {
        self.constraints.gt = Some(bound);
        self
    }

    pub fn ge(mut self, bound: f64) -> Self {
        self.constraints.ge = Some(bound);
        self
    }

    pub fn lt(mut self, bound: f64) -> Self {
        self.constraints.lt = Some(bound);
        self
    }

    pub fn le(mut self, bound: f64) -> Self {
        self.constraints.le = Some(bound);
        self
    }

    pub fn min_length(mut self, n: usize) -> Self {
        self.constraints.min_length = Some(n);
        self
    }

    pub fn max_length(mut self, n: usize) -> Self {
        self.constraints.max_length = Some(n);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }
}

/// A set of leaf paths of which at most one may deviate from its default.
#[derive(Debug, Clone, PartialEq)]
pub struct ExclusiveGroup {
    members: Vec<String>,
}

impl ExclusiveGroup {
    pub fn new<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            members: members.into_iter().map(Into::into).collect(),
        }
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }
}

/// An ordered list of fields plus cross-field exclusive groups.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    name: String,
    description: Option<String>,
    fields: Vec<Field>,
    groups: Vec<ExclusiveGroup>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Declare an exclusive group. Member paths are relative to this schema
    /// and may reach into nested schemas (`"model.use_dropout"`).
    pub fn exclusive<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.push(ExclusiveGroup::new(members));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn groups(&self) -> &[ExclusiveGroup] {
        &self.groups
    }
}
