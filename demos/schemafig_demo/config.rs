//! Configuration types for the schemafig demo application.
//!
//! The root [`TrainConfig`] nests an [`OptimizerConfig`] to show dotted
//! flags (`--optimizer.lr 0.01`) and YAML sections working together. Each
//! type derives `Deserialize` for the final typed value and implements
//! [`Settings`] to declare defaults, kinds, constraints, and docs.

use serde::{Deserialize, Serialize};

use schemafig::{Field, FieldKind, Schema, Settings};

/// Root configuration for a training run.
#[derive(Serialize, Deserialize, Debug)]
pub struct TrainConfig {
    pub name: String,
    pub device: String,
    pub seed: i64,
    pub epochs: i64,
    pub layers: Vec<i64>,
    pub use_mlp: bool,
    pub use_cnn: bool,
    pub optimizer: OptimizerConfig,
}

impl Settings for TrainConfig {
    fn schema() -> Schema {
        Schema::new("TrainConfig")
            .describe("Settings for one training run.")
            .field(Field::string("name").default("baseline").describe("Run name."))
            .field(
                Field::choice("device", ["cpu", "cuda"])
                    .default("cpu")
                    .describe("Device to train on."),
            )
            .field(Field::integer("seed").describe("Random seed."))
            .field(Field::integer("epochs").default(10).gt(0.0))
            .field(
                Field::list("layers", FieldKind::Integer)
                    .default(vec![64, 64])
                    .min_length(1)
                    .describe("Hidden layer widths."),
            )
            .field(Field::bool("use_mlp").default(false))
            .field(Field::bool("use_cnn").default(false))
            .field(Field::nested::<OptimizerConfig>("optimizer").describe("Optimizer settings."))
            .exclusive(["use_mlp", "use_cnn"])
    }
}

/// Optimizer settings, under `optimizer:` in YAML.
#[derive(Serialize, Deserialize, Debug)]
pub struct OptimizerConfig {
    pub kind: String,
    pub lr: f64,
    pub momentum: f64,
}

impl Settings for OptimizerConfig {
    fn schema() -> Schema {
        Schema::new("OptimizerConfig")
            .field(Field::choice("kind", ["adam", "sgd"]).default("adam"))
            .field(
                Field::float("lr")
                    .default(3.0e-4)
                    .gt(0.0)
                    .describe("Learning rate."),
            )
            .field(Field::float("momentum").default(0.9).ge(0.0).lt(1.0))
    }
}
