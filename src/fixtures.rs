#[cfg(test)]
pub mod test {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Serialize};
    use serde_yaml::{Mapping, Value};

    use crate::schema::{Field, FieldKind, Schema, Settings};

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    pub struct TestConfig {
        pub host: String,
        pub port: u16,
        pub debug: bool,
        pub rate: f64,
        pub tags: Vec<String>,
        pub database: TestDbConfig,
    }

    impl Settings for TestConfig {
        fn schema() -> Schema {
            Schema::new("TestConfig")
                .describe("Test application settings.")
                .field(
                    Field::string("host")
                        .default("localhost")
                        .describe("The application host."),
                )
                .field(
                    Field::integer("port")
                        .default(8080)
                        .gt(0.0)
                        .le(65535.0)
                        .describe("The port number."),
                )
                .field(Field::bool("debug").default(false).describe("Enable debug mode."))
                .field(Field::float("rate").default(0.1).ge(0.0).le(1.0))
                .field(Field::list("tags", FieldKind::String).default(Vec::<String>::new()))
                .field(Field::nested::<TestDbConfig>("database").describe("Database settings."))
        }
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    pub struct TestDbConfig {
        pub url: Option<String>,
        pub pool_size: usize,
    }

    impl Settings for TestDbConfig {
        fn schema() -> Schema {
            Schema::new("TestDbConfig")
                .field(
                    Field::string("url")
                        .optional()
                        .describe("Connection string URL."),
                )
                .field(
                    Field::integer("pool_size")
                        .default(5)
                        .ge(1.0)
                        .describe("Connection pool size."),
                )
        }
    }

    #[test]
    fn test_config_schema_has_six_fields() {
        assert_eq!(TestConfig::schema().fields().len(), 6);
    }

    // -- Fixture for mutual exclusion ------------------------------------------

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    pub struct ExclusiveConfig {
        pub use_mlp_model: bool,
        pub use_batch_norm: bool,
        pub use_dropout: bool,
        pub model: ModelConfig,
    }

    impl Settings for ExclusiveConfig {
        fn schema() -> Schema {
            Schema::new("ExclusiveConfig")
                .field(Field::bool("use_mlp_model").default(false))
                .field(Field::bool("use_batch_norm").default(false))
                .field(Field::bool("use_dropout").default(true))
                .field(Field::nested::<ModelConfig>("model"))
                .exclusive(["use_mlp_model", "use_batch_norm"])
                .exclusive(["use_dropout", "model.layers"])
        }
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    pub struct ModelConfig {
        pub layers: i64,
        pub activation: String,
        pub residual: bool,
        pub skip: bool,
    }

    impl Settings for ModelConfig {
        fn schema() -> Schema {
            Schema::new("ModelConfig")
                .field(Field::integer("layers").default(2))
                .field(Field::choice("activation", ["relu", "gelu", "tanh"]).default("relu"))
                .field(Field::bool("residual").default(false))
                .field(Field::bool("skip").default(false))
                .exclusive(["residual", "skip"])
        }
    }

    // -- Fixture for compound types and CLI arity --------------------------------

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    pub struct CompoundConfig {
        pub inner: InnerConfig,
        pub optional: Option<i64>,
        pub numbers: Vec<i64>,
        pub my_dict: BTreeMap<String, Value>,
        pub extra: Value,
    }

    impl Settings for CompoundConfig {
        fn schema() -> Schema {
            Schema::new("CompoundConfig")
                .field(Field::nested::<InnerConfig>("inner"))
                .field(Field::integer("optional").default(1).optional())
                .field(Field::list("numbers", FieldKind::Integer).default(vec![1, 2, 3]))
                .field(Field::map("my_dict", FieldKind::Any).default(Mapping::new()))
                .field(Field::any("extra").optional())
        }
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    pub struct InnerConfig {
        pub name: String,
        pub favourite_number: f64,
    }

    impl Settings for InnerConfig {
        fn schema() -> Schema {
            Schema::new("InnerConfig")
                .field(Field::string("name").default("Inner"))
                .field(Field::float("favourite_number").default(1.5))
        }
    }

    // -- Fixture for required fields and literals --------------------------------

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    #[serde(rename_all = "lowercase")]
    pub enum Distribution {
        Gaussian,
        Uniform,
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    pub struct RequiredConfig {
        pub distribution: Distribution,
        pub seed: i64,
    }

    impl Settings for RequiredConfig {
        fn schema() -> Schema {
            Schema::new("RequiredConfig")
                .field(Field::choice("distribution", ["gaussian", "uniform"]))
                .field(Field::integer("seed"))
        }
    }

    // -- Fixture for hyphenated flag names ---------------------------------------

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    pub struct UnderscoreConfig {
        pub batch_size: i64,
        pub this_config_is_very_important: bool,
    }

    impl Settings for UnderscoreConfig {
        fn schema() -> Schema {
            Schema::new("UnderscoreConfig")
                .field(Field::integer("batch_size").default(512))
                .field(Field::bool("this_config_is_very_important").default(false))
        }
    }

    // -- Fixture for cyclic nesting -----------------------------------------------

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    pub struct CyclicConfig {
        pub child: Box<CyclicConfig>,
    }

    impl Settings for CyclicConfig {
        fn schema() -> Schema {
            Schema::new("CyclicConfig").field(Field::nested::<CyclicConfig>("child"))
        }
    }

    // -- Fixture for typed mappings ----------------------------------------------

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    pub struct TypedMapConfig {
        pub counts: BTreeMap<String, i64>,
    }

    impl Settings for TypedMapConfig {
        fn schema() -> Schema {
            Schema::new("TypedMapConfig")
                .field(Field::map("counts", FieldKind::Integer).default(Mapping::new()))
        }
    }
}
