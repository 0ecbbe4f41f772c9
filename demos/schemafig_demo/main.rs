//! # schemafig demo application
//!
//! A sample training launcher that shows how to integrate schemafig into a
//! clap application. It exists to demonstrate and manually verify features.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example schemafig_demo -- --file demos/schemafig_demo/conf/train.yaml train
//! cargo run --example schemafig_demo -- --file demos/schemafig_demo/conf/train.yaml config diff
//! ```
//!
//! ## Features demonstrated
//!
//! | Feature            | How to exercise it                                      |
//! |--------------------|---------------------------------------------------------|
//! | Includes           | `conf/train.yaml` pulls in `conf/base.yaml`             |
//! | Dotted flags       | `... train --optimizer.lr 0.5 --layers 32 16`           |
//! | Boolean negation   | `... train --use_mlp --no-use_cnn`                      |
//! | Exclusive groups   | `... train --use_mlp --use_cnn` fails                   |
//! | Flag table         | `... train --help` or `... config flags`                |
//! | Env overrides      | `TRAIN__OPTIMIZER__MOMENTUM=0.5 ... train`              |
//! | Explicit overrides | `... --seed 7 train`                                    |
//! | `config gen`       | `... config gen -o /tmp/train.yaml`                     |
//! | `config schema`    | `... config schema -o /tmp/train.schema.json`           |
//! | `config get`       | `... config get optimizer.lr`                           |
//! | `config list`      | `... config list`                                       |
//! | Save resolved      | `... train --save /tmp/resolved.yaml`                   |

mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;

use schemafig::{ConfigArgs, Schemafig, SchemafigBuilder, SchemafigError};

use config::TrainConfig;

// ---------------------------------------------------------------------------
// CLI definitions
// ---------------------------------------------------------------------------

/// schemafig demo: a sample training launcher.
#[derive(Parser, Debug)]
#[command(name = "schemafig-demo")]
struct Cli {
    /// YAML config file for the run.
    #[arg(long, global = true)]
    file: Option<PathBuf>,

    /// Override the random seed.
    #[arg(long, global = true)]
    seed: Option<i64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve the config and print the run summary.
    Train {
        /// Write the resolved config to this YAML file.
        #[arg(long)]
        save: Option<PathBuf>,

        /// Config flags, passed through as `--dotted.path value`.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        overrides: Vec<String>,
    },
    /// Inspect the configuration (list, gen, get, schema, flags, diff).
    Config(ConfigArgs),
}

/// Serializable projection of the clap flags that name config keys.
///
/// `overrides_from` keeps `seed` and drops `file`, which the schema does not
/// declare.
#[derive(Serialize)]
struct CliOverrides {
    file: Option<PathBuf>,
    seed: Option<i64>,
}

// ---------------------------------------------------------------------------
// Builder helper
// ---------------------------------------------------------------------------

fn make_builder(
    file: Option<PathBuf>,
    seed: Option<i64>,
    flags: &[String],
) -> Result<SchemafigBuilder<TrainConfig>, SchemafigError> {
    let overrides = CliOverrides {
        file: file.clone(),
        seed,
    };
    let mut builder = Schemafig::builder()
        .env_prefix("TRAIN")
        .args(flags.iter().cloned())
        .overrides_from(&overrides)?;
    if let Some(path) = file {
        builder = builder.file(path);
    }
    Ok(builder)
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn print_summary(config: &TrainConfig) {
    let model = match (config.use_mlp, config.use_cnn) {
        (true, _) => "mlp",
        (_, true) => "cnn",
        _ => "linear",
    };
    println!("run:       {}", config.name);
    println!("device:    {}", config.device);
    println!("seed:      {}", config.seed);
    println!("model:     {model} {:?}", config.layers);
    println!("epochs:    {}", config.epochs);
    println!(
        "optimizer: {} (lr {}, momentum {})",
        config.optimizer.kind, config.optimizer.lr, config.optimizer.momentum
    );
}

fn run(cli: Cli) -> Result<(), SchemafigError> {
    let Cli {
        file,
        seed,
        command,
    } = cli;
    match command {
        Commands::Train { save, overrides } => {
            let config = make_builder(file, seed, &overrides)?.load()?;
            print_summary(&config);
            if let Some(path) = save {
                schemafig::save_yaml(&config, &path)?;
                println!("saved to {}", path.display());
            }
            Ok(())
        }
        Commands::Config(args) => {
            make_builder(file, seed, &[])?.handle_and_print(&args.into_action())
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => {}
        Err(SchemafigError::HelpRequested { text }) => print!("{text}"),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
