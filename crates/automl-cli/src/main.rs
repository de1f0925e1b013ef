//! AutoML CLI - command line front-end for the model lifecycle library.
//!
//! Datasets and prediction rows are read from JSON files; every result is
//! printed to stdout as pretty JSON.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use automl_core::{AutoMlApiBuilder, AutoMlConfig, AutoMlError, ErrorResponse};
use serde_json::Value;

#[derive(Parser, Debug)]
#[command(name = "automl")]
#[command(about = "Train, track and serve tabular AutoML models")]
struct Args {
    /// Data root holding the database and model artifacts
    /// (defaults to AUTOML_DATA_ROOT or the platform data directory)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train a model on a JSON dataset file
    Train {
        /// File with `headers` and `rows` (and optionally `filename`)
        dataset: PathBuf,

        /// Human-readable model name
        #[arg(long)]
        name: String,

        /// Column to predict
        #[arg(long)]
        target: String,

        /// regression, binary, multiclass or auto
        #[arg(long, default_value = "auto")]
        problem_type: String,

        /// Training time budget in seconds
        #[arg(long)]
        time_limit: Option<u64>,

        #[arg(long)]
        eval_metric: Option<String>,

        #[arg(long)]
        presets: Option<String>,

        #[arg(long)]
        verbosity: Option<u8>,
    },

    /// Predict with a completed model
    Predict {
        model_id: String,

        /// File with a JSON array of feature objects
        rows: PathBuf,
    },

    /// Show a model's status
    Status { model_id: String },

    /// List all models, newest first
    List,

    /// Show a model with artifact details
    Show { model_id: String },

    /// Delete a model and its artifact
    Delete { model_id: String },

    /// Fail abandoned trainings and remove orphaned artifacts
    Recover,
}

fn init_logging(debug: bool, json: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

fn load_config(root: Option<PathBuf>) -> Result<AutoMlConfig, AutoMlError> {
    match root {
        Some(root) => AutoMlConfig::from_lookup(|key| {
            if key == "AUTOML_DATA_ROOT" {
                Some(root.to_string_lossy().into_owned())
            } else {
                std::env::var(key).ok()
            }
        }),
        None => AutoMlConfig::from_env(),
    }
}

fn print_error(err: &anyhow::Error) {
    let response = match err.downcast_ref::<AutoMlError>() {
        Some(e) => ErrorResponse::from(e),
        None => ErrorResponse {
            success: false,
            error: format!("{:#}", err),
            status: 500,
        },
    };
    match serde_json::to_string_pretty(&response) {
        Ok(json) => println!("{}", json),
        Err(_) => eprintln!("{:#}", err),
    }
}

async fn execute(root: Option<PathBuf>, command: Command) -> anyhow::Result<Value> {
    let config = load_config(root)?;
    debug!("Data root: {}", config.data_root.display());

    let api = AutoMlApiBuilder::from_config(config).build().await?;
    commands::run(&api, command).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.debug, args.json_logs);

    let result = execute(args.root, args.command).await;

    match result {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                print_error(&anyhow::Error::from(e));
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            print_error(&e);
            ExitCode::FAILURE
        }
    }
}
