//! Warehouse load runner binary.
//!
//! Runs one load per process: a full load of every planned table, or the load of the table
//! owning a single artifact. The outcome is printed to stdout as a JSON status payload and
//! reflected in the exit code.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use config::Environment;
use telemetry::tracing::init_tracing;
use tracing::{error, info, warn};

use crate::core::start_load_with_config;
use crate::error::{LoadRunnerError, LoadRunnerResult};
use crate::event::Invocation;
use crate::response::{LoadOutcome, LoadResponse};
use crate::runner_config::load_runner_config;

mod core;
mod error;
mod event;
mod response;
mod runner_config;

/// Loads processed artifacts from object storage into the warehouse.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// JSON trigger event. An object storage notification loads only the table owning the
    /// object; any other event runs a full load.
    #[arg(long, conflicts_with = "artifact_key")]
    event: Option<PathBuf>,
    /// Key of a single artifact, e.g. `fact_sales_order/batch1.parquet`.
    #[arg(long)]
    artifact_key: Option<String>,
}

impl Args {
    fn invocation(&self) -> LoadRunnerResult<Invocation> {
        if let Some(key) = &self.artifact_key {
            return Ok(Invocation::Artifact { key: key.clone() });
        }

        match &self.event {
            Some(path) => Ok(Invocation::from_event_file(path)?),
            None => Ok(Invocation::FullLoad),
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    // The flusher must outlive the response so that every log line is written.
    let _log_flusher = match Environment::load() {
        Ok(environment) => match init_tracing(env!("CARGO_BIN_NAME"), environment) {
            Ok(flusher) => Some(flusher),
            Err(err) => {
                eprintln!("failed to initialize tracing: {err}");
                None
            }
        },
        Err(err) => {
            eprintln!("failed to determine the environment: {err}");
            None
        }
    };

    // Object storage and warehouse TLS both rely on the process-wide provider.
    if rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_err()
    {
        warn!("a rustls crypto provider was already installed");
    }

    let response = match run(&args) {
        Ok(outcome) => {
            info!("warehouse load finished");
            LoadResponse::success(&outcome)
        }
        Err(err) => {
            error!(category = err.category(), "{err}");
            LoadResponse::failure(&err)
        }
    };

    println!("{}", response.to_json());

    response.exit_code()
}

fn run(args: &Args) -> LoadRunnerResult<LoadOutcome> {
    let invocation = args.invocation()?;
    let config = load_runner_config()?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(LoadRunnerError::from)?
        .block_on(start_load_with_config(config, invocation))
}
