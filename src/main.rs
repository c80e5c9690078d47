//! vaseforge: builds synthetic paired-end validation FASTQ sets carrying
//! donor variants.
//!
//! Entry point only: argument parsing and exit-code mapping live here,
//! everything else is dispatched to [`orchestrator::run`].

mod builder;
mod cli;
mod common;
mod debug_dumps;
mod donors;
mod err;
mod fastq;
mod logging;
mod model;
mod orchestrator;
mod readers;
mod registry;
mod stats;

use std::process::ExitCode;

use clap::Parser;

use crate::cli::Args;
use crate::err::AppError;

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(err) = logging::init(&args.log_path(), args.verbose.log_level_filter()) {
        eprintln!("failed to initialize logging: {err:#}");
        return ExitCode::FAILURE;
    }

    match try_main(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            match err.downcast::<AppError>() {
                Ok(app_err) => app_err.exit_code(),
                Err(_) => ExitCode::FAILURE,
            }
        }
    }
}

fn try_main(args: &Args) -> anyhow::Result<()> {
    args.validate()?;
    tracing::info!("run mode {}, threads={}", args.run_mode, args.threads);

    if args.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.threads)
            .build_global()
            .map_err(anyhow::Error::from)
            .or_else(|err| {
                tracing::debug!("rayon global pool already initialized: {err:#}");
                Ok::<(), anyhow::Error>(())
            })?;
    }

    orchestrator::run(args)
}
