//! Logging setup: a single run log file capturing every level, mirrored
//! to stderr at the user-selected verbosity, via two layered
//! `tracing_subscriber` sinks.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use log::LevelFilter as LogLevelFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;

fn to_tracing_filter(level: LogLevelFilter) -> LevelFilter {
    match level {
        LogLevelFilter::Off => LevelFilter::OFF,
        LogLevelFilter::Error => LevelFilter::ERROR,
        LogLevelFilter::Warn => LevelFilter::WARN,
        LogLevelFilter::Info => LevelFilter::INFO,
        LogLevelFilter::Debug => LevelFilter::DEBUG,
        LogLevelFilter::Trace => LevelFilter::TRACE,
    }
}

pub fn init(log_path: &Path, stderr_level: LogLevelFilter) -> Result<()> {
    let file = File::create(log_path).with_context(|| format!("opening log file {log_path:?}"))?;

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .with_filter(LevelFilter::DEBUG);

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .with_filter(to_tracing_filter(stderr_level));

    tracing_subscriber::registry().with(file_layer).with(stderr_layer).try_init().context("installing logger")?;

    // `log::log_enabled!` (used by the orchestrator to gate DEBUG-verbosity
    // auxiliary tables) reads the `log` crate's own max-level cell, which
    // `tracing_subscriber`'s registry never touches; set it explicitly so
    // that gate reflects the user's requested verbosity.
    log::set_max_level(stderr_level);
    Ok(())
}
