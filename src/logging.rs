//! Tracing setup. The terminal belongs to the table UI, so logs go to a file.
//!
//! Directives are read from `ADMTABLE_LOG`, then `RUST_LOG`, falling back to `info`.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::domain::AdmError;

pub const LOG_ENV: &str = "ADMTABLE_LOG";

pub fn init_logging(path: &Path) -> Result<(), AdmError> {
    let file = File::create(path)?;
    let fmt_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(build_env_filter())
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| AdmError::Logging(e.to_string()))
}

fn build_env_filter() -> EnvFilter {
    if let Ok(directives) = std::env::var(LOG_ENV)
        && let Ok(filter) = EnvFilter::try_new(&directives)
    {
        return filter;
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
