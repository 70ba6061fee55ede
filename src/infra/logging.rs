use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

pub const LOG_FILTER_ENV: &str = "TRADER_TUI_LOG";
const DEFAULT_FILTER: &str = "debug";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("could not open log file {path}: {source}")]
    Open { path: String, source: io::Error },

    #[error("invalid TRADER_TUI_LOG filter: {0}")]
    Filter(String),

    #[error("logger already installed: {0}")]
    Install(String),
}

/// Routes `tracing` output to `path`; the terminal itself belongs to the UI.
pub fn init_logging(path: &Path) -> Result<(), LoggingError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggingError::Open {
            path: path.display().to_string(),
            source,
        })?;

    let filter = match std::env::var(LOG_FILTER_ENV) {
        Ok(raw) if !raw.trim().is_empty() => {
            EnvFilter::try_new(raw.trim()).map_err(|error| LoggingError::Filter(error.to_string()))?
        }
        _ => EnvFilter::new(DEFAULT_FILTER),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|error| LoggingError::Install(error.to_string()))
}
