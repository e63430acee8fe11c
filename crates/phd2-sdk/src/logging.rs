//! Logging setup
//!
//! All crates log through `tracing`. [`init_logger`] installs a formatted
//! subscriber filtered by `RUST_LOG` (falling back to the given directive) and
//! forwards records from crates that use `log` instead.

use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Failed to install log bridge: {0}")]
    LogBridge(#[from] tracing_log::log::SetLoggerError),

    #[error("Failed to install subscriber: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Filter from `RUST_LOG`, or `default_directive` when unset.
pub fn env_filter(default_directive: &str) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_directive)
            .map_err(|e| LoggingError::Filter(e.to_string())),
    }
}

/// Install the global subscriber. Fails if one is already installed.
///
/// ```no_run
/// phd2_sdk::logging::init_logger("phd2_driver=debug,phd2_client=info").unwrap();
/// ```
pub fn init_logger(default_directive: &str) -> Result<(), LoggingError> {
    let filter = env_filter(default_directive)?;
    tracing_log::LogTracer::init()?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
