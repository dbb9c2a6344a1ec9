//! Logging bootstrap.
//!
//! The library only emits `tracing` events; applications that have no
//! subscriber of their own can install one from [`LoggingConfig`].

use crate::config::LoggingConfig;
use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum TracingInitError {
    /// The level directive did not parse.
    #[error("invalid log filter: {0}")]
    Filter(#[from] ParseError),

    /// A global subscriber is already installed.
    #[error("failed to install subscriber: {0}")]
    Install(#[from] TryInitError),
}

/// Builds the filter: `RUST_LOG` when set, else the configured level.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, TracingInitError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(&config.level)?),
    }
}

/// Installs a global `fmt` subscriber, as JSON lines if configured.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), TracingInitError> {
    let filter = env_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    if config.json {
        registry
            .with(fmt::layer().json().with_current_span(true))
            .try_init()?;
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(level: &str, json: bool) -> LoggingConfig {
        LoggingConfig {
            level: level.to_string(),
            json,
        }
    }

    #[test]
    fn test_rejects_bad_directive() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let err = env_filter(&config("smoothhttp=loud", false)).unwrap_err();
        assert!(matches!(err, TracingInitError::Filter(_)));
    }

    #[test]
    fn test_second_install_fails() {
        let first = init_tracing(&config("debug", true));
        let second = init_tracing(&config("debug", false));

        assert!(first.is_ok() || matches!(first, Err(TracingInitError::Install(_))));
        assert!(matches!(second, Err(TracingInitError::Install(_))));
    }
}
