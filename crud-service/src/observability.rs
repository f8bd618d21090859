//! Structured logging setup

use tracing_subscriber::EnvFilter;

use crate::{
    config::Config,
    error::{Error, Result},
};

/// Install the global JSON subscriber
///
/// `service.log_level` is parsed as an `EnvFilter` directive; an invalid
/// directive falls back to `info`.
///
/// # Errors
///
/// Returns [`Error::Tracing`] when a global subscriber is already installed.
pub fn init_tracing(config: &Config) -> Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_current_span(true)
        .with_env_filter(env_filter(&config.service.log_level))
        .try_init()
        .map_err(|e| Error::Tracing(e.to_string()))?;

    tracing::info!(
        service = %config.service.name,
        environment = %config.service.environment,
        "tracing initialized"
    );

    Ok(())
}

fn env_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_invalid_directive_falls_back_to_info() {
        assert_eq!(
            env_filter("crud_service=loud").max_level_hint(),
            Some(LevelFilter::INFO)
        );
        assert_eq!(env_filter("debug").max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_second_init_is_reported() {
        let config = Config::default();
        let first = init_tracing(&config);
        let second = init_tracing(&config);
        // Another test may have installed the subscriber first.
        assert!(first.is_ok() || matches!(first, Err(Error::Tracing(_))));
        assert!(matches!(second, Err(Error::Tracing(_))));
    }
}
