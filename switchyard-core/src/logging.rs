//! Tracing subscriber setup

use crate::config::LoggingConfig;
use crate::error::Error;
use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `config.level`. Fails if the level is
/// not a valid filter directive or a global subscriber is already set.
///
/// ```no_run
/// # fn example() -> Result<(), switchyard_core::Error> {
/// switchyard_core::logging::init(&switchyard_core::config::LoggingConfig::default())?;
/// # Ok(()) }
/// ```
pub fn init(config: &LoggingConfig) -> Result<(), Error> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| Error::Logging(format!("invalid log level '{}': {e}", config.level)))?,
    };

    let result = if config.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
    };

    result.map_err(|e| Error::Logging(format!("tracing init failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_rejected() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LoggingConfig {
            level: "switchyard=verbose".to_string(),
            json: false,
        };
        assert!(matches!(init(&config), Err(Error::Logging(_))));
    }
}
