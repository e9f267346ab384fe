//! Structured logging initialization.
//!
//! `RUST_LOG` takes precedence over the configured level.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::settings::{LogFormat, LoggingSettings};
use crate::cli::{Error, Result};

fn filter(settings: &LoggingSettings) -> Result<EnvFilter> {
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        return Ok(EnvFilter::from_default_env());
    }
    EnvFilter::try_new(&settings.level)
        .map_err(|e| Error::InvalidSettings(format!("logging.level {:?}: {}", settings.level, e)))
}

/// Install the global subscriber.
pub fn init(settings: &LoggingSettings) -> Result<()> {
    let filter = filter(settings)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match settings.format {
        LogFormat::Text => registry.with(fmt::layer().with_target(true)).try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false))
            .try_init(),
    };
    installed.map_err(|e| Error::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_is_rejected() {
        if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
            return;
        }
        let settings = LoggingSettings {
            level: "perfdash=[".to_string(),
            ..Default::default()
        };
        assert!(matches!(filter(&settings), Err(Error::InvalidSettings(_))));
    }

    #[test]
    fn test_level_directives_parse() {
        let settings = LoggingSettings {
            level: "info,perfdash_core=debug".to_string(),
            ..Default::default()
        };
        assert!(filter(&settings).is_ok());
    }
}
