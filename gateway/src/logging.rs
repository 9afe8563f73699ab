use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingConfig;

#[derive(thiserror::Error, Debug)]
pub enum LoggingError {
    #[error("invalid sentry DSN: {0}")]
    SentryDsn(String),
    #[error("could not install tracing subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Keeps the Sentry client alive; events are flushed when dropped.
pub struct LoggingGuard {
    _sentry: Option<sentry::ClientInitGuard>,
}

pub fn init(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.filter));

    let sentry_guard = match &config.sentry_dsn {
        Some(dsn) => {
            let dsn = dsn
                .parse::<sentry::types::Dsn>()
                .map_err(|e| LoggingError::SentryDsn(e.to_string()))?;
            Some(sentry::init(sentry::ClientOptions {
                dsn: Some(dsn),
                release: sentry::release_name!(),
                ..Default::default()
            }))
        }
        None => None,
    };

    let sentry_layer = sentry_guard
        .as_ref()
        .map(|_| sentry::integrations::tracing::layer());

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(sentry_layer)
        .try_init()?;

    if sentry_guard.is_some() {
        tracing::info!("Sentry error reporting enabled");
    }

    Ok(LoggingGuard {
        _sentry: sentry_guard,
    })
}
