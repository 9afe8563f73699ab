use serde::Deserialize;
use shared::http::{Listener, ListenerError};
use std::fs::File;
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn default_listener() -> Listener {
    Listener {
        host: "0.0.0.0".into(),
        port: 8000,
    }
}

fn default_admin_listener() -> Listener {
    Listener {
        host: "127.0.0.1".into(),
        port: 8001,
    }
}

fn default_log_filter() -> String {
    "info".into()
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default)]
    pub sentry_dsn: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            sentry_dsn: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
    #[serde(default = "MetricsConfig::default_prefix")]
    pub prefix: String,
}

impl MetricsConfig {
    fn default_prefix() -> String {
        "biocat".into()
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CorsConfig {
    #[serde(default = "default_true")]
    pub allow_any_origin: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_any_origin: true,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_listener")]
    pub listener: Listener,
    #[serde(default = "default_admin_listener")]
    pub admin_listener: Listener,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub metrics: Option<MetricsConfig>,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub federation: federation::Config,
    pub catalog: Option<catalog::Config>,
}

impl Config {
    /// Loads, applies environment overrides and validates.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let mut config: Config = serde_yaml::from_reader(file)?;

        if let Some(catalog) = config.catalog.as_mut() {
            catalog.apply_env_overrides();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;
        if self.listener.address() == self.admin_listener.address() {
            return Err(ConfigError::SharedAddress(self.listener.address()));
        }

        EnvFilter::try_new(&self.logging.filter)
            .map_err(|e| ConfigError::InvalidLogFilter(e.to_string()))?;
        if let Some(dsn) = &self.logging.sentry_dsn {
            dsn.parse::<sentry::types::Dsn>()
                .map_err(|e| ConfigError::InvalidSentryDsn(e.to_string()))?;
        }

        if let Some(metrics) = &self.metrics {
            if metrics.statsd_host.is_empty() || metrics.statsd_port == 0 {
                return Err(ConfigError::InvalidMetrics);
            }
        }

        self.federation.validate()?;

        match &self.catalog {
            Some(catalog) => catalog.validate()?,
            None if self.federation.load_participants_from_catalog => {
                return Err(ConfigError::CatalogRequired);
            }
            None => {}
        }

        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("invalid listener: {0}")]
    Listener(#[from] ListenerError),
    #[error("listener and admin_listener cannot share {0}")]
    SharedAddress(String),
    #[error("invalid logging.filter: {0}")]
    InvalidLogFilter(String),
    #[error("invalid logging.sentry_dsn: {0}")]
    InvalidSentryDsn(String),
    #[error("metrics.statsd_host and metrics.statsd_port must be set")]
    InvalidMetrics,
    #[error("invalid federation config: {0}")]
    Federation(#[from] federation::config::ValidationError),
    #[error("invalid catalog config: {0}")]
    Catalog(#[from] catalog::config::ValidationError),
    #[error("federation.load_participants_from_catalog requires a catalog section")]
    CatalogRequired,
}
