use metrics_exporter_statsd::StatsdBuilder;

use crate::config::MetricsConfig;

#[derive(thiserror::Error, Debug)]
pub enum MetricsError {
    #[error("could not build statsd exporter: {0}")]
    Exporter(#[from] metrics_exporter_statsd::StatsdError),
    #[error("could not install metrics recorder: {0}")]
    Install(String),
}

/// Installs the global StatsD recorder and registers metric descriptions.
pub fn init(config: &MetricsConfig) -> Result<(), MetricsError> {
    let recorder = StatsdBuilder::from(config.statsd_host.clone(), config.statsd_port)
        .build(Some(&config.prefix))?;

    ::metrics::set_global_recorder(recorder).map_err(|e| MetricsError::Install(e.to_string()))?;

    shared::metrics_defs::describe_metrics(federation::metrics_defs::ALL_METRICS);
    shared::metrics_defs::describe_metrics(catalog::metrics_defs::ALL_METRICS);

    tracing::info!(
        host = %config.statsd_host,
        port = config.statsd_port,
        prefix = %config.prefix,
        "StatsD metrics enabled"
    );
    Ok(())
}
