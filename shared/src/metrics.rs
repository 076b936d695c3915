use metrics_exporter_statsd::{StatsdBuilder, StatsdError};

#[derive(thiserror::Error, Debug)]
pub enum MetricsError {
    #[error("could not build statsd recorder: {0}")]
    Statsd(#[from] StatsdError),
    #[error("a metrics recorder is already installed")]
    AlreadyInstalled,
}

/// Install a global StatsD recorder. Until this is called every metric
/// recorded through the `metrics` facade is discarded.
pub fn init_statsd(host: &str, port: u16, prefix: &str) -> Result<(), MetricsError> {
    let recorder = StatsdBuilder::from(host, port)
        .with_queue_size(5000)
        .with_buffer_size(1024)
        .build(Some(prefix))?;

    metrics::set_global_recorder(recorder).map_err(|_| MetricsError::AlreadyInstalled)?;
    tracing::info!(host, port, prefix, "StatsD metrics recorder installed");
    Ok(())
}
