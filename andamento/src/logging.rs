use crate::config::{LoggingConfig, MetricsConfig};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(thiserror::Error, Debug)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    Filter(String),
    #[error("tracing subscriber already installed")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
    #[error("could not build statsd recorder: {0}")]
    Statsd(String),
    #[error("metrics recorder already installed")]
    Recorder,
}

/// Keeps the Sentry client alive. Pending events are flushed on drop.
pub struct Telemetry {
    _sentry: Option<sentry::ClientInitGuard>,
}

pub fn init(
    logging: &LoggingConfig,
    metrics: Option<&MetricsConfig>,
) -> Result<Telemetry, TelemetryError> {
    let sentry = logging.sentry_dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.level)
            .map_err(|e| TelemetryError::Filter(e.to_string()))?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry.as_ref().map(|_| sentry::integrations::tracing::layer()))
        .try_init()?;

    if let Some(metrics) = metrics {
        init_statsd(metrics)?;
    }

    Ok(Telemetry { _sentry: sentry })
}

fn init_statsd(config: &MetricsConfig) -> Result<(), TelemetryError> {
    let recorder = metrics_exporter_statsd::StatsdBuilder::from(
        config.statsd_host.as_str(),
        config.statsd_port,
    )
    .build(Some(&config.prefix))
    .map_err(|e| TelemetryError::Statsd(e.to_string()))?;
    metrics::set_global_recorder(recorder).map_err(|_| TelemetryError::Recorder)?;

    shared::metrics_defs::describe(saj::ALL_METRICS);
    shared::metrics_defs::describe(projudi::ALL_METRICS);
    shared::metrics_defs::describe(reconciler::ALL_METRICS);
    tracing::info!(
        host = %config.statsd_host,
        port = config.statsd_port,
        "statsd metrics enabled"
    );

    Ok(())
}
