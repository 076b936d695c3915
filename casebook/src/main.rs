mod config;

use clap::Parser;
use config::{Config, ConfigError, LoggingConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "casebook", about = "Notion case database gateway and collector")]
enum CliCommand {
    /// Serve the HTTP gateway.
    Serve {
        #[arg(long)]
        config: PathBuf,
    },
    /// Run one collection batch and write the snapshots.
    Collect {
        #[arg(long)]
        config: PathBuf,
    },
}

impl CliCommand {
    fn config_path(&self) -> &PathBuf {
        match self {
            CliCommand::Serve { config } | CliCommand::Collect { config } => config,
        }
    }
}

/// Set up tracing, plus Sentry when a DSN is configured. The returned guard
/// flushes Sentry on drop and must live until exit.
fn init_logging(config: &LoggingConfig) -> Option<sentry::ClientInitGuard> {
    let guard = config.sentry_dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(guard.as_ref().map(|_| sentry::integrations::tracing::layer()))
        .init();

    guard
}

fn init_metrics(config: &Config) {
    if let Some(metrics) = &config.common.metrics {
        if let Err(e) =
            shared::metrics::init_statsd(&metrics.statsd_host, metrics.statsd_port, &metrics.prefix)
        {
            tracing::warn!(error = %e, "Metrics disabled");
        }
    }

    shared::metrics_defs::describe_all(notion::metrics_defs::ALL_METRICS);
    shared::metrics_defs::describe_all(gateway::metrics_defs::ALL_METRICS);
    shared::metrics_defs::describe_all(collector::metrics_defs::ALL_METRICS);
}

fn run(cli: CliCommand, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match cli {
        CliCommand::Serve { .. } => {
            let gateway_config = config
                .gateway
                .ok_or(ConfigError::MissingSection("gateway"))?;
            tracing::info!("Starting gateway");
            rt.block_on(gateway::serve(gateway_config))?;
        }
        CliCommand::Collect { .. } => {
            let collector_config = config
                .collector
                .ok_or(ConfigError::MissingSection("collector"))?;
            tracing::info!(
                database_id = %collector_config.database_id,
                "Starting collection run"
            );
            rt.block_on(collector::run(&collector_config))?;
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = CliCommand::parse();

    let config = match Config::from_file(cli.config_path()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let _sentry = init_logging(&config.common.logging);
    init_metrics(&config);

    match run(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Exiting with error");
            ExitCode::FAILURE
        }
    }
}
