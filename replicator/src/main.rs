mod config;

use clap::{Args, Parser};
use config::{CommonConfig, Config, ConfigError, LoggingConfig, MetricsConfig};
use metrics_exporter_statsd::StatsdBuilder;
use shared::metrics_defs::describe_metrics;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "replicator", about = "Bucket replication services")]
enum CliCommand {
    /// Replicate created and removed objects from the source bucket to the target bucket
    BucketSync(CliArgs),
    /// List the buckets visible to ROLE_ARN
    BucketLister(CliArgs),
    /// Log every delivered notification
    EventLogger(CliArgs),
}

#[derive(Args)]
struct CliArgs {
    /// YAML configuration file. All settings take their defaults when omitted.
    #[arg(long)]
    config_path: Option<PathBuf>,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not start metrics exporter: {0}")]
    Metrics(String),
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("bucket-sync: {0}")]
    BucketSync(#[from] bucket_sync::errors::BucketSyncError),
    #[error("bucket-lister: {0}")]
    BucketLister(#[from] bucket_lister::BucketListerError),
    #[error("event-logger: {0}")]
    EventLogger(#[from] event_logger::EventLoggerError),
}

fn main() {
    if let Err(e) = cli(CliCommand::parse()) {
        eprintln!("{e}");
        process::exit(1);
    }
}

fn cli(command: CliCommand) -> Result<(), CliError> {
    let (name, args) = match &command {
        CliCommand::BucketSync(args) => ("bucket_sync", args),
        CliCommand::BucketLister(args) => ("bucket_lister", args),
        CliCommand::EventLogger(args) => ("event_logger", args),
    };

    let config = match &args.config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let Config {
        common:
            CommonConfig {
                metrics: metrics_config,
                logging,
            },
        bucket_sync: bucket_sync_config,
        bucket_lister: bucket_lister_config,
        event_logger: event_logger_config,
    } = config;

    let _sentry = init_logging(logging.as_ref());
    if let Some(metrics_config) = &metrics_config {
        init_metrics(metrics_config, name)?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match command {
        CliCommand::BucketSync(_) => {
            tracing::info!("Starting bucket-sync");
            describe_metrics(bucket_sync::metrics_defs::ALL_METRICS);
            runtime.block_on(bucket_sync::run(bucket_sync_config))?;
        }
        CliCommand::BucketLister(_) => {
            tracing::info!("Starting bucket-lister");
            runtime.block_on(bucket_lister::run(bucket_lister_config))?;
        }
        CliCommand::EventLogger(_) => {
            tracing::info!("Starting event-logger");
            runtime.block_on(event_logger::run(event_logger_config))?;
        }
    }

    Ok(())
}

/// Installs the log subscriber. Errors are also reported to Sentry when a DSN is configured;
/// the returned guard flushes pending events on drop.
fn init_logging(logging: Option<&LoggingConfig>) -> Option<sentry::ClientInitGuard> {
    let guard = logging.map(|logging| {
        sentry::init((
            logging.sentry_dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(guard.is_some().then(sentry::integrations::tracing::layer))
        .init();

    guard
}

fn init_metrics(config: &MetricsConfig, prefix: &str) -> Result<(), CliError> {
    let recorder = StatsdBuilder::from(config.statsd_host.clone(), config.statsd_port)
        .build(Some(prefix))
        .map_err(|e| CliError::Metrics(e.to_string()))?;
    metrics::set_global_recorder(recorder).map_err(|e| CliError::Metrics(e.to_string()))
}
