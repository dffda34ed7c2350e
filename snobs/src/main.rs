use clap::Parser;
use config::{Config, LoggingConfig, MetricsConfig};
use metrics_exporter_statsd::StatsdBuilder;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

mod config;

const METRICS_PREFIX: &str = "snobs";

/// Assigns the members of a Stash group as reviewers of a pull request.
#[derive(Parser)]
#[command(name = "snobs", version)]
struct Cli {
    /// Use specified configuration file
    #[arg(short = 'c', value_name = "config", default_value = "/etc/snobs/snobs.conf")]
    config: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    let config = match Config::from_file(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("can't load config: {err}");
            process::exit(1);
        }
    };

    // Sentry must be initialized before the runtime starts
    let _sentry = init_logging(config.logging.as_ref());

    if let Some(metrics_config) = &config.metrics
        && let Err(err) = init_metrics(metrics_config)
    {
        tracing::error!(error = %err, "failed to set up metrics");
        process::exit(1);
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(err) => {
            tracing::error!(error = %err, "failed to start runtime");
            process::exit(1);
        }
    };

    tracing::info!(stash = %config.relay.stash, "starting snobs");
    if let Err(err) = rt.block_on(reviewer_relay::run(config.relay)) {
        tracing::error!(error = %err, "server error");
        process::exit(1);
    }
}

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
        .with(fmt::layer())
        .with(guard.as_ref().map(|_| sentry::integrations::tracing::layer()))
        .init();

    guard
}

fn init_metrics(metrics_config: &MetricsConfig) -> Result<(), Box<dyn std::error::Error>> {
    let recorder = StatsdBuilder::from(metrics_config.statsd_host.clone(), metrics_config.statsd_port)
        .build(Some(METRICS_PREFIX))?;
    metrics::set_global_recorder(recorder).map_err(|_| "a metrics recorder is already installed")?;

    Ok(())
}
