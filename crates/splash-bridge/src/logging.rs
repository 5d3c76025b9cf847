use anyhow::{Context, Result};
use splash_bridge_core::StatusForwardLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

/// Output format of the console log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Install the global subscriber: formatted output on stderr filtered by `RUST_LOG`
/// (default `info`), plus the status forwarder when given.
///
/// The filter only applies to the console; the forwarder sees every record.
pub fn init_logging(forwarder: Option<StatusForwardLayer>, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console: Box<dyn Layer<Registry> + Send + Sync> = match format {
        LogFormat::Text => fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(forwarder)
        .try_init()
        .context("Failed to install tracing subscriber")
}
