use std::path::Path;

use murmur_execution::{SessionLogEntry, SessionLogLayer};
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE_NAME: &str = "murmur.log";

/// Installs the global subscriber: a daily-rolling file under `logs_dir` plus
/// a layer that forwards warnings to the returned channel.
///
/// `RUST_LOG` overrides `default_level`. The guard must outlive the session
/// or buffered lines are lost.
pub fn init_logging(
    logs_dir: &Path,
    default_level: &str,
) -> anyhow::Result<(WorkerGuard, mpsc::UnboundedReceiver<SessionLogEntry>)> {
    std::fs::create_dir_all(logs_dir)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let file_appender = rolling::daily(logs_dir, LOG_FILE_NAME);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let (log_tx, log_rx) = mpsc::unbounded_channel();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .with(SessionLogLayer::new(log_tx))
        .try_init()?;

    Ok((guard, log_rx))
}
