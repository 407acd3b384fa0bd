use color_eyre::{Result, eyre::eyre};
use paths::PathContext;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// File layer (one log file per run) plus a stderr layer. `RUST_LOG` wins
/// over the configured level. Keep the guard alive until exit so buffered
/// lines are flushed.
pub fn init(paths: &PathContext, level: &str) -> Result<WorkerGuard> {
    let log_file_path = paths.log_file_now();
    let (Some(log_dir), Some(log_filename)) = (log_file_path.parent(), log_file_path.file_name())
    else {
        return Err(eyre!("invalid log file path {}", log_file_path.display()));
    };

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    let file_layer = fmt::Layer::default()
        .with_target(false)
        .with_ansi(false)
        .with_writer(non_blocking);

    let console_layer = fmt::Layer::default()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .with(ErrorLayer::default())
        .try_init()?;

    Ok(guard)
}
