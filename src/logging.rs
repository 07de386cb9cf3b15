use anyhow::{Result, anyhow};
use std::io::IsTerminal;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE_PREFIX: &str = "gbit-studio.log";

/// Keeps the background log writers alive; logs are flushed when dropped.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Console logging on stderr, plus a daily rotated file when `log_dir` is
/// set. `RUST_LOG` overrides `default_filter`.
pub fn init(default_filter: &str, log_dir: Option<&Path>) -> Result<LoggingGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false);

    let Some(log_dir) = log_dir else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .try_init()
            .map_err(|err| anyhow!("Failed to initialize logging: {err}"))?;
        return Ok(LoggingGuard { _file: None });
    };

    std::fs::create_dir_all(log_dir).map_err(|err| {
        anyhow!(
            "Failed to create log directory {}: {err}",
            log_dir.display()
        )
    })?;
    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|err| anyhow!("Failed to initialize logging: {err}"))?;

    tracing::info!("Logging to {}/{LOG_FILE_PREFIX}.*", log_dir.display());
    Ok(LoggingGuard {
        _file: Some(guard),
    })
}
