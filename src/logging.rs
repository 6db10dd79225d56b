//! Tracing subscriber setup shared by the binaries

use anyhow::Result;
use std::path::Path;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Human-readable logs on stderr, filtered by `RUST_LOG` when set.
pub fn init_stderr_logging(default_directive: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_directive))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()?;
    Ok(())
}

/// JSON logs in a daily-rolling file, keeping stdout free for the MCP transport.
pub fn init_file_logging(log_dir: &Path, file_name: &str) -> Result<()> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, file_name);

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,flight_finder=debug")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .json(),
        )
        .try_init()?;

    info!(log_dir = %log_dir.display(), file_name = file_name, "Logging initialized");
    debug!("Debug logging is enabled");
    Ok(())
}
