use std::path::PathBuf;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Initializes tracing with an env-filter and a console layer, plus a
/// daily-rolling file layer when a log directory is given. The returned
/// guard must stay alive for the file writer to flush.
pub fn init_tracing(log_dir: Option<PathBuf>, default_level: &str) -> Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "casebot.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            Registry::default()
                .with(filter)
                .with(fmt::layer())
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Ok(Some(guard))
        }
        None => {
            Registry::default().with(filter).with(fmt::layer()).init();
            Ok(None)
        }
    }
}
