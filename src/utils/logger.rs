// Logger initialization

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "atlas_research=info";

/// Where log lines go.
pub enum LogTarget<'a> {
    /// stderr, leaving stdout for the report.
    Stderr,
    /// A file in the given directory; the terminal belongs to the TUI.
    File { dir: &'a Path, file_name: &'a str },
}

/// Install the global subscriber. Keep the returned guard alive for the life
/// of the program so buffered file output is flushed.
pub fn init_logger(target: LogTarget<'_>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    match target {
        LogTarget::Stderr => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init()?;
            Ok(None)
        }
        LogTarget::File { dir, file_name } => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()?;
            Ok(Some(guard))
        }
    }
}
