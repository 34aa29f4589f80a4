//! Subscriber setup: stderr always, plus a daily-rolling file when enabled.
//!
//! `RUST_LOG` takes precedence over `logging.level`.

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

use crate::config::{LogFormat, LoggingConfig};

const DEFAULT_FILE_NAME: &str = "taskward.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Debug, thiserror::Error)]
#[error("failed to open log file under {dir}: {source}")]
pub struct LogInitError {
    dir: PathBuf,
    #[source]
    source: InitError,
}

/// Install the global subscriber. Keep the returned guard alive for the
/// life of the process; dropping it flushes and stops the file writer.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>, LogInitError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let mut layers: Vec<BoxedLayer> = vec![fmt_layer(config.format, std::io::stderr, true)];
    let guard = if config.file_enabled {
        let (writer, guard) = file_writer(config)?;
        layers.push(fmt_layer(config.format, writer, false));
        Some(guard)
    } else {
        None
    };

    // a subscriber may already be installed (tests, embedding)
    let _ = tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init();
    Ok(guard)
}

fn fmt_layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer().with_writer(writer).with_ansi(ansi);
    match format {
        LogFormat::Full => layer.boxed(),
        LogFormat::Compact => layer.compact().boxed(),
    }
}

fn file_writer(config: &LoggingConfig) -> Result<(NonBlocking, WorkerGuard), LogInitError> {
    let (dir, file_name) = file_target(&config.file_path);
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(file_name)
        .max_log_files(config.file_max_files.max(1))
        .build(&dir)
        .map_err(|source| LogInitError { dir, source })?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Split `path` into (directory, file name); bare names go in `.`.
fn file_target(path: &Path) -> (PathBuf, String) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_FILE_NAME)
        .to_string();
    (dir, file_name)
}
