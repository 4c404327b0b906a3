//! Tracing subscriber setup.

use super::file_writer::FileWriter;
use crate::Config;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Installs the global subscriber.
///
/// Everything passing the filter goes to the rotating debug log at
/// `config.debug_log`; warnings and errors are echoed to stderr. The filter
/// comes from `RUST_LOG` when set, otherwise from `config.trace_level`.
///
/// Logging is best effort: an unusable log directory or an already-installed
/// subscriber leaves the process running without this one.
pub fn init_tracing(config: &Config) {
    if let Some(dir) = config.debug_log.parent().filter(|d| !d.as_os_str().is_empty()) {
        if std::fs::create_dir_all(dir).is_err() {
            eprintln!("power-manager: cannot create log directory {}", dir.display());
        }
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.trace_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = fmt::layer()
        .with_writer(FileWriter::new(config.debug_log.clone()))
        .with_ansi(false)
        .with_target(false);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .with_filter(LevelFilter::WARN);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init();
}
