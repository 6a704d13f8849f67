use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Directory holding the rotated service logs
const LOG_DIR: &str = "logs";
const LOG_FILE_PREFIX: &str = "literacy-paper.log";
const FALLBACK_LEVEL: &str = "info";

/// Sets up the global subscriber for the newspaper service.
///
/// Request traces from `tower_http`, task lifecycle events from the engine and
/// store warnings all go to stdout. `--log-to-file` adds a plain-text copy in
/// `logs/literacy-paper.log.<date>`, rotated daily, for hosts without a log
/// collector.
///
/// # Arguments
///
/// * `log_level` - `EnvFilter` directive, e.g. "info" or "literacy_paper=debug,tower_http=info"
/// * `with_file` - Also write the daily rotated file
pub fn init_logging(log_level: &str, with_file: bool) {
    let file_layer = with_file.then(|| {
        fmt::layer()
            .with_ansi(false)
            .with_line_number(true)
            .with_writer(RollingFileAppender::new(
                Rotation::DAILY,
                LOG_DIR,
                LOG_FILE_PREFIX,
            ))
    });

    tracing_subscriber::registry()
        .with(log_filter(log_level))
        .with(fmt::layer().with_target(true).with_line_number(true))
        .with(file_layer)
        .init();
}

/// Parses the directive; a typo on the command line falls back to `info`
fn log_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_new(log_level).unwrap_or_else(|_| {
        eprintln!(
            "Invalid log level '{}', defaulting to '{}'",
            log_level, FALLBACK_LEVEL
        );
        EnvFilter::new(FALLBACK_LEVEL)
    })
}
