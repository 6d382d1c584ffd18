//! File-based logging.
//!
//! Log output goes to a daily rotating file so the command output of the
//! binary stays clean. Level comes from `RUST_LOG`.

use std::fs;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const LOG_FILE_PREFIX: &str = "studybeat";
const DEFAULT_FILTER: &str = "studybeat=debug,reqwest=info,warn";

/// Initialize the logging system.
///
/// Logs are written to `<log_dir>/studybeat.YYYY-MM-DD.log`. The returned
/// guard flushes the background writer and must live until shutdown.
///
/// Default log levels:
/// - `studybeat` modules: DEBUG
/// - `reqwest`: INFO
/// - Other crates: WARN
pub fn init_logging(log_dir: &Path) -> anyhow::Result<WorkerGuard> {
    // Ensure log directory exists
    if !log_dir.exists() {
        fs::create_dir_all(log_dir)?;
    }

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_PREFIX);
    // Non-blocking writer keeps file IO off the runtime threads
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // RUST_LOG wins over the defaults
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false) // No ANSI colors in log files
        .with_target(true) // Include module path
        .with_span_events(FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::info!("Logging initialized - logs written to {}/", log_dir.display());

    Ok(guard)
}

/// Log the outcome of a gateway call
#[macro_export]
macro_rules! log_api_result {
    ($operation:expr, $result:expr) => {
        match &$result {
            Ok(_) => tracing::debug!(operation = %$operation, "API request successful"),
            Err(e) => tracing::error!(operation = %$operation, error = %e, "API request failed"),
        }
    };
}

/// Log the start of a gateway call with additional context
#[macro_export]
macro_rules! log_api_request {
    ($operation:expr, $($field:tt)*) => {
        tracing::debug!(operation = %$operation, $($field)*, "API request started");
    };
}
