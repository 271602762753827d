use std::sync::Once;

use thiserror::Error;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_log::{LogTracer, log_tracer::SetLoggerError};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt};

/// Environment variable selecting JSON formatted logs when set to `json`.
const LOG_FORMAT_ENV_NAME: &str = "APP_LOG_FORMAT";

/// Default filter directive used when `RUST_LOG` is not set.
const DEFAULT_LOG_LEVEL: &str = "info";

static INIT_TEST_TRACING: Once = Once::new();

/// Errors raised while installing the global tracing subscriber.
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to install the log to tracing bridge: {0}")]
    LogTracer(#[from] SetLoggerError),

    #[error("failed to set the global tracing subscriber: {0}")]
    Subscriber(#[from] SetGlobalDefaultError),
}

/// Keeps the non-blocking log writer alive.
///
/// Buffered log lines are flushed when this value is dropped, so binaries hold it
/// until `main` returns.
#[must_use]
pub struct LogFlusher {
    _guard: WorkerGuard,
}

/// Installs the global tracing subscriber for the service named `app_name`.
///
/// Log records from the `log` crate are forwarded into tracing. Output goes to stdout
/// through a non-blocking writer, formatted as JSON when `APP_LOG_FORMAT=json`.
pub fn init_tracing(app_name: &str) -> Result<LogFlusher, TracingError> {
    LogTracer::init()?;

    let crate_target = app_name.replace('-', "_");
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("{DEFAULT_LOG_LEVEL},{crate_target}=debug").into());
    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    let json = std::env::var(LOG_FORMAT_ENV_NAME)
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        let subscriber = tracing_subscriber::registry().with(filter).with(
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_writer(writer),
        );
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(writer));
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(LogFlusher { _guard: guard })
}

/// Installs a test-friendly subscriber once per process.
///
/// Output is captured by the test harness and filtered by `RUST_LOG`.
pub fn init_test_tracing() {
    INIT_TEST_TRACING.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_LEVEL.into());
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_test_writer());

        // Another harness may already own the global subscriber.
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
