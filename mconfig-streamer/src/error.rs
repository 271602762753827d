use std::backtrace::Backtrace;
use std::error::Error;
use std::fmt;

use mconfig::error::MconfigError;

/// Returns whether terminal output should include backtraces.
fn should_render_backtrace() -> bool {
    matches!(
        std::env::var("RUST_BACKTRACE").as_deref(),
        Ok("1") | Ok("full")
    )
}

/// Result type for streamer operations.
pub type StreamerResult<T> = Result<T, StreamerError>;

/// Captured backtrace wrapper to avoid thiserror's unstable feature detection.
pub struct CapturedBacktrace(Backtrace);

impl CapturedBacktrace {
    fn capture() -> Self {
        Self(Backtrace::capture())
    }
}

impl fmt::Debug for CapturedBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type for the streamer service.
///
/// Wraps [`MconfigError`] for pipeline errors and provides variants for
/// infrastructure errors.
pub enum StreamerError {
    /// Pipeline error.
    Mconfig(MconfigError),
    /// Configuration error.
    Config(Box<dyn Error + Send + Sync>, CapturedBacktrace),
    /// I/O error.
    Io(std::io::Error, CapturedBacktrace),
}

impl StreamerError {
    /// Returns a short category label for this error.
    pub fn category(&self) -> &'static str {
        match self {
            StreamerError::Mconfig(_) => "pipeline error",
            StreamerError::Config(_, _) => "configuration error",
            StreamerError::Io(_, _) => "i/o error",
        }
    }

    pub fn backtrace(&self) -> &Backtrace {
        match self {
            StreamerError::Mconfig(err) => err.backtrace(),
            StreamerError::Config(_, cb) => &cb.0,
            StreamerError::Io(_, cb) => &cb.0,
        }
    }

    /// Creates a configuration error from any source.
    pub fn config<E: Error + Send + Sync + 'static>(err: E) -> Self {
        StreamerError::Config(Box::new(err), CapturedBacktrace::capture())
    }

    /// Returns a user-oriented report for terminal output.
    pub fn render_report(&self) -> String {
        let mut out = String::new();
        out.push_str("mconfig streamer failed\n");
        out.push_str(&format!("category: {}\n", self.category()));
        out.push_str(&format!("error: {self}\n"));

        let mut source = Error::source(self);
        let mut idx = 1usize;
        while let Some(err) = source {
            out.push_str(&format!("cause {idx}: {err}\n"));
            source = err.source();
            idx += 1;
        }

        if let StreamerError::Mconfig(err) = self {
            out.push_str(&format!("location: {}\n", err.location()));
        }

        if should_render_backtrace() {
            out.push_str("backtrace:\n");
            out.push_str(&self.backtrace().to_string());
            if !out.ends_with('\n') {
                out.push('\n');
            }
        }

        out
    }
}

impl fmt::Debug for StreamerError {
    /// Renders the full report, which is what `main` prints when it returns an error.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_report())
    }
}

impl fmt::Display for StreamerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamerError::Mconfig(err) => write!(f, "{err}"),
            StreamerError::Config(source, _) => write!(f, "configuration error: {source}"),
            StreamerError::Io(source, _) => write!(f, "i/o error: {source}"),
        }
    }
}

impl Error for StreamerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StreamerError::Mconfig(err) => err.source(),
            StreamerError::Config(source, _) => Some(source.as_ref()),
            StreamerError::Io(source, _) => Some(source),
        }
    }
}

impl From<std::io::Error> for StreamerError {
    fn from(err: std::io::Error) -> Self {
        StreamerError::Io(err, CapturedBacktrace::capture())
    }
}

impl From<MconfigError> for StreamerError {
    fn from(err: MconfigError) -> Self {
        StreamerError::Mconfig(err)
    }
}
