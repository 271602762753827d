//! Error types and result definitions for mconfig operations.
//!
//! Every failure in the pipeline is an [`MconfigError`] carrying an [`ErrorKind`], a static
//! description, optional dynamic detail, an optional source error, and the callsite location
//! and backtrace captured when it was created.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::panic::Location;
use std::sync::Arc;

/// Convenient result type for mconfig operations.
pub type MconfigResult<T> = Result<T, MconfigError>;

#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Main error type for mconfig operations.
#[derive(Debug, Clone)]
pub struct MconfigError {
    payload: ErrorPayload,
}

/// Categories of errors raised by the materialization pipeline.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Decoding Errors
    MalformedTopic,
    InvalidEnvelope,
    UnsupportedOperation,
    UnknownConfigType,
    UnmarshalError,

    // Computation Errors
    ComputationUnitFailed,

    // Storage Errors
    StorageQueryFailed,
    StorageConnectionFailed,
    StorageConflict,

    // Stream Errors
    StreamReadFailed,
    StreamCommitFailed,
    StreamEnded,

    // Directory Errors
    DirectoryLookupFailed,

    // IO & Serialization Errors
    SerializationError,
    DeserializationError,
    ConversionError,
    IoError,

    // Configuration Errors
    ConfigError,

    // State & Workflow Errors
    InvalidState,
    ProcessorPanic,
    ProcessorCancelled,

    // Unknown / Uncategorized
    Unknown,
}

impl MconfigError {
    /// Returns the [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        self.payload.kind
    }

    /// Returns the static description of this error.
    pub fn description(&self) -> &str {
        &self.payload.description
    }

    /// Returns the dynamic detail if available.
    pub fn detail(&self) -> Option<&str> {
        self.payload.detail.as_deref()
    }

    /// Returns the captured backtrace for this error.
    pub fn backtrace(&self) -> &Backtrace {
        self.payload.backtrace.as_ref()
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        self.payload.location
    }

    /// Attaches an originating [`error::Error`] to this error and returns the modified instance.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        self.payload.source = Some(Arc::new(source));
        self
    }

    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        MconfigError {
            payload: ErrorPayload {
                kind,
                description,
                detail,
                source,
                location: Location::caller(),
                backtrace: Arc::new(Backtrace::capture()),
            },
        }
    }
}

impl PartialEq for MconfigError {
    fn eq(&self, other: &MconfigError) -> bool {
        self.payload.kind == other.payload.kind
    }
}

impl Hash for MconfigError {
    /// Hashes only the kind and static description so repeated occurrences group together.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.payload.kind.hash(state);
        self.payload.description.hash(state);
    }
}

impl fmt::Display for MconfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        let payload = &self.payload;
        let location = payload.location;
        write!(
            f,
            "[{:?}] {} @ {}:{}:{}",
            payload.kind,
            payload.description,
            location.file(),
            location.line(),
            location.column()
        )?;

        write_detail(payload.detail.as_deref(), f, 1)?;
        write_backtrace(payload.backtrace.as_ref(), f, 1)?;

        Ok(())
    }
}

impl error::Error for MconfigError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.payload
            .source
            .as_ref()
            .map(|source| source as &(dyn error::Error + 'static))
    }
}

fn write_backtrace(
    backtrace: &Backtrace,
    f: &mut fmt::Formatter<'_>,
    indent: usize,
) -> fmt::Result {
    let indent_str = "  ".repeat(indent);

    let rendered_backtrace = format!("{backtrace}");
    if !rendered_backtrace.trim().is_empty() {
        write!(f, "\n{indent_str}Backtrace:")?;
        for line in rendered_backtrace.lines() {
            if line.trim().is_empty() {
                write!(f, "\n{indent_str}  ")?;
            } else {
                write!(f, "\n{indent_str}  {line}")?;
            }
        }
    }

    Ok(())
}

fn write_detail(detail: Option<&str>, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
    if let Some(detail) = detail {
        let indent_str = "  ".repeat(indent);
        if detail.trim().is_empty() {
            write!(f, "\n{indent_str}Detail: <empty>")?;
        } else {
            write!(f, "\n{indent_str}Detail:")?;
            for line in detail.lines() {
                if line.trim().is_empty() {
                    write!(f, "\n{indent_str}  ")?;
                } else {
                    write!(f, "\n{indent_str}  {line}")?;
                }
            }
        }
    }

    Ok(())
}

/// Creates an [`MconfigError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for MconfigError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> MconfigError {
        MconfigError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates an [`MconfigError`] from an error kind, static description, and dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for MconfigError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> MconfigError {
        MconfigError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

impl From<std::io::Error> for MconfigError {
    #[track_caller]
    fn from(err: std::io::Error) -> MconfigError {
        let detail = err.to_string();
        MconfigError::from_components(
            ErrorKind::IoError,
            Cow::Borrowed("I/O operation failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Maps JSON failures to [`ErrorKind::SerializationError`] or [`ErrorKind::DeserializationError`]
/// based on the error classification.
impl From<serde_json::Error> for MconfigError {
    #[track_caller]
    fn from(err: serde_json::Error) -> MconfigError {
        let (kind, description) = match err.classify() {
            serde_json::error::Category::Io => (ErrorKind::IoError, "JSON I/O operation failed"),
            serde_json::error::Category::Syntax
            | serde_json::error::Category::Data
            | serde_json::error::Category::Eof => (
                ErrorKind::DeserializationError,
                "JSON deserialization failed",
            ),
        };

        let detail = err.to_string();
        MconfigError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

impl From<base64::DecodeError> for MconfigError {
    #[track_caller]
    fn from(err: base64::DecodeError) -> MconfigError {
        let detail = err.to_string();
        MconfigError::from_components(
            ErrorKind::ConversionError,
            Cow::Borrowed("Base64 decoding failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

impl From<std::str::Utf8Error> for MconfigError {
    #[track_caller]
    fn from(err: std::str::Utf8Error) -> MconfigError {
        let detail = err.to_string();
        MconfigError::from_components(
            ErrorKind::ConversionError,
            Cow::Borrowed("UTF-8 conversion failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Maps database errors to [`ErrorKind::StorageQueryFailed`], I/O errors to
/// [`ErrorKind::IoError`] and pool errors to [`ErrorKind::StorageConnectionFailed`].
impl From<sqlx::Error> for MconfigError {
    #[track_caller]
    fn from(err: sqlx::Error) -> MconfigError {
        let kind = match &err {
            sqlx::Error::Database(_) => ErrorKind::StorageQueryFailed,
            sqlx::Error::Io(_) => ErrorKind::IoError,
            sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
                ErrorKind::StorageConnectionFailed
            }
            _ => ErrorKind::StorageQueryFailed,
        };

        let detail = err.to_string();
        MconfigError::from_components(
            kind,
            Cow::Borrowed("Database operation failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

#[cfg(feature = "kafka")]
impl From<rdkafka::error::KafkaError> for MconfigError {
    #[track_caller]
    fn from(err: rdkafka::error::KafkaError) -> MconfigError {
        let kind = match &err {
            rdkafka::error::KafkaError::ConsumerCommit(_) => ErrorKind::StreamCommitFailed,
            rdkafka::error::KafkaError::ClientCreation(_) => ErrorKind::ConfigError,
            _ => ErrorKind::StreamReadFailed,
        };

        let detail = err.to_string();
        MconfigError::from_components(
            kind,
            Cow::Borrowed("Kafka operation failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}
