use std::backtrace::Backtrace;
use std::error::Error;
use std::fmt;

use loader::error::EtlError;

use crate::event::InvalidEvent;

/// Result type for load runner operations.
pub type LoadRunnerResult<T> = Result<T, LoadRunnerError>;

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

/// Error type for the load runner.
///
/// Every variant is a setup failure. Per-table failures are part of the load report instead.
#[derive(Debug)]
pub enum LoadRunnerError {
    /// Loader error, e.g. the warehouse is unreachable or the tables cannot be created.
    Etl(EtlError),
    /// Configuration or credentials error.
    Config(Box<dyn Error + Send + Sync>, CapturedBacktrace),
    /// The trigger event could not be interpreted.
    Event(InvalidEvent, CapturedBacktrace),
    /// I/O error.
    Io(std::io::Error, CapturedBacktrace),
}

impl LoadRunnerError {
    /// Returns a short category label for this error.
    pub fn category(&self) -> &'static str {
        match self {
            LoadRunnerError::Etl(_) => "load error",
            LoadRunnerError::Config(_, _) => "configuration error",
            LoadRunnerError::Event(_, _) => "event error",
            LoadRunnerError::Io(_, _) => "i/o error",
        }
    }

    /// Returns the backtrace for this error.
    pub fn backtrace(&self) -> &Backtrace {
        match self {
            LoadRunnerError::Etl(err) => err.backtrace(),
            LoadRunnerError::Config(_, cb) => &cb.0,
            LoadRunnerError::Event(_, cb) => &cb.0,
            LoadRunnerError::Io(_, cb) => &cb.0,
        }
    }

    /// Creates a configuration error from any boxed source.
    pub fn config<E: Error + Send + Sync + 'static>(err: E) -> Self {
        LoadRunnerError::Config(Box::new(err), CapturedBacktrace::capture())
    }
}

impl fmt::Display for LoadRunnerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadRunnerError::Etl(err) => write!(f, "{}", err.message()),
            LoadRunnerError::Config(source, _) => write!(f, "configuration error: {source}"),
            LoadRunnerError::Event(source, _) => write!(f, "invalid trigger event: {source}"),
            LoadRunnerError::Io(source, _) => write!(f, "i/o error: {source}"),
        }
    }
}

impl Error for LoadRunnerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LoadRunnerError::Etl(err) => err.source(),
            LoadRunnerError::Config(source, _) => Some(source.as_ref()),
            LoadRunnerError::Event(source, _) => Some(source),
            LoadRunnerError::Io(source, _) => Some(source),
        }
    }
}

impl From<std::io::Error> for LoadRunnerError {
    fn from(err: std::io::Error) -> Self {
        LoadRunnerError::Io(err, CapturedBacktrace::capture())
    }
}

impl From<EtlError> for LoadRunnerError {
    fn from(err: EtlError) -> Self {
        LoadRunnerError::Etl(err)
    }
}

impl From<InvalidEvent> for LoadRunnerError {
    fn from(err: InvalidEvent) -> Self {
        LoadRunnerError::Event(err, CapturedBacktrace::capture())
    }
}
