use std::path::PathBuf;

/// Errors that can occur when driving ExifTool.
///
/// Errors are organized by category:
/// - Spawn errors: the executable could not be started
/// - IO errors: communication failures with the subprocess
/// - State errors: operations on a closed process or session
/// - Input errors: bad arguments or configuration, unreadable files
/// - Tool errors: ExifTool ran but reported a failure
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    // -------------------------------------------------------------------------
    // Spawn errors
    // -------------------------------------------------------------------------
    /// ExifTool executable not found or not executable.
    #[error("exiftool not found at {path}")]
    ExecutableNotFound { path: String },

    /// Failed to spawn the exiftool subprocess.
    #[error("failed to spawn exiftool process: {0}")]
    ProcessSpawn(#[source] std::io::Error),

    // -------------------------------------------------------------------------
    // IO errors
    // -------------------------------------------------------------------------
    /// IO error communicating with the exiftool subprocess.
    #[error("IO error: {0}")]
    Io(#[source] std::io::Error),

    /// Output stream ended before the end of the response.
    #[error("stream closed unexpectedly")]
    StreamClosed,

    // -------------------------------------------------------------------------
    // State errors
    // -------------------------------------------------------------------------
    /// Read or write attempted on a process whose streams are closed.
    #[error("cannot {operation} closed process")]
    ProcessClosed { operation: &'static str },

    /// Operation attempted after the session was closed.
    #[error("session is closed")]
    SessionClosed,

    // -------------------------------------------------------------------------
    // Input errors
    // -------------------------------------------------------------------------
    /// File referenced by a command does not exist or cannot be read.
    #[error("file {} is not readable: {source}", .path.display())]
    UnreadableFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid argument passed to an operation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid configuration provided to builder.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // -------------------------------------------------------------------------
    // Tool errors
    // -------------------------------------------------------------------------
    /// One-shot exiftool invocation exited unsuccessfully.
    #[error("exiftool failed (exit code {exit_code:?}): {stderr}")]
    ToolFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    /// Failed to parse JSON from exiftool output.
    #[error("failed to parse JSON: {message}")]
    JsonParse {
        message: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Coarse classification of [`Error`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The executable is missing or could not be started.
    NotFound,
    /// Stream read, write or close failure.
    Io,
    /// Operation on a closed process or session.
    IllegalState,
    /// Pre-flight check on a referenced file failed.
    UnreadableResource,
    /// Bad arguments or configuration.
    InvalidInput,
    /// The tool ran and reported a failure.
    Tool,
}

/// A specialized Result type for libexiftool operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a JSON parse error with context.
    pub fn json_parse(source: serde_json::Error, raw: &str) -> Self {
        Self::JsonParse {
            message: format!(
                "at line {} column {}: {}",
                source.line(),
                source.column(),
                raw.chars().take(100).collect::<String>()
            ),
            source,
        }
    }

    /// Create an IO error.
    pub fn io(source: std::io::Error) -> Self {
        Self::Io(source)
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ExecutableNotFound { .. } | Error::ProcessSpawn(_) => ErrorKind::NotFound,
            Error::Io(_) | Error::StreamClosed => ErrorKind::Io,
            Error::ProcessClosed { .. } | Error::SessionClosed => ErrorKind::IllegalState,
            Error::UnreadableFile { .. } => ErrorKind::UnreadableResource,
            Error::InvalidArgument(_) | Error::InvalidConfig(_) => ErrorKind::InvalidInput,
            Error::ToolFailed { .. } | Error::JsonParse { .. } => ErrorKind::Tool,
        }
    }

    /// Check if this error leaves a persistent process in an unknown state.
    ///
    /// A stay-open process that produced such an error is discarded and the
    /// next call starts a new one.
    pub fn is_poisoning(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::StreamClosed | Error::ProcessClosed { .. }
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::JsonParse {
            message: err.to_string(),
            source: err,
        }
    }
}
