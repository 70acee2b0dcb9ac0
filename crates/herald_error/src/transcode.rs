//! Transcoding tool error types.

/// Transcoding failure conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum TranscodeErrorKind {
    /// The identify tool failed
    #[display("while identifying {} an error occurred: {}", path, message)]
    Identify {
        /// File being inspected
        path: String,
        /// Tool output or failure reason
        message: String,
    },
    /// The conversion tool failed
    #[display("while converting {} an error occurred: {}", path, message)]
    Convert {
        /// File being converted
        path: String,
        /// Tool output or failure reason
        message: String,
    },
    /// The tool produced output that could not be parsed
    #[display("unexpected tool output: {}", _0)]
    UnexpectedOutput(String),
    /// Spawning the tool or touching the file failed
    #[display("I/O error: {}", _0)]
    Io(String),
}

/// Transcoding error with source location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Transcode Error: {} at line {} in {}", kind, line, file)]
pub struct TranscodeError {
    /// The kind of error that occurred
    pub kind: TranscodeErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl TranscodeError {
    /// Create a new TranscodeError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: TranscodeErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

impl From<std::io::Error> for TranscodeError {
    #[track_caller]
    fn from(e: std::io::Error) -> Self {
        Self::new(TranscodeErrorKind::Io(e.to_string()))
    }
}
