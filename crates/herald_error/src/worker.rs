//! Worker and aggregator error types.

/// Scheduling worker and media aggregator error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum WorkerErrorKind {
    /// The sources follow-up was never acknowledged in time
    #[display("sources for post `{}` have never been actually posted", _0)]
    CorrelationTimeout(String),
    /// The inbound item kind cannot become part of a post
    #[display("{} are not supported right now", _0)]
    UnsupportedItem(String),
    /// A group was dispatched without any items
    #[display("no items provided")]
    EmptyGroup,
    /// The group handler panicked
    #[display("handler for group `{}` panicked: {}", group, message)]
    HandlerPanicked {
        /// Group identifier
        group: String,
        /// Panic payload, when it was a string
        message: String,
    },
    /// A scratch directory could not be created
    #[display("failed to create scratch directory in {}: {}", path, message)]
    ScratchDir {
        /// Parent directory
        path: String,
        /// Failure reason
        message: String,
    },
    /// A temporary file could not be removed
    #[display("failed to remove {}: {}", path, message)]
    Cleanup {
        /// Temporary file path
        path: String,
        /// Failure reason
        message: String,
    },
}

/// Worker error with source location tracking.
///
/// # Examples
///
/// ```
/// use herald_error::{WorkerError, WorkerErrorKind};
///
/// let err = WorkerError::new(WorkerErrorKind::UnsupportedItem("stickers".to_string()));
/// assert!(format!("{}", err).contains("stickers are not supported"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Worker Error: {} at line {} in {}", kind, line, file)]
pub struct WorkerError {
    /// The kind of error that occurred
    pub kind: WorkerErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl WorkerError {
    /// Create a new WorkerError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: WorkerErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
