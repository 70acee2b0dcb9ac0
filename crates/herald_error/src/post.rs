//! Post store error types.

/// Post store error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum PostErrorKind {
    /// No post (or slot member) with the given identity
    #[display("Not found: {}", _0)]
    NotFound(String),
    /// Malformed time slot, unsupported media or an invalid post
    #[display("Invalid input: {}", _0)]
    InvalidInput(String),
    /// A post with the derived id is already stored
    #[display("Post with id {} already exists", _0)]
    AlreadyExists(String),
    /// An inbound item is bigger than the configured limit
    #[display(
        "{} is too big: {:.2} MB (max {:.2} MB)",
        item,
        *size as f64 / 1_000_000.0,
        *limit as f64 / 1_000_000.0
    )]
    TooLarge {
        /// Remote id of the offending item
        item: String,
        /// Declared size in bytes
        size: u64,
        /// Configured maximum in bytes
        limit: u64,
    },
    /// The key-value backend failed
    #[display("Backend error: {}", _0)]
    Backend(String),
    /// A stored record could not be decoded
    #[display("Corrupted record: {}", _0)]
    Corrupted(String),
    /// Several steps of a multi-key operation failed
    #[display("{} step(s) failed:\n{}", _0.len(), _0.join("\n"))]
    Aggregate(Vec<String>),
}

/// Post store error with source location tracking.
///
/// # Examples
///
/// ```
/// use herald_error::{PostError, PostErrorKind};
///
/// let err = PostError::new(PostErrorKind::AlreadyExists("album-7".to_string()));
/// assert!(format!("{}", err).contains("already exists"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Post Error: {} at line {} in {}", kind, line, file)]
pub struct PostError {
    /// The kind of error that occurred
    pub kind: PostErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl PostError {
    /// Create a new PostError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: PostErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Shorthand for [`PostErrorKind::NotFound`].
    #[track_caller]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::new(PostErrorKind::NotFound(what.into()))
    }

    /// Shorthand for [`PostErrorKind::InvalidInput`].
    #[track_caller]
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::new(PostErrorKind::InvalidInput(reason.into()))
    }

    /// Shorthand for [`PostErrorKind::Backend`].
    #[track_caller]
    pub fn backend(reason: impl std::fmt::Display) -> Self {
        Self::new(PostErrorKind::Backend(reason.to_string()))
    }

    /// Whether the entity was simply absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, PostErrorKind::NotFound(_))
    }
}
