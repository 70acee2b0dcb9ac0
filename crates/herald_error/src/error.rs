//! Top-level error wrapper types.

use crate::{ConfigError, PostError, TranscodeError, TransportError, WorkerError};

/// Every error a Herald component can surface.
///
/// # Examples
///
/// ```
/// use herald_error::{HeraldError, TransportError};
///
/// let err: HeraldError = TransportError::new("flood wait").into();
/// assert!(format!("{}", err).contains("Transport Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum HeraldErrorKind {
    /// Post store error
    #[from(PostError)]
    Post(PostError),
    /// Messaging backend error
    #[from(TransportError)]
    Transport(TransportError),
    /// Transcoding tool error
    #[from(TranscodeError)]
    Transcode(TranscodeError),
    /// Worker or aggregator error
    #[from(WorkerError)]
    Worker(WorkerError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
}

/// Herald error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Herald Error: {}", _0)]
pub struct HeraldError(Box<HeraldErrorKind>);

impl HeraldError {
    /// Create a new error from a kind.
    pub fn new(kind: HeraldErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &HeraldErrorKind {
        &self.0
    }

    /// Whether this is a post store `NotFound`, the expected outcome of racing a removal.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind(), HeraldErrorKind::Post(e) if e.is_not_found())
    }
}

impl<T> From<T> for HeraldError
where
    T: Into<HeraldErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Herald operations.
pub type HeraldResult<T> = std::result::Result<T, HeraldError>;
