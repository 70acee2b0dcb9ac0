//! Error types for the Herald channel scheduler.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use herald_error::{HeraldResult, PostError, PostErrorKind};
//!
//! fn load(id: &str) -> HeraldResult<String> {
//!     Err(PostError::new(PostErrorKind::NotFound(id.to_string())))?
//! }
//!
//! let err = load("album-1").unwrap_err();
//! assert!(err.is_not_found());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod post;
mod transcode;
mod transport;
mod worker;

pub use config::ConfigError;
pub use error::{HeraldError, HeraldErrorKind, HeraldResult};
pub use post::{PostError, PostErrorKind};
pub use transcode::{TranscodeError, TranscodeErrorKind};
pub use transport::TransportError;
pub use worker::{WorkerError, WorkerErrorKind};
