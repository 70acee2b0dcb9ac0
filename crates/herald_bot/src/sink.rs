//! Destinations for errors nobody is awaiting.

use herald_core::InboundItem;
use herald_error::HeraldError;
use std::sync::Arc;
use tracing::{debug, error};

/// Receives errors from background work.
pub type ErrorSink = Arc<dyn Fn(HeraldError) + Send + Sync>;

/// Receives a failed group's error together with the group's first item.
pub type FailureSink = Arc<dyn Fn(HeraldError, &InboundItem) + Send + Sync>;

/// Log errors; absent posts are expected and only logged at debug level.
pub fn log_errors() -> ErrorSink {
    Arc::new(|e: HeraldError| {
        if e.is_not_found() {
            debug!(error = %e, "Post is gone");
        } else {
            error!(error = %e, "Background operation failed");
        }
    })
}

/// Log group failures with the chat and item they came from.
pub fn log_failures() -> FailureSink {
    Arc::new(|e: HeraldError, item: &InboundItem| {
        if e.is_not_found() {
            debug!(chat_id = item.chat_id, item_id = item.item_id, error = %e, "Post is gone");
        } else {
            error!(
                chat_id = item.chat_id,
                item_id = item.item_id,
                error = %e,
                "Failed to handle media group"
            );
        }
    })
}
