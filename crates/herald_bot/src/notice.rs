//! Short-lived notices.

use crate::tasks::BackgroundTasks;
use crate::transport::{SendOptions, Transport};
use herald_core::ChatId;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Send `text` to `destination` and delete it after `lifetime`.
///
/// Runs entirely in a task tracked by `tasks`; failures are logged and never
/// reach the caller.
pub fn send_expiring(
    tasks: &BackgroundTasks,
    transport: Arc<dyn Transport>,
    destination: ChatId,
    text: impl Into<String>,
    options: SendOptions,
    lifetime: Duration,
) {
    let text = text.into();
    tasks.spawn("expiring-notice", async move {
        let sent = match transport.send_text(destination, &text, &options).await {
            Ok(sent) => sent,
            Err(e) => {
                warn!(destination, error = %e, "Failed to send notice");
                return;
            }
        };
        tokio::time::sleep(lifetime).await;
        match transport.delete(sent).await {
            Ok(()) => debug!(message = %sent, "Notice expired"),
            Err(e) => warn!(message = %sent, error = %e, "Failed to delete notice"),
        }
    });
}
