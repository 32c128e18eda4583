//! Operator alerts.

use async_trait::async_trait;

/// Receives operator-facing alert messages.
///
/// Delivery is best effort: implementations handle their own failures and
/// never report them back to the caller.
#[async_trait]
pub trait AlertSink: Send + Sync + 'static {
    /// Delivers `message`.
    async fn alert(&self, message: &str);
}

/// Alert sink that writes alerts to the log at error level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn alert(&self, message: &str) {
        tracing::error!(alert = true, "{message}");
    }
}
