//! Order notification sink
//!
//! Notifications are fire-and-forget: a failed send is reported as `false`
//! and logged, never propagated.

use async_trait::async_trait;

#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Tell a customer their order was completed
    async fn notify(&self, order_id: &str, customer_id: &str) -> bool;

    /// Delivery mode reported by the health endpoint
    fn mode(&self) -> &'static str;
}

/// Simulated notifier that only writes log lines
#[derive(Debug, Clone, Copy)]
pub struct LogNotifier {
    enabled: bool,
}

impl LogNotifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn notify(&self, order_id: &str, customer_id: &str) -> bool {
        if !self.enabled {
            return false;
        }
        tracing::info!(
            order_id = %order_id,
            customer_id = %customer_id,
            "Sending completion notification"
        );
        tracing::info!("[NOTIFICATION] Order {order_id} has been marked as completed");
        tracing::info!("[NOTIFICATION] Customer {customer_id} notified about order completion");
        true
    }

    fn mode(&self) -> &'static str {
        if self.enabled { "simulated" } else { "disabled" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_enabled_notifier_succeeds() {
        let notifier = LogNotifier::new(true);
        assert!(notifier.notify("O1", "C1").await);
        assert_eq!(notifier.mode(), "simulated");
    }

    #[tokio::test]
    async fn test_disabled_notifier_reports_false() {
        let notifier = LogNotifier::new(false);
        assert!(!notifier.notify("O1", "C1").await);
        assert_eq!(notifier.mode(), "disabled");
    }

    #[tokio::test]
    async fn test_usable_as_trait_object() {
        let sink: std::sync::Arc<dyn NotificationSink> = std::sync::Arc::new(LogNotifier::new(true));
        assert!(sink.notify("O2", "C2").await);
    }
}
