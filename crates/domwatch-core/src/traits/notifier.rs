// # Notifier Trait
//
// Defines the interface for delivering availability alerts.
//
// ## Implementations
//
// - SMTP: `domwatch-notifier-smtp` crate

use async_trait::async_trait;
use std::sync::Arc;

use crate::model::{AlertItem, DeliveryReport};
use crate::settings::MailSettings;

/// Trait for notifier implementations
///
/// A notifier receives the whole dispatch batch in one call and reports
/// whether it was delivered. It does not decide what to send or mark
/// anything as notified; both belong to the
/// [`NotificationDispatcher`](crate::dispatch::NotificationDispatcher).
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Open a connection to the configured mail relay
/// - ✅ Format the batch into a message
///
/// ## Forbidden Capabilities
/// - ❌ Split a batch into several deliveries
/// - ❌ Access the store
/// - ❌ Retry internally (the dispatcher retries on the next scan)
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one batch
    ///
    /// # Parameters
    ///
    /// - `settings`: Resolved credentials (already checked as configured)
    /// - `items`: Alert lines, in dispatch order (never empty)
    ///
    /// # Returns
    ///
    /// - `DeliveryReport::Delivered`: The relay accepted the message
    /// - `DeliveryReport::Failed(reason)`: Anything else
    async fn send_batch(&self, settings: &MailSettings, items: &[AlertItem]) -> DeliveryReport;

    /// Get the notifier name (for logging/debugging)
    fn notifier_name(&self) -> &'static str;
}

/// Helper trait for constructing notifiers from configuration
pub trait NotifierFactory: Send + Sync {
    /// Create a notifier instance from configuration
    fn create(
        &self,
        config: &crate::config::NotifierConfig,
    ) -> Result<Arc<dyn Notifier>, crate::Error>;
}
