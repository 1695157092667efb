//! Notification dispatch
//!
//! Selects every record that is available and not yet notified, hands the
//! whole set to the notifier as one batch and marks the batch notified only
//! after confirmed delivery.
//!
//! ## Delivery Guarantee
//!
//! At-least-once per availability episode. A failed delivery leaves every
//! record of the batch pending, so the next scan retries all of them. A
//! crash between delivery and marking can produce one duplicate alert; it
//! never loses one.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::model::{AlertItem, DeliveryReport, DomainId};
use crate::settings::MailSettings;
use crate::traits::{Notifier, Store};

/// Result of one dispatch pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// Credentials are incomplete; nothing was sent or marked
    NotConfigured,
    /// No record was pending
    NothingToSend,
    /// The batch was delivered and every record in it marked notified
    Delivered { count: usize },
    /// Delivery failed; every record in the batch is still pending
    Failed { reason: String, count: usize },
}

impl NotificationOutcome {
    /// Number of records marked notified by this pass
    pub fn marked(&self) -> usize {
        match self {
            NotificationOutcome::Delivered { count } => *count,
            _ => 0,
        }
    }
}

/// Batches pending alerts and records confirmed deliveries
#[derive(Clone)]
pub struct NotificationDispatcher {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    mail_defaults: MailSettings,
}

impl NotificationDispatcher {
    /// Create a dispatcher
    ///
    /// # Parameters
    ///
    /// - `store`: Store holding domain records and stored mail settings
    /// - `notifier`: Delivery channel
    /// - `mail_defaults`: Credentials used where no stored setting exists
    pub fn new(
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
        mail_defaults: MailSettings,
    ) -> Self {
        Self {
            store,
            notifier,
            mail_defaults,
        }
    }

    /// Resolve the credentials the next dispatch would use
    pub async fn mail_settings(&self) -> Result<MailSettings> {
        MailSettings::resolve(self.store.as_ref(), &self.mail_defaults).await
    }

    /// Whether a dispatch would currently attempt delivery
    pub async fn is_configured(&self) -> Result<bool> {
        Ok(self.mail_settings().await?.is_configured())
    }

    /// Send every pending alert as one batch
    ///
    /// # Errors
    ///
    /// Only store failures are errors. A notifier failure is reported as
    /// [`NotificationOutcome::Failed`].
    pub async fn dispatch(&self) -> Result<NotificationOutcome> {
        let settings = self.mail_settings().await?;
        if !settings.is_configured() {
            debug!("Mail credentials incomplete, skipping notification");
            return Ok(NotificationOutcome::NotConfigured);
        }

        let pending = self.store.pending_alerts().await?;
        if pending.is_empty() {
            debug!("No pending alerts");
            return Ok(NotificationOutcome::NothingToSend);
        }

        let (ids, items): (Vec<DomainId>, Vec<AlertItem>) = pending
            .into_iter()
            .map(|alert| (alert.domain_id, alert.item))
            .unzip();
        let count = items.len();

        match self.notifier.send_batch(&settings, &items).await {
            DeliveryReport::Delivered => {
                self.store.mark_notified(&ids).await?;
                info!(
                    "Delivered alert for {} domain(s) via {}",
                    count,
                    self.notifier.notifier_name()
                );
                Ok(NotificationOutcome::Delivered { count })
            }
            DeliveryReport::Failed(reason) => {
                warn!(
                    "Alert delivery via {} failed, {} domain(s) stay pending: {}",
                    self.notifier.notifier_name(),
                    count,
                    reason
                );
                Ok(NotificationOutcome::Failed { reason, count })
            }
        }
    }
}
