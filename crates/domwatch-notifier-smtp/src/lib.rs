// # SMTP Notifier
//
// This crate delivers availability alerts by email.
//
// ## Message Format
//
// One message per batch, multipart/alternative with a plain-text part and
// an HTML part rendered from `templates/alert.html`. Each line names a
// domain and the keyword that produced it, in batch order.
//
// ## Transport
//
// STARTTLS submission on the configured port (587 by default) with
// username/password authentication. Credentials are resolved by the
// dispatcher for every batch, so settings edited at runtime apply to the
// next delivery.

use askama::Template;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use domwatch_core::config::NotifierConfig;
use domwatch_core::model::{AlertItem, DeliveryReport};
use domwatch_core::settings::MailSettings;
use domwatch_core::traits::{Notifier, NotifierFactory};
use domwatch_core::{Error, Registry, Result};

/// Subject line for a batch of `count` domains
pub fn alert_subject(count: usize) -> String {
    format!("Domain Alert: {} New Domain(s) Found", count)
}

/// Plain-text body
pub fn alert_text(items: &[AlertItem], checked_at: DateTime<Utc>) -> String {
    let mut body = String::from("The following domains are now available for registration:\n\n");
    for item in items {
        body.push_str(&format!("  - {} (keyword: {})\n", item.domain, item.keyword));
    }
    body.push_str(&format!(
        "\nChecked at {}\n",
        checked_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    body
}

#[derive(Template)]
#[template(path = "alert.html")]
struct AlertTemplate<'a> {
    subject: String,
    items: &'a [AlertItem],
    checked_at: String,
}

/// HTML body, rendered from `templates/alert.html` with escaping on
pub fn alert_html(items: &[AlertItem], checked_at: DateTime<Utc>) -> Result<String> {
    AlertTemplate {
        subject: alert_subject(items.len()),
        items,
        checked_at: checked_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    }
    .render()
    .map_err(|e| Error::notifier(format!("Failed to render alert body: {}", e)))
}

/// Build the message for one batch
///
/// `settings.to` may list several recipients separated by commas.
pub fn build_message(
    settings: &MailSettings,
    items: &[AlertItem],
    checked_at: DateTime<Utc>,
) -> Result<Message> {
    let from: Mailbox = settings
        .sender()
        .parse()
        .map_err(|e| Error::notifier(format!("Invalid sender '{}': {}", settings.sender(), e)))?;

    let mut builder = Message::builder().from(from).subject(alert_subject(items.len()));

    let mut recipients = 0;
    for address in settings.to.split(',').map(str::trim).filter(|a| !a.is_empty()) {
        let mailbox: Mailbox = address
            .parse()
            .map_err(|e| Error::notifier(format!("Invalid recipient '{}': {}", address, e)))?;
        builder = builder.to(mailbox);
        recipients += 1;
    }
    if recipients == 0 {
        return Err(Error::notifier("No recipient configured"));
    }

    builder
        .multipart(MultiPart::alternative_plain_html(
            alert_text(items, checked_at),
            alert_html(items, checked_at)?,
        ))
        .map_err(|e| Error::notifier(format!("Failed to build message: {}", e)))
}

/// Email notifier over SMTP with STARTTLS
pub struct SmtpNotifier {
    /// Connection/command timeout
    timeout: Duration,
}

impl SmtpNotifier {
    /// Create a new notifier
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn transport(&self, settings: &MailSettings) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let relay = settings.server.trim();
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(relay)
            .map_err(|e| Error::notifier(format!("Invalid SMTP relay '{}': {}", relay, e)))?
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.trim().to_string(),
                settings.password.clone(),
            ))
            .timeout(Some(self.timeout))
            .build();
        Ok(transport)
    }

    async fn deliver(&self, settings: &MailSettings, items: &[AlertItem]) -> Result<()> {
        let message = build_message(settings, items, Utc::now())?;
        let transport = self.transport(settings)?;

        debug!(
            "Sending alert for {} domain(s) via {}:{}",
            items.len(),
            settings.server,
            settings.port
        );

        let response = transport
            .send(message)
            .await
            .map_err(|e| Error::notifier(format!("SMTP delivery failed: {}", e)))?;

        if !response.is_positive() {
            return Err(Error::notifier(format!(
                "SMTP server answered {}",
                response.code()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_batch(&self, settings: &MailSettings, items: &[AlertItem]) -> DeliveryReport {
        match self.deliver(settings, items).await {
            Ok(()) => {
                info!("Alert email sent to {}", settings.to);
                DeliveryReport::Delivered
            }
            Err(e) => {
                warn!("Alert email not sent: {}", e);
                DeliveryReport::Failed(e.to_string())
            }
        }
    }

    fn notifier_name(&self) -> &'static str {
        "smtp"
    }
}

/// Factory for [`NotifierConfig::Smtp`]
pub struct SmtpNotifierFactory;

impl NotifierFactory for SmtpNotifierFactory {
    fn create(&self, config: &NotifierConfig) -> Result<Arc<dyn Notifier>> {
        match config {
            NotifierConfig::Smtp { timeout_secs } => {
                if *timeout_secs == 0 {
                    return Err(Error::config("SMTP timeout must be > 0"));
                }
                Ok(Arc::new(SmtpNotifier::new(Duration::from_secs(*timeout_secs))))
            }
            _ => Err(Error::config("Invalid config for SMTP notifier")),
        }
    }
}

/// Register the SMTP notifier with a registry
pub fn register(registry: &Registry) -> Result<()> {
    registry.register_notifier("smtp", Box::new(SmtpNotifierFactory))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn items() -> Vec<AlertItem> {
        vec![
            AlertItem {
                domain: "foo.com".to_string(),
                keyword: "foo".to_string(),
            },
            AlertItem {
                domain: "bar.io".to_string(),
                keyword: "bar".to_string(),
            },
        ]
    }

    fn settings() -> MailSettings {
        MailSettings {
            server: "smtp.example.com".to_string(),
            port: 587,
            username: "alerts@example.com".to_string(),
            password: "secret".to_string(),
            from: String::new(),
            to: "owner@example.com, team@example.com".to_string(),
        }
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_subject_counts_domains() {
        assert_eq!(alert_subject(1), "Domain Alert: 1 New Domain(s) Found");
        assert_eq!(alert_subject(12), "Domain Alert: 12 New Domain(s) Found");
    }

    #[test]
    fn test_text_lists_items_in_order() {
        let text = alert_text(&items(), at());
        let foo = text.find("foo.com (keyword: foo)").unwrap();
        let bar = text.find("bar.io (keyword: bar)").unwrap();
        assert!(foo < bar);
        assert!(text.contains("2025-03-01 09:30:00 UTC"));
    }

    #[test]
    fn test_html_escapes_content() {
        let tricky = vec![AlertItem {
            domain: "foo.com".to_string(),
            keyword: "<b>foo</b>".to_string(),
        }];
        let html = alert_html(&tricky, at()).unwrap();
        assert!(!html.contains("<b>foo"));
        assert!(!html.contains("foo</b>"));
        assert!(html.contains("foo.com"));
    }

    #[test]
    fn test_html_lists_items_in_order() {
        let html = alert_html(&items(), at()).unwrap();
        assert!(html.contains("<h2>Domain Alert: 2 New Domain(s) Found</h2>"));
        let foo = html.find("foo.com").unwrap();
        let bar = html.find("bar.io").unwrap();
        assert!(foo < bar);
        assert!(html.contains("Checked at 2025-03-01 09:30:00 UTC"));
    }

    #[test]
    fn test_message_builds_with_all_recipients() {
        let message = build_message(&settings(), &items(), at()).unwrap();
        let envelope = message.envelope();
        assert_eq!(envelope.to().len(), 2);
        // Blank from falls back to the username
        assert_eq!(
            envelope.from().map(|a| a.to_string()),
            Some("alerts@example.com".to_string())
        );
    }

    #[test]
    fn test_message_rejects_bad_addresses() {
        let no_recipient = MailSettings {
            to: " , ".to_string(),
            ..settings()
        };
        assert!(build_message(&no_recipient, &items(), at()).is_err());

        let bad_sender = MailSettings {
            from: "not an address".to_string(),
            ..settings()
        };
        assert!(build_message(&bad_sender, &items(), at()).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_relay_reports_failure() {
        let notifier = SmtpNotifier::new(Duration::from_secs(2));
        let local = MailSettings {
            server: "127.0.0.1".to_string(),
            port: 9,
            ..settings()
        };
        let report = notifier.send_batch(&local, &items()).await;
        assert!(matches!(report, DeliveryReport::Failed(_)));
    }

    #[test]
    fn test_factory_and_registration() {
        let registry = Registry::new();
        register(&registry).unwrap();
        let notifier = registry.create_notifier(&NotifierConfig::default()).unwrap();
        assert_eq!(notifier.notifier_name(), "smtp");

        let zero = NotifierConfig::Smtp { timeout_secs: 0 };
        assert!(SmtpNotifierFactory.create(&zero).is_err());
    }
}
