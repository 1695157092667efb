//! Mail credential settings
//!
//! Credentials live in two places: the configured defaults (environment) and
//! the store's settings table, which the dashboard writes. A stored, non-blank
//! value wins over the default, key by key.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::traits::Store;

pub const SMTP_SERVER: &str = "smtp_server";
pub const SMTP_PORT: &str = "smtp_port";
pub const SMTP_USERNAME: &str = "smtp_username";
pub const SMTP_PASSWORD: &str = "smtp_password";
pub const SMTP_FROM: &str = "smtp_from";
pub const SMTP_TO: &str = "smtp_to";

const DEFAULT_SMTP_SERVER: &str = "smtp.gmail.com";
const DEFAULT_SMTP_PORT: u16 = 587;

/// Resolved notifier credentials
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailSettings {
    #[serde(default = "default_server")]
    pub server: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Sender address; blank means "use the username"
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
}

// Custom Debug implementation that hides the password
impl std::fmt::Debug for MailSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailSettings")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            server: default_server(),
            port: default_port(),
            username: String::new(),
            password: String::new(),
            from: String::new(),
            to: String::new(),
        }
    }
}

fn default_server() -> String {
    DEFAULT_SMTP_SERVER.to_string()
}

fn default_port() -> u16 {
    DEFAULT_SMTP_PORT
}

fn non_blank(value: &str) -> bool {
    !value.trim().is_empty()
}

impl MailSettings {
    /// Whether every required credential is present
    ///
    /// Server, username, password and recipient must be non-blank.
    pub fn is_configured(&self) -> bool {
        non_blank(&self.server)
            && non_blank(&self.username)
            && non_blank(&self.password)
            && non_blank(&self.to)
    }

    /// Sender address, falling back to the username
    pub fn sender(&self) -> &str {
        if non_blank(&self.from) {
            self.from.trim()
        } else {
            self.username.trim()
        }
    }

    /// Overlay stored settings on top of `defaults`
    pub async fn resolve(store: &dyn Store, defaults: &MailSettings) -> Result<MailSettings> {
        let pick = |stored: Option<String>, fallback: &str| match stored {
            Some(value) if non_blank(&value) => value,
            _ => fallback.to_string(),
        };

        let port = match store.get_setting(SMTP_PORT).await? {
            Some(value) if non_blank(&value) => match value.trim().parse::<u16>() {
                Ok(port) => port,
                Err(_) => {
                    tracing::warn!("Ignoring invalid stored {}: '{}'", SMTP_PORT, value);
                    defaults.port
                }
            },
            _ => defaults.port,
        };

        Ok(MailSettings {
            server: pick(store.get_setting(SMTP_SERVER).await?, &defaults.server),
            port,
            username: pick(store.get_setting(SMTP_USERNAME).await?, &defaults.username),
            password: pick(store.get_setting(SMTP_PASSWORD).await?, &defaults.password),
            from: pick(store.get_setting(SMTP_FROM).await?, &defaults.from),
            to: pick(store.get_setting(SMTP_TO).await?, &defaults.to),
        })
    }

    /// Write every field to the store's settings
    pub async fn save(&self, store: &dyn Store) -> Result<()> {
        store.save_setting(SMTP_SERVER, &self.server).await?;
        store.save_setting(SMTP_PORT, &self.port.to_string()).await?;
        store.save_setting(SMTP_USERNAME, &self.username).await?;
        store.save_setting(SMTP_PASSWORD, &self.password).await?;
        store.save_setting(SMTP_FROM, &self.from).await?;
        store.save_setting(SMTP_TO, &self.to).await?;
        Ok(())
    }
}
