//! Configuration types for the domwatch system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::settings::MailSettings;

/// Extensions probed when none are configured, in probe order
pub const DEFAULT_EXTENSIONS: [&str; 15] = [
    ".com", ".net", ".org", ".io", ".co", ".ai", ".app", ".dev", ".store", ".biz", ".info", ".me",
    ".tech", ".xyz", ".online",
];

/// Main monitor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Scan scheduling and fan-out
    #[serde(default)]
    pub scan: ScanConfig,

    /// Availability oracle configuration
    #[serde(default)]
    pub oracle: OracleConfig,

    /// Notifier configuration
    #[serde(default)]
    pub notifier: NotifierConfig,

    /// Store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Default mail credentials (stored settings override these)
    #[serde(default)]
    pub mail: MailSettings,
}

impl MonitorConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.scan.validate()?;
        self.oracle.validate()?;
        self.store.validate()?;
        Ok(())
    }
}

/// Scan configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Seconds between scheduled scans
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Domain extensions to probe, in order (each starting with '.')
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Maximum number of concurrent oracle calls within one keyword
    #[serde(default = "default_oracle_concurrency")]
    pub oracle_concurrency: usize,

    /// Capacity of the scan event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            extensions: default_extensions(),
            oracle_concurrency: default_oracle_concurrency(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

impl ScanConfig {
    /// Validate the scan configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.interval_secs == 0 {
            return Err(crate::Error::config("Scan interval must be > 0"));
        }
        if self.oracle_concurrency == 0 {
            return Err(crate::Error::config("Oracle concurrency must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        if self.extensions.is_empty() {
            return Err(crate::Error::config("No domain extensions configured"));
        }

        let mut seen = HashSet::new();
        for ext in &self.extensions {
            let label = ext.strip_prefix('.').unwrap_or_default();
            let valid_part = |part: &str| {
                !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            };
            if label.is_empty() || !label.split('.').all(valid_part) {
                return Err(crate::Error::config(format!(
                    "Invalid domain extension '{}': expected something like '.com'",
                    ext
                )));
            }
            if !seen.insert(ext.to_lowercase()) {
                return Err(crate::Error::config(format!(
                    "Duplicate domain extension '{}'",
                    ext
                )));
            }
        }
        Ok(())
    }
}

fn default_interval_secs() -> u64 {
    3600
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}

fn default_oracle_concurrency() -> usize {
    4
}

fn default_event_channel_capacity() -> usize {
    1000
}

/// Availability oracle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OracleConfig {
    /// DNS resolution, then RDAP registry lookup
    DnsRdap {
        /// RDAP bootstrap/base URL (e.g., "https://rdap.org")
        #[serde(default = "default_rdap_base_url")]
        rdap_base_url: String,
        /// Per-call timeout in seconds
        #[serde(default = "default_oracle_timeout_secs")]
        timeout_secs: u64,
        /// Treat inconclusive lookups as available (legacy heuristic)
        #[serde(default)]
        assume_available_on_failure: bool,
    },

    /// Custom oracle
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl OracleConfig {
    /// Validate the oracle configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            OracleConfig::DnsRdap {
                rdap_base_url,
                timeout_secs,
                ..
            } => {
                if !rdap_base_url.starts_with("https://") && !rdap_base_url.starts_with("http://") {
                    return Err(crate::Error::config(format!(
                        "RDAP base URL must use HTTP or HTTPS. Got: {}",
                        rdap_base_url
                    )));
                }
                if *timeout_secs == 0 {
                    return Err(crate::Error::config("Oracle timeout must be > 0"));
                }
                Ok(())
            }
            OracleConfig::Custom { factory, .. } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom oracle factory cannot be empty"));
                }
                Ok(())
            }
        }
    }

    /// Get the oracle type name
    pub fn type_name(&self) -> &str {
        match self {
            OracleConfig::DnsRdap { .. } => "dns_rdap",
            OracleConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        OracleConfig::DnsRdap {
            rdap_base_url: default_rdap_base_url(),
            timeout_secs: default_oracle_timeout_secs(),
            assume_available_on_failure: false,
        }
    }
}

fn default_rdap_base_url() -> String {
    "https://rdap.org".to_string()
}

fn default_oracle_timeout_secs() -> u64 {
    10
}

/// Notifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotifierConfig {
    /// SMTP with STARTTLS
    Smtp {
        /// Connection timeout in seconds
        #[serde(default = "default_smtp_timeout_secs")]
        timeout_secs: u64,
    },

    /// Custom notifier
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl NotifierConfig {
    /// Get the notifier type name
    pub fn type_name(&self) -> &str {
        match self {
            NotifierConfig::Smtp { .. } => "smtp",
            NotifierConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        NotifierConfig::Smtp {
            timeout_secs: default_smtp_timeout_secs(),
        }
    }
}

fn default_smtp_timeout_secs() -> u64 {
    30
}

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// SQLite database file
    Sqlite {
        /// Path to the database file
        path: String,
    },

    /// In-memory store (not persistent)
    Memory,

    /// Custom store
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl StoreConfig {
    /// Validate the store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StoreConfig::Sqlite { path } if path.trim().is_empty() => {
                Err(crate::Error::config("SQLite database path cannot be empty"))
            }
            StoreConfig::Custom { factory, .. } if factory.is_empty() => {
                Err(crate::Error::config("Custom store factory cannot be empty"))
            }
            _ => Ok(()),
        }
    }

    /// Get the store type name
    pub fn type_name(&self) -> &str {
        match self {
            StoreConfig::Sqlite { .. } => "sqlite",
            StoreConfig::Memory => "memory",
            StoreConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Sqlite {
            path: "data/domains.db".to_string(),
        }
    }
}
