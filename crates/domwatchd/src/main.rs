// # domwatchd - Domain Availability Daemon
//
// The domwatchd daemon is responsible for:
// 1. Reading configuration from environment variables (optionally a `.env` file)
// 2. Initializing the runtime
// 3. Registering the store, oracle and notifier
// 4. Seeding keywords
// 5. Running the scan monitor (or a single scan)
//
// All scanning, reconciliation and alerting logic lives in domwatch-core;
// this binary only wires components together.
//
// ## Configuration
//
// ### Scanning
// - `DOMWATCH_MODE`: `daemon` (default) or `once`
// - `DOMWATCH_SCAN_INTERVAL`: Seconds between scans (default 3600)
// - `DOMWATCH_EXTENSIONS`: Comma-separated extensions (default: 15 common TLDs)
// - `DOMWATCH_KEYWORDS`: Comma-separated keywords registered at start-up
//
// ### Oracle
// - `DOMWATCH_ORACLE_TYPE`: Oracle type (dns_rdap)
// - `DOMWATCH_RDAP_URL`: RDAP service base URL (default https://rdap.org)
// - `DOMWATCH_ORACLE_TIMEOUT_SECS`: Per-lookup timeout (default 10)
// - `DOMWATCH_ORACLE_CONCURRENCY`: Parallel lookups per keyword (default 4)
// - `DOMWATCH_ASSUME_AVAILABLE_ON_FAILURE`: `true` to treat inconclusive lookups as available
//
// ### Store
// - `DOMWATCH_STORE_TYPE`: `sqlite` (default) or `memory`
// - `DOMWATCH_DATABASE_PATH`: SQLite file (default data/domains.db)
//
// ### Mail (stored settings take precedence)
// - `SMTP_SERVER` (default smtp.gmail.com), `SMTP_PORT` (default 587)
// - `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_FROM`, `SMTP_TO`
//
// ### Logging
// - `DOMWATCH_LOG_LEVEL`: trace, debug, info (default), warn, error
//
// ## Signals
//
// SIGTERM/SIGINT stop the daemon after the running scan finishes.
// SIGHUP requests an immediate scan.
//
// ## Example
//
// ```bash
// export DOMWATCH_KEYWORDS=acme,rocketship
// export SMTP_USERNAME=alerts@example.com
// export SMTP_PASSWORD=app-password
// export SMTP_TO=me@example.com
//
// domwatchd
// ```

use anyhow::{Context, Result};
use std::env;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use domwatch_core::config::{
    DEFAULT_EXTENSIONS, MonitorConfig, NotifierConfig, OracleConfig, ScanConfig, StoreConfig,
};
use domwatch_core::engine::{Monitor, MonitorHandle, ScanEvent, ScanOrchestrator, ScanState};
use domwatch_core::{MailSettings, Registry, keywords};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DomwatchExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DomwatchExitCode> for ExitCode {
    fn from(code: DomwatchExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// How the daemon runs scans
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunMode {
    /// Scan at start, then every interval and on SIGHUP
    Daemon,
    /// One scan, then exit
    Once,
}

/// Application configuration
struct Config {
    mode: RunMode,
    scan_interval: u64,
    extensions: Vec<String>,
    keywords: Vec<String>,
    oracle_type: String,
    rdap_url: String,
    oracle_timeout_secs: u64,
    oracle_concurrency: usize,
    assume_available_on_failure: bool,
    store_type: String,
    database_path: String,
    mail: MailSettings,
    log_level: String,
}

/// Parse an optional environment variable
fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", name, raw, e)),
        _ => Ok(None),
    }
}

fn env_string(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Normalize one extension: lower-case, leading dot
fn normalize_extension(raw: &str) -> String {
    let ext = raw.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let mode = match env_string("DOMWATCH_MODE").as_deref().map(str::to_lowercase) {
            None => RunMode::Daemon,
            Some(mode) if mode == "daemon" => RunMode::Daemon,
            Some(mode) if mode == "once" => RunMode::Once,
            Some(other) => anyhow::bail!(
                "DOMWATCH_MODE '{}' is not supported. Supported modes: daemon, once",
                other
            ),
        };

        let extensions = match env_string("DOMWATCH_EXTENSIONS") {
            Some(list) => list
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(normalize_extension)
                .collect(),
            None => DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        };

        let defaults = MailSettings::default();
        let mail = MailSettings {
            server: env_string("SMTP_SERVER").unwrap_or(defaults.server),
            port: env_parse("SMTP_PORT")?.unwrap_or(defaults.port),
            username: env_string("SMTP_USERNAME").unwrap_or_default(),
            password: env_string("SMTP_PASSWORD").unwrap_or_default(),
            from: env_string("SMTP_FROM").unwrap_or_default(),
            to: env_string("SMTP_TO").unwrap_or_default(),
        };

        Ok(Self {
            mode,
            scan_interval: env_parse("DOMWATCH_SCAN_INTERVAL")?.unwrap_or(3600),
            extensions,
            keywords: env_string("DOMWATCH_KEYWORDS")
                .map(|list| keywords::parse_keyword_list(&list))
                .unwrap_or_default(),
            oracle_type: env_string("DOMWATCH_ORACLE_TYPE")
                .unwrap_or_else(|| "dns_rdap".to_string()),
            rdap_url: env_string("DOMWATCH_RDAP_URL")
                .unwrap_or_else(|| "https://rdap.org".to_string()),
            oracle_timeout_secs: env_parse("DOMWATCH_ORACLE_TIMEOUT_SECS")?.unwrap_or(10),
            oracle_concurrency: env_parse("DOMWATCH_ORACLE_CONCURRENCY")?.unwrap_or(4),
            assume_available_on_failure: env_parse("DOMWATCH_ASSUME_AVAILABLE_ON_FAILURE")?
                .unwrap_or(false),
            store_type: env_string("DOMWATCH_STORE_TYPE").unwrap_or_else(|| "sqlite".to_string()),
            database_path: env_string("DOMWATCH_DATABASE_PATH")
                .unwrap_or_else(|| "data/domains.db".to_string()),
            mail,
            log_level: env_string("DOMWATCH_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// This performs validation of:
    /// - Type enumerations (oracle, store)
    /// - Numeric ranges
    /// - Log level
    ///
    /// Extension syntax is checked by [`MonitorConfig::validate`].
    fn validate(&self) -> Result<()> {
        match self.oracle_type.as_str() {
            "dns_rdap" => {}
            _ => anyhow::bail!(
                "DOMWATCH_ORACLE_TYPE '{}' is not supported. Supported types: dns_rdap",
                self.oracle_type
            ),
        }

        match self.store_type.as_str() {
            "sqlite" | "memory" => {}
            _ => anyhow::bail!(
                "DOMWATCH_STORE_TYPE '{}' is not supported. Supported types: sqlite, memory",
                self.store_type
            ),
        }

        if !(60..=604_800).contains(&self.scan_interval) {
            anyhow::bail!(
                "DOMWATCH_SCAN_INTERVAL must be between 60 and 604800 seconds. Got: {}",
                self.scan_interval
            );
        }

        if !(1..=120).contains(&self.oracle_timeout_secs) {
            anyhow::bail!(
                "DOMWATCH_ORACLE_TIMEOUT_SECS must be between 1 and 120 seconds. Got: {}",
                self.oracle_timeout_secs
            );
        }

        if !(1..=32).contains(&self.oracle_concurrency) {
            anyhow::bail!(
                "DOMWATCH_ORACLE_CONCURRENCY must be between 1 and 32. Got: {}",
                self.oracle_concurrency
            );
        }

        if self.mail.port == 0 {
            anyhow::bail!("SMTP_PORT must be between 1 and 65535");
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "DOMWATCH_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        if self.rdap_url.starts_with("http://") {
            eprintln!(
                "WARNING: DOMWATCH_RDAP_URL uses HTTP (not HTTPS). \
                 Lookups can be tampered with in transit."
            );
        }

        self.monitor_config()
            .validate()
            .context("Invalid monitor configuration")?;

        Ok(())
    }

    /// Build the library configuration
    fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            scan: ScanConfig {
                interval_secs: self.scan_interval,
                extensions: self.extensions.clone(),
                oracle_concurrency: self.oracle_concurrency,
                ..ScanConfig::default()
            },
            oracle: OracleConfig::DnsRdap {
                rdap_base_url: self.rdap_url.clone(),
                timeout_secs: self.oracle_timeout_secs,
                assume_available_on_failure: self.assume_available_on_failure,
            },
            notifier: NotifierConfig::default(),
            store: match self.store_type.as_str() {
                "memory" => StoreConfig::Memory,
                _ => StoreConfig::Sqlite {
                    path: self.database_path.clone(),
                },
            },
            mail: self.mail.clone(),
        }
    }
}

fn main() -> ExitCode {
    // A missing .env file is fine
    let dotenv = dotenvy::dotenv();

    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DomwatchExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DomwatchExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DomwatchExitCode::ConfigError.into();
    }

    info!("Starting domwatchd");
    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DomwatchExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {:#}", e);
            DomwatchExitCode::RuntimeError
        } else {
            DomwatchExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    let monitor_config = config.monitor_config();

    // Create registry with the in-memory store built in
    let registry = Registry::with_builtins()?;

    #[cfg(feature = "sqlite")]
    {
        info!("Registering SQLite store");
        domwatch_store_sqlite::register(&registry)?;
    }

    #[cfg(feature = "rdap")]
    {
        info!("Registering DNS/RDAP oracle");
        domwatch_oracle_rdap::register(&registry)?;
    }

    #[cfg(feature = "smtp")]
    {
        info!("Registering SMTP notifier");
        domwatch_notifier_smtp::register(&registry)?;
    }

    let store = registry
        .create_store(&monitor_config.store)
        .await
        .context("Failed to open store")?;
    let oracle = registry.create_oracle(&monitor_config.oracle)?;
    let notifier = registry.create_notifier(&monitor_config.notifier)?;

    if !config.keywords.is_empty() {
        let accepted = keywords::add_keywords(store.as_ref(), &config.keywords)
            .await
            .context("Failed to seed keywords")?;
        info!("Seeded {} keyword(s) from DOMWATCH_KEYWORDS", accepted);
    }

    let (orchestrator, events) =
        ScanOrchestrator::new(store, oracle, notifier, &monitor_config)?;
    tokio::spawn(log_events(events));

    let status = orchestrator.status().await?;
    info!(
        "{} active keyword(s), {} domain(s) currently available, {} extension(s) per keyword",
        status.keyword_count,
        status.available_domain_count,
        monitor_config.scan.extensions.len()
    );
    if !status.notification_configured {
        warn!("Mail credentials incomplete; alerts stay pending until SMTP settings are provided");
    }

    match config.mode {
        RunMode::Once => {
            let report = orchestrator.run_scan().await?;
            orchestrator.store().flush().await?;
            if report.state == ScanState::Failed {
                anyhow::bail!("Scan failed: {}", report.record.status);
            }
            info!(
                "Scan finished: {} keyword(s), {} available domain(s) observed",
                report.keywords_scanned, report.available_found
            );
        }
        RunMode::Daemon => {
            let (monitor, handle) = Monitor::new(
                Arc::new(orchestrator),
                Duration::from_secs(config.scan_interval),
            );

            let (shutdown_tx, shutdown_rx) = oneshot::channel();
            let worker = tokio::spawn(monitor.run_with_shutdown(Some(shutdown_rx)));

            let signal = wait_for_shutdown(&handle).await?;
            info!("Received shutdown signal: {}", signal);
            info!("Waiting for the current scan to finish");

            let _ = shutdown_tx.send(());
            worker.await.context("Monitor task panicked")??;
        }
    }

    info!("domwatchd stopped");
    Ok(())
}

/// Drain scan events into the log
async fn log_events(mut events: mpsc::Receiver<ScanEvent>) {
    while let Some(event) = events.recv().await {
        debug!("Scan event: {:?}", event);
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// SIGHUP triggers a scan and keeps waiting.
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown(handle: &MonitorHandle) -> Result<&'static str> {
    // Set up signal handlers for SIGTERM, SIGINT and SIGHUP
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;
    let mut sighup = signal(SignalKind::hangup())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGHUP handler: {}", e))?;

    loop {
        tokio::select! {
            _ = sigterm.recv() => return Ok("SIGTERM"),
            _ = sigint.recv() => return Ok("SIGINT"),
            _ = sighup.recv() => {
                info!("SIGHUP received, requesting scan: {:?}", handle.start_scan());
            }
        }
    }
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown(_handle: &MonitorHandle) -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
