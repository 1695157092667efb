// # domwatch-core
//
// Core library for the domwatch domain availability monitor.
//
// ## Architecture Overview
//
// - **AvailabilityOracle**: Trait for deciding whether a domain can be registered
// - **Notifier**: Trait for delivering one alert batch
// - **Store**: Trait for persistent state (keywords, domain records, scan history, settings)
// - **ScanOrchestrator**: Drives one scan pass: variations → oracle → reconcile → dispatch
// - **Monitor**: Single worker that runs scheduled and manually triggered scans
// - **Registry**: Plugin-based registry for oracles, notifiers and stores
//
// ## Design Principles
//
// 1. **One writer of domain state**: Only reconciliation mutates domain records
// 2. **Episode-scoped alerts**: A domain alerts once per availability episode
// 3. **At-least-once delivery**: Records are marked notified only after confirmed delivery
// 4. **Library-First**: The daemon is a thin wrapper around this crate
// 5. **Injected collaborators**: No global handles; every component receives its store

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod keywords;
pub mod model;
pub mod reconcile;
pub mod registry;
pub mod settings;
pub mod state;
pub mod traits;
pub mod variations;

// Re-export core types for convenience
pub use config::{MonitorConfig, NotifierConfig, OracleConfig, ScanConfig, StoreConfig};
pub use dispatch::{NotificationDispatcher, NotificationOutcome};
pub use engine::{Monitor, MonitorHandle, ScanEvent, ScanOrchestrator, ScanReport, TriggerAck};
pub use error::{Error, Result};
pub use model::{
    AlertItem, Availability, DeliveryReport, DomainId, DomainRecord, Keyword, KeywordId,
    ScanRecord, TransitionKind,
};
pub use registry::Registry;
pub use settings::MailSettings;
pub use state::MemoryStore;
pub use traits::{AvailabilityOracle, Notifier, Store};
pub use variations::generate_variations;
