//! Core traits for the domwatch system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`AvailabilityOracle`]: Decide whether a domain is registered
//! - [`Notifier`]: Deliver one alert batch
//! - [`Store`]: Persistent state for keywords, domain records, scans and settings

pub mod notifier;
pub mod oracle;
pub mod store;

pub use notifier::{Notifier, NotifierFactory};
pub use oracle::{AvailabilityOracle, OracleFactory};
pub use store::{Store, StoreFactory};
