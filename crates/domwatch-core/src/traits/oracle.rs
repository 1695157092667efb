// # Availability Oracle Trait
//
// Defines the interface for deciding whether a domain name is registered.
//
// ## Implementations
//
// - DNS + RDAP: `domwatch-oracle-rdap` crate
//
// ## Usage
//
// ```rust,ignore
// use domwatch_core::{AvailabilityOracle, Availability};
//
// let oracle = /* AvailabilityOracle implementation */;
// match oracle.check("example.com").await {
//     Availability::Available => println!("free"),
//     Availability::Taken => println!("registered"),
//     Availability::Unknown => println!("try again next scan"),
// }
// ```

use async_trait::async_trait;
use std::sync::Arc;

use crate::model::Availability;

/// Trait for availability oracle implementations
///
/// # Trust Level: Untrusted
///
/// Oracles are external integrations with strict limitations:
///
/// ## Allowed Capabilities
/// - ✅ Perform network lookups (DNS, RDAP, WHOIS) for the queried name only
/// - ✅ Apply a per-call timeout
///
/// ## Forbidden Capabilities
/// - ❌ Access the store (owned by the reconciliation engine)
/// - ❌ Retry across scans or cache answers between calls
/// - ❌ Share mutable state between concurrent calls
///
/// ## Failure Semantics
///
/// `check` never errors. An ordinary "not registered" answer is
/// [`Availability::Available`]; anything the oracle cannot decide is
/// [`Availability::Unknown`], which the orchestrator skips without touching stored state.
#[async_trait]
pub trait AvailabilityOracle: Send + Sync {
    /// Check a fully-qualified domain name
    async fn check(&self, domain: &str) -> Availability;

    /// Get the oracle name (for logging/debugging)
    fn oracle_name(&self) -> &'static str;
}

/// Helper trait for constructing oracles from configuration
pub trait OracleFactory: Send + Sync {
    /// Create an oracle instance from configuration
    fn create(
        &self,
        config: &crate::config::OracleConfig,
    ) -> Result<Arc<dyn AvailabilityOracle>, crate::Error>;
}
