// # DNS + RDAP Availability Oracle
//
// This crate decides whether a domain name is registered.
//
// ## Algorithm
//
// 1. Resolve the name. Any address means the name is registered (Taken).
// 2. Otherwise ask the RDAP service (`{base}/domain/{name}`):
//    - 2xx: the registry knows the name (Taken)
//    - 404: the registry does not know it (Available)
// 3. Anything else (timeout, transport error, other status) is Unknown.
//
// Many registered names have no address records, so a failed resolution
// alone never counts as Available.
//
// ## Legacy Heuristic
//
// `assume_available_on_failure` turns step 3 into Available. This matches
// the behavior of older deployments but produces false alerts whenever the
// RDAP service is unreachable, so it is off by default.

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use domwatch_core::config::OracleConfig;
use domwatch_core::model::Availability;
use domwatch_core::traits::{AvailabilityOracle, OracleFactory};
use domwatch_core::{Error, Registry, Result};

/// Media type of RDAP responses
const RDAP_MEDIA_TYPE: &str = "application/rdap+json";

/// Port used only to satisfy the resolver API
const RESOLVE_PORT: u16 = 80;

/// Map an RDAP response status to an availability answer
pub fn classify_rdap_status(status: StatusCode) -> Availability {
    if status.is_success() {
        Availability::Taken
    } else if status == StatusCode::NOT_FOUND {
        Availability::Available
    } else {
        Availability::Unknown
    }
}

/// Build the RDAP domain query URL
pub fn rdap_url(base_url: &str, domain: &str) -> String {
    format!("{}/domain/{}", base_url.trim_end_matches('/'), domain)
}

/// Availability oracle backed by DNS and RDAP
pub struct RdapOracle {
    /// RDAP service base URL
    base_url: String,

    /// Per-step timeout
    timeout: Duration,

    /// Report inconclusive lookups as Available
    assume_available_on_failure: bool,

    /// HTTP client
    client: reqwest::Client,
}

impl RdapOracle {
    /// Create a new oracle
    ///
    /// # Parameters
    ///
    /// - `base_url`: RDAP service (e.g., "https://rdap.org")
    /// - `timeout`: Bound for the DNS step and for the RDAP request
    /// - `assume_available_on_failure`: Legacy heuristic, see crate docs
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        assume_available_on_failure: bool,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("domwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::oracle(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into(),
            timeout,
            assume_available_on_failure,
            client,
        })
    }

    /// Whether the name currently resolves to at least one address
    async fn resolves(&self, domain: &str) -> bool {
        match tokio::time::timeout(self.timeout, tokio::net::lookup_host((domain, RESOLVE_PORT)))
            .await
        {
            Ok(Ok(mut addrs)) => addrs.next().is_some(),
            Ok(Err(e)) => {
                debug!("{} does not resolve: {}", domain, e);
                false
            }
            Err(_) => {
                debug!("DNS lookup for {} timed out", domain);
                false
            }
        }
    }

    /// Ask the RDAP service about the name
    async fn rdap_lookup(&self, domain: &str) -> Availability {
        let url = rdap_url(&self.base_url, domain);
        let response = match self
            .client
            .get(&url)
            .header(ACCEPT, RDAP_MEDIA_TYPE)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return self.inconclusive(domain, &format!("RDAP request failed: {}", e)),
        };

        match classify_rdap_status(response.status()) {
            Availability::Unknown => {
                self.inconclusive(domain, &format!("RDAP answered {}", response.status()))
            }
            answer => {
                debug!("RDAP says {} is {:?}", domain, answer);
                answer
            }
        }
    }

    fn inconclusive(&self, domain: &str, reason: &str) -> Availability {
        if self.assume_available_on_failure {
            warn!("{} for {}, assuming available", reason, domain);
            Availability::Available
        } else {
            warn!("{} for {}", reason, domain);
            Availability::Unknown
        }
    }
}

#[async_trait]
impl AvailabilityOracle for RdapOracle {
    async fn check(&self, domain: &str) -> Availability {
        if self.resolves(domain).await {
            debug!("{} resolves, taken", domain);
            return Availability::Taken;
        }
        self.rdap_lookup(domain).await
    }

    fn oracle_name(&self) -> &'static str {
        "dns_rdap"
    }
}

/// Factory for [`OracleConfig::DnsRdap`]
pub struct RdapOracleFactory;

impl OracleFactory for RdapOracleFactory {
    fn create(&self, config: &OracleConfig) -> Result<Arc<dyn AvailabilityOracle>> {
        match config {
            OracleConfig::DnsRdap {
                rdap_base_url,
                timeout_secs,
                assume_available_on_failure,
            } => {
                if *assume_available_on_failure {
                    warn!("Oracle will report inconclusive lookups as available");
                }
                Ok(Arc::new(RdapOracle::new(
                    rdap_base_url.clone(),
                    Duration::from_secs(*timeout_secs),
                    *assume_available_on_failure,
                )?))
            }
            _ => Err(Error::config("Invalid config for DNS/RDAP oracle")),
        }
    }
}

/// Register the DNS/RDAP oracle with a registry
pub fn register(registry: &Registry) -> Result<()> {
    registry.register_oracle("dns_rdap", Box::new(RdapOracleFactory))
}
