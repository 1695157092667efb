//! Plugin-based component registry
//!
//! The registry allows oracles, notifiers and stores to be registered
//! dynamically at runtime, avoiding hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use domwatch_core::registry::Registry;
//! use domwatch_core::config::OracleConfig;
//!
//! // Create a registry
//! let registry = Registry::new();
//!
//! // Collaborator crates register their factories
//! domwatch_oracle_rdap::register(&registry)?;
//!
//! // Create an oracle from config
//! let oracle = registry.create_oracle(&OracleConfig::default())?;
//! ```
//!
//! ## Registration
//!
//! Implementations should register themselves during initialization:
//!
//! ```rust,ignore
//! // In domwatch-oracle-rdap crate
//! pub fn register(registry: &Registry) -> Result<()> {
//!     registry.register_oracle("dns_rdap", Box::new(RdapOracleFactory))
//! }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::config::{NotifierConfig, OracleConfig, StoreConfig};
use crate::error::{Error, Result};
use crate::state::MemoryStoreFactory;
use crate::traits::{AvailabilityOracle, Notifier, Store};
use crate::traits::{NotifierFactory, OracleFactory, StoreFactory};

/// Registry for plugin-based component creation
///
/// The registry maintains a map of type names to factory objects,
/// allowing dynamic instantiation of components based on configuration.
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct Registry {
    /// Registered oracle factories
    oracles: RwLock<HashMap<String, Box<dyn OracleFactory>>>,

    /// Registered notifier factories
    notifiers: RwLock<HashMap<String, Box<dyn NotifierFactory>>>,

    /// Registered store factories
    stores: RwLock<HashMap<String, Arc<dyn StoreFactory>>>,
}

fn poisoned(what: &str) -> Error {
    Error::Other(format!("{} registry lock poisoned", what))
}

impl Registry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in in-memory store registered
    pub fn with_builtins() -> Result<Self> {
        let registry = Self::new();
        registry.register_store("memory", Box::new(MemoryStoreFactory))?;
        Ok(registry)
    }

    /// Register an oracle factory
    ///
    /// # Parameters
    ///
    /// - `name`: Oracle type name (e.g., "dns_rdap")
    /// - `factory`: Factory object for creating oracle instances
    pub fn register_oracle(
        &self,
        name: impl Into<String>,
        factory: Box<dyn OracleFactory>,
    ) -> Result<()> {
        let mut oracles = self.oracles.write().map_err(|_| poisoned("oracle"))?;
        oracles.insert(name.into(), factory);
        Ok(())
    }

    /// Register a notifier factory
    ///
    /// # Parameters
    ///
    /// - `name`: Notifier type name (e.g., "smtp")
    /// - `factory`: Factory object for creating notifier instances
    pub fn register_notifier(
        &self,
        name: impl Into<String>,
        factory: Box<dyn NotifierFactory>,
    ) -> Result<()> {
        let mut notifiers = self.notifiers.write().map_err(|_| poisoned("notifier"))?;
        notifiers.insert(name.into(), factory);
        Ok(())
    }

    /// Register a store factory
    ///
    /// # Parameters
    ///
    /// - `name`: Store type name (e.g., "sqlite", "memory")
    /// - `factory`: Factory object for creating store instances
    pub fn register_store(
        &self,
        name: impl Into<String>,
        factory: Box<dyn StoreFactory>,
    ) -> Result<()> {
        let mut stores = self.stores.write().map_err(|_| poisoned("store"))?;
        stores.insert(name.into(), Arc::from(factory));
        Ok(())
    }

    /// Create an oracle from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Arc<dyn AvailabilityOracle>)`: Created oracle instance
    /// - `Err(Error)`: If the oracle type is not registered or creation fails
    pub fn create_oracle(&self, config: &OracleConfig) -> Result<Arc<dyn AvailabilityOracle>> {
        let oracle_type = config.type_name();
        let oracles = self.oracles.read().map_err(|_| poisoned("oracle"))?;

        let factory = oracles
            .get(oracle_type)
            .ok_or_else(|| Error::config(format!("Unknown oracle type: {}", oracle_type)))?;

        factory.create(config)
    }

    /// Create a notifier from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Arc<dyn Notifier>)`: Created notifier instance
    /// - `Err(Error)`: If the notifier type is not registered or creation fails
    pub fn create_notifier(&self, config: &NotifierConfig) -> Result<Arc<dyn Notifier>> {
        let notifier_type = config.type_name();
        let notifiers = self.notifiers.read().map_err(|_| poisoned("notifier"))?;

        let factory = notifiers
            .get(notifier_type)
            .ok_or_else(|| Error::config(format!("Unknown notifier type: {}", notifier_type)))?;

        factory.create(config)
    }

    /// Create a store from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Arc<dyn Store>)`: Created store instance
    /// - `Err(Error)`: If the store type is not registered or creation fails
    pub async fn create_store(&self, config: &StoreConfig) -> Result<Arc<dyn Store>> {
        let store_type = config.type_name();

        let factory = {
            let stores = self.stores.read().map_err(|_| poisoned("store"))?;
            stores
                .get(store_type)
                .ok_or_else(|| Error::config(format!("Unknown store type: {}", store_type)))?
                .clone()
            // Release the lock before calling async create
        };

        factory.create(config).await
    }

    /// List all registered oracle types
    pub fn list_oracles(&self) -> Vec<String> {
        self.oracles
            .read()
            .map(|oracles| oracles.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// List all registered notifier types
    pub fn list_notifiers(&self) -> Vec<String> {
        self.notifiers
            .read()
            .map(|notifiers| notifiers.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// List all registered store types
    pub fn list_stores(&self) -> Vec<String> {
        self.stores
            .read()
            .map(|stores| stores.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Check if an oracle type is registered
    pub fn has_oracle(&self, name: &str) -> bool {
        self.oracles
            .read()
            .map(|oracles| oracles.contains_key(name))
            .unwrap_or(false)
    }

    /// Check if a notifier type is registered
    pub fn has_notifier(&self, name: &str) -> bool {
        self.notifiers
            .read()
            .map(|notifiers| notifiers.contains_key(name))
            .unwrap_or(false)
    }

    /// Check if a store type is registered
    pub fn has_store(&self, name: &str) -> bool {
        self.stores
            .read()
            .map(|stores| stores.contains_key(name))
            .unwrap_or(false)
    }
}
