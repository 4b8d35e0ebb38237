// Copyright (c) 2025 - Cowboy AI, Inc.
//! Component Registry
//!
//! Owns the set of live domain managers and hides their
//! construction-from-configuration behind lazy or eager semantics. All
//! registry mutation happens on the coordinator task.
//!
//! Configuration errors (unknown manager, unknown kind) are fatal to
//! startup and propagate; lifecycle errors of individual managers are
//! logged and degrade only that manager.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{CoordinationConfig, ManagerConfig};
use crate::errors::{CoordinationError, CoordinationResult};
use crate::manager::{DomainManager, ManagerContext, ManagerFactory};

/// Registry of live domain managers, keyed by manager name
pub struct ComponentRegistry {
    repository: HashMap<String, Arc<dyn DomainManager>>,
    factory: Arc<dyn ManagerFactory>,
    config: Arc<CoordinationConfig>,
    context: ManagerContext,
}

impl ComponentRegistry {
    /// Create an empty registry
    ///
    /// With `lazy_load` disabled in the configuration the caller is expected
    /// to invoke [`load_defaults`](Self::load_defaults) right away.
    pub fn new(
        config: Arc<CoordinationConfig>,
        factory: Arc<dyn ManagerFactory>,
        context: ManagerContext,
    ) -> Self {
        debug!(lazy_load = config.lazy_load, "init component registry");
        Self {
            repository: HashMap::new(),
            factory,
            config,
            context,
        }
    }

    /// Number of started managers
    pub fn len(&self) -> usize {
        self.repository.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repository.is_empty()
    }

    /// The manager is present in the repository
    pub fn is_started(&self, name: &str) -> bool {
        self.repository.contains_key(name)
    }

    /// Names of all started managers
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.repository.keys().map(String::as_str)
    }

    /// Domain labels currently owned by started managers
    pub fn domains(&self) -> Vec<String> {
        self.repository
            .values()
            .map(|m| m.domain_name().to_string())
            .collect()
    }

    /// All started managers
    pub fn managers(&self) -> impl Iterator<Item = &Arc<dyn DomainManager>> {
        self.repository.values()
    }

    /// Return the live manager, constructing it on demand in lazy mode
    pub async fn get(&mut self, name: &str) -> CoordinationResult<Arc<dyn DomainManager>> {
        if let Some(mgr) = self.repository.get(name) {
            return Ok(Arc::clone(mgr));
        }
        if self.config.lazy_load {
            return self.start(name, None, true).await;
        }
        Err(CoordinationError::ManagerNotRegistered(name.to_string()))
    }

    /// Construct, initialize and optionally run the named manager
    ///
    /// Idempotent: an already-started manager is returned as-is without
    /// reinitialization.
    pub async fn start(
        &mut self,
        name: &str,
        params: Option<serde_json::Value>,
        autostart: bool,
    ) -> CoordinationResult<Arc<dyn DomainManager>> {
        if let Some(existing) = self.repository.get(name) {
            warn!(manager = name, "already started, skip reinitialization");
            return Ok(Arc::clone(existing));
        }
        let mut definition = self
            .config
            .manager(name)
            .cloned()
            .ok_or_else(|| {
                CoordinationError::Configuration(format!(
                    "manager not registered: {name}"
                ))
            })?;
        if let Some(params) = params {
            definition.params = params;
        }
        self.start_from_definition(&definition, autostart).await
    }

    /// Accept an already-constructed manager (dynamically discovered peers)
    ///
    /// Same idempotency rule as [`start`](Self::start).
    pub async fn register(
        &mut self,
        manager: Arc<dyn DomainManager>,
        autostart: bool,
    ) -> CoordinationResult<Arc<dyn DomainManager>> {
        let name = manager.name().to_string();
        if let Some(existing) = self.repository.get(&name) {
            warn!(manager = %name, "already started, skip reinitialization");
            return Ok(Arc::clone(existing));
        }
        manager.init(self.context.clone()).await?;
        if autostart {
            manager.run().await?;
        }
        info!(manager = %name, domain = manager.domain_name(), "manager registered");
        self.repository.insert(name, Arc::clone(&manager));
        Ok(manager)
    }

    async fn start_from_definition(
        &mut self,
        definition: &ManagerConfig,
        autostart: bool,
    ) -> CoordinationResult<Arc<dyn DomainManager>> {
        let manager = self.factory.build(definition)?;
        manager.init(self.context.clone()).await?;
        if autostart {
            manager.run().await?;
        }
        info!(
            manager = %definition.name,
            domain = definition.domain_name(),
            "manager started"
        );
        self.repository
            .insert(definition.name.clone(), Arc::clone(&manager));
        Ok(manager)
    }

    /// Stop the named manager, keeping its registry entry
    pub async fn stop(&mut self, name: &str) {
        match self.repository.get(name) {
            Some(mgr) => {
                if let Err(err) = mgr.finit().await {
                    warn!(manager = name, %err, "manager finit failed");
                }
            }
            None => warn!(manager = name, "missing manager, skip stop"),
        }
    }

    /// Stop the named manager and delete its registry entry
    pub async fn remove(&mut self, name: &str) {
        match self.repository.remove(name) {
            Some(mgr) => {
                if let Err(err) = mgr.finit().await {
                    warn!(manager = name, %err, "manager finit failed");
                }
                info!(manager = name, "manager removed");
            }
            None => warn!(manager = name, "missing manager, skip removal"),
        }
    }

    /// Construct a manager from an explicit definition without starting it
    ///
    /// Used for dynamically discovered peer domains, whose definitions are
    /// generated rather than configured.
    pub fn build(
        &self,
        definition: &ManagerConfig,
    ) -> CoordinationResult<Arc<dyn DomainManager>> {
        self.factory.build(definition)
    }

    /// Linear scan for the manager owning the given domain label
    pub fn find_by_domain(&self, domain_name: &str) -> Option<Arc<dyn DomainManager>> {
        self.repository
            .values()
            .find(|m| m.domain_name() == domain_name)
            .map(Arc::clone)
    }

    /// Start every manager from the configured default list
    ///
    /// Refuses duplicate domain names and enforces at most one internal
    /// manager system-wide; both conflicts are skipped with a warning.
    /// Configuration errors propagate and abort startup.
    pub async fn load_defaults(&mut self) -> CoordinationResult<()> {
        if self.config.managers.is_empty() {
            info!("no default managers configured");
            return Ok(());
        }
        info!("initializing default domain managers from configuration");
        let definitions: Vec<ManagerConfig> = self.config.managers.clone();
        for definition in &definitions {
            let domain = definition.domain_name();
            if self.find_by_domain(domain).is_some() {
                warn!(
                    manager = %definition.name,
                    domain,
                    "domain name collision, skip initialization"
                );
                continue;
            }
            let manager = self.factory.build(definition)?;
            if manager.capabilities().is_internal && self.internal_manager().is_some() {
                warn!(
                    manager = %definition.name,
                    "an internal manager is already started, skip initialization"
                );
                continue;
            }
            manager.init(self.context.clone()).await?;
            manager.run().await?;
            info!(manager = %definition.name, domain, "manager started");
            self.repository
                .insert(definition.name.clone(), manager);
        }
        Ok(())
    }

    /// The internal manager, when one is started
    pub fn internal_manager(&self) -> Option<Arc<dyn DomainManager>> {
        self.repository
            .values()
            .find(|m| m.capabilities().is_internal)
            .map(Arc::clone)
    }

    /// Clear every started domain (shutdown policy)
    pub async fn clear_all(&self) {
        info!("resetting detected domains before shutdown");
        for (name, mgr) in &self.repository {
            if let Err(err) = mgr.clear().await {
                warn!(manager = %name, %err, "domain clear failed");
            }
        }
    }

    /// Stop every started manager and empty the repository
    pub async fn stop_all(&mut self) {
        info!("shutting down initiated domain managers");
        for (name, mgr) in &self.repository {
            if let Err(err) = mgr.finit().await {
                warn!(manager = %name, %err, "manager finit failed");
            }
        }
        self.repository.clear();
    }
}
