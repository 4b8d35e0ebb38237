// Copyright (c) 2025 - Cowboy AI, Inc.
//! Coordination configuration
//!
//! Configuration is an explicit struct built by the composition root and
//! passed by reference; there is no ambient global lookup. Policy flags map
//! one-to-one to the recognized options of the coordination layer, manager
//! definitions drive lazy or eager instantiation in the
//! [`ComponentRegistry`](crate::registry::ComponentRegistry).

use serde::{Deserialize, Serialize};

/// Strategy used by the Global Resource View when a tracked domain is updated
///
/// Exactly one strategy is active; it is chosen once at configuration time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStrategy {
    /// Apply the reported graph as a direct in-place patch onto the view
    #[default]
    Incremental,
    /// Discard the domain's previous contribution, re-insert the reported
    /// graph as the domain's authoritative state
    Remerge,
    /// Overwrite only the status field of elements already present
    StatusBased,
}

/// Definition of a single domain manager
///
/// `kind` selects the manager implementation in the
/// [`ManagerFactory`](crate::manager::ManagerFactory); `params` are passed
/// through opaquely so a manager can construct its own protocol adapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Unique manager name (registry key)
    pub name: String,

    /// Domain label used inside topology graphs; defaults to `name`
    #[serde(default)]
    pub domain_name: Option<String>,

    /// Factory key selecting the manager implementation
    pub kind: String,

    /// Implementation-specific parameters (e.g. management URL, poll interval)
    #[serde(default)]
    pub params: serde_json::Value,
}

impl ManagerConfig {
    /// Create a definition with the domain name defaulted to the manager name
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain_name: None,
            kind: kind.into(),
            params: serde_json::Value::Null,
        }
    }

    /// Set an explicit domain name
    pub fn with_domain_name(mut self, domain_name: impl Into<String>) -> Self {
        self.domain_name = Some(domain_name.into());
        self
    }

    /// Set implementation parameters
    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = params;
        self
    }

    /// Effective domain name (falls back to the manager name)
    pub fn domain_name(&self) -> &str {
        self.domain_name.as_deref().unwrap_or(&self.name)
    }
}

/// Coordination layer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinationConfig {
    /// Clear every started domain during shutdown
    #[serde(default)]
    pub clear_domains_after_shutdown: bool,

    /// Clear a domain immediately before installing into it
    #[serde(default)]
    pub reset_domains_before_install: bool,

    /// On the first per-domain failure, stop installing and roll back
    #[serde(default)]
    pub rollback_on_failure: bool,

    /// Defer all view writes to one commit after every outcome is known
    #[serde(default)]
    pub one_step_update: bool,

    /// Domain-update strategy for the Global Resource View
    #[serde(default)]
    pub update_strategy: UpdateStrategy,

    /// Construct managers on first reference instead of eagerly at startup
    #[serde(default = "default_lazy_load")]
    pub lazy_load: bool,

    /// Default manager definitions started by `load_defaults`
    #[serde(default)]
    pub managers: Vec<ManagerConfig>,

    /// Prototype definition for dynamically discovered peer domains;
    /// discovery reports are ignored when unset
    #[serde(default)]
    pub peer_prototype: Option<ManagerConfig>,
}

fn default_lazy_load() -> bool {
    true
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            clear_domains_after_shutdown: false,
            reset_domains_before_install: false,
            rollback_on_failure: false,
            one_step_update: false,
            update_strategy: UpdateStrategy::default(),
            lazy_load: true,
            managers: Vec::new(),
            peer_prototype: None,
        }
    }
}

impl CoordinationConfig {
    /// Look up a manager definition by name
    pub fn manager(&self, name: &str) -> Option<&ManagerConfig> {
        self.managers.iter().find(|m| m.name == name)
    }
}
