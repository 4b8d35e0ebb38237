// Copyright (c) 2025 - Cowboy AI, Inc.
//! Domain Manager capability contract
//!
//! A Domain Manager owns exactly one administrative or technology domain and
//! hides its protocol adapters (REST, NETCONF, OpenFlow) behind this trait.
//! Managers perform their real I/O off the coordinator task and report
//! asynchronous outcomes as [`CoordinationCommand`] messages through the
//! [`ManagerContext`] handed to them at `init`.
//!
//! Capabilities are a plain flags struct decided once at construction time;
//! the coordinator dispatches on them instead of re-inspecting the concrete
//! manager type at every call site.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::config::ManagerConfig;
use crate::errors::CoordinationResult;
use crate::events::CoordinationCommand;
use crate::topology::TopologyGraph;

/// Capability flags of a domain manager
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManagerCapabilities {
    /// Manages the local emulated infrastructure; at most one internal
    /// manager may exist system-wide
    pub is_internal: bool,
    /// Represents an external administrative domain (peer orchestrator)
    pub is_external: bool,
    /// The manager polls its domain; domain updates arrive as
    /// domain-changed notifications instead of explicit view writes
    pub supports_polling: bool,
    /// The manager registers completion callbacks for installs
    pub supports_callback: bool,
    /// The manager can roll an installed request back
    pub supports_rollback: bool,
}

impl ManagerCapabilities {
    /// Flags for the local emulated infrastructure manager
    pub fn internal() -> Self {
        Self {
            is_internal: true,
            ..Self::default()
        }
    }

    /// Flags for a synchronous remote manager
    pub fn remote() -> Self {
        Self::default()
    }

    /// Enable polling
    pub fn with_polling(mut self) -> Self {
        self.supports_polling = true;
        self
    }

    /// Enable completion callbacks
    pub fn with_callback(mut self) -> Self {
        self.supports_callback = true;
        self
    }

    /// Enable rollback
    pub fn with_rollback(mut self) -> Self {
        self.supports_rollback = true;
        self
    }

    /// Mark the domain as externally administered
    pub fn external(mut self) -> Self {
        self.is_external = true;
        self
    }
}

/// Handle given to managers at `init`
///
/// Carries the sender half of the coordinator's command channel; this is the
/// only route by which a manager may influence shared state, which keeps the
/// tracker and the view single-writer.
#[derive(Debug, Clone)]
pub struct ManagerContext {
    commands: mpsc::UnboundedSender<CoordinationCommand>,
}

impl ManagerContext {
    pub fn new(commands: mpsc::UnboundedSender<CoordinationCommand>) -> Self {
        Self { commands }
    }

    /// Report an asynchronous outcome to the coordinator
    pub fn report(&self, command: CoordinationCommand) {
        // Receiver dropped means the coordinator is shutting down; the
        // report is moot at that point.
        let _ = self.commands.send(command);
    }
}

/// Contract every domain manager implements
#[async_trait]
pub trait DomainManager: Send + Sync {
    /// Unique manager name (registry key)
    fn name(&self) -> &str;

    /// Domain label used inside topology graphs to mark ownership
    fn domain_name(&self) -> &str;

    /// Capability flags, fixed at construction
    fn capabilities(&self) -> ManagerCapabilities;

    /// Initialize; the manager constructs its protocol adapters here
    async fn init(&self, ctx: ManagerContext) -> CoordinationResult<()>;

    /// Start operating (detect topology, begin polling, ...)
    async fn run(&self) -> CoordinationResult<()>;

    /// Stop operating and release resources
    async fn finit(&self) -> CoordinationResult<()>;

    /// Install a domain part; `Ok(false)` is a rejected install, `Err` an
    /// operational failure, both recorded as a per-domain failure
    async fn install(&self, part: TopologyGraph) -> CoordinationResult<bool>;

    /// Remove everything dynamically installed in the domain
    async fn clear(&self) -> CoordinationResult<bool>;

    /// Restore the domain to its initial topology
    async fn reset(&self) -> CoordinationResult<bool> {
        self.clear().await
    }

    /// Roll back a previously installed request
    ///
    /// Only meaningful on managers with `supports_rollback`; the default
    /// reports the attempt as not performed.
    async fn rollback(&self, request_id: &str) -> CoordinationResult<bool> {
        let _ = request_id;
        Ok(false)
    }

    /// Current domain topology, when the manager can provide one
    async fn get_topology(&self) -> CoordinationResult<Option<TopologyGraph>>;

    /// Probe whether the domain is currently reachable
    async fn check_reachable(&self) -> bool {
        true
    }

    /// A completion callback is registered for the given request
    fn has_pending_callback(&self, request_id: &str) -> bool {
        let _ = request_id;
        false
    }
}

/// Constructs managers from configuration
///
/// The registry consults the factory for lazy and eager instantiation; the
/// `kind` field of [`ManagerConfig`] selects the implementation. A missing
/// kind is a configuration error and fatal at startup.
pub trait ManagerFactory: Send + Sync {
    fn build(&self, config: &ManagerConfig) -> CoordinationResult<Arc<dyn DomainManager>>;
}
