// Copyright (c) 2025 - Cowboy AI, Inc.
//! Coordinator
//!
//! Top-level orchestration of multi-domain installations: splits a mapped
//! topology graph per domain, delegates each part to its domain manager,
//! tracks per-domain outcomes (synchronous, polled or callback-reported),
//! keeps the Global Resource View consistent with what is actually
//! installed, and rolls back to the last known-good state on failure.
//!
//! # Concurrency
//!
//! The coordinator is the single writer of the tracker and the view. It is
//! driven as one task consuming [`CoordinationCommand`] messages; domain
//! managers do their I/O elsewhere and report outcomes as messages on the
//! same channel. `install` returns once every domain is either resolved or
//! marked waiting; completion continues via inbound commands, never by the
//! caller blocking.
//!
//! # Error policy
//!
//! Configuration errors abort startup. Everything a domain does wrong is
//! recorded as that domain's `Failed` state and the loop moves on; callers
//! observe only the aggregate status and the finished notification.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{CoordinationConfig, UpdateStrategy};
use crate::errors::{CoordinationError, CoordinationResult};
use crate::events::{
    CallbackKind, CallbackOutcome, CallbackResult, ChangeCause, CoordinationCommand,
    CoordinationEvent, DomainChanged, InfoRequestFinished, InstallResult,
    InstallationFinished, PeerDomain,
};
use crate::manager::{DomainManager, ManagerContext, ManagerFactory};
use crate::registry::ComponentRegistry;
use crate::status::{DomainState, RequestTracker};
use crate::topology::{ElementStatus, TopologyGraph};
use crate::view::GlobalViewManager;

/// Top-level multi-domain orchestrator
pub struct Coordinator {
    config: Arc<CoordinationConfig>,
    registry: ComponentRegistry,
    tracker: RequestTracker,
    view: GlobalViewManager,
    notifications: mpsc::UnboundedSender<CoordinationEvent>,
    /// Per discovery collaborator: peer id → generated manager name
    peer_managers: HashMap<String, BTreeMap<String, String>>,
}

impl Coordinator {
    /// Build the coordinator and start the configured default managers
    ///
    /// `commands` is the sender half of the channel the coordinator loop
    /// consumes; it is handed to every manager so asynchronous outcomes
    /// come back as messages. Configuration errors are fatal and propagate.
    pub async fn new(
        config: Arc<CoordinationConfig>,
        factory: Arc<dyn ManagerFactory>,
        commands: mpsc::UnboundedSender<CoordinationCommand>,
        notifications: mpsc::UnboundedSender<CoordinationEvent>,
    ) -> CoordinationResult<Self> {
        let context = ManagerContext::new(commands);
        let mut registry =
            ComponentRegistry::new(Arc::clone(&config), factory, context);
        registry.load_defaults().await?;
        let view = GlobalViewManager::new(config.update_strategy)
            .with_notifier(notifications.clone());
        Ok(Self {
            config,
            registry,
            tracker: RequestTracker::new(),
            view,
            notifications,
            peer_managers: HashMap::new(),
        })
    }

    /// The live manager registry
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.registry
    }

    /// The request status tracker
    pub fn tracker(&self) -> &RequestTracker {
        &self.tracker
    }

    /// The Global Resource View
    pub fn view(&self) -> &GlobalViewManager {
        &self.view
    }

    /// Consume commands until the channel closes or `Shutdown` arrives
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<CoordinationCommand>) {
        while let Some(command) = commands.recv().await {
            match command {
                CoordinationCommand::Install(graph) => {
                    if let Err(err) = self.install(graph).await {
                        error!(%err, "installation could not start");
                    }
                }
                CoordinationCommand::DomainChanged(event) => {
                    self.on_domain_changed(event).await;
                }
                CoordinationCommand::Callback(callback) => {
                    self.on_callback(callback).await;
                }
                CoordinationCommand::PeerDomains {
                    parent_domain,
                    peers,
                } => {
                    self.update_peer_domains(&parent_domain, peers).await;
                }
                CoordinationCommand::CollectInfo => {
                    self.collect_topology_info().await;
                }
                CoordinationCommand::Shutdown => {
                    self.shutdown().await;
                    break;
                }
            }
        }
    }

    /// Install a mapped topology graph across all domains it touches
    ///
    /// Returns the request id once every domain is resolved or waiting;
    /// only a duplicate request id is an error.
    pub async fn install(&mut self, mut graph: TopologyGraph) -> CoordinationResult<String> {
        if graph.id.is_empty() {
            graph.id = Uuid::now_v7().to_string();
            debug!(request = %graph.id, "mapped graph without id, generated one");
        }
        let request_id = graph.id.clone();
        info!(request = %request_id, "starting multi-domain installation");

        if self.tracker.register_from_graph(&graph).is_none() {
            return Err(CoordinationError::DuplicateRequest(request_id));
        }

        // Last-known-good snapshot for rollback; single slot, see view.rs.
        self.view.backup();

        if self.config.update_strategy == UpdateStrategy::StatusBased {
            // Pre-emptive commit: the view carries the mapped content with
            // per-element statuses before any domain is contacted.
            self.view.set_global_view(graph.clone());
        }

        let slices = graph.split_by_domain();
        if slices.is_empty() {
            warn!(
                request = %request_id,
                "mapped graph has no addressable domain, abort request"
            );
            if let Some(entry) = self.tracker.get_mut(&request_id) {
                entry.set_error();
            }
            self.finalize(&request_id).await;
            return Ok(request_id);
        }

        for (domain, mut part) in slices {
            let Some(mgr) = self.registry.find_by_domain(&domain) else {
                warn!(domain, "no manager started for domain, skip install of part");
                self.set_state(&request_id, &domain, DomainState::Failed);
                continue;
            };
            info!(request = %request_id, domain, part = %part.id, "delegating domain part");

            if self.config.reset_domains_before_install {
                debug!(domain, "clearing domain before install");
                if let Err(err) = mgr.clear().await {
                    warn!(domain, %err, "pre-install clear failed");
                }
            }

            let installed = match mgr.install(part.clone()).await {
                Ok(result) => result,
                Err(err) => {
                    error!(domain, %err, "install raised an error");
                    false
                }
            };

            if !installed {
                error!(request = %request_id, domain, "installation was unsuccessful");
                part.set_status_all(ElementStatus::Failed);
                if self.config.update_strategy == UpdateStrategy::StatusBased {
                    self.view.update_domain(&domain, &part);
                }
                self.set_state(&request_id, &domain, DomainState::Failed);
                if self.config.rollback_on_failure {
                    // Later domains in the split order are never touched.
                    break;
                }
                continue;
            }

            if self.config.update_strategy == UpdateStrategy::StatusBased {
                part.set_status_all(ElementStatus::Deployed);
            }

            let caps = mgr.capabilities();
            if caps.supports_polling {
                // The poll loop raises the domain-changed notification that
                // completes this domain later.
                if part.is_empty() {
                    self.set_state(&request_id, &domain, DomainState::Ok);
                } else {
                    debug!(domain, "polling enabled, skip explicit view update");
                    self.set_state(&request_id, &domain, DomainState::Waiting);
                }
                continue;
            }

            if mgr.has_pending_callback(&request_id) {
                debug!(domain, "completion callback registered, wait for it");
                self.set_state(&request_id, &domain, DomainState::Waiting);
                continue;
            }

            if caps.is_internal {
                self.update_view_for_internal(&domain, &part, &graph);
                self.set_state(&request_id, &domain, DomainState::Ok);
                continue;
            }

            // Synchronous remote manager without callback or polling.
            if !self.config.one_step_update {
                self.view.update_domain(&domain, &part);
            }
            self.set_state(&request_id, &domain, DomainState::Ok);
        }

        // A failed domain triggers rollback right here even while untouched
        // domains keep the request pending; finalize alone would defer it.
        if self.config.rollback_on_failure {
            let needs_rollback = self
                .tracker
                .get(&request_id)
                .map(|entry| entry.failed() && !entry.rolled_back())
                .unwrap_or(false);
            if needs_rollback {
                self.rollback(&request_id).await;
            }
        }

        self.finalize(&request_id).await;
        Ok(request_id)
    }

    /// View update rule for the internal (local emulated) domain
    fn update_view_for_internal(
        &mut self,
        domain: &str,
        part: &TopologyGraph,
        mapped: &TopologyGraph,
    ) {
        if mapped.is_bare() {
            // A cleanup-only request: the domain was physically cleared,
            // strip its dynamic elements from the view as well.
            debug!(domain, "cleanup topology detected, cleaning domain in the view");
            self.view.clean_domain(domain);
        } else if self.config.update_strategy == UpdateStrategy::StatusBased {
            self.view.update_domain(domain, part);
        } else if !mapped.is_virtualized() {
            self.view.set_global_view(mapped.clone());
            self.view.update_status(ElementStatus::Deployed);
        } else {
            warn!(
                domain,
                "virtualized infrastructure node in mapped graph, skip view update"
            );
        }
    }

    /// Handle a domain-changed notification from a manager
    pub async fn on_domain_changed(&mut self, event: DomainChanged) {
        debug!(domain = %event.domain, cause = ?event.cause, "domain change received");
        match event.cause {
            ChangeCause::Up => match &event.data {
                Some(data) => self.view.add_domain(&event.domain, data.clone()),
                None => warn!(domain = %event.domain, "domain up without topology data"),
            },
            ChangeCause::Down => self.view.remove_domain(&event.domain),
            ChangeCause::Changed => {
                if let Some(data) = &event.data {
                    self.view.update_domain(&event.domain, data);
                }
                let polls = self
                    .registry
                    .find_by_domain(&event.domain)
                    .map(|m| m.capabilities().supports_polling)
                    .unwrap_or(false);
                if polls {
                    self.complete_polled_domain(&event.domain).await;
                }
            }
        }
        self.emit(CoordinationEvent::DomainChanged(event));
    }

    /// A polling manager reported its domain; complete it in the most
    /// recent request when that request has a slot for it
    async fn complete_polled_domain(&mut self, domain: &str) {
        let request_id = match self.tracker.most_recent_mut() {
            Some(entry) if entry.domain_state(domain).is_some() => {
                let id = entry.id().to_string();
                if let Err(err) = entry.set_ok(domain) {
                    error!(%err, "polled completion rejected");
                    return;
                }
                id
            }
            _ => return,
        };
        self.finalize(&request_id).await;
    }

    /// Handle an asynchronous completion callback
    pub async fn on_callback(&mut self, callback: CallbackResult) {
        let Some(entry) = self.tracker.get_mut(&callback.request_id) else {
            warn!(request = %callback.request_id, "callback for unknown request");
            return;
        };

        let state = match (callback.kind, callback.outcome) {
            (CallbackKind::Install, CallbackOutcome::Success) => DomainState::Ok,
            (CallbackKind::Install, outcome) => {
                warn!(
                    request = %callback.request_id,
                    domain = %callback.domain,
                    ?outcome,
                    "install callback reported failure"
                );
                DomainState::Failed
            }
            (CallbackKind::Rollback, CallbackOutcome::Success) => DomainState::Reset,
            (CallbackKind::Rollback, outcome) => {
                // Abandoned reset attempt; still terminal for the aggregate.
                warn!(
                    request = %callback.request_id,
                    domain = %callback.domain,
                    ?outcome,
                    "rollback callback failed, abandoning reset attempt"
                );
                DomainState::Reset
            }
        };
        if let Err(err) = entry.set_domain(&callback.domain, state) {
            error!(%err, "callback status update rejected");
            return;
        }

        if state == DomainState::Ok && !self.config.one_step_update {
            if let Some(data) = &callback.data {
                self.view.update_domain(&callback.domain, data);
            }
        }

        self.finalize(&callback.request_id).await;
    }

    /// Roll the touched domains of a request back to their pre-install state
    async fn rollback(&mut self, request_id: &str) {
        info!(request = %request_id, "rolling back installation");
        let backup = self.view.restore().cloned();

        let touched: Vec<String> = match self.tracker.get_mut(request_id) {
            Some(entry) => {
                entry.mark_rolled_back();
                // Once rollback itself completes the view is restored from
                // this payload verbatim.
                if let Some(backup) = backup {
                    entry.set_payload(backup);
                }
                entry
                    .domains()
                    .map(str::to_string)
                    .filter(|d| {
                        entry.domain_state(d) != Some(DomainState::Initialized)
                    })
                    .collect()
            }
            None => return,
        };

        for domain in touched {
            let Some(mgr) = self.registry.find_by_domain(&domain) else {
                warn!(domain, "no manager for touched domain, abandoning reset");
                self.set_state(request_id, &domain, DomainState::Reset);
                continue;
            };
            if !mgr.capabilities().supports_rollback {
                warn!(domain, "manager has no rollback capability, skip");
                self.set_state(request_id, &domain, DomainState::Reset);
                continue;
            }
            if let Err(err) = mgr.rollback(request_id).await {
                warn!(domain, %err, "rollback invocation failed");
            }
            if mgr.has_pending_callback(request_id) {
                // Resolved later by the rollback callback.
                self.set_state(request_id, &domain, DomainState::Waiting);
            } else {
                self.set_state(request_id, &domain, DomainState::Reset);
            }
        }

        self.restore_view_after_rollback(request_id);
    }

    /// Restore the pre-install backup into the view once a rollback has
    /// fully completed, i.e. no rolled-back domain is still waiting on its
    /// callback. Domains the install never touched do not block the restore.
    fn restore_view_after_rollback(&mut self, request_id: &str) {
        let Some(entry) = self.tracker.get_mut(request_id) else { return };
        if !entry.rolled_back() || entry.waiting() || !entry.mark_restored() {
            return;
        }
        if let Some(backup) = entry.payload().cloned() {
            info!(request = %request_id, "restoring pre-install global view");
            self.view.set_global_view(backup);
        }
    }

    /// Drive a request that may have reached a terminal aggregate to its
    /// conclusion: commit or restore the view and emit the finished
    /// notification exactly once
    async fn finalize(&mut self, request_id: &str) {
        // Rollback callbacks resolve here; the restore must not wait for
        // domains the install never touched.
        self.restore_view_after_rollback(request_id);

        let Some(entry) = self.tracker.get(request_id) else { return };
        if entry.still_pending() {
            debug!(request = %request_id, "request still pending, deferring");
            return;
        }

        if entry.failed() && self.config.rollback_on_failure && !entry.rolled_back() {
            self.rollback(request_id).await;
            let Some(entry) = self.tracker.get(request_id) else { return };
            if entry.still_pending() {
                // Rollback continues via callbacks.
                return;
            }
        }

        let Some(entry) = self.tracker.get(request_id) else { return };
        let result = if entry.success() {
            InstallResult::Deployed
        } else if entry.reset() {
            InstallResult::Reset
        } else if entry.failed() {
            InstallResult::DeployError
        } else {
            InstallResult::Unknown
        };
        if result == InstallResult::Deployed && self.config.one_step_update {
            // One write instead of N incremental ones.
            if let Some(mapped) = entry.payload().cloned() {
                self.view.set_global_view(mapped);
                self.view.update_status(ElementStatus::Deployed);
            }
        }

        let Some(entry) = self.tracker.get_mut(request_id) else { return };
        if entry.mark_finished() {
            info!(request = %request_id, ?result, "installation finished");
            self.emit(CoordinationEvent::InstallationFinished(
                InstallationFinished {
                    request_id: request_id.to_string(),
                    result,
                },
            ));
        }
    }

    /// Reconcile the registry with a discovery collaborator's peer report
    ///
    /// Peers that disappeared have their dynamically registered manager
    /// stopped and removed; new peers get a manager built from the
    /// configured prototype, named after the peer id and the collaborator's
    /// domain. A peer without a management URL is skipped with a warning.
    pub async fn update_peer_domains(&mut self, parent_domain: &str, peers: Vec<PeerDomain>) {
        let current_ids: BTreeSet<&str> = peers.iter().map(|p| p.id.as_str()).collect();

        let gone: Vec<(String, String)> = self
            .peer_managers
            .get(parent_domain)
            .map(|tracked| {
                tracked
                    .iter()
                    .filter(|(id, _)| !current_ids.contains(id.as_str()))
                    .map(|(id, name)| (id.clone(), name.clone()))
                    .collect()
            })
            .unwrap_or_default();
        for (id, name) in gone {
            info!(peer = %id, manager = %name, "peer domain disappeared");
            self.registry.remove(&name).await;
            if let Some(tracked) = self.peer_managers.get_mut(parent_domain) {
                tracked.remove(&id);
            }
        }

        for peer in peers {
            let already = self
                .peer_managers
                .get(parent_domain)
                .map(|t| t.contains_key(&peer.id))
                .unwrap_or(false);
            if already {
                continue;
            }
            let Some(prototype) = self.config.peer_prototype.clone() else {
                warn!(peer = %peer.id, "no peer prototype configured, skip registration");
                continue;
            };
            let Some(url) = peer.url else {
                warn!(peer = %peer.id, "peer without management URL, skip registration");
                continue;
            };
            let domain_name = format!("{}@{}", peer.id, parent_domain);
            let mut params = prototype.params.clone();
            if let serde_json::Value::Object(map) = &mut params {
                map.insert("url".into(), serde_json::Value::String(url.clone()));
            } else {
                params = serde_json::json!({ "url": url });
            }
            let definition = prototype
                .clone()
                .with_domain_name(domain_name.clone())
                .with_params(params);
            let definition = crate::config::ManagerConfig {
                name: domain_name.clone(),
                ..definition
            };

            let manager = match self.registry.build(&definition) {
                Ok(manager) => manager,
                Err(err) => {
                    warn!(peer = %peer.id, %err, "could not build peer manager");
                    continue;
                }
            };
            match self.registry.register(manager, true).await {
                Ok(_) => {
                    info!(peer = %peer.id, domain = %domain_name, "peer domain registered");
                    self.peer_managers
                        .entry(parent_domain.to_string())
                        .or_default()
                        .insert(peer.id, domain_name);
                }
                Err(err) => {
                    warn!(peer = %peer.id, %err, "could not register peer manager");
                }
            }
        }
    }

    /// Collect `get_topology` from every reachable manager and emit the
    /// merged result
    pub async fn collect_topology_info(&mut self) {
        let mut merged = TopologyGraph::new("topology-info");
        let mut complete = true;

        let managers: Vec<Arc<dyn DomainManager>> =
            self.registry.managers().map(Arc::clone).collect();
        for mgr in managers {
            if !mgr.check_reachable().await {
                warn!(domain = mgr.domain_name(), "domain unreachable, skip info collection");
                complete = false;
                continue;
            }
            match mgr.get_topology().await {
                Ok(Some(topology)) => merged.merge(&topology),
                Ok(None) => debug!(domain = mgr.domain_name(), "no topology available"),
                Err(err) => {
                    warn!(domain = mgr.domain_name(), %err, "topology collection failed");
                    complete = false;
                }
            }
        }

        let status = if complete {
            InstallResult::Deployed
        } else {
            InstallResult::DeployError
        };
        self.emit(CoordinationEvent::InfoRequestFinished(InfoRequestFinished {
            result: merged,
            status,
        }));
    }

    /// Stop every manager, optionally clearing the domains first
    pub async fn shutdown(&mut self) {
        info!("shutting down coordination layer");
        if self.config.clear_domains_after_shutdown {
            self.registry.clear_all().await;
        }
        self.registry.stop_all().await;
    }

    fn set_state(&mut self, request_id: &str, domain: &str, state: DomainState) {
        if let Some(entry) = self.tracker.get_mut(request_id) {
            if let Err(err) = entry.set_domain(domain, state) {
                error!(%err, "status update rejected");
            }
        }
    }

    fn emit(&self, event: CoordinationEvent) {
        // Receiver gone means nobody listens; notifications are side
        // effects, never preconditions.
        let _ = self.notifications.send(event);
    }
}
