// Copyright (c) 2025 - Cowboy AI, Inc.
//! Shared test fixtures: scripted domain managers and graph builders

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use domain_coordination::{
    CoordinationError, CoordinationResult, DomainManager, Link, ManagerCapabilities,
    ManagerConfig, ManagerContext, ManagerFactory, Node, TopologyGraph,
};

/// Records every lifecycle and operation call a mock manager receives
#[derive(Debug, Default)]
pub struct CallLog(Mutex<Vec<String>>);

impl CallLog {
    pub fn record(&self, call: impl Into<String>) {
        self.0.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count_prefixed(&self, prefix: &str) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }
}

/// Scripted domain manager for driving the coordinator in tests
pub struct MockManager {
    name: String,
    domain: String,
    caps: ManagerCapabilities,
    /// Results popped per install; empty means succeed
    install_results: Mutex<VecDeque<bool>>,
    pending_callback: Mutex<bool>,
    topology: Mutex<Option<TopologyGraph>>,
    reachable: bool,
    pub calls: Arc<CallLog>,
}

impl MockManager {
    pub fn new(name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: domain.into(),
            caps: ManagerCapabilities::remote(),
            install_results: Mutex::new(VecDeque::new()),
            pending_callback: Mutex::new(false),
            topology: Mutex::new(None),
            reachable: true,
            calls: Arc::new(CallLog::default()),
        }
    }

    pub fn with_caps(mut self, caps: ManagerCapabilities) -> Self {
        self.caps = caps;
        self
    }

    /// Queue install outcomes; once exhausted installs succeed
    pub fn script_installs(self, results: &[bool]) -> Self {
        *self.install_results.lock().unwrap() = results.iter().copied().collect();
        self
    }

    pub fn with_pending_callback(self) -> Self {
        *self.pending_callback.lock().unwrap() = true;
        self
    }

    pub fn with_topology(self, topology: TopologyGraph) -> Self {
        *self.topology.lock().unwrap() = Some(topology);
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }
}

#[async_trait]
impl DomainManager for MockManager {
    fn name(&self) -> &str {
        &self.name
    }

    fn domain_name(&self) -> &str {
        &self.domain
    }

    fn capabilities(&self) -> ManagerCapabilities {
        self.caps
    }

    async fn init(&self, _ctx: ManagerContext) -> CoordinationResult<()> {
        self.calls.record("init");
        Ok(())
    }

    async fn run(&self) -> CoordinationResult<()> {
        self.calls.record("run");
        Ok(())
    }

    async fn finit(&self) -> CoordinationResult<()> {
        self.calls.record("finit");
        Ok(())
    }

    async fn install(&self, part: TopologyGraph) -> CoordinationResult<bool> {
        self.calls.record(format!("install:{}", part.id));
        Ok(self.install_results.lock().unwrap().pop_front().unwrap_or(true))
    }

    async fn clear(&self) -> CoordinationResult<bool> {
        self.calls.record("clear");
        Ok(true)
    }

    async fn rollback(&self, request_id: &str) -> CoordinationResult<bool> {
        self.calls.record(format!("rollback:{request_id}"));
        Ok(true)
    }

    async fn get_topology(&self) -> CoordinationResult<Option<TopologyGraph>> {
        self.calls.record("get_topology");
        Ok(self.topology.lock().unwrap().clone())
    }

    async fn check_reachable(&self) -> bool {
        self.reachable
    }

    fn has_pending_callback(&self, _request_id: &str) -> bool {
        *self.pending_callback.lock().unwrap()
    }
}

/// Factory building mock managers; `kind` selects the capability set
#[derive(Default)]
pub struct MockFactory {
    pub built: Mutex<Vec<Arc<MockManager>>>,
}

impl ManagerFactory for MockFactory {
    fn build(&self, config: &ManagerConfig) -> CoordinationResult<Arc<dyn DomainManager>> {
        let caps = match config.kind.as_str() {
            "internal" => ManagerCapabilities::internal(),
            "remote" => ManagerCapabilities::remote().with_rollback(),
            "polling" => ManagerCapabilities::remote().with_polling(),
            "callback" => ManagerCapabilities::remote().with_callback().with_rollback(),
            other => {
                return Err(CoordinationError::Configuration(format!(
                    "unknown manager kind: {other}"
                )))
            }
        };
        let manager = Arc::new(
            MockManager::new(&config.name, config.domain_name()).with_caps(caps),
        );
        self.built.lock().unwrap().push(Arc::clone(&manager));
        Ok(manager)
    }
}

/// Mapped graph touching the given domains: one substrate switch plus one
/// placed function per domain
pub fn mapped_graph(id: &str, domains: &[&str]) -> TopologyGraph {
    let mut graph = TopologyGraph::new(id);
    for domain in domains {
        let sw = format!("{domain}-sw");
        let nf = format!("{id}-{domain}-nf");
        graph
            .add_node(Node::infrastructure(&sw, *domain))
            .add_node(Node::function(&nf, *domain))
            .add_link(Link::hop(sw, nf));
    }
    graph
}

/// Bare substrate topology for one domain, as a manager would report it
/// when its domain comes up
pub fn base_topology(domain: &str) -> TopologyGraph {
    let mut graph = TopologyGraph::new(format!("{domain}-base"));
    graph.add_node(Node::infrastructure(format!("{domain}-sw"), domain));
    graph
}
