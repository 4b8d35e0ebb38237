// Copyright (c) 2025 - Cowboy AI, Inc.
//! Global Resource View manager
//!
//! Single writer of the aggregated multi-domain topology graph: the
//! orchestrator's belief about everything currently installed across all
//! tracked domains. A domain may only be updated, cleaned or removed once it
//! is tracked, and only added while it is not; violations are logged and
//! ignored rather than raised, because they arrive from unreliable domain
//! reports, not from programming errors.
//!
//! The backup is a single slot, overwritten on every new install attempt and
//! never stacked. Overlapping installs therefore share one rollback target
//! (see DESIGN.md).

use std::collections::BTreeSet;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::UpdateStrategy;
use crate::events::CoordinationEvent;
use crate::topology::{ElementStatus, TopologyGraph};

/// Owner of the Global Resource View
pub struct GlobalViewManager {
    view: TopologyGraph,
    tracked: BTreeSet<String>,
    backup: Option<TopologyGraph>,
    strategy: UpdateStrategy,
    notifier: Option<mpsc::UnboundedSender<CoordinationEvent>>,
}

impl GlobalViewManager {
    /// Create an empty view with the configured update strategy
    pub fn new(strategy: UpdateStrategy) -> Self {
        debug!(?strategy, "init global view manager");
        Self {
            view: TopologyGraph::new("global-view"),
            tracked: BTreeSet::new(),
            backup: None,
            strategy,
            notifier: None,
        }
    }

    /// Attach the outbound notification channel; every successful mutation
    /// emits a `ViewUpdated` snapshot for external visualizers
    pub fn with_notifier(mut self, notifier: mpsc::UnboundedSender<CoordinationEvent>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Current aggregated view
    pub fn view(&self) -> &TopologyGraph {
        &self.view
    }

    /// Domains currently merged into the view, in lexical order
    pub fn tracked(&self) -> &BTreeSet<String> {
        &self.tracked
    }

    /// The domain has been merged into the view
    pub fn is_tracked(&self, domain: &str) -> bool {
        self.tracked.contains(domain)
    }

    /// Capture a full copy of the view as *the* backup, overwriting any
    /// prior backup (single slot, last write wins)
    pub fn backup(&mut self) {
        debug!("backing up global view");
        self.backup = Some(self.view.clone());
    }

    /// The last backup, read-only; does not mutate the view
    pub fn restore(&self) -> Option<&TopologyGraph> {
        self.backup.as_ref()
    }

    /// Unconditionally replace the view and recompute the tracked set from
    /// the new graph
    pub fn set_global_view(&mut self, graph: TopologyGraph) {
        debug!(graph = %graph.id, "replacing the whole global view");
        self.tracked = graph.detect_domains();
        self.view = graph;
        self.notify();
    }

    /// Merge a newly detected domain into the view
    ///
    /// An already-tracked domain is an error and a no-op. When the view is
    /// still empty the domain's graph becomes the view outright.
    pub fn add_domain(&mut self, domain: &str, graph: TopologyGraph) {
        if self.tracked.contains(domain) {
            error!(
                domain,
                tracked = ?self.tracked,
                "domain already tracked, abort adding"
            );
            return;
        }
        if graph.is_empty() {
            warn!(domain, "got empty domain data, skip addition");
            return;
        }
        info!(domain, "appending domain to the global view");
        if self.view.is_empty() {
            self.view = graph;
        } else {
            self.view.merge(&graph);
        }
        self.tracked.insert(domain.to_string());
        self.notify();
    }

    /// Update a tracked domain using the configured strategy
    pub fn update_domain(&mut self, domain: &str, graph: &TopologyGraph) {
        if !self.tracked.contains(domain) {
            error!(
                domain,
                tracked = ?self.tracked,
                "domain is not tracked, abort updating"
            );
            return;
        }
        info!(domain, strategy = ?self.strategy, "updating domain in the global view");
        match self.strategy {
            UpdateStrategy::StatusBased => self.view.update_statuses_from(graph),
            UpdateStrategy::Remerge => {
                self.view.remove_domain(domain);
                self.view.merge(graph);
            }
            UpdateStrategy::Incremental => self.view.merge(graph),
        }
        self.notify();
    }

    /// Evict a tracked domain's contribution and untrack it
    pub fn remove_domain(&mut self, domain: &str) {
        if !self.tracked.remove(domain) {
            error!(
                domain,
                tracked = ?self.tracked,
                "domain is not tracked, abort removing"
            );
            return;
        }
        info!(domain, "removing domain from the global view");
        self.view.remove_domain(domain);
        self.notify();
    }

    /// Strip only the dynamically installed elements of a tracked domain,
    /// leaving its static topology (used after an internal domain has been
    /// physically cleared)
    pub fn clean_domain(&mut self, domain: &str) {
        if !self.tracked.contains(domain) {
            error!(
                domain,
                tracked = ?self.tracked,
                "domain is not tracked, abort cleaning"
            );
            return;
        }
        info!(domain, "removing dynamically installed elements from the global view");
        self.view.clean_domain(domain);
        self.notify();
    }

    /// Stamp every element of the view with a uniform status; used once,
    /// right after an authoritative full-domain override
    pub fn update_status(&mut self, status: ElementStatus) {
        debug!(?status, "stamping the global view");
        self.view.set_status_all(status);
        self.notify();
    }

    fn notify(&self) {
        if let Some(notifier) = &self.notifier {
            let _ = notifier.send(CoordinationEvent::ViewUpdated {
                view: self.view.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{Link, Node};
    use pretty_assertions::assert_eq;

    fn domain_graph(domain: &str) -> TopologyGraph {
        let mut g = TopologyGraph::new(format!("topo-{domain}"));
        g.add_node(Node::infrastructure(format!("{domain}-sw"), domain))
            .add_node(Node::function(format!("{domain}-nf"), domain))
            .add_link(Link::hop(format!("{domain}-sw"), format!("{domain}-nf")));
        g
    }

    #[test]
    fn test_first_domain_becomes_the_view() {
        let mut grv = GlobalViewManager::new(UpdateStrategy::Incremental);
        grv.add_domain("alpha", domain_graph("alpha"));

        assert!(grv.is_tracked("alpha"));
        assert_eq!(grv.view().id, "topo-alpha");

        grv.add_domain("beta", domain_graph("beta"));
        assert_eq!(grv.view().node_count(), 4);
    }

    #[test]
    fn test_add_already_tracked_domain_is_a_noop() {
        let mut grv = GlobalViewManager::new(UpdateStrategy::Incremental);
        grv.add_domain("alpha", domain_graph("alpha"));
        let before = grv.view().clone();

        grv.add_domain("alpha", domain_graph("alpha"));
        assert_eq!(grv.view(), &before);
        assert_eq!(grv.tracked().len(), 1);
    }

    #[test]
    fn test_update_untracked_domain_is_a_noop() {
        let mut grv = GlobalViewManager::new(UpdateStrategy::Incremental);
        grv.update_domain("ghost", &domain_graph("ghost"));
        grv.remove_domain("ghost");
        grv.clean_domain("ghost");
        assert!(grv.view().is_empty());
        assert!(grv.tracked().is_empty());
    }

    #[test]
    fn test_backup_restore_round_trip() {
        let mut grv = GlobalViewManager::new(UpdateStrategy::Incremental);
        grv.add_domain("alpha", domain_graph("alpha"));
        grv.backup();
        let snapshot = grv.restore().cloned().unwrap();
        assert_eq!(&snapshot, grv.view());

        // mutations after backup do not touch the snapshot
        grv.add_domain("beta", domain_graph("beta"));
        assert_eq!(grv.restore().unwrap(), &snapshot);

        // second backup overwrites the slot
        grv.backup();
        assert_eq!(grv.restore().unwrap(), grv.view());
    }

    #[test]
    fn test_remerge_discards_previous_contribution() {
        let mut grv = GlobalViewManager::new(UpdateStrategy::Remerge);
        grv.add_domain("alpha", domain_graph("alpha"));

        let mut replacement = TopologyGraph::new("fresh");
        replacement.add_node(Node::infrastructure("alpha-sw2", "alpha"));
        grv.update_domain("alpha", &replacement);

        assert!(grv.view().node("alpha-sw").is_none());
        assert!(grv.view().node("alpha-sw2").is_some());
    }

    #[test]
    fn test_status_based_update_keeps_structure() {
        let mut grv = GlobalViewManager::new(UpdateStrategy::StatusBased);
        grv.add_domain("alpha", domain_graph("alpha"));

        let mut report = TopologyGraph::new("report");
        report.add_node(
            Node::function("alpha-nf", "alpha").with_status(ElementStatus::Running),
        );
        grv.update_domain("alpha", &report);

        assert_eq!(
            grv.view().node("alpha-nf").unwrap().status,
            ElementStatus::Running
        );
        assert_eq!(grv.view().node_count(), 2);
    }

    #[test]
    fn test_set_global_view_recomputes_tracking() {
        let mut grv = GlobalViewManager::new(UpdateStrategy::Incremental);
        grv.add_domain("alpha", domain_graph("alpha"));

        grv.set_global_view(domain_graph("gamma"));
        assert!(!grv.is_tracked("alpha"));
        assert!(grv.is_tracked("gamma"));
    }

    #[test]
    fn test_uniform_status_stamp() {
        let mut grv = GlobalViewManager::new(UpdateStrategy::Incremental);
        grv.add_domain("alpha", domain_graph("alpha"));
        grv.update_status(ElementStatus::Deployed);
        assert!(grv
            .view()
            .nodes()
            .all(|n| n.status == ElementStatus::Deployed));
    }
}
