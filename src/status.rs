// Copyright (c) 2025 - Cowboy AI, Inc.
//! Request Status Tracker
//!
//! Represents the outcome of one multi-domain operation as a per-domain
//! state map with aggregate predicates computed fresh on every read. There
//! is no cached aggregate state, so late or out-of-order per-domain arrivals
//! are always handled correctly.
//!
//! The domain key set of an entry is fixed at creation time and never grows
//! or shrinks; a status update addressed outside that set is an error that
//! leaves the entry unmodified.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::errors::{CoordinationError, CoordinationResult};
use crate::topology::TopologyGraph;

/// Per-domain outcome state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainState {
    /// Slot created, domain not yet touched
    Initialized,
    /// Domain reported success
    Ok,
    /// Outcome will arrive later via callback or poll
    Waiting,
    /// Domain reported failure (or timed out)
    Failed,
    /// Domain rolled back to its pre-install state
    Reset,
}

/// Aggregate summary of a request, derived by precedence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateStatus {
    Initialized,
    Ok,
    Waiting,
    Failed,
    Reset,
}

impl fmt::Display for AggregateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AggregateStatus::Initialized => "INITIALIZED",
            AggregateStatus::Ok => "OK",
            AggregateStatus::Waiting => "WAITING",
            AggregateStatus::Failed => "FAILED",
            AggregateStatus::Reset => "RESET",
        };
        f.write_str(label)
    }
}

/// Tracking entry for one in-flight multi-domain request
#[derive(Debug, Clone)]
pub struct RequestStatus {
    id: String,
    states: BTreeMap<String, DomainState>,
    /// Request-level data: the mapped graph at registration, overwritten
    /// with the pre-install view backup when a rollback starts
    payload: Option<TopologyGraph>,
    /// Request-level failure override for requests that never produced
    /// domain slots (e.g. an unsplittable graph)
    error: bool,
    /// A rollback was issued for this request
    rolled_back: bool,
    /// The pre-install view backup has been restored
    restored: bool,
    /// The finished notification already fired
    finished: bool,
}

impl RequestStatus {
    fn new(id: String, domains: BTreeSet<String>, payload: Option<TopologyGraph>) -> Self {
        Self {
            id,
            states: domains
                .into_iter()
                .map(|d| (d, DomainState::Initialized))
                .collect(),
            payload,
            error: false,
            rolled_back: false,
            restored: false,
            finished: false,
        }
    }

    /// Request id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The fixed domain key set, in lexical order
    pub fn domains(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }

    /// State of one domain slot
    pub fn domain_state(&self, domain: &str) -> Option<DomainState> {
        self.states.get(domain).copied()
    }

    /// Set the state of one domain slot
    ///
    /// Fails without modifying the entry when `domain` is not one of the
    /// entry's fixed keys.
    pub fn set_domain(&mut self, domain: &str, state: DomainState) -> CoordinationResult<()> {
        match self.states.get_mut(domain) {
            Some(slot) => {
                debug!(request = %self.id, domain, ?state, "domain status updated");
                *slot = state;
                Ok(())
            }
            None => Err(CoordinationError::UntrackedDomain {
                request: self.id.clone(),
                domain: domain.to_string(),
            }),
        }
    }

    pub fn set_ok(&mut self, domain: &str) -> CoordinationResult<()> {
        self.set_domain(domain, DomainState::Ok)
    }

    pub fn set_waiting(&mut self, domain: &str) -> CoordinationResult<()> {
        self.set_domain(domain, DomainState::Waiting)
    }

    pub fn set_failed(&mut self, domain: &str) -> CoordinationResult<()> {
        self.set_domain(domain, DomainState::Failed)
    }

    pub fn set_reset(&mut self, domain: &str) -> CoordinationResult<()> {
        self.set_domain(domain, DomainState::Reset)
    }

    /// Mark the whole request failed regardless of domain slots
    ///
    /// Used when the request dies before any domain slot exists, e.g. when
    /// splitting yields nothing.
    pub fn set_error(&mut self) {
        self.error = true;
    }

    /// Request payload (mapped graph, or view backup after rollback)
    pub fn payload(&self) -> Option<&TopologyGraph> {
        self.payload.as_ref()
    }

    /// Replace the payload
    pub fn set_payload(&mut self, payload: TopologyGraph) {
        self.payload = Some(payload);
    }

    /// A rollback has been issued for this request
    pub fn rolled_back(&self) -> bool {
        self.rolled_back
    }

    pub(crate) fn mark_rolled_back(&mut self) {
        self.rolled_back = true;
    }

    /// Latch the post-rollback view restore; true only on the first call
    pub(crate) fn mark_restored(&mut self) -> bool {
        !std::mem::replace(&mut self.restored, true)
    }

    /// Latch the finished notification; true only on the first call
    pub(crate) fn mark_finished(&mut self) -> bool {
        !std::mem::replace(&mut self.finished, true)
    }

    /// At least one domain is still `Initialized` or `Waiting`
    pub fn still_pending(&self) -> bool {
        self.states
            .values()
            .any(|s| matches!(s, DomainState::Initialized | DomainState::Waiting))
    }

    /// At least one domain is `Waiting` on an asynchronous outcome
    pub fn waiting(&self) -> bool {
        self.states.values().any(|s| *s == DomainState::Waiting)
    }

    /// Every domain reported `Ok` (false for zero domains or an errored entry)
    pub fn success(&self) -> bool {
        !self.error
            && !self.states.is_empty()
            && self.states.values().all(|s| *s == DomainState::Ok)
    }

    /// Every domain has been rolled back to `Reset`
    pub fn reset(&self) -> bool {
        !self.states.is_empty() && self.states.values().all(|s| *s == DomainState::Reset)
    }

    /// At least one domain failed, or the request-level error override is set
    pub fn failed(&self) -> bool {
        self.error || self.states.values().any(|s| *s == DomainState::Failed)
    }

    /// Single summary label, evaluated by precedence:
    /// failed, then waiting, then reset, then success, then initialized
    pub fn status(&self) -> AggregateStatus {
        if self.failed() {
            AggregateStatus::Failed
        } else if self.waiting() {
            AggregateStatus::Waiting
        } else if self.reset() {
            AggregateStatus::Reset
        } else if self.success() {
            AggregateStatus::Ok
        } else {
            AggregateStatus::Initialized
        }
    }
}

/// Registry of tracking entries, keyed by request id
///
/// Entries are never deleted; a separate most-recent pointer serves the
/// polling managers that report completion without a request id.
#[derive(Debug, Default)]
pub struct RequestTracker {
    entries: HashMap<String, RequestStatus>,
    most_recent: Option<String>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new entry with the given fixed domain key set
    ///
    /// Returns `None` (logging an error) when the id is already registered.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        domains: BTreeSet<String>,
        payload: Option<TopologyGraph>,
    ) -> Option<&mut RequestStatus> {
        let id = id.into();
        if self.entries.contains_key(&id) {
            error!(request = %id, "request already registered, skip tracking");
            return None;
        }
        debug!(request = %id, domains = ?domains, "registered request");
        self.most_recent = Some(id.clone());
        Some(
            self.entries
                .entry(id.clone())
                .or_insert_with(|| RequestStatus::new(id, domains, payload)),
        )
    }

    /// Register an entry derived from a mapped graph: the graph id becomes
    /// the request id, the detected domains become the key set and the
    /// graph itself the initial payload
    pub fn register_from_graph(&mut self, graph: &TopologyGraph) -> Option<&mut RequestStatus> {
        self.register(
            graph.id.clone(),
            graph.detect_domains(),
            Some(graph.clone()),
        )
    }

    pub fn get(&self, id: &str) -> Option<&RequestStatus> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut RequestStatus> {
        self.entries.get_mut(id)
    }

    /// Last-registered entry, regardless of id
    pub fn most_recent(&self) -> Option<&RequestStatus> {
        self.most_recent.as_deref().and_then(|id| self.entries.get(id))
    }

    pub fn most_recent_mut(&mut self) -> Option<&mut RequestStatus> {
        let id = self.most_recent.clone()?;
        self.entries.get_mut(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn entry(states: &[(&str, DomainState)]) -> RequestStatus {
        let mut status = RequestStatus::new(
            "req".into(),
            states.iter().map(|(d, _)| d.to_string()).collect(),
            None,
        );
        for (domain, state) in states {
            status.set_domain(domain, *state).unwrap();
        }
        status
    }

    #[test]
    fn test_zero_domain_entry_reports_nothing() {
        let status = entry(&[]);
        assert!(!status.still_pending());
        assert!(!status.success());
        assert!(!status.reset());
        assert!(!status.failed());
        assert_eq!(status.status(), AggregateStatus::Initialized);
    }

    #[test]
    fn test_error_override_fails_zero_domain_entry() {
        let mut status = entry(&[]);
        status.set_error();
        assert!(status.failed());
        assert!(!status.still_pending());
        assert_eq!(status.status(), AggregateStatus::Failed);
    }

    #[test]
    fn test_set_domain_outside_fixed_keys_is_an_error() {
        let mut status = entry(&[("alpha", DomainState::Initialized)]);
        let err = status.set_ok("beta").unwrap_err();
        assert!(matches!(err, CoordinationError::UntrackedDomain { .. }));
        assert_eq!(
            status.domain_state("alpha"),
            Some(DomainState::Initialized)
        );
    }

    #[test_case(&[("a", DomainState::Failed), ("b", DomainState::Waiting)], AggregateStatus::Failed; "failed beats waiting")]
    #[test_case(&[("a", DomainState::Ok), ("b", DomainState::Waiting)], AggregateStatus::Waiting; "waiting beats ok")]
    #[test_case(&[("a", DomainState::Reset), ("b", DomainState::Reset)], AggregateStatus::Reset; "all reset")]
    #[test_case(&[("a", DomainState::Ok), ("b", DomainState::Ok)], AggregateStatus::Ok; "all ok")]
    #[test_case(&[("a", DomainState::Ok), ("b", DomainState::Reset)], AggregateStatus::Initialized; "mixed terminal")]
    #[test_case(&[("a", DomainState::Initialized)], AggregateStatus::Initialized; "untouched")]
    fn test_status_precedence(states: &[(&str, DomainState)], expected: AggregateStatus) {
        assert_eq!(entry(states).status(), expected);
    }

    #[test]
    fn test_pending_until_every_domain_terminal() {
        let mut status = entry(&[
            ("a", DomainState::Ok),
            ("b", DomainState::Waiting),
        ]);
        assert!(status.still_pending());
        status.set_ok("b").unwrap();
        assert!(!status.still_pending());
        assert!(status.success());
    }

    #[test]
    fn test_duplicate_registration_returns_none() {
        let mut tracker = RequestTracker::new();
        assert!(tracker.register("req", BTreeSet::new(), None).is_some());
        assert!(tracker.register("req", BTreeSet::new(), None).is_none());
    }

    #[test]
    fn test_most_recent_follows_registration_order() {
        let mut tracker = RequestTracker::new();
        tracker.register("first", BTreeSet::new(), None);
        tracker.register("second", BTreeSet::new(), None);
        assert_eq!(tracker.most_recent().unwrap().id(), "second");
        // a duplicate does not move the pointer
        tracker.register("first", BTreeSet::new(), None);
        assert_eq!(tracker.most_recent().unwrap().id(), "second");
    }

    #[test]
    fn test_finished_latch_fires_once() {
        let mut status = entry(&[("a", DomainState::Ok)]);
        assert!(status.mark_finished());
        assert!(!status.mark_finished());
    }

    #[test]
    fn test_restore_latch_fires_once() {
        let mut status = entry(&[("a", DomainState::Reset)]);
        assert!(status.mark_restored());
        assert!(!status.mark_restored());
    }

    #[test]
    fn test_waiting_ignores_initialized_slots() {
        let status = entry(&[
            ("a", DomainState::Reset),
            ("b", DomainState::Initialized),
        ]);
        assert!(status.still_pending());
        assert!(!status.waiting());
    }
}
