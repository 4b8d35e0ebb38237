// Copyright (c) 2025 - Cowboy AI, Inc.
//! Coordination notifications and commands
//!
//! Every notification the coordination layer produces, and every command it
//! consumes, is an explicit message type delivered over a channel to the
//! single-consumer event loop. There is no publish-subscribe mixin; the
//! channel is what preserves the single-writer guarantee over the tracker
//! and the Global Resource View.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::topology::TopologyGraph;

/// Cause of a domain-changed notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeCause {
    /// New domain detected
    Up,
    /// Detected domain went down
    Down,
    /// Domain topology changed
    Changed,
}

/// Notification raised by a domain manager when its domain changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainChanged {
    /// Domain label as used inside topology graphs
    pub domain: String,
    pub cause: ChangeCause,
    /// Reported topology; present for `Up` and `Changed`
    pub data: Option<TopologyGraph>,
}

/// Terminal result of an installation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallResult {
    Deployed,
    InProgress,
    DeployError,
    Reset,
    Unknown,
}

/// Notification that an installation request reached a terminal aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationFinished {
    pub request_id: String,
    pub result: InstallResult,
}

/// Notification that a topology-info collection round completed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoRequestFinished {
    /// Merged topology collected from the reachable domains
    pub result: TopologyGraph,
    /// Overall collection outcome
    pub status: InstallResult,
}

/// Whether an asynchronous callback answers an install or a rollback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackKind {
    Install,
    Rollback,
}

/// Outcome reported by an asynchronous callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackOutcome {
    Success,
    /// The registered wait timeout elapsed
    Timeout,
    /// HTTP-error-class result from the remote orchestrator
    HttpError(u16),
}

/// Asynchronous completion report from a remote domain manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackResult {
    pub request_id: String,
    pub domain: String,
    pub kind: CallbackKind,
    pub outcome: CallbackOutcome,
    /// Graph fragment describing what the domain actually installed
    pub data: Option<TopologyGraph>,
}

/// Notifications produced toward the layer above
///
/// Polymorphic envelope so one NATS forwarder (or one in-process consumer)
/// can handle every notification while each variant stays strongly typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "notification", content = "body", rename_all = "snake_case")]
pub enum CoordinationEvent {
    DomainChanged(DomainChanged),
    InstallationFinished(InstallationFinished),
    InfoRequestFinished(InfoRequestFinished),
    /// The Global Resource View changed; carries the new snapshot for
    /// external visualizers. Side effect only, never a precondition.
    ViewUpdated { view: TopologyGraph },
}

impl CoordinationEvent {
    /// Human-readable notification name
    pub fn name(&self) -> &'static str {
        match self {
            CoordinationEvent::DomainChanged(_) => "domain_changed",
            CoordinationEvent::InstallationFinished(_) => "installation_finished",
            CoordinationEvent::InfoRequestFinished(_) => "info_request_finished",
            CoordinationEvent::ViewUpdated { .. } => "view_updated",
        }
    }
}

/// Inbound commands consumed by the coordinator event loop
///
/// Domain managers hold a sender for this type and report their
/// asynchronous outcomes as messages, which the loop processes one at a
/// time on the coordinator task.
#[derive(Debug, Clone)]
pub enum CoordinationCommand {
    /// Install a mapped topology graph
    Install(TopologyGraph),
    /// A domain manager reported a change in its domain
    DomainChanged(DomainChanged),
    /// An asynchronous callback arrived for an in-flight request
    Callback(CallbackResult),
    /// A discovery collaborator reported its current peer-domain id set
    PeerDomains {
        /// Domain name of the reporting collaborator
        parent_domain: String,
        /// Peer ids with their management URL, when known
        peers: Vec<PeerDomain>,
    },
    /// Collect `get_topology` from every started manager
    CollectInfo,
    /// Stop all managers and exit the loop
    Shutdown,
}

/// One dynamically discovered peer domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerDomain {
    pub id: String,
    /// Management URL; registration of the peer is skipped when missing
    pub url: Option<String>,
    /// When the collaborator last saw the peer
    pub seen_at: DateTime<Utc>,
}
