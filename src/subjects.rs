// Copyright (c) 2025 - Cowboy AI, Inc.

//! NATS subject hierarchy for coordination notifications
//!
//! Defines the semantic subject patterns used when the coordination layer's
//! notifications are forwarded over NATS.
//!
//! # Subject Pattern
//!
//! All coordination notifications follow the hierarchical pattern:
//!
//! ```text
//! coordination.{scope}.{operation}
//! ```
//!
//! This allows for:
//! - Precise subscriptions (`coordination.request.finished`)
//! - Scope-level wildcards (`coordination.domain.>`)
//! - Global subscriptions (`coordination.>`)
//!
//! # Examples
//!
//! ```rust
//! use domain_coordination::subjects::{SubjectBuilder, Scope, Operation};
//!
//! let subject = SubjectBuilder::new()
//!     .scope(Scope::Request)
//!     .operation(Operation::Finished)
//!     .build();
//! assert_eq!(subject, "coordination.request.finished");
//!
//! let wildcard = SubjectBuilder::new()
//!     .scope(Scope::Domain)
//!     .build_wildcard();
//! assert_eq!(wildcard, "coordination.domain.>");
//! ```

use std::fmt;

use crate::events::CoordinationEvent;

/// Root namespace for all coordination subjects
pub const COORDINATION_ROOT: &str = "coordination";

/// Coordination notification scopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Installation request lifecycle
    Request,
    /// Per-domain notifications (up/down/changed, callbacks)
    Domain,
    /// Global Resource View snapshots
    View,
    /// Topology-info collection rounds
    Info,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Scope::Request => "request",
            Scope::Domain => "domain",
            Scope::View => "view",
            Scope::Info => "info",
        };
        f.write_str(s)
    }
}

/// Operations within a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// A request or info round reached a terminal result
    Finished,
    /// A domain's topology changed
    Changed,
    /// The view was replaced or patched
    Updated,
    /// An asynchronous completion callback
    Callback,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Finished => "finished",
            Operation::Changed => "changed",
            Operation::Updated => "updated",
            Operation::Callback => "callback",
        };
        f.write_str(s)
    }
}

/// Builder for coordination subjects
#[derive(Debug, Default)]
pub struct SubjectBuilder {
    scope: Option<Scope>,
    operation: Option<Operation>,
}

impl SubjectBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn operation(mut self, operation: Operation) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Build a concrete subject; missing segments collapse to the root
    pub fn build(self) -> String {
        match (self.scope, self.operation) {
            (Some(scope), Some(op)) => format!("{COORDINATION_ROOT}.{scope}.{op}"),
            (Some(scope), None) => format!("{COORDINATION_ROOT}.{scope}"),
            _ => COORDINATION_ROOT.to_string(),
        }
    }

    /// Build a scope-level wildcard subscription
    pub fn build_wildcard(self) -> String {
        match self.scope {
            Some(scope) => format!("{COORDINATION_ROOT}.{scope}.>"),
            None => Self::build_all(),
        }
    }

    /// Wildcard covering every coordination subject
    pub fn build_all() -> String {
        format!("{COORDINATION_ROOT}.>")
    }
}

/// Convenience subject constructors
pub mod subjects {
    use super::*;

    pub fn request_finished() -> String {
        SubjectBuilder::new()
            .scope(Scope::Request)
            .operation(Operation::Finished)
            .build()
    }

    pub fn domain_changed() -> String {
        SubjectBuilder::new()
            .scope(Scope::Domain)
            .operation(Operation::Changed)
            .build()
    }

    pub fn domain_callback() -> String {
        SubjectBuilder::new()
            .scope(Scope::Domain)
            .operation(Operation::Callback)
            .build()
    }

    pub fn view_updated() -> String {
        SubjectBuilder::new()
            .scope(Scope::View)
            .operation(Operation::Updated)
            .build()
    }

    pub fn info_finished() -> String {
        SubjectBuilder::new()
            .scope(Scope::Info)
            .operation(Operation::Finished)
            .build()
    }

    pub fn all_domain_events() -> String {
        SubjectBuilder::new().scope(Scope::Domain).build_wildcard()
    }

    pub fn all_coordination_events() -> String {
        SubjectBuilder::build_all()
    }
}

/// Subject a notification is published on
pub fn subject_for(event: &CoordinationEvent) -> String {
    match event {
        CoordinationEvent::DomainChanged(_) => subjects::domain_changed(),
        CoordinationEvent::InstallationFinished(_) => subjects::request_finished(),
        CoordinationEvent::InfoRequestFinished(_) => subjects::info_finished(),
        CoordinationEvent::ViewUpdated { .. } => subjects::view_updated(),
    }
}
