//! Multi-domain coordination core for infrastructure orchestration
//!
//! Splits a mapped topology graph per administrative domain, delegates
//! installation to the owning domain managers, tracks per-domain outcomes,
//! maintains the Global Resource View of everything believed installed, and
//! rolls back to the last known-good state on failure.

pub mod config;
pub mod coordinator;
pub mod errors;
pub mod events;
pub mod manager;
pub mod nats;
pub mod registry;
pub mod status;
pub mod subjects;
pub mod topology;
pub mod view;

// Re-export commonly used types
pub use config::{CoordinationConfig, ManagerConfig, UpdateStrategy};
pub use coordinator::Coordinator;
pub use errors::{CoordinationError, CoordinationResult};
pub use events::{
    CallbackKind, CallbackOutcome, CallbackResult, ChangeCause, CoordinationCommand,
    CoordinationEvent, DomainChanged, InfoRequestFinished, InstallResult,
    InstallationFinished, PeerDomain,
};
pub use manager::{DomainManager, ManagerCapabilities, ManagerContext, ManagerFactory};
pub use nats::{BusConfig, CoordinationBus};
pub use registry::ComponentRegistry;
pub use status::{AggregateStatus, DomainState, RequestStatus, RequestTracker};
pub use topology::{ElementStatus, Link, Node, NodeKind, TopologyGraph};
pub use view::GlobalViewManager;
