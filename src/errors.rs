//! Error types for coordination operations

use thiserror::Error;

/// Errors that can occur while coordinating multi-domain operations
#[derive(Debug, Error)]
pub enum CoordinationError {
    /// Manager definition missing or ambiguous; fatal at startup
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No manager registered (or startable) under the given name
    #[error("Manager not registered: {0}")]
    ManagerNotRegistered(String),

    /// A request with this id is already tracked
    #[error("Request already registered: {0}")]
    DuplicateRequest(String),

    /// Status update addressed to a domain outside the entry's fixed key set
    #[error("Domain {domain} is not part of request {request}")]
    UntrackedDomain { request: String, domain: String },

    /// NATS publish/subscribe error
    #[error("Bus error: {0}")]
    Bus(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for coordination operations
pub type CoordinationResult<T> = Result<T, CoordinationError>;
