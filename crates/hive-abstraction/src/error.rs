// Error types shared across the runtime

use thiserror::Error;

/// Errors produced by agents, the factory, and the adapter subsystem.
///
/// Execution failures are deliberately *not* represented here: an agent
/// reports them through [`crate::TaskResult`] so that a failing task never
/// tears down the worker that ran it. These variants cover configuration
/// and infrastructure faults that must stop an operation before it starts.
#[derive(Debug, Error)]
pub enum AgentError {
    /// A required configuration field is absent.
    #[error("missing required config field '{field}' for {kind} agent")]
    MissingField {
        /// The agent kind being configured.
        kind: String,
        /// The absent field name.
        field: String,
    },

    /// A configuration field is present but has the wrong shape.
    #[error("invalid config field '{field}': {reason}")]
    InvalidField {
        /// The offending field name.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The requested agent or adapter kind is not part of the supported set.
    #[error("unsupported kind: {0}")]
    UnsupportedKind(String),

    /// No registered adapter can serve the requested operation.
    #[error("no adapter found capable of handling: {0}")]
    AdapterNotFound(String),

    /// The selected adapter is registered but not healthy.
    #[error("adapter '{0}' is not healthy")]
    AdapterUnhealthy(String),

    /// An adapter with the same name is already registered.
    #[error("adapter '{0}' already registered")]
    AlreadyRegistered(String),

    /// An outbound HTTP request could not be built or sent.
    #[error("http error: {0}")]
    Http(String),

    /// The AI provider rejected the request or returned an error payload.
    #[error("provider error: {0}")]
    Provider(String),

    /// Other unexpected errors.
    #[error("agent error: {0}")]
    Other(String),
}
