//! Agent variant implementations.
//!
//! All variants embed [`crate::AgentCore`] and differ only in how they
//! execute tasks and which task types they accept.

pub mod adapter;
pub mod ai;
pub mod http;
pub mod mock;
pub mod workflow;

pub use adapter::AdapterAgent;
pub use ai::AiAgent;
pub use http::HttpAgent;
pub use mock::MockAgent;
pub use workflow::{OnError, StepType, WorkflowAgent, WorkflowStep};
