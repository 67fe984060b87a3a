//! Workflow runtime: compiles persisted workflow and agent definitions into
//! model-backed agents, assembles the orchestrating agent for each session,
//! and delivers user messages as streamed event frames.

pub mod agent;
pub mod compiler;
pub mod delivery;
pub mod factory;
pub mod orchestrator;
pub mod session;

pub use agent::Agent;
pub use compiler::{CompiledGraph, WorkflowCompiler};
pub use delivery::MessageDelivery;
pub use factory::CapabilityFactory;
pub use orchestrator::{routing_policy, sanitize_capability_name, AgentCapability};
pub use session::{RuntimeSession, SessionRegistry};
