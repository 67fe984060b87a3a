use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use uuid::Uuid;

use crate::error::Result;
use crate::records::{AgentRecord, ToolRecord, WorkflowDefinition};
use crate::types::{CapabilityDefinition, CapabilityResult, ModelMessage, StreamDelta};

/// An invocable unit available to an agent: builtin, bridged from an
/// external-process provider, or a nested agent.
pub trait Capability: Send + Sync + 'static {
    /// Capability name (used in model tool calls). Must match `[A-Za-z0-9_-]+`.
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// JSON Schema for the capability input.
    fn input_schema(&self) -> serde_json::Value;

    /// Invoke the capability with the given input.
    fn invoke(&self, input: serde_json::Value) -> BoxFuture<'_, Result<CapabilityResult>>;

    /// Timeout in seconds for one invocation.
    fn timeout_secs(&self) -> u64 {
        30
    }

    /// Definition sent to the model backend.
    fn definition(&self) -> CapabilityDefinition {
        CapabilityDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Definition store, supplying persisted workflow/agent/tool records by
/// identity, plus the current edit timestamp used for staleness checks.
pub trait DefinitionStore: Send + Sync + 'static {
    fn workflow(&self, id: Uuid) -> BoxFuture<'_, Result<Option<WorkflowDefinition>>>;

    fn agent(&self, id: Uuid) -> BoxFuture<'_, Result<Option<AgentRecord>>>;

    fn tool(&self, id: Uuid) -> BoxFuture<'_, Result<Option<ToolRecord>>>;

    /// Tools attached to an agent, in association order.
    fn agent_tools(&self, agent_id: Uuid) -> BoxFuture<'_, Result<Vec<ToolRecord>>>;

    /// Current edit timestamp of a workflow, `None` when never edited.
    fn workflow_edited_at(&self, id: Uuid) -> BoxFuture<'_, Result<Option<DateTime<Utc>>>>;
}

/// Model-hosting backend: accepts a model identifier and streams deltas.
pub trait LlmClient: Send + Sync + 'static {
    /// Send a chat request and receive a stream of deltas.
    fn chat_stream(
        &self,
        model: &str,
        messages: Vec<ModelMessage>,
        tools: &[CapabilityDefinition],
    ) -> BoxFuture<'_, Result<BoxStream<'_, Result<StreamDelta>>>>;

    /// Resolve a model identifier to the backend's effective handle, e.g.
    /// a cross-region inference profile. Defaults to a passthrough.
    fn resolve_model(&self, model_id: &str) -> String {
        model_id.to_string()
    }
}
