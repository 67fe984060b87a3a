//! Test fixtures shared across Weft crates: an in-memory definition store
//! and a scripted model client that replays canned stream deltas.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::StreamExt;
use uuid::Uuid;

use weft_core::error::Result;
use weft_core::records::{AgentRecord, ToolRecord, WorkflowDefinition};
use weft_core::traits::{DefinitionStore, LlmClient};
use weft_core::types::{CapabilityDefinition, ModelMessage, StopReason, StreamDelta};

/// In-memory `DefinitionStore` backed by hash maps.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    workflows: HashMap<Uuid, WorkflowDefinition>,
    agents: HashMap<Uuid, AgentRecord>,
    tools: HashMap<Uuid, ToolRecord>,
    attachments: HashMap<Uuid, Vec<Uuid>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_workflow(&self, workflow: WorkflowDefinition) {
        self.inner
            .lock()
            .unwrap()
            .workflows
            .insert(workflow.id, workflow);
    }

    pub fn insert_agent(&self, agent: AgentRecord) {
        self.inner.lock().unwrap().agents.insert(agent.id, agent);
    }

    pub fn insert_tool(&self, tool: ToolRecord) {
        self.inner.lock().unwrap().tools.insert(tool.id, tool);
    }

    /// Attach a tool to an agent, preserving attachment order.
    pub fn attach_tool(&self, agent_id: Uuid, tool_id: Uuid) {
        self.inner
            .lock()
            .unwrap()
            .attachments
            .entry(agent_id)
            .or_default()
            .push(tool_id);
    }

    /// Advance a workflow's edit timestamp to now, as an editor save would.
    pub fn touch_workflow(&self, id: Uuid) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(workflow) = inner.workflows.get_mut(&id) {
            workflow.last_edited = Some(Utc::now());
        }
    }
}

impl DefinitionStore for MemoryStore {
    fn workflow(&self, id: Uuid) -> BoxFuture<'_, Result<Option<WorkflowDefinition>>> {
        let found = self.inner.lock().unwrap().workflows.get(&id).cloned();
        Box::pin(async move { Ok(found) })
    }

    fn agent(&self, id: Uuid) -> BoxFuture<'_, Result<Option<AgentRecord>>> {
        let found = self.inner.lock().unwrap().agents.get(&id).cloned();
        Box::pin(async move { Ok(found) })
    }

    fn tool(&self, id: Uuid) -> BoxFuture<'_, Result<Option<ToolRecord>>> {
        let found = self.inner.lock().unwrap().tools.get(&id).cloned();
        Box::pin(async move { Ok(found) })
    }

    fn agent_tools(&self, agent_id: Uuid) -> BoxFuture<'_, Result<Vec<ToolRecord>>> {
        let found = {
            let inner = self.inner.lock().unwrap();
            inner
                .attachments
                .get(&agent_id)
                .map(|ids| {
                    ids.iter()
                        .filter_map(|id| inner.tools.get(id).cloned())
                        .collect()
                })
                .unwrap_or_default()
        };
        Box::pin(async move { Ok(found) })
    }

    fn workflow_edited_at(&self, id: Uuid) -> BoxFuture<'_, Result<Option<DateTime<Utc>>>> {
        let found = self
            .inner
            .lock()
            .unwrap()
            .workflows
            .get(&id)
            .and_then(|w| w.last_edited);
        Box::pin(async move { Ok(found) })
    }
}

/// One recorded chat request, for assertions.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub model: String,
    pub messages: Vec<ModelMessage>,
    pub tool_names: Vec<String>,
}

/// Scripted `LlmClient`: replays queued turns of stream deltas and records
/// every request it receives.
#[derive(Default)]
pub struct ScriptedLlm {
    turns: Mutex<VecDeque<Vec<StreamDelta>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a plain text reply ending the turn.
    pub fn push_text(&self, text: &str) {
        self.turns.lock().unwrap().push_back(vec![
            StreamDelta::TextDelta(text.to_string()),
            StreamDelta::Stop(StopReason::EndTurn),
        ]);
    }

    /// Queue a single tool call.
    pub fn push_tool_call(&self, name: &str, input: serde_json::Value) {
        self.turns.lock().unwrap().push_back(vec![
            StreamDelta::ToolUseStart {
                index: 0,
                id: format!("call_{}", name),
                name: name.to_string(),
            },
            StreamDelta::ToolInputDelta {
                index: 0,
                delta: input.to_string(),
            },
            StreamDelta::Stop(StopReason::ToolUse),
        ]);
    }

    /// Queue a raw delta sequence.
    pub fn push_turn(&self, deltas: Vec<StreamDelta>) {
        self.turns.lock().unwrap().push_back(deltas);
    }

    /// All requests seen so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl LlmClient for ScriptedLlm {
    fn chat_stream(
        &self,
        model: &str,
        messages: Vec<ModelMessage>,
        tools: &[CapabilityDefinition],
    ) -> BoxFuture<'_, Result<BoxStream<'_, Result<StreamDelta>>>> {
        self.requests.lock().unwrap().push(RecordedRequest {
            model: model.to_string(),
            messages,
            tool_names: tools.iter().map(|t| t.name.clone()).collect(),
        });

        let deltas = self
            .turns
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| vec![StreamDelta::Stop(StopReason::EndTurn)]);

        Box::pin(async move {
            let stream = futures::stream::iter(deltas.into_iter().map(Ok)).boxed();
            Ok(stream)
        })
    }
}
