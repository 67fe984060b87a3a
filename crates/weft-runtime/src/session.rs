use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use weft_core::config::RuntimeConfig;
use weft_core::error::{Result, WeftError};
use weft_core::records::{EdgeRecord, NodeRecord};
use weft_core::traits::{Capability, DefinitionStore, LlmClient};
use weft_core::types::{ChatTurn, SessionId};

use crate::agent::Agent;
use crate::compiler::WorkflowCompiler;
use crate::orchestrator;

/// One activated session: the compiled runtime context for a workflow or a
/// single agent. Never persisted; process restart loses all sessions.
pub struct RuntimeSession {
    pub workflow_id: Uuid,
    pub name: String,
    pub description: String,
    pub nodes: HashMap<String, NodeRecord>,
    pub edges: Vec<EdgeRecord>,
    pub agents: Vec<Arc<Agent>>,
    pub capabilities: Vec<Arc<dyn Capability>>,
    pub orchestrator: Arc<Agent>,
    pub history: Vec<ChatTurn>,
    /// Edit timestamp observed at compile time, for staleness checks.
    pub compiled_at: Option<DateTime<Utc>>,
}

/// Process-wide table of active sessions. Each session sits behind its own
/// lock, so delivery to one session never blocks another; the outer map
/// lock is held only for lookups and insertions.
pub struct SessionRegistry {
    store: Arc<dyn DefinitionStore>,
    llm: Arc<dyn LlmClient>,
    config: RuntimeConfig,
    sessions: Mutex<HashMap<SessionId, Arc<Mutex<RuntimeSession>>>>,
    edit_stamps: Mutex<HashMap<Uuid, Option<DateTime<Utc>>>>,
}

impl SessionRegistry {
    pub fn new(
        store: Arc<dyn DefinitionStore>,
        llm: Arc<dyn LlmClient>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            store,
            llm,
            config,
            sessions: Mutex::new(HashMap::new()),
            edit_stamps: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn DefinitionStore> {
        &self.store
    }

    /// Compile a workflow and register it under its id. Replaces any
    /// existing session for the same workflow.
    pub async fn activate_workflow(&self, workflow_id: Uuid) -> Result<SessionId> {
        let definition = self
            .store
            .workflow(workflow_id)
            .await?
            .ok_or(WeftError::WorkflowNotFound(workflow_id))?;

        let compiler =
            WorkflowCompiler::new(self.store.clone(), self.llm.clone(), self.config.clone());
        let graph = compiler.compile(&definition).await;
        let orchestrator =
            orchestrator::assemble(&definition, &graph, self.llm.clone(), &self.config);

        let compiled_at = definition.last_edited;
        let session = RuntimeSession {
            workflow_id,
            name: definition.name.clone(),
            description: definition.description.clone(),
            nodes: definition
                .nodes
                .iter()
                .map(|n| (n.id.clone(), n.clone()))
                .collect(),
            edges: definition.edges.clone(),
            agents: graph.agents,
            capabilities: graph.capabilities,
            orchestrator,
            history: Vec::new(),
            compiled_at,
        };

        let session_id = SessionId::from_uuid(workflow_id);
        self.sessions
            .lock()
            .await
            .insert(session_id.clone(), Arc::new(Mutex::new(session)));
        self.edit_stamps
            .lock()
            .await
            .insert(workflow_id, compiled_at);

        info!(workflow = %definition.name, session = %session_id, "Activated workflow session");
        Ok(session_id)
    }

    /// Compile a single agent as its own orchestrator, with no graph around
    /// it. The session id is the agent's id.
    pub async fn activate_agent(&self, agent_id: Uuid) -> Result<SessionId> {
        let record = self
            .store
            .agent(agent_id)
            .await?
            .ok_or(WeftError::AgentNotFound(agent_id))?;

        let compiler =
            WorkflowCompiler::new(self.store.clone(), self.llm.clone(), self.config.clone());
        let agent = compiler.factory().compile_agent(&record, None).await;

        let session = RuntimeSession {
            workflow_id: agent_id,
            name: record.name.clone(),
            description: record.description.clone(),
            nodes: HashMap::new(),
            edges: Vec::new(),
            agents: vec![agent.clone()],
            capabilities: Vec::new(),
            orchestrator: agent,
            history: Vec::new(),
            compiled_at: None,
        };

        let session_id = SessionId::from_uuid(agent_id);
        self.sessions
            .lock()
            .await
            .insert(session_id.clone(), Arc::new(Mutex::new(session)));

        info!(agent = %record.name, session = %session_id, "Activated agent session");
        Ok(session_id)
    }

    pub async fn get(&self, session_id: &SessionId) -> Option<Arc<Mutex<RuntimeSession>>> {
        self.sessions.lock().await.get(session_id).cloned()
    }

    /// Remove one session. Returns whether it existed.
    pub async fn clear(&self, session_id: &SessionId) -> bool {
        self.sessions.lock().await.remove(session_id).is_some()
    }

    /// Remove the session for a workflow and reset its recorded edit stamp,
    /// so the next activation starts from a clean slate.
    pub async fn clear_workflow(&self, workflow_id: Uuid) -> bool {
        let removed = self
            .sessions
            .lock()
            .await
            .remove(&SessionId::from_uuid(workflow_id))
            .is_some();
        self.edit_stamps.lock().await.insert(workflow_id, None);
        removed
    }

    pub async fn list(&self) -> Vec<SessionId> {
        self.sessions.lock().await.keys().cloned().collect()
    }

    /// The edit stamp recorded at last activation, if any activation (or
    /// clear) has touched this workflow.
    pub async fn recorded_edit_stamp(&self, workflow_id: Uuid) -> Option<Option<DateTime<Utc>>> {
        self.edit_stamps.lock().await.get(&workflow_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::records::{AgentRecord, NodeKind, WorkflowDefinition};
    use weft_test_utils::{MemoryStore, ScriptedLlm};

    fn registry_with(store: Arc<MemoryStore>) -> SessionRegistry {
        SessionRegistry::new(store, Arc::new(ScriptedLlm::new()), RuntimeConfig::default())
    }

    fn workflow(id: Uuid) -> WorkflowDefinition {
        WorkflowDefinition {
            id,
            name: "Pipeline".into(),
            description: "d".into(),
            model_id: None,
            nodes: vec![
                NodeRecord::new("in", NodeKind::Input),
                NodeRecord::new("out", NodeKind::Output),
            ],
            edges: vec![EdgeRecord::new("in", "out")],
            last_edited: None,
        }
    }

    #[tokio::test]
    async fn test_activate_get_clear_round_trip() {
        let store = Arc::new(MemoryStore::new());
        let id = Uuid::new_v4();
        store.insert_workflow(workflow(id));

        let registry = registry_with(store);
        let session_id = registry.activate_workflow(id).await.unwrap();
        assert_eq!(session_id, SessionId::from_uuid(id));
        assert!(registry.get(&session_id).await.is_some());
        assert_eq!(registry.list().await, vec![session_id.clone()]);

        assert!(registry.clear(&session_id).await);
        assert!(registry.get(&session_id).await.is_none());
        assert!(!registry.clear(&session_id).await);
    }

    #[tokio::test]
    async fn test_activate_unknown_workflow_fails() {
        let registry = registry_with(Arc::new(MemoryStore::new()));
        let err = registry.activate_workflow(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, WeftError::WorkflowNotFound(_)));
    }

    #[tokio::test]
    async fn test_activate_agent_session() {
        let store = Arc::new(MemoryStore::new());
        let agent_id = Uuid::new_v4();
        store.insert_agent(AgentRecord {
            id: agent_id,
            name: "Solo".into(),
            description: String::new(),
            prompt: "p".into(),
            model_id: None,
        });

        let registry = registry_with(store);
        let session_id = registry.activate_agent(agent_id).await.unwrap();
        assert_eq!(session_id, SessionId::from_uuid(agent_id));

        let session = registry.get(&session_id).await.unwrap();
        let session = session.lock().await;
        assert!(session.nodes.is_empty());
        assert!(session.edges.is_empty());
        assert!(session.compiled_at.is_none());
        assert_eq!(session.orchestrator.name(), "Solo");
    }

    #[tokio::test]
    async fn test_activate_unknown_agent_fails() {
        let registry = registry_with(Arc::new(MemoryStore::new()));
        let err = registry.activate_agent(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, WeftError::AgentNotFound(_)));
    }

    #[tokio::test]
    async fn test_clear_workflow_resets_edit_stamp() {
        let store = Arc::new(MemoryStore::new());
        let id = Uuid::new_v4();
        store.insert_workflow(workflow(id));
        store.touch_workflow(id);

        let registry = registry_with(store);
        registry.activate_workflow(id).await.unwrap();
        assert!(registry.recorded_edit_stamp(id).await.unwrap().is_some());

        assert!(registry.clear_workflow(id).await);
        assert!(registry.get(&SessionId::from_uuid(id)).await.is_none());
        assert!(registry.recorded_edit_stamp(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reactivation_replaces_session() {
        let store = Arc::new(MemoryStore::new());
        let id = Uuid::new_v4();
        store.insert_workflow(workflow(id));

        let registry = registry_with(store.clone());
        let session_id = registry.activate_workflow(id).await.unwrap();
        {
            let session = registry.get(&session_id).await.unwrap();
            session.lock().await.history.push(ChatTurn::user("hi"));
        }

        registry.activate_workflow(id).await.unwrap();
        let session = registry.get(&session_id).await.unwrap();
        assert!(session.lock().await.history.is_empty());
    }
}
