use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::debug;

use weft_core::error::{Result, WeftError};
use weft_core::types::{AgentEvent, ChatTurn, SessionId};

use crate::session::SessionRegistry;

/// Feeds user messages into an active session's orchestrating agent and
/// exposes the run as a stream of wire frames.
pub struct MessageDelivery {
    registry: Arc<SessionRegistry>,
}

impl MessageDelivery {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Deliver one message to a session. Yields one `data: <json>\n` frame
    /// per agent event; when the run finishes, the accumulated text is
    /// appended to the session history as the assistant turn.
    ///
    /// Fails up front when the session is missing or its backing workflow
    /// was edited after compilation; history is untouched in both cases.
    pub async fn deliver(
        &self,
        session_id: &SessionId,
        message: &str,
    ) -> Result<BoxStream<'static, Result<String>>> {
        let session = self
            .registry
            .get(session_id)
            .await
            .ok_or_else(|| WeftError::NoActiveSession(session_id.to_string()))?;

        let (orchestrator, history, workflow_id, compiled_at) = {
            let guard = session.lock().await;
            (
                guard.orchestrator.clone(),
                guard.history.clone(),
                guard.workflow_id,
                guard.compiled_at,
            )
        };

        let current = self.registry.store().workflow_edited_at(workflow_id).await?;
        let stale = match (compiled_at, current) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(compiled), Some(edited)) => edited > compiled,
        };
        if stale {
            return Err(WeftError::StaleSession {
                session_id: session_id.to_string(),
                workflow_id,
            });
        }

        session.lock().await.history.push(ChatTurn::user(message));

        debug!(session = %session_id, "Delivering message");

        let mut events = orchestrator.stream(message.to_string(), history);
        let (tx, rx) = mpsc::channel::<Result<String>>(64);

        tokio::spawn(async move {
            let mut buffer = String::new();
            while let Some(event) = events.recv().await {
                if let AgentEvent::Delta { data } = &event {
                    buffer.push_str(data);
                }
                let json =
                    serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
                if tx.send(Ok(format!("data: {}\n", json))).await.is_err() {
                    break;
                }
            }
            session.lock().await.history.push(ChatTurn::assistant(buffer));
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|frame| (frame, rx))
        })
        .boxed();
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use weft_core::config::RuntimeConfig;
    use weft_core::records::{NodeKind, NodeRecord, WorkflowDefinition};
    use weft_core::types::TurnRole;
    use weft_test_utils::{MemoryStore, ScriptedLlm};

    fn workflow(id: Uuid) -> WorkflowDefinition {
        WorkflowDefinition {
            id,
            name: "W".into(),
            description: String::new(),
            model_id: None,
            nodes: vec![
                NodeRecord::new("in", NodeKind::Input),
                NodeRecord::new("out", NodeKind::Output),
            ],
            edges: vec![],
            last_edited: None,
        }
    }

    async fn setup(
        store: Arc<MemoryStore>,
        llm: Arc<ScriptedLlm>,
    ) -> (MessageDelivery, Uuid, SessionId) {
        let id = Uuid::new_v4();
        store.insert_workflow(workflow(id));
        let registry = Arc::new(SessionRegistry::new(store, llm, RuntimeConfig::default()));
        let session_id = registry.activate_workflow(id).await.unwrap();
        (MessageDelivery::new(registry), id, session_id)
    }

    async fn collect(mut stream: BoxStream<'static, Result<String>>) -> Vec<String> {
        let mut frames = Vec::new();
        while let Some(frame) = stream.next().await {
            frames.push(frame.unwrap());
        }
        frames
    }

    #[tokio::test]
    async fn test_missing_session_fails() {
        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(SessionRegistry::new(
            store,
            Arc::new(ScriptedLlm::new()),
            RuntimeConfig::default(),
        ));
        let delivery = MessageDelivery::new(registry);

        let Err(err) = delivery.deliver(&SessionId::from("nope"), "hi").await else {
            panic!("expected error");
        };
        assert!(matches!(err, WeftError::NoActiveSession(_)));
    }

    #[tokio::test]
    async fn test_frames_are_prefixed_json() {
        let store = Arc::new(MemoryStore::new());
        let llm = Arc::new(ScriptedLlm::new());
        llm.push_text("Hello");

        let (delivery, _, session_id) = setup(store, llm).await;
        let frames = collect(delivery.deliver(&session_id, "hi").await.unwrap()).await;

        assert_eq!(frames[0], "data: {\"data\":\"Hello\"}\n");
        let last = frames.last().unwrap();
        assert!(last.starts_with("data: {"));
        assert!(last.ends_with("\n"));
        assert!(last.contains("\"complete\":true"));
    }

    #[tokio::test]
    async fn test_history_gains_both_turns() {
        let store = Arc::new(MemoryStore::new());
        let llm = Arc::new(ScriptedLlm::new());
        llm.push_text("Hel");

        let (delivery, _, session_id) = setup(store, llm).await;
        collect(delivery.deliver(&session_id, "question").await.unwrap()).await;

        let session = delivery.registry.get(&session_id).await.unwrap();
        let session = session.lock().await;
        assert_eq!(session.history.len(), 2);
        assert_eq!(session.history[0].role, TurnRole::User);
        assert_eq!(session.history[0].content, "question");
        assert_eq!(session.history[1].role, TurnRole::Assistant);
        assert_eq!(session.history[1].content, "Hel");
    }

    #[tokio::test]
    async fn test_prior_history_reaches_orchestrator() {
        let store = Arc::new(MemoryStore::new());
        let llm = Arc::new(ScriptedLlm::new());
        llm.push_text("one");
        llm.push_text("two");

        let (delivery, _, session_id) = setup(store, llm.clone()).await;
        collect(delivery.deliver(&session_id, "first").await.unwrap()).await;
        collect(delivery.deliver(&session_id, "second").await.unwrap()).await;

        let requests = llm.requests();
        assert_eq!(requests.len(), 2);
        let second = &requests[1];
        assert!(second.messages.iter().any(|m| m.content == "first"));
        assert!(second.messages.iter().any(|m| m.content == "one"));
        assert_eq!(second.messages.last().unwrap().content, "second");
    }

    #[tokio::test]
    async fn test_stale_session_rejected_after_edit() {
        let store = Arc::new(MemoryStore::new());
        let llm = Arc::new(ScriptedLlm::new());
        llm.push_text("ok");

        let (delivery, workflow_id, session_id) = setup(store.clone(), llm).await;

        // Fresh before the edit.
        collect(delivery.deliver(&session_id, "hi").await.unwrap()).await;

        store.touch_workflow(workflow_id);
        let Err(err) = delivery.deliver(&session_id, "again").await else {
            panic!("expected error");
        };
        assert!(matches!(err, WeftError::StaleSession { .. }));

        // The rejected delivery left no trace in history.
        let session = delivery.registry.get(&session_id).await.unwrap();
        assert_eq!(session.lock().await.history.len(), 2);
    }
}
