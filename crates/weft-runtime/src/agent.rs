use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use weft_core::error::{Result, WeftError};
use weft_core::traits::{Capability, LlmClient};
use weft_core::types::{
    AgentEvent, CapabilityDefinition, CapabilityResult, ChatTurn, ModelMessage, StopReason,
    StreamDelta, ToolOutcomeInfo, ToolUseInfo, TurnRole,
};

/// Upper bound on tool calls accumulated per turn; deltas indexed beyond it
/// are discarded rather than allocated for.
const MAX_TOOL_CALLS_PER_TURN: usize = 64;

/// Accumulator for streaming tool call deltas.
#[derive(Debug, Default)]
struct ToolCallAccumulator {
    id: String,
    name: String,
    input_json: String,
}

/// A compiled, model-backed agent: a system prompt, a resolved model
/// identifier, and the set of capabilities it may invoke.
///
/// Driving an agent runs a tool-use loop against the model backend and
/// emits `AgentEvent`s as they happen; the caller consumes them from the
/// returned channel at its own pace.
pub struct Agent {
    name: String,
    description: String,
    prompt: String,
    model: String,
    capabilities: Vec<Arc<dyn Capability>>,
    llm: Arc<dyn LlmClient>,
    max_turns: usize,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        prompt: impl Into<String>,
        model: impl Into<String>,
        capabilities: Vec<Arc<dyn Capability>>,
        llm: Arc<dyn LlmClient>,
        max_turns: usize,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            prompt: prompt.into(),
            model: model.into(),
            capabilities,
            llm,
            max_turns,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn capabilities(&self) -> &[Arc<dyn Capability>] {
        &self.capabilities
    }

    /// Drive the agent with a message and prior conversation history.
    /// Events arrive on the returned channel; the producer suspends when
    /// the channel is full and stops when the receiver is dropped.
    pub fn stream(
        self: Arc<Self>,
        message: String,
        history: Vec<ChatTurn>,
    ) -> mpsc::Receiver<AgentEvent> {
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            if let Err(e) = self.drive(&message, &history, &tx).await {
                error!(agent = %self.name, error = %e, "Agent run failed");
                let _ = tx
                    .send(AgentEvent::Failure {
                        error: e.to_string(),
                    })
                    .await;
            }
        });
        rx
    }

    /// Run to completion and return the concatenated text reply. Used when
    /// the agent is exposed as a capability of another agent.
    pub async fn run(self: &Arc<Self>, message: &str) -> Result<String> {
        let mut rx = self.clone().stream(message.to_string(), Vec::new());
        let mut buffer = String::new();
        while let Some(event) = rx.recv().await {
            match event {
                AgentEvent::Delta { data } => buffer.push_str(&data),
                AgentEvent::Failure { error } => return Err(WeftError::LlmRequest(error)),
                _ => {}
            }
        }
        Ok(buffer)
    }

    async fn drive(
        &self,
        message: &str,
        history: &[ChatTurn],
        tx: &mpsc::Sender<AgentEvent>,
    ) -> Result<()> {
        let mut messages = vec![ModelMessage::system(&self.prompt)];
        for turn in history {
            messages.push(match turn.role {
                TurnRole::User => ModelMessage::user(&turn.content),
                TurnRole::Assistant => ModelMessage::assistant(&turn.content),
            });
        }
        messages.push(ModelMessage::user(message));

        let tool_defs: Vec<CapabilityDefinition> =
            self.capabilities.iter().map(|c| c.definition()).collect();

        for turn in 0..self.max_turns {
            debug!(agent = %self.name, turn, "Starting agent turn");

            let mut stream = self
                .llm
                .chat_stream(&self.model, messages.clone(), &tool_defs)
                .await?;

            let mut text_content = String::new();
            let mut tool_calls: Vec<ToolCallAccumulator> = Vec::new();
            let mut stop_reason = None;

            while let Some(delta) = stream.next().await {
                match delta? {
                    StreamDelta::TextDelta(text) => {
                        let _ = tx.send(AgentEvent::Delta { data: text.clone() }).await;
                        text_content.push_str(&text);
                    }
                    StreamDelta::ToolUseStart { index, id, name } => {
                        if index >= MAX_TOOL_CALLS_PER_TURN {
                            warn!(agent = %self.name, index, "Ignoring out-of-range tool call index");
                            continue;
                        }
                        while tool_calls.len() <= index {
                            tool_calls.push(ToolCallAccumulator::default());
                        }
                        tool_calls[index].id = id;
                        tool_calls[index].name = name;
                    }
                    StreamDelta::ToolInputDelta { index, delta } => {
                        if let Some(tc) = tool_calls.get_mut(index) {
                            tc.input_json.push_str(&delta);
                        }
                    }
                    StreamDelta::Stop(reason) => {
                        stop_reason = Some(reason);
                    }
                }
            }
            drop(stream);

            if !text_content.is_empty() {
                messages.push(ModelMessage::assistant(&text_content));
            }

            let tool_use = matches!(stop_reason, Some(StopReason::ToolUse)) && !tool_calls.is_empty();
            if !tool_use {
                let _ = tx
                    .send(AgentEvent::Complete {
                        complete: true,
                        turns: turn + 1,
                    })
                    .await;
                return Ok(());
            }

            for tc in &tool_calls {
                let input: serde_json::Value =
                    serde_json::from_str(&tc.input_json).unwrap_or(serde_json::Value::Null);

                let _ = tx
                    .send(AgentEvent::ToolUse {
                        current_tool_use: ToolUseInfo {
                            id: tc.id.clone(),
                            name: tc.name.clone(),
                            input: input.clone(),
                        },
                    })
                    .await;

                let result = self.invoke_capability(&tc.name, input).await;

                let _ = tx
                    .send(AgentEvent::ToolOutcome {
                        tool_result: ToolOutcomeInfo {
                            name: tc.name.clone(),
                            content: result.content.clone(),
                            is_error: result.is_error,
                        },
                    })
                    .await;

                messages.push(ModelMessage::tool_result(format!(
                    "{}: {}",
                    tc.name, result.content
                )));
            }
        }

        Err(WeftError::MaxTurnsExceeded(self.max_turns))
    }

    /// Execute one capability by name. Misses, failures, and timeouts all
    /// become error-flagged results fed back to the model, never aborts.
    async fn invoke_capability(&self, name: &str, input: serde_json::Value) -> CapabilityResult {
        let Some(capability) = self.capabilities.iter().find(|c| c.name() == name) else {
            warn!(agent = %self.name, capability = %name, "Model called unknown capability");
            return CapabilityResult::error(format!("Unknown capability: {}", name));
        };

        let timeout = Duration::from_secs(capability.timeout_secs());
        match tokio::time::timeout(timeout, capability.invoke(input)).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                error!(capability = %name, error = %e, "Capability execution failed");
                CapabilityResult::error(e.to_string())
            }
            Err(_) => CapabilityResult::error(format!(
                "Capability '{}' timed out after {}s",
                name,
                capability.timeout_secs()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use weft_test_utils::ScriptedLlm;

    struct EchoCapability;

    impl Capability for EchoCapability {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the input back"
        }

        fn input_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }

        fn invoke(&self, input: serde_json::Value) -> BoxFuture<'_, Result<CapabilityResult>> {
            Box::pin(async move {
                Ok(CapabilityResult::success(
                    input["text"].as_str().unwrap_or_default().to_string(),
                ))
            })
        }
    }

    fn agent_with(llm: Arc<ScriptedLlm>, capabilities: Vec<Arc<dyn Capability>>) -> Arc<Agent> {
        Arc::new(Agent::new(
            "Tester",
            "",
            "You are a test agent.",
            "test-model",
            capabilities,
            llm,
            5,
        ))
    }

    async fn collect(mut rx: mpsc::Receiver<AgentEvent>) -> Vec<AgentEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_plain_text_turn() {
        let llm = Arc::new(ScriptedLlm::new());
        llm.push_text("hello");

        let agent = agent_with(llm, vec![]);
        let events = collect(agent.stream("hi".into(), vec![])).await;

        assert!(matches!(&events[0], AgentEvent::Delta { data } if data == "hello"));
        assert!(matches!(events.last(), Some(AgentEvent::Complete { .. })));
    }

    #[tokio::test]
    async fn test_tool_call_round_trip() {
        let llm = Arc::new(ScriptedLlm::new());
        llm.push_tool_call("echo", serde_json::json!({"text": "pong"}));
        llm.push_text("done");

        let agent = agent_with(llm.clone(), vec![Arc::new(EchoCapability)]);
        let events = collect(agent.stream("ping".into(), vec![])).await;

        assert!(events.iter().any(|e| matches!(
            e,
            AgentEvent::ToolUse { current_tool_use } if current_tool_use.name == "echo"
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            AgentEvent::ToolOutcome { tool_result } if tool_result.content == "pong" && !tool_result.is_error
        )));

        // Second request carried the tool result back to the model.
        let requests = llm.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1]
            .messages
            .iter()
            .any(|m| m.role == "tool" && m.content.contains("pong")));
    }

    #[tokio::test]
    async fn test_unknown_capability_is_soft_error() {
        let llm = Arc::new(ScriptedLlm::new());
        llm.push_tool_call("missing", serde_json::json!({}));
        llm.push_text("recovered");

        let agent = agent_with(llm, vec![]);
        let events = collect(agent.stream("go".into(), vec![])).await;

        assert!(events.iter().any(|e| matches!(
            e,
            AgentEvent::ToolOutcome { tool_result } if tool_result.is_error
        )));
        assert!(matches!(events.last(), Some(AgentEvent::Complete { .. })));
    }

    #[tokio::test]
    async fn test_history_reaches_model() {
        let llm = Arc::new(ScriptedLlm::new());
        llm.push_text("reply");

        let agent = agent_with(llm.clone(), vec![]);
        let history = vec![ChatTurn::user("earlier"), ChatTurn::assistant("noted")];
        collect(agent.stream("now".into(), history)).await;

        let request = &llm.requests()[0];
        assert_eq!(request.messages[0].role, "system");
        assert!(request.messages.iter().any(|m| m.content == "earlier"));
        assert!(request.messages.iter().any(|m| m.content == "noted"));
        assert_eq!(request.messages.last().unwrap().content, "now");
    }

    #[tokio::test]
    async fn test_out_of_range_tool_index_is_ignored() {
        let llm = Arc::new(ScriptedLlm::new());
        llm.push_turn(vec![
            StreamDelta::ToolUseStart {
                index: 1_000_000,
                id: "call_echo".into(),
                name: "echo".into(),
            },
            StreamDelta::ToolInputDelta {
                index: 1_000_000,
                delta: "{}".into(),
            },
            StreamDelta::Stop(StopReason::ToolUse),
        ]);

        let agent = agent_with(llm, vec![Arc::new(EchoCapability)]);
        let events = collect(agent.stream("go".into(), vec![])).await;

        assert!(!events
            .iter()
            .any(|e| matches!(e, AgentEvent::ToolUse { .. })));
        assert!(matches!(events.last(), Some(AgentEvent::Complete { .. })));
    }

    #[tokio::test]
    async fn test_run_concatenates_text() {
        let llm = Arc::new(ScriptedLlm::new());
        llm.push_turn(vec![
            StreamDelta::TextDelta("a".into()),
            StreamDelta::TextDelta("b".into()),
            StreamDelta::Stop(StopReason::EndTurn),
        ]);

        let agent = agent_with(llm, vec![]);
        assert_eq!(agent.run("x").await.unwrap(), "ab");
    }
}
