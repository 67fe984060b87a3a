use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use weft_core::config::RuntimeConfig;
use weft_core::error::{Result, WeftError};
use weft_core::records::{NodeKind, WorkflowDefinition};
use weft_core::traits::{Capability, LlmClient};
use weft_core::types::CapabilityResult;

use crate::agent::Agent;
use crate::compiler::CompiledGraph;

/// Replace every character outside `[A-Za-z0-9_-]` with `_`, yielding a
/// valid capability name.
pub fn sanitize_capability_name(name: &str) -> String {
    let invalid = Regex::new(r"[^A-Za-z0-9_-]").unwrap();
    invalid.replace_all(name, "_").into_owned()
}

#[derive(Deserialize)]
struct AgentTaskInput {
    task: String,
}

/// A compiled agent exposed as a callable capability: forwards the `task`
/// string to the agent and returns its reply verbatim.
pub struct AgentCapability {
    name: String,
    description: String,
    agent: Arc<Agent>,
}

impl AgentCapability {
    /// Wrap `agent` under an externally visible name and description.
    /// An empty description defaults to an execute-this-agent stub.
    pub fn new(agent: Arc<Agent>, name: &str, description: &str) -> Self {
        let description = if description.trim().is_empty() {
            format!("Execute the agent called {}", name)
        } else {
            description.to_string()
        };
        Self {
            name: sanitize_capability_name(name),
            description,
            agent,
        }
    }
}

impl Capability for AgentCapability {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "task": {
                    "type": "string",
                    "description": "The message or task to send to this agent"
                }
            },
            "required": ["task"]
        })
    }

    fn invoke(&self, input: serde_json::Value) -> BoxFuture<'_, Result<CapabilityResult>> {
        Box::pin(async move {
            let params: AgentTaskInput = serde_json::from_value(input)
                .map_err(|e| WeftError::CapabilityValidation(e.to_string()))?;

            debug!(agent = %self.name, "Forwarding task to sub-agent");

            match self.agent.run(&params.task).await {
                Ok(reply) => Ok(CapabilityResult::success(reply)),
                Err(e) => Ok(CapabilityResult::error(e.to_string())),
            }
        })
    }

    fn timeout_secs(&self) -> u64 {
        600
    }
}

/// Generate the routing-policy text narrating the graph. This text is the
/// only mechanism steering multi-step routing (there is no separate graph
/// walker), so its shape is a contract, deterministic given the graph.
///
/// `node_names` maps node ids to resolved display names; unresolved nodes
/// fall back to `Node <id>`.
pub fn routing_policy(
    definition: &WorkflowDefinition,
    node_names: &HashMap<String, String>,
) -> String {
    let label = |id: &str| {
        node_names
            .get(id)
            .cloned()
            .unwrap_or_else(|| format!("Node {}", id))
    };

    let mut prompt = format!("# Workflow: {}\n\n", definition.name);
    prompt.push_str(&format!("{}\n\n", definition.description));
    prompt.push_str("## Your Role\n");
    prompt.push_str(
        "You are the Workflow Orchestrator responsible for managing the execution of this workflow. ",
    );
    prompt.push_str(
        "You receive user messages and route them through the workflow according to the graph structure below.\n\n",
    );

    prompt.push_str("## Workflow Graph Structure\n");
    prompt.push_str("### Nodes:\n");
    for node in &definition.nodes {
        if node.kind == NodeKind::Input || node.kind == NodeKind::Output {
            continue;
        }
        prompt.push_str(&format!(
            "- {} (ID: {}, Type: {})\n",
            label(&node.id),
            node.id,
            node.kind.as_str()
        ));
    }

    prompt.push_str("\n### Edges:\n");
    for edge in &definition.edges {
        let kind_of = |id: &str| {
            definition
                .nodes
                .iter()
                .find(|n| n.id == id)
                .map(|n| n.kind)
        };

        let source = if kind_of(&edge.source) == Some(NodeKind::Input) {
            "the initial input".to_string()
        } else {
            format!("the {}", label(&edge.source))
        };
        let target = if kind_of(&edge.target) == Some(NodeKind::Output) {
            "the user as final response".to_string()
        } else {
            format!("the {}", label(&edge.target))
        };

        prompt.push_str(&format!(
            "- You can from {} send the result to {}\n",
            source, target
        ));
    }

    prompt.push_str("\n## Instructions\n");
    prompt.push_str(
        "1. When you receive a user message, identify the appropriate starting point in the workflow.\n",
    );
    prompt.push_str("2. Route the message through the workflow according to the graph structure.\n");
    prompt.push_str(
        "3. Each agent or tool in the workflow will process the message and produce a response.\n",
    );
    prompt.push_str(
        "4. Follow the graph edges to determine the next node (agent or tool) to invoke.\n",
    );
    prompt.push_str("5. For agent nodes, use the corresponding agent tool to process the message.\n");
    prompt.push_str("6. For tool nodes, use the corresponding tool directly to process the message.\n");
    prompt.push_str("7. Return the final response to the user.\n");

    prompt
}

/// Assemble the top-level orchestrating agent: every compiled sub-agent
/// wrapped as a named capability, every free tool capability attached
/// directly, and the routing-policy text as the system prompt.
pub fn assemble(
    definition: &WorkflowDefinition,
    graph: &CompiledGraph,
    llm: Arc<dyn LlmClient>,
    config: &RuntimeConfig,
) -> Arc<Agent> {
    let mut capabilities: Vec<Arc<dyn Capability>> = Vec::new();

    for agent in &graph.agents {
        capabilities.push(Arc::new(AgentCapability::new(
            agent.clone(),
            agent.name(),
            agent.description(),
        )));
    }
    capabilities.extend(graph.capabilities.iter().cloned());

    let prompt = routing_policy(definition, &graph.node_names);

    let model_id = definition
        .model_id
        .clone()
        .unwrap_or_else(|| config.default_model.clone());
    let model = llm.resolve_model(&model_id);

    debug!(
        workflow = %definition.name,
        capabilities = capabilities.len(),
        "Assembled orchestrator"
    );

    Arc::new(Agent::new(
        definition.name.clone(),
        definition.description.clone(),
        prompt,
        model,
        capabilities,
        llm,
        config.max_turns,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;
    use weft_core::records::{EdgeRecord, NodeRecord};
    use uuid::Uuid;

    fn definition() -> WorkflowDefinition {
        WorkflowDefinition {
            id: Uuid::new_v4(),
            name: "Research Pipeline".into(),
            description: "Summarize then publish.".into(),
            model_id: None,
            nodes: vec![
                NodeRecord::new("I", NodeKind::Input),
                NodeRecord::new("A", NodeKind::Agent).with_reference(Uuid::new_v4()),
                NodeRecord::new("O", NodeKind::Output),
            ],
            edges: vec![EdgeRecord::new("I", "A"), EdgeRecord::new("A", "O")],
            last_edited: None,
        }
    }

    #[test]
    fn test_sanitizer_produces_valid_names() {
        let valid = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
        for name in ["Data Analyst", "Écrivain (FR)", "a.b/c", "ok_name-2"] {
            assert!(valid.is_match(&sanitize_capability_name(name)), "{}", name);
        }
        assert_eq!(sanitize_capability_name("Data Analyst"), "Data_Analyst");
    }

    #[test]
    fn test_routing_policy_narrates_graph() {
        let def = definition();
        let names = HashMap::from([("A".to_string(), "Summarizer".to_string())]);
        let policy = routing_policy(&def, &names);

        assert!(policy.contains("# Workflow: Research Pipeline"));
        assert!(policy.contains("Summarize then publish."));
        assert!(policy.contains("- Summarizer (ID: A, Type: agent)"));
        assert!(policy
            .contains("- You can from the initial input send the result to the Summarizer"));
        assert!(policy
            .contains("- You can from the Summarizer send the result to the user as final response"));
    }

    #[test]
    fn test_routing_policy_excludes_io_nodes_from_listing() {
        let def = definition();
        let names = HashMap::from([("A".to_string(), "Summarizer".to_string())]);
        let policy = routing_policy(&def, &names);

        let nodes_section = policy
            .split("### Nodes:")
            .nth(1)
            .unwrap()
            .split("### Edges:")
            .next()
            .unwrap();
        assert_eq!(nodes_section.matches("- ").count(), 1);
    }

    #[test]
    fn test_routing_policy_unresolved_node_fallback() {
        let mut def = definition();
        def.nodes.push(NodeRecord::new("T", NodeKind::Tool));
        def.edges.push(EdgeRecord::new("A", "T"));
        let names = HashMap::new();
        let policy = routing_policy(&def, &names);

        assert!(policy.contains("- Node A (ID: A, Type: agent)"));
        assert!(policy.contains("- You can from the Node A send the result to the Node T"));
    }

    #[test]
    fn test_one_edge_line_per_edge() {
        let def = definition();
        let policy = routing_policy(&def, &HashMap::new());
        assert_eq!(policy.matches("- You can from ").count(), def.edges.len());
    }
}
