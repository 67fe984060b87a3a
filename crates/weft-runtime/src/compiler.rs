use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use weft_core::config::RuntimeConfig;
use weft_core::records::{NodeKind, NodeRecord, WorkflowDefinition};
use weft_core::traits::{Capability, DefinitionStore, LlmClient};

use crate::agent::Agent;
use crate::factory::CapabilityFactory;

/// Everything compiled out of a workflow graph: the agents behind agent
/// nodes, the free capabilities behind tool nodes, and the resolved display
/// name for each node id.
#[derive(Default)]
pub struct CompiledGraph {
    pub agents: Vec<Arc<Agent>>,
    pub capabilities: Vec<Arc<dyn Capability>>,
    pub node_names: HashMap<String, String>,
}

/// Walks a workflow definition node by node and resolves each reference
/// through the capability factory. Unresolvable nodes are skipped with a
/// warning; a partially compiled graph is still usable.
pub struct WorkflowCompiler {
    factory: CapabilityFactory,
    store: Arc<dyn DefinitionStore>,
}

impl WorkflowCompiler {
    pub fn new(
        store: Arc<dyn DefinitionStore>,
        llm: Arc<dyn LlmClient>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            factory: CapabilityFactory::new(store.clone(), llm, config),
            store,
        }
    }

    pub fn factory(&self) -> &CapabilityFactory {
        &self.factory
    }

    pub async fn compile(&self, definition: &WorkflowDefinition) -> CompiledGraph {
        let mut graph = CompiledGraph::default();

        for node in &definition.nodes {
            match node.kind {
                NodeKind::Input | NodeKind::Output => {}
                NodeKind::Agent => self.compile_agent_node(definition, node, &mut graph).await,
                NodeKind::Tool => self.compile_tool_node(node, &mut graph).await,
            }
        }

        info!(
            workflow = %definition.name,
            agents = graph.agents.len(),
            capabilities = graph.capabilities.len(),
            "Compiled workflow graph"
        );
        graph
    }

    async fn compile_agent_node(
        &self,
        definition: &WorkflowDefinition,
        node: &NodeRecord,
        graph: &mut CompiledGraph,
    ) {
        let Some(reference) = node.reference else {
            warn!(node = %node.id, "Agent node carries no agent reference");
            return;
        };

        match self.store.agent(reference).await {
            Ok(Some(record)) => {
                graph.node_names.insert(node.id.clone(), record.name.clone());
                let agent = self
                    .factory
                    .compile_agent(&record, definition.model_id.as_deref())
                    .await;
                graph.agents.push(agent);
            }
            Ok(None) => {
                warn!(node = %node.id, agent_id = %reference, "Agent record not found; skipping node");
            }
            Err(e) => {
                warn!(node = %node.id, error = %e, "Agent lookup failed; skipping node");
            }
        }
    }

    async fn compile_tool_node(
        &self,
        node: &NodeRecord,
        graph: &mut CompiledGraph,
    ) {
        let Some(reference) = node.reference else {
            warn!(node = %node.id, "Tool node carries no tool reference");
            return;
        };

        match self.store.tool(reference).await {
            Ok(Some(record)) => {
                graph.node_names.insert(node.id.clone(), record.name.clone());
                graph
                    .capabilities
                    .extend(self.factory.build(&record).await);
            }
            Ok(None) => {
                warn!(node = %node.id, tool_id = %reference, "Tool record not found; skipping node");
            }
            Err(e) => {
                warn!(node = %node.id, error = %e, "Tool lookup failed; skipping node");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use weft_core::records::{
        AgentRecord, EdgeRecord, NodeRecord, ToolKind, ToolRecord,
    };
    use weft_test_utils::{MemoryStore, ScriptedLlm};

    fn compiler_with(store: Arc<MemoryStore>) -> WorkflowCompiler {
        WorkflowCompiler::new(store, Arc::new(ScriptedLlm::new()), RuntimeConfig::default())
    }

    #[tokio::test]
    async fn test_compile_resolves_agents_and_tools() {
        let store = Arc::new(MemoryStore::new());

        let agent_id = Uuid::new_v4();
        store.insert_agent(AgentRecord {
            id: agent_id,
            name: "Summarizer".into(),
            description: "Summarizes text".into(),
            prompt: "Summarize.".into(),
            model_id: None,
        });

        let tool_id = Uuid::new_v4();
        store.insert_tool(ToolRecord {
            id: tool_id,
            name: "calculator".into(),
            description: String::new(),
            kind: ToolKind::Builtin,
            config: None,
            agent_id: None,
        });

        let definition = WorkflowDefinition {
            id: Uuid::new_v4(),
            name: "W".into(),
            description: String::new(),
            model_id: None,
            nodes: vec![
                NodeRecord::new("in", NodeKind::Input),
                NodeRecord::new("a1", NodeKind::Agent).with_reference(agent_id),
                NodeRecord::new("t1", NodeKind::Tool).with_reference(tool_id),
                NodeRecord::new("out", NodeKind::Output),
            ],
            edges: vec![EdgeRecord::new("in", "a1"), EdgeRecord::new("a1", "out")],
            last_edited: None,
        };

        let graph = compiler_with(store).compile(&definition).await;

        assert_eq!(graph.agents.len(), 1);
        assert_eq!(graph.agents[0].name(), "Summarizer");
        assert_eq!(graph.capabilities.len(), 1);
        assert_eq!(graph.node_names.get("a1").map(String::as_str), Some("Summarizer"));
        assert_eq!(graph.node_names.get("t1").map(String::as_str), Some("calculator"));
    }

    #[tokio::test]
    async fn test_compile_tolerates_dangling_references() {
        let store = Arc::new(MemoryStore::new());

        let definition = WorkflowDefinition {
            id: Uuid::new_v4(),
            name: "W".into(),
            description: String::new(),
            model_id: None,
            nodes: vec![
                NodeRecord::new("a1", NodeKind::Agent).with_reference(Uuid::new_v4()),
                NodeRecord::new("t1", NodeKind::Tool).with_reference(Uuid::new_v4()),
                NodeRecord::new("a2", NodeKind::Agent),
            ],
            edges: vec![],
            last_edited: None,
        };

        let graph = compiler_with(store).compile(&definition).await;

        assert!(graph.agents.is_empty());
        assert!(graph.capabilities.is_empty());
        assert!(graph.node_names.is_empty());
    }

    #[tokio::test]
    async fn test_workflow_model_flows_to_agents() {
        let store = Arc::new(MemoryStore::new());

        let agent_id = Uuid::new_v4();
        store.insert_agent(AgentRecord {
            id: agent_id,
            name: "A".into(),
            description: String::new(),
            prompt: "p".into(),
            model_id: None,
        });

        let definition = WorkflowDefinition {
            id: Uuid::new_v4(),
            name: "W".into(),
            description: String::new(),
            model_id: Some("workflow-model".into()),
            nodes: vec![NodeRecord::new("a1", NodeKind::Agent).with_reference(agent_id)],
            edges: vec![],
            last_edited: None,
        };

        let graph = compiler_with(store).compile(&definition).await;
        assert_eq!(graph.agents[0].model(), "workflow-model");
    }
}
