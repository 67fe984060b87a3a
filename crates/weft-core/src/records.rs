use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted workflow definition: a directed graph of nodes and edges.
///
/// Immutable once compiled into a session; the persisted copy may keep
/// changing independently, tracked via `last_edited`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Default model for agents that carry no override of their own.
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
    #[serde(default)]
    pub last_edited: Option<DateTime<Utc>>,
}

/// Kind of a workflow node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Input,
    Output,
    Agent,
    Tool,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
            Self::Agent => "agent",
            Self::Tool => "tool",
        }
    }
}

/// Authoring-time canvas position. Not used by execution.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A node in a workflow graph.
///
/// Agent/tool nodes carry a reference to the backing record; input/output
/// nodes never resolve to a capability and only anchor the routing narrative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub reference: Option<Uuid>,
    #[serde(default)]
    pub position: Position,
}

impl NodeRecord {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
            reference: None,
            position: Position::default(),
        }
    }

    pub fn with_reference(mut self, reference: Uuid) -> Self {
        self.reference = Some(reference);
        self
    }
}

/// A directed edge between two node ids. Cycles are permitted; routing is
/// delegated to the orchestrating agent, not a graph walker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
}

impl EdgeRecord {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Persisted agent definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// System prompt / role instructions.
    pub prompt: String,
    #[serde(default)]
    pub model_id: Option<String>,
}

/// Kind of a persisted tool record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    /// Name lookup against the fixed builtin registry.
    Builtin,
    /// External-process capability server over stdio.
    Mcp,
    /// A nested agent exposed as a single capability.
    Agent,
}

/// Persisted tool definition. The meaning of `config` depends on `kind`;
/// for MCP it is free-form text nominally holding a launch descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRecord {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub kind: ToolKind,
    #[serde(default)]
    pub config: Option<String>,
    /// Referenced agent when kind is `Agent`.
    #[serde(default)]
    pub agent_id: Option<Uuid>,
}
