use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeftError {
    // Lookup errors
    #[error("Workflow not found: {0}")]
    WorkflowNotFound(uuid::Uuid),

    #[error("Agent not found: {0}")]
    AgentNotFound(uuid::Uuid),

    // Session errors
    #[error("No active session for id: {0}")]
    NoActiveSession(String),

    #[error("Workflow {workflow_id} was edited after session {session_id} was compiled")]
    StaleSession {
        session_id: String,
        workflow_id: uuid::Uuid,
    },

    // Capability errors
    #[error("Capability not found: {0}")]
    CapabilityNotFound(String),

    #[error("Capability execution failed: {capability}: {message}")]
    CapabilityExecution { capability: String, message: String },

    #[error("Capability timeout after {timeout_secs}s: {capability}")]
    CapabilityTimeout {
        capability: String,
        timeout_secs: u64,
    },

    #[error("Capability input validation failed: {0}")]
    CapabilityValidation(String),

    // Provider errors (external-process capability servers)
    #[error("Provider error: {0}")]
    Provider(String),

    // LLM errors
    #[error("LLM request failed: {0}")]
    LlmRequest(String),

    #[error("LLM streaming error: {0}")]
    LlmStream(String),

    // Agent errors
    #[error("Agent exceeded max turns ({0})")]
    MaxTurnsExceeded(usize),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WeftError>;
