use serde::{Deserialize, Serialize};

/// Runtime configuration shared across compilation and delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Model used when neither the agent nor the workflow specify one.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Maximum tool-use turns per agent run.
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Startup budget for an external-process capability provider: spawn
    /// plus capability enumeration must finish within this window, or the
    /// tool degrades to an empty capability list.
    #[serde(default = "default_provider_startup_timeout")]
    pub provider_startup_timeout_secs: u64,

    /// Default timeout for one bridged capability invocation.
    #[serde(default = "default_capability_timeout")]
    pub capability_timeout_secs: u64,
}

fn default_model() -> String {
    "anthropic.claude-3-7-sonnet-20250219-v1:0".to_string()
}

fn default_max_turns() -> usize {
    20
}

fn default_provider_startup_timeout() -> u64 {
    30
}

fn default_capability_timeout() -> u64 {
    120
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            max_turns: default_max_turns(),
            provider_startup_timeout_secs: default_provider_startup_timeout(),
            capability_timeout_secs: default_capability_timeout(),
        }
    }
}
