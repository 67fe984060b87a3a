use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::debug;

use rmcp::model::Tool as McpTool;

use weft_core::error::Result;
use weft_core::traits::Capability;
use weft_core::types::CapabilityResult;

use crate::StdioProvider;

/// A capability bridged to a tool exposed by a spawned provider. Provider
/// failures surface as error-flagged results, not errors, so one broken
/// provider tool cannot abort an agent turn.
pub struct ProviderCapability {
    tool_name: String,
    description: String,
    schema: serde_json::Value,
    provider: Arc<StdioProvider>,
    timeout: u64,
}

impl Capability for ProviderCapability {
    fn name(&self) -> &str {
        &self.tool_name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> serde_json::Value {
        self.schema.clone()
    }

    fn invoke(&self, input: serde_json::Value) -> BoxFuture<'_, Result<CapabilityResult>> {
        Box::pin(async move {
            let arguments = input.as_object().cloned();

            debug!(tool = %self.tool_name, "Calling provider capability");

            match self.provider.call(&self.tool_name, arguments).await {
                Ok(content) => Ok(CapabilityResult::success(content)),
                Err(e) => Ok(CapabilityResult::error(e.to_string())),
            }
        })
    }

    fn timeout_secs(&self) -> u64 {
        self.timeout
    }
}

/// Whether the author switched this tool name off for its provider.
pub fn is_disabled(name: &str, disabled: &[String]) -> bool {
    disabled.iter().any(|d| d == name)
}

/// Bridge every enumerated provider tool into a capability, skipping names
/// the author disabled.
pub fn bridge_capabilities(
    provider: &Arc<StdioProvider>,
    tools: &[McpTool],
    disabled: &[String],
    timeout_secs: u64,
) -> Vec<Arc<dyn Capability>> {
    tools
        .iter()
        .filter(|tool| !is_disabled(tool.name.as_ref(), disabled))
        .map(|tool| {
            let description = tool
                .description
                .as_ref()
                .map(|d| d.to_string())
                .unwrap_or_else(|| format!("Provider tool: {}", tool.name));

            let schema = serde_json::to_value(&*tool.input_schema)
                .unwrap_or(serde_json::json!({"type": "object"}));

            debug!(name = %tool.name, "Bridged provider capability");

            Arc::new(ProviderCapability {
                tool_name: tool.name.to_string(),
                description,
                schema,
                provider: provider.clone(),
                timeout: timeout_secs,
            }) as Arc<dyn Capability>
        })
        .collect()
}
