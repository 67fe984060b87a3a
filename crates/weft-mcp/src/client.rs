use std::time::Duration;

use tracing::{debug, info};

use rmcp::model::{CallToolRequestParams, RawContent, Tool as McpTool};
use rmcp::service::RunningService;
use rmcp::{RoleClient, ServiceExt};

use weft_config::LaunchSpec;
use weft_core::error::{Result, WeftError};

use crate::handler::WeftClientHandler;

/// A subprocess-backed capability provider, spoken to over stdin/stdout.
///
/// The provider owns the child process: dropping it (or calling `shutdown`)
/// closes the transport and reaps the subprocess.
pub struct StdioProvider {
    name: String,
    client: RunningService<RoleClient, WeftClientHandler>,
}

impl StdioProvider {
    /// Spawn the provider process and complete the protocol handshake.
    /// The whole startup is bounded by `startup_timeout`.
    pub async fn spawn(
        name: &str,
        spec: &LaunchSpec,
        startup_timeout: Duration,
    ) -> Result<Self> {
        let mut cmd = tokio::process::Command::new(&spec.command);
        cmd.args(&spec.args);
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }

        let transport = rmcp::transport::TokioChildProcess::new(cmd)
            .map_err(|e| WeftError::Provider(format!("Failed to spawn {}: {}", spec.command, e)))?;

        let handler = WeftClientHandler::new(name);
        let client = tokio::time::timeout(startup_timeout, handler.serve(transport))
            .await
            .map_err(|_| {
                WeftError::Provider(format!(
                    "Provider '{}' did not initialize within {}s",
                    name,
                    startup_timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                WeftError::Provider(format!("Failed to initialize provider '{}': {}", name, e))
            })?;

        info!(provider = %name, command = %spec.command, "Capability provider started");

        Ok(Self {
            name: name.to_string(),
            client,
        })
    }

    /// Enumerate every tool the provider exposes, bounded by `timeout`.
    pub async fn list_capabilities(&self, timeout: Duration) -> Result<Vec<McpTool>> {
        let tools = tokio::time::timeout(timeout, self.client.list_all_tools())
            .await
            .map_err(|_| {
                WeftError::Provider(format!(
                    "Provider '{}' did not enumerate tools within {}s",
                    self.name,
                    timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                WeftError::Provider(format!(
                    "Failed to list tools from '{}': {}",
                    self.name, e
                ))
            })?;

        debug!(provider = %self.name, count = tools.len(), "Enumerated provider capabilities");
        Ok(tools)
    }

    /// Call one tool on the provider and return its text content.
    pub async fn call(
        &self,
        tool_name: &str,
        arguments: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<String> {
        let params = CallToolRequestParams {
            name: tool_name.to_string().into(),
            arguments,
            meta: None,
            task: None,
        };

        let result = self.client.call_tool(params).await.map_err(|e| {
            WeftError::Provider(format!(
                "Tool call '{}.{}' failed: {}",
                self.name, tool_name, e
            ))
        })?;

        let content: Vec<String> = result
            .content
            .iter()
            .map(|c| match c.raw {
                RawContent::Text(ref t) => t.text.to_string(),
                _ => format!("{:?}", c.raw),
            })
            .collect();

        Ok(content.join("\n"))
    }

    /// Close the transport and terminate the provider process.
    pub async fn shutdown(mut self) {
        let name = self.name;
        let _ = self.client.close().await;
        info!(provider = %name, "Capability provider stopped");
    }
}
