use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::{debug, warn};

use weft_config::{locate_launch, parse_config};
use weft_core::config::RuntimeConfig;
use weft_core::error::Result;
use weft_core::records::{AgentRecord, ToolKind, ToolRecord};
use weft_core::traits::{Capability, DefinitionStore, LlmClient};
use weft_mcp::{bridge_capabilities, StdioProvider};
use weft_tools::BuiltinKind;

use crate::agent::Agent;
use crate::orchestrator::AgentCapability;

/// Turns persisted tool records into invocable capability handles.
///
/// Every arm degrades softly: an unknown builtin name, an unresolvable
/// record reference, or a provider that fails to start all yield an empty
/// capability list with a warning, never an error; partial compilation of
/// the surrounding graph is expected and tolerated.
pub struct CapabilityFactory {
    store: Arc<dyn DefinitionStore>,
    llm: Arc<dyn LlmClient>,
    config: RuntimeConfig,
}

impl CapabilityFactory {
    pub fn new(
        store: Arc<dyn DefinitionStore>,
        llm: Arc<dyn LlmClient>,
        config: RuntimeConfig,
    ) -> Self {
        Self { store, llm, config }
    }

    /// Build the capabilities for one tool record. Boxed because the
    /// nested-agent arm recurses through `compile_agent`.
    pub fn build<'a>(
        &'a self,
        record: &'a ToolRecord,
    ) -> BoxFuture<'a, Vec<Arc<dyn Capability>>> {
        Box::pin(async move {
            match record.kind {
                ToolKind::Builtin => self.build_builtin(record),
                ToolKind::Mcp => match self.build_provider(record).await {
                    Ok(capabilities) => capabilities,
                    Err(e) => {
                        warn!(tool = %record.name, error = %e, "Capability provider failed; skipping tool");
                        Vec::new()
                    }
                },
                ToolKind::Agent => self.build_nested_agent(record).await,
            }
        })
    }

    fn build_builtin(&self, record: &ToolRecord) -> Vec<Arc<dyn Capability>> {
        match BuiltinKind::from_name(&record.name).instantiate() {
            Some(capability) => vec![capability],
            None => {
                warn!(tool = %record.name, "Unknown builtin capability");
                Vec::new()
            }
        }
    }

    async fn build_provider(&self, record: &ToolRecord) -> Result<Vec<Arc<dyn Capability>>> {
        let config = parse_config(record.config.as_deref());
        let config = serde_json::Value::Object(config);

        // The locator checks the current level first, so a direct `command`
        // key wins before any wrapper format is searched.
        let Some(spec) = locate_launch(&config) else {
            warn!(tool = %record.name, "No launch command in provider config");
            return Ok(Vec::new());
        };

        debug!(
            tool = %record.name,
            command = %spec.command,
            args = ?spec.args,
            "Starting capability provider"
        );

        let startup = Duration::from_secs(self.config.provider_startup_timeout_secs);
        let provider = StdioProvider::spawn(&record.name, &spec, startup).await?;
        let tools = provider.list_capabilities(startup).await?;
        let provider = Arc::new(provider);

        Ok(bridge_capabilities(
            &provider,
            &tools,
            &spec.disabled,
            self.config.capability_timeout_secs,
        ))
    }

    async fn build_nested_agent(&self, record: &ToolRecord) -> Vec<Arc<dyn Capability>> {
        let Some(agent_id) = record.agent_id else {
            warn!(tool = %record.name, "Nested-agent tool has no agent reference");
            return Vec::new();
        };

        let agent_record = match self.store.agent(agent_id).await {
            Ok(Some(agent_record)) => agent_record,
            Ok(None) => {
                warn!(tool = %record.name, agent_id = %agent_id, "Referenced agent not found");
                return Vec::new();
            }
            Err(e) => {
                warn!(tool = %record.name, error = %e, "Agent lookup failed");
                return Vec::new();
            }
        };

        let agent = self.compile_agent(&agent_record, None).await;
        vec![Arc::new(AgentCapability::new(
            agent,
            &record.name,
            &record.description,
        ))]
    }

    /// Compile a persisted agent record into a model-backed agent: resolve
    /// its attached tools through this factory, flatten the capability set,
    /// and bind the model via override → workflow default → global default.
    pub fn compile_agent<'a>(
        &'a self,
        record: &'a AgentRecord,
        default_model: Option<&'a str>,
    ) -> BoxFuture<'a, Arc<Agent>> {
        Box::pin(async move {
            let tool_records = match self.store.agent_tools(record.id).await {
                Ok(tool_records) => tool_records,
                Err(e) => {
                    warn!(agent = %record.name, error = %e, "Tool association lookup failed");
                    Vec::new()
                }
            };

            let mut capabilities = Vec::new();
            for tool_record in &tool_records {
                capabilities.extend(self.build(tool_record).await);
            }

            let model_id = record
                .model_id
                .clone()
                .or_else(|| default_model.map(String::from))
                .unwrap_or_else(|| self.config.default_model.clone());
            let model = self.llm.resolve_model(&model_id);

            debug!(
                agent = %record.name,
                model = %model,
                capabilities = capabilities.len(),
                "Compiled agent"
            );

            Arc::new(Agent::new(
                record.name.clone(),
                record.description.clone(),
                record.prompt.clone(),
                model,
                capabilities,
                self.llm.clone(),
                self.config.max_turns,
            ))
        })
    }
}
