use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::debug;

use weft_core::error::{Result, WeftError};
use weft_core::traits::Capability;
use weft_core::types::CapabilityResult;

pub struct FileWriteTool;

#[derive(Deserialize)]
struct FileWriteInput {
    path: String,
    content: String,
    #[serde(default)]
    append: bool,
}

impl Capability for FileWriteTool {
    fn name(&self) -> &str {
        "file_write"
    }

    fn description(&self) -> &str {
        "Write content to a file, creating parent directories as needed."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file to write"
                },
                "content": {
                    "type": "string",
                    "description": "Content to write"
                },
                "append": {
                    "type": "boolean",
                    "description": "Append instead of overwrite (default: false)"
                }
            },
            "required": ["path", "content"]
        })
    }

    fn invoke(&self, input: serde_json::Value) -> BoxFuture<'_, Result<CapabilityResult>> {
        Box::pin(async move {
            let params: FileWriteInput = serde_json::from_value(input)
                .map_err(|e| WeftError::CapabilityValidation(e.to_string()))?;

            if let Some(parent) = std::path::Path::new(&params.path).parent() {
                if !parent.as_os_str().is_empty() {
                    if let Err(e) = tokio::fs::create_dir_all(parent).await {
                        return Ok(CapabilityResult::error(format!(
                            "create {}: {}",
                            parent.display(),
                            e
                        )));
                    }
                }
            }

            debug!(path = %params.path, append = params.append, "Writing file");

            let outcome = if params.append {
                use tokio::io::AsyncWriteExt;
                match tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&params.path)
                    .await
                {
                    Ok(mut file) => file.write_all(params.content.as_bytes()).await,
                    Err(e) => Err(e),
                }
            } else {
                tokio::fs::write(&params.path, &params.content).await
            };

            match outcome {
                Ok(()) => Ok(CapabilityResult::success(format!(
                    "Wrote {} bytes to {}",
                    params.content.len(),
                    params.path
                ))),
                Err(e) => Ok(CapabilityResult::error(format!("{}: {}", params.path, e))),
            }
        })
    }
}
