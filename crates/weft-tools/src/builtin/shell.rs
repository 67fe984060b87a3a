use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::debug;

use weft_core::error::{Result, WeftError};
use weft_core::traits::Capability;
use weft_core::types::CapabilityResult;

const MAX_OUTPUT_BYTES: usize = 64 * 1024;

pub struct ShellTool;

#[derive(Deserialize)]
struct ShellInput {
    command: String,
    #[serde(default)]
    working_dir: Option<String>,
}

impl Capability for ShellTool {
    fn name(&self) -> &str {
        "shell"
    }

    fn description(&self) -> &str {
        "Run a shell command and return its combined output and exit status."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The command to run via sh -c"
                },
                "working_dir": {
                    "type": "string",
                    "description": "Directory to run in (default: current)"
                }
            },
            "required": ["command"]
        })
    }

    fn invoke(&self, input: serde_json::Value) -> BoxFuture<'_, Result<CapabilityResult>> {
        Box::pin(async move {
            let params: ShellInput = serde_json::from_value(input)
                .map_err(|e| WeftError::CapabilityValidation(e.to_string()))?;

            debug!(command = %params.command, "Running shell command");

            let mut cmd = tokio::process::Command::new("sh");
            cmd.arg("-c").arg(&params.command);
            if let Some(ref dir) = params.working_dir {
                cmd.current_dir(dir);
            }

            let output = match cmd.output().await {
                Ok(output) => output,
                Err(e) => return Ok(CapabilityResult::error(format!("spawn failed: {}", e))),
            };

            let mut combined = String::new();
            combined.push_str(&String::from_utf8_lossy(&output.stdout));
            if !output.stderr.is_empty() {
                combined.push_str(&String::from_utf8_lossy(&output.stderr));
            }
            if combined.len() > MAX_OUTPUT_BYTES {
                let mut cut = MAX_OUTPUT_BYTES;
                while !combined.is_char_boundary(cut) {
                    cut -= 1;
                }
                combined.truncate(cut);
                combined.push_str("\n[output truncated]");
            }

            if output.status.success() {
                Ok(CapabilityResult::success(combined))
            } else {
                let code = output.status.code().unwrap_or(-1);
                Ok(CapabilityResult::error(format!(
                    "exit code {}\n{}",
                    code, combined
                )))
            }
        })
    }

    fn timeout_secs(&self) -> u64 {
        120
    }
}
