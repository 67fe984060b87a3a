use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::debug;

use weft_core::error::{Result, WeftError};
use weft_core::traits::Capability;
use weft_core::types::CapabilityResult;

pub struct FileReadTool;

#[derive(Deserialize)]
struct FileReadInput {
    path: String,
    #[serde(default)]
    offset: Option<usize>,
    #[serde(default)]
    limit: Option<usize>,
}

impl Capability for FileReadTool {
    fn name(&self) -> &str {
        "file_read"
    }

    fn description(&self) -> &str {
        "Read the contents of a file. Supports line offset and limit for large files."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file to read"
                },
                "offset": {
                    "type": "integer",
                    "description": "Line number to start reading from (1-indexed)"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of lines to read (default: 2000)"
                }
            },
            "required": ["path"]
        })
    }

    fn invoke(&self, input: serde_json::Value) -> BoxFuture<'_, Result<CapabilityResult>> {
        Box::pin(async move {
            let params: FileReadInput = serde_json::from_value(input)
                .map_err(|e| WeftError::CapabilityValidation(e.to_string()))?;

            debug!(path = %params.path, "Reading file");

            let content = match tokio::fs::read_to_string(&params.path).await {
                Ok(content) => content,
                Err(e) => {
                    return Ok(CapabilityResult::error(format!(
                        "{}: {}",
                        params.path, e
                    )))
                }
            };

            let lines: Vec<&str> = content.lines().collect();
            let total = lines.len();
            let offset = params.offset.unwrap_or(1).max(1) - 1;
            let limit = params.limit.unwrap_or(2000);
            let end = (offset + limit).min(total);

            let mut output = String::new();
            for (i, line) in lines[offset.min(total)..end].iter().enumerate() {
                output.push_str(&format!("{:>6}\t{}\n", offset + i + 1, line));
            }
            if output.is_empty() {
                output = "(empty file)".to_string();
            }

            Ok(CapabilityResult::success(output))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_read_with_offset_and_limit() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "one\ntwo\nthree\nfour").unwrap();

        let input = serde_json::json!({
            "path": file.path().to_str().unwrap(),
            "offset": 2,
            "limit": 2,
        });
        let result = FileReadTool.invoke(input).await.unwrap();
        assert!(!result.is_error);
        assert!(result.content.contains("two"));
        assert!(result.content.contains("three"));
        assert!(!result.content.contains("four"));
    }

    #[tokio::test]
    async fn test_missing_file_is_soft_error() {
        let input = serde_json::json!({"path": "/nonexistent/weft-test"});
        let result = FileReadTool.invoke(input).await.unwrap();
        assert!(result.is_error);
    }
}
