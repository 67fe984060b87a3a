use std::collections::HashMap;

use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::debug;

use weft_core::error::{Result, WeftError};
use weft_core::traits::Capability;
use weft_core::types::CapabilityResult;

const MAX_BODY_BYTES: usize = 256 * 1024;

pub struct HttpRequestTool;

#[derive(Deserialize)]
struct HttpRequestInput {
    url: String,
    #[serde(default = "default_method")]
    method: String,
    #[serde(default)]
    headers: HashMap<String, String>,
    #[serde(default)]
    body: Option<String>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl Capability for HttpRequestTool {
    fn name(&self) -> &str {
        "http_request"
    }

    fn description(&self) -> &str {
        "Make an HTTP request and return the status and response body."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to request"
                },
                "method": {
                    "type": "string",
                    "description": "HTTP method (default: GET)"
                },
                "headers": {
                    "type": "object",
                    "description": "Request headers as string key/value pairs"
                },
                "body": {
                    "type": "string",
                    "description": "Request body"
                }
            },
            "required": ["url"]
        })
    }

    fn invoke(&self, input: serde_json::Value) -> BoxFuture<'_, Result<CapabilityResult>> {
        Box::pin(async move {
            let params: HttpRequestInput = serde_json::from_value(input)
                .map_err(|e| WeftError::CapabilityValidation(e.to_string()))?;

            let method = match params.method.to_uppercase().parse::<reqwest::Method>() {
                Ok(m) => m,
                Err(_) => {
                    return Ok(CapabilityResult::error(format!(
                        "invalid method: {}",
                        params.method
                    )))
                }
            };

            debug!(url = %params.url, method = %method, "HTTP request");

            let client = reqwest::Client::new();
            let mut request = client.request(method, &params.url);
            for (key, value) in &params.headers {
                request = request.header(key, value);
            }
            if let Some(body) = params.body {
                request = request.body(body);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => return Ok(CapabilityResult::error(e.to_string())),
            };

            let status = response.status();
            let mut body = match response.text().await {
                Ok(body) => body,
                Err(e) => return Ok(CapabilityResult::error(e.to_string())),
            };
            if body.len() > MAX_BODY_BYTES {
                let mut cut = MAX_BODY_BYTES;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
                body.push_str("\n[body truncated]");
            }

            let content = format!("HTTP {}\n{}", status.as_u16(), body);
            if status.is_success() {
                Ok(CapabilityResult::success(content))
            } else {
                Ok(CapabilityResult::error(content))
            }
        })
    }

    fn timeout_secs(&self) -> u64 {
        60
    }
}
