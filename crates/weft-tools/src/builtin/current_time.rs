use futures::future::BoxFuture;
use serde::Deserialize;

use weft_core::error::Result;
use weft_core::traits::Capability;
use weft_core::types::CapabilityResult;

pub struct CurrentTimeTool;

#[derive(Deserialize)]
struct CurrentTimeInput {
    #[serde(default)]
    timezone: Option<String>,
}

impl Capability for CurrentTimeTool {
    fn name(&self) -> &str {
        "current_time"
    }

    fn description(&self) -> &str {
        "Get the current date and time in RFC 3339 format. Defaults to UTC."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "timezone": {
                    "type": "string",
                    "description": "Either 'utc' or 'local' (default: utc)"
                }
            }
        })
    }

    fn invoke(&self, input: serde_json::Value) -> BoxFuture<'_, Result<CapabilityResult>> {
        Box::pin(async move {
            let params: CurrentTimeInput =
                serde_json::from_value(input).unwrap_or(CurrentTimeInput { timezone: None });

            let now = match params.timezone.as_deref() {
                Some("local") => chrono::Local::now().to_rfc3339(),
                _ => chrono::Utc::now().to_rfc3339(),
            };

            Ok(CapabilityResult::success(now))
        })
    }

    fn timeout_secs(&self) -> u64 {
        5
    }
}
