use futures::future::BoxFuture;
use serde::Deserialize;

use weft_core::error::{Result, WeftError};
use weft_core::traits::Capability;
use weft_core::types::CapabilityResult;

const MAX_SLEEP_SECS: u64 = 300;

pub struct SleepTool;

#[derive(Deserialize)]
struct SleepInput {
    seconds: u64,
}

impl Capability for SleepTool {
    fn name(&self) -> &str {
        "sleep"
    }

    fn description(&self) -> &str {
        "Pause for a number of seconds (capped at 300)."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "seconds": {
                    "type": "integer",
                    "description": "How long to sleep, in seconds"
                }
            },
            "required": ["seconds"]
        })
    }

    fn invoke(&self, input: serde_json::Value) -> BoxFuture<'_, Result<CapabilityResult>> {
        Box::pin(async move {
            let params: SleepInput = serde_json::from_value(input)
                .map_err(|e| WeftError::CapabilityValidation(e.to_string()))?;

            let seconds = params.seconds.min(MAX_SLEEP_SECS);
            tokio::time::sleep(std::time::Duration::from_secs(seconds)).await;

            Ok(CapabilityResult::success(format!("Slept {}s", seconds)))
        })
    }

    fn timeout_secs(&self) -> u64 {
        MAX_SLEEP_SECS + 10
    }
}
