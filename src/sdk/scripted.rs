use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{ProvisioningSdk, SdkResponse};
use crate::error::{BridgeError, Result};

/// What a [`ScriptedSdk`] answers with.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Script {
    /// Succeed with `device` serialized as the raw payload.
    Success { device: Value },
    /// Succeed with a raw payload passed through verbatim, valid JSON or not.
    SuccessText { body: String },
    Error { message: String },
    Timeout,
}

/// A [`ProvisioningSdk`] that replays a fixed answer after an optional delay.
///
/// Stands in for the vendor SDK on hosts where it is not available, e.g.
///
/// ```json
/// {"outcome": "success", "delay_ms": 250, "device": {"impee_id": "abc", "plan_id": "P1",
///  "agent_url": "https://agent.example", "claimed_at": "2020-01-01T00:00:00Z"}}
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptedSdk {
    #[serde(flatten)]
    script: Script,
    #[serde(default)]
    delay_ms: u64,
}

impl ScriptedSdk {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            delay_ms: 0,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_ms = saturating_millis(delay);
        self
    }

    pub async fn from_file(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            BridgeError::Sdk(format!("Failed to read script {}: {e}", path.display()))
        })?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl ProvisioningSdk for ScriptedSdk {
    async fn get_device_info(&self, timeout: Duration) -> SdkResponse {
        tracing::debug!(
            delay_ms = self.delay_ms,
            timeout_ms = saturating_millis(timeout),
            "Scripted SDK request"
        );

        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }

        match &self.script {
            Script::Success { device } => SdkResponse::Success(device.to_string()),
            Script::SuccessText { body } => SdkResponse::Success(body.clone()),
            Script::Error { message } => SdkResponse::Error(message.clone()),
            Script::Timeout => SdkResponse::Timeout,
        }
    }
}

fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
