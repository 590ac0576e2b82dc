use serde_json::Value;

use crate::envelope::{codes, DeviceInfo, Envelope, ProvisioningOutcome, TIMEOUT_MESSAGE};

/// Where a provisioning attempt currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderState {
    Idle,
    Started,
    /// A terminal envelope has been produced. Absorbing.
    Terminal,
}

/// Turns raw SDK callback data into envelopes for a single provisioning attempt.
///
/// `mark_started` may be called any number of times before the terminal call and yields
/// nothing after it. Exactly one
/// terminal call (`mark_completed`, `mark_plugin_error`, `mark_sdk_error`, `mark_timeout`) is
/// valid per attempt: a second one panics in debug builds and is logged and ignored otherwise.
#[derive(Debug)]
pub struct ProvisioningResultBuilder {
    state: BuilderState,
}

impl Default for ProvisioningResultBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProvisioningResultBuilder {
    pub fn new() -> Self {
        Self {
            state: BuilderState::Idle,
        }
    }

    pub fn state(&self) -> BuilderState {
        self.state
    }

    pub fn mark_started(&mut self, status_message: &str) -> Option<Envelope> {
        if self.state == BuilderState::Terminal {
            tracing::warn!(
                status = status_message,
                "Ignoring progress, attempt already finished"
            );
            return None;
        }
        self.state = BuilderState::Started;

        tracing::debug!(status = status_message, "Provisioning started");

        let status = if status_message.is_empty() {
            None
        } else {
            Some(status_message.to_string())
        };
        Some(Envelope::new(ProvisioningOutcome::Started { status }))
    }

    /// `raw_device_data` is the SDK's success payload. A missing or incomplete payload still
    /// completes, without device info; a payload that is not a JSON object is reported as
    /// [`codes::MALFORMED_DEVICE_DATA`].
    pub fn mark_completed(
        &mut self,
        status_code: i32,
        raw_device_data: Option<&Value>,
    ) -> Option<Envelope> {
        let outcome = match raw_device_data {
            None | Some(Value::Null) => ProvisioningOutcome::Completed {
                status_code,
                device_info: None,
            },
            Some(Value::Object(raw)) => ProvisioningOutcome::Completed {
                status_code,
                device_info: DeviceInfo::from_raw(raw),
            },
            Some(other) => {
                tracing::error!(
                    kind = json_kind(other),
                    "Device data is not a key-value map"
                );
                ProvisioningOutcome::internal_error(codes::MALFORMED_DEVICE_DATA)
            }
        };

        self.finish(outcome)
    }

    pub fn mark_plugin_error(&mut self, error_code: i32) -> Option<Envelope> {
        self.finish(ProvisioningOutcome::internal_error(error_code))
    }

    pub fn mark_sdk_error(&mut self, message: &str) -> Option<Envelope> {
        self.finish(ProvisioningOutcome::sdk_error(message))
    }

    pub fn mark_timeout(&mut self) -> Option<Envelope> {
        self.mark_sdk_error(TIMEOUT_MESSAGE)
    }

    fn finish(&mut self, outcome: ProvisioningOutcome) -> Option<Envelope> {
        debug_assert!(
            self.state != BuilderState::Terminal,
            "second terminal result for one provisioning attempt"
        );

        if self.state == BuilderState::Terminal {
            tracing::error!(
                state = %outcome.state(),
                "Ignoring terminal result, attempt already finished"
            );
            return None;
        }

        self.state = BuilderState::Terminal;
        tracing::info!(state = %outcome.state(), "Provisioning finished");
        Some(Envelope::new(outcome))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
