//! Provisioning result envelopes.
//!
//! A [`ProvisioningOutcome`] is the in-memory form of one result; an [`Envelope`] wraps it
//! together with the channel keep-open decision and converts it to and from the wire JSON.

pub mod codes;
pub mod device;
mod wire;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};
pub use device::DeviceInfo;
use wire::{WireDeviceInfo, WireEnvelope, WireError};

/// Error code reported for every SDK-classified failure, timeouts included.
pub const SDK_ERROR_CODE: i32 = 1;

/// Message reported when the device-info request does not finish in time.
pub const TIMEOUT_MESSAGE: &str = "Could not gather device info. Process timed out.";

/// Status code carried by `started` envelopes, which have no status of their own.
pub const STARTED_STATUS_CODE: i32 = 0;

/// Lifecycle state of a provisioning attempt as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvisioningState {
    Started,
    Completed,
    Error,
}

impl ProvisioningState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisioningState::Started => "started",
            ProvisioningState::Completed => "completed",
            ProvisioningState::Error => "error",
        }
    }
}

impl std::fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who reported an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The vendor SDK failed or timed out.
    Sdk,
    /// The bridge itself failed; carries no message.
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningOutcome {
    /// Progress ping; the caller should expect more results.
    Started { status: Option<String> },
    /// Provisioning finished. `device_info` is present only when every field was known.
    Completed {
        status_code: i32,
        device_info: Option<DeviceInfo>,
    },
    Error(ProvisioningError),
}

/// A failed attempt. SDK errors always carry a message; internal errors never do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningError {
    Sdk { code: i32, message: String },
    Internal { code: i32 },
}

impl ProvisioningError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProvisioningError::Sdk { .. } => ErrorKind::Sdk,
            ProvisioningError::Internal { .. } => ErrorKind::Internal,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            ProvisioningError::Sdk { code, .. } | ProvisioningError::Internal { code } => *code,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ProvisioningError::Sdk { message, .. } => Some(message),
            ProvisioningError::Internal { .. } => None,
        }
    }
}

impl ProvisioningOutcome {
    pub fn sdk_error(message: impl Into<String>) -> Self {
        ProvisioningOutcome::Error(ProvisioningError::Sdk {
            code: SDK_ERROR_CODE,
            message: message.into(),
        })
    }

    pub fn internal_error(code: i32) -> Self {
        ProvisioningOutcome::Error(ProvisioningError::Internal { code })
    }

    pub fn state(&self) -> ProvisioningState {
        match self {
            ProvisioningOutcome::Started { .. } => ProvisioningState::Started,
            ProvisioningOutcome::Completed { .. } => ProvisioningState::Completed,
            ProvisioningOutcome::Error { .. } => ProvisioningState::Error,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProvisioningOutcome::Started { .. })
    }
}

/// A serializable provisioning result, ready for the callback channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    outcome: ProvisioningOutcome,
}

impl Envelope {
    pub fn new(outcome: ProvisioningOutcome) -> Self {
        Self { outcome }
    }

    pub fn outcome(&self) -> &ProvisioningOutcome {
        &self.outcome
    }

    pub fn into_outcome(self) -> ProvisioningOutcome {
        self.outcome
    }

    pub fn state(&self) -> ProvisioningState {
        self.outcome.state()
    }

    /// Whether the channel must stay open after this envelope is sent.
    pub fn keep_open(&self) -> bool {
        !self.outcome.is_terminal()
    }

    pub fn device_info(&self) -> Option<&DeviceInfo> {
        match &self.outcome {
            ProvisioningOutcome::Completed { device_info, .. } => device_info.as_ref(),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_wire())?)
    }

    pub fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self.to_wire())?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let wire: WireEnvelope = serde_json::from_str(json)?;
        Self::from_wire(wire)
    }

    fn to_wire(&self) -> WireEnvelope {
        match &self.outcome {
            ProvisioningOutcome::Started { status } => WireEnvelope {
                state: ProvisioningState::Started,
                status_code: Some(STARTED_STATUS_CODE.to_string()),
                status: status.clone(),
                error: None,
                device_info: None,
            },
            ProvisioningOutcome::Completed {
                status_code,
                device_info,
            } => WireEnvelope {
                state: ProvisioningState::Completed,
                status_code: Some(status_code.to_string()),
                status: None,
                error: None,
                device_info: device_info.as_ref().map(WireDeviceInfo::from),
            },
            ProvisioningOutcome::Error(error) => WireEnvelope {
                state: ProvisioningState::Error,
                status_code: None,
                status: None,
                error: Some(WireError {
                    error_code: error.code().to_string(),
                    error_msg: error.message().map(str::to_string),
                }),
                device_info: None,
            },
        }
    }

    fn from_wire(wire: WireEnvelope) -> Result<Self> {
        let outcome = match wire.state {
            ProvisioningState::Started => ProvisioningOutcome::Started {
                status: wire.status,
            },
            ProvisioningState::Completed => {
                let status_code = wire.status_code.ok_or_else(|| {
                    BridgeError::Envelope("completed envelope without statusCode".to_string())
                })?;
                ProvisioningOutcome::Completed {
                    status_code: parse_code("statusCode", &status_code)?,
                    device_info: wire.device_info.map(DeviceInfo::from),
                }
            }
            ProvisioningState::Error => {
                let error = wire.error.ok_or_else(|| {
                    BridgeError::Envelope("error envelope without error object".to_string())
                })?;
                let code = parse_code("errorCode", &error.error_code)?;
                match error.error_msg {
                    Some(message) => {
                        ProvisioningOutcome::Error(ProvisioningError::Sdk { code, message })
                    }
                    None => ProvisioningOutcome::internal_error(code),
                }
            }
        };

        Ok(Self { outcome })
    }
}

fn parse_code(field: &str, value: &str) -> Result<i32> {
    value
        .parse()
        .map_err(|_| BridgeError::Envelope(format!("{field} is not an integer: {value:?}")))
}
