use serde::{Deserialize, Serialize};

use super::{DeviceInfo, ProvisioningState};

/// JSON shape sent over the callback channel. Integers are string-encoded.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct WireEnvelope {
    pub state: ProvisioningState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_info: Option<WireDeviceInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct WireError {
    pub error_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct WireDeviceInfo {
    pub device_id: String,
    pub plan_id: String,
    #[serde(rename = "agentURL")]
    pub agent_url: String,
    pub verification_date: String,
}

impl From<&DeviceInfo> for WireDeviceInfo {
    fn from(info: &DeviceInfo) -> Self {
        Self {
            device_id: info.device_id.clone(),
            plan_id: info.plan_id.clone(),
            agent_url: info.agent_url.clone(),
            verification_date: info.verification_date.clone(),
        }
    }
}

impl From<WireDeviceInfo> for DeviceInfo {
    fn from(wire: WireDeviceInfo) -> Self {
        Self {
            device_id: wire.device_id,
            plan_id: wire.plan_id,
            agent_url: wire.agent_url,
            verification_date: wire.verification_date,
        }
    }
}
