use serde_json::{Map, Value};

const IMPEE_ID: &str = "impee_id";
const PLAN_ID: &str = "plan_id";
const AGENT_URL: &str = "agent_url";
const CLAIMED_AT: &str = "claimed_at";

/// Identity and connection info of a freshly provisioned device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device_id: String,
    pub plan_id: String,
    pub agent_url: String,
    pub verification_date: String,
}

impl DeviceInfo {
    /// Extract device info from the SDK's raw success payload.
    ///
    /// Returns `None` unless all four fields are present; the device id is trimmed.
    pub fn from_raw(raw: &Map<String, Value>) -> Option<Self> {
        let device_id = string_field(raw, IMPEE_ID).map(|id| id.trim().to_string());
        let plan_id = string_field(raw, PLAN_ID);
        let agent_url = string_field(raw, AGENT_URL);
        let verification_date = string_field(raw, CLAIMED_AT);

        match (device_id, plan_id, agent_url, verification_date) {
            (Some(device_id), Some(plan_id), Some(agent_url), Some(verification_date)) => {
                Some(Self {
                    device_id,
                    plan_id,
                    agent_url,
                    verification_date,
                })
            }
            _ => {
                let missing: Vec<&str> = [IMPEE_ID, PLAN_ID, AGENT_URL, CLAIMED_AT]
                    .into_iter()
                    .filter(|key| string_field(raw, key).is_none())
                    .collect();
                tracing::warn!(missing = ?missing, "Device data incomplete, omitting device info");
                None
            }
        }
    }
}

/// The plan id from a raw success payload, whether or not the rest of the device info is known.
pub fn plan_id_from_raw(raw: &Map<String, Value>) -> Option<String> {
    string_field(raw, PLAN_ID)
}

// Scalars are coerced to text; null, arrays and objects count as missing.
fn string_field(raw: &Map<String, Value>, key: &str) -> Option<String> {
    match raw.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
