pub mod scripted;

use std::time::Duration;

use async_trait::async_trait;

/// The single completion signal of a device-info request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkResponse {
    /// Raw JSON text describing the provisioned device.
    Success(String),
    Error(String),
    Timeout,
}

/// Vendor provisioning SDK, as seen by the bridge.
#[async_trait]
pub trait ProvisioningSdk: Send + Sync {
    /// Ask the provisioning server for the device that was just configured.
    ///
    /// Resolves exactly once. The SDK is expected to honour `timeout` itself; callers still
    /// bound the call in case it does not.
    async fn get_device_info(&self, timeout: Duration) -> SdkResponse;
}
