use serde_json::Value;

use crate::builder::ProvisioningResultBuilder;
use crate::channel::{deliver, CallbackChannel};
use crate::config::ProvisioningConfig;
use crate::envelope::{codes, device, Envelope, ProvisioningState};
use crate::error::{BridgeError, Result};
use crate::sdk::{ProvisioningSdk, SdkResponse};
use crate::store::PlanIdStore;

/// Run one provisioning attempt end to end.
///
/// Sends a `started` envelope, asks the SDK for the device info bounded by the configured
/// timeout, caches the plan id on success (even when the rest of the device info is
/// incomplete), and sends the terminal envelope. Returns the terminal envelope. Only collaborator failures on the channel surface as errors; SDK
/// failures and bad device data are reported through the envelope.
pub async fn run_provisioning(
    sdk: &dyn ProvisioningSdk,
    channel: &dyn CallbackChannel,
    store: &dyn PlanIdStore,
    config: &ProvisioningConfig,
) -> Result<Envelope> {
    let mut builder = ProvisioningResultBuilder::new();

    if config.timeout_ms == 0 {
        tracing::warn!("Provisioning requested with a zero timeout");
        let envelope = produced(builder.mark_plugin_error(codes::INVALID_ARGUMENTS))?;
        deliver(channel, &envelope).await?;
        return Ok(envelope);
    }

    let started = produced(builder.mark_started(&config.started_message))?;
    deliver(channel, &started).await?;

    let timeout = config.timeout();
    let response = match tokio::time::timeout(timeout, sdk.get_device_info(timeout)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(
                timeout_ms = config.timeout_ms,
                "SDK did not answer within the timeout"
            );
            SdkResponse::Timeout
        }
    };

    let mut plan_id = None;
    let terminal = match response {
        SdkResponse::Success(raw) => match serde_json::from_str::<Value>(&raw) {
            Ok(device_data) => {
                plan_id = device_data.as_object().and_then(device::plan_id_from_raw);
                builder.mark_completed(config.success_status_code, Some(&device_data))
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to parse device info JSON");
                builder.mark_plugin_error(codes::MALFORMED_DEVICE_DATA)
            }
        },
        SdkResponse::Error(message) => {
            tracing::warn!(error = %message, "SDK reported an error");
            builder.mark_sdk_error(&message)
        }
        SdkResponse::Timeout => builder.mark_timeout(),
    };
    let terminal = produced(terminal)?;

    if let Some(plan_id) = plan_id.filter(|_| terminal.state() == ProvisioningState::Completed) {
        if let Err(e) = store.save_plan_id(&plan_id).await {
            tracing::warn!(error = %e, "Failed to cache plan id");
        }
    }

    deliver(channel, &terminal).await?;
    Ok(terminal)
}

fn produced(envelope: Option<Envelope>) -> Result<Envelope> {
    envelope.ok_or_else(|| {
        BridgeError::Envelope("provisioning attempt already finished".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::channel::mpsc::{ChannelMessage, MpscChannel};
    use crate::envelope::{ProvisioningError, ProvisioningOutcome, TIMEOUT_MESSAGE};
    use crate::sdk::scripted::{Script, ScriptedSdk};
    use crate::store::InMemoryPlanIdStore;

    struct FailingStore;

    #[async_trait]
    impl PlanIdStore for FailingStore {
        async fn load_plan_id(&self) -> Result<Option<String>> {
            Ok(None)
        }

        async fn save_plan_id(&self, _plan_id: &str) -> Result<()> {
            Err(BridgeError::Store("disk full".to_string()))
        }

        async fn clear(&self) -> Result<()> {
            Ok(())
        }
    }

    fn config(timeout_ms: u64) -> ProvisioningConfig {
        ProvisioningConfig {
            timeout_ms,
            ..ProvisioningConfig::default()
        }
    }

    fn device() -> Value {
        json!({
            "impee_id": " abc123 ",
            "plan_id": "P1",
            "agent_url": "https://agent.example",
            "claimed_at": "2020-01-01T00:00:00Z"
        })
    }

    fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<ChannelMessage>) -> Vec<ChannelMessage> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[tokio::test]
    async fn test_success_sends_started_then_completed() {
        let sdk = ScriptedSdk::new(Script::Success { device: device() });
        let (channel, mut rx) = MpscChannel::new();
        let store = InMemoryPlanIdStore::new();

        let terminal = run_provisioning(&sdk, &channel, &store, &config(5_000))
            .await
            .unwrap();

        let messages = drain(&mut rx);
        assert_eq!(messages.len(), 2);

        assert!(messages[0].keep_open);
        let started = Envelope::from_json(&messages[0].payload).unwrap();
        assert_eq!(started.state(), ProvisioningState::Started);

        assert!(!messages[1].keep_open);
        assert_eq!(
            messages[1].payload,
            r#"{"state":"completed","statusCode":"200","deviceInfo":{"deviceId":"abc123","planId":"P1","agentURL":"https://agent.example","verificationDate":"2020-01-01T00:00:00Z"}}"#
        );
        assert_eq!(Envelope::from_json(&messages[1].payload).unwrap(), terminal);

        assert_eq!(store.load_plan_id().await.unwrap().as_deref(), Some("P1"));
        assert!(channel.is_closed());
    }

    #[tokio::test]
    async fn test_incomplete_device_data_still_caches_plan_id() {
        let sdk = ScriptedSdk::new(Script::Success {
            device: json!({
                "impee_id": "abc",
                "plan_id": "P1",
                "agent_url": "https://agent.example"
            }),
        });
        let (channel, _rx) = MpscChannel::new();
        let store = InMemoryPlanIdStore::new();

        let terminal = run_provisioning(&sdk, &channel, &store, &config(5_000))
            .await
            .unwrap();

        assert_eq!(
            terminal.to_value().unwrap(),
            json!({"state": "completed", "statusCode": "200"})
        );
        assert_eq!(store.load_plan_id().await.unwrap().as_deref(), Some("P1"));
    }

    #[tokio::test]
    async fn test_missing_plan_id_leaves_cache_untouched() {
        let sdk = ScriptedSdk::new(Script::Success {
            device: json!({
                "impee_id": "abc",
                "agent_url": "https://agent.example",
                "claimed_at": "2020-01-01T00:00:00Z"
            }),
        });
        let (channel, _rx) = MpscChannel::new();
        let store = InMemoryPlanIdStore::new();
        store.save_plan_id("OLD").await.unwrap();

        let terminal = run_provisioning(&sdk, &channel, &store, &config(5_000))
            .await
            .unwrap();

        assert!(terminal.device_info().is_none());
        assert_eq!(store.load_plan_id().await.unwrap().as_deref(), Some("OLD"));
    }

    #[tokio::test]
    async fn test_unparseable_device_data_is_internal_error() {
        let sdk = ScriptedSdk::new(Script::SuccessText {
            body: "not json".to_string(),
        });
        let (channel, _rx) = MpscChannel::new();
        let store = InMemoryPlanIdStore::new();

        let terminal = run_provisioning(&sdk, &channel, &store, &config(5_000))
            .await
            .unwrap();

        assert_eq!(
            terminal.into_outcome(),
            ProvisioningOutcome::internal_error(codes::MALFORMED_DEVICE_DATA)
        );
    }

    #[tokio::test]
    async fn test_sdk_error_is_reported() {
        let sdk = ScriptedSdk::new(Script::Error {
            message: "Wrong wifi password".to_string(),
        });
        let (channel, mut rx) = MpscChannel::new();
        let store = InMemoryPlanIdStore::new();

        run_provisioning(&sdk, &channel, &store, &config(5_000))
            .await
            .unwrap();

        let messages = drain(&mut rx);
        let last = messages.last().unwrap();
        assert!(!last.keep_open);
        assert_eq!(
            Envelope::from_json(&last.payload).unwrap().into_outcome(),
            ProvisioningOutcome::Error(ProvisioningError::Sdk {
                code: 1,
                message: "Wrong wifi password".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_sdk_timeout_signal_is_reported() {
        let sdk = ScriptedSdk::new(Script::Timeout);
        let (channel, _rx) = MpscChannel::new();
        let store = InMemoryPlanIdStore::new();

        let terminal = run_provisioning(&sdk, &channel, &store, &config(5_000))
            .await
            .unwrap();
        assert_eq!(terminal.into_outcome(), ProvisioningOutcome::sdk_error(TIMEOUT_MESSAGE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_sdk_is_cut_off_by_timeout() {
        let sdk = ScriptedSdk::new(Script::Success { device: device() })
            .with_delay(Duration::from_secs(30));
        let (channel, mut rx) = MpscChannel::new();
        let store = InMemoryPlanIdStore::new();

        let terminal = run_provisioning(&sdk, &channel, &store, &config(1_000))
            .await
            .unwrap();

        assert_eq!(terminal.into_outcome(), ProvisioningOutcome::sdk_error(TIMEOUT_MESSAGE));
        assert_eq!(drain(&mut rx).len(), 2);
        assert_eq!(store.load_plan_id().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_zero_timeout_is_invalid_arguments() {
        let sdk = ScriptedSdk::new(Script::Timeout);
        let (channel, mut rx) = MpscChannel::new();
        let store = InMemoryPlanIdStore::new();

        let terminal = run_provisioning(&sdk, &channel, &store, &config(0))
            .await
            .unwrap();

        assert_eq!(
            terminal.into_outcome(),
            ProvisioningOutcome::internal_error(codes::INVALID_ARGUMENTS)
        );
        let messages = drain(&mut rx);
        assert_eq!(messages.len(), 1);
        assert!(!messages[0].keep_open);
    }

    #[tokio::test]
    async fn test_store_failure_does_not_change_envelope() {
        let sdk = ScriptedSdk::new(Script::Success { device: device() });
        let (channel, _rx) = MpscChannel::new();

        let terminal = run_provisioning(&sdk, &channel, &FailingStore, &config(5_000))
            .await
            .unwrap();
        assert_eq!(terminal.device_info().unwrap().plan_id, "P1");
    }

    #[tokio::test]
    async fn test_closed_channel_is_an_error() {
        let sdk = ScriptedSdk::new(Script::Timeout);
        let (channel, rx) = MpscChannel::new();
        drop(rx);
        let store = InMemoryPlanIdStore::new();

        let err = run_provisioning(&sdk, &channel, &store, &config(5_000))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Channel(_)));
    }
}
