pub mod line;
pub mod mpsc;

use async_trait::async_trait;

use crate::envelope::{codes, Envelope};
use crate::error::Result;

/// Sink for envelopes belonging to one logical request.
///
/// Any number of sends with `keep_open == true` may precede exactly one final send with
/// `keep_open == false`. Implementations reject sends after the final one with
/// [`crate::error::BridgeError::ChannelClosed`].
#[async_trait]
pub trait CallbackChannel: Send + Sync {
    async fn send_envelope(&self, payload: &str, keep_open: bool) -> Result<()>;
}

/// Encode `envelope` and push it to `channel` with its keep-open flag.
///
/// An envelope that fails to encode is replaced by an internal error envelope rather than
/// dropped, so the caller is never left waiting.
pub async fn deliver(channel: &dyn CallbackChannel, envelope: &Envelope) -> Result<()> {
    let keep_open = envelope.keep_open();
    let payload = match envelope.to_json() {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(error = %e, state = %envelope.state(), "Failed to encode envelope");
            encoding_failure_payload()
        }
    };

    tracing::debug!(state = %envelope.state(), keep_open, "Sending envelope");
    channel.send_envelope(&payload, keep_open).await
}

fn encoding_failure_payload() -> String {
    format!(
        r#"{{"state":"error","error":{{"errorCode":"{}"}}}}"#,
        codes::ENVELOPE_ENCODING
    )
}
