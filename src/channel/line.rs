use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};
use tokio::sync::Mutex;

use super::CallbackChannel;
use crate::error::{BridgeError, Result};

/// Writes one JSON envelope per line to an async writer.
pub struct LineChannel<W> {
    writer: Mutex<W>,
    closed: AtomicBool,
}

impl LineChannel<Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> LineChannel<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            closed: AtomicBool::new(false),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W> CallbackChannel for LineChannel<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send_envelope(&self, payload: &str, keep_open: bool) -> Result<()> {
        // Hold the writer across the check so a final send cannot interleave with another.
        let mut writer = self.writer.lock().await;

        if self.closed.load(Ordering::SeqCst) {
            return Err(BridgeError::ChannelClosed);
        }

        writer.write_all(payload.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;

        if !keep_open {
            self.closed.store(true, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_writes_one_line_per_envelope() {
        let channel = LineChannel::new(Vec::new());
        channel.send_envelope(r#"{"state":"started"}"#, true).await.unwrap();
        channel.send_envelope(r#"{"state":"error"}"#, false).await.unwrap();

        let err = channel.send_envelope("late", true).await.unwrap_err();
        assert!(matches!(err, BridgeError::ChannelClosed));

        let written = String::from_utf8(channel.into_inner()).unwrap();
        assert_eq!(written, "{\"state\":\"started\"}\n{\"state\":\"error\"}\n");
    }
}
