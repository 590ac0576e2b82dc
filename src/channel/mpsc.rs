use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::CallbackChannel;
use crate::error::{BridgeError, Result};

/// One envelope as delivered to the in-process receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    pub payload: String,
    pub keep_open: bool,
}

/// In-process callback channel backed by an unbounded tokio channel.
pub struct MpscChannel {
    tx: mpsc::UnboundedSender<ChannelMessage>,
    closed: AtomicBool,
}

impl MpscChannel {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ChannelMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let channel = Self {
            tx,
            closed: AtomicBool::new(false),
        };
        (channel, rx)
    }

    /// True once the final envelope has been sent.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CallbackChannel for MpscChannel {
    async fn send_envelope(&self, payload: &str, keep_open: bool) -> Result<()> {
        let already_closed = if keep_open {
            self.closed.load(Ordering::SeqCst)
        } else {
            self.closed.swap(true, Ordering::SeqCst)
        };
        if already_closed {
            tracing::warn!(keep_open, "Send attempted on a closed callback channel");
            return Err(BridgeError::ChannelClosed);
        }

        self.tx
            .send(ChannelMessage {
                payload: payload.to_string(),
                keep_open,
            })
            .map_err(|_| BridgeError::Channel("receiver dropped".to_string()))
    }
}
