//! Server → client wire frames and the sink they are written to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::dispatch::AutomationEvent;
use crate::error::ChannelError;

/// A typed message sent to the client.
///
/// Serialized as `{"type": "status" | "image", "content": "..."}`. Image
/// content is a `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum ServerFrame {
    Status(String),
    Image(String),
}

impl ServerFrame {
    pub fn status(text: impl Into<String>) -> Self {
        Self::Status(text.into())
    }
}

impl From<&AutomationEvent> for ServerFrame {
    fn from(event: &AutomationEvent) -> Self {
        match event {
            AutomationEvent::Status(text) => Self::Status(text.clone()),
            AutomationEvent::Image { .. } => Self::Image(event.data_uri().unwrap_or_default()),
        }
    }
}

/// Where a session writes its frames.
#[async_trait]
pub trait FrameSink: Send {
    async fn send_frame(&mut self, frame: ServerFrame) -> Result<(), ChannelError>;
}

/// Collects frames in memory.
#[async_trait]
impl FrameSink for Vec<ServerFrame> {
    async fn send_frame(&mut self, frame: ServerFrame) -> Result<(), ChannelError> {
        self.push(frame);
        Ok(())
    }
}
