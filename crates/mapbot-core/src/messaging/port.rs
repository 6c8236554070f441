use std::path::Path;

use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::{ChatAction, CommandInfo, MessagingCapabilities},
    Result,
};

/// Outbound messenger port.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef>;

    /// Upload a local image file as a photo message.
    async fn send_photo(&self, chat_id: ChatId, path: &Path) -> Result<MessageRef>;

    async fn send_chat_action(&self, chat_id: ChatId, action: ChatAction) -> Result<()>;

    async fn set_commands(&self, commands: &[CommandInfo]) -> Result<()>;
}
