use std::path::Path;

use async_trait::async_trait;

use crate::{
    domain::MessageRef,
    messaging::types::{Button, MessagingCapabilities},
    Result,
};

/// Port to the messaging account, bound to the single target chat.
#[async_trait]
pub trait MessengerPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    /// Send plain text to the target chat.
    async fn send_text(&self, text: &str) -> Result<MessageRef>;

    /// Activate a button attached to `msg`.
    async fn click_button(&self, msg: MessageRef, button: &Button) -> Result<()>;

    /// Download the document attached to `msg` into `dest`, returning the bytes written.
    async fn download_attachment(&self, msg: MessageRef, dest: &Path) -> Result<u64>;
}
