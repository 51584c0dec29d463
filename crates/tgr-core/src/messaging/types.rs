use chrono::{DateTime, Utc};

use crate::domain::MessageRef;

/// A message observed in the target chat (either direction).
///
/// Telegram-specific fields stay in the Telegram adapter.
#[derive(Clone, Debug)]
pub struct IncomingMessage {
    pub reference: MessageRef,
    /// `true` when the message was sent by our own account.
    pub outgoing: bool,
    pub date: DateTime<Utc>,
    /// Message text or media caption (may be empty).
    pub text: String,
    pub document: Option<DocumentInfo>,
    /// All keyboard buttons attached to the message, flattened row by row.
    pub buttons: Vec<Button>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocumentInfo {
    pub file_name: Option<String>,
    pub size: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub action: ButtonAction,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ButtonAction {
    /// Inline button carrying callback data for the bot.
    Callback(Vec<u8>),
    /// Reply-keyboard button; pressing it sends the label as text.
    Text,
    /// Inline link; nothing to press on the messenger side.
    Url(String),
}

impl Button {
    pub fn callback(label: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Callback(data.into()),
        }
    }

    pub fn text(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Text,
        }
    }

    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Url(url.into()),
        }
    }

    pub fn is_clickable(&self) -> bool {
        !matches!(self.action, ButtonAction::Url(_))
    }
}

/// Capabilities / limits of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_callbacks: bool,
    pub supports_downloads: bool,
    pub max_message_len: usize,
}
