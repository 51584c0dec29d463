//! Telegram adapter (grammers, MTProto user account).
//!
//! This crate implements the `tgr-core` MessengerPort for a logged-in user
//! session, bound to one target chat.

use std::{future::Future, path::Path, time::Duration};

use async_trait::async_trait;

use grammers_client::{
    grammers_tl_types as tl, types::Chat, Client, Config as ClientConfig, InitParams,
    InvocationError,
};
use grammers_session::PackedChat;

use tokio::time::sleep;
use tracing::{debug, info, warn};

pub mod convert;
pub mod session;
pub mod updates;

use tgr_core::{
    config::{normalize_username, TelegramCredentials},
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{
        port::MessengerPort,
        types::{Button, ButtonAction, MessagingCapabilities},
    },
    Result,
};

const MAX_MESSAGE_LEN: usize = 4096;

/// Connect with a stored session string and require that it is already authorized.
pub async fn connect(creds: &TelegramCredentials) -> Result<Client> {
    let session = session::decode(&creds.session_string)?;

    let client = Client::connect(ClientConfig {
        session,
        api_id: creds.api_id,
        api_hash: creds.api_hash.clone(),
        params: InitParams::default(),
    })
    .await
    .map_err(|e| Error::External(format!("telegram connect failed: {e}")))?;

    if !client.is_authorized().await.map_err(map_err)? {
        return Err(Error::Config(
            "SESSION_STRING is not authorized; run tgr-login to create a new one".to_string(),
        ));
    }

    Ok(client)
}

/// Resolve the target chat by username (leading `@` optional).
pub async fn resolve_target(client: &Client, username: &str) -> Result<Chat> {
    let username = normalize_username(username);
    client
        .resolve_username(&username)
        .await
        .map_err(map_err)?
        .ok_or_else(|| Error::Config(format!("target chat @{username} could not be resolved")))
}

#[derive(Clone)]
pub struct TelegramMessenger {
    client: Client,
    target: PackedChat,
    target_id: ChatId,
}

impl TelegramMessenger {
    pub fn new(client: Client, target: &Chat) -> Self {
        Self {
            client,
            target: target.pack(),
            target_id: ChatId(target.id()),
        }
    }

    pub fn target_id(&self) -> ChatId {
        self.target_id
    }

    fn ensure_target(&self, msg: MessageRef) -> Result<()> {
        if msg.chat_id != self.target_id {
            return Err(Error::InvalidInput(format!(
                "message belongs to chat {}, not the target chat",
                msg.chat_id.0
            )));
        }
        Ok(())
    }

    /// Retry once when Telegram asks us to back off (FLOOD_WAIT).
    async fn with_retry<T, Fut>(
        &self,
        mut op: impl FnMut() -> Fut + Send,
    ) -> std::result::Result<T, InvocationError>
    where
        Fut: Future<Output = std::result::Result<T, InvocationError>> + Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match flood_wait(&e) {
                    Some(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        warn!(wait_secs = d.as_secs(), "flood wait; retrying");
                        sleep(d).await;
                        continue;
                    }
                    _ => return Err(e),
                },
            }
        }
    }
}

fn flood_wait(e: &InvocationError) -> Option<Duration> {
    match e {
        InvocationError::Rpc(rpc) if rpc.name == "FLOOD_WAIT" => {
            Some(Duration::from_secs(u64::from(rpc.value.unwrap_or(1))))
        }
        _ => None,
    }
}

pub(crate) fn map_err(e: InvocationError) -> Error {
    Error::External(format!("telegram error: {e}"))
}

#[async_trait]
impl MessengerPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_callbacks: true,
            supports_downloads: true,
            max_message_len: MAX_MESSAGE_LEN,
        }
    }

    async fn send_text(&self, text: &str) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| self.client.send_message(self.target, text))
            .await
            .map_err(map_err)?;

        Ok(MessageRef {
            chat_id: self.target_id,
            message_id: MessageId(msg.id()),
        })
    }

    async fn click_button(&self, msg: MessageRef, button: &Button) -> Result<()> {
        self.ensure_target(msg)?;

        match &button.action {
            ButtonAction::Callback(data) => {
                let req = tl::functions::messages::GetBotCallbackAnswer {
                    game: false,
                    peer: self.target.to_input_peer(),
                    msg_id: msg.message_id.0,
                    data: Some(data.clone()),
                    password: None,
                };
                match self.with_retry(|| self.client.invoke(&req)).await {
                    Ok(_) => Ok(()),
                    // The press was delivered; the bot just did not answer in time.
                    Err(InvocationError::Rpc(rpc)) if rpc.name == "BOT_RESPONSE_TIMEOUT" => {
                        debug!(label = %button.label, "callback answer timed out");
                        Ok(())
                    }
                    Err(e) => Err(map_err(e)),
                }
            }
            ButtonAction::Text => {
                let label = button.label.as_str();
                self.with_retry(|| self.client.send_message(self.target, label))
                    .await
                    .map_err(map_err)?;
                Ok(())
            }
            ButtonAction::Url(_) => Err(Error::InvalidInput(
                "url buttons cannot be clicked".to_string(),
            )),
        }
    }

    async fn download_attachment(&self, msg: MessageRef, dest: &Path) -> Result<u64> {
        self.ensure_target(msg)?;

        let ids = [msg.message_id.0];
        let mut found = self
            .with_retry(|| self.client.get_messages_by_id(self.target, &ids))
            .await
            .map_err(map_err)?;

        let message = found.pop().flatten().ok_or(Error::NotFound)?;
        let media = message.media().ok_or(Error::NotFound)?;

        self.client.download_media(&grammers_client::types::Downloadable::Media(media), dest).await?;
        let bytes = tokio::fs::metadata(dest).await?.len();
        info!(msg_id = msg.message_id.0, bytes, "attachment downloaded");
        Ok(bytes)
    }
}
