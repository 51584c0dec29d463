//! Relay service: the message handler plus the operations behind the HTTP routes.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::{
    autoclick::ButtonMatcher,
    chat_log::{ChatLog, LogEntry, NewEntry},
    config::Config,
    downloads::DownloadDir,
    errors::Error,
    kill_switch::KillSwitch,
    messaging::{port::MessengerPort, types::IncomingMessage},
    Result,
};

const NO_TEXT: &str = "[No text]";

pub struct Relay {
    log: Mutex<ChatLog>,
    matcher: ButtonMatcher,
    auto_click_enabled: bool,
    downloads: DownloadDir,
    max_download_bytes: u64,
    kill_switch: KillSwitch,
    messenger: RwLock<Option<Arc<dyn MessengerPort>>>,
}

impl Relay {
    pub fn new(cfg: &Config) -> Result<Self> {
        Ok(Self {
            log: Mutex::new(ChatLog::new(cfg.log_capacity)),
            matcher: ButtonMatcher::new(&cfg.auto_click_patterns)?,
            auto_click_enabled: cfg.auto_click_enabled,
            downloads: DownloadDir::new(cfg.download_dir.clone()),
            max_download_bytes: cfg.max_download_bytes,
            kill_switch: KillSwitch::new(cfg.kill_switch_password.as_deref(), cfg.start_disabled),
            messenger: RwLock::new(None),
        })
    }

    /// Make the connected messenger available to handlers and routes.
    pub async fn attach_messenger(&self, messenger: Arc<dyn MessengerPort>) {
        *self.messenger.write().await = Some(messenger);
    }

    pub async fn detach_messenger(&self) {
        *self.messenger.write().await = None;
    }

    pub async fn client_ready(&self) -> bool {
        self.messenger.read().await.is_some()
    }

    pub fn downloads(&self) -> &DownloadDir {
        &self.downloads
    }

    pub fn is_disabled(&self) -> bool {
        self.kill_switch.is_disabled()
    }

    pub fn toggle(&self, password: &str) -> Result<bool> {
        let disabled = self.kill_switch.toggle(password)?;
        info!(disabled, "disable flag toggled");
        Ok(disabled)
    }

    pub async fn messages(&self, since: u64) -> Vec<LogEntry> {
        self.log.lock().await.since(since)
    }

    /// Handle one message from the target chat.
    ///
    /// Button clicks and downloads are best-effort: failures are logged and
    /// annotated, never propagated.
    pub async fn handle_incoming(&self, msg: IncomingMessage) {
        let messenger = self.messenger.read().await.clone();

        let mut text = if msg.text.trim().is_empty() {
            NO_TEXT.to_string()
        } else {
            msg.text.clone()
        };
        let mut file_path = None;

        if let Some(messenger) = &messenger {
            let caps = messenger.capabilities();

            if !msg.outgoing && self.auto_click_enabled && caps.supports_callbacks {
                if let Some(button) = self.matcher.pick(&msg.buttons) {
                    match messenger.click_button(msg.reference, button).await {
                        Ok(()) => {
                            info!(label = %button.label, msg_id = msg.reference.message_id.0, "button clicked");
                            text.push_str(&format!("\n[CLICKED: {}]", button.label));
                        }
                        Err(e) => {
                            warn!(label = %button.label, error = %e, "button click failed");
                        }
                    }
                }
            }

            if let Some(doc) = &msg.document {
                let name = DownloadDir::file_name_for(doc, msg.reference);
                match doc.size {
                    _ if !caps.supports_downloads => {
                        text.push_str(&format!("\n[FILE SKIPPED: {name} unsupported]"));
                    }
                    Some(size) if size > self.max_download_bytes => {
                        warn!(file = %name, size, "document exceeds download limit");
                        text.push_str(&format!("\n[FILE SKIPPED: {name} too large]"));
                    }
                    _ => match self
                        .downloads
                        .save(&**messenger, msg.reference, doc)
                        .await
                    {
                        Ok(saved) => {
                            info!(file = %saved, "document saved");
                            text.push_str(&format!("\n[FILE SAVED: {saved}]"));
                            file_path = Some(saved);
                        }
                        Err(e) => {
                            warn!(file = %name, error = %e, "document download failed");
                            text.push_str(&format!("\n[FILE FAILED: {name}]"));
                        }
                    },
                }
            }
        }

        self.log.lock().await.push(NewEntry {
            id: Some(msg.reference.message_id),
            outgoing: msg.outgoing,
            text,
            date: msg.date,
            file_path,
        });
    }

    /// Send text to the target chat and mirror it into the log.
    pub async fn send(&self, text: &str) -> Result<()> {
        if self.is_disabled() {
            return Err(Error::Disabled);
        }
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("text must not be empty".to_string()));
        }

        let messenger = self.messenger.read().await.clone().ok_or(Error::NotReady)?;

        let max = messenger.capabilities().max_message_len;
        if text.chars().count() > max {
            return Err(Error::InvalidInput(format!(
                "text exceeds {max} characters"
            )));
        }

        let sent = messenger.send_text(text).await?;
        self.log.lock().await.push(NewEntry {
            id: Some(sent.message_id),
            outgoing: true,
            text: text.to_string(),
            date: Utc::now(),
            file_path: None,
        });
        Ok(())
    }
}
