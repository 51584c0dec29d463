use std::sync::Arc;

use grammers_client::{Client, Update};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use tgr_core::{domain::ChatId, relay::Relay, Result};

use crate::{convert::incoming_from, map_err};

/// Feed every new message of the target chat into the relay until cancelled.
///
/// Messages are handled one at a time so the log keeps chat order.
pub async fn run_updates(
    client: Client,
    target: ChatId,
    relay: Arc<Relay>,
    cancel: CancellationToken,
) -> Result<()> {
    info!(chat_id = target.0, "listening for target chat messages");

    loop {
        let update = tokio::select! {
            _ = cancel.cancelled() => {
                info!("update loop stopped");
                return Ok(());
            }
            update = client.next_update() => update.map_err(map_err)?,
        };

        match update {
            Update::NewMessage(message) if message.chat().id() == target.0 => {
                let incoming = incoming_from(&message);
                debug!(
                    msg_id = incoming.reference.message_id.0,
                    outgoing = incoming.outgoing,
                    buttons = incoming.buttons.len(),
                    has_document = incoming.document.is_some(),
                    "target chat message"
                );
                relay.handle_incoming(incoming).await;
            }
            _ => {}
        }
    }
}
