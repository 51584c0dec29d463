use grammers_client::{
    grammers_tl_types as tl,
    types::{Media, Message},
};

use tgr_core::{
    domain::{ChatId, MessageId, MessageRef},
    messaging::types::{Button, DocumentInfo, IncomingMessage},
};

pub fn incoming_from(message: &Message) -> IncomingMessage {
    IncomingMessage {
        reference: MessageRef {
            chat_id: ChatId(message.chat().id()),
            message_id: MessageId(message.id()),
        },
        outgoing: message.outgoing(),
        date: message.date(),
        text: message.text().to_string(),
        document: message.media().as_ref().and_then(document_info),
        buttons: message
            .reply_markup()
            .as_ref()
            .map(buttons_from_markup)
            .unwrap_or_default(),
    }
}

fn document_info(media: &Media) -> Option<DocumentInfo> {
    match media {
        Media::Document(doc) => Some(DocumentInfo {
            file_name: Some(doc.name().to_string()).filter(|n| !n.trim().is_empty()),
            size: u64::try_from(doc.size()).ok(),
        }),
        _ => None,
    }
}

/// Flatten inline and reply keyboards into buttons, row by row.
pub fn buttons_from_markup(markup: &tl::enums::ReplyMarkup) -> Vec<Button> {
    let rows = match markup {
        tl::enums::ReplyMarkup::ReplyInlineMarkup(m) => &m.rows,
        tl::enums::ReplyMarkup::ReplyKeyboardMarkup(m) => &m.rows,
        _ => return Vec::new(),
    };

    rows.iter()
        .flat_map(|row| match row {
            tl::enums::KeyboardButtonRow::Row(r) => r.buttons.iter(),
        })
        .filter_map(button_from_tl)
        .collect()
}

fn button_from_tl(button: &tl::enums::KeyboardButton) -> Option<Button> {
    match button {
        tl::enums::KeyboardButton::Callback(b) => Some(Button::callback(b.text.clone(), b.data.clone())),
        tl::enums::KeyboardButton::Button(b) => Some(Button::text(b.text.clone())),
        tl::enums::KeyboardButton::Url(b) => Some(Button::url(b.text.clone(), b.url.clone())),
        // Login, game, payment, switch-inline, etc.
        _ => None,
    }
}
