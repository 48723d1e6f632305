//! Teloxide edge: converts updates into [`InboundEvent`]s and feeds them to
//! the dispatcher.

use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{BotCommand, MaybeInaccessibleMessage};
use tracing::debug;

use super::dispatcher::{Dispatcher, Registry};
use super::events::{parse_command, EventPayload, InboundEvent};
use crate::geo::GeoPoint;

/// Build an event from a message; `None` for content the bot does not handle
pub fn event_from_message(msg: &Message) -> Option<InboundEvent> {
    let user = msg.from.as_ref()?;

    let payload = if let Some(contact) = msg.contact() {
        // only the sender's own contact verifies a phone
        if contact.user_id.is_some_and(|id| id != user.id) {
            debug!(user_id = %user.id.0, "Ignoring contact of another user");
            return None;
        }
        EventPayload::Contact {
            phone: contact.phone_number.clone(),
        }
    } else if let Some(location) = msg.location() {
        EventPayload::Location(GeoPoint::new(location.latitude, location.longitude))
    } else if let Some(text) = msg.text() {
        match parse_command(text) {
            Some((name, args)) => EventPayload::Command { name, args },
            None => EventPayload::Text(text.to_string()),
        }
    } else {
        return None;
    };

    Some(InboundEvent {
        user_id: user.id.0 as i64,
        chat_id: msg.chat.id.0,
        full_name: user.full_name(),
        username: user.username.clone(),
        language_code: user.language_code.clone(),
        message_id: Some(msg.id.0),
        payload,
    })
}

/// Build an event from a callback query; `None` when it carries no data
pub fn event_from_callback(q: &CallbackQuery) -> Option<InboundEvent> {
    let data = q.data.clone()?;

    // Use the chat of the message that contained the inline keyboard
    let (chat_id, message_id) = match &q.message {
        Some(MaybeInaccessibleMessage::Regular(msg)) => (msg.chat.id.0, Some(msg.id.0)),
        Some(MaybeInaccessibleMessage::Inaccessible(msg)) => {
            (msg.chat.id.0, Some(msg.message_id.0))
        }
        None => (q.from.id.0 as i64, None),
    };

    Some(InboundEvent {
        user_id: q.from.id.0 as i64,
        chat_id,
        full_name: q.from.full_name(),
        username: q.from.username.clone(),
        language_code: q.from.language_code.clone(),
        message_id,
        payload: EventPayload::Callback {
            id: q.id.0.clone(),
            data,
        },
    })
}

/// Message endpoint for the teloxide dispatcher
pub async fn message_endpoint(msg: Message, dispatcher: Arc<Dispatcher>) -> ResponseResult<()> {
    match event_from_message(&msg) {
        Some(event) => {
            dispatcher.dispatch(event).await;
        }
        None => debug!(chat_id = %msg.chat.id, "Ignoring unsupported message"),
    }
    Ok(())
}

/// Callback query endpoint for the teloxide dispatcher
pub async fn callback_endpoint(q: CallbackQuery, dispatcher: Arc<Dispatcher>) -> ResponseResult<()> {
    match event_from_callback(&q) {
        Some(event) => {
            dispatcher.dispatch(event).await;
        }
        None => debug!(user_id = %q.from.id.0, "Ignoring callback without data"),
    }
    Ok(())
}

/// Publish the public commands in the client's command menu
pub async fn setup_bot_commands(bot: &Bot, registry: &Registry) -> Result<(), teloxide::RequestError> {
    let commands: Vec<BotCommand> = registry
        .public_commands()
        .into_iter()
        .map(|(name, description)| BotCommand::new(name, description))
        .collect();

    bot.set_my_commands(commands).await?;
    Ok(())
}
