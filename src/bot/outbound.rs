//! Outbound chat actions.
//!
//! Handlers talk to [`ChatOutbound`]; [`TelegramOutbound`] is the teloxide
//! implementation used in production.

use super::ui_builder::{Keyboard, ReplyRequest};
use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{
    ButtonRequest, CallbackQueryId, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton,
    KeyboardMarkup, KeyboardRemove, MessageId, ReplyMarkup,
};

#[async_trait]
pub trait ChatOutbound: Send + Sync {
    /// Send a new message, returning its id
    async fn send(&self, chat_id: i64, text: &str, keyboard: Option<Keyboard>) -> AppResult<i32>;

    /// Replace the text (and inline keyboard) of an existing message
    async fn edit(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> AppResult<()>;

    async fn delete(&self, chat_id: i64, message_id: i32) -> AppResult<()>;

    /// Stop the client's loading indicator, optionally with a toast
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> AppResult<()>;
}

pub type SharedOutbound = Arc<dyn ChatOutbound>;

/// Telegram Bot API implementation
#[derive(Clone)]
pub struct TelegramOutbound {
    bot: Bot,
}

impl TelegramOutbound {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn telegram_error(operation: &str, error: teloxide::RequestError) -> AppError {
    AppError::Internal(format!("Telegram {} failed: {}", operation, error))
}

fn inline_markup(rows: Vec<Vec<super::ui_builder::InlineButton>>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(rows.into_iter().map(|row| {
        row.into_iter()
            .map(|b| InlineKeyboardButton::callback(b.text, b.data))
            .collect::<Vec<_>>()
    }))
}

fn reply_markup(keyboard: Keyboard) -> ReplyMarkup {
    match keyboard {
        Keyboard::Inline(rows) => inline_markup(rows).into(),
        Keyboard::Reply(rows) => KeyboardMarkup::new(rows.into_iter().map(|row| {
            row.into_iter()
                .map(|b| {
                    let button = KeyboardButton::new(b.text);
                    match b.request {
                        Some(ReplyRequest::Contact) => button.request(ButtonRequest::Contact),
                        Some(ReplyRequest::Location) => button.request(ButtonRequest::Location),
                        None => button,
                    }
                })
                .collect::<Vec<_>>()
        }))
        .resize_keyboard()
        .into(),
        Keyboard::Remove => KeyboardRemove::new().into(),
    }
}

#[async_trait]
impl ChatOutbound for TelegramOutbound {
    async fn send(&self, chat_id: i64, text: &str, keyboard: Option<Keyboard>) -> AppResult<i32> {
        let mut request = self.bot.send_message(ChatId(chat_id), text);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(reply_markup(keyboard));
        }
        let message = request
            .await
            .map_err(|e| telegram_error("sendMessage", e))?;
        Ok(message.id.0)
    }

    async fn edit(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> AppResult<()> {
        let mut request = self
            .bot
            .edit_message_text(ChatId(chat_id), MessageId(message_id), text);
        // only inline keyboards can be attached to an edited message
        if let Some(Keyboard::Inline(rows)) = keyboard {
            request = request.reply_markup(inline_markup(rows));
        }
        request
            .await
            .map_err(|e| telegram_error("editMessageText", e))?;
        Ok(())
    }

    async fn delete(&self, chat_id: i64, message_id: i32) -> AppResult<()> {
        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id))
            .await
            .map_err(|e| telegram_error("deleteMessage", e))?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> AppResult<()> {
        let mut request = self
            .bot
            .answer_callback_query(CallbackQueryId(callback_id.to_string()));
        if let Some(text) = text {
            request = request.text(text);
        }
        request
            .await
            .map_err(|e| telegram_error("answerCallbackQuery", e))?;
        Ok(())
    }
}
