//! Transport-neutral inbound events.
//!
//! Telegram updates are converted into [`InboundEvent`] at the edge (see
//! `bot::telegram`), so the dispatcher and handlers never touch teloxide
//! types and can be driven directly from tests.

use crate::geo::GeoPoint;
use crate::validation::ValidatorInput;
use std::fmt;

/// Shape of an inbound event, used for routing and metrics
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Command,
    Callback,
    Text,
    Contact,
    Location,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Command => "command",
            EventKind::Callback => "callback",
            EventKind::Text => "text",
            EventKind::Contact => "contact",
            EventKind::Location => "location",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callback payload `action[:value[:param[:extra]]]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallbackData {
    pub action: String,
    pub value: Option<String>,
    pub param: Option<String>,
    pub extra: Option<String>,
}

impl CallbackData {
    /// Split into at most four fields; everything after the third colon
    /// stays in `extra`
    ///
    /// # Examples
    /// ```
    /// use ride_bot::bot::events::CallbackData;
    ///
    /// let data = CallbackData::parse("rate:5:42");
    /// assert_eq!(data.action, "rate");
    /// assert_eq!(data.value.as_deref(), Some("5"));
    /// assert_eq!(data.param.as_deref(), Some("42"));
    /// assert_eq!(data.extra, None);
    /// ```
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.splitn(4, ':').map(|p| p.to_string());
        Self {
            action: parts.next().unwrap_or_default(),
            value: parts.next(),
            param: parts.next(),
            extra: parts.next(),
        }
    }

    /// Numeric value field
    pub fn value_i64(&self) -> Option<i64> {
        self.value.as_deref().and_then(|v| v.parse().ok())
    }

    /// Numeric param field
    pub fn param_i64(&self) -> Option<i64> {
        self.param.as_deref().and_then(|v| v.parse().ok())
    }
}

/// What the user sent
#[derive(Clone, Debug, PartialEq)]
pub enum EventPayload {
    Command { name: String, args: String },
    Callback { id: String, data: String },
    Text(String),
    Contact { phone: String },
    Location(GeoPoint),
}

/// One inbound update from a user
#[derive(Clone, Debug, PartialEq)]
pub struct InboundEvent {
    pub user_id: i64,
    pub chat_id: i64,
    pub full_name: String,
    pub username: Option<String>,
    /// Language reported by the client, e.g. `ru-RU`
    pub language_code: Option<String>,
    /// Message carrying the payload, or the message the callback button is on
    pub message_id: Option<i32>,
    pub payload: EventPayload,
}

impl InboundEvent {
    pub fn kind(&self) -> EventKind {
        match self.payload {
            EventPayload::Command { .. } => EventKind::Command,
            EventPayload::Callback { .. } => EventKind::Callback,
            EventPayload::Text(_) => EventKind::Text,
            EventPayload::Contact { .. } => EventKind::Contact,
            EventPayload::Location(_) => EventKind::Location,
        }
    }

    /// Raw callback data, if this is a callback
    pub fn callback_data(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::Callback { data, .. } => Some(data),
            _ => None,
        }
    }

    pub fn callback(&self) -> Option<CallbackData> {
        self.callback_data().map(CallbackData::parse)
    }

    pub fn callback_id(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::Callback { id, .. } => Some(id),
            _ => None,
        }
    }

    pub fn command(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::Command { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_callback(&self) -> bool {
        matches!(self.payload, EventPayload::Callback { .. })
    }

    /// Input for validators; commands and callbacks have none
    pub fn validator_input(&self) -> Option<ValidatorInput<'_>> {
        match &self.payload {
            EventPayload::Text(text) => Some(ValidatorInput::Text(text)),
            EventPayload::Contact { phone } => Some(ValidatorInput::Contact(phone)),
            EventPayload::Location(point) => Some(ValidatorInput::Location(*point)),
            EventPayload::Command { .. } | EventPayload::Callback { .. } => None,
        }
    }
}

/// Split `/name@bot args` into a command name and its arguments
pub fn parse_command(text: &str) -> Option<(String, String)> {
    let rest = text.trim().strip_prefix('/')?;
    let (head, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    let name = head.split('@').next().unwrap_or(head).to_lowercase();
    if name.is_empty() {
        return None;
    }
    Some((name, args.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_parse_fields() {
        let data = CallbackData::parse("details:passenger:3");
        assert_eq!(data.action, "details");
        assert_eq!(data.value.as_deref(), Some("passenger"));
        assert_eq!(data.param_i64(), Some(3));

        let bare = CallbackData::parse("order");
        assert_eq!(bare.action, "order");
        assert_eq!(bare.value, None);
    }

    #[test]
    fn test_callback_parse_keeps_tail_in_extra() {
        let data = CallbackData::parse("a:b:c:d:e");
        assert_eq!(data.extra.as_deref(), Some("d:e"));
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(
            parse_command("/start"),
            Some(("start".to_string(), String::new()))
        );
        assert_eq!(
            parse_command("/Language@ride_bot uz"),
            Some(("language".to_string(), "uz".to_string()))
        );
        assert_eq!(parse_command("hello"), None);
        assert_eq!(parse_command("/"), None);
    }
}
