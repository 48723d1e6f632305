//! UI Builder module for creating keyboards and formatting messages

use crate::backend::models::City;
use crate::dialogue::{BookingDraft, MAX_PASSENGERS, MIN_PASSENGERS};
use crate::localization::Translator;
use crate::pricing::{format_amount, TravelClass};

const CITIES_PER_ROW: usize = 2;

/// One inline button
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    pub data: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            data: data.into(),
        }
    }
}

/// What a reply button asks the client to share
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyRequest {
    Contact,
    Location,
}

/// One reply keyboard button
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplyButton {
    pub text: String,
    pub request: Option<ReplyRequest>,
}

/// Reply controls attached to an outbound message
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Keyboard {
    Inline(Vec<Vec<InlineButton>>),
    Reply(Vec<Vec<ReplyButton>>),
    /// Hide a previously shown reply keyboard
    Remove,
}

impl Keyboard {
    /// Callback data of every inline button, in order
    pub fn callbacks(&self) -> Vec<&str> {
        match self {
            Keyboard::Inline(rows) => rows
                .iter()
                .flatten()
                .map(|b| b.data.as_str())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Main menu: order, my trips, help
pub fn main_menu_keyboard(translator: &Translator, language: &str) -> Keyboard {
    Keyboard::Inline(vec![
        vec![InlineButton::new(translator.t("btn-order", language), "order")],
        vec![InlineButton::new(translator.t("btn-my-trips", language), "my_trips")],
        vec![InlineButton::new(translator.t("btn-help", language), "help")],
    ])
}

/// One button per supported language, labelled in that language
pub fn language_keyboard(translator: &Translator) -> Keyboard {
    Keyboard::Inline(
        translator
            .languages()
            .into_iter()
            .map(|code| {
                vec![InlineButton::new(
                    translator.t(&format!("languages-{}", code), &code),
                    format!("lang:{}", code),
                )]
            })
            .collect(),
    )
}

/// Reply keyboard with a single "share my phone" button
pub fn phone_request_keyboard(translator: &Translator, language: &str) -> Keyboard {
    Keyboard::Reply(vec![vec![ReplyButton {
        text: translator.t("btn-share-phone", language),
        request: Some(ReplyRequest::Contact),
    }]])
}

/// Reply keyboard asking for the current location, with a back label
pub fn location_request_keyboard(translator: &Translator, language: &str) -> Keyboard {
    Keyboard::Reply(vec![
        vec![ReplyButton {
            text: translator.t("btn-send-location", language),
            request: Some(ReplyRequest::Location),
        }],
        vec![ReplyButton {
            text: translator.t("btn-back", language),
            request: None,
        }],
    ])
}

/// Ride or parcel choice
pub fn order_menu_keyboard(translator: &Translator, language: &str) -> Keyboard {
    Keyboard::Inline(vec![
        vec![InlineButton::new(translator.t("btn-order-now", language), "now")],
        vec![InlineButton::new(translator.t("btn-send-parcel", language), "post")],
        vec![InlineButton::new(translator.t("btn-back", language), "back")],
    ])
}

/// Single back button with the given callback
pub fn back_keyboard(translator: &Translator, language: &str, data: &str) -> Keyboard {
    Keyboard::Inline(vec![vec![InlineButton::new(
        translator.t("btn-back", language),
        data,
    )]])
}

/// City picker for a location step.
///
/// `exclude` hides the origin when choosing a destination; `with_gps` adds
/// the "use my location" button used on origin steps.
pub fn city_keyboard(
    translator: &Translator,
    language: &str,
    cities: &[City],
    exclude: Option<&str>,
    with_gps: bool,
) -> Keyboard {
    let buttons: Vec<InlineButton> = cities
        .iter()
        .filter(|c| c.is_selectable())
        .filter(|c| exclude != Some(c.title.as_str()))
        .map(|c| InlineButton::new(c.name(language), format!("city:{}", c.title)))
        .collect();

    let mut rows: Vec<Vec<InlineButton>> = buttons
        .chunks(CITIES_PER_ROW)
        .map(|chunk| chunk.to_vec())
        .collect();

    if with_gps {
        rows.push(vec![InlineButton::new(
            translator.t("btn-send-location", language),
            "loc:gps",
        )]);
    }
    rows.push(vec![InlineButton::new(
        translator.t("btn-back", language),
        "nav:back",
    )]);

    Keyboard::Inline(rows)
}

fn marked(label: String, selected: bool) -> String {
    if selected {
        format!("✅ {}", label)
    } else {
        label
    }
}

/// Trip details controls: passengers, woman-only toggle, class, confirm
pub fn trip_details_keyboard(translator: &Translator, language: &str, draft: &BookingDraft) -> Keyboard {
    let passengers = (MIN_PASSENGERS..=MAX_PASSENGERS)
        .map(|n| {
            InlineButton::new(
                marked(n.to_string(), n == draft.passenger),
                format!("details:passenger:{}", n),
            )
        })
        .collect();

    let woman = vec![InlineButton::new(
        format!(
            "{} {}",
            if draft.has_woman { "✅" } else { "❌" },
            translator.t("btn-has-woman", language)
        ),
        format!("details:woman:{}", !draft.has_woman),
    )];

    let classes = TravelClass::ALL
        .iter()
        .map(|class| {
            InlineButton::new(
                marked(
                    translator.t(&format!("btn-{}", class.as_str()), language),
                    *class == draft.travel_class,
                ),
                format!("details:class:{}", class.as_str()),
            )
        })
        .collect();

    Keyboard::Inline(vec![
        passengers,
        woman,
        classes,
        vec![InlineButton::new(
            translator.t("btn-confirm", language),
            "details:confirm",
        )],
        vec![InlineButton::new(
            translator.t("btn-back", language),
            "details:back",
        )],
    ])
}

/// Trip details summary shown above [`trip_details_keyboard`]
pub fn format_trip_details(
    translator: &Translator,
    language: &str,
    draft: &BookingDraft,
    from_name: &str,
    to_name: &str,
) -> String {
    let class_label = translator.t(&format!("btn-{}", draft.travel_class.as_str()), language);
    let passenger = draft.passenger.to_string();
    let price = format_amount(draft.price);
    let has_woman = if draft.has_woman { "✅" } else { "❌" };

    translator.t_args(
        "trip-details",
        language,
        &[
            ("loc_begin", from_name),
            ("loc_end", to_name),
            ("passenger", &passenger),
            ("travel_class", &class_label),
            ("price", &price),
            ("has_woman", has_woman),
        ],
    )
}

/// Parcel fee confirmation
pub fn parcel_confirm_keyboard(translator: &Translator, language: &str) -> Keyboard {
    Keyboard::Inline(vec![
        vec![InlineButton::new(
            translator.t("btn-confirm", language),
            "parcel:confirm",
        )],
        vec![InlineButton::new(
            translator.t("btn-cancel", language),
            "parcel:cancel",
        )],
    ])
}

/// Shown while the backend searches for a driver.
///
/// `recreate` is the callback offered after the order is cancelled.
pub fn cancel_order_keyboard(
    translator: &Translator,
    language: &str,
    order_id: i64,
    recreate: &str,
) -> Keyboard {
    Keyboard::Inline(vec![vec![InlineButton::new(
        translator.t("btn-cancel-order", language),
        format!("cancel:{}:{}", order_id, recreate),
    )]])
}

/// Offer to start a new request after a cancellation
pub fn recreate_keyboard(translator: &Translator, language: &str, data: &str) -> Keyboard {
    Keyboard::Inline(vec![
        vec![InlineButton::new(translator.t("btn-recreate", language), data)],
        vec![InlineButton::new(translator.t("btn-back", language), "back")],
    ])
}

pub fn in_car_keyboard(translator: &Translator, language: &str, order_id: i64) -> Keyboard {
    Keyboard::Inline(vec![vec![InlineButton::new(
        translator.t("btn-in-car", language),
        format!("in_car:{}", order_id),
    )]])
}

/// Five rating buttons, best first
pub fn rate_keyboard(order_id: i64) -> Keyboard {
    Keyboard::Inline(vec![(1..=5)
        .rev()
        .map(|n| InlineButton::new(format!("{}⭐", n), format!("rate:{}:{}", n, order_id)))
        .collect()])
}
