//! Order callback handlers module
//!
//! Actions on an existing order: cancel, "I'm in the car", rating, and the
//! trip history list.

use anyhow::Result;
use chrono::{DateTime, NaiveDateTime};
use tracing::{debug, info};

use crate::backend::models::{City, Order, OrderStatus, PlaceRef};
use crate::bot::ui_builder::{back_keyboard, recreate_keyboard};
use crate::bot::HandlerContext;
use crate::pricing::format_amount;

/// Trips listed by `my_trips`
pub const TRIPS_SHOWN: usize = 5;

/// `cancel:<order_id>[:<recreate>]`
pub async fn handle_cancel_order(ctx: HandlerContext) -> Result<()> {
    let Some(data) = ctx.event.callback() else {
        return Ok(());
    };
    let Some(order_id) = data.value_i64() else {
        debug!(user_id = %ctx.user_id(), "Cancel callback without an order id");
        return Ok(());
    };

    // stale buttons outlive the order; only the owner's unfinished orders can go
    let orders = ctx.services.backend.list_orders(ctx.user_id()).await?;
    let Some(order) = orders.iter().find(|o| o.id == order_id) else {
        info!(user_id = %ctx.user_id(), order_id = %order_id, "Cancel for an order the user does not own");
        return refuse_cancel(&ctx).await;
    };
    if !order.status.is_active() {
        info!(
            user_id = %ctx.user_id(),
            order_id = %order_id,
            status = %order.status,
            "Cancel for a finished order"
        );
        return refuse_cancel(&ctx).await;
    }

    ctx.services
        .backend
        .update_order_status(order_id, OrderStatus::Rejected)
        .await?;
    info!(user_id = %ctx.user_id(), order_id = %order_id, "Order cancelled by user");

    let recreate = match data.param.as_deref() {
        Some("re_post") => "re_post",
        _ => "restart",
    };
    ctx.show(
        &ctx.t("trip-canceled"),
        Some(recreate_keyboard(ctx.translator(), &ctx.language, recreate)),
    )
    .await?;
    Ok(())
}

async fn refuse_cancel(ctx: &HandlerContext) -> Result<()> {
    ctx.show(
        &ctx.t("order-not-cancellable"),
        Some(back_keyboard(ctx.translator(), &ctx.language, "back")),
    )
    .await?;
    Ok(())
}

/// `in_car:<order_id>`
pub async fn handle_in_car(ctx: HandlerContext) -> Result<()> {
    let Some(order_id) = ctx.event.callback().and_then(|d| d.value_i64()) else {
        return Ok(());
    };

    ctx.services
        .backend
        .update_order_status(order_id, OrderStatus::Started)
        .await?;
    info!(user_id = %ctx.user_id(), order_id = %order_id, "Passenger boarded");

    ctx.show(&ctx.t("safe-trip"), None).await?;
    Ok(())
}

/// `rate:<n>:<order_id>`, n in 1..=5
pub async fn handle_rate(ctx: HandlerContext) -> Result<()> {
    let Some(data) = ctx.event.callback() else {
        return Ok(());
    };
    let rate = data.value_i64().filter(|n| (1..=5).contains(n));
    let (Some(rate), Some(order_id)) = (rate, data.param_i64()) else {
        debug!(user_id = %ctx.user_id(), data = ?ctx.event.callback_data(), "Malformed rate callback");
        return Ok(());
    };

    ctx.services
        .backend
        .update_order_rate(order_id, rate as u8)
        .await?;
    info!(user_id = %ctx.user_id(), order_id = %order_id, rate = rate, "Trip rated");

    ctx.delete_current().await;
    Ok(())
}

/// `my_trips`: the most recent trips, newest first
pub async fn handle_my_trips(ctx: HandlerContext) -> Result<()> {
    let trips = ctx.services.backend.list_travels(ctx.user_id()).await?;
    let keyboard = Some(back_keyboard(ctx.translator(), &ctx.language, "back"));

    if trips.is_empty() {
        ctx.show(&ctx.t("no-trips-found"), keyboard).await?;
        return Ok(());
    }

    let cities = ctx.city_list().await?;
    let count = trips.len().to_string();
    let mut sections = vec![ctx.t_args("my-trips-header", &[("count", &count)])];
    sections.extend(
        trips
            .iter()
            .take(TRIPS_SHOWN)
            .enumerate()
            .map(|(index, trip)| format_trip(&ctx, &cities, index + 1, trip)),
    );
    if trips.len() > TRIPS_SHOWN {
        let hidden = (trips.len() - TRIPS_SHOWN).to_string();
        sections.push(ctx.t_args("more-trips-hidden", &[("count", &hidden)]));
    }

    ctx.show(&sections.join("\n\n"), keyboard).await?;
    Ok(())
}

fn city_label(cities: &[City], slug: &str, language: &str) -> String {
    cities
        .iter()
        .find(|c| c.title == slug)
        .map(|c| c.name(language).to_string())
        .unwrap_or_else(|| slug.to_string())
}

/// Localized origin and destination of an order, `-` where unknown
pub(crate) fn route_labels(cities: &[City], order: &Order, language: &str) -> (String, String) {
    let label = |place: Option<&PlaceRef>| {
        place
            .map(|p| city_label(cities, p.city(), language))
            .unwrap_or_else(|| "-".to_string())
    };
    (
        label(order.from_location.as_ref()),
        label(order.to_location.as_ref()),
    )
}

fn format_trip(ctx: &HandlerContext, cities: &[City], number: usize, trip: &Order) -> String {
    let (from, to) = route_labels(cities, trip, &ctx.language);
    let price = trip
        .price
        .map(format_amount)
        .unwrap_or_else(|| "-".to_string());
    let date = trip
        .created_at
        .as_deref()
        .map(format_date)
        .unwrap_or_else(|| "-".to_string());

    ctx.t_args(
        "trip-info",
        &[
            ("number", &number.to_string()),
            ("code", &trip.id.to_string()),
            ("from_location", &from),
            ("to_location", &to),
            ("price", &price),
            ("date", &date),
        ],
    )
}

/// `DD.MM.YYYY HH:MM`; unparsable timestamps are shown as sent
pub fn format_date(raw: &str) -> String {
    const FORMAT: &str = "%d.%m.%Y %H:%M";
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.format(FORMAT).to_string();
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return parsed.format(FORMAT).to_string();
    }
    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2024-03-05T14:07:00+05:00"), "05.03.2024 14:07");
        assert_eq!(format_date("2024-03-05T14:07:00.123456"), "05.03.2024 14:07");
        assert_eq!(format_date("yesterday"), "yesterday");
    }

    #[test]
    fn test_city_label_falls_back_to_slug() {
        assert_eq!(city_label(&[], "qoqon", "ru"), "qoqon");
    }
}
