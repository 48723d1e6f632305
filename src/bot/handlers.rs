//! Handler registration.
//!
//! Every command, callback, step and content handler is registered here,
//! once, at startup. A conflicting registration aborts startup.

use anyhow::Result;

use super::booking_flow::{handle_location_step, handle_order_now, handle_trip_details};
use super::callbacks::menu_callbacks::{handle_back, handle_language_selected, handle_order};
use super::callbacks::order_callbacks::{
    handle_cancel_order, handle_in_car, handle_my_trips, handle_rate,
};
use super::command_handlers::{
    handle_help_command, handle_language_command, handle_start_command, handle_stats_command,
    show_main_menu,
};
use super::dispatcher::{handler, HandlerMeta, Registry, RegistryBuilder, Route};
use super::events::EventKind;
use super::phone_verification::{handle_phone_contact, handle_sms_code};
use super::post_flow::{handle_post_confirm, handle_send_parcel};
use super::HandlerContext;
use crate::dialogue::Step;
use crate::errors::AppResult;

/// Idle text: bring the menu back
async fn handle_idle_text(ctx: HandlerContext) -> Result<()> {
    show_main_menu(&ctx).await
}

/// Register every handler of the bot
pub fn register_handlers(builder: &mut RegistryBuilder) -> AppResult<()> {
    // commands
    builder
        .register(
            Route::command("start"),
            handler(handle_start_command),
            HandlerMeta::new("start").describe("Start the bot"),
        )?
        .register(
            Route::command("language"),
            handler(handle_language_command),
            HandlerMeta::new("language").describe("Change language"),
        )?
        .register(
            Route::command("help"),
            handler(handle_help_command),
            HandlerMeta::new("help").describe("How to use the bot"),
        )?
        .register(
            Route::command("stats"),
            handler(handle_stats_command),
            HandlerMeta::new("stats").admin_only().describe("Bot statistics"),
        )?;

    // global callbacks
    builder
        .register(
            Route::callback("lang"),
            handler(handle_language_selected),
            HandlerMeta::new("language_selected"),
        )?
        .register(
            Route::callback("order"),
            handler(handle_order),
            HandlerMeta::new("order_menu"),
        )?
        .register(
            Route::callback("now"),
            handler(handle_order_now),
            HandlerMeta::new("order_now"),
        )?
        .register(
            Route::callback("restart"),
            handler(handle_order_now),
            HandlerMeta::new("order_restart"),
        )?
        .register(
            Route::callback("post"),
            handler(handle_send_parcel),
            HandlerMeta::new("send_parcel"),
        )?
        .register(
            Route::callback("re_post"),
            handler(handle_send_parcel),
            HandlerMeta::new("send_parcel_again"),
        )?
        .register(
            Route::callback("back"),
            handler(handle_back),
            HandlerMeta::new("back"),
        )?
        .register(
            Route::callback("help"),
            handler(handle_help_command),
            HandlerMeta::new("help_callback"),
        )?
        .register(
            Route::callback("my_trips"),
            handler(handle_my_trips),
            HandlerMeta::new("my_trips"),
        )?
        .register(
            Route::callback("cancel"),
            handler(handle_cancel_order),
            HandlerMeta::new("cancel_order"),
        )?
        .register(
            Route::callback("in_car"),
            handler(handle_in_car),
            HandlerMeta::new("in_car"),
        )?
        .register(
            Route::callback("rate"),
            handler(handle_rate),
            HandlerMeta::new("rate_trip"),
        )?;

    // conversation steps
    for (step, name) in [
        (Step::RideFromLocation, "ride_from_location"),
        (Step::RideToLocation, "ride_to_location"),
        (Step::PostFromLocation, "post_from_location"),
        (Step::PostToLocation, "post_to_location"),
    ] {
        builder.register(
            Route::Step(step),
            handler(handle_location_step),
            HandlerMeta::new(name)
                .accepts(&[EventKind::Text, EventKind::Location])
                .callbacks(&["city", "loc", "nav"]),
        )?;
    }
    builder
        .register(
            Route::Step(Step::RideTripDetails),
            handler(handle_trip_details),
            HandlerMeta::new("ride_trip_details").callbacks(&["details"]),
        )?
        .register(
            Route::Step(Step::PostConfirm),
            handler(handle_post_confirm),
            HandlerMeta::new("post_confirm").callbacks(&["parcel"]),
        )?
        .register(
            Route::Step(Step::PhoneContact),
            handler(handle_phone_contact),
            HandlerMeta::new("phone_contact").accepts(&[EventKind::Contact, EventKind::Text]),
        )?
        .register(
            Route::Step(Step::SmsCode),
            handler(handle_sms_code),
            HandlerMeta::new("sms_code").accepts(&[EventKind::Text]),
        )?;

    // content outside any flow
    builder.register(
        Route::Content(EventKind::Text),
        handler(handle_idle_text),
        HandlerMeta::new("idle_text"),
    )?;

    Ok(())
}

/// Registry with every handler of the bot
pub fn build_registry() -> AppResult<Registry> {
    let mut builder = RegistryBuilder::new();
    register_handlers(&mut builder)?;
    Ok(builder.build())
}
