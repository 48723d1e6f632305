//! # Booking Flow
//!
//! Ride requests move through
//! `RideFromLocation → RideToLocation → RideTripDetails`, and end either on
//! confirmation (the travel is created and the state cleared) or on back.
//! The location steps are shared with the parcel post flow: both pick an
//! origin and a destination the same way and only differ in what happens
//! once the destination is accepted.

use anyhow::Result;
use tracing::{debug, info, warn};

use super::callbacks::order_callbacks::route_labels;
use super::command_handlers::show_main_menu;
use super::ui_builder::{
    back_keyboard, cancel_order_keyboard, city_keyboard, format_trip_details,
    location_request_keyboard, order_menu_keyboard, trip_details_keyboard, Keyboard,
};
use super::{post_flow, HandlerContext};
use crate::backend::models::NewTravel;
use crate::dialogue::{keys, read_key, step_data, BookingDraft, LocationPoint, Step, StepData};
use crate::errors::error_logging;
use crate::pricing::TravelClass;
use crate::validation::{
    ControlAction, LocationValidator, ValidationContext, ValidationResult, Validated, Validator,
    ValidatorInput,
};

/// One origin or destination step
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocationStep {
    pub step: Step,
    /// Step reached from `nav:back`; `None` returns to the order menu
    pub previous: Option<Step>,
    pub prompt_key: &'static str,
    /// Offer the "use my location" button
    pub with_gps: bool,
}

impl LocationStep {
    pub fn for_step(step: Step) -> Option<Self> {
        let (previous, prompt_key, with_gps) = match step {
            Step::RideFromLocation => (None, "travel-start", true),
            Step::RideToLocation => (Some(Step::RideFromLocation), "travel-destination", false),
            Step::PostFromLocation => (None, "parcel-origin", true),
            Step::PostToLocation => (Some(Step::PostFromLocation), "parcel-destination", false),
            _ => return None,
        };
        Some(Self {
            step,
            previous,
            prompt_key,
            with_gps,
        })
    }

    /// Destination steps check against the stored origin
    pub fn is_destination(&self) -> bool {
        self.previous.is_some()
    }
}

/// Tell the user about an unfinished order. Returns true when one exists.
pub async fn guard_active_order(ctx: &HandlerContext) -> Result<bool> {
    let orders = ctx.services.backend.list_orders(ctx.user_id()).await?;
    let Some(active) = orders.iter().find(|o| o.status.is_active()) else {
        return Ok(false);
    };

    info!(
        user_id = %ctx.user_id(),
        order_id = %active.id,
        status = %active.status,
        "Blocking new request, order still active"
    );
    let cities = ctx.city_list().await?;
    let (from, to) = route_labels(&cities, active, &ctx.language);
    let text = ctx.t_args(
        "active-order",
        &[
            ("code", &active.id.to_string()),
            ("status", active.status.as_str()),
            ("from_location", &from),
            ("to_location", &to),
        ],
    );
    ctx.show(
        &text,
        Some(back_keyboard(ctx.translator(), &ctx.language, "back")),
    )
    .await?;
    Ok(true)
}

/// Ride or parcel choice
pub async fn show_order_menu(ctx: &HandlerContext) -> Result<()> {
    ctx.show(
        &ctx.t("travel-type"),
        Some(order_menu_keyboard(ctx.translator(), &ctx.language)),
    )
    .await?;
    Ok(())
}

/// Show the city picker of a location step
pub async fn prompt_location(
    ctx: &HandlerContext,
    step: &LocationStep,
    exclude: Option<&str>,
) -> Result<()> {
    let cities = ctx.city_list().await?;
    let keyboard = city_keyboard(
        ctx.translator(),
        &ctx.language,
        &cities,
        exclude,
        step.with_gps,
    );
    ctx.show(&ctx.t(step.prompt_key), Some(keyboard)).await?;
    Ok(())
}

/// Enter the origin step of a flow with empty data
pub async fn start_location_flow(ctx: &HandlerContext, origin: Step) -> Result<()> {
    let Some(step) = LocationStep::for_step(origin) else {
        return Ok(());
    };
    ctx.state()
        .replace(ctx.user_id(), step.step, StepData::new())
        .await?;
    prompt_location(ctx, &step, None).await
}

/// `now` and `restart`: new ride unless an order is still running
pub async fn handle_order_now(ctx: HandlerContext) -> Result<()> {
    if guard_active_order(&ctx).await? {
        return Ok(());
    }
    start_location_flow(&ctx, Step::RideFromLocation).await
}

/// Step handler for the four origin/destination steps
pub async fn handle_location_step(ctx: HandlerContext) -> Result<()> {
    let Some(step) = ctx.step.and_then(LocationStep::for_step) else {
        return Ok(());
    };

    if let Some(callback) = ctx.event.callback() {
        return match (callback.action.as_str(), callback.value.as_deref()) {
            ("nav", Some("back")) => navigate_back(&ctx, &step).await,
            ("loc", Some("gps")) => request_gps(&ctx).await,
            ("city", Some(slug)) => {
                accept_location(&ctx, &step, ValidatorInput::CityButton(slug)).await
            }
            _ => {
                debug!(user_id = %ctx.user_id(), data = ?ctx.event.callback_data(), "Ignoring callback in location step");
                Ok(())
            }
        };
    }

    match ctx.event.validator_input() {
        Some(input) => accept_location(&ctx, &step, input).await,
        None => Ok(()),
    }
}

/// Swap the inline list for a reply keyboard asking for the location
async fn request_gps(ctx: &HandlerContext) -> Result<()> {
    ctx.delete_current().await;
    ctx.send(
        &ctx.t("location-request"),
        Some(location_request_keyboard(ctx.translator(), &ctx.language)),
    )
    .await?;
    Ok(())
}

async fn navigate_back(ctx: &HandlerContext, step: &LocationStep) -> Result<()> {
    match step.previous.and_then(LocationStep::for_step) {
        Some(previous) => {
            ctx.state()
                .replace(ctx.user_id(), previous.step, StepData::new())
                .await?;
            prompt_location(ctx, &previous, None).await
        }
        None => {
            ctx.state().clear(ctx.user_id()).await?;
            show_order_menu(ctx).await
        }
    }
}

fn input_text<'a>(input: &ValidatorInput<'a>) -> Option<&'a str> {
    match *input {
        ValidatorInput::Text(text) | ValidatorInput::CityButton(text) => Some(text),
        _ => None,
    }
}

async fn accept_location(
    ctx: &HandlerContext,
    step: &LocationStep,
    input: ValidatorInput<'_>,
) -> Result<()> {
    let user_id = ctx.user_id();
    let data = ctx.state().get_data(user_id).await?;
    let origin: Option<LocationPoint> = if step.is_destination() {
        read_key(&data, keys::FROM_LOCATION)
    } else {
        None
    };

    let cities = ctx.city_list().await?;
    let settings = &ctx.services.config.dispatch;
    let validator = Validator::Location(LocationValidator {
        check_duplicate: step.is_destination(),
        same_city_km: settings.same_city_distance_km,
        service_radius_km: settings.service_radius_km,
    });
    let validation_ctx = ValidationContext::new(ctx.translator(), &ctx.language)
        .with_cities(cities.as_slice())
        .with_geocoder(ctx.services.geocoder.as_ref())
        .with_previous(origin.as_ref());

    match validator.validate(&input, &validation_ctx).await? {
        ValidationResult::Success(Validated::Location(point)) => {
            if !ctx.event.is_callback() {
                ctx.send(&ctx.t("location-accepted"), Some(Keyboard::Remove))
                    .await?;
            }
            on_location_accepted(ctx, step, point, &data).await
        }
        ValidationResult::Success(other) => {
            warn!(user_id = %user_id, value = ?other, "Location validator returned a non-location value");
            Ok(())
        }
        ValidationResult::Action(action) => on_control_action(ctx, step, action).await,
        ValidationResult::Error(error) => {
            error_logging::log_validation_error(error.key, user_id, input.kind(), input_text(&input));
            ctx.send(&error.message(ctx.translator(), &ctx.language), None)
                .await?;
            Ok(())
        }
    }
}

async fn on_control_action(
    ctx: &HandlerContext,
    step: &LocationStep,
    action: ControlAction,
) -> Result<()> {
    match action {
        ControlAction::Back => {
            // typed labels come from the reply keyboard, which has to go
            ctx.send(&ctx.t("navigating-back"), Some(Keyboard::Remove))
                .await?;
            navigate_back(ctx, step).await
        }
        ControlAction::Cancel => {
            ctx.state().clear(ctx.user_id()).await?;
            ctx.send(&ctx.t("request-cancelled"), Some(Keyboard::Remove))
                .await?;
            show_main_menu(ctx).await
        }
        ControlAction::Skip => {
            ctx.send(&ctx.t("errors-required-field"), None).await?;
            Ok(())
        }
    }
}

async fn on_location_accepted(
    ctx: &HandlerContext,
    step: &LocationStep,
    point: LocationPoint,
    data: &StepData,
) -> Result<()> {
    let user_id = ctx.user_id();
    debug!(user_id = %user_id, step = %step.step, city = %point.city, "Location accepted");

    match step.step {
        Step::RideFromLocation | Step::PostFromLocation => {
            let next_step = if step.step == Step::RideFromLocation {
                Step::RideToLocation
            } else {
                Step::PostToLocation
            };
            ctx.state()
                .replace(
                    user_id,
                    next_step,
                    step_data([(keys::FROM_LOCATION, point.to_value())]),
                )
                .await?;
            match LocationStep::for_step(next_step) {
                Some(next) => prompt_location(ctx, &next, Some(&point.city)).await,
                None => Ok(()),
            }
        }
        Step::RideToLocation | Step::PostToLocation => {
            let Some(origin) = read_key::<LocationPoint>(data, keys::FROM_LOCATION) else {
                warn!(user_id = %user_id, step = %step.step, "Origin missing from state, restarting flow");
                let origin_step = step.previous.unwrap_or(Step::RideFromLocation);
                return start_location_flow(ctx, origin_step).await;
            };

            if step.step == Step::RideToLocation {
                let draft = BookingDraft::new(origin, point);
                ctx.state()
                    .replace(user_id, Step::RideTripDetails, draft.to_data())
                    .await?;
                show_trip_details(ctx, &draft).await
            } else {
                post_flow::show_confirmation(ctx, origin, point).await
            }
        }
        _ => Ok(()),
    }
}

/// Render the trip details screen for `draft`
pub async fn show_trip_details(ctx: &HandlerContext, draft: &BookingDraft) -> Result<()> {
    let from_name = ctx.city_name(&draft.from_location.city).await?;
    let to_name = ctx.city_name(&draft.to_location.city).await?;
    let text = format_trip_details(ctx.translator(), &ctx.language, draft, &from_name, &to_name);
    ctx.show(
        &text,
        Some(trip_details_keyboard(ctx.translator(), &ctx.language, draft)),
    )
    .await?;
    Ok(())
}

/// Step handler for `RideTripDetails` (`details:*` callbacks)
pub async fn handle_trip_details(ctx: HandlerContext) -> Result<()> {
    let Some(callback) = ctx.event.callback() else {
        return Ok(());
    };
    let user_id = ctx.user_id();

    let data = ctx.state().get_data(user_id).await?;
    let Some(mut draft) = BookingDraft::from_data(&data) else {
        warn!(user_id = %user_id, "Trip details without a draft, restarting ride");
        return start_location_flow(&ctx, Step::RideFromLocation).await;
    };
    let before = draft.clone();

    match (callback.value.as_deref(), callback.param.as_deref()) {
        (Some("passenger"), Some(count)) => match count.parse::<u8>() {
            Ok(count) => draft.set_passenger(count),
            Err(_) => return Ok(()),
        },
        (Some("woman"), Some(flag)) => match flag.parse::<bool>() {
            Ok(flag) => draft.set_has_woman(flag),
            Err(_) => return Ok(()),
        },
        (Some("class"), Some(class)) => match class.parse::<TravelClass>() {
            Ok(class) => draft.set_travel_class(class),
            Err(_) => return Ok(()),
        },
        (Some("confirm"), _) => return confirm_ride(&ctx, &draft).await,
        (Some("back"), _) => {
            ctx.state().clear(user_id).await?;
            return show_order_menu(&ctx).await;
        }
        _ => {
            debug!(user_id = %user_id, data = ?ctx.event.callback_data(), "Unknown trip details action");
            return Ok(());
        }
    }

    // editing a message to identical content is rejected by the client API
    if draft == before {
        return Ok(());
    }

    ctx.state()
        .set_step(user_id, Step::RideTripDetails, draft.to_data())
        .await?;
    show_trip_details(&ctx, &draft).await
}

/// Submit the ride. The state is cleared only once the backend accepted it.
async fn confirm_ride(ctx: &HandlerContext, draft: &BookingDraft) -> Result<()> {
    let user_id = ctx.user_id();
    let travel = NewTravel::from_draft(user_id, draft);
    let created = ctx.services.backend.create_travel(&travel).await?;

    ctx.state().clear(user_id).await?;
    info!(
        user_id = %user_id,
        order_id = %created.order_id,
        from = %draft.from_location.city,
        to = %draft.to_location.city,
        travel_class = %draft.travel_class,
        passengers = draft.passenger,
        price = draft.price,
        "Ride requested"
    );

    ctx.show(
        &ctx.t("searching-drivers"),
        Some(cancel_order_keyboard(
            ctx.translator(),
            &ctx.language,
            created.order_id,
            "restart",
        )),
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_steps() {
        let from = LocationStep::for_step(Step::RideFromLocation).unwrap();
        assert!(from.with_gps);
        assert!(!from.is_destination());

        let to = LocationStep::for_step(Step::PostToLocation).unwrap();
        assert_eq!(to.previous, Some(Step::PostFromLocation));
        assert!(to.is_destination());
        assert!(!to.with_gps);

        assert!(LocationStep::for_step(Step::RideTripDetails).is_none());
        assert!(LocationStep::for_step(Step::SmsCode).is_none());
    }
}
