//! Parcel post flow: `PostFromLocation → PostToLocation → PostConfirm`.
//!
//! Location steps are handled by [`super::booking_flow`]; this module owns
//! the fee confirmation.

use anyhow::Result;
use tracing::{info, warn};

use super::booking_flow::{guard_active_order, show_order_menu, start_location_flow};
use super::ui_builder::{cancel_order_keyboard, parcel_confirm_keyboard};
use super::HandlerContext;
use crate::backend::models::NewPost;
use crate::dialogue::{LocationPoint, PostDraft, Step};
use crate::pricing::format_amount;

/// `post` and `re_post`: new parcel unless an order is still running
pub async fn handle_send_parcel(ctx: HandlerContext) -> Result<()> {
    if guard_active_order(&ctx).await? {
        return Ok(());
    }
    start_location_flow(&ctx, Step::PostFromLocation).await
}

/// Store the draft and ask to confirm the fee
pub async fn show_confirmation(
    ctx: &HandlerContext,
    from_location: LocationPoint,
    to_location: LocationPoint,
) -> Result<()> {
    let draft = PostDraft::new(from_location, to_location);
    ctx.state()
        .replace(ctx.user_id(), Step::PostConfirm, draft.to_data())
        .await?;

    let price = format_amount(draft.price);
    ctx.show(
        &ctx.t_args("parcel-price-confirm", &[("price", &price)]),
        Some(parcel_confirm_keyboard(ctx.translator(), &ctx.language)),
    )
    .await?;
    Ok(())
}

/// Step handler for `PostConfirm` (`parcel:*` callbacks)
pub async fn handle_post_confirm(ctx: HandlerContext) -> Result<()> {
    let Some(callback) = ctx.event.callback() else {
        return Ok(());
    };
    let user_id = ctx.user_id();

    match callback.value.as_deref() {
        Some("confirm") => {
            let data = ctx.state().get_data(user_id).await?;
            let Some(draft) = PostDraft::from_data(&data) else {
                warn!(user_id = %user_id, "Parcel confirmation without a draft, restarting");
                return start_location_flow(&ctx, Step::PostFromLocation).await;
            };

            let created = ctx
                .services
                .backend
                .create_post(&NewPost::from_draft(user_id, &draft))
                .await?;
            ctx.state().clear(user_id).await?;
            info!(
                user_id = %user_id,
                order_id = %created.order_id,
                from = %draft.from_location.city,
                to = %draft.to_location.city,
                price = draft.price,
                "Parcel post requested"
            );

            ctx.show(
                &ctx.t("parcel-searching"),
                Some(cancel_order_keyboard(
                    ctx.translator(),
                    &ctx.language,
                    created.order_id,
                    "re_post",
                )),
            )
            .await?;
            Ok(())
        }
        Some("cancel") => {
            ctx.state().clear(user_id).await?;
            show_order_menu(&ctx).await
        }
        _ => Ok(()),
    }
}
