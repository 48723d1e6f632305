//! Menu callback handlers module
//!
//! Navigation between the main menu, the order menu and the language picker.

use anyhow::Result;
use tracing::{debug, info};

use crate::bot::booking_flow::{guard_active_order, show_order_menu, start_location_flow};
use crate::bot::command_handlers::{render_main_menu, show_entry_screen};
use crate::bot::HandlerContext;
use crate::dialogue::Step;

/// `lang:<code>`
pub async fn handle_language_selected(ctx: HandlerContext) -> Result<()> {
    let Some(code) = ctx.event.callback().and_then(|data| data.value) else {
        return Ok(());
    };
    if !ctx.translator().is_supported(&code) {
        debug!(user_id = %ctx.user_id(), language = %code, "Ignoring unsupported language");
        return Ok(());
    }

    let user_id = ctx.user_id();
    ctx.services
        .backend
        .update_user_language(user_id, &code)
        .await?;
    ctx.services.cache.invalidate_language(user_id);
    ctx.services.cache.store_language(user_id, &code);
    info!(user_id = %user_id, language = %code, "Language changed");

    let ctx = HandlerContext {
        language: code,
        ..ctx
    };
    show_entry_screen(&ctx).await
}

/// `order`
pub async fn handle_order(ctx: HandlerContext) -> Result<()> {
    show_order_menu(&ctx).await
}

/// `back` (main menu), `back:city` (order menu), `back:details` (new ride)
pub async fn handle_back(ctx: HandlerContext) -> Result<()> {
    let target = ctx.event.callback().and_then(|data| data.value);

    match target.as_deref() {
        Some("city") => {
            ctx.state().clear(ctx.user_id()).await?;
            show_order_menu(&ctx).await
        }
        // a new ride replaces the state itself
        Some("details") => {
            if guard_active_order(&ctx).await? {
                ctx.state().clear(ctx.user_id()).await?;
                return Ok(());
            }
            start_location_flow(&ctx, Step::RideFromLocation).await
        }
        _ => {
            let name = ctx.display_name().await?;
            ctx.state().clear(ctx.user_id()).await?;
            render_main_menu(&ctx, &name).await
        }
    }
}
