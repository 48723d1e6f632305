//! Command Handlers module for processing bot commands

use anyhow::Result;
use tracing::{debug, info};

use super::phone_verification::ask_for_phone;
use super::ui_builder::{back_keyboard, language_keyboard, main_menu_keyboard};
use super::{DispatchStats, HandlerContext};
use crate::backend::models::{NewUser, Passenger};

/// Phone prompt for users without a verified number, main menu otherwise
pub async fn show_entry_screen(ctx: &HandlerContext) -> Result<()> {
    let passenger = ctx.services.backend.get_passenger(ctx.user_id()).await?;
    render_entry_screen(ctx, passenger.as_ref()).await
}

async fn render_entry_screen(ctx: &HandlerContext, passenger: Option<&Passenger>) -> Result<()> {
    match passenger {
        Some(passenger) if passenger.has_phone() => {
            render_main_menu(ctx, &ctx.greeting_name(Some(passenger))).await
        }
        _ => {
            debug!(user_id = %ctx.user_id(), "No verified phone, asking for contact");
            ask_for_phone(ctx).await
        }
    }
}

/// Greeting with the main menu
pub async fn show_main_menu(ctx: &HandlerContext) -> Result<()> {
    let name = ctx.display_name().await?;
    render_main_menu(ctx, &name).await
}

pub async fn render_main_menu(ctx: &HandlerContext, name: &str) -> Result<()> {
    ctx.show(
        &ctx.t_args("main-menu", &[("name", name)]),
        Some(main_menu_keyboard(ctx.translator(), &ctx.language)),
    )
    .await?;
    Ok(())
}

/// Handle the /start command
pub async fn handle_start_command(ctx: HandlerContext) -> Result<()> {
    let user_id = ctx.user_id();
    let backend = &ctx.services.backend;
    let user = match backend.get_user(user_id).await? {
        Some(user) => user,
        None => {
            let new_user = NewUser {
                telegram_id: user_id,
                username: ctx.event.username.clone(),
                full_name: ctx.event.full_name.clone(),
                language: ctx.language.clone(),
            };
            let created = backend.create_user(&new_user).await?;
            info!(user_id = %user_id, language = %created.language, "Registered new user");
            created
        }
    };

    if ctx.translator().is_supported(&user.language) {
        ctx.services.cache.store_language(user_id, &user.language);
    }
    let passenger = backend.get_passenger(user_id).await?;

    // any unfinished flow is dropped only once the backend has answered
    ctx.state().clear(user_id).await?;
    render_entry_screen(&ctx, passenger.as_ref()).await
}

/// Handle the /language command
pub async fn handle_language_command(ctx: HandlerContext) -> Result<()> {
    ctx.send(
        &ctx.t("select-language"),
        Some(language_keyboard(ctx.translator())),
    )
    .await?;
    Ok(())
}

/// Handle the /help command
pub async fn handle_help_command(ctx: HandlerContext) -> Result<()> {
    ctx.show(
        &ctx.t("help-text"),
        Some(back_keyboard(ctx.translator(), &ctx.language, "back")),
    )
    .await?;
    Ok(())
}

/// Handle the /stats command (admin only)
pub async fn handle_stats_command(ctx: HandlerContext) -> Result<()> {
    let stats = &ctx.services.stats;
    let active = ctx.state().active_conversations().await?;

    let handled = DispatchStats::get(&stats.handled).to_string();
    let failed = DispatchStats::get(&stats.failed).to_string();
    let dropped = DispatchStats::get(&stats.dropped).to_string();
    let rate_limited = DispatchStats::get(&stats.rate_limited).to_string();
    let handlers = stats
        .registered_handlers
        .load(std::sync::atomic::Ordering::Relaxed)
        .to_string();
    let active = active.to_string();

    ctx.send(
        &ctx.t_args(
            "stats-text",
            &[
                ("handlers", &handlers),
                ("active", &active),
                ("handled", &handled),
                ("failed", &failed),
                ("dropped", &dropped),
                ("rate_limited", &rate_limited),
            ],
        ),
        None,
    )
    .await?;
    Ok(())
}
