//! Phone verification: `PhoneContact → SmsCode`.
//!
//! The number comes from a shared contact or typed text, the backend sends a
//! one-time code, and the passenger profile is created once the user types
//! that code back.

use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::command_handlers::show_main_menu;
use super::ui_builder::{phone_request_keyboard, Keyboard};
use super::HandlerContext;
use crate::backend::models::NewPassenger;
use crate::dialogue::{keys, read_key, step_data, Step, StepData};
use crate::errors::error_logging;
use crate::validation::{
    PhoneValidator, TextValidator, ValidationContext, ValidationResult, Validated, Validator,
};

lazy_static! {
    static ref SMS_CODE_PATTERN: Regex = Regex::new(r"^\d{4,6}$").expect("Invalid SMS code regex");
}

const INVALID_SMS_CODE: &str = "errors-invalid-sms-code";

/// Enter `PhoneContact` and show the share-contact keyboard
pub async fn ask_for_phone(ctx: &HandlerContext) -> Result<()> {
    ctx.state()
        .replace(ctx.user_id(), Step::PhoneContact, StepData::new())
        .await?;
    ctx.send(
        &ctx.t("ask-phone-number"),
        Some(phone_request_keyboard(ctx.translator(), &ctx.language)),
    )
    .await?;
    Ok(())
}

/// Step handler for `PhoneContact`
pub async fn handle_phone_contact(ctx: HandlerContext) -> Result<()> {
    let Some(input) = ctx.event.validator_input() else {
        return Ok(());
    };
    let user_id = ctx.user_id();
    let validation_ctx = ValidationContext::new(ctx.translator(), &ctx.language);

    match Validator::Phone(PhoneValidator)
        .validate(&input, &validation_ctx)
        .await?
    {
        ValidationResult::Success(Validated::Phone(phone)) => {
            let challenge = ctx.services.backend.send_sms_code(user_id, &phone).await?;
            ctx.state()
                .set_step(
                    user_id,
                    Step::SmsCode,
                    step_data([
                        (keys::PENDING_PHONE, phone.clone()),
                        (keys::SMS_CODE, challenge.code),
                    ]),
                )
                .await?;
            info!(user_id = %user_id, "Verification code sent");

            ctx.send(
                &ctx.t_args("sms-code-sent", &[("phone", &phone)]),
                Some(Keyboard::Remove),
            )
            .await?;
            Ok(())
        }
        ValidationResult::Success(other) => {
            warn!(user_id = %user_id, value = ?other, "Phone validator returned a non-phone value");
            Ok(())
        }
        // registration cannot be skipped, so every control label re-asks
        ValidationResult::Action(_) => ask_for_phone(&ctx).await,
        ValidationResult::Error(error) => {
            error_logging::log_validation_error(error.key, user_id, input.kind(), None);
            ctx.send(
                &error.message(ctx.translator(), &ctx.language),
                Some(phone_request_keyboard(ctx.translator(), &ctx.language)),
            )
            .await?;
            Ok(())
        }
    }
}

/// Step handler for `SmsCode`
pub async fn handle_sms_code(ctx: HandlerContext) -> Result<()> {
    let Some(input) = ctx.event.validator_input() else {
        return Ok(());
    };
    let user_id = ctx.user_id();
    let validator = Validator::Text(TextValidator {
        pattern: Some(SMS_CODE_PATTERN.clone()),
        ..TextValidator::default()
    });
    let validation_ctx = ValidationContext::new(ctx.translator(), &ctx.language);

    let code = match validator.validate(&input, &validation_ctx).await? {
        ValidationResult::Success(Validated::Text(code)) => code,
        ValidationResult::Success(_) => return Ok(()),
        ValidationResult::Action(_) => return ask_for_phone(&ctx).await,
        ValidationResult::Error(error) => {
            error_logging::log_validation_error(error.key, user_id, input.kind(), None);
            ctx.send(&ctx.t(INVALID_SMS_CODE), None).await?;
            return Ok(());
        }
    };

    let data = ctx.state().get_data(user_id).await?;
    let expected: Option<String> = read_key(&data, keys::SMS_CODE);
    let pending_phone: Option<String> = read_key(&data, keys::PENDING_PHONE);
    let (Some(expected), Some(phone)) = (expected, pending_phone) else {
        warn!(user_id = %user_id, "SMS code step without a pending phone, starting over");
        return ask_for_phone(&ctx).await;
    };

    if code != expected {
        error_logging::log_validation_error(INVALID_SMS_CODE, user_id, "text", None);
        ctx.send(&ctx.t(INVALID_SMS_CODE), None).await?;
        return Ok(());
    }

    let passenger = NewPassenger {
        telegram_id: user_id,
        full_name: ctx.event.full_name.clone(),
        phone,
    };
    ctx.services.backend.create_passenger(&passenger).await?;
    ctx.state().clear(user_id).await?;
    info!(user_id = %user_id, "Phone verified, passenger created");

    ctx.send(&ctx.t("phone-verified"), None).await?;
    show_main_menu(&ctx).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sms_code_pattern() {
        assert!(SMS_CODE_PATTERN.is_match("1234"));
        assert!(SMS_CODE_PATTERN.is_match("123456"));
        assert!(!SMS_CODE_PATTERN.is_match("123"));
        assert!(!SMS_CODE_PATTERN.is_match("12a4"));
    }
}
