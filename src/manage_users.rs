use crate::logging::log_action;
use crate::security::require_admin;
use crate::services::{
    AdminRecord, PageContext, PlatformError, PlatformService, ServiceResult, Tier,
};
use crate::session::hash_password;
use serde_json::json;

pub fn list_users<S: PlatformService>(service: &S, ctx: &mut PageContext) -> ServiceResult<()> {
    require_admin(ctx)?;
    let users = service.list_users()?;
    ctx.context.set("users", users);
    Ok(())
}

pub fn delete_user<S: PlatformService>(
    service: &S,
    ctx: &mut PageContext,
    email: &str,
) -> ServiceResult<()> {
    require_admin(ctx)?;
    service.delete_user(email)?;
    service.revoke_sessions(email)?;
    log_action(service, ctx, "user_deleted", json!({"email": email}))?;
    Ok(())
}

/// Admins can set any tier directly, upward or downward, no payment
/// involved.
pub fn set_user_tier<S: PlatformService>(
    service: &S,
    ctx: &mut PageContext,
    email: &str,
    tier_raw: &str,
) -> ServiceResult<()> {
    require_admin(ctx)?;
    let tier: Tier = tier_raw.parse()?;
    service
        .find_user(email)?
        .ok_or_else(|| PlatformError::NotFound(format!("user {email}")))?;
    service.set_tier(email, tier)?;
    log_action(
        service,
        ctx,
        "tier_changed",
        json!({"email": email, "tier": tier}),
    )?;
    Ok(())
}

/// Promotes a member to the back office. The admin credential is a
/// separate record; the member account keeps working as before.
pub fn make_admin<S: PlatformService>(
    service: &S,
    ctx: &mut PageContext,
    email: &str,
    password: &str,
) -> ServiceResult<()> {
    require_admin(ctx)?;
    service
        .find_user(email)?
        .ok_or_else(|| PlatformError::NotFound(format!("user {email}")))?;
    let hashed = hash_password(password)?;
    service.create_admin(AdminRecord {
        email: email.to_lowercase(),
        password: hashed,
    })?;
    log_action(service, ctx, "admin_created", json!({"email": email}))?;
    Ok(())
}

pub fn grant_tokens<S: PlatformService>(
    service: &S,
    ctx: &mut PageContext,
    email: &str,
    amount: i64,
) -> ServiceResult<()> {
    require_admin(ctx)?;
    if amount <= 0 {
        return Err(PlatformError::Validation("amount_must_be_positive".into()));
    }
    let balance = service.adjust_tokens(email, amount)?;
    log_action(
        service,
        ctx,
        "tokens_granted",
        json!({"email": email, "amount": amount, "balance": balance}),
    )?;
    ctx.context.set("token_balance", balance);
    Ok(())
}
