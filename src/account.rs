use crate::errors::fatal_error;
use crate::logging::log_action;
use crate::security::require_member;
use crate::services::{
    PageContext, PlatformError, PlatformService, ServiceResult, ensure,
};
use crate::session::hash_password;
use serde_json::json;

pub struct AccountController<S: PlatformService + Clone> {
    service: S,
}

impl<S: PlatformService + Clone> AccountController<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    /// Loads the signed-in member's profile into the context.
    pub fn profile(&self, ctx: &mut PageContext) -> ServiceResult<()> {
        require_member(ctx)?;
        let user = self
            .service
            .find_user(&ctx.viewer.email)?
            .ok_or_else(|| PlatformError::NotFound("account".into()))?;
        ctx.context.set(
            "profile",
            json!({
                "email": user.email,
                "username": user.username,
                "tier": user.tier,
                "tokens": user.tokens,
                "review_banned": user.review_banned,
                "member_since": user.created_at.to_rfc3339(),
            }),
        );
        Ok(())
    }

    /// Updates username and/or password. Empty fields are left alone.
    pub fn update(&self, ctx: &mut PageContext) -> ServiceResult<()> {
        require_member(ctx)?;
        let username = ctx
            .post_vars
            .string("username")
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
        if let Some(name) = &username {
            ensure(
                name.len() >= 3,
                PlatformError::Validation("username_too_short".into()),
            )?;
        }
        let password = match ctx.post_vars.string("password") {
            Some(raw) if !raw.trim().is_empty() => Some(hash_password(&raw)?),
            _ => None,
        };
        if username.is_none() && password.is_none() {
            return fatal_error(&self.service, ctx, "nothing_to_update");
        }
        let changed_username = username.is_some();
        let changed_password = password.is_some();
        let updated = self
            .service
            .update_user_profile(&ctx.viewer.email, username, password)?;
        ctx.viewer.name = updated.username.clone();
        ctx.context.set("profile_updated", true);
        log_action(
            &self.service,
            ctx,
            "profile_updated",
            json!({
                "username": changed_username,
                "password": changed_password,
            }),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{InMemoryService, PageContext};
    use crate::session::{load_user_into_context, verify_password_hash};

    fn member_ctx(service: &InMemoryService, email: &str) -> PageContext {
        let mut ctx = PageContext::default();
        let user = service.find_user(email).unwrap().unwrap();
        load_user_into_context(&mut ctx, &user);
        ctx
    }

    #[test]
    fn profile_requires_login() {
        let service = InMemoryService::default();
        let controller = AccountController::new(service);
        let mut ctx = PageContext::default();
        assert!(controller.profile(&mut ctx).is_err());
    }

    #[test]
    fn profile_exposes_balance_and_tier() {
        let service = InMemoryService::default();
        let mut ctx = member_ctx(&service, "carol@example.com");
        let controller = AccountController::new(service);
        controller.profile(&mut ctx).unwrap();
        let profile = ctx.context.get("profile").unwrap();
        assert_eq!(profile["tokens"], 2000);
        assert_eq!(profile["tier"], "banana_slug");
    }

    #[test]
    fn update_changes_password_hash() {
        let service = InMemoryService::default();
        let mut ctx = member_ctx(&service, "alice@example.com");
        ctx.post_vars.set("password", "new-secret");
        let controller = AccountController::new(service.clone());
        controller.update(&mut ctx).unwrap();
        let user = service.find_user("alice@example.com").unwrap().unwrap();
        assert!(verify_password_hash("new-secret", &user.password));
    }

    #[test]
    fn update_with_nothing_set_is_an_error() {
        let service = InMemoryService::default();
        let mut ctx = member_ctx(&service, "alice@example.com");
        let controller = AccountController::new(service);
        assert!(controller.update(&mut ctx).is_err());
    }
}
