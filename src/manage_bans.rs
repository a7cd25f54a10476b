use crate::logging::log_action;
use crate::security::require_admin;
use crate::services::{
    BannedEmailRecord, PageContext, PlatformError, PlatformService, ServiceResult,
};
use chrono::Utc;
use serde_json::json;

pub struct PenaltyController<S: PlatformService + Clone> {
    service: S,
}

impl<S: PlatformService + Clone> PenaltyController<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    /// Token fine. The amount is validated against the member's balance
    /// before the backend sees anything.
    pub fn remove_tokens(
        &self,
        ctx: &mut PageContext,
        email: &str,
        amount: i64,
    ) -> ServiceResult<i64> {
        require_admin(ctx)?;
        if amount <= 0 {
            return Err(PlatformError::Validation("amount_must_be_positive".into()));
        }
        let user = self
            .service
            .find_user(email)?
            .ok_or_else(|| PlatformError::NotFound(format!("user {email}")))?;
        if amount > user.tokens {
            return Err(PlatformError::Validation(format!(
                "cannot remove {amount} tokens, member has {}",
                user.tokens
            )));
        }
        let balance = self.service.adjust_tokens(email, -amount)?;
        log_action(
            &self.service,
            ctx,
            "tokens_removed",
            json!({"email": email, "amount": amount, "balance": balance}),
        )?;
        Ok(balance)
    }

    /// Flips the review ban on or off. Banning penalizes and hides the
    /// member's existing reviews; lifting it clears the penalty flags.
    pub fn toggle_review_ban(&self, ctx: &mut PageContext, email: &str) -> ServiceResult<bool> {
        require_admin(ctx)?;
        let user = self
            .service
            .find_user(email)?
            .ok_or_else(|| PlatformError::NotFound(format!("user {email}")))?;
        let now_banned = self.service.set_review_ban(email, !user.review_banned)?;
        log_action(
            &self.service,
            ctx,
            if now_banned {
                "review_ban_applied"
            } else {
                "review_ban_lifted"
            },
            json!({"email": email}),
        )?;
        Ok(now_banned)
    }

    /// The full ban: penalize the reviews, blacklist the email, kill the
    /// sessions, delete the account. Order matters; the blacklist entry
    /// is what outlives the account.
    pub fn full_ban(
        &self,
        ctx: &mut PageContext,
        email: &str,
        reason: Option<String>,
    ) -> ServiceResult<()> {
        require_admin(ctx)?;
        self.service
            .find_user(email)?
            .ok_or_else(|| PlatformError::NotFound(format!("user {email}")))?;
        self.service.set_review_ban(email, true)?;
        self.service.ban_email(BannedEmailRecord {
            email: email.to_lowercase(),
            banned_date: Utc::now(),
            banned_by: ctx.viewer.email.clone(),
            reason: reason.clone(),
        })?;
        self.service.revoke_sessions(email)?;
        self.service.delete_user(email)?;
        log_action(
            &self.service,
            ctx,
            "user_banned",
            json!({"email": email, "reason": reason}),
        )?;
        Ok(())
    }

    /// Removes an email from the blacklist. The deleted account does not
    /// come back; the address is merely allowed to register again.
    pub fn unban(&self, ctx: &mut PageContext, email: &str) -> ServiceResult<()> {
        require_admin(ctx)?;
        self.service.unban_email(email)?;
        log_action(&self.service, ctx, "user_unbanned", json!({"email": email}))?;
        Ok(())
    }

    pub fn banned_list(&self, ctx: &mut PageContext) -> ServiceResult<()> {
        require_admin(ctx)?;
        let banned = self.service.list_banned_emails()?;
        ctx.context.set("banned_emails", banned);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{InMemoryService, PageContext};

    fn admin_ctx() -> PageContext {
        let mut ctx = PageContext::default();
        ctx.viewer.is_guest = false;
        ctx.viewer.is_admin = true;
        ctx.viewer.email = "admin@cineslug.dev".into();
        ctx
    }

    #[test]
    fn fines_are_validated_against_balance() {
        let service = InMemoryService::default();
        let controller = PenaltyController::new(service.clone());
        let mut ctx = admin_ctx();
        assert!(controller
            .remove_tokens(&mut ctx, "alice@example.com", 0)
            .is_err());
        assert!(controller
            .remove_tokens(&mut ctx, "alice@example.com", 121)
            .is_err());
        let balance = controller
            .remove_tokens(&mut ctx, "alice@example.com", 120)
            .unwrap();
        assert_eq!(balance, 0);
    }

    #[test]
    fn review_ban_toggles_and_clears() {
        let service = InMemoryService::default();
        let controller = PenaltyController::new(service.clone());
        let mut ctx = admin_ctx();
        assert!(controller
            .toggle_review_ban(&mut ctx, "bob@example.com")
            .unwrap());
        let reviews = service.list_reviews("the-slug-prince").unwrap();
        let bobs = reviews
            .iter()
            .find(|review| review.email == "bob@example.com")
            .unwrap();
        assert!(bobs.penalized && bobs.hidden);
        assert!(!controller
            .toggle_review_ban(&mut ctx, "bob@example.com")
            .unwrap());
        let reviews = service.list_reviews("the-slug-prince").unwrap();
        let bobs = reviews
            .iter()
            .find(|review| review.email == "bob@example.com")
            .unwrap();
        assert!(!bobs.penalized);
    }

    #[test]
    fn full_ban_blacklists_and_deletes() {
        let service = InMemoryService::default();
        let token = service.create_session("mallory@example.com").unwrap();
        let controller = PenaltyController::new(service.clone());
        let mut ctx = admin_ctx();
        controller
            .full_ban(&mut ctx, "mallory@example.com", Some("Spam".into()))
            .unwrap();
        assert!(service.find_user("mallory@example.com").unwrap().is_none());
        assert!(service.is_email_banned("mallory@example.com").unwrap());
        assert!(service.session_user(&token).unwrap().is_none());
        // the penalized review survives the account
        let reviews = service.list_reviews("the-slug-prince").unwrap();
        assert!(reviews
            .iter()
            .any(|review| review.email == "mallory@example.com" && review.penalized));
    }

    #[test]
    fn unban_frees_the_address_only() {
        let service = InMemoryService::default();
        let controller = PenaltyController::new(service.clone());
        let mut ctx = admin_ctx();
        controller.unban(&mut ctx, "spammer@example.com").unwrap();
        assert!(!service.is_email_banned("spammer@example.com").unwrap());
        assert!(service.find_user("spammer@example.com").unwrap().is_none());
        assert!(controller.unban(&mut ctx, "spammer@example.com").is_err());
    }

    #[test]
    fn banned_list_is_admin_only() {
        let service = InMemoryService::default();
        let controller = PenaltyController::new(service);
        let mut ctx = PageContext::default();
        assert!(controller.banned_list(&mut ctx).is_err());
        let mut ctx = admin_ctx();
        controller.banned_list(&mut ctx).unwrap();
        let banned = ctx.context.get("banned_emails").unwrap().as_array().unwrap();
        assert_eq!(banned.len(), 1);
    }
}
