use crate::services::{
    PageContext, PlatformError, PlatformService, ServiceResult, Tier, UserRecord, ensure,
};
use crate::session::{hash_password, load_user_into_context};
use chrono::Utc;

fn looks_like_email(raw: &str) -> bool {
    let raw = raw.trim();
    let Some(at) = raw.find('@') else { return false };
    let (local, domain) = raw.split_at(at);
    let domain = &domain[1..];
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

/// Creates the account, grants the signup token bonus, and signs the new
/// member in. Blacklisted emails are refused before anything is written.
pub fn signup<S: PlatformService>(
    service: &S,
    ctx: &mut PageContext,
    email: &str,
    username: &str,
    password: &str,
) -> ServiceResult<String> {
    let email = email.trim().to_lowercase();
    ensure(
        looks_like_email(&email),
        PlatformError::Validation("invalid_email".into()),
    )?;
    ensure(
        username.trim().len() >= 3,
        PlatformError::Validation("username_too_short".into()),
    )?;
    if service.is_email_banned(&email)? {
        return Err(PlatformError::PermissionDenied("email_blacklisted".into()));
    }
    let hashed = hash_password(password)?;
    let signup_tokens = ctx.settings.int("signup_tokens").unwrap_or(100);
    let user = UserRecord {
        email: email.clone(),
        username: username.trim().to_string(),
        password: hashed,
        tier: Tier::Snail,
        tokens: signup_tokens,
        review_banned: false,
        created_at: Utc::now(),
    };
    service.create_user(user.clone())?;
    load_user_into_context(ctx, &user);
    let token = service.create_session(&email)?;
    ctx.local_store.set("session_token", token.as_str());
    ctx.context.set("authenticated", true);
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{InMemoryService, PageContext};
    use crate::session::verify_password_hash;

    #[test]
    fn signup_creates_snail_with_bonus() {
        let service = InMemoryService::default();
        let mut ctx = PageContext::default();
        signup(
            &service,
            &mut ctx,
            "dora@example.com",
            "dora",
            "hunter22",
        )
        .unwrap();
        let user = service.find_user("dora@example.com").unwrap().unwrap();
        assert_eq!(user.tier, Tier::Snail);
        assert_eq!(user.tokens, 100);
        assert!(verify_password_hash("hunter22", &user.password));
        assert!(ctx.local_store.contains("session_token"));
    }

    #[test]
    fn signup_rejects_blacklisted_email() {
        let service = InMemoryService::default();
        let mut ctx = PageContext::default();
        let result = signup(
            &service,
            &mut ctx,
            "spammer@example.com",
            "spam",
            "hunter22",
        );
        assert!(matches!(result, Err(PlatformError::PermissionDenied(_))));
    }

    #[test]
    fn signup_validates_inputs() {
        let service = InMemoryService::default();
        let mut ctx = PageContext::default();
        assert!(signup(&service, &mut ctx, "not-an-email", "dora", "hunter22").is_err());
        assert!(signup(&service, &mut ctx, "dora@example.com", "do", "hunter22").is_err());
        assert!(signup(&service, &mut ctx, "dora@example.com", "dora", "tiny").is_err());
    }

    #[test]
    fn duplicate_email_is_a_conflict() {
        let service = InMemoryService::default();
        let mut ctx = PageContext::default();
        let result = signup(
            &service,
            &mut ctx,
            "alice@example.com",
            "alice2",
            "hunter22",
        );
        assert!(matches!(result, Err(PlatformError::Conflict(_))));
    }
}
