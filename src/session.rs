use crate::security::is_not_blacklisted;
use crate::services::{
    PageContext, PlatformError, PlatformService, ServiceResult, UserRecord,
};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

/// Hash a password for storage (Argon2id).
pub fn hash_password(password: &str) -> ServiceResult<String> {
    if password.trim().len() < 6 {
        return Err(PlatformError::Validation("password_too_short".into()));
    }
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PlatformError::Internal(format!("hash_password failed: {e}")))?
        .to_string();
    Ok(hash)
}

pub fn verify_password_hash(password: &str, stored: &str) -> bool {
    if stored.is_empty() {
        return false;
    }
    if stored.starts_with("$argon2") {
        if let Ok(parsed) = PasswordHash::new(stored) {
            return Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok();
        }
    }
    password == stored
}

/// Member login. On success the session token lands in the local store
/// and the viewer is loaded into the context.
pub fn login<S: PlatformService>(
    service: &S,
    ctx: &mut PageContext,
    email: &str,
    password: &str,
) -> ServiceResult<String> {
    let user = service
        .find_user(email)?
        .ok_or_else(|| PlatformError::PermissionDenied("unknown_user".into()))?;
    if !verify_password_hash(password, &user.password) {
        return Err(PlatformError::PermissionDenied("bad_password".into()));
    }
    load_user_into_context(ctx, &user);
    is_not_blacklisted(service, ctx, true)?;
    let token = service.create_session(&user.email)?;
    ctx.local_store.set("session_token", token.as_str());
    ctx.context.set("authenticated", true);
    Ok(token)
}

/// Admin login against the separate admin credential table. The token
/// goes into its own local-store slot so member and admin sessions can
/// coexist.
pub fn admin_login<S: PlatformService>(
    service: &S,
    ctx: &mut PageContext,
    email: &str,
    password: &str,
) -> ServiceResult<String> {
    let admin = service
        .find_admin(email)?
        .ok_or_else(|| PlatformError::PermissionDenied("unknown_admin".into()))?;
    if !verify_password_hash(password, &admin.password) {
        return Err(PlatformError::PermissionDenied("bad_password".into()));
    }
    ctx.viewer.email = admin.email.clone();
    ctx.viewer.name = admin.email.clone();
    ctx.viewer.is_guest = false;
    ctx.viewer.is_admin = true;
    let token = service.create_session(&admin.email)?;
    ctx.local_store.set("admin_token", token.as_str());
    ctx.context.set("authenticated", true);
    Ok(token)
}

/// Resolves the stored session token back into a viewer. A missing or
/// stale token leaves the context as guest.
pub fn check_session<S: PlatformService>(
    service: &S,
    ctx: &mut PageContext,
) -> ServiceResult<bool> {
    let token = match ctx.local_store.string("session_token") {
        Some(token) => token,
        None => return Ok(false),
    };
    let email = match service.session_user(&token)? {
        Some(email) => email,
        None => {
            ctx.local_store.remove("session_token");
            return Ok(false);
        }
    };
    let user = match service.find_user(&email)? {
        Some(user) => user,
        None => {
            ctx.local_store.remove("session_token");
            return Ok(false);
        }
    };
    load_user_into_context(ctx, &user);
    Ok(true)
}

pub fn logout<S: PlatformService>(service: &S, ctx: &mut PageContext) -> ServiceResult<()> {
    if !ctx.viewer.is_guest {
        service.revoke_sessions(&ctx.viewer.email)?;
    }
    ctx.local_store.remove("session_token");
    ctx.local_store.remove("admin_token");
    ctx.context.set("authenticated", false);
    ctx.viewer = Default::default();
    Ok(())
}

pub fn load_user_into_context(ctx: &mut PageContext, user: &UserRecord) {
    ctx.viewer.email = user.email.clone();
    ctx.viewer.name = user.username.clone();
    ctx.viewer.is_guest = false;
    ctx.viewer.is_admin = false;
    ctx.viewer.tier = user.tier;
    ctx.viewer.tokens = user.tokens;
    ctx.viewer.review_banned = user.review_banned;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{InMemoryService, PageContext};

    #[test]
    fn login_success_stores_token() {
        let service = InMemoryService::default();
        let mut ctx = PageContext::default();
        login(&service, &mut ctx, "alice@example.com", "password1").unwrap();
        assert!(ctx.local_store.contains("session_token"));
        assert_eq!(ctx.viewer.name, "alice");
        assert!(!ctx.viewer.is_guest);
    }

    #[test]
    fn login_failure() {
        let service = InMemoryService::default();
        let mut ctx = PageContext::default();
        let result = login(&service, &mut ctx, "alice@example.com", "wrong");
        assert!(result.is_err());
        assert!(!ctx.local_store.contains("session_token"));
    }

    #[test]
    fn admin_login_uses_own_slot() {
        let service = InMemoryService::default();
        let mut ctx = PageContext::default();
        admin_login(&service, &mut ctx, "admin@cineslug.dev", "admin-secret").unwrap();
        assert!(ctx.local_store.contains("admin_token"));
        assert!(ctx.viewer.is_admin);
    }

    #[test]
    fn session_round_trip() {
        let service = InMemoryService::default();
        let mut ctx = PageContext::default();
        login(&service, &mut ctx, "bob@example.com", "password1").unwrap();
        let mut fresh = PageContext::default();
        fresh.local_store = ctx.local_store.clone();
        assert!(check_session(&service, &mut fresh).unwrap());
        assert_eq!(fresh.viewer.email, "bob@example.com");
    }

    #[test]
    fn logout_revokes_and_clears() {
        let service = InMemoryService::default();
        let mut ctx = PageContext::default();
        login(&service, &mut ctx, "bob@example.com", "password1").unwrap();
        logout(&service, &mut ctx).unwrap();
        assert!(!ctx.local_store.contains("session_token"));
        let mut fresh = PageContext::default();
        assert!(!check_session(&service, &mut fresh).unwrap());
    }

    #[test]
    fn hashed_passwords_verify() {
        let hash = hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password_hash("hunter22", &hash));
        assert!(!verify_password_hash("hunter23", &hash));
    }
}
