use crate::services::{PageContext, PlatformError, PlatformService, ServiceResult};
use chrono::Utc;

/// Blocks anyone whose email sits on the blacklist. Results are cached in
/// the session bag for a minute so listing pages don't re-check on every
/// fetch.
pub fn is_not_blacklisted<S: PlatformService>(
    service: &S,
    ctx: &mut PageContext,
    force: bool,
) -> ServiceResult<()> {
    if ctx.viewer.is_admin {
        return Ok(());
    }
    if ctx.viewer.is_guest {
        return Ok(());
    }
    let now = Utc::now().timestamp();
    if !force {
        if let Some(last) = ctx.session.int("blacklist_last_checked") {
            if now - last < 60 {
                if ctx.session.bool("blacklist_hit") {
                    return Err(PlatformError::PermissionDenied("banned".into()));
                }
                return Ok(());
            }
        }
    }
    ctx.session.set("blacklist_last_checked", now);
    if service.is_email_banned(&ctx.viewer.email)? {
        ctx.session.set("blacklist_hit", true);
        return Err(PlatformError::PermissionDenied("banned".into()));
    }
    ctx.session.remove("blacklist_hit");
    Ok(())
}

pub fn require_admin(ctx: &PageContext) -> ServiceResult<()> {
    if ctx.viewer.is_admin {
        Ok(())
    } else {
        Err(PlatformError::PermissionDenied("admin_required".into()))
    }
}

pub fn require_member(ctx: &PageContext) -> ServiceResult<()> {
    if ctx.viewer.is_guest {
        Err(PlatformError::PermissionDenied("login_required".into()))
    } else {
        Ok(())
    }
}

/// Client-side reaction to a 401: wipe the stored tokens and flip the
/// authenticated flag instead of surfacing a generic error.
pub fn invalidate_client_session(ctx: &mut PageContext) {
    ctx.local_store.remove("session_token");
    ctx.local_store.remove("admin_token");
    ctx.context.set("authenticated", false);
    ctx.viewer = Default::default();
}
