use crate::security::is_not_blacklisted;
use crate::services::{PageContext, PlatformService, ServiceResult};

pub fn log_action<S: PlatformService>(
    service: &S,
    ctx: &mut PageContext,
    action: &str,
    details: serde_json::Value,
) -> ServiceResult<()> {
    is_not_blacklisted(service, ctx, false)?;
    let actor = if ctx.viewer.is_guest {
        None
    } else {
        Some(ctx.viewer.email.as_str())
    };
    service.log_action(action, actor, &details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{InMemoryService, PageContext, PlatformService};

    #[test]
    fn actions_record_the_actor() {
        let service = InMemoryService::default();
        let mut ctx = PageContext::default();
        ctx.viewer.is_guest = false;
        ctx.viewer.email = "alice@example.com".into();
        log_action(
            &service,
            &mut ctx,
            "profile_updated",
            serde_json::json!({"field": "username"}),
        )
        .unwrap();
        let logs = service.list_action_logs().unwrap();
        assert_eq!(logs.last().unwrap().actor.as_deref(), Some("alice@example.com"));
    }
}
