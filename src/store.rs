use crate::security::require_member;
use crate::services::{
    PageContext, PlatformError, PlatformService, PurchaseKind, ServiceResult, Tier,
};
use serde_json::json;

/// Whether someone on `current` may buy an upgrade to `target`, and the
/// message shown on the disabled button when they may not.
pub fn tier_upgrade_eligibility(current: Tier, target: Tier) -> (bool, Option<String>) {
    if current == target {
        (false, Some("You already have this tier".into()))
    } else if current > target {
        (false, Some("You already have a higher tier".into()))
    } else {
        (true, None)
    }
}

/// Store front: every catalog entry, with rank items annotated with
/// whether this viewer can buy them.
pub fn catalog<S: PlatformService>(service: &S, ctx: &mut PageContext) -> ServiceResult<()> {
    let items = service.purchase_catalog()?;
    let mut listing = Vec::new();
    for item in items {
        let (can_purchase, message) = match (item.kind, item.rank_upgrade) {
            (PurchaseKind::Rank, Some(target)) => {
                if ctx.viewer.is_guest {
                    (false, Some("Sign in to upgrade".to_string()))
                } else {
                    tier_upgrade_eligibility(ctx.viewer.tier, target)
                }
            }
            _ => (true, None),
        };
        listing.push(json!({
            "item": item,
            "can_purchase": can_purchase,
            "message": message,
        }));
    }
    ctx.context.set("catalog", listing);
    ctx.context.set("token_balance", ctx.viewer.tokens);
    Ok(())
}

/// Stages an item for checkout. The staged blob sits in the local store
/// until payment completes or the member walks away.
pub fn stage_purchase<S: PlatformService>(
    service: &S,
    ctx: &mut PageContext,
    item_id: &str,
) -> ServiceResult<()> {
    require_member(ctx)?;
    let item = service
        .catalog_item(item_id)?
        .ok_or_else(|| PlatformError::NotFound(format!("catalog item {item_id}")))?;
    if let (PurchaseKind::Rank, Some(target)) = (item.kind, item.rank_upgrade) {
        let (ok, message) = tier_upgrade_eligibility(ctx.viewer.tier, target);
        if !ok {
            return Err(PlatformError::Validation(
                message.unwrap_or_else(|| "upgrade_unavailable".into()),
            ));
        }
    }
    // staged before pricing is even looked at; checkout validates pricing
    ctx.local_store.set("pending_purchase", json!({"item_id": item.id}));
    Ok(())
}

/// Reads back the staged item id, if any.
pub fn pending_purchase(ctx: &PageContext) -> Option<String> {
    ctx.local_store
        .get("pending_purchase")
        .and_then(|blob| blob.get("item_id"))
        .and_then(|id| id.as_str().map(String::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{InMemoryService, PageContext};
    use crate::session::load_user_into_context;

    fn member_ctx(service: &InMemoryService, email: &str) -> PageContext {
        let mut ctx = PageContext::default();
        let user = service.find_user(email).unwrap().unwrap();
        load_user_into_context(&mut ctx, &user);
        ctx
    }

    #[test]
    fn eligibility_messages() {
        let (ok, _) = tier_upgrade_eligibility(Tier::Snail, Tier::Slug);
        assert!(ok);
        let (ok, msg) = tier_upgrade_eligibility(Tier::Slug, Tier::Slug);
        assert!(!ok);
        assert_eq!(msg.unwrap(), "You already have this tier");
        let (ok, msg) = tier_upgrade_eligibility(Tier::BananaSlug, Tier::Slug);
        assert!(!ok);
        assert_eq!(msg.unwrap(), "You already have a higher tier");
    }

    #[test]
    fn catalog_annotates_rank_items_for_viewer() {
        let service = InMemoryService::default();
        let mut ctx = member_ctx(&service, "bob@example.com");
        catalog(&service, &mut ctx).unwrap();
        let listing = ctx.context.get("catalog").unwrap().as_array().unwrap();
        let slug_item = listing
            .iter()
            .find(|entry| entry["item"]["id"] == "rank-slug")
            .unwrap();
        assert_eq!(slug_item["can_purchase"], false);
        assert_eq!(slug_item["message"], "You already have this tier");
        let banana = listing
            .iter()
            .find(|entry| entry["item"]["id"] == "rank-banana-slug")
            .unwrap();
        assert_eq!(banana["can_purchase"], true);
    }

    #[test]
    fn guests_browse_but_cannot_stage() {
        let service = InMemoryService::default();
        let mut ctx = PageContext::default();
        catalog(&service, &mut ctx).unwrap();
        assert!(stage_purchase(&service, &mut ctx, "tokens-500").is_err());
    }

    #[test]
    fn staging_rejects_ineligible_upgrades() {
        let service = InMemoryService::default();
        let mut ctx = member_ctx(&service, "carol@example.com");
        let result = stage_purchase(&service, &mut ctx, "rank-slug");
        assert!(matches!(result, Err(PlatformError::Validation(_))));
        assert!(pending_purchase(&ctx).is_none());
    }

    #[test]
    fn staging_round_trips_through_local_store() {
        let service = InMemoryService::default();
        let mut ctx = member_ctx(&service, "alice@example.com");
        stage_purchase(&service, &mut ctx, "tokens-500").unwrap();
        assert_eq!(pending_purchase(&ctx).as_deref(), Some("tokens-500"));
    }
}
