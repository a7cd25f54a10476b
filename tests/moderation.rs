use cineslug_rust::controller::ReviewController;
use cineslug_rust::manage_bans::PenaltyController;
use cineslug_rust::moderation_center::{ModerationQueue, QueueSort};
use cineslug_rust::services::{InMemoryService, PageContext, PlatformError, PlatformService};
use cineslug_rust::session::load_user_into_context;

fn admin_ctx() -> PageContext {
    let mut ctx = PageContext::default();
    ctx.viewer.is_guest = false;
    ctx.viewer.is_admin = true;
    ctx.viewer.email = "admin@cineslug.dev".into();
    ctx
}

fn member_ctx(service: &InMemoryService, email: &str) -> PageContext {
    let mut ctx = PageContext::default();
    let user = service.find_user(email).unwrap().unwrap();
    load_user_into_context(&mut ctx, &user);
    ctx
}

#[test]
fn review_round_trip_preserves_literal_values() {
    let service = InMemoryService::new_with_sample();
    let controller = ReviewController::new(service.clone());
    let mut ctx = member_ctx(&service, "alice@example.com");
    ctx.post_vars.set("rating", 7.5);
    ctx.post_vars.set("title", "Shell shocked");
    ctx.post_vars.set("body", "Exactly the pace I wanted; the rain scene lingers.");
    controller.submit(&mut ctx, "night-of-the-snails").unwrap();

    let reviews = service.list_reviews("night-of-the-snails").unwrap();
    let matching: Vec<_> = reviews
        .iter()
        .filter(|review| {
            review.email == "alice@example.com"
                && review.rating == 7.5
                && review.title == "Shell shocked"
                && review.body == "Exactly the pace I wanted; the rain scene lingers."
        })
        .collect();
    assert_eq!(matching.len(), 1);
}

#[test]
fn reporting_flows_into_the_queue() {
    let service = InMemoryService::new_with_sample();
    let controller = ReviewController::new(service.clone());
    let mut ctx = member_ctx(&service, "alice@example.com");
    ctx.post_vars.set("reason", "Plot spoilers in the first line");
    controller
        .report(&mut ctx, "banana-harvest", "carol@example.com")
        .unwrap();

    let queue = ModerationQueue::new(service);
    let mut admin = admin_ctx();
    let entries = queue.list_reported(&mut admin, QueueSort::ReportCount).unwrap();
    assert!(entries.iter().any(|entry| {
        entry.review.email == "carol@example.com"
            && entry
                .review
                .report_reasons
                .contains(&"Plot spoilers in the first line".to_string())
    }));
}

#[test]
fn queue_sorts_newest_first_when_asked() {
    let service = InMemoryService::new_with_sample();
    let queue = ModerationQueue::new(service);
    let mut admin = admin_ctx();
    let entries = queue.list_reported(&mut admin, QueueSort::Newest).unwrap();
    for pair in entries.windows(2) {
        assert!(pair[0].review.date >= pair[1].review.date);
    }
}

#[test]
fn penalized_keep_is_blocked_at_the_controller() {
    let service = InMemoryService::new_with_sample();
    let queue = ModerationQueue::new(service.clone());
    let mut admin = admin_ctx();
    let result =
        queue.handle_reported_review(&mut admin, "the-slug-prince", "mallory@example.com", false);
    assert!(matches!(result, Err(PlatformError::PermissionDenied(_))));
    let reviews = service.list_reviews("the-slug-prince").unwrap();
    let review = reviews
        .iter()
        .find(|review| review.email == "mallory@example.com")
        .unwrap();
    assert!(review.reported, "nothing should have been cleared");
}

#[test]
fn token_fines_validate_before_touching_the_backend() {
    let service = InMemoryService::new_with_sample();
    let controller = PenaltyController::new(service.clone());
    let mut admin = admin_ctx();

    assert!(controller
        .remove_tokens(&mut admin, "alice@example.com", -5)
        .is_err());
    assert!(controller
        .remove_tokens(&mut admin, "alice@example.com", 10_000)
        .is_err());
    let user = service.find_user("alice@example.com").unwrap().unwrap();
    assert_eq!(user.tokens, 120, "failed fines must not move the balance");
}

#[test]
fn full_ban_locks_the_email_out_of_signup() {
    let service = InMemoryService::new_with_sample();
    let controller = PenaltyController::new(service.clone());
    let mut admin = admin_ctx();
    controller
        .full_ban(&mut admin, "mallory@example.com", Some("Spam".into()))
        .unwrap();

    let mut ctx = PageContext::default();
    let result = cineslug_rust::register::signup(
        &service,
        &mut ctx,
        "mallory@example.com",
        "mallory2",
        "hunter22",
    );
    assert!(matches!(result, Err(PlatformError::PermissionDenied(_))));
}
