use cineslug_rust::controller::ReviewController;
use cineslug_rust::moderation_center::{ModerationQueue, QueueSort};
use cineslug_rust::services::{InMemoryService, PageContext};
use cineslug_rust::session::login;

fn main() {
    let service = InMemoryService::default();
    let reviews = ReviewController::new(service.clone());
    let queue = ModerationQueue::new(service.clone());

    let mut ctx = PageContext::default();
    login(&service, &mut ctx, "alice@example.com", "password1").expect("sample login");
    ctx.post_vars.set("rating", 8.0);
    ctx.post_vars.set("title", "CLI example");
    ctx.post_vars.set("body", "Posted from the demo binary");

    match reviews.submit(&mut ctx, "night-of-the-snails") {
        Ok(()) => println!("review posted as {}", ctx.viewer.name),
        Err(err) => println!("review failed: {err}"),
    }

    let mut admin_ctx = PageContext::default();
    admin_ctx.viewer.is_guest = false;
    admin_ctx.viewer.is_admin = true;
    admin_ctx.viewer.email = "admin@cineslug.dev".into();
    match queue.list_reported(&mut admin_ctx, QueueSort::ReportCount) {
        Ok(entries) => {
            println!("{} reported review(s) in the queue:", entries.len());
            for entry in entries {
                println!(
                    "  {} on {} ({} report(s))",
                    entry.review.username, entry.movie_title, entry.review.report_count
                );
            }
        }
        Err(err) => println!("queue failed: {err}"),
    }
}
