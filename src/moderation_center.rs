use crate::logging::log_action;
use crate::security::require_admin;
use crate::services::{
    PageContext, PlatformError, PlatformService, ReportedReviewEntry, ReviewRecord, ServiceResult,
};
use serde_json::json;

/// Queue sort orders. Default is most-reported first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueSort {
    ReportCount,
    Newest,
}

impl QueueSort {
    pub fn from_request(ctx: &PageContext) -> Self {
        match ctx.request.string("sort").as_deref() {
            Some("newest") => QueueSort::Newest,
            _ => QueueSort::ReportCount,
        }
    }
}

/// "Keep" is off the table once a review's author has been penalized;
/// the only way out is removal or lifting the ban itself.
pub fn keep_disabled(review: &ReviewRecord) -> bool {
    review.penalized
}

/// Numbered, display-ready report reasons ("1. Spam", "2. Spoilers").
pub fn numbered_reasons(review: &ReviewRecord) -> Vec<String> {
    review
        .report_reasons
        .iter()
        .enumerate()
        .map(|(index, reason)| format!("{}. {reason}", index + 1))
        .collect()
}

pub struct ModerationQueue<S: PlatformService + Clone> {
    service: S,
}

impl<S: PlatformService + Clone> ModerationQueue<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    /// Gathers reported reviews across the whole catalog. A movie whose
    /// review listing fails is logged and skipped so one broken folder
    /// can't blank the entire queue.
    pub fn list_reported(
        &self,
        ctx: &mut PageContext,
        sort: QueueSort,
    ) -> ServiceResult<Vec<ReportedReviewEntry>> {
        require_admin(ctx)?;
        let movies = self.service.list_movies()?;
        let mut entries = Vec::new();
        for movie in &movies {
            let reviews = match self.service.list_reviews(&movie.movie_name) {
                Ok(reviews) => reviews,
                Err(err) => {
                    tracing::warn!(
                        movie = %movie.movie_name,
                        error = %err,
                        "skipping movie while building report queue"
                    );
                    continue;
                }
            };
            for review in reviews {
                if review.reported {
                    entries.push(ReportedReviewEntry {
                        movie_title: movie.title.clone(),
                        review,
                    });
                }
            }
        }
        match sort {
            QueueSort::ReportCount => entries.sort_by(|a, b| {
                b.review
                    .report_count
                    .cmp(&a.review.report_count)
                    .then(b.review.date.cmp(&a.review.date))
            }),
            QueueSort::Newest => entries.sort_by(|a, b| b.review.date.cmp(&a.review.date)),
        }
        ctx.context.set("reported_reviews", &entries);
        Ok(entries)
    }

    /// Resolves a reported review: keep it (flags cleared, counter reset)
    /// or remove it for good. Keep is refused for penalized authors even
    /// when the UI never offered the button.
    pub fn handle_reported_review(
        &self,
        ctx: &mut PageContext,
        movie_name: &str,
        author: &str,
        remove: bool,
    ) -> ServiceResult<()> {
        require_admin(ctx)?;
        if !remove {
            let reviews = self.service.list_reviews(movie_name)?;
            let review = reviews
                .iter()
                .find(|review| review.email.eq_ignore_ascii_case(author))
                .ok_or_else(|| {
                    PlatformError::NotFound(format!("review by {author} on {movie_name}"))
                })?;
            if keep_disabled(review) {
                return Err(PlatformError::PermissionDenied(
                    "keep_unavailable_for_penalized".into(),
                ));
            }
        }
        self.service.resolve_review(movie_name, author, remove)?;
        log_action(
            &self.service,
            ctx,
            if remove { "review_removed" } else { "review_kept" },
            json!({"movie": movie_name, "author": author}),
        )?;
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
    fn queue_requires_admin() {
        let service = InMemoryService::default();
        let queue = ModerationQueue::new(service);
        let mut ctx = PageContext::default();
        assert!(queue
            .list_reported(&mut ctx, QueueSort::ReportCount)
            .is_err());
    }

    #[test]
    fn queue_sorts_by_report_count() {
        let service = InMemoryService::default();
        let queue = ModerationQueue::new(service);
        let mut ctx = admin_ctx();
        let entries = queue
            .list_reported(&mut ctx, QueueSort::ReportCount)
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].review.email, "mallory@example.com");
        assert_eq!(entries[0].review.report_count, 5);
        assert_eq!(entries[1].review.email, "alice@example.com");
    }

    #[test]
    fn broken_movie_is_skipped_not_fatal() {
        let service = InMemoryService::default();
        service.poison_reviews("the-slug-prince");
        let queue = ModerationQueue::new(service);
        let mut ctx = admin_ctx();
        let entries = queue
            .list_reported(&mut ctx, QueueSort::ReportCount)
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].review.email, "alice@example.com");
    }

    #[test]
    fn keep_clears_report_state() {
        let service = InMemoryService::default();
        let queue = ModerationQueue::new(service.clone());
        let mut ctx = admin_ctx();
        queue
            .handle_reported_review(&mut ctx, "garden-after-rain", "alice@example.com", false)
            .unwrap();
        let reviews = service.list_reviews("garden-after-rain").unwrap();
        assert!(!reviews[0].reported);
        assert_eq!(reviews[0].report_count, 0);
    }

    #[test]
    fn keep_is_refused_for_penalized_authors() {
        let service = InMemoryService::default();
        let queue = ModerationQueue::new(service.clone());
        let mut ctx = admin_ctx();
        let result =
            queue.handle_reported_review(&mut ctx, "the-slug-prince", "mallory@example.com", false);
        assert!(matches!(result, Err(PlatformError::PermissionDenied(_))));
        // still reported, nothing was cleared
        let reviews = service.list_reviews("the-slug-prince").unwrap();
        let penalized = reviews
            .iter()
            .find(|review| review.email == "mallory@example.com")
            .unwrap();
        assert!(penalized.reported && penalized.penalized);
    }

    #[test]
    fn remove_also_works_for_penalized_authors() {
        let service = InMemoryService::default();
        let queue = ModerationQueue::new(service.clone());
        let mut ctx = admin_ctx();
        queue
            .handle_reported_review(&mut ctx, "the-slug-prince", "mallory@example.com", true)
            .unwrap();
        let reviews = service.list_reviews("the-slug-prince").unwrap();
        assert!(reviews
            .iter()
            .all(|review| review.email != "mallory@example.com"));
    }

    #[test]
    fn reasons_are_numbered_for_display() {
        let service = InMemoryService::default();
        let reviews = service.list_reviews("garden-after-rain").unwrap();
        let numbered = numbered_reasons(&reviews[0]);
        assert_eq!(numbered, vec!["1. Spoilers", "2. Abusive language"]);
    }
}
