use crate::logging::log_action;
use crate::security::{invalidate_client_session, require_member};
use crate::services::{
    PageContext, PlatformError, PlatformService, ReviewRecord, ServiceResult, ensure,
};
use serde_json::json;

/// Ratings go from 0 to 10 in half-point steps.
fn valid_rating(rating: f64) -> bool {
    (0.0..=10.0).contains(&rating) && (rating * 2.0).fract() == 0.0
}

pub struct ReviewController<S: PlatformService + Clone> {
    service: S,
}

impl<S: PlatformService + Clone> ReviewController<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    /// Posts a new review. Guests and review-banned members are turned
    /// away before anything reaches the backend.
    pub fn submit(&self, ctx: &mut PageContext, movie_name: &str) -> ServiceResult<()> {
        require_member(ctx)?;
        ensure(
            !ctx.viewer.review_banned,
            PlatformError::PermissionDenied("review_banned".into()),
        )?;
        let rating = ctx
            .post_vars
            .float("rating")
            .ok_or_else(|| PlatformError::Validation("missing_rating".into()))?;
        ensure(
            valid_rating(rating),
            PlatformError::Validation("rating_out_of_range".into()),
        )?;
        let title = ctx.post_vars.string("title").unwrap_or_default();
        let body = ctx
            .post_vars
            .string("body")
            .map(|body| body.trim().to_string())
            .filter(|body| !body.is_empty())
            .ok_or_else(|| PlatformError::Validation("empty_review".into()))?;

        let mut review = ReviewRecord::new(movie_name, &ctx.viewer.email, &ctx.viewer.name);
        review.rating = rating;
        review.title = title.trim().to_string();
        review.body = body;
        self.service.create_review(review)?;

        log_action(
            &self.service,
            ctx,
            "review_posted",
            json!({"movie": movie_name, "rating": rating}),
        )?;
        ctx.context.set("review_posted", true);
        Ok(())
    }

    /// Like or dislike someone's review. A guest clicking these buttons
    /// gets their stale client state wiped and a session timeout, which
    /// the frontend renders as a login prompt.
    pub fn vote(
        &self,
        ctx: &mut PageContext,
        movie_name: &str,
        author: &str,
        like: bool,
    ) -> ServiceResult<()> {
        if ctx.viewer.is_guest {
            invalidate_client_session(ctx);
            return Err(PlatformError::SessionTimeout);
        }
        if ctx.viewer.email.eq_ignore_ascii_case(author) {
            return Err(PlatformError::Validation("cannot_vote_own_review".into()));
        }
        let review = self
            .service
            .vote_review(movie_name, author, &ctx.viewer.email, like)?;
        let status = self
            .service
            .vote_status(movie_name, author, &ctx.viewer.email)?;
        ctx.context.set(
            "vote_result",
            json!({
                "likes": review.likes,
                "dislikes": review.dislikes,
                "viewer_vote": status,
            }),
        );
        Ok(())
    }

    pub fn vote_status(
        &self,
        ctx: &mut PageContext,
        movie_name: &str,
        author: &str,
    ) -> ServiceResult<()> {
        require_member(ctx)?;
        let status = self
            .service
            .vote_status(movie_name, author, &ctx.viewer.email)?;
        ctx.context.set("viewer_vote", status);
        Ok(())
    }

    /// Flags a review for the moderation queue with an optional reason.
    pub fn report(
        &self,
        ctx: &mut PageContext,
        movie_name: &str,
        author: &str,
    ) -> ServiceResult<()> {
        require_member(ctx)?;
        let reason = ctx.post_vars.string("reason").unwrap_or_default();
        let review = self.service.report_review(movie_name, author, &reason)?;
        log_action(
            &self.service,
            ctx,
            "review_reported",
            json!({
                "movie": movie_name,
                "author": author,
                "report_count": review.report_count,
            }),
        )?;
        ctx.context.set("report_count", review.report_count);
        Ok(())
    }
}
