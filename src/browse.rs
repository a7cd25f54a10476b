use crate::services::{
    PageContext, PlatformError, PlatformService, ServiceResult,
};
use serde_json::json;

const HOME_LIST_SIZE: usize = 8;

/// Landing page: highest rated and most reviewed shelves.
pub fn home<S: PlatformService>(service: &S, ctx: &mut PageContext) -> ServiceResult<()> {
    let top = service.top_movies(HOME_LIST_SIZE)?;
    let busiest = service.most_commented(HOME_LIST_SIZE)?;
    ctx.context.set("top_movies", top);
    ctx.context.set("most_commented", busiest);
    Ok(())
}

pub fn all_movies<S: PlatformService>(service: &S, ctx: &mut PageContext) -> ServiceResult<()> {
    let movies = service.list_movies()?;
    ctx.context.set("movies", movies);
    Ok(())
}

/// A single movie page: details, visible reviews, the viewer's vote on
/// each, and wherever the film can be streamed. The streaming lookup is
/// best-effort; a failure there never sinks the page.
pub fn movie_page<S: PlatformService>(
    service: &S,
    ctx: &mut PageContext,
    movie_name: &str,
) -> ServiceResult<()> {
    let movie = service
        .get_movie(movie_name)?
        .ok_or_else(|| PlatformError::NotFound(format!("movie {movie_name}")))?;
    let reviews = service.list_reviews(movie_name)?;

    let mut visible = Vec::new();
    for review in reviews {
        if review.hidden && !ctx.viewer.is_admin {
            continue;
        }
        let vote = if ctx.viewer.is_guest {
            Default::default()
        } else {
            service.vote_status(movie_name, &review.email, &ctx.viewer.email)?
        };
        visible.push(json!({
            "review": review,
            "viewer_vote": vote,
        }));
    }

    let streaming = match service.streaming_sources(&movie.title.to_lowercase()) {
        Ok(sources) => sources,
        Err(err) => {
            tracing::warn!(movie = movie_name, error = %err, "streaming lookup failed");
            Vec::new()
        }
    };

    ctx.context.set("movie", &movie);
    ctx.context.set("reviews", visible);
    ctx.context.set("streaming_sources", streaming);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{InMemoryService, PageContext};

    #[test]
    fn home_fills_both_shelves() {
        let service = InMemoryService::default();
        let mut ctx = PageContext::default();
        home(&service, &mut ctx).unwrap();
        let top = ctx.context.get("top_movies").unwrap();
        assert_eq!(top[0]["movie_name"], "the-slug-prince");
        let busy = ctx.context.get("most_commented").unwrap();
        assert_eq!(busy[0]["movie_name"], "the-slug-prince");
    }

    #[test]
    fn hidden_reviews_are_filtered_for_members() {
        let service = InMemoryService::default();
        let mut ctx = PageContext::default();
        movie_page(&service, &mut ctx, "the-slug-prince").unwrap();
        let reviews = ctx.context.get("reviews").unwrap().as_array().unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0]["review"]["email"], "bob@example.com");
    }

    #[test]
    fn admins_see_hidden_reviews() {
        let service = InMemoryService::default();
        let mut ctx = PageContext::default();
        ctx.viewer.is_guest = false;
        ctx.viewer.is_admin = true;
        ctx.viewer.email = "admin@cineslug.dev".into();
        movie_page(&service, &mut ctx, "the-slug-prince").unwrap();
        let reviews = ctx.context.get("reviews").unwrap().as_array().unwrap();
        assert_eq!(reviews.len(), 2);
    }

    #[test]
    fn missing_movie_is_not_found() {
        let service = InMemoryService::default();
        let mut ctx = PageContext::default();
        let result = movie_page(&service, &mut ctx, "no-such-film");
        assert!(matches!(result, Err(PlatformError::NotFound(_))));
    }

    #[test]
    fn streaming_sources_attach_when_known() {
        let service = InMemoryService::default();
        let mut ctx = PageContext::default();
        movie_page(&service, &mut ctx, "the-slug-prince").unwrap();
        let sources = ctx
            .context
            .get("streaming_sources")
            .unwrap()
            .as_array()
            .unwrap();
        assert_eq!(sources.len(), 2);

        movie_page(&service, &mut ctx, "banana-harvest").unwrap();
        let sources = ctx
            .context
            .get("streaming_sources")
            .unwrap()
            .as_array()
            .unwrap();
        assert!(sources.is_empty());
    }
}
