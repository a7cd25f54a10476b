use crate::logging::log_action;
use crate::security::require_admin;
use crate::services::{
    MovieRecord, PageContext, PlatformError, PlatformService, ServiceResult, ensure,
};
use serde_json::json;

/// Slugs are lowercase kebab-case: letters, digits and single hyphens.
pub fn valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn movie_from_post(ctx: &PageContext, movie_name: &str) -> ServiceResult<MovieRecord> {
    let title = ctx
        .post_vars
        .string("title")
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
        .ok_or_else(|| PlatformError::Validation("missing_title".into()))?;
    let year = ctx
        .post_vars
        .int("year")
        .ok_or_else(|| PlatformError::Validation("missing_year".into()))? as i32;
    ensure(
        (1888..=2100).contains(&year),
        PlatformError::Validation("year_out_of_range".into()),
    )?;
    let split = |key: &str| -> Vec<String> {
        ctx.post_vars
            .string(key)
            .unwrap_or_default()
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect()
    };
    Ok(MovieRecord {
        movie_name: movie_name.to_string(),
        title,
        directors: split("directors"),
        genres: split("genres"),
        year,
        imdb_rating: ctx.post_vars.float("imdb_rating").unwrap_or(0.0),
        rating: 0.0,
        review_count: 0,
        poster: ctx.post_vars.string("poster").unwrap_or_default(),
    })
}

pub fn create_movie<S: PlatformService>(
    service: &S,
    ctx: &mut PageContext,
    movie_name: &str,
) -> ServiceResult<()> {
    require_admin(ctx)?;
    ensure(
        valid_slug(movie_name),
        PlatformError::Validation("invalid_slug".into()),
    )?;
    let movie = movie_from_post(ctx, movie_name)?;
    service.create_movie(movie)?;
    log_action(service, ctx, "movie_created", json!({"movie": movie_name}))?;
    Ok(())
}

/// Edits keep the community stats; only the descriptive fields change.
pub fn update_movie<S: PlatformService>(
    service: &S,
    ctx: &mut PageContext,
    movie_name: &str,
) -> ServiceResult<()> {
    require_admin(ctx)?;
    let existing = service
        .get_movie(movie_name)?
        .ok_or_else(|| PlatformError::NotFound(format!("movie {movie_name}")))?;
    let mut movie = movie_from_post(ctx, movie_name)?;
    movie.rating = existing.rating;
    movie.review_count = existing.review_count;
    service.update_movie(movie)?;
    log_action(service, ctx, "movie_updated", json!({"movie": movie_name}))?;
    Ok(())
}

pub fn delete_movie<S: PlatformService>(
    service: &S,
    ctx: &mut PageContext,
    movie_name: &str,
) -> ServiceResult<()> {
    require_admin(ctx)?;
    service.delete_movie(movie_name)?;
    log_action(service, ctx, "movie_deleted", json!({"movie": movie_name}))?;
    Ok(())
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
    fn slug_rules() {
        assert!(valid_slug("the-slug-prince"));
        assert!(valid_slug("se7en"));
        assert!(!valid_slug("The-Slug-Prince"));
        assert!(!valid_slug("-leading"));
        assert!(!valid_slug("double--dash"));
        assert!(!valid_slug("spa ce"));
        assert!(!valid_slug(""));
    }

    #[test]
    fn create_is_admin_only() {
        let service = InMemoryService::default();
        let mut ctx = PageContext::default();
        ctx.post_vars.set("title", "Shell Game");
        ctx.post_vars.set("year", 2024);
        assert!(create_movie(&service, &mut ctx, "shell-game").is_err());
    }

    #[test]
    fn create_and_fetch() {
        let service = InMemoryService::default();
        let mut ctx = admin_ctx();
        ctx.post_vars.set("title", "Shell Game");
        ctx.post_vars.set("year", 2024);
        ctx.post_vars.set("directors", "A. Whorl, B. Spiral");
        ctx.post_vars.set("genres", "Thriller");
        create_movie(&service, &mut ctx, "shell-game").unwrap();
        let movie = service.get_movie("shell-game").unwrap().unwrap();
        assert_eq!(movie.directors.len(), 2);
        assert_eq!(movie.review_count, 0);
    }

    #[test]
    fn update_preserves_community_stats() {
        let service = InMemoryService::default();
        let mut ctx = admin_ctx();
        ctx.post_vars.set("title", "The Slug Prince (Director's Cut)");
        ctx.post_vars.set("year", 2019);
        update_movie(&service, &mut ctx, "the-slug-prince").unwrap();
        let movie = service.get_movie("the-slug-prince").unwrap().unwrap();
        assert_eq!(movie.title, "The Slug Prince (Director's Cut)");
        assert_eq!(movie.review_count, 2);
        assert!((movie.rating - 8.2).abs() < 1e-9);
    }

    #[test]
    fn delete_takes_reviews_with_it() {
        let service = InMemoryService::default();
        let mut ctx = admin_ctx();
        delete_movie(&service, &mut ctx, "the-slug-prince").unwrap();
        assert!(service.get_movie("the-slug-prince").unwrap().is_none());
        assert!(service.list_reviews("the-slug-prince").unwrap().is_empty());
    }
}
